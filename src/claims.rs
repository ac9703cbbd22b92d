//! Structural decoding of bearer tokens.
//!
//! Nothing here verifies a signature. The decoded claims are only good for
//! filling in optimistic UI state and must never be used for access control.

use crate::Role;
use serde_json::{Map, Value};

/// The claims embedded in a token's payload segment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Claims(Map<String, Value>);

impl Claims {
    pub fn get(&self, name: &str) -> Option<&Value> { self.0.get(name) }

    /// The numeric user id, accepting either a JSON number or a numeric
    /// string.
    pub fn id(&self) -> Option<i64> { id_from(self.get("id")?) }

    pub fn email(&self) -> Option<&str> { self.string("email") }

    pub fn name(&self) -> Option<&str> { self.string("name") }

    pub fn role(&self) -> Option<Role> { role_from(self.get("role")?) }

    pub fn into_inner(self) -> Map<String, Value> { self.0 }

    fn string(&self, name: &str) -> Option<&str> {
        self.get(name)?.as_str().filter(|s| !s.is_empty())
    }
}

/// Read a user id that may have been sent as a number or a numeric string.
pub(crate) fn id_from(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Read a role in any letter case. Unknown roles are treated as missing.
pub(crate) fn role_from(value: &Value) -> Option<Role> {
    value.as_str()?.parse().ok()
}

impl From<Map<String, Value>> for Claims {
    fn from(other: Map<String, Value>) -> Claims { Claims(other) }
}

/// Decode the payload of a `header.payload.signature` token.
///
/// Returns `None` when the token doesn't have exactly three segments, when
/// the payload isn't base64url, or when it doesn't hold a JSON object.
pub fn decode_claims(token: &str) -> Option<Claims> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        log::debug!(
            "Expected a token with 3 segments but found {}",
            segments.len()
        );
        return None;
    }

    // tolerate padding and the standard alphabet
    let payload: String = segments[1]
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();

    let raw = match base64::decode_config(&payload, base64::URL_SAFE_NO_PAD) {
        Ok(raw) => raw,
        Err(e) => {
            log::debug!("The token payload isn't valid base64: {}", e);
            return None;
        },
    };

    match serde_json::from_slice::<Value>(&raw) {
        Ok(Value::Object(map)) => Some(Claims(map)),
        Ok(_) => {
            log::debug!("The token payload isn't a JSON object");
            None
        },
        Err(e) => {
            log::debug!("The token payload isn't valid JSON: {}", e);
            None
        },
    }
}

#[cfg(test)]
pub(crate) fn encode_token(payload: &Value) -> String {
    let header = base64::encode_config(
        br#"{"alg":"HS256","typ":"JWT"}"#,
        base64::URL_SAFE_NO_PAD,
    );
    let payload = base64::encode_config(
        payload.to_string().as_bytes(),
        base64::URL_SAFE_NO_PAD,
    );

    format!("{}.{}.signature", header, payload)
}
