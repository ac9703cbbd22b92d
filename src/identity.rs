//! Turning a login response into a [`User`].
//!
//! Some backend builds answer a login with `{token, user}`, others with just
//! `{token, role}`. Both shapes are resolved here into one canonical identity
//! so callers never deal with missing fields.

use crate::{claims, Role, User};
use serde::Deserializer;
use serde_derive::Deserialize;
use serde_json::Value;
use std::convert::TryFrom;

/// What the backend sent back from `POST /auth/login`.
#[derive(Debug, Clone, PartialEq)]
pub enum LoginResponse {
    /// The server supplied the whole user.
    Complete { token: String, user: User },
    /// The server left some (or all) of the user out.
    Partial {
        token: String,
        role: Option<Role>,
        fields: PartialUser,
    },
}

impl LoginResponse {
    pub fn token(&self) -> &str {
        match self {
            LoginResponse::Complete { token, .. }
            | LoginResponse::Partial { token, .. } => token,
        }
    }
}

/// Whatever user fields a response happened to include.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PartialUser {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_role")]
    pub role: Option<Role>,
}

impl PartialUser {
    fn complete(&self) -> Option<User> {
        Some(User {
            id: self.id?,
            email: self.email.clone().filter(|e| !e.is_empty())?,
            name: self.name.clone().filter(|n| !n.is_empty())?,
            role: self.role?,
        })
    }
}

/// The raw JSON body, before we decide which shape it is.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawLoginResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default, deserialize_with = "lenient_role")]
    role: Option<Role>,
    #[serde(default)]
    user: Option<PartialUser>,
    #[serde(default, deserialize_with = "lenient_id")]
    id: Option<i64>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

// A login shouldn't fail just because a field came back in an odd shape.

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Value> = serde::Deserialize::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(claims::id_from))
}

fn lenient_role<'de, D>(deserializer: D) -> Result<Option<Role>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Value> = serde::Deserialize::deserialize(deserializer)?;
    let role = value.as_ref().and_then(claims::role_from);

    if role.is_none() {
        if let Some(other) = value.filter(|v| !v.is_null()) {
            log::debug!("Ignoring an unrecognised role, {}", other);
        }
    }

    Ok(role)
}

/// The server accepted the credentials but didn't hand out a token.
#[derive(Debug, Copy, Clone, PartialEq, thiserror::Error)]
#[error("Invalid response from server: missing token")]
pub struct MissingToken;

impl TryFrom<RawLoginResponse> for LoginResponse {
    type Error = MissingToken;

    fn try_from(raw: RawLoginResponse) -> Result<LoginResponse, MissingToken> {
        let token = raw.token.filter(|t| !t.is_empty()).ok_or(MissingToken)?;

        if let Some(user) = raw.user.as_ref().and_then(PartialUser::complete) {
            return Ok(LoginResponse::Complete { token, user });
        }

        // fields nested under "user" win over top-level ones
        let nested = raw.user.unwrap_or_default();
        let fields = PartialUser {
            id: nested.id.or(raw.id),
            email: nested.email.or(raw.email),
            name: nested.name.or(raw.name),
            role: nested.role,
        };

        Ok(LoginResponse::Partial {
            token,
            role: raw.role,
            fields,
        })
    }
}

/// Resolve a login response into the token and user to store in the session.
///
/// Missing fields are filled in, in priority order, from the response itself,
/// from the token's (unverified) claims, from the email used to log in, and
/// finally from placeholders: the `STUDENT` role, a name taken from the
/// email's local part and an id of `0`.
pub fn resolve_identity(
    response: LoginResponse,
    login_email: &str,
) -> (String, User) {
    let (token, role, fields) = match response {
        LoginResponse::Complete { token, user } => return (token, user),
        LoginResponse::Partial {
            token,
            role,
            fields,
        } => (token, role, fields),
    };

    log::warn!("The login response didn't include a user, synthesizing one");
    let claims = claims::decode_claims(&token).unwrap_or_default();
    log::trace!("Decoded claims: {:?}", claims);

    let email = fields
        .email
        .filter(|e| !e.is_empty())
        .or_else(|| claims.email().map(String::from))
        .unwrap_or_else(|| login_email.to_string());
    let name = fields
        .name
        .filter(|n| !n.is_empty())
        .or_else(|| claims.name().map(String::from))
        .unwrap_or_else(|| local_part(&email).to_string());
    let user = User {
        id: fields.id.or_else(|| claims.id()).unwrap_or(0),
        role: role
            .or(fields.role)
            .or_else(|| claims.role())
            .unwrap_or(Role::Student),
        email,
        name,
    };

    (token, user)
}

fn local_part(email: &str) -> &str { email.split('@').next().unwrap_or(email) }

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::encode_token;
    use serde_json::json;

    fn parse(body: serde_json::Value) -> Result<LoginResponse, MissingToken> {
        let raw: RawLoginResponse = serde_json::from_value(body).unwrap();
        LoginResponse::try_from(raw)
    }

    #[test]
    fn complete_responses_are_used_verbatim() {
        let response = parse(json!({
            "token": "tok",
            "user": { "id": 5, "email": "x@y.z", "name": "X", "role": "ADMIN" },
        }))
        .unwrap();
        let should_be = User {
            id: 5,
            email: String::from("x@y.z"),
            name: String::from("X"),
            role: Role::Admin,
        };

        let got = resolve_identity(response, "someone@else.com");

        assert_eq!(got, (String::from("tok"), should_be));
    }

    #[test]
    fn responses_without_a_token_are_rejected() {
        assert_eq!(parse(json!({ "role": "ADMIN" })), Err(MissingToken));
        assert_eq!(parse(json!({ "token": "" })), Err(MissingToken));
    }

    #[test]
    fn fill_in_the_user_from_token_claims() {
        let token = encode_token(&json!({ "email": "a@b.com" }));
        let response =
            parse(json!({ "token": token, "role": "ADMIN" })).unwrap();

        let (_, user) = resolve_identity(response, "a@b.com");

        assert_eq!(
            user,
            User {
                id: 0,
                email: String::from("a@b.com"),
                name: String::from("a"),
                role: Role::Admin,
            }
        );
    }

    #[test]
    fn response_role_beats_the_claimed_role() {
        let token = encode_token(&json!({ "id": 9, "role": "STUDENT" }));
        let response =
            parse(json!({ "token": token, "role": "ADMIN" })).unwrap();

        let (_, user) = resolve_identity(response, "boss@school.edu");

        assert_eq!(user.role, Role::Admin);
        assert_eq!(user.id, 9);
    }

    #[test]
    fn undecodable_tokens_fall_back_to_the_login_email() {
        let response = parse(json!({ "token": "opaque" })).unwrap();

        let (token, user) = resolve_identity(response, "kim@school.edu");

        assert_eq!(token, "opaque");
        assert_eq!(
            user,
            User {
                id: 0,
                email: String::from("kim@school.edu"),
                name: String::from("kim"),
                role: Role::Student,
            }
        );
    }

    #[test]
    fn partial_user_objects_are_merged_with_claims() {
        let token = encode_token(&json!({ "name": "Kim Lee", "id": 4 }));
        let response = parse(json!({
            "token": token,
            "user": { "email": "kim@school.edu" },
        }))
        .unwrap();

        let (_, user) = resolve_identity(response, "typed@wrong.edu");

        assert_eq!(
            user,
            User {
                id: 4,
                email: String::from("kim@school.edu"),
                name: String::from("Kim Lee"),
                role: Role::Student,
            }
        );
    }

    #[test]
    fn lowercase_roles_are_understood() {
        let response = parse(json!({ "token": "opaque", "role": "admin" }))
            .unwrap();

        let (_, user) = resolve_identity(response, "kim@school.edu");

        assert_eq!(user.role, Role::Admin);
    }

    #[test]
    fn unknown_roles_count_as_missing() {
        let token = encode_token(&json!({ "role": "ADMIN" }));
        let response = parse(json!({
            "token": token,
            "role": "janitor",
            "user": { "role": 42 },
        }))
        .unwrap();

        let (_, user) = resolve_identity(response, "kim@school.edu");

        assert_eq!(user.role, Role::Admin);
    }

    #[test]
    fn string_ids_are_accepted() {
        let response = parse(json!({
            "token": "tok",
            "user": {
                "id": "5",
                "email": "x@y.z",
                "name": "X",
                "role": "student",
            },
        }))
        .unwrap();

        let should_be = LoginResponse::Complete {
            token: String::from("tok"),
            user: User {
                id: 5,
                email: String::from("x@y.z"),
                name: String::from("X"),
                role: Role::Student,
            },
        };
        assert_eq!(response, should_be);
    }

    #[test]
    fn nonsense_ids_fall_back_to_the_claims() {
        let token = encode_token(&json!({ "id": 8 }));
        let response =
            parse(json!({ "token": token, "id": "abc", "user": null }))
                .unwrap();

        let (_, user) = resolve_identity(response, "kim@school.edu");

        assert_eq!(user.id, 8);
    }
}
