use serde_derive::{Deserialize, Serialize};
use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

/// A coarse authorization category.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Student,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Student => "STUDENT",
        }
    }

    /// The view a user with this role lands on by default.
    pub fn landing_path(self) -> &'static str {
        match self {
            Role::Admin => "/admin/dashboard",
            Role::Student => "/student/dashboard",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Role, Self::Err> {
        if s.eq_ignore_ascii_case("ADMIN") {
            Ok(Role::Admin)
        } else if s.eq_ignore_ascii_case("STUDENT") {
            Ok(Role::Student)
        } else {
            Err(UnknownRole(s.to_string()))
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("\"{}\" is not a known role", .0)]
pub struct UnknownRole(String);

/// The authenticated principal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub role: Role,
}

impl User {
    /// Merge a partial update into this user. The `id` and `role` are never
    /// touched.
    pub fn apply(&mut self, patch: UserPatch) {
        if let Some(email) = patch.email {
            self.email = email;
        }
        if let Some(name) = patch.name {
            self.name = name;
        }
    }
}

/// The user fields a profile edit is allowed to change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl UserPatch {
    pub fn name<S: Into<String>>(name: S) -> Self {
        UserPatch {
            name: Some(name.into()),
            ..UserPatch::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.name.is_none()
    }
}
