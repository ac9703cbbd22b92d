//! Checking login and registration forms before anything is sent.
//!
//! Problems are reported per field so they can be shown next to the input
//! that caused them.

use crate::{types::Registration, Role};
use std::{
    collections::BTreeMap,
    fmt::{self, Display, Formatter},
};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Name,
    Email,
    Password,
    ConfirmPassword,
    Role,
}

impl Display for Field {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Name => "name",
            Field::Email => "email",
            Field::Password => "password",
            Field::ConfirmPassword => "confirm password",
            Field::Role => "role",
        };
        f.write_str(name)
    }
}

/// The problems found with a form, keyed by field.
#[derive(Debug, Clone, Default, PartialEq, thiserror::Error)]
#[error("{}", summarize(.0))]
pub struct FieldErrors(BTreeMap<Field, &'static str>);

impl FieldErrors {
    pub fn get(&self, field: Field) -> Option<&'static str> {
        self.0.get(&field).copied()
    }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &'static str)> + '_ {
        self.0.iter().map(|(field, msg)| (*field, *msg))
    }

    fn add(&mut self, field: Field, message: &'static str) {
        self.0.entry(field).or_insert(message);
    }

    fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

fn summarize(errors: &BTreeMap<Field, &'static str>) -> String {
    errors
        .values()
        .copied()
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();

        check_email(&self.email, &mut errors);

        if self.password.is_empty() {
            errors.add(Field::Password, "Password is required");
        } else if self.password.chars().count() < 6 {
            errors.add(
                Field::Password,
                "Password must be at least 6 characters",
            );
        }

        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub role: Option<Role>,
}

impl RegisterForm {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();

        if self.name.trim().is_empty() {
            errors.add(Field::Name, "Name is required");
        } else if self.name.chars().count() < 2 {
            errors.add(Field::Name, "Name must be at least 2 characters");
        }

        check_email(&self.email, &mut errors);

        if self.password.is_empty() {
            errors.add(Field::Password, "Password is required");
        } else if self.password.chars().count() < 8 {
            errors.add(
                Field::Password,
                "Password must be at least 8 characters",
            );
        }

        if self.password != self.confirm_password {
            errors.add(Field::ConfirmPassword, "Passwords do not match");
        }

        if self.role.is_none() {
            errors.add(Field::Role, "Please select a role");
        }

        errors.into_result()
    }

    /// Validate the form and turn it into a registration request.
    pub fn into_registration(self) -> Result<Registration, FieldErrors> {
        self.validate()?;

        Ok(Registration {
            name: self.name,
            email: self.email,
            password: self.password,
            role: self.role,
        })
    }
}

/// A single password strength hint and whether it's satisfied.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub label: &'static str,
    pub met: bool,
}

pub fn password_requirements(password: &str) -> [Requirement; 3] {
    [
        Requirement {
            label: "At least 8 characters",
            met: password.chars().count() >= 8,
        },
        Requirement {
            label: "Contains a number",
            met: password.chars().any(|c| c.is_ascii_digit()),
        },
        Requirement {
            label: "Contains uppercase",
            met: password.chars().any(|c| c.is_ascii_uppercase()),
        },
    ]
}

fn check_email(email: &str, errors: &mut FieldErrors) {
    if email.is_empty() {
        errors.add(Field::Email, "Email is required");
    } else if !looks_like_email(email) {
        errors.add(Field::Email, "Please enter a valid email");
    }
}

/// Something like `x@y.z` appears somewhere in `text`, with no whitespace
/// inside it.
pub fn looks_like_email(text: &str) -> bool {
    text.char_indices().filter(|(_, c)| *c == '@').any(|(at, _)| {
        let before = text[..at].chars().next_back();
        let after: Vec<char> = text[at + 1..]
            .chars()
            .take_while(|c| !c.is_whitespace())
            .collect();

        before.map_or(false, |c| !c.is_whitespace())
            && after
                .iter()
                .enumerate()
                .any(|(i, c)| *c == '.' && i >= 1 && i + 1 < after.len())
    })
}
