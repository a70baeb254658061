//! User data model.
//!
//! A [`User`] is an immutable snapshot of the backend's `User` record, fetched
//! after every successful authentication change and never edited locally.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ids::UserId;

/// Fixed classification controlling which data and actions are visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Logs meals and sees their own consumption history.
    Colonist,
    /// Designs meals for the shared catalogue.
    Scientist,
}

impl Role {
    /// Wire representation of the role.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Colonist => "colonist",
            Self::Scientist => "scientist",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UserValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "colonist" => Ok(Self::Colonist),
            "scientist" => Ok(Self::Scientist),
            _ => Err(UserValidationError::UnknownRole {
                role: value.to_owned(),
            }),
        }
    }
}

/// Validation errors returned when a user record is malformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserValidationError {
    /// The email address was blank.
    #[error("user email must not be empty")]
    EmptyEmail,
    /// The display name was blank.
    #[error("user name must not be empty")]
    EmptyName,
    /// The role label matched no known role.
    #[error("unknown role: {role}")]
    UnknownRole {
        /// Label as supplied.
        role: String,
    },
}

/// Application user as returned by the backend.
///
/// ## Invariants
/// - `email` and `name` are non-empty once trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(try_from = "UserDto", into = "UserDto")]
pub struct User {
    id: UserId,
    email: String,
    name: String,
    role: Role,
}

impl User {
    /// Fallible constructor enforcing the record invariants.
    pub fn try_new(
        id: UserId,
        email: impl Into<String>,
        name: impl Into<String>,
        role: Role,
    ) -> Result<Self, UserValidationError> {
        let email = email.into();
        let name = name.into();
        if email.trim().is_empty() {
            return Err(UserValidationError::EmptyEmail);
        }
        if name.trim().is_empty() {
            return Err(UserValidationError::EmptyName);
        }
        Ok(Self {
            id,
            email,
            name,
            role,
        })
    }

    /// Stable user identifier.
    pub fn id(&self) -> &UserId {
        &self.id
    }

    /// Login email address.
    pub fn email(&self) -> &str {
        self.email.as_str()
    }

    /// Display name.
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Role assigned at signup.
    pub fn role(&self) -> Role {
        self.role
    }
}

// Extra backend fields (timestamps, admin flags) are ignored on decode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserDto {
    id: UserId,
    email: String,
    name: String,
    role: Role,
}

impl From<User> for UserDto {
    fn from(value: User) -> Self {
        Self {
            id: value.id,
            email: value.email,
            name: value.name,
            role: value.role,
        }
    }
}

impl TryFrom<UserDto> for User {
    type Error = UserValidationError;

    fn try_from(value: UserDto) -> Result<Self, Self::Error> {
        Self::try_new(value.id, value.email, value.name, value.role)
    }
}
