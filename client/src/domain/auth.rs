//! Authentication primitives such as login credentials and signup requests.
//!
//! Inputs from the landing form are validated here before the session
//! controller talks to the resource client.

use serde_json::{Value, json};
use zeroize::Zeroizing;

use super::user::Role;

/// Domain error returned when login or signup form values are invalid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialsValidationError {
    /// Email was missing or blank once trimmed.
    #[error("email must not be empty")]
    EmptyEmail,
    /// Password was blank.
    #[error("password must not be empty")]
    EmptyPassword,
    /// Signup name was missing or blank once trimmed.
    #[error("name must not be empty")]
    EmptyName,
}

/// Validated login credentials used by every authentication strategy.
///
/// ## Invariants
/// - `email` is trimmed and must not be empty after trimming.
/// - `password` must be non-empty but keeps caller-provided whitespace.
///
/// # Examples
/// ```
/// use marsfood_client::domain::LoginCredentials;
///
/// let creds = LoginCredentials::try_from_parts(" ada@mars.gov ", "hunter2").unwrap();
/// assert_eq!(creds.email(), "ada@mars.gov");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    email: String,
    password: Zeroizing<String>,
}

impl LoginCredentials {
    /// Construct credentials from raw form inputs.
    pub fn try_from_parts(email: &str, password: &str) -> Result<Self, CredentialsValidationError> {
        let normalized = email.trim();
        if normalized.is_empty() {
            return Err(CredentialsValidationError::EmptyEmail);
        }
        if password.is_empty() {
            return Err(CredentialsValidationError::EmptyPassword);
        }

        Ok(Self {
            email: normalized.to_owned(),
            password: Zeroizing::new(password.to_owned()),
        })
    }

    /// Normalised email address.
    pub fn email(&self) -> &str {
        self.email.as_str()
    }

    /// Password exactly as entered.
    pub fn password(&self) -> &str {
        self.password.as_str()
    }
}

/// Validated signup form: credentials plus profile fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignupRequest {
    credentials: LoginCredentials,
    name: String,
    role: Role,
}

impl SignupRequest {
    /// Construct a signup request from raw form inputs.
    pub fn try_from_parts(
        email: &str,
        password: &str,
        name: &str,
        role: Role,
    ) -> Result<Self, CredentialsValidationError> {
        let credentials = LoginCredentials::try_from_parts(email, password)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(CredentialsValidationError::EmptyName);
        }
        Ok(Self {
            credentials,
            name: name.to_owned(),
            role,
        })
    }

    /// Credentials reused for the automatic login after signup.
    pub fn credentials(&self) -> &LoginCredentials {
        &self.credentials
    }

    /// Display name for the new account.
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Role chosen at signup.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Record payload sent to the `User` collection.
    pub fn to_payload(&self) -> Value {
        json!({
            "email": self.credentials.email(),
            "password": self.credentials.password(),
            "name": self.name,
            "role": self.role,
        })
    }
}
