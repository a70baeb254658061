//! Wire DTOs for the Manifest REST dialect.
//!
//! Request bodies borrow from domain values; response bodies are decoded
//! here first and handed to the domain as raw records or references.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use zeroize::Zeroizing;

use crate::domain::LoginCredentials;

#[derive(Debug, Serialize)]
pub(super) struct LoginRequestDto<'a> {
    pub(super) email: &'a str,
    pub(super) password: &'a str,
}

impl<'a> From<&'a LoginCredentials> for LoginRequestDto<'a> {
    fn from(credentials: &'a LoginCredentials) -> Self {
        Self {
            email: credentials.email(),
            password: credentials.password(),
        }
    }
}

#[derive(Deserialize)]
pub(super) struct TokenResponseDto {
    pub(super) token: String,
}

impl TokenResponseDto {
    pub(super) fn into_secret(self) -> Zeroizing<String> {
        Zeroizing::new(self.token)
    }
}

/// Error payload: `{ "message": "..." | ["..."], "error": "..." }`.
#[derive(Debug, Default, Deserialize)]
pub(super) struct ErrorBodyDto {
    #[serde(default)]
    message: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

impl ErrorBodyDto {
    /// Human-readable message, preferring `message` over `error`.
    pub(super) fn into_message(self) -> Option<String> {
        [self.message, self.error]
            .into_iter()
            .flatten()
            .find_map(|value| flatten_message(&value))
    }
}

fn flatten_message(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(text) => text.trim().to_owned(),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .collect::<Vec<_>>()
            .join("; "),
        _ => String::new(),
    };
    (!text.is_empty()).then_some(text)
}
