//! Record identifiers issued by the remote store.
//!
//! The backend may hand out identifiers as JSON strings or as integers. Each
//! typed identifier keeps the wire form it arrived in so that references
//! written back (for example `mealId` on a consumption log) round-trip
//! unchanged.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Validation errors raised when building identifiers from raw input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordIdValidationError {
    /// The identifier was blank once trimmed.
    #[error("{kind} id must not be empty")]
    Empty {
        /// Record kind used in the message.
        kind: &'static str,
    },
    /// The identifier carried leading or trailing whitespace.
    #[error("{kind} id must not contain surrounding whitespace")]
    Padded {
        /// Record kind used in the message.
        kind: &'static str,
    },
}

/// Wire form of a record identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordKey {
    /// Integer key, as issued by auto-increment stores.
    Number(u64),
    /// Opaque textual key such as a UUID.
    Text(String),
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

fn validate_key(kind: &'static str, key: RecordKey) -> Result<RecordKey, RecordIdValidationError> {
    if let RecordKey::Text(text) = &key {
        if text.trim().is_empty() {
            return Err(RecordIdValidationError::Empty { kind });
        }
        if text.trim() != text {
            return Err(RecordIdValidationError::Padded { kind });
        }
    }
    Ok(key)
}

macro_rules! define_record_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "RecordKey", into = "RecordKey")]
        pub struct $name(RecordKey);

        impl $name {
            /// Validate and construct an identifier from textual input.
            pub fn new(id: impl Into<String>) -> Result<Self, RecordIdValidationError> {
                validate_key($kind, RecordKey::Text(id.into())).map(Self)
            }

            /// Construct an identifier from a numeric key.
            pub fn from_number(id: u64) -> Self {
                Self(RecordKey::Number(id))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl TryFrom<RecordKey> for $name {
            type Error = RecordIdValidationError;

            fn try_from(value: RecordKey) -> Result<Self, Self::Error> {
                validate_key($kind, value).map(Self)
            }
        }

        impl From<$name> for RecordKey {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl From<$name> for serde_json::Value {
            fn from(value: $name) -> Self {
                match value.0 {
                    RecordKey::Number(number) => serde_json::Value::from(number),
                    RecordKey::Text(text) => serde_json::Value::String(text),
                }
            }
        }
    };
}

define_record_id!(
    /// Identifier of a `User` record.
    UserId,
    "user"
);
define_record_id!(
    /// Identifier of a `Meal` record.
    MealId,
    "meal"
);
define_record_id!(
    /// Identifier of a `ConsumptionLog` record.
    ConsumptionLogId,
    "consumption log"
);
define_record_id!(
    /// Identifier of an uploaded file.
    FileId,
    "file"
);
