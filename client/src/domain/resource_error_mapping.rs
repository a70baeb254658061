//! Mapping from resource client port errors to domain errors.

use crate::domain::Error;
use crate::domain::ports::ResourceClientError;

/// Form-level message used when the backend rejects credentials silently.
pub const AUTHENTICATION_FAILED_MESSAGE: &str = "Authentication failed. Check credentials.";

fn non_blank(message: String, fallback: &str) -> String {
    if message.trim().is_empty() {
        fallback.to_owned()
    } else {
        message
    }
}

/// Translate a port failure into the error surfaced to callers.
pub(crate) fn map_client_error(error: ResourceClientError) -> Error {
    match error {
        ResourceClientError::Transport { .. } | ResourceClientError::Timeout { .. } => {
            Error::service_unavailable(error.to_string())
        }
        ResourceClientError::Unauthorized { message } => {
            Error::unauthorized(non_blank(message, AUTHENTICATION_FAILED_MESSAGE))
        }
        ResourceClientError::NotFound { message } => {
            Error::not_found(non_blank(message, "record not found"))
        }
        ResourceClientError::Rejected { status, message } => {
            let text = non_blank(message, "request rejected by the backend");
            match status {
                400 | 409 | 422 => Error::invalid_request(text),
                500..=599 => Error::service_unavailable(text),
                _ => Error::internal(format!("{text} (status {status})")),
            }
        }
        ResourceClientError::Decode { .. } => Error::internal(error.to_string()),
    }
}
