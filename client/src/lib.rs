//! Client-side session and resource synchronisation for the colony food log.
//!
//! The crate is laid out hexagonally: `domain` holds value types, ports, and
//! the session, health, and dashboard services; `outbound` holds the reqwest
//! adapters for the Manifest backend; `shell` composes them for a
//! presentation layer or the headless `marsfood` runner.

pub mod config;
pub mod domain;
pub mod outbound;
pub mod shell;
pub mod telemetry;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use config::ClientSettings;
pub use shell::{Screen, Shell};
