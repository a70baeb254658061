//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **manifest**: reqwest-backed `ResourceClient` for the Manifest REST API
//! - **health**: reqwest-backed `HealthProbe` for the liveness endpoint
//!
//! Adapters are thin translators between domain types and HTTP. They contain
//! no business logic.

pub mod health;
pub mod manifest;

#[cfg(test)]
mod test_server;
