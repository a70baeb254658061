//! Manifest outbound adapter.
//!
//! This module provides a thin HTTP implementation of the `ResourceClient`
//! port for the Manifest backend-as-a-service.

mod dto;
mod http_client;

pub use http_client::ManifestHttpClient;
