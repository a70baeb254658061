//! Health probe outbound adapter.

mod http_probe;

pub use http_probe::HttpHealthProbe;
