//! Driven port for the backend liveness endpoint.

use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Errors raised when a probe never produced an HTTP status.
    pub enum HealthProbeError {
        /// Connection failed or was reset.
        Transport { message: String } => "health probe transport failed: {message}",
        /// The probe did not complete in time.
        Timeout { message: String } => "health probe timed out: {message}",
    }
}

/// HTTP status returned by a liveness probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProbeStatus(u16);

impl ProbeStatus {
    /// Wrap a raw status code.
    pub fn new(code: u16) -> Self {
        Self(code)
    }

    /// Raw status code.
    pub fn code(self) -> u16 {
        self.0
    }

    /// True for any 2xx status.
    pub fn is_success(self) -> bool {
        (200..300).contains(&self.0)
    }
}

/// Port issuing one liveness request per call.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Issue one liveness request and report the response status.
    async fn probe(&self) -> Result<ProbeStatus, HealthProbeError>;
}
