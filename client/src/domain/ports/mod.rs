//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod health_probe;
mod resource_client;

#[cfg(test)]
pub use health_probe::MockHealthProbe;
pub use health_probe::{HealthProbe, HealthProbeError, ProbeStatus};
#[cfg(test)]
pub use resource_client::MockResourceClient;
pub use resource_client::{
    AuthStrategy, Collection, FindQuery, RecordPage, ResourceClient, ResourceClientError,
    SortOrder, UploadedFile,
};
