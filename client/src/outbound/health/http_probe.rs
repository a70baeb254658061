//! Reqwest-backed liveness probe.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url, header};

use crate::domain::ports::{HealthProbe, HealthProbeError, ProbeStatus};

/// Issues `GET` against the backend health endpoint and reports the status.
pub struct HttpHealthProbe {
    client: Client,
    url: Url,
}

impl HttpHealthProbe {
    /// Build a probe with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url })
    }

    /// Probed endpoint.
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl HealthProbe for HttpHealthProbe {
    async fn probe(&self) -> Result<ProbeStatus, HealthProbeError> {
        let response = self
            .client
            .get(self.url.clone())
            .header(header::CACHE_CONTROL, "no-store")
            .send()
            .await
            .map_err(map_transport_error)?;
        Ok(ProbeStatus::new(response.status().as_u16()))
    }
}

fn map_transport_error(error: reqwest::Error) -> HealthProbeError {
    if error.is_timeout() {
        HealthProbeError::timeout(error.to_string())
    } else {
        HealthProbeError::transport(error.to_string())
    }
}
