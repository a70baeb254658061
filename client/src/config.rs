//! Client configuration loaded via OrthoConfig.
//!
//! Values come from `MARSFOOD_*` environment variables, configuration files,
//! or command-line flags. Every field is optional; accessors apply defaults
//! and validate URLs.

use std::fmt;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use url::Url;

use crate::domain::{DEFAULT_HEALTH_INTERVAL, Error, LoginCredentials, MIN_HEALTH_INTERVAL};

const DEFAULT_BACKEND_URL: &str = "http://localhost:1111";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const HEALTH_PATH: [&str; 2] = ["api", "health"];

/// Configuration values for the headless client.
#[derive(Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "MARSFOOD")]
pub struct ClientSettings {
    /// Base URL of the backend-as-a-service.
    pub backend_url: Option<String>,
    /// Liveness endpoint; defaults to `<backend_url>/api/health`.
    pub health_url: Option<String>,
    /// Seconds between health probes.
    pub health_interval_secs: Option<u64>,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: Option<u64>,
    /// Account email for non-interactive login.
    pub email: Option<String>,
    /// Account password for non-interactive login.
    pub password: Option<String>,
}

impl fmt::Debug for ClientSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSettings")
            .field("backend_url", &self.backend_url)
            .field("health_url", &self.health_url)
            .field("health_interval_secs", &self.health_interval_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ClientSettings {
    /// Return the backend base URL, falling back to the local default.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` when the configured value is not an absolute
    /// URL usable as a base.
    pub fn backend_url(&self) -> Result<Url, Error> {
        parse_base_url(
            "backend_url",
            self.backend_url.as_deref().unwrap_or(DEFAULT_BACKEND_URL),
        )
    }

    /// Return the health endpoint, derived from the backend URL when unset.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` when either URL is malformed.
    pub fn health_url(&self) -> Result<Url, Error> {
        if let Some(raw) = self.health_url.as_deref() {
            return parse_base_url("health_url", raw);
        }
        let mut url = self.backend_url()?;
        url.path_segments_mut()
            .map_err(|()| Error::invalid_request("backend_url cannot be a base URL"))?
            .pop_if_empty()
            .extend(HEALTH_PATH);
        Ok(url)
    }

    /// Return the probe period, never shorter than one second.
    pub fn health_interval(&self) -> Duration {
        self.health_interval_secs
            .map_or(DEFAULT_HEALTH_INTERVAL, Duration::from_secs)
            .max(MIN_HEALTH_INTERVAL)
    }

    /// Return the per-request timeout, never shorter than one second.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout_secs
            .map_or(DEFAULT_REQUEST_TIMEOUT, Duration::from_secs)
            .max(Duration::from_secs(1))
    }

    /// Return login credentials when both email and password are set.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` when only one of the two is configured or a
    /// configured value is blank.
    pub fn credentials(&self) -> Result<Option<LoginCredentials>, Error> {
        match (self.email.as_deref(), self.password.as_deref()) {
            (None, None) => Ok(None),
            (Some(email), Some(password)) => LoginCredentials::try_from_parts(email, password)
                .map(Some)
                .map_err(|err| Error::invalid_request(err.to_string())),
            _ => Err(Error::invalid_request(
                "email and password must be configured together",
            )),
        }
    }
}

fn parse_base_url(field: &str, raw: &str) -> Result<Url, Error> {
    let url = Url::parse(raw)
        .map_err(|err| Error::invalid_request(format!("{field} is not a valid URL: {err}")))?;
    if url.cannot_be_a_base() {
        return Err(Error::invalid_request(format!(
            "{field} must be a hierarchical URL"
        )));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    //! Unit tests for client configuration parsing.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    const VARS: [&str; 6] = [
        "MARSFOOD_BACKEND_URL",
        "MARSFOOD_HEALTH_URL",
        "MARSFOOD_HEALTH_INTERVAL_SECS",
        "MARSFOOD_REQUEST_TIMEOUT_SECS",
        "MARSFOOD_EMAIL",
        "MARSFOOD_PASSWORD",
    ];

    fn load_from_empty_args() -> ClientSettings {
        ClientSettings::load_from_iter([OsString::from("marsfood")]).expect("config should load")
    }

    fn cleared() -> Vec<(&'static str, Option<String>)> {
        VARS.iter().map(|name| (*name, None)).collect()
    }

    #[rstest]
    fn default_values_are_used_when_missing() {
        let _guard = lock_env(cleared());

        let settings = load_from_empty_args();
        assert_eq!(
            settings.backend_url().expect("url").as_str(),
            "http://localhost:1111/"
        );
        assert_eq!(
            settings.health_url().expect("url").as_str(),
            "http://localhost:1111/api/health"
        );
        assert_eq!(settings.health_interval(), Duration::from_secs(15));
        assert_eq!(settings.request_timeout(), Duration::from_secs(30));
        assert!(settings.credentials().expect("credentials").is_none());
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let mut vars = cleared();
        vars.retain(|(name, _)| {
            !matches!(
                *name,
                "MARSFOOD_BACKEND_URL"
                    | "MARSFOOD_HEALTH_INTERVAL_SECS"
                    | "MARSFOOD_EMAIL"
                    | "MARSFOOD_PASSWORD"
            )
        });
        vars.extend([
            ("MARSFOOD_BACKEND_URL", Some("https://hab.mars/backend".to_owned())),
            ("MARSFOOD_HEALTH_INTERVAL_SECS", Some("0".to_owned())),
            ("MARSFOOD_EMAIL", Some("watney@mars.gov".to_owned())),
            ("MARSFOOD_PASSWORD", Some("potatoes".to_owned())),
        ]);
        let _guard = lock_env(vars);

        let settings = load_from_empty_args();
        assert_eq!(
            settings.health_url().expect("url").as_str(),
            "https://hab.mars/backend/api/health"
        );
        assert_eq!(settings.health_interval(), MIN_HEALTH_INTERVAL);
        let credentials = settings
            .credentials()
            .expect("credentials")
            .expect("both configured");
        assert_eq!(credentials.email(), "watney@mars.gov");
    }

    #[rstest]
    fn half_configured_credentials_are_rejected() {
        let settings = ClientSettings {
            backend_url: None,
            health_url: None,
            health_interval_secs: None,
            request_timeout_secs: None,
            email: Some("watney@mars.gov".to_owned()),
            password: None,
        };
        assert!(settings.credentials().is_err());
    }

    #[rstest]
    #[case("not a url")]
    #[case("mailto:ops@hab.mars")]
    fn malformed_backend_urls_are_rejected(#[case] raw: &str) {
        let settings = ClientSettings {
            backend_url: Some(raw.to_owned()),
            health_url: None,
            health_interval_secs: None,
            request_timeout_secs: None,
            email: None,
            password: None,
        };
        assert!(settings.backend_url().is_err());
        assert!(settings.health_url().is_err());
    }

    #[rstest]
    fn debug_output_redacts_the_password() {
        let settings = ClientSettings {
            backend_url: None,
            health_url: None,
            health_interval_secs: None,
            request_timeout_secs: None,
            email: Some("watney@mars.gov".to_owned()),
            password: Some("potatoes".to_owned()),
        };
        let rendered = format!("{settings:?}");
        assert!(!rendered.contains("potatoes"));
        assert!(rendered.contains("<redacted>"));
    }
}
