//! Session controller: the client's authentication state machine.
//!
//! States move `Anonymous -> Authenticating -> Authenticated` and back to
//! `Anonymous` on logout. Within one operation every step is sequential:
//! authenticate, fetch the current user, then transition. Authentication
//! walks an ordered list of named strategies and only the exhausted list is
//! an error.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::domain::in_flight::InFlightGuard;
use crate::domain::ports::{AuthStrategy, Collection, ResourceClient, ResourceClientError};
use crate::domain::resource_error_mapping::map_client_error;
use crate::domain::{Error, LoginCredentials, Session, SignupRequest, User};

const AUTH_IN_PROGRESS: &str = "an authentication request is already in progress";

/// Owner of the process-wide [`Session`].
///
/// Other components observe the session through [`SessionController::subscribe`];
/// only this controller writes it.
pub struct SessionController {
    client: Arc<dyn ResourceClient>,
    strategies: Vec<AuthStrategy>,
    session: watch::Sender<Session>,
    in_flight: AtomicBool,
}

impl SessionController {
    /// Build a controller using [`AuthStrategy::DEFAULT_ORDER`].
    pub fn new(client: Arc<dyn ResourceClient>) -> Self {
        Self::with_strategies(client, AuthStrategy::DEFAULT_ORDER.to_vec())
    }

    /// Build a controller with an explicit strategy order.
    pub fn with_strategies(client: Arc<dyn ResourceClient>, strategies: Vec<AuthStrategy>) -> Self {
        let (session, _) = watch::channel(Session::initial());
        Self {
            client,
            strategies,
            session,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Snapshot of the current session.
    pub fn session(&self) -> Session {
        self.session.borrow().clone()
    }

    /// Read-only view of the session for dependent components.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.session.subscribe()
    }

    /// Restore an existing backend session on startup.
    ///
    /// A missing or expired session is expected and never surfaced; the
    /// session ends Anonymous. The loading flag is cleared on every path.
    /// Restore shares the authentication in-flight flag with login and
    /// signup: while one of those runs, restore only clears the loading flag
    /// and leaves the outcome to that operation.
    pub async fn restore(&self) {
        let Ok(_guard) = InFlightGuard::acquire(&self.in_flight, AUTH_IN_PROGRESS) else {
            debug!("authentication already in flight; skipping session restore");
            self.session
                .send_modify(|session| *session = session.clone().with_loading(false));
            return;
        };

        self.session.send_modify(|session| *session = session.authenticating());
        match self.fetch_current_user().await {
            Ok(user) => {
                info!(user_id = %user.id(), role = %user.role(), "restored existing session");
                self.session.send_replace(Session::authenticated(user));
            }
            Err(error) => {
                debug!(error = %error, "no session to restore");
                self.session.send_replace(Session::anonymous());
            }
        }
    }

    /// Log in with the given form values.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` for blank inputs, `Conflict` when another
    /// authentication is in flight, and the last strategy's failure when every
    /// strategy fails. The session is left as it was on failure.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, Error> {
        let credentials = LoginCredentials::try_from_parts(email, password)
            .map_err(|err| Error::invalid_request(err.to_string()))?;
        let _guard = InFlightGuard::acquire(&self.in_flight, AUTH_IN_PROGRESS)?;
        self.establish(&credentials).await
    }

    /// Create an account and log straight into it.
    ///
    /// If the record is created but every login strategy then fails, the error
    /// propagates and no session is established; the remote user remains.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` for invalid form values, `Conflict` when
    /// another authentication is in flight, or the signup/login failure.
    pub async fn signup(&self, request: &SignupRequest) -> Result<User, Error> {
        let _guard = InFlightGuard::acquire(&self.in_flight, AUTH_IN_PROGRESS)?;
        self.client
            .signup(Collection::User, request.to_payload())
            .await
            .map_err(map_client_error)?;
        info!(email = request.credentials().email(), role = %request.role(), "created user record");

        self.establish(request.credentials()).await.inspect_err(|error| {
            warn!(
                email = request.credentials().email(),
                error = %error,
                "user record created but automatic login failed"
            );
        })
    }

    /// End the session. Local state always becomes Anonymous, even when the
    /// backend call fails.
    pub async fn logout(&self) {
        if let Err(error) = self.client.logout().await {
            warn!(
                error = %error,
                error_kind = error.kind(),
                "backend logout failed; clearing local session anyway"
            );
        }
        self.session.send_replace(Session::anonymous());
        info!("session cleared");
    }

    async fn establish(&self, credentials: &LoginCredentials) -> Result<User, Error> {
        let previous = self.session();
        self.session.send_replace(previous.authenticating());

        let result = match self.authenticate(credentials).await {
            Ok(strategy) => self
                .fetch_current_user()
                .await
                .inspect(|user| {
                    info!(user_id = %user.id(), role = %user.role(), strategy = %strategy, "logged in");
                }),
            Err(error) => Err(error),
        };

        match result {
            Ok(user) => {
                self.session.send_replace(Session::authenticated(user.clone()));
                Ok(user)
            }
            Err(error) => {
                // Loading may have been cleared by a restore that ran meanwhile.
                self.session.send_modify(|current| {
                    let loading = current.is_loading();
                    *current = previous.with_loading(loading);
                });
                Err(error)
            }
        }
    }

    async fn authenticate(&self, credentials: &LoginCredentials) -> Result<AuthStrategy, Error> {
        let mut last_error = None;
        for (index, strategy) in self.strategies.iter().copied().enumerate() {
            match self
                .client
                .authenticate(strategy, Collection::User, credentials)
                .await
            {
                Ok(()) => return Ok(strategy),
                Err(error) => {
                    if let Some(next) = self.strategies.get(index + 1) {
                        warn!(
                            strategy = %strategy,
                            next = %next,
                            error = %error,
                            error_kind = error.kind(),
                            "authentication strategy failed; falling back"
                        );
                    }
                    last_error = Some(error);
                }
            }
        }

        Err(last_error.map_or_else(
            || Error::internal("no authentication strategies configured"),
            map_client_error,
        ))
    }

    async fn fetch_current_user(&self) -> Result<User, Error> {
        let record = self
            .client
            .me(Collection::User)
            .await
            .map_err(map_client_error)?;
        decode_user(record)
    }
}

fn decode_user(record: Value) -> Result<User, Error> {
    serde_json::from_value(record)
        .map_err(|err| map_client_error(ResourceClientError::decode(format!("user record: {err}"))))
}

#[cfg(test)]
#[path = "session_controller_tests.rs"]
mod tests;
