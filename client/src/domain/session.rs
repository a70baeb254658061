//! Client-side authentication session.
//!
//! A single [`Session`] lives for the whole process. Only the session
//! controller writes it; other components observe snapshots.

use serde::Serialize;

use super::user::User;

/// Authentication state machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// No user is signed in.
    Anonymous,
    /// A restore, login, or signup is in progress.
    Authenticating,
    /// A user is signed in.
    Authenticated,
}

/// Snapshot of the authentication session.
///
/// ## Invariants
/// - `status` is [`SessionStatus::Authenticated`] iff `user` is present.
/// - `loading` is true only until the first restore attempt completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    user: Option<User>,
    status: SessionStatus,
    loading: bool,
}

impl Session {
    /// Session as it exists before the startup restore has finished.
    pub fn initial() -> Self {
        Self {
            user: None,
            status: SessionStatus::Anonymous,
            loading: true,
        }
    }

    /// Signed-out session.
    pub fn anonymous() -> Self {
        Self {
            user: None,
            status: SessionStatus::Anonymous,
            loading: false,
        }
    }

    /// Signed-in session for `user`.
    pub fn authenticated(user: User) -> Self {
        Self {
            user: Some(user),
            status: SessionStatus::Authenticated,
            loading: false,
        }
    }

    /// Copy of this session marked as authenticating; any previous user is
    /// dropped so the invariant holds during the transition.
    #[must_use]
    pub fn authenticating(&self) -> Self {
        Self {
            user: None,
            status: SessionStatus::Authenticating,
            loading: self.loading,
        }
    }

    /// Copy of this session with the loading flag set to `loading`.
    #[must_use]
    pub(crate) fn with_loading(mut self, loading: bool) -> Self {
        self.loading = loading;
        self
    }

    /// Current user, present only when authenticated.
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// State machine position.
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// True until the startup restore completes.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Convenience check for [`SessionStatus::Authenticated`].
    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::initial()
    }
}
