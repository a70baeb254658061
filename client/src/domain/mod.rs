//! Domain primitives, ports, and client services.
//!
//! Purpose: Define the strongly typed records exchanged with the resource
//! store and the three services that keep client state consistent with it.
//! Types document their invariants and serde contracts in their Rustdoc.
//!
//! Public surface:
//! - Error (alias to `error::Error`): caller-facing failure payload.
//! - Session / SessionStatus: authentication snapshot.
//! - SessionController: owns the session and runs login, signup, logout.
//! - HealthMonitor / HealthState: periodic backend liveness.
//! - DashboardSync: role-scoped meal catalogue and consumption history.

pub mod auth;
pub mod consumption;
pub mod dashboard_sync;
pub mod error;
pub mod health_monitor;
pub mod ids;
mod in_flight;
pub mod meal;
pub mod ports;
mod resource_error_mapping;
pub mod session;
pub mod session_controller;
pub mod user;

pub use self::auth::{CredentialsValidationError, LoginCredentials, SignupRequest};
pub use self::consumption::{ConsumptionLog, RECENT_LOG_WINDOW};
pub use self::dashboard_sync::{ConsumptionHistory, DashboardSync, MealCatalog};
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::health_monitor::{
    DEFAULT_HEALTH_INTERVAL, HealthMonitor, HealthState, MIN_HEALTH_INTERVAL,
};
pub use self::ids::{ConsumptionLogId, FileId, MealId, RecordIdValidationError, RecordKey, UserId};
pub use self::meal::{
    DEFAULT_CREATOR_NAME, DEFAULT_DRAFT_CALORIES, MAX_PHOTO_BYTES, Meal, MealCategory,
    MealCreator, MealDraftValidationError, MealForm, MealPhoto, NewMeal, PendingMealDraft,
    PhotoFile, PhotoPreview,
};
pub use self::resource_error_mapping::AUTHENTICATION_FAILED_MESSAGE;
pub use self::session::{Session, SessionStatus};
pub use self::session_controller::SessionController;
pub use self::user::{Role, User, UserValidationError};
