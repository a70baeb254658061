//! Driven port for the remote resource store.
//!
//! The backend-as-a-service exposes typed CRUD over named collections,
//! authentication, and file upload. Services depend only on this contract;
//! the reqwest adapter lives in `outbound::manifest` and tests substitute
//! in-memory doubles.

use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::domain::{FileId, LoginCredentials, PhotoFile};

use super::define_port_error;

define_port_error! {
    /// Errors raised by resource client adapters.
    pub enum ResourceClientError {
        /// The backend could not be reached.
        Transport { message: String } => "resource store unreachable: {message}",
        /// The request did not complete in time.
        Timeout { message: String } => "resource store timed out: {message}",
        /// Credentials or session token were rejected.
        Unauthorized { message: String } => "{message}",
        /// The record or endpoint does not exist.
        NotFound { message: String } => "{message}",
        /// Any other non-success response.
        Rejected { status: u16, message: String } => "{message} (status {status})",
        /// The response body did not match the expected shape.
        Decode { message: String } => "invalid resource store response: {message}",
    }
}

/// Named collections of the remote store used by this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Authenticable `User` entity.
    User,
    /// Meal catalogue.
    Meal,
    /// Colonist consumption history.
    ConsumptionLog,
}

impl Collection {
    /// Entity name as declared in the backend schema.
    pub fn name(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Meal => "Meal",
            Self::ConsumptionLog => "ConsumptionLog",
        }
    }

    /// URL slug of the collection.
    pub fn slug(self) -> &'static str {
        match self {
            Self::User => "users",
            Self::Meal => "meals",
            Self::ConsumptionLog => "consumption-logs",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Named authentication methods offered by the backend.
///
/// The session controller tries these in order; see
/// [`AuthStrategy::DEFAULT_ORDER`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthStrategy {
    /// Dedicated authentication endpoint for the entity.
    AuthEndpoint,
    /// Login routed through the collection endpoint.
    CollectionEndpoint,
}

impl AuthStrategy {
    /// Preferred strategy first, fallback second.
    pub const DEFAULT_ORDER: [Self; 2] = [Self::AuthEndpoint, Self::CollectionEndpoint];

    /// Stable name used in logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::AuthEndpoint => "auth_endpoint",
            Self::CollectionEndpoint => "collection_endpoint",
        }
    }
}

impl fmt::Display for AuthStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sort direction for [`FindQuery`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortOrder {
    /// Oldest first.
    Asc,
    /// Newest first.
    Desc,
}

impl SortOrder {
    /// Wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Query options for [`ResourceClient::find`].
///
/// # Examples
/// ```
/// use marsfood_client::domain::ports::{FindQuery, SortOrder};
///
/// let query = FindQuery::new()
///     .filter_eq("colonistId", "7")
///     .include("meal")
///     .order_by("createdAt", SortOrder::Desc);
/// assert_eq!(query.includes(), ["meal"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindQuery {
    filters: Vec<(String, String)>,
    includes: Vec<String>,
    order_by: Option<(String, SortOrder)>,
}

impl FindQuery {
    /// Empty query: every record, backend default order.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to records whose `field` equals `value`.
    #[must_use]
    pub fn filter_eq(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    /// Resolve the named relation on every returned record.
    #[must_use]
    pub fn include(mut self, relation: impl Into<String>) -> Self {
        self.includes.push(relation.into());
        self
    }

    /// Order results by `field`.
    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.order_by = Some((field.into(), order));
        self
    }

    /// Equality filters in insertion order.
    pub fn filters(&self) -> &[(String, String)] {
        &self.filters
    }

    /// Relations to resolve.
    pub fn includes(&self) -> &[String] {
        &self.includes
    }

    /// Sort field and direction, if any.
    pub fn ordering(&self) -> Option<(&str, SortOrder)> {
        self.order_by
            .as_ref()
            .map(|(field, order)| (field.as_str(), *order))
    }
}

/// One page of records returned by [`ResourceClient::find`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RecordPage {
    /// Raw records; services decode them into domain types.
    #[serde(default)]
    pub data: Vec<Value>,
}

/// Reference to an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadedFile {
    /// File id to attach to records.
    pub id: FileId,
}

/// Port for the generic resource-access contract.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// Establish a session for `collection` using one named strategy.
    async fn authenticate(
        &self,
        strategy: AuthStrategy,
        collection: Collection,
        credentials: &LoginCredentials,
    ) -> Result<(), ResourceClientError>;

    /// Fetch the record of the currently authenticated entity.
    async fn me(&self, collection: Collection) -> Result<Value, ResourceClientError>;

    /// Create an authenticable record.
    async fn signup(
        &self,
        collection: Collection,
        payload: Value,
    ) -> Result<Value, ResourceClientError>;

    /// Invalidate the current session.
    async fn logout(&self) -> Result<(), ResourceClientError>;

    /// List records of `collection`.
    async fn find(
        &self,
        collection: Collection,
        query: &FindQuery,
    ) -> Result<RecordPage, ResourceClientError>;

    /// Create a record in `collection`.
    async fn create(
        &self,
        collection: Collection,
        payload: Value,
    ) -> Result<Value, ResourceClientError>;

    /// Upload a file and return its reference.
    async fn upload(&self, file: &PhotoFile) -> Result<UploadedFile, ResourceClientError>;
}
