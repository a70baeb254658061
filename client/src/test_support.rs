//! Test utilities for the client crate.
//!
//! This module provides in-memory port doubles shared by unit tests (in
//! `src/`) and behaviour tests (in `tests/`). It is compiled for tests and
//! behind the `test-support` feature.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use serde_json::{Map, Value, json};

use crate::domain::ports::{
    AuthStrategy, Collection, FindQuery, HealthProbe, HealthProbeError, ProbeStatus, RecordPage,
    ResourceClient, ResourceClientError, SortOrder, UploadedFile,
};
use crate::domain::{FileId, LoginCredentials, PhotoFile, Role};

/// One call observed by [`InMemoryResourceClient`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClientCall {
    /// `authenticate` with the given strategy.
    Authenticate(AuthStrategy),
    /// `me`.
    Me,
    /// `signup`.
    Signup,
    /// `logout`.
    Logout,
    /// `find` on a collection.
    Find(Collection),
    /// `create` on a collection.
    Create(Collection),
    /// `upload`.
    Upload,
}

struct StoredUser {
    record: Value,
    password: String,
}

#[derive(Default)]
struct StoreState {
    users: Vec<StoredUser>,
    records: HashMap<Collection, Vec<Value>>,
    uploads: Vec<String>,
    current: Option<Value>,
    next_id: u64,
    failures: HashMap<ClientCall, ResourceClientError>,
    latencies: HashMap<ClientCall, VecDeque<Duration>>,
    calls: Vec<ClientCall>,
    queries: Vec<(Collection, FindQuery)>,
}

impl StoreState {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn record(&mut self, call: ClientCall) -> Result<(), ResourceClientError> {
        self.calls.push(call.clone());
        self.failures.get(&call).cloned().map_or(Ok(()), Err)
    }

    fn current_user(&self) -> Result<&Value, ResourceClientError> {
        self.current
            .as_ref()
            .ok_or_else(|| ResourceClientError::unauthorized("no active session"))
    }

    fn resolve(&self, collection: Collection, relation: &str, record: &mut Map<String, Value>) {
        let (key, source) = match (collection, relation) {
            (Collection::Meal, "creator") => ("creatorId", self.user_summaries()),
            (Collection::ConsumptionLog, "meal") => (
                "mealId",
                self.records.get(&Collection::Meal).cloned().unwrap_or_default(),
            ),
            _ => return,
        };
        let resolved = record
            .get(key)
            .and_then(|id| source.into_iter().find(|candidate| candidate.get("id") == Some(id)));
        if let Some(value) = resolved {
            record.insert(relation.to_owned(), value);
        }
    }

    fn user_summaries(&self) -> Vec<Value> {
        self.users
            .iter()
            .map(|user| {
                json!({
                    "id": user.record.get("id").cloned().unwrap_or(Value::Null),
                    "name": user.record.get("name").cloned().unwrap_or(Value::Null),
                })
            })
            .collect()
    }
}

/// In-memory stand-in for the Manifest backend.
///
/// Users authenticate with the password they were seeded or signed up
/// with; records get sequential numeric ids and increasing `createdAt`
/// stamps. Any call can be made to fail with [`InMemoryResourceClient::fail`]
/// or to answer late with [`InMemoryResourceClient::delay`].
#[derive(Default)]
pub struct InMemoryResourceClient {
    state: Mutex<StoreState>,
}

impl InMemoryResourceClient {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user account and return its record.
    pub fn seed_user(&self, email: &str, password: &str, name: &str, role: Role) -> Value {
        let mut state = self.lock();
        let id = state.allocate_id();
        let record = json!({ "id": id, "email": email, "name": name, "role": role.as_str() });
        state.users.push(StoredUser {
            record: record.clone(),
            password: password.to_owned(),
        });
        record
    }

    /// Add a raw record to a collection, stamping `id` and `createdAt` when
    /// absent, and return it.
    pub fn seed_record(&self, collection: Collection, fields: Value) -> Value {
        let mut state = self.lock();
        insert_record(&mut state, collection, fields)
    }

    /// Make every subsequent `call` fail with `error` until
    /// [`InMemoryResourceClient::recover`].
    pub fn fail(&self, call: ClientCall, error: ResourceClientError) {
        self.lock().failures.insert(call, error);
    }

    /// Clear an injected failure.
    pub fn recover(&self, call: &ClientCall) {
        self.lock().failures.remove(call);
    }

    /// Calls observed so far, in order.
    pub fn calls(&self) -> Vec<ClientCall> {
        self.lock().calls.clone()
    }

    /// Queries passed to `find`, in order.
    pub fn queries(&self) -> Vec<(Collection, FindQuery)> {
        self.lock().queries.clone()
    }

    /// Stored records of a collection, in insertion order.
    pub fn records(&self, collection: Collection) -> Vec<Value> {
        self.lock()
            .records
            .get(&collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Names of uploaded files, in order.
    pub fn uploads(&self) -> Vec<String> {
        self.lock().uploads.clone()
    }

    /// Whether a user account exists for `email`.
    pub fn has_user(&self, email: &str) -> bool {
        self.lock()
            .users
            .iter()
            .any(|user| user.record.get("email").and_then(Value::as_str) == Some(email))
    }

    /// Hold back the next responses to `call`, one duration per call.
    ///
    /// The store is read and written when the call arrives; only the reply
    /// is delayed, so a slow call returns the state it saw on arrival.
    pub fn delay(&self, call: ClientCall, latencies: impl IntoIterator<Item = Duration>) {
        self.lock()
            .latencies
            .entry(call)
            .or_default()
            .extend(latencies);
    }

    async fn respond<T, F>(&self, call: ClientCall, handler: F) -> Result<T, ResourceClientError>
    where
        T: Send,
        F: FnOnce(&mut StoreState) -> Result<T, ResourceClientError> + Send,
    {
        let (outcome, latency) = {
            let mut state = self.lock();
            let latency = state
                .latencies
                .get_mut(&call)
                .and_then(VecDeque::pop_front);
            let outcome = state.record(call).and_then(|()| handler(&mut *state));
            (outcome, latency)
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        outcome
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn creation_stamp(sequence: u64) -> DateTime<Utc> {
    let epoch = Utc.with_ymd_and_hms(2035, 11, 7, 0, 0, 0).single().unwrap_or_default();
    epoch + TimeDelta::seconds(i64::try_from(sequence).unwrap_or(i64::MAX))
}

fn insert_record(state: &mut StoreState, collection: Collection, fields: Value) -> Value {
    let sequence = state.allocate_id();
    let mut record = match fields {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("value".to_owned(), other);
            map
        }
    };
    record.entry("id").or_insert_with(|| json!(sequence));
    record
        .entry("createdAt")
        .or_insert_with(|| json!(creation_stamp(sequence).to_rfc3339()));
    let stored = Value::Object(record);
    state
        .records
        .entry(collection)
        .or_default()
        .push(stored.clone());
    stored
}

fn matches_filters(record: &Value, query: &FindQuery) -> bool {
    query.filters().iter().all(|(field, expected)| {
        record.get(field).is_some_and(|value| match value {
            Value::String(text) => text == expected,
            other => other.to_string() == *expected,
        })
    })
}

fn created_at(record: &Value) -> String {
    record
        .get("createdAt")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned()
}

#[async_trait]
impl ResourceClient for InMemoryResourceClient {
    async fn authenticate(
        &self,
        strategy: AuthStrategy,
        _collection: Collection,
        credentials: &LoginCredentials,
    ) -> Result<(), ResourceClientError> {
        self.respond(ClientCall::Authenticate(strategy), |state| {
            let matched = state
                .users
                .iter()
                .find(|user| {
                    user.record.get("email").and_then(Value::as_str) == Some(credentials.email())
                        && user.password == credentials.password()
                })
                .map(|user| user.record.clone());
            match matched {
                Some(record) => {
                    state.current = Some(record);
                    Ok(())
                }
                None => Err(ResourceClientError::unauthorized("Invalid email or password")),
            }
        })
        .await
    }

    async fn me(&self, _collection: Collection) -> Result<Value, ResourceClientError> {
        self.respond(ClientCall::Me, |state| state.current_user().cloned())
            .await
    }

    async fn signup(
        &self,
        _collection: Collection,
        payload: Value,
    ) -> Result<Value, ResourceClientError> {
        self.respond(ClientCall::Signup, |state| {
            let field = |name: &str| {
                payload
                    .get(name)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_owned()
            };
            let email = field("email");
            if state.users.iter().any(|user| {
                user.record.get("email").and_then(Value::as_str) == Some(email.as_str())
            }) {
                return Err(ResourceClientError::rejected(409_u16, "email already registered"));
            }
            let id = state.allocate_id();
            let record = json!({
                "id": id,
                "email": email,
                "name": field("name"),
                "role": field("role"),
            });
            state.users.push(StoredUser {
                record: record.clone(),
                password: field("password"),
            });
            Ok(record)
        })
        .await
    }

    async fn logout(&self) -> Result<(), ResourceClientError> {
        self.respond(ClientCall::Logout, |state| {
            state.current = None;
            Ok(())
        })
        .await
    }

    async fn find(
        &self,
        collection: Collection,
        query: &FindQuery,
    ) -> Result<RecordPage, ResourceClientError> {
        self.respond(ClientCall::Find(collection), |state| {
            state.queries.push((collection, query.clone()));

            let mut data: Vec<Value> = state
                .records
                .get(&collection)
                .map(|records| {
                    records
                        .iter()
                        .filter(|record| matches_filters(record, query))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            if let Some((_, order)) = query.ordering() {
                data.sort_by_key(created_at);
                if order == SortOrder::Desc {
                    data.reverse();
                }
            }
            for record in &mut data {
                if let Value::Object(map) = record {
                    for relation in query.includes() {
                        state.resolve(collection, relation, map);
                    }
                }
            }
            Ok(RecordPage { data })
        })
        .await
    }

    async fn create(
        &self,
        collection: Collection,
        payload: Value,
    ) -> Result<Value, ResourceClientError> {
        self.respond(ClientCall::Create(collection), |state| {
            let creator_id = state.current_user()?.get("id").cloned();

            let mut fields = payload;
            if let (Collection::Meal, Value::Object(map)) = (collection, &mut fields) {
                if let Some(id) = creator_id {
                    map.insert("creatorId".to_owned(), id);
                }
                if let Some(photo_id) = map.get("photoId").cloned() {
                    let url =
                        format!("https://uploads.invalid/{}", photo_id.as_str().unwrap_or_default());
                    map.insert("photo".to_owned(), json!({ "id": photo_id, "url": url }));
                }
            }
            Ok(insert_record(state, collection, fields))
        })
        .await
    }

    async fn upload(&self, file: &PhotoFile) -> Result<UploadedFile, ResourceClientError> {
        self.respond(ClientCall::Upload, |state| {
            state.current_user()?;
            let sequence = state.allocate_id();
            state.uploads.push(file.file_name().to_owned());
            let id = FileId::new(format!("file-{sequence}"))
                .map_err(|err| ResourceClientError::decode(err.to_string()))?;
            Ok(UploadedFile { id })
        })
        .await
    }
}

/// Health probe replaying a script of outcomes.
///
/// Once the script is exhausted the last outcome repeats; an empty script
/// reports `200`.
pub struct ScriptedHealthProbe {
    script: Mutex<VecDeque<Result<ProbeStatus, HealthProbeError>>>,
    last: Mutex<Result<ProbeStatus, HealthProbeError>>,
    probes: AtomicUsize,
}

impl ScriptedHealthProbe {
    /// Probe replaying `script` in order.
    pub fn new(script: impl IntoIterator<Item = Result<ProbeStatus, HealthProbeError>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            last: Mutex::new(Ok(ProbeStatus::new(200))),
            probes: AtomicUsize::new(0),
        }
    }

    /// Probe replaying the given status codes.
    pub fn with_statuses(codes: impl IntoIterator<Item = u16>) -> Self {
        Self::new(codes.into_iter().map(|code| Ok(ProbeStatus::new(code))))
    }

    /// Number of probes issued.
    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HealthProbe for ScriptedHealthProbe {
    async fn probe(&self) -> Result<ProbeStatus, HealthProbeError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        let next = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(outcome) = next {
            *last = outcome;
        }
        last.clone()
    }
}

#[cfg(test)]
mod tests {
    //! Sanity checks for the doubles themselves.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[tokio::test]
    async fn find_filters_orders_and_resolves() {
        let store = InMemoryResourceClient::new();
        let colonist = store.seed_user("watney@mars.gov", "potatoes", "Mark", Role::Colonist);
        let meal = store.seed_record(
            Collection::Meal,
            json!({ "name": "Protein Paste", "calories": 450, "category": "Dinner" }),
        );
        for _ in 0..2 {
            store.seed_record(
                Collection::ConsumptionLog,
                json!({ "mealId": meal.get("id"), "colonistId": colonist.get("id") }),
            );
        }
        store.seed_record(
            Collection::ConsumptionLog,
            json!({ "mealId": meal.get("id"), "colonistId": 999 }),
        );

        let query = FindQuery::new()
            .filter_eq("colonistId", colonist.get("id").map(Value::to_string).unwrap_or_default())
            .include("meal")
            .order_by("createdAt", SortOrder::Desc);
        let page = store
            .find(Collection::ConsumptionLog, &query)
            .await
            .expect("find");

        assert_eq!(page.data.len(), 2);
        let stamps: Vec<_> = page.data.iter().map(created_at).collect();
        assert!(stamps.windows(2).all(|pair| pair.first() > pair.get(1)));
        assert!(page.data.iter().all(|log| log.get("meal").is_some()));
    }

    #[rstest]
    #[tokio::test]
    async fn injected_failures_persist_until_recovered() {
        let store = InMemoryResourceClient::new();
        store.fail(ClientCall::Me, ResourceClientError::transport("offline"));
        assert!(store.me(Collection::User).await.is_err());
        assert!(store.me(Collection::User).await.is_err());

        store.recover(&ClientCall::Me);
        let error = store.me(Collection::User).await.expect_err("still no session");
        assert!(matches!(error, ResourceClientError::Unauthorized { .. }));
        assert_eq!(store.calls().len(), 3);
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn delayed_calls_answer_with_the_state_seen_on_arrival() {
        let store = InMemoryResourceClient::new();
        store.delay(ClientCall::Find(Collection::Meal), [Duration::from_millis(50)]);

        let query = FindQuery::new();
        let slow = store.find(Collection::Meal, &query);
        let write = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            store.seed_record(Collection::Meal, json!({ "name": "Potato" }));
        };
        let (page, ()) = tokio::join!(slow, write);

        assert!(page.expect("find").data.is_empty());
        assert_eq!(store.records(Collection::Meal).len(), 1);
        let again = store.find(Collection::Meal, &query).await;
        assert_eq!(again.expect("find").data.len(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn scripted_probe_repeats_last_outcome() {
        let probe = ScriptedHealthProbe::with_statuses([500, 200]);
        let codes = [
            probe.probe().await.expect("probe").code(),
            probe.probe().await.expect("probe").code(),
            probe.probe().await.expect("probe").code(),
        ];
        assert_eq!(codes, [500, 200, 200]);
        assert_eq!(probe.probes(), 3);
    }
}
