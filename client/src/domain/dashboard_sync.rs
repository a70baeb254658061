//! Role-scoped dashboard data and mutations.
//!
//! [`DashboardSync`] keeps two lists in step with the backend: the meal
//! catalogue (visible to every role) and the signed-in colonist's
//! consumption history. Lists are only ever replaced by the result of a
//! successful fetch; writes are followed by a refetch of the affected list
//! before they complete. When refreshes of one list overlap, only the most
//! recently started one applies its result and clears the loading flag.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::domain::in_flight::{InFlightGuard, RequestSequence};
use crate::domain::ports::{
    Collection, FindQuery, ResourceClient, ResourceClientError, SortOrder,
};
use crate::domain::resource_error_mapping::map_client_error;
use crate::domain::{
    ConsumptionLog, Error, FileId, Meal, MealForm, MealId, NewMeal, PendingMealDraft, PhotoFile,
    RECENT_LOG_WINDOW, Role, Session, User,
};

const SUBMISSION_IN_PROGRESS: &str = "a meal submission is already in progress";

/// Meal catalogue with its loading flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MealCatalog {
    /// Meals, newest first.
    pub meals: Vec<Meal>,
    /// True while a catalogue fetch is in progress.
    pub loading: bool,
}

impl Default for MealCatalog {
    fn default() -> Self {
        Self {
            meals: Vec::new(),
            loading: true,
        }
    }
}

/// Consumption history of the signed-in colonist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsumptionHistory {
    /// Logs, newest first.
    pub logs: Vec<ConsumptionLog>,
    /// True while a history fetch is in progress.
    pub loading: bool,
}

/// Dashboard state synchronised with the resource store.
///
/// Reads the session through a watch receiver and never writes it.
pub struct DashboardSync {
    client: Arc<dyn ResourceClient>,
    session: watch::Receiver<Session>,
    catalog: watch::Sender<MealCatalog>,
    history: watch::Sender<ConsumptionHistory>,
    form: watch::Sender<MealForm>,
    submitting: AtomicBool,
    meal_requests: RequestSequence,
    log_requests: RequestSequence,
}

impl DashboardSync {
    /// Build a dashboard bound to the given session view.
    pub fn new(client: Arc<dyn ResourceClient>, session: watch::Receiver<Session>) -> Self {
        let (catalog, _) = watch::channel(MealCatalog::default());
        let (history, _) = watch::channel(ConsumptionHistory::default());
        let (form, _) = watch::channel(MealForm::default());
        Self {
            client,
            session,
            catalog,
            history,
            form,
            submitting: AtomicBool::new(false),
            meal_requests: RequestSequence::default(),
            log_requests: RequestSequence::default(),
        }
    }

    /// Snapshot of the catalogue.
    pub fn catalog(&self) -> MealCatalog {
        self.catalog.borrow().clone()
    }

    /// Meals from the last successful fetch.
    pub fn meals(&self) -> Vec<Meal> {
        self.catalog.borrow().meals.clone()
    }

    /// Snapshot of the consumption history.
    pub fn history(&self) -> ConsumptionHistory {
        self.history.borrow().clone()
    }

    /// Logs from the last successful fetch.
    pub fn logs(&self) -> Vec<ConsumptionLog> {
        self.history.borrow().logs.clone()
    }

    /// The newest [`RECENT_LOG_WINDOW`] logs.
    pub fn recent_logs(&self) -> Vec<ConsumptionLog> {
        self.history
            .borrow()
            .logs
            .iter()
            .take(RECENT_LOG_WINDOW)
            .cloned()
            .collect()
    }

    /// Snapshot of the creation form.
    pub fn form(&self) -> MealForm {
        self.form.borrow().clone()
    }

    /// Observe catalogue changes.
    pub fn subscribe_catalog(&self) -> watch::Receiver<MealCatalog> {
        self.catalog.subscribe()
    }

    /// Observe history changes.
    pub fn subscribe_history(&self) -> watch::Receiver<ConsumptionHistory> {
        self.history.subscribe()
    }

    /// Observe form changes.
    pub fn subscribe_form(&self) -> watch::Receiver<MealForm> {
        self.form.subscribe()
    }

    /// Initial mount: load both lists concurrently.
    pub async fn load(&self) {
        tokio::join!(self.load_meals(), self.load_consumption_logs());
    }

    /// Refresh the catalogue, newest first with creators resolved.
    ///
    /// Failures are logged and leave the previous list in place. A result
    /// that arrives after a newer refresh has started is discarded.
    pub async fn load_meals(&self) {
        let ticket = self.meal_requests.issue();
        self.catalog.send_modify(|catalog| catalog.loading = true);
        let query = FindQuery::new()
            .include("creator")
            .order_by("createdAt", SortOrder::Desc);
        let outcome = self.fetch::<Meal>(Collection::Meal, &query).await;

        self.catalog.send_if_modified(|catalog| {
            if !self.meal_requests.is_latest(ticket) {
                debug!(ticket, "superseded meal catalogue fetch discarded");
                return false;
            }
            match outcome {
                Ok(meals) => {
                    debug!(count = meals.len(), "meal catalogue refreshed");
                    catalog.meals = meals;
                }
                Err(err) => error!(error = %err, "failed to load meals"),
            }
            catalog.loading = false;
            true
        });
    }

    /// Refresh the colonist's history, newest first with meals resolved.
    ///
    /// Does nothing unless the session belongs to a colonist. Failures are
    /// logged and leave the previous list in place. As with
    /// [`DashboardSync::load_meals`], superseded results are discarded.
    pub async fn load_consumption_logs(&self) {
        let Some(colonist) = self.current_user().filter(|user| user.role() == Role::Colonist)
        else {
            debug!("consumption history skipped for non-colonist session");
            return;
        };

        let ticket = self.log_requests.issue();
        self.history.send_modify(|history| history.loading = true);
        let query = FindQuery::new()
            .filter_eq("colonistId", colonist.id().to_string())
            .include("meal")
            .order_by("createdAt", SortOrder::Desc);
        let outcome = self
            .fetch::<ConsumptionLog>(Collection::ConsumptionLog, &query)
            .await;

        self.history.send_if_modified(|history| {
            if !self.log_requests.is_latest(ticket) {
                debug!(ticket, "superseded consumption history fetch discarded");
                return false;
            }
            match outcome {
                Ok(logs) => {
                    debug!(count = logs.len(), "consumption history refreshed");
                    history.logs = logs;
                }
                Err(err) => error!(error = %err, "failed to load consumption logs"),
            }
            history.loading = false;
            true
        });
    }

    /// Show the creation form.
    pub fn open_form(&self) {
        self.form.send_modify(|form| form.open = true);
    }

    /// Close the form and discard the draft.
    pub fn cancel_form(&self) {
        self.form.send_replace(MealForm::default());
    }

    /// Edit the text fields of the draft. Attach photos with
    /// [`DashboardSync::select_photo`] so the preview stays in step.
    pub fn edit_draft(&self, edit: impl FnOnce(&mut PendingMealDraft)) {
        self.form.send_modify(|form| {
            edit(&mut form.draft);
            if form.draft.photo_file.is_none() {
                form.preview = None;
            }
        });
    }

    /// Attach a photo to the draft and derive its preview.
    pub fn select_photo(&self, file: PhotoFile) {
        let preview = file.preview();
        self.form.send_modify(|form| {
            form.draft.photo_file = Some(file);
            form.preview = Some(preview);
        });
    }

    /// Remove the draft photo and its preview.
    pub fn clear_photo(&self) {
        self.form.send_modify(|form| {
            form.draft.photo_file = None;
            form.preview = None;
        });
    }

    /// Submit the current form draft; see [`DashboardSync::create_meal`].
    ///
    /// # Errors
    ///
    /// Propagates the failure of [`DashboardSync::create_meal`].
    pub async fn submit_meal_form(&self) -> Result<(), Error> {
        let draft = self.form.borrow().draft.clone();
        self.create_meal(&draft).await
    }

    /// Upload the draft photo if any, create the meal, refresh the
    /// catalogue, then reset the form.
    ///
    /// # Errors
    ///
    /// `Unauthorized` without a session, `Forbidden` for non-scientists,
    /// `InvalidRequest` for invalid drafts, `Conflict` while another
    /// submission runs, otherwise the upload or create failure. On any error
    /// the form and draft are left as they were.
    pub async fn create_meal(&self, draft: &PendingMealDraft) -> Result<(), Error> {
        let creator = self.require_role(Role::Scientist, "create meals")?;
        let meal = draft
            .validate()
            .map_err(|err| Error::invalid_request(err.to_string()))?;
        let _guard = InFlightGuard::acquire(&self.submitting, SUBMISSION_IN_PROGRESS)?;

        self.write_meal(&meal, draft.photo_file.as_ref())
            .await
            .inspect_err(|err| {
                error!(creator_id = %creator.id(), meal = %meal.name, error = %err, "failed to create meal");
            })?;
        info!(creator_id = %creator.id(), meal = %meal.name, "meal created");

        self.load_meals().await;
        self.form.send_replace(MealForm::default());
        Ok(())
    }

    /// Record that the signed-in colonist ate `meal_id`, then refresh the
    /// history.
    ///
    /// Logging is best-effort: a failure is logged here and the history is
    /// left untouched. The error is returned so callers can tell the two
    /// outcomes apart, but presentation layers are not expected to show it.
    ///
    /// # Errors
    ///
    /// `Unauthorized` without a session, `Forbidden` for non-colonists,
    /// otherwise the create failure. Failures are not retried.
    pub async fn log_meal(&self, meal_id: &MealId) -> Result<(), Error> {
        let colonist = self.require_role(Role::Colonist, "log meals")?;
        self.client
            .create(
                Collection::ConsumptionLog,
                ConsumptionLog::payload(colonist.id(), meal_id),
            )
            .await
            .map_err(map_client_error)
            .inspect_err(|err| {
                error!(colonist_id = %colonist.id(), meal_id = %meal_id, error = %err, "failed to log meal");
            })?;
        info!(colonist_id = %colonist.id(), meal_id = %meal_id, "meal logged");

        self.load_consumption_logs().await;
        Ok(())
    }

    async fn write_meal(&self, meal: &NewMeal, photo: Option<&PhotoFile>) -> Result<(), Error> {
        let photo_id: Option<FileId> = match photo {
            Some(file) => {
                let uploaded = self.client.upload(file).await.map_err(map_client_error)?;
                debug!(file_id = %uploaded.id, "meal photo uploaded");
                Some(uploaded.id)
            }
            None => None,
        };
        self.client
            .create(Collection::Meal, meal.to_payload(photo_id.as_ref()))
            .await
            .map_err(map_client_error)?;
        Ok(())
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        collection: Collection,
        query: &FindQuery,
    ) -> Result<Vec<T>, Error> {
        let page = self
            .client
            .find(collection, query)
            .await
            .map_err(map_client_error)?;
        page.data
            .into_iter()
            .map(|record| {
                serde_json::from_value(record).map_err(|err| {
                    map_client_error(ResourceClientError::decode(format!(
                        "{collection} record: {err}"
                    )))
                })
            })
            .collect()
    }

    fn current_user(&self) -> Option<User> {
        self.session.borrow().user().cloned()
    }

    fn require_role(&self, role: Role, action: &str) -> Result<User, Error> {
        let user = self
            .current_user()
            .ok_or_else(|| Error::unauthorized(format!("sign in to {action}")))?;
        if user.role() == role {
            Ok(user)
        } else {
            Err(Error::forbidden(format!("only {role} accounts may {action}")))
        }
    }
}

#[cfg(test)]
#[path = "dashboard_sync_tests.rs"]
mod tests;
