//! Consumption log records: append-only entries of meals a colonist ate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::ids::{ConsumptionLogId, MealId, UserId};
use super::meal::Meal;

/// Number of log entries the dashboard shows.
pub const RECENT_LOG_WINDOW: usize = 5;

/// Consumption log record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumptionLog {
    /// Record id.
    pub id: ConsumptionLogId,
    /// Logged meal.
    pub meal_id: MealId,
    /// Owning colonist.
    pub colonist_id: UserId,
    /// When the meal was logged.
    pub created_at: DateTime<Utc>,
    /// Meal relation, present when requested with `include`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meal: Option<Meal>,
}

impl ConsumptionLog {
    /// Record payload for logging `meal_id` on behalf of `colonist_id`.
    pub fn payload(colonist_id: &UserId, meal_id: &MealId) -> Value {
        json!({
            "mealId": Value::from(meal_id.clone()),
            "colonistId": Value::from(colonist_id.clone()),
        })
    }

    /// Name of the logged meal, when the relation was resolved.
    pub fn meal_name(&self) -> Option<&str> {
        self.meal.as_ref().map(|meal| meal.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn payload_references_meal_and_colonist() {
        let colonist = UserId::new("u-7").expect("user id");
        let meal = MealId::new("meal-42").expect("meal id");
        assert_eq!(
            ConsumptionLog::payload(&colonist, &meal),
            json!({ "mealId": "meal-42", "colonistId": "u-7" })
        );
    }

    #[rstest]
    fn decodes_log_with_meal_relation() {
        let log: ConsumptionLog = serde_json::from_value(json!({
            "id": 1,
            "mealId": 42,
            "colonistId": 7,
            "createdAt": "2025-03-01T08:00:00Z",
            "meal": { "id": 42, "name": "Oat Ration", "calories": 300, "category": "Breakfast" }
        }))
        .expect("log decodes");
        assert_eq!(log.meal_name(), Some("Oat Ration"));
    }
}
