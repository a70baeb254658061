//! Meal catalogue records and the client-only creation draft.

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ids::{FileId, MealId, UserId};

/// Creator label shown when a meal has no resolved creator.
pub const DEFAULT_CREATOR_NAME: &str = "Genesis Lab";
/// Calories pre-filled on a fresh draft.
pub const DEFAULT_DRAFT_CALORIES: i64 = 200;
/// Largest photo accepted by the creation form.
pub const MAX_PHOTO_BYTES: usize = 10 * 1024 * 1024;

/// Meal slot a formula is designed for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MealCategory {
    /// Morning meal.
    Breakfast,
    /// Midday meal.
    #[default]
    Lunch,
    /// Evening meal.
    Dinner,
    /// Between meals.
    Snack,
}

impl MealCategory {
    /// Every category, in form display order.
    pub const ALL: [Self; 4] = [Self::Breakfast, Self::Lunch, Self::Dinner, Self::Snack];

    /// Wire and display label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Breakfast => "Breakfast",
            Self::Lunch => "Lunch",
            Self::Dinner => "Dinner",
            Self::Snack => "Snack",
        }
    }
}

impl fmt::Display for MealCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved creator relation of a meal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealCreator {
    /// Creator record id, when the relation was resolved.
    #[serde(default)]
    pub id: Option<UserId>,
    /// Creator display name.
    #[serde(default)]
    pub name: Option<String>,
}

/// Uploaded photo attached to a meal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealPhoto {
    /// File reference returned by the upload endpoint.
    #[serde(default)]
    pub id: Option<FileId>,
    /// Public URL of the stored image.
    #[serde(default)]
    pub url: Option<String>,
}

/// Meal record from the catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meal {
    /// Record id.
    pub id: MealId,
    /// Formula name.
    pub name: String,
    /// Free-text description; absent descriptions decode as empty.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    /// Energy content in kilocalories.
    pub calories: u32,
    /// Meal slot.
    pub category: MealCategory,
    /// Optional photo.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<MealPhoto>,
    /// Creator relation, present when requested with `include`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<MealCreator>,
    /// Creation timestamp used for catalogue ordering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Meal {
    /// Creator label for display, falling back to [`DEFAULT_CREATOR_NAME`].
    pub fn creator_name(&self) -> &str {
        self.creator
            .as_ref()
            .and_then(|creator| creator.name.as_deref())
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(DEFAULT_CREATOR_NAME)
    }

    /// Photo URL, when one was uploaded.
    pub fn photo_url(&self) -> Option<&str> {
        self.photo.as_ref().and_then(|photo| photo.url.as_deref())
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Validation errors for meal drafts and photos.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MealDraftValidationError {
    /// Name was blank once trimmed.
    #[error("meal name must not be empty")]
    EmptyName,
    /// Calories were negative or out of range.
    #[error("calories must be between 0 and {max}")]
    CaloriesOutOfRange {
        /// Upper bound accepted by the record.
        max: u32,
    },
    /// The selected file is not an image.
    #[error("photo must be an image, got `{content_type}`")]
    NotAnImage {
        /// Content type reported for the file.
        content_type: String,
    },
    /// The selected file exceeds [`MAX_PHOTO_BYTES`].
    #[error("photo must be at most {max} bytes")]
    PhotoTooLarge {
        /// Size limit in bytes.
        max: usize,
    },
}

/// Image chosen in the creation form, held in memory until upload.
#[derive(Clone, PartialEq, Eq)]
pub struct PhotoFile {
    file_name: String,
    content_type: String,
    bytes: Vec<u8>,
}

impl PhotoFile {
    /// Validate an in-memory image file.
    pub fn try_new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<Self, MealDraftValidationError> {
        let content_type = content_type.into();
        if !content_type.starts_with("image/") {
            return Err(MealDraftValidationError::NotAnImage { content_type });
        }
        if bytes.len() > MAX_PHOTO_BYTES {
            return Err(MealDraftValidationError::PhotoTooLarge {
                max: MAX_PHOTO_BYTES,
            });
        }
        Ok(Self {
            file_name: file_name.into(),
            content_type,
            bytes,
        })
    }

    /// Original file name.
    pub fn file_name(&self) -> &str {
        self.file_name.as_str()
    }

    /// MIME type, always `image/*`.
    pub fn content_type(&self) -> &str {
        self.content_type.as_str()
    }

    /// Raw file contents.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Derive a preview handle the view can render before upload.
    pub fn preview(&self) -> PhotoPreview {
        PhotoPreview(format!(
            "data:{};base64,{}",
            self.content_type,
            STANDARD.encode(&self.bytes)
        ))
    }
}

impl fmt::Debug for PhotoFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhotoFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Renderable preview of a selected photo (a `data:` URI).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoPreview(String);

impl AsRef<str> for PhotoPreview {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

/// Transient creation-form state; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMealDraft {
    /// Formula name.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Calories as typed; validated on submit.
    pub calories: i64,
    /// Selected category.
    pub category: MealCategory,
    /// Optional photo awaiting upload.
    pub photo_file: Option<PhotoFile>,
}

impl Default for PendingMealDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            calories: DEFAULT_DRAFT_CALORIES,
            category: MealCategory::default(),
            photo_file: None,
        }
    }
}

impl PendingMealDraft {
    /// Validate the draft into the fields of a new meal record.
    pub fn validate(&self) -> Result<NewMeal, MealDraftValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(MealDraftValidationError::EmptyName);
        }
        let calories = u32::try_from(self.calories)
            .map_err(|_| MealDraftValidationError::CaloriesOutOfRange { max: u32::MAX })?;
        Ok(NewMeal {
            name: name.to_owned(),
            description: self.description.clone(),
            calories,
            category: self.category,
        })
    }
}

/// Validated meal fields ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMeal {
    /// Formula name, trimmed.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Energy content in kilocalories.
    pub calories: u32,
    /// Meal slot.
    pub category: MealCategory,
}

impl NewMeal {
    /// Record payload; `photoId` is only present when a photo was uploaded.
    pub fn to_payload(&self, photo: Option<&FileId>) -> Value {
        let mut payload = Map::new();
        payload.insert("name".to_owned(), Value::from(self.name.as_str()));
        payload.insert(
            "description".to_owned(),
            Value::from(self.description.as_str()),
        );
        payload.insert("calories".to_owned(), Value::from(self.calories));
        payload.insert("category".to_owned(), Value::from(self.category.as_str()));
        if let Some(photo) = photo {
            payload.insert("photoId".to_owned(), Value::from(photo.clone()));
        }
        Value::Object(payload)
    }
}

/// Open/closed state of the creation form plus its draft.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MealForm {
    /// Whether the form is currently shown.
    pub open: bool,
    /// Current draft contents.
    pub draft: PendingMealDraft,
    /// Preview derived from `draft.photo_file`.
    pub preview: Option<PhotoPreview>,
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    fn decodes_meal_with_relations() {
        let meal: Meal = serde_json::from_value(json!({
            "id": 9,
            "name": "Protein Paste",
            "description": null,
            "calories": 450,
            "category": "Dinner",
            "photo": { "id": "f1", "url": "https://cdn.mars/p.png" },
            "creator": { "id": 2, "name": "Dr. Weir" },
            "createdAt": "2025-03-01T12:00:00Z"
        }))
        .expect("meal decodes");

        assert_eq!(meal.description, "");
        assert_eq!(meal.creator_name(), "Dr. Weir");
        assert_eq!(meal.photo_url(), Some("https://cdn.mars/p.png"));
    }

    #[rstest]
    fn creator_name_falls_back_when_unresolved() {
        let meal: Meal = serde_json::from_value(json!({
            "id": "m1", "name": "Algae Bar", "calories": 120, "category": "Snack"
        }))
        .expect("meal decodes");
        assert_eq!(meal.creator_name(), DEFAULT_CREATOR_NAME);
    }

    #[rstest]
    fn fresh_draft_uses_form_defaults() {
        let draft = PendingMealDraft::default();
        assert_eq!(draft.calories, 200);
        assert_eq!(draft.category, MealCategory::Lunch);
        assert!(draft.photo_file.is_none());
    }

    #[rstest]
    #[case("  ", 100, MealDraftValidationError::EmptyName)]
    #[case("Stew", -5, MealDraftValidationError::CaloriesOutOfRange { max: u32::MAX })]
    fn invalid_drafts_are_rejected(
        #[case] name: &str,
        #[case] calories: i64,
        #[case] expected: MealDraftValidationError,
    ) {
        let draft = PendingMealDraft {
            name: name.to_owned(),
            calories,
            ..PendingMealDraft::default()
        };
        assert_eq!(draft.validate(), Err(expected));
    }

    #[rstest]
    fn payload_omits_photo_id_without_upload() {
        let draft = PendingMealDraft {
            name: "Protein Paste".to_owned(),
            calories: 450,
            category: MealCategory::Dinner,
            ..PendingMealDraft::default()
        };
        let payload = draft.validate().expect("valid draft").to_payload(None);
        assert_eq!(
            payload,
            json!({ "name": "Protein Paste", "description": "", "calories": 450, "category": "Dinner" })
        );
    }

    #[rstest]
    fn payload_includes_uploaded_photo_id() {
        let draft = PendingMealDraft {
            name: "Kelp".to_owned(),
            ..PendingMealDraft::default()
        };
        let file = FileId::new("file-1").expect("file id");
        let payload = draft.validate().expect("valid draft").to_payload(Some(&file));
        assert_eq!(payload.get("photoId"), Some(&json!("file-1")));
    }

    #[rstest]
    fn photo_preview_is_a_data_uri() {
        let photo = PhotoFile::try_new("p.png", "image/png", vec![1, 2, 3]).expect("valid photo");
        assert_eq!(photo.preview().as_ref(), "data:image/png;base64,AQID");
    }

    #[rstest]
    fn non_images_are_rejected() {
        let err = PhotoFile::try_new("notes.txt", "text/plain", Vec::new())
            .expect_err("text is not an image");
        assert!(matches!(err, MealDraftValidationError::NotAnImage { .. }));
    }
}
