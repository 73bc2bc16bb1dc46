//! Training plans
//!
//! A plan is either private (only its owner may change it) or public
//! (only admins may change it). Public plans are listed to everyone.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{present, Resource, ResourceKind};
use crate::error::{AppError, AppResult};
use crate::store::{Document, OWNER_FIELD};

pub const PUBLIC_FIELD: &str = "isPublic";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingPlan {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub training_name: String,
    pub category: String,
    /// Plan entries exactly as submitted by the client
    pub training_plan: Vec<Value>,
    #[serde(default)]
    pub is_public: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Resource for TrainingPlan {
    const KIND: ResourceKind = ResourceKind::Training;
    type Listed = TrainingPlan;

    fn owner(&self) -> &str {
        &self.user_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Private,
    Public,
}

impl TrainingPlan {
    pub fn visibility(&self) -> Visibility {
        if self.is_public {
            Visibility::Public
        } else {
            Visibility::Private
        }
    }
}

/// Mutations guarded by [`authorize`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Update,
    Delete,
}

impl Action {
    fn verb(&self) -> &'static str {
        match self {
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

/// Decide whether `principal` may perform `action` on `plan`.
///
/// Public plans need an admin. Private plans need the owner, admin or not.
pub fn authorize(
    plan: &TrainingPlan,
    principal: &str,
    is_admin: bool,
    action: Action,
) -> AppResult<()> {
    match plan.visibility() {
        Visibility::Public if !is_admin => Err(AppError::Forbidden(format!(
            "Only admins can {} public training data.",
            action.verb()
        ))),
        Visibility::Private if plan.user_id != principal => Err(AppError::Forbidden(format!(
            "You are not authorized to {} this training.",
            action.verb()
        ))),
        _ => Ok(()),
    }
}

/// Body of a create request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTraining {
    pub training_name: Option<String>,
    pub category: Option<String>,
    pub training_plan: Option<Vec<Value>>,
    pub is_public: Option<bool>,
}

impl NewTraining {
    /// Whether the client asked for a public plan
    pub fn wants_public(&self) -> bool {
        self.is_public.unwrap_or(false)
    }

    /// Validate and build the document to insert. `is_admin` decides whether
    /// a requested public flag is honoured; non-admins always get a private plan.
    pub fn into_document(self, user_id: &str, is_admin: bool) -> AppResult<Document> {
        let wants_public = self.wants_public();
        let (Some(name), Some(category), Some(plan)) = (
            present(self.training_name),
            present(self.category),
            self.training_plan.filter(|p| !p.is_empty()),
        ) else {
            return Err(AppError::Validation(
                "Please provide all required fields.".to_string(),
            ));
        };

        let mut doc = Document::new();
        doc.insert(OWNER_FIELD.to_string(), Value::from(user_id));
        doc.insert("trainingName".to_string(), Value::from(name.to_lowercase()));
        doc.insert("category".to_string(), Value::from(category.to_lowercase()));
        doc.insert("trainingPlan".to_string(), Value::Array(plan));
        doc.insert(PUBLIC_FIELD.to_string(), Value::from(is_admin && wants_public));
        Ok(doc)
    }
}

/// Body of the admin-only visibility update
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicFlagUpdate {
    pub is_public: Option<bool>,
}

impl PublicFlagUpdate {
    pub fn into_update(self) -> AppResult<Document> {
        let is_public = self
            .is_public
            .ok_or_else(|| AppError::Validation("All field is required to update".to_string()))?;

        let mut update = Document::new();
        update.insert(PUBLIC_FIELD.to_string(), Value::from(is_public));
        Ok(update)
    }
}

/// Body of a request appending entries to an existing plan
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingAppend {
    pub training_plan: Option<Vec<Value>>,
}

impl TrainingAppend {
    /// Build the `$set` document that appends to `existing`
    pub fn append_to(&self, existing: &TrainingPlan) -> AppResult<Document> {
        let additions = self
            .training_plan
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| {
                AppError::Validation("New training plan data is required".to_string())
            })?;

        let mut entries = existing.training_plan.clone();
        entries.extend_from_slice(additions);

        let mut update = Document::new();
        update.insert("trainingPlan".to_string(), Value::Array(entries));
        Ok(update)
    }
}
