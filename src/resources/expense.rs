//! Expenses

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{lenient_number, normalize_date, present, Resource, ResourceKind};
use crate::error::{AppError, AppResult};
use crate::store::{Document, OWNER_FIELD};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub item: String,
    pub price: f64,
    pub category: String,
    pub date: String,
    pub created_at: String,
    pub updated_at: String,
}

/// An expense as served by list queries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub item: String,
    pub price: f64,
    pub category: String,
    pub date: String,
}

impl Resource for Expense {
    const KIND: ResourceKind = ResourceKind::Expense;
    type Listed = ExpenseSummary;

    fn owner(&self) -> &str {
        &self.user_id
    }
}

/// Body of a create request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewExpense {
    pub item: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub price: Option<f64>,
    pub category: Option<String>,
    pub date: Option<String>,
}

/// A create request carries one expense or a batch
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CreateExpenses {
    Many(Vec<NewExpense>),
    One(NewExpense),
}

/// Zero is rejected along with missing prices
fn valid_price(price: Option<f64>) -> Option<f64> {
    price.filter(|p| p.is_finite() && *p != 0.0)
}

impl NewExpense {
    /// Build the document to insert for `user_id`, or `None` when a
    /// required field is missing
    fn into_document(self, user_id: &str) -> AppResult<Option<Document>> {
        let (Some(item), Some(price), Some(category)) = (
            present(self.item),
            valid_price(self.price),
            present(self.category),
        ) else {
            return Ok(None);
        };
        let date = normalize_date(self.date.as_deref())?;

        let mut doc = Document::new();
        doc.insert(OWNER_FIELD.to_string(), Value::from(user_id));
        doc.insert("item".to_string(), Value::from(item));
        doc.insert("price".to_string(), Value::from(price));
        doc.insert("category".to_string(), Value::from(category));
        doc.insert("date".to_string(), Value::from(date));
        Ok(Some(doc))
    }
}

impl CreateExpenses {
    /// Validate every expense and build the documents to insert.
    /// A single invalid item rejects the whole batch.
    pub fn into_documents(self, user_id: &str) -> AppResult<Vec<Document>> {
        let (expenses, message) = match self {
            CreateExpenses::One(expense) => (
                vec![expense],
                "All fields (item, price, category) are required",
            ),
            CreateExpenses::Many(expenses) => {
                if expenses.is_empty() {
                    return Err(AppError::Validation(
                        "At least one expense is required".to_string(),
                    ));
                }
                (
                    expenses,
                    "All fields (item, price, category) are required for every expense",
                )
            }
        };

        expenses
            .into_iter()
            .map(|expense| {
                expense
                    .into_document(user_id)?
                    .ok_or_else(|| AppError::Validation(message.to_string()))
            })
            .collect()
    }

    pub fn is_batch(&self) -> bool {
        matches!(self, CreateExpenses::Many(_))
    }
}

/// Body of an update request; every field is optional but one is required
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpenseUpdate {
    pub item: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub price: Option<f64>,
    pub category: Option<String>,
    pub date: Option<String>,
}

impl ExpenseUpdate {
    /// Build the `$set` document for this update. Unlike creation, text
    /// fields keep the case they were sent in.
    pub fn into_update(self) -> AppResult<Document> {
        let mut update = Document::new();

        if let Some(item) = present(self.item) {
            update.insert("item".to_string(), Value::from(item));
        }
        if let Some(price) = valid_price(self.price) {
            update.insert("price".to_string(), Value::from(price));
        }
        if let Some(category) = present(self.category) {
            update.insert("category".to_string(), Value::from(category));
        }
        if self.date.as_deref().map(str::trim).is_some_and(|d| !d.is_empty()) {
            let date = normalize_date(self.date.as_deref())?;
            update.insert("date".to_string(), Value::from(date));
        }

        if update.is_empty() {
            return Err(AppError::Validation(
                "At least one field (item, price, category, or date) is required to update"
                    .to_string(),
            ));
        }
        Ok(update)
    }
}
