//! Domain resources
//!
//! Each resource is a stored record owned by one user, plus the input
//! structs its endpoints accept. Input structs validate themselves and
//! produce store documents.

pub mod expense;
pub mod todo;
pub mod training;

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeZone, Utc};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};

use crate::error::{AppError, AppResult};
use crate::store::query::now_timestamp;

pub use expense::{Expense, ExpenseSummary};
pub use todo::{Task, Todo};
pub use training::{TrainingPlan, Visibility};

/// The kinds of resource the service stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Expense,
    Training,
    Todo,
}

impl ResourceKind {
    /// Name used in cache keys and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Expense => "expense",
            ResourceKind::Training => "training",
            ResourceKind::Todo => "todo",
        }
    }

    /// Store collection holding this resource
    pub fn collection(&self) -> &'static str {
        match self {
            ResourceKind::Expense => "expenses",
            ResourceKind::Training => "trainings",
            ResourceKind::Todo => "todos",
        }
    }

    /// Sort field used when a list query names none
    pub fn default_sort(&self) -> &'static str {
        match self {
            ResourceKind::Expense => "date",
            ResourceKind::Training | ResourceKind::Todo => "createdAt",
        }
    }

    /// Bookkeeping fields stripped from list results
    pub fn hidden_fields(&self) -> &'static [&'static str] {
        match self {
            ResourceKind::Expense => &["userId", "createdAt", "updatedAt", "__v"],
            ResourceKind::Training | ResourceKind::Todo => &["__v"],
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored record owned by exactly one user
pub trait Resource: Serialize + DeserializeOwned + Send + Sync + 'static {
    const KIND: ResourceKind;

    /// Shape served by list queries once bookkeeping fields are stripped
    type Listed: Serialize + DeserializeOwned + Send + Sync + 'static;

    fn owner(&self) -> &str;
}

/// Trimmed, non-empty text or `None`
pub(crate) fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Normalize a client-supplied date to the stored timestamp format.
/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM:SS` (UTC) and `YYYY-MM-DD`.
/// A missing date means now.
pub fn normalize_date(raw: Option<&str>) -> AppResult<String> {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(now_timestamp());
    };

    let parsed = DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
                .map(|naive| Utc.from_utc_datetime(&naive))
        })
        .or_else(|_| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map(|date| Utc.from_utc_datetime(&date.and_time(NaiveTime::default())))
        })
        .map_err(|_| AppError::Validation(format!("Invalid date: {}", raw)))?;

    Ok(parsed.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Accept a JSON number or a numeric string
pub(crate) fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(f64),
        Text(String),
    }

    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(n)) => Ok(Some(n)),
        Some(NumberOrString::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid number: {}", s))),
    }
}
