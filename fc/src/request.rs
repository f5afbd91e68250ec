//! Request validation at the edge of the pipeline

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Rejections raised before orchestration starts
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Missing query or userId.")]
    MissingField,

    #[error("Invalid start_date format. Use YYYY-MM-DD.")]
    InvalidStartDate,
}

/// A request as it arrives over the wire
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawQuery {
    pub query: Option<String>,
    #[serde(alias = "userId")]
    pub user_id: Option<String>,
    #[serde(alias = "isWeekly")]
    pub is_weekly: Option<Value>,
    #[serde(alias = "startDate")]
    pub start_date: Option<String>,
}

/// A validated request
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub query: String,
    pub user_id: String,
    pub is_weekly: bool,
    pub start_date: Option<NaiveDate>,
}

/// Booleans pass through; strings are true only for "true" in any case
fn truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}

impl QueryRequest {
    pub fn new(query: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            user_id: user_id.into(),
            is_weekly: false,
            start_date: None,
        }
    }

    pub fn weekly(mut self, is_weekly: bool) -> Self {
        self.is_weekly = is_weekly;
        self
    }

    pub fn starting(mut self, date: NaiveDate) -> Self {
        self.start_date = Some(date);
        self
    }

    /// Number of days a plan request covers
    pub fn days(&self) -> usize {
        if self.is_weekly { 7 } else { 1 }
    }
}

impl TryFrom<RawQuery> for QueryRequest {
    type Error = ValidationError;

    fn try_from(raw: RawQuery) -> Result<Self, Self::Error> {
        let query = raw.query.filter(|q| !q.trim().is_empty());
        let user_id = raw.user_id.filter(|u| !u.trim().is_empty());
        let (Some(query), Some(user_id)) = (query, user_id) else {
            return Err(ValidationError::MissingField);
        };

        let start_date = match raw.start_date.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) => Some(NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| ValidationError::InvalidStartDate)?),
            None => None,
        };

        Ok(Self {
            query,
            user_id,
            is_weekly: truthy(raw.is_weekly.as_ref()),
            start_date,
        })
    }
}

/// What the caller receives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub response: String,
}

impl QueryResponse {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }
}
