//! Grid scopes and validity windows

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;

/// Entity level a grid is scoped to
///
/// Precedence is fixed: site > client > group > general.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeType {
    Site,
    Client,
    Group,
    General,
}

impl ScopeType {
    /// Scope levels from highest to lowest precedence
    pub const PRECEDENCE: [ScopeType; 4] = [
        ScopeType::Site,
        ScopeType::Client,
        ScopeType::Group,
        ScopeType::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeType::Site => "site",
            ScopeType::Client => "client",
            ScopeType::Group => "group",
            ScopeType::General => "general",
        }
    }
}

impl fmt::Display for ScopeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scope of a tariff grid
///
/// Only the general scope has no entity id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "entity_id", rename_all = "snake_case")]
pub enum GridScope {
    General,
    Group(String),
    Client(String),
    Site(String),
}

impl GridScope {
    pub fn scope_type(&self) -> ScopeType {
        match self {
            GridScope::General => ScopeType::General,
            GridScope::Group(_) => ScopeType::Group,
            GridScope::Client(_) => ScopeType::Client,
            GridScope::Site(_) => ScopeType::Site,
        }
    }

    /// Entity the grid is attached to (`None` for the general scope)
    pub fn entity_id(&self) -> Option<&str> {
        match self {
            GridScope::General => None,
            GridScope::Group(id) | GridScope::Client(id) | GridScope::Site(id) => Some(id),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        match self.entity_id() {
            Some(id) if id.trim().is_empty() => Err(ValidationError::EmptyScopeEntity),
            _ => Ok(()),
        }
    }
}

/// Validity window, inclusive on both ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validity {
    /// First day the record applies
    pub start: NaiveDate,
    /// Last day the record applies (open-ended when absent)
    #[serde(default)]
    pub end: Option<NaiveDate>,
}

impl Validity {
    /// Open-ended window starting at `start`
    pub fn starting(start: NaiveDate) -> Self {
        Self { start, end: None }
    }

    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }

    /// Whether `date` falls inside the window
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && self.end.map_or(true, |end| date <= end)
    }

    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        match self.end {
            Some(end) if end < self.start => Err(ValidationError::InvertedValidity {
                start: self.start,
                end,
            }),
            _ => Ok(()),
        }
    }
}
