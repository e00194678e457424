use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named, rule-defined segment of the employee directory. Rules combine
/// with logical AND; an audience with no rules matches everyone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Audience {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub rules: Vec<AudienceRule>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudienceRule {
    pub rule_type: RuleType,
    pub rule_value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleType {
    /// Department name equals (case-insensitive).
    Department,
    /// Location name equals (case-insensitive).
    Location,
    /// Job title contains substring (case-insensitive).
    TitleContains,
    /// Employment status equals.
    Status,
}

impl AudienceRule {
    pub fn new(rule_type: RuleType, rule_value: impl Into<String>) -> Self {
        Self {
            rule_type,
            rule_value: rule_value.into(),
        }
    }

    pub fn department(name: impl Into<String>) -> Self {
        Self::new(RuleType::Department, name)
    }

    pub fn location(name: impl Into<String>) -> Self {
        Self::new(RuleType::Location, name)
    }

    pub fn title_contains(fragment: impl Into<String>) -> Self {
        Self::new(RuleType::TitleContains, fragment)
    }

    pub fn status(status: impl Into<String>) -> Self {
        Self::new(RuleType::Status, status)
    }
}
