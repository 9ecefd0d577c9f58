use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A registered migration artifact used as a similarity-search corpus entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TaskRecord {
    /// Unique key, conventionally `PREFIX-YYYY-NNNNN`.
    pub task_id: String,
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    pub sql: String,
    #[serde(default)]
    pub author: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TaskRecord {
    /// Whether `task_id` follows the `PREFIX-YYYY-NNNNN` convention.
    pub fn has_conventional_id(&self) -> bool {
        let mut parts = self.task_id.split('-');
        let (Some(prefix), Some(year), Some(serial), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return false;
        };
        !prefix.is_empty()
            && prefix.chars().all(|ch| ch.is_ascii_uppercase())
            && year.len() == 4
            && year.chars().all(|ch| ch.is_ascii_digit())
            && !serial.is_empty()
            && serial.chars().all(|ch| ch.is_ascii_digit())
    }
}

/// A ranked corpus entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Recommendation {
    pub task: TaskRecord,
    /// Score in `[0, 100]`.
    pub similarity: f64,
}
