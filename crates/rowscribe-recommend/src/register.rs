use chrono::{DateTime, Utc};
use tracing::{info, warn};

use rowscribe_core::TaskRecord;

use crate::store::{StoreError, StoreResult, TaskStore};

/// Operator input for a task registration.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub task_id: String,
    pub title: String,
    pub content: Option<String>,
    pub sql: String,
    pub author: Option<String>,
}

impl NewTask {
    fn into_record(self, created_at: DateTime<Utc>) -> StoreResult<TaskRecord> {
        let task_id = required("task_id", &self.task_id)?;
        let title = required("title", &self.title)?;
        let sql = required("sql", &self.sql)?;
        Ok(TaskRecord {
            task_id,
            title,
            content: optional(self.content),
            sql,
            author: optional(self.author),
            created_at,
        })
    }
}

fn required(field: &str, value: &str) -> StoreResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(StoreError::Invalid(format!("{field} is required")));
    }
    Ok(value.to_string())
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Validate and store a task stamped with the current time.
pub fn register_task(store: &dyn TaskStore, task: NewTask) -> StoreResult<TaskRecord> {
    register_task_at(store, task, Utc::now())
}

pub fn register_task_at(
    store: &dyn TaskStore,
    task: NewTask,
    created_at: DateTime<Utc>,
) -> StoreResult<TaskRecord> {
    let record = task.into_record(created_at)?;
    if !record.has_conventional_id() {
        warn!(
            task_id = %record.task_id,
            "task id does not follow the PREFIX-YYYY-NNNNN convention"
        );
    }
    if store.get(&record.task_id)?.is_some() {
        return Err(StoreError::Duplicate(record.task_id));
    }
    store.insert(record.clone())?;
    info!(task_id = %record.task_id, sql_len = record.sql.len(), "task registered");
    Ok(record)
}
