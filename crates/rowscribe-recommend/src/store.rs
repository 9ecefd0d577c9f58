use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;
use tracing::{debug, warn};

use rowscribe_core::TaskRecord;

use crate::atomic::{is_temp_file, write_json_atomic};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("task '{0}' already exists")]
    Duplicate(String),
    #[error("invalid task: {0}")]
    Invalid(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Keyed persistence of registered tasks.
pub trait TaskStore: Send + Sync {
    /// Every task, newest first.
    fn list(&self) -> StoreResult<Vec<TaskRecord>>;

    fn get(&self, task_id: &str) -> StoreResult<Option<TaskRecord>>;

    /// Fails with `Duplicate` when the id is taken.
    fn insert(&self, record: TaskRecord) -> StoreResult<()>;

    /// Whether a task was removed.
    fn delete(&self, task_id: &str) -> StoreResult<bool>;
}

fn sort_newest_first(tasks: &mut [TaskRecord]) {
    tasks.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.task_id.cmp(&b.task_id))
    });
}

/// One pretty JSON file per task under a directory.
#[derive(Debug, Clone)]
pub struct FileTaskStore {
    dir: PathBuf,
}

impl FileTaskStore {
    pub fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, task_id: &str) -> StoreResult<PathBuf> {
        let safe = !task_id.is_empty()
            && task_id != "."
            && task_id != ".."
            && task_id
                .chars()
                .all(|ch| ch.is_alphanumeric() || matches!(ch, '-' | '_' | '.'));
        if !safe {
            return Err(StoreError::Invalid(format!(
                "task id '{task_id}' cannot be used as a file name"
            )));
        }
        Ok(self.dir.join(format!("{task_id}.json")))
    }
}

impl TaskStore for FileTaskStore {
    fn list(&self) -> StoreResult<Vec<TaskRecord>> {
        let mut tasks = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if is_temp_file(&path) || path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let data = fs::read(&path)?;
            match serde_json::from_slice::<TaskRecord>(&data) {
                Ok(task) => tasks.push(task),
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping unreadable task file");
                }
            }
        }
        sort_newest_first(&mut tasks);
        debug!(dir = %self.dir.display(), tasks = tasks.len(), "task store listed");
        Ok(tasks)
    }

    fn get(&self, task_id: &str) -> StoreResult<Option<TaskRecord>> {
        let path = self.path_for(task_id)?;
        match fs::read(&path) {
            Ok(data) => Ok(Some(serde_json::from_slice(&data)?)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn insert(&self, record: TaskRecord) -> StoreResult<()> {
        let path = self.path_for(&record.task_id)?;
        if path.exists() {
            return Err(StoreError::Duplicate(record.task_id));
        }
        write_json_atomic(&path, &record)
    }

    fn delete(&self, task_id: &str) -> StoreResult<bool> {
        let path = self.path_for(task_id)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}

/// Process-local store for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryTaskStore {
    tasks: Mutex<BTreeMap<String, TaskRecord>>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_tasks<T>(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, TaskRecord>) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut tasks = self
            .tasks
            .lock()
            .map_err(|_| StoreError::Invalid("task store lock poisoned".to_string()))?;
        f(&mut tasks)
    }
}

impl TaskStore for MemoryTaskStore {
    fn list(&self) -> StoreResult<Vec<TaskRecord>> {
        let mut tasks = self.with_tasks(|tasks| Ok(tasks.values().cloned().collect::<Vec<_>>()))?;
        sort_newest_first(&mut tasks);
        Ok(tasks)
    }

    fn get(&self, task_id: &str) -> StoreResult<Option<TaskRecord>> {
        self.with_tasks(|tasks| Ok(tasks.get(task_id).cloned()))
    }

    fn insert(&self, record: TaskRecord) -> StoreResult<()> {
        self.with_tasks(|tasks| {
            if tasks.contains_key(&record.task_id) {
                return Err(StoreError::Duplicate(record.task_id));
            }
            tasks.insert(record.task_id.clone(), record);
            Ok(())
        })
    }

    fn delete(&self, task_id: &str) -> StoreResult<bool> {
        self.with_tasks(|tasks| Ok(tasks.remove(task_id).is_some()))
    }
}
