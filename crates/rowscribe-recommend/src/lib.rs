//! Task registry and similarity ranking of SQL scripts against it.

mod atomic;
pub mod register;
pub mod similarity;
pub mod store;

pub use register::{NewTask, register_task, register_task_at};
pub use similarity::{DEFAULT_TOP_N, MIN_SIMILARITY, recommend, similarity};
pub use store::{FileTaskStore, MemoryTaskStore, StoreError, StoreResult, TaskStore};
