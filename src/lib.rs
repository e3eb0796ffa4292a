// TaskHub - task list engine with filtering, manual ordering and JSON import/export

pub mod codec;
pub mod config;
pub mod order;
pub mod query;
pub mod session;
pub mod slot;
pub mod state;
pub mod store;
pub mod task;

// Re-export main types for convenience
pub use codec::{EXPORT_FILE_NAME, ImportError, ImportMode};
pub use config::Config;
pub use query::{SortMode, StatusFilter, ViewQuery};
pub use session::{Collaborator, Outcome, Session};
pub use slot::{MemorySlot, Slot, SqliteSlot};
pub use state::{AppState, EmptyState, Summary};
pub use store::{DEFAULT_STORAGE_KEY, TaskStore, now_ms};
pub use task::{Priority, ShapeError, Task, TaskDraft};
