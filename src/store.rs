// Task store: the application state bound to a durable slot

use crate::codec::{self, ImportMode};
use crate::query::ViewQuery;
use crate::slot::Slot;
use crate::state::AppState;
use crate::task::{Task, TaskDraft, normalize};
use eyre::{Context, Result};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info, warn};

/// Default slot key for the serialized collection
pub const DEFAULT_STORAGE_KEY: &str = "taskhub.tasks";

/// Persistent task collection
///
/// Every mutating call rewrites the whole collection to the slot before
/// returning. Calls that change nothing do not write.
pub struct TaskStore<S: Slot> {
    slot: S,
    key: String,
    state: AppState,
}

impl<S: Slot> TaskStore<S> {
    /// Load the collection stored under `key`
    ///
    /// An empty slot yields an empty collection. Unparsable or non-list
    /// content is discarded and the slot is immediately reset to `[]`.
    pub fn open(slot: S, key: impl Into<String>, query: ViewQuery) -> Result<Self> {
        let key = key.into();
        let saved = slot.read(&key)?;

        let mut store = Self {
            slot,
            key,
            state: AppState::new(Vec::new(), query),
        };

        // Nothing saved yet: start empty without writing
        let Some(saved) = saved else {
            info!(key = %store.key, "No saved tasks, starting empty");
            return Ok(store);
        };

        match serde_json::from_str::<Value>(&saved) {
            Ok(Value::Array(items)) => {
                // Repair every record on the way in
                store.state.tasks = items.iter().map(normalize).collect();
                info!(key = %store.key, count = store.state.tasks.len(), "Loaded tasks");
            }
            Ok(_) => {
                warn!(key = %store.key, "Saved tasks are not a list, resetting storage");
                store.persist()?;
            }
            Err(e) => {
                warn!(key = %store.key, error = %e, "Could not read saved tasks, resetting storage");
                store.persist()?;
            }
        }

        Ok(store)
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// View selections and editing reference; not persisted
    pub fn state_mut(&mut self) -> &mut AppState {
        &mut self.state
    }

    pub fn tasks(&self) -> &[Task] {
        &self.state.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.state.find(id)
    }

    pub fn slot(&self) -> &S {
        &self.slot
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Rewrite the whole collection into the slot
    fn persist(&mut self) -> Result<()> {
        let blob = serde_json::to_string(&self.state.tasks).context("Failed to serialize tasks")?;
        self.slot.write(&self.key, &blob)
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Add a task at the front; returns its id, or `None` for a blank title
    pub fn create(&mut self, draft: &TaskDraft) -> Result<Option<String>> {
        let Some(task) = self.state.create(draft, now_ms()) else {
            debug!("create: blank title ignored");
            return Ok(None);
        };
        let id = task.id.clone();

        self.persist()?;
        Ok(Some(id))
    }

    pub fn toggle_completed(&mut self, id: &str) -> Result<bool> {
        if !self.state.toggle_completed(id) {
            return Ok(false);
        }
        debug!(id, "toggle_completed");
        self.persist()?;
        Ok(true)
    }

    pub fn update(&mut self, id: &str, draft: &TaskDraft) -> Result<bool> {
        if !self.state.update(id, draft) {
            return Ok(false);
        }
        debug!(id, "update");
        self.persist()?;
        Ok(true)
    }

    /// Remove a task unconditionally; confirmation is the caller's concern
    pub fn delete(&mut self, id: &str) -> Result<bool> {
        if !self.state.delete(id) {
            return Ok(false);
        }
        debug!(id, "delete");
        self.persist()?;
        Ok(true)
    }

    /// Remove completed tasks, returning how many went
    pub fn clear_completed(&mut self) -> Result<usize> {
        let removed = self.state.clear_completed();
        if removed > 0 {
            debug!(removed, "clear_completed");
            self.persist()?;
        }
        Ok(removed)
    }

    /// Manual reorder; see [`crate::order::move_task`]
    pub fn move_task(&mut self, id: &str, before_id: Option<&str>) -> Result<bool> {
        if !self.state.move_task(id, before_id) {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    /// Install already-validated tasks, returning how many were imported
    pub fn apply_import(&mut self, imported: Vec<Task>, mode: ImportMode) -> Result<usize> {
        let count = imported.len();
        let current = std::mem::take(&mut self.state.tasks);
        let combined = codec::combine(current, imported, mode);
        self.state.replace_tasks(combined);

        self.persist()?;
        info!(%mode, count, total = self.state.tasks.len(), "Imported tasks");
        Ok(count)
    }

    /// Parse, validate and apply an import payload
    ///
    /// On a validation failure the error is a [`codec::ImportError`] and the
    /// collection is untouched.
    pub fn import(&mut self, payload: &str, mode: ImportMode) -> Result<usize> {
        let imported = codec::parse_import(payload)?;
        self.apply_import(imported, mode)
    }

    // ========================================================================
    // Export
    // ========================================================================

    pub fn export(&self) -> Result<String> {
        codec::export(&self.state.tasks)
    }

    pub fn export_to(&self, path: &Path) -> Result<()> {
        codec::write_export(path, &self.state.tasks)
    }
}

// Helper function for timestamps
pub fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("System time before Unix epoch")
        .as_millis() as i64
}
