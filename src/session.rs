// Confirmation-gated front door used by user interfaces

use crate::codec::{self, ImportMode};
use crate::slot::Slot;
use crate::state::AppState;
use crate::store::TaskStore;
use crate::task::TaskDraft;
use eyre::Result;
use tracing::debug;

/// Callbacks a UI provides to the session
pub trait Collaborator {
    /// Ask a yes/no question before a destructive operation
    fn confirm(&mut self, prompt: &str) -> bool;

    /// Called after every successful mutation, once it is persisted
    fn refresh(&mut self, state: &AppState);
}

/// Result of a session operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Unchanged,
    Declined,
}

/// Task store driven by a collaborator for prompts and re-rendering
pub struct Session<S: Slot, C: Collaborator> {
    store: TaskStore<S>,
    ui: C,
}

impl<S: Slot, C: Collaborator> Session<S, C> {
    pub fn new(store: TaskStore<S>, ui: C) -> Self {
        Self { store, ui }
    }

    pub fn store(&self) -> &TaskStore<S> {
        &self.store
    }

    pub fn state(&self) -> &AppState {
        self.store.state()
    }

    /// View selections and editing reference, changed without a refresh
    pub fn state_mut(&mut self) -> &mut AppState {
        self.store.state_mut()
    }

    pub fn ui(&self) -> &C {
        &self.ui
    }

    pub fn into_parts(self) -> (TaskStore<S>, C) {
        (self.store, self.ui)
    }

    fn finish(&mut self, changed: bool) -> Outcome {
        if changed {
            self.ui.refresh(self.store.state());
            Outcome::Applied
        } else {
            Outcome::Unchanged
        }
    }

    /// Re-render without mutating, e.g. after a view selection changed
    pub fn with_state<F: FnOnce(&mut AppState)>(&mut self, f: F) {
        f(self.store.state_mut());
        self.ui.refresh(self.store.state());
    }

    pub fn add(&mut self, draft: &TaskDraft) -> Result<Outcome> {
        let created = self.store.create(draft)?;
        Ok(self.finish(created.is_some()))
    }

    pub fn toggle(&mut self, id: &str) -> Result<Outcome> {
        let changed = self.store.toggle_completed(id)?;
        Ok(self.finish(changed))
    }

    pub fn edit(&mut self, id: &str, draft: &TaskDraft) -> Result<Outcome> {
        let changed = self.store.update(id, draft)?;
        Ok(self.finish(changed))
    }

    /// Delete after confirming with the task's display title
    pub fn delete(&mut self, id: &str) -> Result<Outcome> {
        let Some(task) = self.store.get(id) else {
            return Ok(Outcome::Unchanged);
        };

        let prompt = delete_prompt(&task.title);
        if !self.ui.confirm(&prompt) {
            debug!(id, "delete declined");
            return Ok(Outcome::Declined);
        }

        let changed = self.store.delete(id)?;
        Ok(self.finish(changed))
    }

    /// Clear completed tasks; asks nothing when there are none
    pub fn clear_completed(&mut self) -> Result<Outcome> {
        let count = self.store.state().completed_count();
        if count == 0 {
            return Ok(Outcome::Unchanged);
        }

        let prompt = format!("Delete {} completed task(s)? This cannot be undone.", count);
        if !self.ui.confirm(&prompt) {
            debug!(count, "clear_completed declined");
            return Ok(Outcome::Declined);
        }

        let removed = self.store.clear_completed()?;
        Ok(self.finish(removed > 0))
    }

    pub fn move_task(&mut self, id: &str, before_id: Option<&str>) -> Result<Outcome> {
        let changed = self.store.move_task(id, before_id)?;
        Ok(self.finish(changed))
    }

    /// Validate then import; replacing a non-empty collection needs confirmation
    ///
    /// A rejected payload surfaces as a [`codec::ImportError`] before any prompt.
    pub fn import(&mut self, payload: &str, mode: ImportMode) -> Result<Outcome> {
        let imported = codec::parse_import(payload)?;

        if mode == ImportMode::Replace
            && !self.store.tasks().is_empty()
            && !self.ui.confirm("This will REPLACE ALL current tasks. Continue?")
        {
            debug!("replace import declined");
            return Ok(Outcome::Declined);
        }

        self.store.apply_import(imported, mode)?;
        Ok(self.finish(true))
    }
}

/// Confirmation text for deleting a single task
pub fn delete_prompt(title: &str) -> String {
    let title = title.trim();
    if title.is_empty() {
        "Delete this task? This cannot be undone.".to_string()
    } else {
        format!("Delete \"{}\"? This cannot be undone.", title)
    }
}
