// Explicit application state: the collection plus view and editing selections

use crate::order;
use crate::query::{SortMode, StatusFilter, ViewQuery};
use crate::task::{Task, TaskDraft, unique_id};
use std::collections::HashSet;
use tracing::debug;

/// What an empty view should tell the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyState {
    /// Nothing in the collection at all
    NoTasks,
    /// The collection has tasks but none match the filter or search
    NoMatches,
}

impl EmptyState {
    pub fn message(self) -> &'static str {
        match self {
            EmptyState::NoTasks => "No tasks yet. Add one above.",
            EmptyState::NoMatches => "No tasks match your search/filter.",
        }
    }
}

/// Counts a presenter needs alongside the view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub visible: usize,
    pub has_completed: bool,
    pub empty_state: Option<EmptyState>,
}

impl Summary {
    /// `"1 task"` or `"N tasks"`, counting the whole collection
    pub fn counter_label(&self) -> String {
        if self.total == 1 {
            "1 task".to_string()
        } else {
            format!("{} tasks", self.total)
        }
    }
}

/// The single mutable state a UI owns
///
/// Mutations here are pure in-memory transitions; persistence is layered on
/// by [`crate::store::TaskStore`].
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub tasks: Vec<Task>,
    pub query: ViewQuery,
    editing: Option<String>,
}

impl AppState {
    pub fn new(tasks: Vec<Task>, query: ViewQuery) -> Self {
        Self {
            tasks,
            query,
            editing: None,
        }
    }

    pub fn find(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    pub fn editing(&self) -> Option<&str> {
        self.editing.as_deref()
    }

    pub fn start_editing(&mut self, id: &str) {
        self.editing = Some(id.to_string());
    }

    pub fn cancel_editing(&mut self) {
        self.editing = None;
    }

    pub fn set_filter(&mut self, filter: StatusFilter) {
        self.query.filter = filter;
    }

    pub fn set_sort(&mut self, sort: SortMode) {
        self.query.sort = sort;
    }

    pub fn set_search(&mut self, search: &str) {
        self.query.set_search(search);
    }

    /// Manual reordering is only offered while sorting manually
    pub fn is_manual(&self) -> bool {
        self.query.sort == SortMode::Manual
    }

    /// Filtered, searched and sorted view of the collection
    pub fn visible(&self, today: &str) -> Vec<&Task> {
        self.query.apply(&self.tasks, today)
    }

    pub fn summary(&self, today: &str) -> Summary {
        let total = self.tasks.len();
        let visible = self.visible(today).len();

        let empty_state = if total == 0 {
            Some(EmptyState::NoTasks)
        } else if visible == 0 {
            Some(EmptyState::NoMatches)
        } else {
            None
        };

        Summary {
            total,
            visible,
            has_completed: self.tasks.iter().any(|t| t.completed),
            empty_state,
        }
    }

    /// Prepend a new task; `None` when the title is blank
    pub fn create(&mut self, draft: &TaskDraft, now: i64) -> Option<&Task> {
        let fields = draft.normalize()?;

        let taken: HashSet<String> = self.tasks.iter().map(|t| t.id.clone()).collect();
        // Strictly above every existing key, even within one millisecond
        let order = self.tasks.iter().map(|t| t.order).max().map_or(now, |last| now.max(last + 1));
        let mut task = Task {
            id: unique_id(&taken),
            title: String::new(),
            notes: String::new(),
            priority: Default::default(),
            due_date: String::new(),
            completed: false,
            created_at: now,
            order,
        };
        fields.apply_to(&mut task);

        debug!(id = %task.id, "create: prepending task");
        self.tasks.insert(0, task);
        self.tasks.first()
    }

    pub fn toggle_completed(&mut self, id: &str) -> bool {
        match self.find_mut(id) {
            Some(task) => {
                task.completed = !task.completed;
                true
            }
            None => false,
        }
    }

    /// Replace the editable fields in place and end editing
    ///
    /// No-op when the title is blank or the id is unknown.
    pub fn update(&mut self, id: &str, draft: &TaskDraft) -> bool {
        let Some(fields) = draft.normalize() else {
            return false;
        };
        let Some(task) = self.find_mut(id) else {
            return false;
        };

        fields.apply_to(task);
        self.editing = None;
        true
    }

    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);

        if self.editing.as_deref() == Some(id) {
            self.editing = None;
        }
        self.tasks.len() != before
    }

    /// Remove every completed task, returning how many were removed
    pub fn clear_completed(&mut self) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|t| !t.completed);
        let removed = before - self.tasks.len();

        self.drop_dangling_editing();
        removed
    }

    pub fn completed_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.completed).count()
    }

    pub fn move_task(&mut self, id: &str, before_id: Option<&str>) -> bool {
        order::move_task(&mut self.tasks, id, before_id)
    }

    /// Swap in a new collection, dropping an editing reference that no longer resolves
    pub fn replace_tasks(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
        self.drop_dangling_editing();
    }

    fn drop_dangling_editing(&mut self) {
        let dangling = self.editing.as_deref().is_some_and(|id| self.find(id).is_none());
        if dangling {
            self.editing = None;
        }
    }
}
