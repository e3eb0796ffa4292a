// Filter, search and sort pipeline producing the presented view

use crate::task::{Task, clean_text};
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::fmt;
use std::str::FromStr;

/// Completion filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Completed,
}

impl StatusFilter {
    pub fn accepts(self, task: &Task) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Active => !task.completed,
            StatusFilter::Completed => task.completed,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(StatusFilter::All),
            "active" => Ok(StatusFilter::Active),
            "completed" => Ok(StatusFilter::Completed),
            other => Err(format!("unknown filter: {} (expected all, active or completed)", other)),
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFilter::All => write!(f, "all"),
            StatusFilter::Active => write!(f, "active"),
            StatusFilter::Completed => write!(f, "completed"),
        }
    }
}

/// Sort modes for the view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortMode {
    Manual,
    #[default]
    Newest,
    Oldest,
    Priority,
    DueSoon,
    Overdue,
}

impl FromStr for SortMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(SortMode::Manual),
            "newest" => Ok(SortMode::Newest),
            "oldest" => Ok(SortMode::Oldest),
            "priority" => Ok(SortMode::Priority),
            "dueSoon" | "due-soon" => Ok(SortMode::DueSoon),
            "overdue" => Ok(SortMode::Overdue),
            other => Err(format!("unknown sort mode: {}", other)),
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SortMode::Manual => "manual",
            SortMode::Newest => "newest",
            SortMode::Oldest => "oldest",
            SortMode::Priority => "priority",
            SortMode::DueSoon => "dueSoon",
            SortMode::Overdue => "overdue",
        };
        write!(f, "{}", name)
    }
}

/// Current filter, search term and sort mode
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewQuery {
    pub filter: StatusFilter,
    search: String,
    pub sort: SortMode,
}

impl ViewQuery {
    pub fn new(filter: StatusFilter, sort: SortMode) -> Self {
        Self {
            filter,
            search: String::new(),
            sort,
        }
    }

    /// Set the search term, collapsing whitespace the same way titles are
    pub fn set_search(&mut self, search: &str) {
        self.search = clean_text(search);
    }

    pub fn with_search(mut self, search: &str) -> Self {
        self.set_search(search);
        self
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    /// Derive the ordered view; the input slice is never reordered
    ///
    /// `today` is a `YYYY-MM-DD` date used by the overdue sort.
    pub fn apply<'a>(&self, tasks: &'a [Task], today: &str) -> Vec<&'a Task> {
        let needle = self.search.to_lowercase();

        let mut visible: Vec<&Task> = tasks
            .iter()
            .filter(|task| self.filter.accepts(task))
            .filter(|task| needle.is_empty() || task.matches(&needle))
            .collect();

        sort_view(&mut visible, self.sort, today);
        visible
    }
}

/// Stable sort of a view by the given mode
pub fn sort_view(view: &mut [&Task], mode: SortMode, today: &str) {
    match mode {
        SortMode::Manual => view.sort_by_key(|t| t.order),
        SortMode::Newest => view.sort_by_key(|t| Reverse(t.created_at)),
        SortMode::Oldest => view.sort_by_key(|t| t.created_at),
        SortMode::Priority => view.sort_by_key(|t| Reverse(t.priority.rank())),
        SortMode::DueSoon => view.sort_by_key(|t| t.due_value()),
        SortMode::Overdue => view.sort_by(|a, b| overdue_cmp(a, b, today)),
    }
}

/// Overdue tasks first, then earliest due date, then newest
///
/// Completed tasks never join the overdue group but still fall through to the
/// due-date and creation-time tie-breaks.
fn overdue_cmp(a: &Task, b: &Task, today: &str) -> Ordering {
    let a_over = a.is_overdue(today);
    let b_over = b.is_overdue(today);

    b_over
        .cmp(&a_over)
        .then_with(|| a.due_value().cmp(&b.due_value()))
        .then_with(|| b.created_at.cmp(&a.created_at))
}
