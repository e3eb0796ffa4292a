// Task model, field normalization and import shape validation

use crate::store::now_ms;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Title given to records whose title is missing or blank
pub const UNTITLED: &str = "Untitled task";

/// Calendar date format used for due dates
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    /// Sort rank, higher is more urgent
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 3,
            Priority::Medium => 2,
            Priority::Low => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    /// Parse free-form input, falling back to medium for anything unrecognised
    pub fn coerce(text: &str) -> Self {
        text.trim().to_lowercase().parse().unwrap_or_default()
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(format!("unknown priority: {}", other)),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single to-do record
///
/// Serialized with camelCase keys so stored and exported payloads keep the
/// `dueDate` / `createdAt` field names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub notes: String,
    pub priority: Priority,
    /// `YYYY-MM-DD` or empty; other text is kept and sorts after real dates
    pub due_date: String,
    pub completed: bool,
    /// Milliseconds since epoch
    pub created_at: i64,
    /// Manual sort key
    pub order: i64,
}

impl Task {
    /// Due date as an integer (`2024-05-01` -> `20240501`); no due date sorts last
    pub fn due_value(&self) -> u64 {
        due_value(&self.due_date)
    }

    /// Due strictly before `today`, regardless of completion
    pub fn is_past_due(&self, today: &str) -> bool {
        !self.due_date.is_empty() && self.due_date.as_str() < today
    }

    /// Incomplete and past due
    pub fn is_overdue(&self, today: &str) -> bool {
        !self.completed && self.is_past_due(today)
    }

    /// Case-insensitive substring match against title and notes
    ///
    /// `needle` must already be lowercased.
    pub(crate) fn matches(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle) || self.notes.to_lowercase().contains(needle)
    }
}

/// User-entered values for the editable fields of a task
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub notes: String,
    pub priority: String,
    pub due_date: String,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = priority.into();
        self
    }

    pub fn due_date(mut self, due_date: impl Into<String>) -> Self {
        self.due_date = due_date.into();
        self
    }

    /// Normalize every field; `None` when the title collapses to nothing
    pub fn normalize(&self) -> Option<EditableFields> {
        let title = clean_text(&self.title);
        if title.is_empty() {
            return None;
        }

        Some(EditableFields {
            title,
            notes: self.notes.trim().to_string(),
            priority: Priority::coerce(&self.priority),
            due_date: self.due_date.trim().to_string(),
        })
    }
}

/// Normalized editable fields, ready to apply to a task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditableFields {
    pub title: String,
    pub notes: String,
    pub priority: Priority,
    pub due_date: String,
}

impl EditableFields {
    pub(crate) fn apply_to(self, task: &mut Task) {
        task.title = self.title;
        task.notes = self.notes;
        task.priority = self.priority;
        task.due_date = self.due_date;
    }
}

/// Why a raw record was rejected by [`validate_shape`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    #[error("task is not an object")]
    NotAnObject,

    #[error("field `{field}` must be {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },
}

/// Trim and collapse internal whitespace runs to a single space
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// See [`Task::due_value`]
pub fn due_value(due_date: &str) -> u64 {
    if due_date.is_empty() {
        return u64::MAX;
    }
    due_date.replace('-', "").parse().unwrap_or(u64::MAX)
}

/// Today's local calendar date as `YYYY-MM-DD`
pub fn today() -> String {
    chrono::Local::now().date_naive().format(DATE_FORMAT).to_string()
}

/// Generate a fresh opaque task id
pub fn new_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

/// Generate ids until one is not in `taken`
pub fn unique_id(taken: &HashSet<String>) -> String {
    loop {
        let id = new_id();
        if !taken.contains(&id) {
            return id;
        }
    }
}

/// Coerce an arbitrary record into a well-formed task
///
/// Never fails: every missing or mistyped field falls back to its default,
/// and a missing or blank id is replaced with a generated one.
pub fn normalize(raw: &Value) -> Task {
    let empty = Map::new();
    let obj = raw.as_object().unwrap_or(&empty);
    let now = now_ms();

    let id = match obj.get("id").and_then(Value::as_str) {
        Some(id) if !id.trim().is_empty() => id.to_string(),
        _ => new_id(),
    };

    let title = obj
        .get("title")
        .and_then(Value::as_str)
        .map(clean_text)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNTITLED.to_string());

    Task {
        id,
        title,
        notes: string_field(obj, "notes"),
        priority: obj
            .get("priority")
            .and_then(Value::as_str)
            .map(Priority::coerce)
            .unwrap_or_default(),
        due_date: string_field(obj, "dueDate"),
        completed: obj.get("completed").and_then(Value::as_bool).unwrap_or(false),
        created_at: number_field(obj, "createdAt").unwrap_or(now),
        order: number_field(obj, "order").unwrap_or(now),
    }
}

/// Strict structural check used to gate imports
///
/// `id` and `title` must be strings; optional fields may be absent or null
/// but must otherwise carry the right JSON type.
pub fn validate_shape(raw: &Value) -> Result<(), ShapeError> {
    let obj = raw.as_object().ok_or(ShapeError::NotAnObject)?;

    require(obj, "id", Value::is_string, "a string")?;
    require(obj, "title", Value::is_string, "a string")?;

    optional(obj, "notes", Value::is_string, "a string")?;
    optional(obj, "priority", Value::is_string, "a string")?;
    optional(obj, "dueDate", Value::is_string, "a string")?;
    optional(obj, "completed", Value::is_boolean, "a boolean")?;
    optional(obj, "createdAt", Value::is_number, "a number")?;
    optional(obj, "order", Value::is_number, "a number")?;

    Ok(())
}

pub fn is_valid_shape(raw: &Value) -> bool {
    validate_shape(raw).is_ok()
}

/// Shape-check then normalize
pub fn validate(raw: &Value) -> Result<Task, ShapeError> {
    validate_shape(raw)?;
    Ok(normalize(raw))
}

fn require(
    obj: &Map<String, Value>,
    field: &'static str,
    check: fn(&Value) -> bool,
    expected: &'static str,
) -> Result<(), ShapeError> {
    match obj.get(field) {
        Some(v) if check(v) => Ok(()),
        _ => Err(ShapeError::WrongType { field, expected }),
    }
}

fn optional(
    obj: &Map<String, Value>,
    field: &'static str,
    check: fn(&Value) -> bool,
    expected: &'static str,
) -> Result<(), ShapeError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(()),
        Some(v) if check(v) => Ok(()),
        Some(_) => Err(ShapeError::WrongType { field, expected }),
    }
}

/// String fields are kept as stored, anything else becomes empty
fn string_field(obj: &Map<String, Value>, field: &str) -> String {
    obj.get(field).and_then(Value::as_str).map(str::to_string).unwrap_or_default()
}

fn number_field(obj: &Map<String, Value>, field: &str) -> Option<i64> {
    let value = obj.get(field)?;
    value
        .as_i64()
        .or_else(|| value.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clean_text_collapses_whitespace() {
        assert_eq!(clean_text("  Buy   milk "), "Buy milk");
        assert_eq!(clean_text("a\t\nb"), "a b");
        assert_eq!(clean_text("   "), "");
    }

    #[test]
    fn test_priority_coerce() {
        assert_eq!(Priority::coerce(" HIGH "), Priority::High);
        assert_eq!(Priority::coerce("low"), Priority::Low);
        assert_eq!(Priority::coerce("urgent"), Priority::Medium);
        assert_eq!(Priority::coerce(""), Priority::Medium);
    }

    #[test]
    fn test_priority_serialization() {
        let json = serde_json::to_string(&Priority::High).unwrap();
        assert_eq!(json, "\"high\"");
    }

    #[test]
    fn test_draft_keeps_free_form_due_date() {
        let fields = TaskDraft::new("x").due_date("  tomorrow ").normalize().unwrap();
        assert_eq!(fields.due_date, "tomorrow");

        let fields = TaskDraft::new("x").due_date("2024-02-30").normalize().unwrap();
        assert_eq!(fields.due_date, "2024-02-30");
    }

    #[test]
    fn test_normalize_keeps_string_fields_as_stored() {
        let task = normalize(&json!({
            "id": "a",
            "title": "X",
            "notes": "  indented\n",
            "dueDate": "next week"
        }));
        assert_eq!(task.notes, "  indented\n");
        assert_eq!(task.due_date, "next week");
        assert_eq!(task.due_value(), u64::MAX);
    }

    #[test]
    fn test_due_value() {
        assert_eq!(due_value("2024-05-01"), 20240501);
        assert_eq!(due_value(""), u64::MAX);
        assert!(due_value("2099-01-01") < due_value(""));
    }

    #[test]
    fn test_draft_rejects_blank_title() {
        assert!(TaskDraft::new("   \t ").normalize().is_none());
    }

    #[test]
    fn test_draft_normalizes_fields() {
        let fields = TaskDraft::new("  Buy   milk ")
            .notes("  two litres ")
            .priority(" High")
            .due_date(" 2024-06-01 ")
            .normalize()
            .unwrap();

        assert_eq!(fields.title, "Buy milk");
        assert_eq!(fields.notes, "two litres");
        assert_eq!(fields.priority, Priority::High);
        assert_eq!(fields.due_date, "2024-06-01");
    }

    #[test]
    fn test_normalize_fills_defaults() {
        let task = normalize(&json!({"id": "a", "title": "X"}));
        assert_eq!(task.id, "a");
        assert_eq!(task.title, "X");
        assert_eq!(task.notes, "");
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.due_date, "");
        assert!(!task.completed);
        assert!(task.created_at > 1_600_000_000_000);
    }

    #[test]
    fn test_normalize_coerces_bad_types() {
        let task = normalize(&json!({
            "id": 42,
            "title": null,
            "priority": "critical",
            "completed": "yes",
            "createdAt": 1500.7,
            "order": "first"
        }));

        assert!(!task.id.is_empty());
        assert_ne!(task.id, "42");
        assert_eq!(task.title, UNTITLED);
        assert_eq!(task.priority, Priority::Medium);
        assert!(!task.completed);
        assert_eq!(task.created_at, 1500);
        assert!(task.order > 1_600_000_000_000);
    }

    #[test]
    fn test_normalize_non_object() {
        let task = normalize(&json!("just a string"));
        assert_eq!(task.title, UNTITLED);
        assert!(!task.id.is_empty());
    }

    #[test]
    fn test_normalize_blank_id_is_replaced() {
        let task = normalize(&json!({"id": "  ", "title": "X"}));
        assert!(!task.id.trim().is_empty());
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let raws = [
            json!({"id": "a", "title": "  Buy   milk ", "priority": "HIGH", "dueDate": "2024-01-01"}),
            json!({"title": "", "notes": 5, "createdAt": 10, "order": 20}),
            json!([1, 2, 3]),
            json!({"id": "b", "title": "t", "dueDate": "not a date", "completed": true}),
        ];

        for raw in raws {
            let once = normalize(&raw);
            let twice = normalize(&serde_json::to_value(&once).unwrap());
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_validate_shape_accepts_minimal() {
        assert!(is_valid_shape(&json!({"id": "a", "title": "X"})));
        assert!(is_valid_shape(&json!({"id": "a", "title": "X", "notes": null, "completed": null})));
    }

    #[test]
    fn test_validate_shape_rejections() {
        assert_eq!(validate_shape(&json!(3)), Err(ShapeError::NotAnObject));
        assert_eq!(validate_shape(&json!(null)), Err(ShapeError::NotAnObject));
        assert_eq!(
            validate_shape(&json!({"title": "X"})),
            Err(ShapeError::WrongType {
                field: "id",
                expected: "a string"
            })
        );
        assert_eq!(
            validate_shape(&json!({"id": 1, "title": "X"})),
            Err(ShapeError::WrongType {
                field: "id",
                expected: "a string"
            })
        );
        assert_eq!(
            validate_shape(&json!({"id": "a", "title": "X", "completed": "true"})),
            Err(ShapeError::WrongType {
                field: "completed",
                expected: "a boolean"
            })
        );
        assert!(!is_valid_shape(&json!({"id": "a", "title": "X", "dueDate": 20240101})));
    }

    #[test]
    fn test_overdue_requires_incomplete() {
        let mut task = normalize(&json!({"id": "a", "title": "X", "dueDate": "2024-06-01"}));
        assert!(task.is_overdue("2024-06-10"));
        assert!(!task.is_overdue("2024-06-01"));

        task.completed = true;
        assert!(task.is_past_due("2024-06-10"));
        assert!(!task.is_overdue("2024-06-10"));
    }

    #[test]
    fn test_task_serializes_camel_case() {
        let task = normalize(&json!({"id": "a", "title": "X", "dueDate": "2024-06-01", "createdAt": 1, "order": 2}));
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["dueDate"], "2024-06-01");
        assert_eq!(value["createdAt"], 1);
        assert_eq!(value["priority"], "medium");
    }

    #[test]
    fn test_unique_id_avoids_taken() {
        let mut taken = HashSet::new();
        for _ in 0..50 {
            let id = unique_id(&taken);
            assert!(taken.insert(id));
        }
    }
}
