// Export and import of the full task collection as JSON

use crate::task::{ShapeError, Task, unique_id, validate_shape};
use eyre::{Context, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};

/// Default file name for exported backups
pub const EXPORT_FILE_NAME: &str = "taskhub-backup.json";

/// How an import combines with the existing collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Discard the existing collection
    #[default]
    Replace,
    /// Append after the existing collection
    Merge,
}

impl FromStr for ImportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "replace" => Ok(ImportMode::Replace),
            "merge" => Ok(ImportMode::Merge),
            other => Err(format!("unknown import mode: {} (expected replace or merge)", other)),
        }
    }
}

impl fmt::Display for ImportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportMode::Replace => write!(f, "replace"),
            ImportMode::Merge => write!(f, "merge"),
        }
    }
}

/// Why an import payload was rejected as a whole
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("Import failed: invalid JSON file ({0})")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Import failed: file must contain an array of tasks")]
    NotAList,

    #[error("Import failed: invalid task format found at index {index}: {source}")]
    InvalidTask {
        index: usize,
        #[source]
        source: ShapeError,
    },
}

/// Pretty-printed JSON of every task, fields untouched
pub fn export(tasks: &[Task]) -> Result<String> {
    serde_json::to_string_pretty(tasks).context("Failed to serialize tasks")
}

/// Write an export to `path` while holding an exclusive lock on it
pub fn write_export(path: &Path, tasks: &[Task]) -> Result<()> {
    let payload = export(tasks)?;

    // Open without truncating; contents only change under the lock
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(path)
        .context("Failed to open export file")?;

    // Acquire exclusive lock before touching the contents
    file.lock_exclusive().context("Failed to acquire file lock")?;

    // Replace whatever was there
    file.set_len(0).context("Failed to truncate export file")?;
    file.write_all(payload.as_bytes())?;
    file.write_all(b"\n")?;

    // Ensure data is written to disk
    file.sync_all()?;

    info!(path = ?path, count = tasks.len(), "Exported tasks");
    Ok(())
}

/// Parse and validate an import payload
///
/// All-or-nothing: a non-list top level or any element failing the shape
/// check rejects the whole payload. Accepted elements are normalized.
pub fn parse_import(payload: &str) -> Result<Vec<Task>, ImportError> {
    let parsed: Value = serde_json::from_str(payload)?;

    let Value::Array(items) = parsed else {
        warn!("Import rejected: top level is not a list");
        return Err(ImportError::NotAList);
    };

    let mut tasks = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        if let Err(source) = validate_shape(item) {
            warn!(index, error = %source, "Import rejected: invalid task");
            return Err(ImportError::InvalidTask { index, source });
        }
        tasks.push(crate::task::normalize(item));
    }

    Ok(tasks)
}

/// Give every task an id not already in `taken`, recording each id used
///
/// Blank or colliding ids get a freshly generated one; ids are otherwise kept.
pub fn ensure_unique_ids(tasks: Vec<Task>, taken: &mut HashSet<String>) -> Vec<Task> {
    tasks
        .into_iter()
        .map(|mut task| {
            if task.id.is_empty() || taken.contains(&task.id) {
                task.id = unique_id(taken);
            }
            taken.insert(task.id.clone());
            task
        })
        .collect()
}

/// Combine already-validated imported tasks with the current collection
pub fn combine(current: Vec<Task>, imported: Vec<Task>, mode: ImportMode) -> Vec<Task> {
    match mode {
        ImportMode::Replace => {
            let mut taken = HashSet::new();
            ensure_unique_ids(imported, &mut taken)
        }
        ImportMode::Merge => {
            let mut taken: HashSet<String> = current.iter().map(|t| t.id.clone()).collect();
            let mut merged = current;
            merged.extend(ensure_unique_ids(imported, &mut taken));
            merged
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::normalize;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn task(id: &str) -> Task {
        normalize(&json!({"id": id, "title": format!("Task {}", id), "createdAt": 1, "order": 1}))
    }

    #[test]
    fn test_export_pretty_prints_all_fields() {
        let out = export(&[task("a")]).unwrap();
        assert!(out.starts_with("[\n"));
        assert!(out.contains("\"id\": \"a\""));
        assert!(out.contains("\"dueDate\": \"\""));
        assert!(out.contains("\"createdAt\": 1"));
    }

    #[test]
    fn test_parse_import_rejects_invalid_json() {
        let err = parse_import("{not json").unwrap_err();
        assert!(matches!(err, ImportError::InvalidJson(_)));
    }

    #[test]
    fn test_parse_import_rejects_non_list() {
        let err = parse_import(r#"{"id":"a","title":"X"}"#).unwrap_err();
        assert!(matches!(err, ImportError::NotAList));
        assert_eq!(err.to_string(), "Import failed: file must contain an array of tasks");
    }

    #[test]
    fn test_parse_import_rejects_whole_payload_on_bad_element() {
        let err = parse_import(r#"[{"id":"a","title":"X"},{"id":"b"}]"#).unwrap_err();
        match err {
            ImportError::InvalidTask { index, source } => {
                assert_eq!(index, 1);
                assert_eq!(
                    source,
                    ShapeError::WrongType {
                        field: "title",
                        expected: "a string"
                    }
                );
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_parse_import_normalizes() {
        let tasks = parse_import(r#"[{"id":"a","title":"  Buy   milk ","priority":"HIGH"}]"#).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Buy milk");
        assert_eq!(tasks[0].priority, crate::task::Priority::High);
    }

    #[test]
    fn test_ensure_unique_ids_dedupes_batch() {
        let mut taken = HashSet::new();
        let tasks = ensure_unique_ids(vec![task("a"), task("a"), task("b")], &mut taken);

        assert_eq!(tasks[0].id, "a");
        assert_ne!(tasks[1].id, "a");
        assert_eq!(tasks[2].id, "b");
        assert_eq!(taken.len(), 3);
    }

    #[test]
    fn test_combine_merge_renames_collisions() {
        let current = vec![task("a"), task("b")];
        let imported = parse_import(r#"[{"id":"a","title":"X"}]"#).unwrap();

        let merged = combine(current, imported, ImportMode::Merge);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].id, "a");
        assert_eq!(merged[1].id, "b");
        assert_ne!(merged[2].id, "a");
        assert_eq!(merged[2].title, "X");

        let ids: HashSet<&str> = merged.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn test_combine_replace_keeps_imported_ids() {
        let current = vec![task("a")];
        let imported = vec![task("a"), task("c")];

        let replaced = combine(current, imported, ImportMode::Replace);
        let ids: Vec<&str> = replaced.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_export_import_round_trip() {
        let mut original = vec![task("a"), task("b")];
        original[1].completed = true;
        original[1].due_date = "2024-06-01".to_string();

        let payload = export(&original).unwrap();
        let imported = parse_import(&payload).unwrap();
        let restored = combine(Vec::new(), imported, ImportMode::Replace);

        assert_eq!(restored, original);
    }

    #[test]
    fn test_write_export_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(EXPORT_FILE_NAME);

        write_export(&path, &[task("a")]).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let back = parse_import(&content).unwrap();
        assert_eq!(back[0].id, "a");
    }

    #[test]
    fn test_write_export_waits_for_lock() {
        use std::sync::mpsc;
        use std::thread;
        use std::time::Duration;

        let temp = TempDir::new().unwrap();
        let path = temp.path().join(EXPORT_FILE_NAME);
        fs::write(&path, "held by another writer").unwrap();

        let holder = fs::OpenOptions::new().write(true).open(&path).unwrap();
        holder.lock_exclusive().unwrap();

        let (done_tx, done_rx) = mpsc::channel();
        let writer_path = path.clone();
        let writer = thread::spawn(move || {
            write_export(&writer_path, &[]).unwrap();
            done_tx.send(()).unwrap();
        });

        // Still blocked: the file must be untouched while the lock is held
        assert!(done_rx.recv_timeout(Duration::from_millis(200)).is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "held by another writer");

        FileExt::unlock(&holder).unwrap();
        writer.join().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "[]\n");
    }

    #[test]
    fn test_write_export_shrinks_longer_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(EXPORT_FILE_NAME);
        fs::write(&path, "x".repeat(4096)).unwrap();

        write_export(&path, &[]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "[]\n");
    }

    #[test]
    fn test_import_mode_parsing() {
        assert_eq!("merge".parse::<ImportMode>().unwrap(), ImportMode::Merge);
        assert!("append".parse::<ImportMode>().is_err());
    }
}
