// Manual ordering: drag-to-reorder over the whole collection

use crate::task::Task;
use tracing::debug;

/// Spacing between consecutive manual order keys
pub const ORDER_STEP: i64 = 1000;

/// Move `task_id` immediately before `before_id`, or to the end
///
/// The whole collection is first sorted by its current order key, so the
/// move applies to the manual arrangement rather than any filtered view.
/// A missing `before_id` (or one that no longer exists) appends. Every task
/// is renumbered afterwards. Returns false if `task_id` is unknown.
pub fn move_task(tasks: &mut Vec<Task>, task_id: &str, before_id: Option<&str>) -> bool {
    tasks.sort_by_key(|t| t.order);

    let Some(from) = tasks.iter().position(|t| t.id == task_id) else {
        debug!(task_id, "move_task: task not found");
        return false;
    };
    let moved = tasks.remove(from);

    let target = before_id.and_then(|id| tasks.iter().position(|t| t.id == id));
    match target {
        Some(to) => tasks.insert(to, moved),
        None => tasks.push(moved),
    }

    renumber(tasks);
    debug!(task_id, ?before_id, count = tasks.len(), "move_task: reordered");
    true
}

/// Reassign dense order keys `1000, 2000, ...` following the current sequence
pub fn renumber(tasks: &mut [Task]) {
    for (i, task) in tasks.iter_mut().enumerate() {
        task.order = (i as i64 + 1) * ORDER_STEP;
    }
}
