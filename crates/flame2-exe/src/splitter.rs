//! Task splitting: range arithmetic plus the sub-task bookkeeping handle.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use flame2_core::TaskId;

use crate::task::Task;
use crate::{ExeError, ExeResult};

/// Partition `[0, population)` into at most `max_tasks` contiguous ranges of
/// at least `min_size` rows each.
///
/// Returns `None` when no split should happen: fewer than two sub-tasks
/// allowed, or the population cannot fill two minimum-size ranges.  The
/// ranges chain with no gaps or overlaps; the first `population % n` ranges
/// take one extra row.
pub fn split_ranges(
    population: usize,
    max_tasks: usize,
    min_size: usize,
) -> Option<Vec<(usize, usize)>> {
    let min_size = min_size.max(1);
    if max_tasks < 2 || population < min_size * 2 {
        return None;
    }

    let n = if population >= min_size * max_tasks {
        max_tasks
    } else {
        population / min_size
    };
    let base = population / n;
    let remainder = population % n;

    let mut ranges = Vec::with_capacity(n);
    let mut offset = 0;
    for i in 0..n {
        let count = base + usize::from(i < remainder);
        ranges.push((offset, count));
        offset += count;
    }
    Some(ranges)
}

// ── TaskSplitter ──────────────────────────────────────────────────────────────

/// Tracks the lifecycle of one split: sub-tasks waiting to be handed out,
/// how many hand-outs are still owed, and how many sub-tasks are running.
///
/// The split is complete when every sub-task has been handed out *and* every
/// one has reported done.
pub struct TaskSplitter {
    id: TaskId,
    total: usize,
    state: Mutex<SplitState>,
}

struct SplitState {
    subtasks: VecDeque<Arc<Task>>,
    unassigned: usize,
    running: usize,
}

impl TaskSplitter {
    pub(crate) fn new(id: TaskId, subtasks: Vec<Arc<Task>>) -> TaskSplitter {
        let total = subtasks.len();
        TaskSplitter {
            id,
            total,
            state: Mutex::new(SplitState {
                subtasks: subtasks.into(),
                unassigned: total,
                running: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SplitState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The parent task's id, shared by every sub-task.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// How many sub-tasks this split produced.
    pub fn subtask_count(&self) -> usize {
        self.total
    }

    /// The `(offset, count)` ranges of the remaining sub-tasks, in hand-out
    /// order.
    pub fn remaining_ranges(&self) -> Vec<(usize, usize)> {
        self.lock()
            .subtasks
            .iter()
            .filter_map(|t| t.range())
            .collect()
    }

    /// Record one hand-out.  Returns `true` when no hand-outs remain — the
    /// caller should stop offering this split.
    pub(crate) fn assign_one(&self) -> bool {
        let mut state = self.lock();
        debug_assert!(state.unassigned > 0, "more hand-outs than sub-tasks");
        state.unassigned -= 1;
        state.running += 1;
        state.unassigned == 0
    }

    /// The next sub-task, in range order.
    pub(crate) fn next_subtask(&self) -> ExeResult<Arc<Task>> {
        self.lock()
            .subtasks
            .pop_front()
            .ok_or(ExeError::NoneAvailable)
    }

    /// Record one sub-task completion.  Returns `true` when the whole split
    /// is complete.
    pub(crate) fn complete_one(&self) -> bool {
        let mut state = self.lock();
        debug_assert!(state.running > 0, "completion without a running sub-task");
        state.running -= 1;
        state.running == 0 && state.unassigned == 0 && state.subtasks.is_empty()
    }

    /// `true` once every sub-task has been handed out and completed.
    pub fn is_complete(&self) -> bool {
        let state = self.lock();
        state.running == 0 && state.unassigned == 0 && state.subtasks.is_empty()
    }
}
