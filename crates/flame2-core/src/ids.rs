//! Strongly typed task identifier.
//!
//! Task ids are dense indices into the task manager's task vector, so the
//! inner integer is `pub` to allow direct indexing via `id.index()`.  The
//! maximum value doubles as the termination sentinel that drains worker
//! pools at shutdown; it can never collide with a real task because task
//! registration refuses to grow that far.

use std::fmt;

/// Index of a task in the task manager's registry.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TaskId(pub u32);

impl TaskId {
    /// Sentinel enqueued once per worker at shutdown.  A worker that pops
    /// this id exits its loop instead of looking up a task.
    pub const TERM: TaskId = TaskId(u32::MAX);

    /// Cast to `usize` for direct use as a `Vec` index.
    #[inline(always)]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// `true` if this id is the worker termination sentinel.
    #[inline(always)]
    pub fn is_term(self) -> bool {
        self == Self::TERM
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_term() {
            write!(f, "TaskId(TERM)")
        } else {
            write!(f, "TaskId({})", self.0)
        }
    }
}

impl From<TaskId> for usize {
    #[inline(always)]
    fn from(id: TaskId) -> usize {
        id.0 as usize
    }
}

impl TryFrom<usize> for TaskId {
    type Error = std::num::TryFromIntError;
    fn try_from(n: usize) -> Result<TaskId, Self::Error> {
        u32::try_from(n).map(TaskId)
    }
}
