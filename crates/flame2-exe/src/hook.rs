//! The post-iteration compaction hook.
//!
//! Agents are never created or deleted mid-iteration.  A transition function
//! returning `Dead` only records the row; what happens to recorded rows is
//! up to this hook, which the core leaves as a no-op.

use crate::ExeResult;

/// Receives `Dead` rows during an iteration and a compaction opportunity
/// after it.
pub trait CompactionHook: Send + Sync {
    /// Called by a worker for each agent row whose transition function
    /// returned `Dead`.
    fn agent_dead(&self, _agent: &str, _row: usize) {}

    /// Called by the driver after each iteration completes.
    fn compact(&self) -> ExeResult<()> {
        Ok(())
    }
}

/// The default hook: ignores dead rows, compacts nothing.
pub struct NoopCompaction;

impl CompactionHook for NoopCompaction {}
