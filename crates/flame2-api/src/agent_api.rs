//! `AgentApi` — the proxy object passed to every transition function call.

use std::sync::Arc;

use flame2_core::VarScalar;
use flame2_mb::{BoardClient, Message, MessageIterator};
use flame2_mem::MemoryIterator;

use crate::ApiError;

/// What a transition function reports about the current agent.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum AgentStatus {
    /// The agent stays in the population.
    #[default]
    Alive,
    /// The agent is marked for the post-iteration compaction hook.
    Dead,
}

/// Result of one transition function invocation.
pub type AgentResult = Result<AgentStatus, ApiError>;

/// An agent transition function.
///
/// Called once per agent row in the task's assigned range, with the proxy's
/// cursor advanced between calls.  Must not block; it runs to completion on
/// a worker thread between two cursor steps.
pub type AgentFn = Arc<dyn Fn(&mut AgentApi) -> AgentResult + Send + Sync>;

/// Proxy through which agent functions touch memory and message boards.
///
/// The four ACL-checked methods ([`get`](Self::get), [`set`](Self::set),
/// [`post`](Self::post), [`messages`](Self::messages)) are the entire
/// user-facing surface; the cursor methods exist for the runtime driving the
/// per-row loop.
pub struct AgentApi {
    mem: MemoryIterator,
    mb: BoardClient,
}

impl AgentApi {
    /// Bind a positioned memory iterator to a task-scoped board client.
    pub fn new(mem: MemoryIterator, mb: BoardClient) -> AgentApi {
        AgentApi { mem, mb }
    }

    // ── User-facing surface ───────────────────────────────────────────────

    /// A copy of the current agent's value of `var`.
    pub fn get<T: VarScalar>(&self, var: &str) -> Result<T, ApiError> {
        Ok(self.mem.get(var)?)
    }

    /// Overwrite the current agent's value of `var` (requires a ReadWrite
    /// grant).
    pub fn set<T: VarScalar>(&mut self, var: &str, value: T) -> Result<(), ApiError> {
        Ok(self.mem.set(var, value)?)
    }

    /// Post a message to board `name` (requires a post grant).
    pub fn post<T: Message>(&self, name: &str, msg: T) -> Result<(), ApiError> {
        Ok(self.mb.post(name, msg)?)
    }

    /// An iterator over board `name`'s synced messages (requires a read
    /// grant).
    pub fn messages(&self, name: &str) -> Result<MessageIterator, ApiError> {
        Ok(self.mb.messages(name)?)
    }

    // ── Runtime-facing cursor control ─────────────────────────────────────

    /// `true` once every row in the assigned range has been visited.
    pub fn at_end(&self) -> bool {
        self.mem.at_end()
    }

    /// Move to the next agent row.  Returns `true` iff the cursor moved.
    pub fn advance(&mut self) -> bool {
        self.mem.step()
    }

    /// Absolute row index of the current agent.
    pub fn row(&self) -> usize {
        self.mem.absolute_row()
    }

    /// Number of rows in the assigned range.
    pub fn range_len(&self) -> usize {
        self.mem.len()
    }
}
