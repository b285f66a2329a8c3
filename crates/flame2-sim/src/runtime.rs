//! `Runtime` — explicit ownership of the four managers.
//!
//! The managers reference each other only through the `Arc` handles wired
//! here; nothing in the core reaches for globals.  The passthrough methods
//! retain the convenience of the classic facade for drivers that don't need
//! to hold the managers individually.

use std::path::Path;
use std::sync::Arc;

use flame2_api::AgentFn;
use flame2_core::{TaskId, VarScalar};
use flame2_exe::{AgentAccess, BoardOp, IoOp, TaskManager};
use flame2_io::IoManager;
use flame2_mb::{Message, MessageBoardManager};
use flame2_mem::MemoryManager;

use crate::SimResult;

/// Owns the memory, board, I/O, and task managers of one simulation.
pub struct Runtime {
    mem: Arc<MemoryManager>,
    boards: Arc<MessageBoardManager>,
    io: Arc<IoManager>,
    tasks: Arc<TaskManager>,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    pub fn new() -> Runtime {
        let mem = Arc::new(MemoryManager::new());
        let boards = Arc::new(MessageBoardManager::new());
        let io = Arc::new(IoManager::new(Arc::clone(&mem)));
        let tasks = Arc::new(TaskManager::new(
            Arc::clone(&mem),
            Arc::clone(&boards),
            Arc::clone(&io),
        ));
        Runtime { mem, boards, io, tasks }
    }

    // ── Manager handles ───────────────────────────────────────────────────

    pub fn memory(&self) -> &Arc<MemoryManager> {
        &self.mem
    }

    pub fn boards(&self) -> &Arc<MessageBoardManager> {
        &self.boards
    }

    pub fn io(&self) -> &Arc<IoManager> {
        &self.io
    }

    pub fn tasks(&self) -> &Arc<TaskManager> {
        &self.tasks
    }

    // ── Registration passthroughs ─────────────────────────────────────────

    pub fn register_agent(&self, name: &str) -> SimResult<()> {
        Ok(self.mem.register_agent(name)?)
    }

    pub fn register_variable<T: VarScalar>(&self, agent: &str, var: &str) -> SimResult<()> {
        Ok(self.mem.register_variable::<T>(agent, var)?)
    }

    pub fn hint_population(&self, agent: &str, n: usize) -> SimResult<()> {
        Ok(self.mem.hint_population(agent, n)?)
    }

    pub fn register_message<T: Message>(&self, name: &str) -> SimResult<()> {
        Ok(self.boards.register::<T>(name)?)
    }

    pub fn population_size(&self, agent: &str) -> SimResult<usize> {
        Ok(self.mem.population_size(agent)?)
    }

    // ── Task graph passthroughs ───────────────────────────────────────────

    pub fn create_agent_task(
        &self,
        name: &str,
        agent: &str,
        func: AgentFn,
        access: AgentAccess,
    ) -> SimResult<TaskId> {
        Ok(self.tasks.create_agent_task(name, agent, func, access)?)
    }

    pub fn create_board_task(&self, name: &str, message: &str, op: BoardOp) -> SimResult<TaskId> {
        Ok(self.tasks.create_board_task(name, message, op)?)
    }

    pub fn create_io_task(&self, name: &str, op: IoOp) -> SimResult<TaskId> {
        Ok(self.tasks.create_io_task(name, op)?)
    }

    pub fn add_dependency(&self, task: TaskId, parent: TaskId) -> SimResult<()> {
        Ok(self.tasks.add_dependency(task, parent)?)
    }

    pub fn add_dependency_by_name(&self, task: &str, parent: &str) -> SimResult<()> {
        Ok(self.tasks.add_dependency_by_name(task, parent)?)
    }

    /// Lock the task graph.  Idempotent; called by
    /// [`Simulation::new`][crate::Simulation::new] if the driver hasn't.
    pub fn finalize(&self) -> SimResult<()> {
        Ok(self.tasks.finalize()?)
    }

    // ── Population I/O ────────────────────────────────────────────────────

    /// Load a population file into agent memory (plug-in chosen by file
    /// extension).
    pub fn load_population(&self, path: &Path) -> SimResult<()> {
        Ok(self.io.load_population(path)?)
    }
}
