//! Task objects: what a worker actually runs.
//!
//! A task is immutable once registered.  Agent tasks carry everything a run
//! needs — the shadow with its variable ACL, the board proxy with its
//! message ACL, and the function — so `run()` takes no external context and
//! sub-tasks are plain copies with a different `(offset, count)`.

use std::sync::Arc;

use flame2_api::{AgentApi, AgentFn, AgentStatus};
use flame2_io::IoManager;
use flame2_mb::{MessageBoard, MessageBoardManager, Proxy};
use flame2_mem::{Access, AgentShadow};

use flame2_core::TaskId;

use crate::splitter::{TaskSplitter, split_ranges};
use crate::{ExeError, ExeResult};

// ── Task classification ───────────────────────────────────────────────────────

/// The three kinds of work the scheduler routes to queues.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum TaskType {
    /// Runs a transition function once per agent row.
    Agent,
    /// Synchronizes or clears one message board.
    Board,
    /// Drives one population output hook.
    Io,
}

/// Message-board operations a board task can perform.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum BoardOp {
    /// Publish all staged posts.
    Sync,
    /// Drop all writers and empty the board.
    Clear,
}

/// Population output operations an I/O task can perform.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum IoOp {
    /// Begin this iteration's output.
    InitOutput,
    /// Record one agent variable column.
    WriteVariable { agent: String, var: String },
    /// Finish this iteration's output.
    FinalizeOutput,
}

// ── AgentAccess ───────────────────────────────────────────────────────────────

/// Declared permissions for an agent task, applied at creation.
#[derive(Default, Clone)]
pub struct AgentAccess {
    pub(crate) vars: Vec<(String, Access)>,
    pub(crate) read_messages: Vec<String>,
    pub(crate) post_messages: Vec<String>,
}

impl AgentAccess {
    pub fn new() -> AgentAccess {
        AgentAccess::default()
    }

    /// Grant read access to an agent variable.
    pub fn read(mut self, var: &str) -> AgentAccess {
        self.vars.push((var.to_owned(), Access::Read));
        self
    }

    /// Grant read-write access to an agent variable.
    pub fn read_write(mut self, var: &str) -> AgentAccess {
        self.vars.push((var.to_owned(), Access::ReadWrite));
        self
    }

    /// Allow reading a message board.
    pub fn read_message(mut self, name: &str) -> AgentAccess {
        self.read_messages.push(name.to_owned());
        self
    }

    /// Allow posting to a message board.
    pub fn post_message(mut self, name: &str) -> AgentAccess {
        self.post_messages.push(name.to_owned());
        self
    }
}

// ── Task ──────────────────────────────────────────────────────────────────────

/// What a completed run reports back to the worker.
#[derive(Default, Debug)]
pub struct TaskOutcome {
    /// Absolute rows whose transition function returned `Dead`.
    pub dead_rows: Vec<usize>,
}

pub(crate) struct AgentTask {
    pub(crate) agent: String,
    pub(crate) func: AgentFn,
    pub(crate) shadow: Arc<AgentShadow>,
    pub(crate) proxy: Arc<Proxy>,
    pub(crate) boards: Arc<MessageBoardManager>,
    /// `Some((offset, count))` on split sub-tasks; `None` runs the whole
    /// population.
    pub(crate) range: Option<(usize, usize)>,
}

pub(crate) struct BoardTask {
    pub(crate) board: Arc<MessageBoard>,
    pub(crate) op: BoardOp,
}

pub(crate) struct IoTask {
    pub(crate) io: Arc<IoManager>,
    pub(crate) op: IoOp,
}

pub(crate) enum TaskKind {
    Agent(AgentTask),
    Board(BoardTask),
    Io(IoTask),
}

/// One registered task.  Handles are counted (`Arc<Task>`) so a split
/// sub-task can outlive the lookup that produced it.
pub struct Task {
    pub(crate) id: TaskId,
    pub(crate) name: String,
    pub(crate) kind: TaskKind,
}

impl Task {
    /// The task's dense id (shared by all its split sub-tasks).
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// The registered task name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn task_type(&self) -> TaskType {
        match &self.kind {
            TaskKind::Agent(_) => TaskType::Agent,
            TaskKind::Board(_) => TaskType::Board,
            TaskKind::Io(_) => TaskType::Io,
        }
    }

    /// The agent an agent task iterates, if any.
    pub fn agent_name(&self) -> Option<&str> {
        match &self.kind {
            TaskKind::Agent(t) => Some(&t.agent),
            _ => None,
        }
    }

    /// The `(offset, count)` range of a split sub-task.
    pub fn range(&self) -> Option<(usize, usize)> {
        match &self.kind {
            TaskKind::Agent(t) => t.range,
            _ => None,
        }
    }

    // ── Execution ─────────────────────────────────────────────────────────

    /// Run the task to completion on the calling thread.
    pub fn run(&self) -> ExeResult<TaskOutcome> {
        match &self.kind {
            TaskKind::Agent(t) => self.run_agent(t),
            TaskKind::Board(t) => {
                match t.op {
                    BoardOp::Sync => t.board.sync()?,
                    BoardOp::Clear => t.board.clear(),
                }
                Ok(TaskOutcome::default())
            }
            TaskKind::Io(t) => {
                match &t.op {
                    IoOp::InitOutput => t.io.init_output()?,
                    IoOp::WriteVariable { agent, var } => t.io.write_variable(agent, var)?,
                    IoOp::FinalizeOutput => t.io.finalize_output()?,
                }
                Ok(TaskOutcome::default())
            }
        }
    }

    fn run_agent(&self, t: &AgentTask) -> ExeResult<TaskOutcome> {
        let iter = match t.range {
            Some((offset, count)) => t.shadow.iter_range(offset, count)?,
            None => t.shadow.iter()?,
        };
        let client = t.proxy.client(&t.boards)?;
        let mut api = AgentApi::new(iter, client);

        let mut outcome = TaskOutcome::default();
        while !api.at_end() {
            let row = api.row();
            match (t.func)(&mut api) {
                Ok(AgentStatus::Alive) => {}
                Ok(AgentStatus::Dead) => outcome.dead_rows.push(row),
                Err(source) => {
                    return Err(ExeError::TaskFailure {
                        task: self.name.clone(),
                        agent: t.agent.clone(),
                        row,
                        source,
                    });
                }
            }
            api.advance();
        }
        Ok(outcome)
    }

    // ── Splitting ─────────────────────────────────────────────────────────

    /// Split an agent task into sub-tasks over disjoint row ranges.
    ///
    /// Returns `Ok(None)` when the population is too small or `max_tasks`
    /// forbids splitting.  Splitting a sub-task splits its own range.  Board
    /// and I/O tasks cannot split.
    pub fn split(&self, max_tasks: usize, min_size: usize) -> ExeResult<Option<TaskSplitter>> {
        let TaskKind::Agent(t) = &self.kind else {
            return Err(ExeError::NotImplemented(
                "only agent tasks can be split",
            ));
        };
        let (base, population) = match t.range {
            Some((offset, count)) => (offset, count),
            None => (0, t.shadow.population()),
        };
        let Some(ranges) = split_ranges(population, max_tasks, min_size) else {
            return Ok(None);
        };

        let subtasks = ranges
            .into_iter()
            .map(|(offset, count)| {
                Arc::new(Task {
                    id: self.id,
                    name: self.name.clone(),
                    kind: TaskKind::Agent(AgentTask {
                        agent: t.agent.clone(),
                        func: Arc::clone(&t.func),
                        shadow: Arc::clone(&t.shadow),
                        proxy: Arc::clone(&t.proxy),
                        boards: Arc::clone(&t.boards),
                        range: Some((base + offset, count)),
                    }),
                })
            })
            .collect();
        log::trace!(
            "task {:?} split over population {population} (base offset {base})",
            self.name
        );
        Ok(Some(TaskSplitter::new(self.id, subtasks)))
    }
}
