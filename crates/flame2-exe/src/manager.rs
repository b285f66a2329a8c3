//! `TaskManager` — the task registry, dependency DAG, and per-iteration
//! state machine.
//!
//! Graph construction happens on the driver thread before `finalize()`;
//! per-iteration state is mutated concurrently by the scheduler and worker
//! callbacks, so everything lives behind one mutex.  The manager knows
//! nothing about threads or queues — it is only a state machine the
//! scheduler consults.
//!
//! # Per-iteration protocol
//!
//! `iter_reset` copies the dependency sets, seeds `ready` from the graph
//! roots and `pending` from everything else.  `iter_pop` moves ready →
//! assigned; `iter_done` retires an assigned task and promotes any child
//! whose last dependency it was.  The iteration is complete when all three
//! sets are empty.

use std::collections::{BTreeSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use rustc_hash::FxHashMap;

use flame2_api::AgentFn;
use flame2_core::TaskId;
use flame2_io::IoManager;
use flame2_mb::{MessageBoardManager, Proxy};
use flame2_mem::{Access, MemError, MemoryManager};

use crate::task::{
    AgentAccess, AgentTask, BoardOp, BoardTask, IoOp, IoTask, Task, TaskKind,
};
use crate::{ExeError, ExeResult};

struct TmState {
    tasks: Vec<Arc<Task>>,
    names: FxHashMap<String, TaskId>,
    parents: Vec<BTreeSet<TaskId>>,
    children: Vec<BTreeSet<TaskId>>,
    roots: BTreeSet<TaskId>,
    leaves: BTreeSet<TaskId>,

    // ── Per-iteration state ───────────────────────────────────────────────
    pending_deps: Vec<BTreeSet<TaskId>>,
    ready: VecDeque<TaskId>,
    pending: BTreeSet<TaskId>,
    assigned: BTreeSet<TaskId>,
}

/// Registry of named tasks and their dependency DAG.
pub struct TaskManager {
    mem: Arc<MemoryManager>,
    boards: Arc<MessageBoardManager>,
    io: Arc<IoManager>,
    state: Mutex<TmState>,
    finalized: AtomicBool,
}

impl TaskManager {
    pub fn new(
        mem: Arc<MemoryManager>,
        boards: Arc<MessageBoardManager>,
        io: Arc<IoManager>,
    ) -> TaskManager {
        TaskManager {
            mem,
            boards,
            io,
            state: Mutex::new(TmState {
                tasks: Vec::new(),
                names: FxHashMap::default(),
                parents: Vec::new(),
                children: Vec::new(),
                roots: BTreeSet::new(),
                leaves: BTreeSet::new(),
                pending_deps: Vec::new(),
                ready: VecDeque::new(),
                pending: BTreeSet::new(),
                assigned: BTreeSet::new(),
            }),
            finalized: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TmState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ── Task factories ────────────────────────────────────────────────────

    /// Register an agent task: `func` will run once per row of `agent`,
    /// restricted to the declared `access`.
    ///
    /// Validates that the agent, every variable, and every message named in
    /// `access` are registered.
    pub fn create_agent_task(
        &self,
        name: &str,
        agent: &str,
        func: AgentFn,
        access: AgentAccess,
    ) -> ExeResult<TaskId> {
        self.check_not_finalized()?;

        let mut shadow = self.mem.shadow(agent)?;
        for (var, level) in &access.vars {
            shadow.allow(var, *level)?;
        }

        let mut proxy = Proxy::new();
        for msg in &access.read_messages {
            self.boards.board(msg)?;
            proxy.allow_read(msg);
        }
        for msg in &access.post_messages {
            self.boards.board(msg)?;
            proxy.allow_post(msg);
        }

        self.register(
            name,
            TaskKind::Agent(AgentTask {
                agent: agent.to_owned(),
                func,
                shadow: Arc::new(shadow),
                proxy: Arc::new(proxy),
                boards: Arc::clone(&self.boards),
                range: None,
            }),
        )
    }

    /// Register a board task performing `op` on message `message`.
    pub fn create_board_task(&self, name: &str, message: &str, op: BoardOp) -> ExeResult<TaskId> {
        self.check_not_finalized()?;
        let board = self.boards.board(message)?;
        self.register(name, TaskKind::Board(BoardTask { board, op }))
    }

    /// Register an I/O task performing `op`.
    pub fn create_io_task(&self, name: &str, op: IoOp) -> ExeResult<TaskId> {
        self.check_not_finalized()?;
        if let IoOp::WriteVariable { agent, var } = &op {
            if !self.mem.contains_agent(agent) {
                return Err(MemError::UnknownAgent(agent.clone()).into());
            }
            if !self.mem.contains_variable(agent, var) {
                return Err(MemError::UnknownVariable {
                    agent: agent.clone(),
                    var: var.clone(),
                }
                .into());
            }
        }
        self.register(name, TaskKind::Io(IoTask { io: Arc::clone(&self.io), op }))
    }

    /// The insertion index becomes the task id, so ids are dense and cheap
    /// to pass around.
    fn register(&self, name: &str, kind: TaskKind) -> ExeResult<TaskId> {
        let mut state = self.lock();
        if state.names.contains_key(name) {
            return Err(ExeError::DuplicateTask(name.to_owned()));
        }
        let id = TaskId::try_from(state.tasks.len())
            .map_err(|_| ExeError::InvalidArgument("too many tasks".to_owned()))?;
        if id.is_term() {
            return Err(ExeError::InvalidArgument("too many tasks".to_owned()));
        }

        state.names.insert(name.to_owned(), id);
        state.tasks.push(Arc::new(Task {
            id,
            name: name.to_owned(),
            kind,
        }));
        state.parents.push(BTreeSet::new());
        state.children.push(BTreeSet::new());
        state.roots.insert(id);
        state.leaves.insert(id);
        log::debug!("registered task {name:?} as {id}");
        Ok(id)
    }

    // ── Lookup ────────────────────────────────────────────────────────────

    /// A handle to the registered task with this id.
    pub fn task(&self, id: TaskId) -> ExeResult<Arc<Task>> {
        self.lock()
            .tasks
            .get(id.index())
            .cloned()
            .ok_or_else(|| ExeError::UnknownTask(id.to_string()))
    }

    /// The id registered under `name`.
    pub fn task_id(&self, name: &str) -> ExeResult<TaskId> {
        self.lock()
            .names
            .get(name)
            .copied()
            .ok_or_else(|| ExeError::UnknownTask(name.to_owned()))
    }

    /// A handle to the registered task with this name.
    pub fn task_by_name(&self, name: &str) -> ExeResult<Arc<Task>> {
        let id = self.task_id(name)?;
        self.task(id)
    }

    /// Number of registered tasks.
    pub fn task_count(&self) -> usize {
        self.lock().tasks.len()
    }

    /// The tasks `id` depends on.
    pub fn dependencies(&self, id: TaskId) -> ExeResult<Vec<TaskId>> {
        let state = self.lock();
        state
            .parents
            .get(id.index())
            .map(|s| s.iter().copied().collect())
            .ok_or_else(|| ExeError::UnknownTask(id.to_string()))
    }

    /// The tasks depending on `id`.
    pub fn dependents(&self, id: TaskId) -> ExeResult<Vec<TaskId>> {
        let state = self.lock();
        state
            .children
            .get(id.index())
            .map(|s| s.iter().copied().collect())
            .ok_or_else(|| ExeError::UnknownTask(id.to_string()))
    }

    /// Number of tasks with no dependencies.
    pub fn root_count(&self) -> usize {
        self.lock().roots.len()
    }

    /// Number of tasks with no dependents.
    pub fn leaf_count(&self) -> usize {
        self.lock().leaves.len()
    }

    // ── Dependencies ──────────────────────────────────────────────────────

    /// Declare that `task` must not start before `parent` completes.
    pub fn add_dependency(&self, task: TaskId, parent: TaskId) -> ExeResult<()> {
        self.check_not_finalized()?;
        if task == parent {
            return Err(ExeError::SelfDependency(task));
        }
        let mut state = self.lock();
        if task.index() >= state.tasks.len() {
            return Err(ExeError::UnknownTask(task.to_string()));
        }
        if parent.index() >= state.tasks.len() {
            return Err(ExeError::UnknownTask(parent.to_string()));
        }
        if would_cycle(&state.parents, task, parent) {
            return Err(ExeError::DependencyCycle { task, parent });
        }

        state.parents[task.index()].insert(parent);
        state.children[parent.index()].insert(task);
        state.roots.remove(&task);
        state.leaves.remove(&parent);
        Ok(())
    }

    /// [`add_dependency`](Self::add_dependency) by task names.
    pub fn add_dependency_by_name(&self, task: &str, parent: &str) -> ExeResult<()> {
        let task = self.task_id(task)?;
        let parent = self.task_id(parent)?;
        self.add_dependency(task, parent)
    }

    // ── Finalization ──────────────────────────────────────────────────────

    /// Lock the graph: no more tasks or dependencies.  Idempotent.
    ///
    /// Validates that any two tasks writing the same agent variable are
    /// ordered by the graph — unordered writers are a configuration error,
    /// because the scheduler will happily run them concurrently.
    pub fn finalize(&self) -> ExeResult<()> {
        if self.finalized.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.validate_writer_ordering()?;
        self.finalized.store(true, Ordering::SeqCst);
        self.iter_reset()?;
        log::debug!("task graph finalized with {} tasks", self.task_count());
        Ok(())
    }

    /// `true` once [`finalize`](Self::finalize) has been called.
    pub fn is_finalized(&self) -> bool {
        self.finalized.load(Ordering::SeqCst)
    }

    fn validate_writer_ordering(&self) -> ExeResult<()> {
        let state = self.lock();

        // (agent, var) → ids of tasks holding a ReadWrite grant.
        let mut writers: FxHashMap<(String, String), Vec<TaskId>> = FxHashMap::default();
        for task in &state.tasks {
            if let TaskKind::Agent(t) = &task.kind {
                for (var, access) in t.shadow.granted() {
                    if access == Access::ReadWrite {
                        writers
                            .entry((t.agent.clone(), var.to_owned()))
                            .or_default()
                            .push(task.id);
                    }
                }
            }
        }

        for ((agent, var), ids) in &writers {
            for (i, &a) in ids.iter().enumerate() {
                for &b in &ids[i + 1..] {
                    if !reachable(&state.children, a, b) && !reachable(&state.children, b, a) {
                        return Err(ExeError::UnorderedWriters {
                            agent: agent.clone(),
                            var: var.clone(),
                            first: state.tasks[a.index()].name.clone(),
                            second: state.tasks[b.index()].name.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    // ── Per-iteration protocol ────────────────────────────────────────────

    /// Reset the iteration state: every root is ready, everything else is
    /// pending with its full dependency set.
    pub fn iter_reset(&self) -> ExeResult<()> {
        self.check_finalized()?;
        let mut guard = self.lock();
        let TmState {
            tasks,
            parents,
            roots,
            pending_deps,
            ready,
            pending,
            assigned,
            ..
        } = &mut *guard;
        *pending_deps = parents.clone();
        *ready = roots.iter().copied().collect();
        assigned.clear();
        *pending = (0..tasks.len())
            .map(TaskId::try_from)
            .filter_map(Result::ok)
            .filter(|id| !roots.contains(id))
            .collect();
        Ok(())
    }

    /// Take one ready task id and mark it assigned.
    pub fn iter_pop(&self) -> ExeResult<TaskId> {
        self.check_finalized()?;
        let mut state = self.lock();
        let id = state.ready.pop_front().ok_or(ExeError::NoneAvailable)?;
        state.assigned.insert(id);
        Ok(id)
    }

    /// Retire a completed task: drop it from `assigned` and promote any
    /// child whose last unmet dependency it was.
    pub fn iter_done(&self, id: TaskId) -> ExeResult<()> {
        self.check_finalized()?;
        let mut state = self.lock();
        if !state.assigned.remove(&id) {
            return Err(ExeError::InvalidArgument(format!(
                "{id} reported done but was never assigned"
            )));
        }

        let TmState {
            children,
            pending_deps,
            ready,
            pending,
            ..
        } = &mut *state;
        for &child in &children[id.index()] {
            let deps = &mut pending_deps[child.index()];
            deps.remove(&id);
            if deps.is_empty() && pending.remove(&child) {
                ready.push_back(child);
            }
        }
        Ok(())
    }

    /// `true` while at least one task is ready to pop.
    pub fn iter_task_available(&self) -> ExeResult<bool> {
        self.check_finalized()?;
        Ok(!self.lock().ready.is_empty())
    }

    /// `true` once every task of the iteration has completed.
    pub fn iter_complete(&self) -> ExeResult<bool> {
        self.check_finalized()?;
        let state = self.lock();
        Ok(state.ready.is_empty() && state.assigned.is_empty() && state.pending.is_empty())
    }

    /// Number of tasks ready for execution.
    pub fn ready_count(&self) -> usize {
        self.lock().ready.len()
    }

    /// Number of tasks still waiting on dependencies.
    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }

    /// Number of tasks handed out but not yet reported done.
    pub fn assigned_count(&self) -> usize {
        self.lock().assigned.len()
    }

    // ── Internals ─────────────────────────────────────────────────────────

    fn check_not_finalized(&self) -> ExeResult<()> {
        if self.finalized.load(Ordering::SeqCst) {
            return Err(ExeError::AlreadyFinalised);
        }
        Ok(())
    }

    fn check_finalized(&self) -> ExeResult<()> {
        if !self.finalized.load(Ordering::SeqCst) {
            return Err(ExeError::NotFinalised);
        }
        Ok(())
    }
}

/// Would adding `parent` as a dependency of `task` close a cycle?  Walks
/// upward from `parent` through existing dependencies looking for `task`.
fn would_cycle(parents: &[BTreeSet<TaskId>], task: TaskId, parent: TaskId) -> bool {
    let mut visited = BTreeSet::new();
    let mut stack = vec![parent];
    while let Some(current) = stack.pop() {
        if current == task {
            return true;
        }
        if visited.insert(current) {
            stack.extend(parents[current.index()].iter().copied());
        }
    }
    false
}

/// Is `to` a (transitive) descendant of `from`?
fn reachable(children: &[BTreeSet<TaskId>], from: TaskId, to: TaskId) -> bool {
    let mut visited = BTreeSet::new();
    let mut stack = vec![from];
    while let Some(current) = stack.pop() {
        if current == to {
            return true;
        }
        if visited.insert(current) {
            stack.extend(children[current.index()].iter().copied());
        }
    }
    false
}
