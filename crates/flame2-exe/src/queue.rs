//! `SplittingFifoTaskQueue` — a FIFO task queue served by a fixed pool of
//! worker threads, with opportunistic splitting of large agent tasks.
//!
//! # Hand-out protocol
//!
//! `enqueue` pushes an id and, for splittable task types, attempts a split;
//! a successful split registers a [`TaskSplitter`] under the id and wakes
//! one worker per sub-task.  `get_next` peeks the queue front: a split entry
//! stays at the front until its last sub-task slot is handed out, so several
//! workers pop the *same* id and fetch distinct sub-tasks from the splitter.
//! `task_done` only reports a split id upstream once every sub-task has
//! completed — the dependency graph sees one logical completion.
//!
//! # Worker loop
//!
//! Pop an id; the TERM sentinel exits the loop.  Run the task, catching both
//! errors and panics from user code — failures go to the driver over the
//! failure channel, the worker itself keeps running, and `task_done` is
//! always reported so an iteration drains even when tasks fail.  Dropping
//! the queue enqueues one TERM per worker and joins them all.

use std::collections::{BTreeSet, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::JoinHandle;

use crossbeam_channel::Sender;
use rustc_hash::FxHashMap;

use flame2_core::TaskId;

use crate::hook::CompactionHook;
use crate::manager::TaskManager;
use crate::splitter::TaskSplitter;
use crate::task::{Task, TaskType};
use crate::{ExeError, ExeResult};

/// Default minimum rows per sub-task after a split.
pub const DEFAULT_MIN_VECTOR_SIZE: usize = 50;

struct QueueState {
    fifo: VecDeque<TaskId>,
    split_map: FxHashMap<TaskId, Arc<TaskSplitter>>,
    splittable: BTreeSet<TaskType>,
    max_splits: usize,
    min_vector_size: usize,
}

pub(crate) struct QueueShared {
    state: Mutex<QueueState>,
    ready: Condvar,
    tasks: Arc<TaskManager>,
    /// Invoked once per logically completed task id (splits collapse to one
    /// call).  Wired to the scheduler's completion inbox.
    callback: Box<dyn Fn(TaskId) + Send + Sync>,
    failures: Sender<ExeError>,
    hook: Arc<dyn CompactionHook>,
}

impl QueueShared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Block until an id is available and claim one hand-out slot for it.
    fn get_next(&self) -> TaskId {
        let mut guard = self.lock();
        loop {
            let state = &mut *guard;
            if let Some(&front) = state.fifo.front() {
                match state.split_map.get(&front) {
                    Some(splitter) => {
                        if splitter.assign_one() {
                            state.fifo.pop_front();
                        }
                    }
                    None => {
                        state.fifo.pop_front();
                    }
                }
                return front;
            }
            guard = self.ready.wait(guard).unwrap_or_else(|e| e.into_inner());
        }
    }

    /// Resolve a claimed id to a runnable task (a sub-task for split ids).
    fn task_for(&self, id: TaskId) -> ExeResult<Arc<Task>> {
        let state = self.lock();
        match state.split_map.get(&id) {
            Some(splitter) => splitter.next_subtask(),
            None => self.tasks.task(id),
        }
    }

    /// Record one completion; invoke the upstream callback when the logical
    /// task (all sub-tasks included) is done.
    fn task_done(&self, id: TaskId) {
        let mut state = self.lock();
        let complete = match state.split_map.get(&id) {
            Some(splitter) => splitter.complete_one(),
            None => true,
        };
        if complete {
            state.split_map.remove(&id);
        }
        drop(state);
        if complete {
            (self.callback)(id);
        }
    }
}

fn panic_detail(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_owned()
    }
}

fn worker_loop(shared: Arc<QueueShared>) {
    loop {
        let id = shared.get_next();
        if id.is_term() {
            log::trace!("worker observed TERM, exiting");
            break;
        }

        let task = match shared.task_for(id) {
            Ok(task) => task,
            Err(e) => {
                log::warn!("no task for {id}: {e}");
                let _ = shared.failures.send(e);
                shared.task_done(id);
                continue;
            }
        };

        log::trace!("running task {:?} ({id}), range {:?}", task.name(), task.range());
        match panic::catch_unwind(AssertUnwindSafe(|| task.run())) {
            Ok(Ok(outcome)) => {
                if let Some(agent) = task.agent_name() {
                    for row in outcome.dead_rows {
                        shared.hook.agent_dead(agent, row);
                    }
                }
            }
            Ok(Err(e)) => {
                log::warn!("task {:?} failed: {e}", task.name());
                let _ = shared.failures.send(e);
            }
            Err(payload) => {
                let detail = panic_detail(payload);
                log::warn!("task {:?} panicked: {detail}", task.name());
                let _ = shared.failures.send(ExeError::TaskPanicked {
                    task: task.name().to_owned(),
                    detail,
                });
            }
        }
        shared.task_done(id);
    }
}

// ── SplittingFifoTaskQueue ────────────────────────────────────────────────────

/// FIFO queue + worker pool.  Created by the [`Scheduler`](crate::Scheduler).
pub struct SplittingFifoTaskQueue {
    shared: Arc<QueueShared>,
    workers: Vec<JoinHandle<()>>,
}

impl SplittingFifoTaskQueue {
    pub(crate) fn new(
        slots: usize,
        tasks: Arc<TaskManager>,
        callback: Box<dyn Fn(TaskId) + Send + Sync>,
        failures: Sender<ExeError>,
        hook: Arc<dyn CompactionHook>,
    ) -> ExeResult<SplittingFifoTaskQueue> {
        if slots < 1 {
            return Err(ExeError::InvalidArgument(
                "a task queue needs at least one worker slot".to_owned(),
            ));
        }

        let shared = Arc::new(QueueShared {
            state: Mutex::new(QueueState {
                fifo: VecDeque::new(),
                split_map: FxHashMap::default(),
                splittable: BTreeSet::new(),
                max_splits: slots,
                min_vector_size: DEFAULT_MIN_VECTOR_SIZE,
            }),
            ready: Condvar::new(),
            tasks,
            callback,
            failures,
            hook,
        });

        let mut workers = Vec::with_capacity(slots);
        for i in 0..slots {
            let shared = Arc::clone(&shared);
            let handle = std::thread::Builder::new()
                .name(format!("flame2-worker-{i}"))
                .spawn(move || worker_loop(shared))
                .map_err(ExeError::WorkerSpawn)?;
            workers.push(handle);
        }

        Ok(SplittingFifoTaskQueue { shared, workers })
    }

    // ── Configuration ─────────────────────────────────────────────────────

    /// Mark a task type as splittable on this queue.
    pub fn set_splittable(&self, task_type: TaskType) {
        self.shared.lock().splittable.insert(task_type);
    }

    /// Maximum sub-tasks per split (defaults to the slot count).
    pub fn set_max_tasks_per_split(&self, max_splits: usize) -> ExeResult<()> {
        if max_splits < 1 {
            return Err(ExeError::InvalidArgument(
                "max_tasks_per_split must be at least 1".to_owned(),
            ));
        }
        self.shared.lock().max_splits = max_splits;
        Ok(())
    }

    pub fn max_tasks_per_split(&self) -> usize {
        self.shared.lock().max_splits
    }

    /// Minimum rows per sub-task after a split.
    pub fn set_min_vector_size(&self, min_vector_size: usize) -> ExeResult<()> {
        if min_vector_size < 1 {
            return Err(ExeError::InvalidArgument(
                "min_vector_size must be at least 1".to_owned(),
            ));
        }
        self.shared.lock().min_vector_size = min_vector_size;
        Ok(())
    }

    pub fn min_vector_size(&self) -> usize {
        self.shared.lock().min_vector_size
    }

    /// Number of worker threads serving this queue.
    pub fn slots(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.lock().fifo.is_empty()
    }

    // ── Scheduler interface ───────────────────────────────────────────────

    /// Append a task id, splitting it first when eligible.
    pub fn enqueue(&self, id: TaskId) -> ExeResult<()> {
        let mut state = self.shared.lock();
        state.fifo.push_back(id);
        self.shared.ready.notify_one();

        // The TERM sentinel has no task object behind it.
        if id.is_term() {
            return Ok(());
        }

        let task = self.shared.tasks.task(id)?;
        if !state.splittable.contains(&task.task_type()) {
            return Ok(());
        }
        if state.split_map.contains_key(&id) {
            return Err(ExeError::InvalidArgument(format!(
                "{id} is already enqueued as a split task"
            )));
        }

        let (max_splits, min_size) = (state.max_splits, state.min_vector_size);
        if let Some(splitter) = task.split(max_splits, min_size)? {
            let extra_wakeups = splitter.subtask_count() - 1;
            state.split_map.insert(id, Arc::new(splitter));
            for _ in 0..extra_wakeups {
                self.shared.ready.notify_one();
            }
        }
        Ok(())
    }
}

impl Drop for SplittingFifoTaskQueue {
    /// Drain the pool: one TERM per worker, then join them all.
    fn drop(&mut self) {
        {
            let mut state = self.shared.lock();
            for _ in 0..self.workers.len() {
                state.fifo.push_back(TaskId::TERM);
            }
        }
        self.shared.ready.notify_all();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}
