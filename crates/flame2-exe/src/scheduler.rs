//! `Scheduler` — binds the task manager to one or more task queues.
//!
//! Task types can share a queue or get their own; the default
//! [`Scheduler::fifo`] configuration routes all three types to a single
//! splitting FIFO queue and marks agent tasks splittable.
//!
//! Per iteration the scheduler pops every ready task into its queue, then
//! blocks on a completion inbox fed by queue callbacks; each drained
//! completion retires the task in the manager, which may promote new ready
//! tasks.  Failures never travel through the inbox — workers push them onto
//! a channel the driver drains after the iteration.

use std::sync::{Arc, Condvar, Mutex};

use crossbeam_channel::{Receiver, Sender, unbounded};
use rustc_hash::FxHashMap;

use flame2_core::TaskId;

use crate::hook::{CompactionHook, NoopCompaction};
use crate::manager::TaskManager;
use crate::queue::SplittingFifoTaskQueue;
use crate::task::TaskType;
use crate::{ExeError, ExeResult};

// ── Completion inbox ──────────────────────────────────────────────────────────

struct DoneInbox {
    completed: Mutex<Vec<TaskId>>,
    cv: Condvar,
}

impl DoneInbox {
    fn new() -> DoneInbox {
        DoneInbox {
            completed: Mutex::new(Vec::new()),
            cv: Condvar::new(),
        }
    }

    fn push(&self, id: TaskId) {
        self.completed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(id);
        self.cv.notify_one();
    }

    /// Block until at least one completion arrived, then take them all.
    fn wait_drain(&self) -> Vec<TaskId> {
        let mut completed = self.completed.lock().unwrap_or_else(|e| e.into_inner());
        while completed.is_empty() {
            completed = self.cv.wait(completed).unwrap_or_else(|e| e.into_inner());
        }
        std::mem::take(&mut *completed)
    }

    fn clear(&self) {
        self.completed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

// ── Scheduler ─────────────────────────────────────────────────────────────────

/// Drives iterations of the task graph across a set of worker-pool queues.
pub struct Scheduler {
    tasks: Arc<TaskManager>,
    queues: Vec<SplittingFifoTaskQueue>,
    route: FxHashMap<TaskType, usize>,
    inbox: Arc<DoneInbox>,
    failure_tx: Sender<ExeError>,
    failure_rx: Receiver<ExeError>,
    hook: Arc<dyn CompactionHook>,
}

impl Scheduler {
    /// An empty scheduler: add queues and routes before running.
    pub fn new(tasks: Arc<TaskManager>) -> Scheduler {
        let (failure_tx, failure_rx) = unbounded();
        Scheduler {
            tasks,
            queues: Vec::new(),
            route: FxHashMap::default(),
            inbox: Arc::new(DoneInbox::new()),
            failure_tx,
            failure_rx,
            hook: Arc::new(NoopCompaction),
        }
    }

    /// The reference configuration: one splitting FIFO queue with `slots`
    /// workers serving all three task types, agent tasks splittable.
    pub fn fifo(tasks: Arc<TaskManager>, slots: usize) -> ExeResult<Scheduler> {
        let mut scheduler = Scheduler::new(tasks);
        let queue = scheduler.create_queue(slots)?;
        scheduler.assign_task_type(TaskType::Agent, queue)?;
        scheduler.assign_task_type(TaskType::Board, queue)?;
        scheduler.assign_task_type(TaskType::Io, queue)?;
        scheduler.set_splittable(queue, TaskType::Agent)?;
        Ok(scheduler)
    }

    // ── Configuration ─────────────────────────────────────────────────────

    /// Install the compaction hook.  Must happen before any queue exists,
    /// because workers capture the hook at spawn.
    pub fn set_compaction_hook(&mut self, hook: Arc<dyn CompactionHook>) -> ExeResult<()> {
        if !self.queues.is_empty() {
            return Err(ExeError::InvalidArgument(
                "set the compaction hook before creating queues".to_owned(),
            ));
        }
        self.hook = hook;
        Ok(())
    }

    /// Create a queue with `slots` worker threads; returns its index.
    pub fn create_queue(&mut self, slots: usize) -> ExeResult<usize> {
        let inbox = Arc::clone(&self.inbox);
        let queue = SplittingFifoTaskQueue::new(
            slots,
            Arc::clone(&self.tasks),
            Box::new(move |id| inbox.push(id)),
            self.failure_tx.clone(),
            Arc::clone(&self.hook),
        )?;
        self.queues.push(queue);
        Ok(self.queues.len() - 1)
    }

    /// Route all tasks of `task_type` to queue `queue`.
    pub fn assign_task_type(&mut self, task_type: TaskType, queue: usize) -> ExeResult<()> {
        self.queue_at(queue)?;
        self.route.insert(task_type, queue);
        Ok(())
    }

    /// Mark `task_type` splittable on queue `queue`.
    pub fn set_splittable(&self, queue: usize, task_type: TaskType) -> ExeResult<()> {
        self.queue_at(queue)?.set_splittable(task_type);
        Ok(())
    }

    pub fn set_max_tasks_per_split(&self, queue: usize, n: usize) -> ExeResult<()> {
        self.queue_at(queue)?.set_max_tasks_per_split(n)
    }

    pub fn set_min_vector_size(&self, queue: usize, n: usize) -> ExeResult<()> {
        self.queue_at(queue)?.set_min_vector_size(n)
    }

    fn queue_at(&self, queue: usize) -> ExeResult<&SplittingFifoTaskQueue> {
        self.queues.get(queue).ok_or_else(|| {
            ExeError::InvalidArgument(format!("no queue with index {queue}"))
        })
    }

    /// The installed compaction hook.
    pub fn compaction_hook(&self) -> &Arc<dyn CompactionHook> {
        &self.hook
    }

    /// The task manager this scheduler drives.
    pub fn tasks(&self) -> &Arc<TaskManager> {
        &self.tasks
    }

    // ── Iteration ─────────────────────────────────────────────────────────

    /// Run one full traversal of the task graph.
    ///
    /// Returns once every task has completed.  Task failures do not abort
    /// the traversal; drain them afterwards with
    /// [`drain_failures`](Self::drain_failures).
    pub fn run_iteration(&self) -> ExeResult<()> {
        self.inbox.clear();
        self.tasks.iter_reset()?;
        log::debug!(
            "iteration start: {} ready / {} pending",
            self.tasks.ready_count(),
            self.tasks.pending_count()
        );

        while !self.tasks.iter_complete()? {
            // Feed every ready task to its queue.
            loop {
                let id = match self.tasks.iter_pop() {
                    Ok(id) => id,
                    Err(ExeError::NoneAvailable) => break,
                    Err(e) => return Err(e),
                };
                let task_type = self.tasks.task(id)?.task_type();
                let queue = *self
                    .route
                    .get(&task_type)
                    .ok_or(ExeError::NoQueueForType(task_type))?;
                log::trace!("dispatching {id} ({task_type:?}) to queue {queue}");
                self.queues[queue].enqueue(id)?;
            }

            if self.tasks.iter_complete()? {
                break;
            }

            // Block until workers finish something, then retire it — which
            // may promote new ready tasks for the next pass.
            for id in self.inbox.wait_drain() {
                self.tasks.iter_done(id)?;
            }
        }
        log::debug!("iteration complete");
        Ok(())
    }

    /// Take every failure workers reported since the last drain.
    pub fn drain_failures(&self) -> Vec<ExeError> {
        self.failure_rx.try_iter().collect()
    }
}
