//! `Simulation` — a runtime bound to a configured scheduler.

use std::sync::Arc;

use flame2_exe::{CompactionHook, Scheduler, TaskType};

use crate::config::SimConfig;
use crate::observer::{NoopObserver, RunObserver};
use crate::runtime::Runtime;
use crate::{SimError, SimResult};

/// A ready-to-run simulation.
///
/// Construction finalizes the task graph, applies the I/O configuration,
/// and builds the queue/worker setup described by [`SimConfig`].
pub struct Simulation {
    runtime: Runtime,
    scheduler: Scheduler,
}

impl Simulation {
    pub fn new(runtime: Runtime, config: SimConfig) -> SimResult<Simulation> {
        Self::with_hook(runtime, config, None)
    }

    /// As [`new`](Self::new), with a compaction hook receiving `Dead` rows.
    pub fn with_hook(
        runtime: Runtime,
        config: SimConfig,
        hook: Option<Arc<dyn CompactionHook>>,
    ) -> SimResult<Simulation> {
        if config.workers < 1 {
            return Err(SimError::Config("workers must be at least 1".to_owned()));
        }

        runtime.finalize()?;
        runtime.io().set_output_dir(&config.output_dir);
        runtime.io().set_active(&config.output_format)?;

        let mut scheduler = Scheduler::new(Arc::clone(runtime.tasks()));
        if let Some(hook) = hook {
            scheduler.set_compaction_hook(hook)?;
        }
        let queue = scheduler.create_queue(config.workers)?;
        scheduler.assign_task_type(TaskType::Agent, queue)?;
        scheduler.assign_task_type(TaskType::Board, queue)?;
        scheduler.assign_task_type(TaskType::Io, queue)?;
        if config.split_agent_tasks {
            scheduler.set_splittable(queue, TaskType::Agent)?;
            let max = config.max_tasks_per_split.unwrap_or(config.workers);
            scheduler.set_max_tasks_per_split(queue, max)?;
            scheduler.set_min_vector_size(queue, config.min_vector_size)?;
        }

        Ok(Simulation { runtime, scheduler })
    }

    /// The wrapped runtime (for inspecting state between or after runs).
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Run `iterations` traversals of the task graph, numbered from 1.
    ///
    /// A task failure makes its iteration unsuccessful: the iteration still
    /// drains (dependents run), but `run` stops afterwards and returns the
    /// collected failures.  The driver decides whether to call `run` again.
    pub fn run(&self, iterations: u64, observer: &mut dyn RunObserver) -> SimResult<()> {
        for iteration in 1..=iterations {
            observer.on_iteration_start(iteration);
            self.runtime.io().set_iteration(iteration);

            self.scheduler.run_iteration()?;

            let failures = self.scheduler.drain_failures();
            if !failures.is_empty() {
                log::error!(
                    "iteration {iteration}: {} task failure(s), stopping",
                    failures.len()
                );
                return Err(SimError::IterationFailed { iteration, failures });
            }

            self.scheduler.compaction_hook().compact()?;
            observer.on_iteration_end(iteration);
            log::debug!("iteration {iteration} complete");
        }
        observer.on_run_end(iterations);
        Ok(())
    }

    /// [`run`](Self::run) without callbacks.
    pub fn run_iterations(&self, iterations: u64) -> SimResult<()> {
        self.run(iterations, &mut NoopObserver)
    }
}
