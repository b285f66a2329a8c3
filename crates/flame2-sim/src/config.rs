//! Top-level simulation configuration.

use std::path::PathBuf;

use flame2_exe::DEFAULT_MIN_VECTOR_SIZE;

/// Knobs the driver sets once before iterating.
///
/// The defaults run every task type on one splitting FIFO queue sized to
/// the machine, with agent tasks splittable and CSV output in the current
/// directory.
#[derive(Clone, Debug)]
pub struct SimConfig {
    /// Worker threads serving the task queue.
    pub workers: usize,

    /// Whether large agent tasks are split across workers.
    pub split_agent_tasks: bool,

    /// Maximum sub-tasks per split.  `None` uses the worker count.
    pub max_tasks_per_split: Option<usize>,

    /// Minimum agent rows per sub-task after a split.
    pub min_vector_size: usize,

    /// Directory population snapshots are written to.
    pub output_dir: PathBuf,

    /// Output plug-in name (`"csv"`, `"sqlite"` with the feature, or a
    /// registered external plug-in).
    pub output_format: String,
}

impl Default for SimConfig {
    fn default() -> SimConfig {
        SimConfig {
            workers: std::thread::available_parallelism().map_or(1, usize::from),
            split_agent_tasks: true,
            max_tasks_per_split: None,
            min_vector_size: DEFAULT_MIN_VECTOR_SIZE,
            output_dir: PathBuf::from("."),
            output_format: "csv".to_owned(),
        }
    }
}

impl SimConfig {
    /// A single-worker, no-splitting configuration: slower, but two runs
    /// over the same population are bit-identical.
    pub fn deterministic() -> SimConfig {
        SimConfig {
            workers: 1,
            split_agent_tasks: false,
            ..SimConfig::default()
        }
    }
}
