use flame2_api::ApiError;
use flame2_core::TaskId;
use flame2_io::IoError;
use flame2_mb::MbError;
use flame2_mem::MemError;
use thiserror::Error;

use crate::task::TaskType;

/// Errors raised by the execution core.
#[derive(Debug, Error)]
pub enum ExeError {
    #[error("unknown task {0}")]
    UnknownTask(String),

    #[error("task {0:?} is already registered")]
    DuplicateTask(String),

    #[error("finalize() has been called; the task graph can no longer change")]
    AlreadyFinalised,

    #[error("finalize() has not been called yet")]
    NotFinalised,

    #[error("task {0} cannot depend on itself")]
    SelfDependency(TaskId),

    #[error("adding dependency {task} -> {parent} would introduce a cycle")]
    DependencyCycle { task: TaskId, parent: TaskId },

    #[error("no task is ready for execution")]
    NoneAvailable,

    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("no queue is assigned to run {0:?} tasks")]
    NoQueueForType(TaskType),

    #[error(
        "tasks {first:?} and {second:?} both write {agent}.{var} but are unordered in the graph"
    )]
    UnorderedWriters {
        agent: String,
        var: String,
        first: String,
        second: String,
    },

    #[error("failed to spawn worker thread: {0}")]
    WorkerSpawn(std::io::Error),

    #[error("task {task:?} (agent {agent:?}, row {row}) failed: {source}")]
    TaskFailure {
        task: String,
        agent: String,
        row: usize,
        source: ApiError,
    },

    #[error("task {task:?} panicked: {detail}")]
    TaskPanicked { task: String, detail: String },

    #[error(transparent)]
    Mem(#[from] MemError),

    #[error(transparent)]
    Board(#[from] MbError),

    #[error(transparent)]
    Io(#[from] IoError),
}

/// Shorthand result type for the execution core.
pub type ExeResult<T> = Result<T, ExeError>;
