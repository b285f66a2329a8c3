//! `flame2-sim` — top-level wiring for flame2 simulations.
//!
//! [`Runtime`] owns the four managers (memory, boards, I/O, tasks) as
//! explicit shared handles — the replacement for the classic singleton
//! facade — and offers passthroughs for the whole driver sequence: register
//! agents and messages, create tasks and dependencies, load a population,
//! finalize.  [`Simulation`] then binds a runtime to a configured scheduler
//! and runs iterations, draining worker failures after each one.
//!
//! ```ignore
//! let rt = Runtime::new();
//! rt.register_agent("Circle")?;
//! rt.register_variable::<f64>("Circle", "x")?;
//! // … messages, tasks, dependencies …
//! let sim = Simulation::new(rt, SimConfig::default())?;
//! sim.run(100, &mut NoopObserver)?;
//! ```

pub mod config;
pub mod error;
pub mod observer;
pub mod runtime;
pub mod simulation;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::SimConfig;
pub use error::{SimError, SimResult};
pub use observer::{NoopObserver, RunObserver};
pub use runtime::Runtime;
pub use simulation::Simulation;

// The driver-facing surface of the lower crates.
pub use flame2_api::{AgentApi, AgentFn, AgentResult, AgentStatus};
pub use flame2_core::{TaskId, Value, VarType};
pub use flame2_exe::{AgentAccess, BoardOp, CompactionHook, IoOp, NoopCompaction, Scheduler};
pub use flame2_mem::Access;
