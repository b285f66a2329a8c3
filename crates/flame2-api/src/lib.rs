//! `flame2-api` — the surface agent transition functions program against.
//!
//! A transition function receives one [`AgentApi`] and nothing else.  The
//! proxy binds a memory iterator positioned on the current agent row to a
//! board client scoped to the task's message permissions; every access is
//! checked against the task's declared ACLs, and every failure is an
//! ordinary `Err` the function can propagate with `?`.
//!
//! ```ignore
//! let output: AgentFn = Arc::new(|api| {
//!     let msg = Location {
//!         id: api.get("id")?,
//!         x: api.get("x")?,
//!         y: api.get("y")?,
//!     };
//!     api.post("location", msg)?;
//!     Ok(AgentStatus::Alive)
//! });
//! ```

pub mod agent_api;
pub mod error;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use agent_api::{AgentApi, AgentFn, AgentResult, AgentStatus};
pub use error::ApiError;
