//! `flame2-core` — foundational types for the flame2 simulation runtime.
//!
//! This crate is a dependency of every other `flame2-*` crate.  It
//! intentionally has no `flame2-*` dependencies and no required external ones
//! (only optional `serde`).
//!
//! # What lives here
//!
//! | Module     | Contents                                      |
//! |------------|-----------------------------------------------|
//! | [`ids`]    | `TaskId` (dense task index + TERM sentinel)   |
//! | [`value`]  | `VarType`, `Value`, `VarScalar`               |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                              |
//! |---------|-----------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types. |

pub mod ids;
pub mod value;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use ids::TaskId;
pub use value::{Value, VarScalar, VarType};
