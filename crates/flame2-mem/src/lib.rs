//! `flame2-mem` — columnar per-agent memory for the flame2 runtime.
//!
//! Agent state is stored structure-of-arrays: one growable, type-tagged
//! column per `(agent type, variable)`.  The [`MemoryManager`] is a two-phase
//! registry (register agents/variables, then operate); tasks see memory only
//! through an [`AgentShadow`] carrying a per-task access list, from which
//! they obtain a [`MemoryIterator`] over a contiguous row range.
//!
//! | Module       | Contents                                         |
//! |--------------|--------------------------------------------------|
//! | [`column`]   | `VarColumn` — tagged-variant storage column      |
//! | [`manager`]  | `MemoryManager`, `AgentMemory`, `AgentSchema`    |
//! | [`shadow`]   | `AgentShadow`, `Access`                          |
//! | [`iterator`] | `MemoryIterator` — range cursor with ACL checks  |
//! | [`error`]    | `MemError`, `MemResult`                          |

pub mod column;
pub mod error;
pub mod iterator;
pub mod manager;
pub mod shadow;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use column::VarColumn;
pub use error::{MemError, MemResult};
pub use iterator::MemoryIterator;
pub use manager::{AgentMemory, AgentSchema, MemoryManager};
pub use shadow::{Access, AgentShadow};
