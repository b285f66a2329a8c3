//! `flame2-io` — population I/O for the flame2 runtime.
//!
//! The core never parses or formats files.  It talks to plug-ins through
//! exactly two contracts:
//!
//! - **Load**: the manager hands the plug-in a [`PopSink`]; the plug-in
//!   reads its file and calls `add_int` / `add_double` per value.
//! - **Store**: the three I/O task kinds call [`IoManager::init_output`],
//!   [`IoManager::write_variable`] (once per `(agent, var)`), and
//!   [`IoManager::finalize_output`], which forward to the active plug-in.
//!
//! Two reference plug-ins ship here: CSV (always available) and SQLite
//! (behind the `sqlite` Cargo feature).
//!
//! | Module      | Contents                                    |
//! |-------------|---------------------------------------------|
//! | [`plugin`]  | `PopPlugin`, `PopSink`, `OutputContext`     |
//! | [`manager`] | `IoManager`, `MemorySink`                   |
//! | [`csv`]     | `CsvPop`                                    |
//! | [`sqlite`]  | `SqlitePop` (feature `sqlite`)              |
//! | [`error`]   | `IoError`, `IoResult`                       |

pub mod csv;
pub mod error;
pub mod manager;
pub mod plugin;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use csv::CsvPop;
pub use error::{IoError, IoResult};
pub use manager::{IoManager, MemorySink};
pub use plugin::{OutputContext, PopPlugin, PopSink};

#[cfg(feature = "sqlite")]
pub use sqlite::SqlitePop;
