//! `MemoryIterator` — a cursor over a contiguous row range of one agent's
//! columns, enforcing the creating shadow's access list.
//!
//! The cursor position is relative to the range: a fresh iterator over
//! `[offset, offset + count)` reports `position() == 0` and walks `count`
//! rows.  Iteration order equals physical row order — two iterators over
//! disjoint ranges can run on different workers without touching the same
//! elements.
//!
//! Element access goes through raw column pointers captured at creation
//! (under the agent's column lock); see the safety notes on the capture type
//! in [`crate::column`] for the scheduling invariants this relies on.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use flame2_core::VarScalar;

use crate::column::RawColumn;
use crate::manager::AgentMemory;
use crate::shadow::Access;
use crate::{MemError, MemResult};

pub(crate) struct IterColumn {
    pub(crate) access: Access,
    pub(crate) raw: RawColumn,
}

/// Cursor over `[offset, offset + count)` of an agent's granted columns.
pub struct MemoryIterator {
    /// Keeps the columns alive for as long as the captured pointers exist.
    _mem: Arc<AgentMemory>,
    cols: FxHashMap<String, IterColumn>,
    offset: usize,
    count: usize,
    pos: usize,
}

impl MemoryIterator {
    pub(crate) fn new(
        mem: Arc<AgentMemory>,
        cols: FxHashMap<String, IterColumn>,
        offset: usize,
        count: usize,
    ) -> MemoryIterator {
        MemoryIterator {
            _mem: mem,
            cols,
            offset,
            count,
            pos: 0,
        }
    }

    /// `true` once the cursor has walked past the last row of its range.
    pub fn at_end(&self) -> bool {
        self.pos == self.count
    }

    /// Advance the cursor.  Returns `true` iff it moved.
    pub fn step(&mut self) -> bool {
        if self.at_end() {
            return false;
        }
        self.pos += 1;
        true
    }

    /// Reset the cursor to the start of its range.
    pub fn rewind(&mut self) {
        self.pos = 0;
    }

    /// Cursor position relative to the range start.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of rows in the range.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Absolute row index of the cursor (range offset + position).
    pub fn absolute_row(&self) -> usize {
        self.offset + self.pos
    }

    /// A copy of the current row's value in column `var`.
    ///
    /// Fails with `AccessDenied` if `var` was not granted, `MismatchedType`
    /// if `T` does not match the column, `OutOfRange` once at the end.
    pub fn get<T: VarScalar>(&self, var: &str) -> MemResult<T> {
        let col = self.cols.get(var).ok_or_else(|| MemError::AccessDenied {
            var: var.to_owned(),
            op: "read",
        })?;
        if col.raw.var_type() != T::VAR_TYPE {
            return Err(MemError::MismatchedType {
                expected: col.raw.var_type(),
                requested: T::VAR_TYPE,
            });
        }
        if self.at_end() {
            return Err(MemError::OutOfRange("iterator consumed".to_owned()));
        }
        let idx = self.offset + self.pos;
        debug_assert!(idx < col.raw.len());
        // SAFETY: idx is inside the captured length; the scheduling
        // invariants (no resize during iteration, disjoint concurrent
        // ranges) are documented on RawColumn::read.
        let value = unsafe { col.raw.read(idx) };
        T::from_value(value).ok_or(MemError::MismatchedType {
            expected: value.var_type(),
            requested: T::VAR_TYPE,
        })
    }

    /// Overwrite the current row's value in column `var`.
    ///
    /// Fails as [`get`](Self::get), plus `AccessDenied` when the grant is
    /// read-only.
    pub fn set<T: VarScalar>(&mut self, var: &str, value: T) -> MemResult<()> {
        let col = self.cols.get(var).ok_or_else(|| MemError::AccessDenied {
            var: var.to_owned(),
            op: "write",
        })?;
        if col.access != Access::ReadWrite {
            return Err(MemError::AccessDenied {
                var: var.to_owned(),
                op: "write",
            });
        }
        if col.raw.var_type() != T::VAR_TYPE {
            return Err(MemError::MismatchedType {
                expected: col.raw.var_type(),
                requested: T::VAR_TYPE,
            });
        }
        if self.at_end() {
            return Err(MemError::OutOfRange("iterator consumed".to_owned()));
        }
        let idx = self.offset + self.pos;
        debug_assert!(idx < col.raw.len());
        // SAFETY: as in `get`; writes additionally rely on the graph giving
        // this task the only write window for the column.
        unsafe { col.raw.write(idx, value.into_value()) }
    }
}
