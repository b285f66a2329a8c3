//! `VarColumn` — one variable's values across all agents of one type.
//!
//! # Design
//!
//! Agent variables come from a closed scalar set, so a column is a tagged
//! variant over concrete `Vec`s rather than a `Box<dyn …>` wrapper.  The tag
//! is fixed at construction; every operation that moves data in or out
//! checks it and reports `MismatchedType` on conflict.
//!
//! Storage is struct-of-arrays on purpose: an iterator can expose exactly
//! the columns its task is permitted to see, and split sub-tasks reduce to
//! disjoint index ranges over the same columns.

use flame2_core::{Value, VarType};

use crate::{MemError, MemResult};

/// A growable, type-tagged column of scalar values.
#[derive(Clone, Debug, PartialEq)]
pub enum VarColumn {
    Int(Vec<i32>),
    Double(Vec<f64>),
}

impl VarColumn {
    /// An empty column with the given element tag.
    pub fn new(var_type: VarType) -> VarColumn {
        match var_type {
            VarType::Int => VarColumn::Int(Vec::new()),
            VarType::Double => VarColumn::Double(Vec::new()),
        }
    }

    /// The element tag of this column.
    pub fn var_type(&self) -> VarType {
        match self {
            VarColumn::Int(_) => VarType::Int,
            VarColumn::Double(_) => VarType::Double,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            VarColumn::Int(v) => v.len(),
            VarColumn::Double(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Request capacity for at least `n` elements.
    pub fn reserve(&mut self, n: usize) {
        match self {
            VarColumn::Int(v) => v.reserve(n),
            VarColumn::Double(v) => v.reserve(n),
        }
    }

    /// Remove all elements, keeping the tag.
    pub fn clear(&mut self) {
        match self {
            VarColumn::Int(v) => v.clear(),
            VarColumn::Double(v) => v.clear(),
        }
    }

    /// A new empty column with the same tag.
    pub fn clone_empty(&self) -> VarColumn {
        VarColumn::new(self.var_type())
    }

    /// Append one element.  Fails with `MismatchedType` if the value's tag
    /// differs from the column's.
    pub fn push(&mut self, value: Value) -> MemResult<()> {
        match (self, value) {
            (VarColumn::Int(v), Value::Int(x)) => v.push(x),
            (VarColumn::Double(v), Value::Double(x)) => v.push(x),
            (col, value) => {
                return Err(MemError::MismatchedType {
                    expected: col.var_type(),
                    requested: value.var_type(),
                });
            }
        }
        Ok(())
    }

    /// Append all of `other`'s elements.  Fails with `MismatchedType` if the
    /// tags differ.
    pub fn append_from(&mut self, other: &VarColumn) -> MemResult<()> {
        match (self, other) {
            (VarColumn::Int(dst), VarColumn::Int(src)) => dst.extend_from_slice(src),
            (VarColumn::Double(dst), VarColumn::Double(src)) => dst.extend_from_slice(src),
            (dst, src) => {
                return Err(MemError::MismatchedType {
                    expected: dst.var_type(),
                    requested: src.var_type(),
                });
            }
        }
        Ok(())
    }

    /// The element at `idx`, or `None` past the end.
    pub fn value_at(&self, idx: usize) -> Option<Value> {
        match self {
            VarColumn::Int(v) => v.get(idx).copied().map(Value::Int),
            VarColumn::Double(v) => v.get(idx).copied().map(Value::Double),
        }
    }

    /// Typed view of an `Int` column.
    pub fn as_ints(&self) -> Option<&[i32]> {
        match self {
            VarColumn::Int(v) => Some(v),
            _ => None,
        }
    }

    /// Typed view of a `Double` column.
    pub fn as_doubles(&self) -> Option<&[f64]> {
        match self {
            VarColumn::Double(v) => Some(v),
            _ => None,
        }
    }
}

// ── Raw element access ────────────────────────────────────────────────────────

/// Base pointer + length captured from a column for lock-free element access
/// during an iteration window.
///
/// Captured under the owning agent's column lock; used by
/// [`crate::MemoryIterator`] afterwards without the lock.  Soundness rests on
/// the scheduler's invariants, spelled out on [`RawColumn::read`].
#[derive(Copy, Clone)]
pub(crate) enum RawParts {
    Int(*mut i32),
    Double(*mut f64),
}

#[derive(Copy, Clone)]
pub(crate) struct RawColumn {
    parts: RawParts,
    len: usize,
}

impl RawColumn {
    /// Capture the column's buffer.  Requires `&mut` so the capture itself
    /// is serialized by the caller's lock.
    pub(crate) fn capture(col: &mut VarColumn) -> RawColumn {
        match col {
            VarColumn::Int(v) => RawColumn {
                parts: RawParts::Int(v.as_mut_ptr()),
                len: v.len(),
            },
            VarColumn::Double(v) => RawColumn {
                parts: RawParts::Double(v.as_mut_ptr()),
                len: v.len(),
            },
        }
    }

    pub(crate) fn var_type(&self) -> VarType {
        match self.parts {
            RawParts::Int(_) => VarType::Int,
            RawParts::Double(_) => VarType::Double,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Read the element at `idx` without taking the column lock.
    ///
    /// # Safety
    ///
    /// - `idx < self.len` and the column has not been resized since capture
    ///   (population only changes during the load phase, when no iterators
    ///   exist).
    /// - No concurrent write to the same element.  The dependency graph
    ///   orders all tasks that touch one column; the only concurrency is
    ///   between sub-tasks of a single split task, which cover disjoint row
    ///   ranges by construction.
    pub(crate) unsafe fn read(&self, idx: usize) -> Value {
        debug_assert!(idx < self.len);
        match self.parts {
            RawParts::Int(p) => Value::Int(unsafe { p.add(idx).read() }),
            RawParts::Double(p) => Value::Double(unsafe { p.add(idx).read() }),
        }
    }

    /// Write the element at `idx` without taking the column lock.
    ///
    /// # Safety
    ///
    /// As [`RawColumn::read`], plus: no concurrent read of the same element.
    pub(crate) unsafe fn write(&self, idx: usize, value: Value) -> MemResult<()> {
        debug_assert!(idx < self.len);
        match (self.parts, value) {
            (RawParts::Int(p), Value::Int(x)) => unsafe { p.add(idx).write(x) },
            (RawParts::Double(p), Value::Double(x)) => unsafe { p.add(idx).write(x) },
            (_, value) => {
                return Err(MemError::MismatchedType {
                    expected: self.var_type(),
                    requested: value.var_type(),
                });
            }
        }
        Ok(())
    }
}

// The pointers alias heap buffers owned by an `Arc<AgentMemory>` the iterator
// also holds; sending the capture with its iterator to a worker is sound.
unsafe impl Send for RawColumn {}
