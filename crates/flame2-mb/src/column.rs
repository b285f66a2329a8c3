//! Type-erased message storage.
//!
//! # Design
//!
//! Message payloads are arbitrary user structs, so — unlike agent variables,
//! which come from a closed scalar set — a board column is a `Vec<T>` behind
//! an object-safe vtable.  The vtable carries exactly the operations the
//! board machinery needs without knowing `T`: clone an empty twin (writer
//! staging columns), drain-append (sync), push/get by `Any` (dynamic access),
//! and a debug rendering per element.  Every dynamic entry point checks the
//! payload type and reports `MismatchedType`; there are no pointer casts.

use std::any::{Any, TypeId, type_name};
use std::fmt;

use crate::{MbError, MbResult};

// ── Message ───────────────────────────────────────────────────────────────────

/// Marker for types usable as message payloads.
///
/// Blanket-implemented: any `'static` type that is `Clone + Send + Sync +
/// Debug` qualifies, which in practice means plain data structs.
pub trait Message: Any + Clone + Send + Sync + fmt::Debug + 'static {}

impl<T: Any + Clone + Send + Sync + fmt::Debug + 'static> Message for T {}

// ── MessageColumn ─────────────────────────────────────────────────────────────

/// Object-safe interface over a typed message column.
pub trait MessageColumn: Send + Sync {
    /// Number of stored messages.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Request capacity for at least `n` messages.
    fn reserve(&mut self, n: usize);

    /// Remove all messages.
    fn clear(&mut self);

    /// `TypeId` of the payload type.
    fn payload_type(&self) -> TypeId;

    /// Human-readable payload type name (for error messages).
    fn payload_type_name(&self) -> &'static str;

    /// A new empty column with the same payload type.
    fn clone_empty(&self) -> Box<dyn MessageColumn>;

    /// A full copy of this column.
    fn clone_column(&self) -> Box<dyn MessageColumn>;

    /// Move all of `other`'s messages to the end of this column, leaving
    /// `other` empty.  Fails with `MismatchedType` on payload mismatch.
    fn append_from(&mut self, other: &mut dyn MessageColumn) -> MbResult<()>;

    /// Append one type-erased message.
    fn push_any(&mut self, value: Box<dyn Any>) -> MbResult<()>;

    /// A clone of the message at `idx`, or `None` past the end.
    fn get_any(&self, idx: usize) -> Option<Box<dyn Any>>;

    /// Debug rendering of the message at `idx`.
    fn fmt_element(&self, idx: usize) -> Option<String>;

    #[doc(hidden)]
    fn as_any(&self) -> &dyn Any;

    #[doc(hidden)]
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

// ── TypedMessageColumn ────────────────────────────────────────────────────────

/// The concrete `Vec<T>` behind a [`MessageColumn`].
pub struct TypedMessageColumn<T: Message>(pub Vec<T>);

impl<T: Message> TypedMessageColumn<T> {
    pub fn new() -> TypedMessageColumn<T> {
        TypedMessageColumn(Vec::new())
    }
}

impl<T: Message> Default for TypedMessageColumn<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Message> MessageColumn for TypedMessageColumn<T> {
    fn len(&self) -> usize {
        self.0.len()
    }

    fn reserve(&mut self, n: usize) {
        self.0.reserve(n);
    }

    fn clear(&mut self) {
        self.0.clear();
    }

    fn payload_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn payload_type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn clone_empty(&self) -> Box<dyn MessageColumn> {
        Box::new(TypedMessageColumn::<T>::new())
    }

    fn clone_column(&self) -> Box<dyn MessageColumn> {
        Box::new(TypedMessageColumn(self.0.clone()))
    }

    fn append_from(&mut self, other: &mut dyn MessageColumn) -> MbResult<()> {
        let found = other.payload_type_name();
        match other.as_any_mut().downcast_mut::<TypedMessageColumn<T>>() {
            Some(src) => {
                self.0.append(&mut src.0);
                Ok(())
            }
            None => Err(MbError::MismatchedType {
                expected: type_name::<T>(),
                found,
            }),
        }
    }

    fn push_any(&mut self, value: Box<dyn Any>) -> MbResult<()> {
        match value.downcast::<T>() {
            Ok(v) => {
                self.0.push(*v);
                Ok(())
            }
            Err(_) => Err(MbError::MismatchedType {
                expected: type_name::<T>(),
                found: "other payload type",
            }),
        }
    }

    fn get_any(&self, idx: usize) -> Option<Box<dyn Any>> {
        self.0.get(idx).map(|v| Box::new(v.clone()) as Box<dyn Any>)
    }

    fn fmt_element(&self, idx: usize) -> Option<String> {
        self.0.get(idx).map(|v| format!("{v:?}"))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
