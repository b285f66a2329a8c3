//! The scalar value model for agent memory variables.
//!
//! # Design
//!
//! Agent variables come from a closed set of primitive types known at
//! registration time, so a column is a tagged variant rather than a fully
//! type-erased vector.  [`VarType`] is the runtime tag, [`Value`] is one
//! element in transit (loading, inspection, I/O), and [`VarScalar`] maps a
//! Rust scalar type onto its tag so that `get::<f64>(..)` can be checked
//! dynamically against the column it touches.
//!
//! Adding a scalar type means adding a `VarType` variant, a `Value` variant,
//! and a `VarScalar` impl; every `match` in the storage layer is exhaustive,
//! so the compiler lists the places to extend.

use std::fmt;

// ── VarType ───────────────────────────────────────────────────────────────────

/// Runtime tag identifying the element type of an agent memory column.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VarType {
    /// 32-bit signed integer (`i32`).
    Int,
    /// 64-bit float (`f64`).
    Double,
}

impl VarType {
    /// Lower-case name used in schema listings and error messages.
    pub fn name(self) -> &'static str {
        match self {
            VarType::Int => "int",
            VarType::Double => "double",
        }
    }
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Value ─────────────────────────────────────────────────────────────────────

/// One scalar element in transit between a column and the outside world.
///
/// The `Display` impl round-trips through `str::parse` for both variants,
/// which is what the population I/O plug-ins rely on.
#[derive(Copy, Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    Int(i32),
    Double(f64),
}

impl Value {
    /// The tag of this value.
    pub fn var_type(self) -> VarType {
        match self {
            Value::Int(_) => VarType::Int,
            Value::Double(_) => VarType::Double,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Value {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Value {
        Value::Double(v)
    }
}

// ── VarScalar ─────────────────────────────────────────────────────────────────

/// A Rust scalar type usable as an agent memory variable.
///
/// Implemented for `i32` and `f64`.  The associated [`VarType`] is what the
/// storage layer compares against a column's tag before any typed access.
pub trait VarScalar: Copy + Send + Sync + 'static {
    /// The runtime tag for this scalar type.
    const VAR_TYPE: VarType;

    /// Wrap into a [`Value`].
    fn into_value(self) -> Value;

    /// Unwrap from a [`Value`]; `None` on tag mismatch.
    fn from_value(value: Value) -> Option<Self>;
}

impl VarScalar for i32 {
    const VAR_TYPE: VarType = VarType::Int;

    fn into_value(self) -> Value {
        Value::Int(self)
    }

    fn from_value(value: Value) -> Option<i32> {
        match value {
            Value::Int(v) => Some(v),
            _ => None,
        }
    }
}

impl VarScalar for f64 {
    const VAR_TYPE: VarType = VarType::Double;

    fn into_value(self) -> Value {
        Value::Double(self)
    }

    fn from_value(value: Value) -> Option<f64> {
        match value {
            Value::Double(v) => Some(v),
            _ => None,
        }
    }
}
