//! `AgentShadow` — a per-task view of one agent type's memory.
//!
//! A shadow is a descriptor: the agent it covers plus the variables the
//! owning task may touch and at what level.  It owns no data; the columns
//! stay with the [`MemoryManager`](crate::MemoryManager).  Iterators created
//! from a shadow enforce its access list on every element access.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::column::RawColumn;
use crate::iterator::{IterColumn, MemoryIterator};
use crate::manager::AgentMemory;
use crate::{MemError, MemResult};

/// Access level granted for one variable.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Access {
    /// Read the variable.
    Read,
    /// Read and overwrite the variable.
    ReadWrite,
}

/// A per-task access descriptor for one agent type.
///
/// Holds the agent's memory alive (`Arc`), so a shadow may outlive the call
/// that created it but can never outlive the columns it views.
pub struct AgentShadow {
    mem: Arc<AgentMemory>,
    acl: FxHashMap<String, Access>,
}

impl AgentShadow {
    pub(crate) fn new(mem: Arc<AgentMemory>) -> AgentShadow {
        AgentShadow {
            mem,
            acl: FxHashMap::default(),
        }
    }

    /// The agent type this shadow views.
    pub fn agent_name(&self) -> &str {
        self.mem.name()
    }

    /// Grant access to one variable.  Granting a variable twice keeps the
    /// stronger level.
    pub fn allow(&mut self, var: &str, access: Access) -> MemResult<()> {
        if !self.mem.lock().index.contains_key(var) {
            return Err(MemError::UnknownVariable {
                agent: self.mem.name().to_owned(),
                var: var.to_owned(),
            });
        }
        let entry = self.acl.entry(var.to_owned()).or_insert(access);
        if access == Access::ReadWrite {
            *entry = Access::ReadWrite;
        }
        Ok(())
    }

    /// Current population size of the viewed agent.
    pub fn population(&self) -> usize {
        self.mem.population()
    }

    /// The granted variables and their levels (iteration order unspecified).
    pub fn granted(&self) -> impl Iterator<Item = (&str, Access)> {
        self.acl.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// An iterator over the whole population.
    pub fn iter(&self) -> MemResult<MemoryIterator> {
        let population = self.mem.population();
        self.iter_range(0, population)
    }

    /// An iterator over the contiguous row range `[offset, offset + count)`.
    ///
    /// Fails with `OutOfRange` if the range does not fit the population.
    pub fn iter_range(&self, offset: usize, count: usize) -> MemResult<MemoryIterator> {
        let mut cols = self.mem.lock();
        let population = cols.population();
        if offset > population || offset + count > population {
            return Err(MemError::OutOfRange(format!(
                "range [{offset}, {}) exceeds population {population} of agent {:?}",
                offset + count,
                self.mem.name(),
            )));
        }

        let mut granted = FxHashMap::default();
        for (var, &access) in &self.acl {
            // Granted names were validated against the index in `allow`, and
            // registration is closed once a shadow exists.
            let idx = *cols.index.get(var).ok_or_else(|| MemError::UnknownVariable {
                agent: self.mem.name().to_owned(),
                var: var.clone(),
            })?;
            let raw = RawColumn::capture(&mut cols.columns[idx]);
            granted.insert(var.clone(), IterColumn { access, raw });
        }
        drop(cols);

        Ok(MemoryIterator::new(
            Arc::clone(&self.mem),
            granted,
            offset,
            count,
        ))
    }
}
