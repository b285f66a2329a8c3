//! `MemoryManager` — the two-phase registry of agents and their columns.
//!
//! # Phases
//!
//! 1. **Registration**: `register_agent` / `register_variable` /
//!    `hint_population` are legal.  Handing out the first shadow closes
//!    registration for the whole manager; `hint_population` closes it for
//!    one agent (capacity is about to be committed).
//! 2. **Operation**: population queries, value loading, column reads for
//!    I/O, and shadow creation.
//!
//! The manager is shared behind `Arc` between the driver, the task manager,
//! and the I/O manager; all methods take `&self` and synchronize internally
//! (a registry `RwLock` plus one `Mutex` per agent's column set).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use rustc_hash::FxHashMap;

use flame2_core::{Value, VarScalar, VarType};

use crate::column::VarColumn;
use crate::shadow::AgentShadow;
use crate::{MemError, MemResult};

// ── AgentMemory ───────────────────────────────────────────────────────────────

/// All columns of one agent type, in variable registration order.
pub struct AgentMemory {
    name: String,
    state: Mutex<AgentColumns>,
}

pub(crate) struct AgentColumns {
    pub(crate) names: Vec<String>,
    pub(crate) columns: Vec<VarColumn>,
    pub(crate) index: FxHashMap<String, usize>,
    closed: bool,
}

impl AgentColumns {
    /// Current population, with a parity check across columns in debug
    /// builds.  An agent with no variables has population 0.
    pub(crate) fn population(&self) -> usize {
        let len = self.columns.first().map_or(0, VarColumn::len);
        debug_assert!(
            self.columns.iter().all(|c| c.len() == len),
            "column lengths diverged: {:?}",
            self.columns.iter().map(VarColumn::len).collect::<Vec<_>>()
        );
        len
    }
}

impl AgentMemory {
    fn new(name: &str) -> AgentMemory {
        AgentMemory {
            name: name.to_owned(),
            state: Mutex::new(AgentColumns {
                names: Vec::new(),
                columns: Vec::new(),
                index: FxHashMap::default(),
                closed: false,
            }),
        }
    }

    /// The agent type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current population size.
    pub fn population(&self) -> usize {
        self.lock().population()
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, AgentColumns> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn register_var(&self, var: &str, var_type: VarType) -> MemResult<()> {
        let mut cols = self.lock();
        if cols.closed {
            return Err(MemError::RegistrationClosed(format!(
                "agent {:?} already has committed capacity",
                self.name
            )));
        }
        if cols.index.contains_key(var) {
            return Err(MemError::AlreadyExists {
                what: "variable",
                name: var.to_owned(),
            });
        }
        let idx = cols.columns.len();
        cols.names.push(var.to_owned());
        cols.columns.push(VarColumn::new(var_type));
        cols.index.insert(var.to_owned(), idx);
        Ok(())
    }

    fn hint_population(&self, n: usize) {
        let mut cols = self.lock();
        for col in &mut cols.columns {
            col.reserve(n);
        }
        cols.closed = true;
    }

    pub(crate) fn close(&self) {
        self.lock().closed = true;
    }
}

// ── Schema ────────────────────────────────────────────────────────────────────

/// One agent's variable layout, as seen by population I/O plug-ins.
#[derive(Clone, Debug, PartialEq)]
pub struct AgentSchema {
    pub name: String,
    /// `(variable, type)` in registration order.
    pub vars: Vec<(String, VarType)>,
}

// ── MemoryManager ─────────────────────────────────────────────────────────────

/// Registry of all agent types and the sole owner of their columns.
pub struct MemoryManager {
    registry: RwLock<Registry>,
    closed: AtomicBool,
}

#[derive(Default)]
struct Registry {
    agents: FxHashMap<String, Arc<AgentMemory>>,
    /// Registration order, for deterministic schemas and I/O.
    order: Vec<String>,
}

impl Default for MemoryManager {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryManager {
    pub fn new() -> MemoryManager {
        MemoryManager {
            registry: RwLock::new(Registry::default()),
            closed: AtomicBool::new(false),
        }
    }

    // ── Registration phase ────────────────────────────────────────────────

    /// Register a new agent type.
    pub fn register_agent(&self, name: &str) -> MemResult<()> {
        self.check_open()?;
        let mut reg = self.registry.write().unwrap_or_else(|e| e.into_inner());
        if reg.agents.contains_key(name) {
            return Err(MemError::AlreadyExists {
                what: "agent",
                name: name.to_owned(),
            });
        }
        reg.agents.insert(name.to_owned(), Arc::new(AgentMemory::new(name)));
        reg.order.push(name.to_owned());
        log::debug!("registered agent {name:?}");
        Ok(())
    }

    /// Register a variable of scalar type `T` on an agent.
    pub fn register_variable<T: VarScalar>(&self, agent: &str, var: &str) -> MemResult<()> {
        self.register_variable_of(agent, var, T::VAR_TYPE)
    }

    /// Register a variable with a runtime type tag (used by loaders that
    /// discover the schema dynamically).
    pub fn register_variable_of(&self, agent: &str, var: &str, var_type: VarType) -> MemResult<()> {
        self.check_open()?;
        self.agent(agent)?.register_var(var, var_type)
    }

    /// Reserve capacity for a likely population size on every column of
    /// `agent`.  Implicitly closes variable registration for that agent.
    pub fn hint_population(&self, agent: &str, n: usize) -> MemResult<()> {
        self.agent(agent)?.hint_population(n);
        Ok(())
    }

    // ── Operation phase ───────────────────────────────────────────────────

    /// Current population size of an agent type.
    pub fn population_size(&self, agent: &str) -> MemResult<usize> {
        Ok(self.agent(agent)?.population())
    }

    /// Append one value to a column (the load path: plug-ins call this via
    /// the population sink).
    pub fn push_value(&self, agent: &str, var: &str, value: Value) -> MemResult<()> {
        let mem = self.agent(agent)?;
        let mut cols = mem.lock();
        let idx = *cols.index.get(var).ok_or_else(|| MemError::UnknownVariable {
            agent: agent.to_owned(),
            var: var.to_owned(),
        })?;
        cols.columns[idx].push(value)
    }

    /// Run `f` against one column under the agent's column lock (the I/O
    /// store path).  The dependency graph must ensure no writer task is in
    /// flight on this column.
    pub fn with_column<R>(
        &self,
        agent: &str,
        var: &str,
        f: impl FnOnce(&VarColumn) -> R,
    ) -> MemResult<R> {
        let mem = self.agent(agent)?;
        let cols = mem.lock();
        let idx = *cols.index.get(var).ok_or_else(|| MemError::UnknownVariable {
            agent: agent.to_owned(),
            var: var.to_owned(),
        })?;
        Ok(f(&cols.columns[idx]))
    }

    /// Create an access shadow for an agent type.  The shadow starts with an
    /// empty access list; grant variables with [`AgentShadow::allow`].
    ///
    /// Handing out the first shadow closes registration manager-wide.
    pub fn shadow(&self, agent: &str) -> MemResult<AgentShadow> {
        let mem = self.agent(agent)?;
        self.closed.store(true, Ordering::SeqCst);
        mem.close();
        Ok(AgentShadow::new(mem))
    }

    // ── Introspection ─────────────────────────────────────────────────────

    /// `true` if the agent type is registered.
    pub fn contains_agent(&self, name: &str) -> bool {
        self.registry
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .agents
            .contains_key(name)
    }

    /// Number of registered agent types.
    pub fn agent_count(&self) -> usize {
        self.registry
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .agents
            .len()
    }

    /// `true` if a variable is registered on an agent.
    pub fn contains_variable(&self, agent: &str, var: &str) -> bool {
        match self.agent(agent) {
            Ok(mem) => mem.lock().index.contains_key(var),
            Err(_) => false,
        }
    }

    /// The full agent/variable layout in registration order.
    pub fn schema(&self) -> Vec<AgentSchema> {
        let reg = self.registry.read().unwrap_or_else(|e| e.into_inner());
        reg.order
            .iter()
            .map(|name| {
                let mem = &reg.agents[name];
                let cols = mem.lock();
                AgentSchema {
                    name: name.clone(),
                    vars: cols
                        .names
                        .iter()
                        .zip(&cols.columns)
                        .map(|(n, c)| (n.clone(), c.var_type()))
                        .collect(),
                }
            })
            .collect()
    }

    // ── Internals ─────────────────────────────────────────────────────────

    fn agent(&self, name: &str) -> MemResult<Arc<AgentMemory>> {
        self.registry
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .agents
            .get(name)
            .cloned()
            .ok_or_else(|| MemError::UnknownAgent(name.to_owned()))
    }

    fn check_open(&self) -> MemResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(MemError::RegistrationClosed(
                "a shadow has already been issued".to_owned(),
            ));
        }
        Ok(())
    }
}
