//! `IoManager` — plug-in registry and the bridge between I/O tasks and the
//! memory manager.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use flame2_mem::MemoryManager;

use crate::csv::CsvPop;
use crate::plugin::{OutputContext, PopPlugin, PopSink};
use crate::{IoError, IoResult};

// ── MemorySink ────────────────────────────────────────────────────────────────

/// The standard [`PopSink`]: appends every loaded value straight into the
/// memory manager's columns.
pub struct MemorySink<'a> {
    mem: &'a MemoryManager,
}

impl<'a> MemorySink<'a> {
    pub fn new(mem: &'a MemoryManager) -> MemorySink<'a> {
        MemorySink { mem }
    }
}

impl PopSink for MemorySink<'_> {
    fn add_int(&mut self, agent: &str, var: &str, value: i32) -> IoResult<()> {
        Ok(self.mem.push_value(agent, var, value.into())?)
    }

    fn add_double(&mut self, agent: &str, var: &str, value: f64) -> IoResult<()> {
        Ok(self.mem.push_value(agent, var, value.into())?)
    }
}

// ── IoManager ─────────────────────────────────────────────────────────────────

/// Registry of population plug-ins plus the per-run output state
/// (directory, current iteration, active plug-in).
///
/// Built-in plug-ins are registered at construction: CSV always, SQLite when
/// the `sqlite` feature is enabled.  CSV starts active.
pub struct IoManager {
    mem: Arc<MemoryManager>,
    plugins: RwLock<Vec<Arc<dyn PopPlugin>>>,
    active: RwLock<Arc<dyn PopPlugin>>,
    output_dir: RwLock<PathBuf>,
    iteration: AtomicU64,
}

impl IoManager {
    pub fn new(mem: Arc<MemoryManager>) -> IoManager {
        let csv: Arc<dyn PopPlugin> = Arc::new(CsvPop::new());
        let mut plugins: Vec<Arc<dyn PopPlugin>> = vec![Arc::clone(&csv)];

        #[cfg(feature = "sqlite")]
        plugins.push(Arc::new(crate::sqlite::SqlitePop::new()));

        IoManager {
            mem,
            plugins: RwLock::new(plugins),
            active: RwLock::new(csv),
            output_dir: RwLock::new(PathBuf::from(".")),
            iteration: AtomicU64::new(0),
        }
    }

    // ── Plug-in registry ──────────────────────────────────────────────────

    /// Register an external plug-in.
    pub fn register_plugin(&self, plugin: Arc<dyn PopPlugin>) -> IoResult<()> {
        let mut plugins = self.plugins.write().unwrap_or_else(|e| e.into_inner());
        if plugins.iter().any(|p| p.name() == plugin.name()) {
            return Err(IoError::DuplicatePlugin(plugin.name().to_owned()));
        }
        log::debug!("registered I/O plugin {:?}", plugin.name());
        plugins.push(plugin);
        Ok(())
    }

    /// Select the plug-in used for output.
    pub fn set_active(&self, name: &str) -> IoResult<()> {
        let plugin = self.plugin_by_name(name)?;
        *self.active.write().unwrap_or_else(|e| e.into_inner()) = plugin;
        Ok(())
    }

    /// Name of the plug-in currently used for output.
    pub fn active_name(&self) -> &'static str {
        self.active.read().unwrap_or_else(|e| e.into_inner()).name()
    }

    fn plugin_by_name(&self, name: &str) -> IoResult<Arc<dyn PopPlugin>> {
        self.plugins
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|p| p.name() == name)
            .cloned()
            .ok_or_else(|| IoError::UnknownPlugin(name.to_owned()))
    }

    fn plugin_for_path(&self, path: &Path) -> IoResult<Arc<dyn PopPlugin>> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        self.plugins
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|p| p.extensions().contains(&ext.as_str()))
            .cloned()
            .ok_or_else(|| IoError::UnsupportedFormat(path.display().to_string()))
    }

    // ── Output state ──────────────────────────────────────────────────────

    /// Directory output files are written into.
    pub fn set_output_dir(&self, dir: impl Into<PathBuf>) {
        *self.output_dir.write().unwrap_or_else(|e| e.into_inner()) = dir.into();
    }

    /// Set the iteration number used in output naming.
    pub fn set_iteration(&self, n: u64) {
        self.iteration.store(n, Ordering::SeqCst);
    }

    pub fn iteration(&self) -> u64 {
        self.iteration.load(Ordering::SeqCst)
    }

    fn context(&self) -> OutputContext {
        OutputContext {
            dir: self
                .output_dir
                .read()
                .unwrap_or_else(|e| e.into_inner())
                .clone(),
            iteration: self.iteration(),
        }
    }

    // ── Load path ─────────────────────────────────────────────────────────

    /// Load a population file into agent memory, routing to a plug-in by
    /// file extension.
    pub fn load_population(&self, path: &Path) -> IoResult<()> {
        let plugin = self.plugin_for_path(path)?;
        log::info!(
            "loading population from {:?} via plugin {:?}",
            path.display(),
            plugin.name()
        );
        let schema = self.mem.schema();
        let mut sink = MemorySink::new(&self.mem);
        plugin.read_pop(path, &schema, &mut sink)
    }

    // ── Store path (the three I/O task hooks) ─────────────────────────────

    /// Begin this iteration's output.
    pub fn init_output(&self) -> IoResult<()> {
        let ctx = self.context();
        std::fs::create_dir_all(&ctx.dir)?;
        self.active
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .init(&ctx)
    }

    /// Record one `(agent, variable)` column.
    pub fn write_variable(&self, agent: &str, var: &str) -> IoResult<()> {
        let plugin = Arc::clone(&self.active.read().unwrap_or_else(|e| e.into_inner()));
        let ctx = self.context();
        self.mem
            .with_column(agent, var, |col| plugin.write_one(&ctx, agent, var, col))?
    }

    /// Finish this iteration's output.
    pub fn finalize_output(&self) -> IoResult<()> {
        let ctx = self.context();
        let schema = self.mem.schema();
        self.active
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .finalize(&ctx, &schema)
    }

    /// The memory manager this I/O manager reads from and loads into.
    pub fn memory(&self) -> &Arc<MemoryManager> {
        &self.mem
    }
}
