//! The population I/O plug-in contract.

use std::path::{Path, PathBuf};

use flame2_mem::{AgentSchema, VarColumn};

use crate::{IoError, IoResult};

/// Where and for which iteration output is being produced.
#[derive(Clone, Debug)]
pub struct OutputContext {
    /// Directory all output files land in.
    pub dir: PathBuf,
    /// Iteration number, used in file/table naming.
    pub iteration: u64,
}

/// Callbacks a plug-in invokes to populate columns during a load.
///
/// One method per registered scalar type; a new scalar type extends this
/// trait alongside `VarType`.
pub trait PopSink {
    fn add_int(&mut self, agent: &str, var: &str, value: i32) -> IoResult<()>;
    fn add_double(&mut self, agent: &str, var: &str, value: f64) -> IoResult<()>;
}

/// A population format backend.
///
/// Store methods are called from I/O tasks on worker threads, so plug-ins
/// take `&self` and synchronize any buffering internally.  `write_one` is
/// invoked once per `(agent, variable)` between `init` and `finalize`;
/// row-oriented formats buffer the columns and emit rows at `finalize`.
pub trait PopPlugin: Send + Sync {
    /// Registry name, e.g. `"csv"`.
    fn name(&self) -> &'static str;

    /// File extensions this plug-in loads (lower-case, no dot).
    fn extensions(&self) -> &'static [&'static str];

    /// Read a population file, feeding every value into `sink`.
    ///
    /// Write-only plug-ins keep the default, which fails `NotImplemented`.
    fn read_pop(
        &self,
        _path: &Path,
        _schema: &[AgentSchema],
        _sink: &mut dyn PopSink,
    ) -> IoResult<()> {
        Err(IoError::NotImplemented("population loading"))
    }

    /// Begin one iteration's output.
    fn init(&self, ctx: &OutputContext) -> IoResult<()>;

    /// Record one column of one agent.
    fn write_one(
        &self,
        ctx: &OutputContext,
        agent: &str,
        var: &str,
        column: &VarColumn,
    ) -> IoResult<()>;

    /// Finish one iteration's output (emit buffered data, close handles).
    fn finalize(&self, ctx: &OutputContext, schema: &[AgentSchema]) -> IoResult<()>;
}
