//! CSV population plug-in.
//!
//! # File format
//!
//! One row per agent instance, no header:
//!
//! ```csv
//! Circle,0,0.0,0.0,1.0
//! Circle,1,1.0,0.0,1.0
//! Square,7,2.5
//! ```
//!
//! The first field names the agent type; the remaining fields are that
//! agent's variables in registration order.  Rows naming an unregistered
//! agent type are skipped with a warning.  Output goes to
//! `{dir}/{iteration}.csv`.
//!
//! `write_one` receives columns one at a time, so the plug-in buffers column
//! clones and pivots them into rows at `finalize`.

use std::path::Path;
use std::sync::Mutex;

use flame2_mem::{AgentSchema, VarColumn};
use flame2_core::VarType;

use crate::plugin::{OutputContext, PopPlugin, PopSink};
use crate::{IoError, IoResult};

/// Buffered columns for one iteration, in first-write order.
type OutBuffer = Vec<(String, Vec<(String, VarColumn)>)>;

/// CSV population reader/writer.
pub struct CsvPop {
    buffer: Mutex<OutBuffer>,
}

impl Default for CsvPop {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvPop {
    pub fn new() -> CsvPop {
        CsvPop {
            buffer: Mutex::new(Vec::new()),
        }
    }
}

impl PopPlugin for CsvPop {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["csv"]
    }

    fn read_pop(
        &self,
        path: &Path,
        schema: &[AgentSchema],
        sink: &mut dyn PopSink,
    ) -> IoResult<()> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)?;

        for (line, record) in reader.records().enumerate() {
            let record = record?;
            let Some(agent_name) = record.get(0) else {
                continue;
            };
            let Some(agent) = schema.iter().find(|a| a.name == agent_name) else {
                log::warn!("{}: line {}: unknown agent {agent_name:?}, skipped", path.display(), line + 1);
                continue;
            };
            if record.len() != agent.vars.len() + 1 {
                return Err(IoError::Parse(format!(
                    "{}: line {}: expected {} fields for agent {agent_name:?}, found {}",
                    path.display(),
                    line + 1,
                    agent.vars.len() + 1,
                    record.len()
                )));
            }
            for ((var, var_type), field) in agent.vars.iter().zip(record.iter().skip(1)) {
                match var_type {
                    VarType::Int => {
                        let v: i32 = field.parse().map_err(|_| {
                            IoError::Parse(format!(
                                "{}: line {}: invalid int {field:?} for {agent_name}.{var}",
                                path.display(),
                                line + 1
                            ))
                        })?;
                        sink.add_int(agent_name, var, v)?;
                    }
                    VarType::Double => {
                        let v: f64 = field.parse().map_err(|_| {
                            IoError::Parse(format!(
                                "{}: line {}: invalid double {field:?} for {agent_name}.{var}",
                                path.display(),
                                line + 1
                            ))
                        })?;
                        sink.add_double(agent_name, var, v)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn init(&self, _ctx: &OutputContext) -> IoResult<()> {
        self.buffer.lock().unwrap_or_else(|e| e.into_inner()).clear();
        Ok(())
    }

    fn write_one(
        &self,
        _ctx: &OutputContext,
        agent: &str,
        var: &str,
        column: &VarColumn,
    ) -> IoResult<()> {
        let mut buffer = self.buffer.lock().unwrap_or_else(|e| e.into_inner());
        let idx = match buffer.iter().position(|(a, _)| a == agent) {
            Some(i) => i,
            None => {
                buffer.push((agent.to_owned(), Vec::new()));
                buffer.len() - 1
            }
        };
        buffer[idx].1.push((var.to_owned(), column.clone()));
        Ok(())
    }

    fn finalize(&self, ctx: &OutputContext, _schema: &[AgentSchema]) -> IoResult<()> {
        let buffer = std::mem::take(&mut *self.buffer.lock().unwrap_or_else(|e| e.into_inner()));
        let path = ctx.dir.join(format!("{}.csv", ctx.iteration));
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_path(&path)?;

        for (agent, vars) in &buffer {
            let rows = vars.first().map_or(0, |(_, col)| col.len());
            for row in 0..rows {
                let mut record = Vec::with_capacity(vars.len() + 1);
                record.push(agent.clone());
                for (_, col) in vars {
                    let value = col.value_at(row).ok_or_else(|| {
                        IoError::Parse(format!(
                            "column {agent}.{} shorter than population",
                            vars[0].0
                        ))
                    })?;
                    record.push(value.to_string());
                }
                writer.write_record(&record)?;
            }
        }
        writer.flush()?;
        log::debug!("wrote population snapshot {:?}", path.display());
        Ok(())
    }
}
