//! SQLite population plug-in (feature `sqlite`).
//!
//! One database per iteration, `{dir}/{iteration}.db`, with one table per
//! agent type: `CREATE TABLE "{agent}" ({var1} …, {var2} …)` in variable
//! registration order, one row per agent instance.  `read_pop` selects every
//! table back in `rowid` order, so a save/load round-trip reproduces the
//! columns exactly.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;

use flame2_core::{Value, VarType};
use flame2_mem::{AgentSchema, VarColumn};

use crate::plugin::{OutputContext, PopPlugin, PopSink};
use crate::{IoError, IoResult};

type OutBuffer = Vec<(String, Vec<(String, VarColumn)>)>;

/// SQLite population reader/writer.
pub struct SqlitePop {
    buffer: Mutex<OutBuffer>,
}

impl Default for SqlitePop {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlitePop {
    pub fn new() -> SqlitePop {
        SqlitePop {
            buffer: Mutex::new(Vec::new()),
        }
    }
}

fn sql_type(var_type: VarType) -> &'static str {
    match var_type {
        VarType::Int => "INTEGER",
        VarType::Double => "REAL",
    }
}

impl PopPlugin for SqlitePop {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["db", "sqlite"]
    }

    fn read_pop(
        &self,
        path: &Path,
        schema: &[AgentSchema],
        sink: &mut dyn PopSink,
    ) -> IoResult<()> {
        let conn = Connection::open(path)?;
        for agent in schema {
            let columns: Vec<String> =
                agent.vars.iter().map(|(v, _)| format!("\"{v}\"")).collect();
            let sql = format!(
                "SELECT {} FROM \"{}\" ORDER BY rowid",
                columns.join(", "),
                agent.name
            );
            let mut stmt = match conn.prepare(&sql) {
                Ok(stmt) => stmt,
                // A population file may legitimately omit an agent type.
                Err(rusqlite::Error::SqliteFailure(_, Some(ref m)))
                    if m.contains("no such table") =>
                {
                    log::warn!("{}: no table for agent {:?}", path.display(), agent.name);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                for (idx, (var, var_type)) in agent.vars.iter().enumerate() {
                    match var_type {
                        VarType::Int => sink.add_int(&agent.name, var, row.get(idx)?)?,
                        VarType::Double => sink.add_double(&agent.name, var, row.get(idx)?)?,
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
        let path = ctx.dir.join(format!("{}.db", ctx.iteration));
        let conn = Connection::open(&path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;

        for (agent, vars) in &buffer {
            let decls: Vec<String> = vars
                .iter()
                .map(|(v, col)| format!("\"{v}\" {} NOT NULL", sql_type(col.var_type())))
                .collect();
            conn.execute_batch(&format!(
                "DROP TABLE IF EXISTS \"{agent}\";
                 CREATE TABLE \"{agent}\" ({});",
                decls.join(", ")
            ))?;

            let placeholders: Vec<String> =
                (1..=vars.len()).map(|i| format!("?{i}")).collect();
            let insert = format!(
                "INSERT INTO \"{agent}\" VALUES ({})",
                placeholders.join(", ")
            );

            let rows = vars.first().map_or(0, |(_, col)| col.len());
            let tx = conn.unchecked_transaction()?;
            {
                let mut stmt = tx.prepare_cached(&insert)?;
                for row in 0..rows {
                    let params: Vec<rusqlite::types::Value> = vars
                        .iter()
                        .filter_map(|(_, col)| col.value_at(row))
                        .map(|v| match v {
                            Value::Int(i) => rusqlite::types::Value::Integer(i as i64),
                            Value::Double(d) => rusqlite::types::Value::Real(d),
                        })
                        .collect();
                    if params.len() != vars.len() {
                        return Err(IoError::Parse(format!(
                            "column lengths diverged while writing agent {agent:?}"
                        )));
                    }
                    stmt.execute(rusqlite::params_from_iter(params))?;
                }
            }
            tx.commit()?;
        }
        log::debug!("wrote population snapshot {:?}", path.display());
        Ok(())
    }
}
