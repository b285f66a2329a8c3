//! Unit tests for flame2-io.

#[cfg(test)]
mod fixtures {
    use std::sync::Arc;

    use flame2_mem::MemoryManager;

    /// Circle(id:int, x:double) + Square(side:double), three circles and
    /// one square.
    pub fn populated_manager() -> Arc<MemoryManager> {
        let mem = MemoryManager::new();
        mem.register_agent("Circle").unwrap();
        mem.register_variable::<i32>("Circle", "id").unwrap();
        mem.register_variable::<f64>("Circle", "x").unwrap();
        mem.register_agent("Square").unwrap();
        mem.register_variable::<f64>("Square", "side").unwrap();

        for i in 0..3 {
            mem.push_value("Circle", "id", (i as i32).into()).unwrap();
            mem.push_value("Circle", "x", (i as f64 * 0.5).into()).unwrap();
        }
        mem.push_value("Square", "side", 2.25.into()).unwrap();
        Arc::new(mem)
    }

    /// Same schema, no population.
    pub fn empty_manager() -> Arc<MemoryManager> {
        let mem = MemoryManager::new();
        mem.register_agent("Circle").unwrap();
        mem.register_variable::<i32>("Circle", "id").unwrap();
        mem.register_variable::<f64>("Circle", "x").unwrap();
        mem.register_agent("Square").unwrap();
        mem.register_variable::<f64>("Square", "side").unwrap();
        Arc::new(mem)
    }
}

#[cfg(test)]
mod csv_round_trip {
    use std::sync::Arc;

    use crate::IoManager;

    use super::fixtures::{empty_manager, populated_manager};

    /// Drive the three store hooks the way the I/O tasks do.
    fn save_all(io: &IoManager) {
        io.init_output().unwrap();
        for agent in io.memory().schema() {
            for (var, _) in &agent.vars {
                io.write_variable(&agent.name, var).unwrap();
            }
        }
        io.finalize_output().unwrap();
    }

    #[test]
    fn save_then_load_reproduces_columns() {
        let dir = tempfile::tempdir().unwrap();
        let source = populated_manager();
        let io = IoManager::new(Arc::clone(&source));
        io.set_output_dir(dir.path());
        io.set_iteration(1);
        save_all(&io);

        let target = empty_manager();
        let io2 = IoManager::new(Arc::clone(&target));
        io2.load_population(&dir.path().join("1.csv")).unwrap();

        assert_eq!(target.population_size("Circle").unwrap(), 3);
        assert_eq!(target.population_size("Square").unwrap(), 1);
        target
            .with_column("Circle", "x", |col| {
                assert_eq!(col.as_doubles().unwrap(), &[0.0, 0.5, 1.0]);
            })
            .unwrap();
        target
            .with_column("Circle", "id", |col| {
                assert_eq!(col.as_ints().unwrap(), &[0, 1, 2]);
            })
            .unwrap();
        target
            .with_column("Square", "side", |col| {
                assert_eq!(col.as_doubles().unwrap(), &[2.25]);
            })
            .unwrap();
    }

    #[test]
    fn repeated_saves_are_independent_iterations() {
        let dir = tempfile::tempdir().unwrap();
        let source = populated_manager();
        let io = IoManager::new(Arc::clone(&source));
        io.set_output_dir(dir.path());

        io.set_iteration(1);
        save_all(&io);
        io.set_iteration(2);
        save_all(&io);

        assert!(dir.path().join("1.csv").exists());
        assert!(dir.path().join("2.csv").exists());
        let a = std::fs::read_to_string(dir.path().join("1.csv")).unwrap();
        let b = std::fs::read_to_string(dir.path().join("2.csv")).unwrap();
        assert_eq!(a, b);
    }
}

#[cfg(test)]
mod csv_loading {
    use std::io::Write;
    use std::sync::Arc;

    use crate::{IoError, IoManager};

    use super::fixtures::empty_manager;

    fn write_file(dir: &std::path::Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn unknown_agent_rows_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "pop.csv",
            "Circle,1,0.5\nTriangle,9,9,9\nCircle,2,1.5\n",
        );

        let mem = empty_manager();
        let io = IoManager::new(Arc::clone(&mem));
        io.load_population(&path).unwrap();
        assert_eq!(mem.population_size("Circle").unwrap(), 2);
    }

    #[test]
    fn malformed_value_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "pop.csv", "Circle,one,0.5\n");

        let mem = empty_manager();
        let io = IoManager::new(Arc::clone(&mem));
        assert!(matches!(
            io.load_population(&path),
            Err(IoError::Parse(_))
        ));
    }

    #[test]
    fn wrong_field_count_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "pop.csv", "Circle,1\n");

        let mem = empty_manager();
        let io = IoManager::new(Arc::clone(&mem));
        assert!(matches!(
            io.load_population(&path),
            Err(IoError::Parse(_))
        ));
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "pop.xyz", "");

        let io = IoManager::new(empty_manager());
        assert!(matches!(
            io.load_population(&path),
            Err(IoError::UnsupportedFormat(_))
        ));
    }
}

#[cfg(test)]
mod registry {
    use crate::{IoError, IoManager};

    use super::fixtures::empty_manager;

    #[test]
    fn csv_is_registered_and_active_by_default() {
        let io = IoManager::new(empty_manager());
        assert_eq!(io.active_name(), "csv");
    }

    #[test]
    fn unknown_plugin_cannot_be_activated() {
        let io = IoManager::new(empty_manager());
        assert!(matches!(
            io.set_active("hdf5"),
            Err(IoError::UnknownPlugin(_))
        ));
    }

    #[test]
    fn duplicate_plugin_is_rejected() {
        let io = IoManager::new(empty_manager());
        assert!(matches!(
            io.register_plugin(std::sync::Arc::new(crate::CsvPop::new())),
            Err(IoError::DuplicatePlugin(_))
        ));
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod sqlite_round_trip {
    use std::sync::Arc;

    use crate::IoManager;

    use super::fixtures::{empty_manager, populated_manager};

    #[test]
    fn save_then_load_reproduces_columns() {
        let dir = tempfile::tempdir().unwrap();
        let source = populated_manager();
        let io = IoManager::new(Arc::clone(&source));
        io.set_output_dir(dir.path());
        io.set_active("sqlite").unwrap();
        io.set_iteration(3);

        io.init_output().unwrap();
        for agent in io.memory().schema() {
            for (var, _) in &agent.vars {
                io.write_variable(&agent.name, var).unwrap();
            }
        }
        io.finalize_output().unwrap();

        let target = empty_manager();
        let io2 = IoManager::new(Arc::clone(&target));
        io2.load_population(&dir.path().join("3.db")).unwrap();

        assert_eq!(target.population_size("Circle").unwrap(), 3);
        target
            .with_column("Circle", "x", |col| {
                assert_eq!(col.as_doubles().unwrap(), &[0.0, 0.5, 1.0]);
            })
            .unwrap();
        target
            .with_column("Square", "side", |col| {
                assert_eq!(col.as_doubles().unwrap(), &[2.25]);
            })
            .unwrap();
    }
}
