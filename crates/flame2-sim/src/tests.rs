//! Unit tests for flame2-sim, including the circles end-to-end model.

#[cfg(test)]
mod circles {
    use std::path::Path;
    use std::sync::Arc;

    use flame2_exe::{AgentAccess, BoardOp, IoOp};

    use crate::{AgentStatus, Runtime, SimConfig, Simulation};

    const KR: f64 = 0.1;

    #[derive(Clone, Debug)]
    struct Location {
        id: i32,
        x: f64,
        y: f64,
    }

    /// The inter-circle repulsion model: output locations, sync, read
    /// locations into forces, clear, apply forces to positions.
    pub fn circles_runtime(positions: &[(f64, f64)], radius: f64) -> Runtime {
        let rt = Runtime::new();
        rt.register_agent("Circle").unwrap();
        rt.register_variable::<i32>("Circle", "id").unwrap();
        rt.register_variable::<f64>("Circle", "x").unwrap();
        rt.register_variable::<f64>("Circle", "y").unwrap();
        rt.register_variable::<f64>("Circle", "radius").unwrap();
        rt.register_variable::<f64>("Circle", "fx").unwrap();
        rt.register_variable::<f64>("Circle", "fy").unwrap();
        rt.register_message::<Location>("location").unwrap();

        let mem = rt.memory();
        for (i, &(x, y)) in positions.iter().enumerate() {
            mem.push_value("Circle", "id", (i as i32).into()).unwrap();
            mem.push_value("Circle", "x", x.into()).unwrap();
            mem.push_value("Circle", "y", y.into()).unwrap();
            mem.push_value("Circle", "radius", radius.into()).unwrap();
            mem.push_value("Circle", "fx", 0.0.into()).unwrap();
            mem.push_value("Circle", "fy", 0.0.into()).unwrap();
        }

        let t_out = rt
            .create_agent_task(
                "output_location",
                "Circle",
                Arc::new(|api| {
                    let msg = Location {
                        id: api.get("id")?,
                        x: api.get("x")?,
                        y: api.get("y")?,
                    };
                    api.post("location", msg)?;
                    Ok(AgentStatus::Alive)
                }),
                AgentAccess::new()
                    .read("id")
                    .read("x")
                    .read("y")
                    .post_message("location"),
            )
            .unwrap();

        let t_sync = rt
            .create_board_task("sync_location", "location", BoardOp::Sync)
            .unwrap();

        let t_in = rt
            .create_agent_task(
                "input_location",
                "Circle",
                Arc::new(|api| {
                    let id: i32 = api.get("id")?;
                    let x: f64 = api.get("x")?;
                    let y: f64 = api.get("y")?;
                    let diameter: f64 = api.get::<f64>("radius")? * 2.0;

                    let mut fx = 0.0;
                    let mut fy = 0.0;
                    let mut iter = api.messages("location")?;
                    while !iter.at_end() {
                        let msg = iter.get::<Location>()?;
                        if msg.id != id {
                            let distance =
                                ((x - msg.x).powi(2) + (y - msg.y).powi(2)).sqrt();
                            if distance < diameter {
                                let p = KR * (diameter - distance) / distance;
                                fx += (x - msg.x) * p;
                                fy += (y - msg.y) * p;
                            }
                        }
                        iter.next();
                    }
                    api.set("fx", fx)?;
                    api.set("fy", fy)?;
                    Ok(AgentStatus::Alive)
                }),
                AgentAccess::new()
                    .read("id")
                    .read("x")
                    .read("y")
                    .read("radius")
                    .read_write("fx")
                    .read_write("fy")
                    .read_message("location"),
            )
            .unwrap();

        let t_clear = rt
            .create_board_task("clear_location", "location", BoardOp::Clear)
            .unwrap();

        let t_move = rt
            .create_agent_task(
                "move",
                "Circle",
                Arc::new(|api| {
                    let x: f64 = api.get("x")?;
                    let y: f64 = api.get("y")?;
                    let fx: f64 = api.get("fx")?;
                    let fy: f64 = api.get("fy")?;
                    api.set("x", x + fx)?;
                    api.set("y", y + fy)?;
                    Ok(AgentStatus::Alive)
                }),
                AgentAccess::new()
                    .read("fx")
                    .read("fy")
                    .read_write("x")
                    .read_write("y"),
            )
            .unwrap();

        rt.add_dependency(t_sync, t_out).unwrap();
        rt.add_dependency(t_in, t_sync).unwrap();
        rt.add_dependency(t_clear, t_in).unwrap();
        rt.add_dependency(t_move, t_in).unwrap();
        rt
    }

    /// Append the init → write(x) → write(y) → finalize output chain after
    /// the move task.
    pub fn add_output_tasks(rt: &Runtime) {
        let init = rt.create_io_task("io_init", IoOp::InitOutput).unwrap();
        let wx = rt
            .create_io_task(
                "io_write_x",
                IoOp::WriteVariable { agent: "Circle".into(), var: "x".into() },
            )
            .unwrap();
        let wy = rt
            .create_io_task(
                "io_write_y",
                IoOp::WriteVariable { agent: "Circle".into(), var: "y".into() },
            )
            .unwrap();
        let fin = rt.create_io_task("io_finalize", IoOp::FinalizeOutput).unwrap();

        let t_move = rt.tasks().task_id("move").unwrap();
        rt.add_dependency(init, t_move).unwrap();
        rt.add_dependency(wx, init).unwrap();
        rt.add_dependency(wy, wx).unwrap();
        rt.add_dependency(fin, wy).unwrap();
    }

    fn positions(rt: &Runtime) -> Vec<(f64, f64)> {
        let mut out = Vec::new();
        rt.memory()
            .with_column("Circle", "x", |col| col.as_doubles().unwrap().to_vec())
            .unwrap()
            .into_iter()
            .zip(
                rt.memory()
                    .with_column("Circle", "y", |col| col.as_doubles().unwrap().to_vec())
                    .unwrap(),
            )
            .for_each(|(x, y)| out.push((x, y)));
        out
    }

    #[test]
    fn one_iteration_repels_the_touching_pair() {
        let rt = circles_runtime(&[(0.0, 0.0), (1.0, 0.0), (3.0, 0.0)], 1.0);
        let sim = Simulation::new(
            rt,
            SimConfig {
                workers: 2,
                output_dir: std::env::temp_dir(),
                ..SimConfig::default()
            },
        )
        .unwrap();

        sim.run_iterations(1).unwrap();

        let pos = positions(sim.runtime());
        // Circles 0 and 1 overlap (distance 1 < diameter 2) and push each
        // other apart; circle 2 sits exactly one diameter from circle 1 and
        // does not move.
        assert!((pos[0].0 - -0.1).abs() < 1e-9, "got {:?}", pos[0]);
        assert!((pos[1].0 - 1.1).abs() < 1e-9, "got {:?}", pos[1]);
        assert!((pos[2].0 - 3.0).abs() < 1e-9, "got {:?}", pos[2]);
        assert!(pos.iter().all(|&(_, y)| y.abs() < 1e-12));
    }

    #[test]
    fn single_worker_replays_are_bit_identical() {
        let run = |dir: &Path| -> Vec<(f64, f64)> {
            let rt = circles_runtime(
                &[(0.0, 0.0), (0.5, 0.25), (1.2, -0.3), (2.0, 0.0), (2.2, 0.1)],
                0.75,
            );
            add_output_tasks(&rt);
            let sim = Simulation::new(
                rt,
                SimConfig {
                    output_dir: dir.to_path_buf(),
                    ..SimConfig::deterministic()
                },
            )
            .unwrap();
            sim.run_iterations(3).unwrap();
            positions(sim.runtime())
        };

        let dir_a = tempfile::tempdir().unwrap();
        let dir_b = tempfile::tempdir().unwrap();
        let pos_a = run(dir_a.path());
        let pos_b = run(dir_b.path());

        // Bit-identical final state, not merely approximately equal.
        assert_eq!(pos_a, pos_b);

        // And bit-identical output files for every iteration.
        for i in 1..=3 {
            let a = std::fs::read(dir_a.path().join(format!("{i}.csv"))).unwrap();
            let b = std::fs::read(dir_b.path().join(format!("{i}.csv"))).unwrap();
            assert!(!a.is_empty());
            assert_eq!(a, b, "iteration {i} snapshots differ");
        }
    }

    #[test]
    fn repeated_iterations_separate_the_cluster() {
        let rt = circles_runtime(&[(0.0, 0.0), (0.4, 0.0), (0.8, 0.0)], 1.0);
        let sim = Simulation::new(
            rt,
            SimConfig {
                workers: 2,
                output_dir: std::env::temp_dir(),
                ..SimConfig::default()
            },
        )
        .unwrap();
        sim.run_iterations(50).unwrap();

        let pos = positions(sim.runtime());
        // The outer circles are pushed in opposite directions.
        assert!(pos[0].0 < -0.5);
        assert!(pos[2].0 > 1.3);
    }
}

#[cfg(test)]
mod driver {
    use std::io::Write;
    use std::sync::Arc;

    use flame2_exe::AgentAccess;

    use crate::{AgentStatus, NoopObserver, Runtime, RunObserver, SimConfig, SimError, Simulation};

    fn counting_runtime(pop: usize) -> Runtime {
        let rt = Runtime::new();
        rt.register_agent("A").unwrap();
        rt.register_variable::<i32>("A", "n").unwrap();
        for _ in 0..pop {
            rt.memory().push_value("A", "n", 0i32.into()).unwrap();
        }
        rt.create_agent_task(
            "bump",
            "A",
            Arc::new(|api| {
                let n: i32 = api.get("n")?;
                api.set("n", n + 1)?;
                Ok(AgentStatus::Alive)
            }),
            AgentAccess::new().read_write("n"),
        )
        .unwrap();
        rt
    }

    #[test]
    fn iterations_accumulate_state() {
        let sim = Simulation::new(counting_runtime(10), SimConfig::deterministic()).unwrap();
        sim.run_iterations(5).unwrap();
        sim.runtime()
            .memory()
            .with_column("A", "n", |col| {
                assert!(col.as_ints().unwrap().iter().all(|&v| v == 5));
            })
            .unwrap();
    }

    #[test]
    fn observer_sees_every_iteration() {
        #[derive(Default)]
        struct Counting {
            starts: u64,
            ends: u64,
            finished: Option<u64>,
        }
        impl RunObserver for Counting {
            fn on_iteration_start(&mut self, _n: u64) {
                self.starts += 1;
            }
            fn on_iteration_end(&mut self, _n: u64) {
                self.ends += 1;
            }
            fn on_run_end(&mut self, n: u64) {
                self.finished = Some(n);
            }
        }

        let sim = Simulation::new(counting_runtime(3), SimConfig::deterministic()).unwrap();
        let mut obs = Counting::default();
        sim.run(4, &mut obs).unwrap();
        assert_eq!((obs.starts, obs.ends, obs.finished), (4, 4, Some(4)));
    }

    #[test]
    fn task_failures_stop_the_run_as_iteration_failed() {
        let rt = Runtime::new();
        rt.register_agent("A").unwrap();
        rt.register_variable::<i32>("A", "n").unwrap();
        rt.memory().push_value("A", "n", 0i32.into()).unwrap();
        rt.create_agent_task(
            "bad",
            "A",
            Arc::new(|api| {
                api.set("n", 1)?; // never granted
                Ok(AgentStatus::Alive)
            }),
            AgentAccess::new().read("n"),
        )
        .unwrap();

        let sim = Simulation::new(rt, SimConfig::deterministic()).unwrap();
        match sim.run(2, &mut NoopObserver) {
            Err(SimError::IterationFailed { iteration: 1, failures }) => {
                assert_eq!(failures.len(), 1);
            }
            other => panic!("expected IterationFailed, got {other:?}"),
        }
    }

    #[test]
    fn zero_workers_is_a_config_error() {
        let rt = counting_runtime(1);
        let config = SimConfig {
            workers: 0,
            ..SimConfig::default()
        };
        assert!(matches!(
            Simulation::new(rt, config),
            Err(SimError::Config(_))
        ));
    }

    #[test]
    fn load_population_then_run() {
        let dir = tempfile::tempdir().unwrap();
        let pop = dir.path().join("pop.csv");
        let mut f = std::fs::File::create(&pop).unwrap();
        writeln!(f, "A,1").unwrap();
        writeln!(f, "A,2").unwrap();
        writeln!(f, "A,3").unwrap();
        drop(f);

        let rt = counting_runtime(0);
        rt.load_population(&pop).unwrap();
        assert_eq!(rt.population_size("A").unwrap(), 3);

        let sim = Simulation::new(rt, SimConfig::deterministic()).unwrap();
        sim.run_iterations(1).unwrap();
        sim.runtime()
            .memory()
            .with_column("A", "n", |col| {
                assert_eq!(col.as_ints().unwrap(), &[2, 3, 4]);
            })
            .unwrap();
    }
}
