//! circles — the classic inter-agent repulsion model on the flame2 runtime.
//!
//! Each circle posts its location to a message board; after a sync, every
//! circle reads all locations, accumulates a repulsive force from neighbours
//! closer than one diameter, and a final task applies the forces.  Per
//! iteration the runtime writes a CSV population snapshot to the output
//! directory.
//!
//! Run with `RUST_LOG=info cargo run -p circles` and inspect
//! `circles-output/<iteration>.csv`.

use std::sync::Arc;

use anyhow::Result;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use flame2_sim::{
    AgentAccess, AgentStatus, BoardOp, IoOp, RunObserver, Runtime, SimConfig, Simulation,
};

// ── Constants ─────────────────────────────────────────────────────────────────

const AGENT_COUNT: usize = 200;
const WORLD_SIZE: f64 = 50.0;
const RADIUS: f64 = 2.0;
const KR: f64 = 0.1; // repulsion stiffness
const ITERATIONS: u64 = 100;
const SEED: u64 = 42;
const OUTPUT_DIR: &str = "circles-output";

// ── Message type ──────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
struct Location {
    id: i32,
    x: f64,
    y: f64,
}

// ── Model definition ──────────────────────────────────────────────────────────

fn build_runtime() -> Result<Runtime> {
    let rt = Runtime::new();

    rt.register_agent("Circle")?;
    rt.register_variable::<i32>("Circle", "id")?;
    rt.register_variable::<f64>("Circle", "x")?;
    rt.register_variable::<f64>("Circle", "y")?;
    rt.register_variable::<f64>("Circle", "radius")?;
    rt.register_variable::<f64>("Circle", "fx")?;
    rt.register_variable::<f64>("Circle", "fy")?;
    rt.register_message::<Location>("location")?;
    rt.hint_population("Circle", AGENT_COUNT)?;

    // Deterministic scatter across the world square.
    let mut rng = SmallRng::seed_from_u64(SEED);
    let mem = rt.memory();
    for i in 0..AGENT_COUNT {
        mem.push_value("Circle", "id", (i as i32).into())?;
        mem.push_value("Circle", "x", rng.gen_range(0.0..WORLD_SIZE).into())?;
        mem.push_value("Circle", "y", rng.gen_range(0.0..WORLD_SIZE).into())?;
        mem.push_value("Circle", "radius", RADIUS.into())?;
        mem.push_value("Circle", "fx", 0.0.into())?;
        mem.push_value("Circle", "fy", 0.0.into())?;
    }

    // ── Transition functions ──────────────────────────────────────────────

    let t_out = rt.create_agent_task(
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
    )?;

    let t_sync = rt.create_board_task("sync_location", "location", BoardOp::Sync)?;

    let t_in = rt.create_agent_task(
        "input_location",
        "Circle",
        Arc::new(|api| {
            let id: i32 = api.get("id")?;
            let x: f64 = api.get("x")?;
            let y: f64 = api.get("y")?;
            let diameter = api.get::<f64>("radius")? * 2.0;

            let mut fx = 0.0;
            let mut fy = 0.0;
            let mut messages = api.messages("location")?;
            while !messages.at_end() {
                let msg = messages.get::<Location>()?;
                if msg.id != id {
                    let distance = ((x - msg.x).powi(2) + (y - msg.y).powi(2)).sqrt();
                    if distance < diameter {
                        let p = KR * (diameter - distance) / distance;
                        fx += (x - msg.x) * p;
                        fy += (y - msg.y) * p;
                    }
                }
                messages.next();
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
    )?;

    let t_clear = rt.create_board_task("clear_location", "location", BoardOp::Clear)?;

    let t_move = rt.create_agent_task(
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
    )?;

    // ── Output tasks ──────────────────────────────────────────────────────

    let io_init = rt.create_io_task("io_init", IoOp::InitOutput)?;
    let io_write_x = rt.create_io_task(
        "io_write_x",
        IoOp::WriteVariable { agent: "Circle".into(), var: "x".into() },
    )?;
    let io_write_y = rt.create_io_task(
        "io_write_y",
        IoOp::WriteVariable { agent: "Circle".into(), var: "y".into() },
    )?;
    let io_finalize = rt.create_io_task("io_finalize", IoOp::FinalizeOutput)?;

    // ── Dependency graph ──────────────────────────────────────────────────

    rt.add_dependency(t_sync, t_out)?;
    rt.add_dependency(t_in, t_sync)?;
    rt.add_dependency(t_clear, t_in)?;
    rt.add_dependency(t_move, t_in)?;
    rt.add_dependency(io_init, t_move)?;
    rt.add_dependency(io_write_x, io_init)?;
    rt.add_dependency(io_write_y, io_write_x)?;
    rt.add_dependency(io_finalize, io_write_y)?;

    Ok(rt)
}

// ── Progress reporting ────────────────────────────────────────────────────────

struct Progress {
    every: u64,
    started: std::time::Instant,
}

impl RunObserver for Progress {
    fn on_iteration_end(&mut self, iteration: u64) {
        if iteration % self.every == 0 {
            log::info!(
                "iteration {iteration}/{ITERATIONS} ({:.1?} elapsed)",
                self.started.elapsed()
            );
        }
    }

    fn on_run_end(&mut self, iterations: u64) {
        log::info!("{iterations} iterations in {:.1?}", self.started.elapsed());
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    env_logger::init();

    let runtime = build_runtime()?;
    log::info!(
        "{} circles, {} iterations, output in {OUTPUT_DIR}/",
        AGENT_COUNT,
        ITERATIONS
    );

    let sim = Simulation::new(
        runtime,
        SimConfig {
            output_dir: OUTPUT_DIR.into(),
            ..SimConfig::default()
        },
    )?;

    let mut progress = Progress {
        every: 10,
        started: std::time::Instant::now(),
    };
    sim.run(ITERATIONS, &mut progress)?;

    let (min_x, max_x) = sim.runtime().memory().with_column("Circle", "x", |col| {
        let xs = col.as_doubles().unwrap_or(&[]);
        xs.iter().fold((f64::MAX, f64::MIN), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
    })?;
    log::info!("final x spread: [{min_x:.2}, {max_x:.2}]");
    Ok(())
}
