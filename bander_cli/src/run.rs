//! The `run` and `self-check` subcommands.

use std::io::{BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bander_config::Config;
use bander_core::{
    Command, CommandHandler, CommandOutcome, ControlCycle, ControlTask, CycleCfg, CycleStats,
    RunnerCfg, SharedState, SnapshotHub,
};
use crossbeam_channel::RecvTimeoutError;
use eyre::WrapErr;

use crate::cli::{JSON_MODE, SimOpts};
use crate::line;

/// Snapshots buffered for the stdout writer before the hub starts dropping.
const SNAPSHOT_DEPTH: usize = 64;
const POLL: Duration = Duration::from_millis(100);

pub struct RunArgs {
    pub cycles: Option<u64>,
    pub stats: bool,
}

pub fn run(cfg: &Config, args: &RunArgs, sim: &SimOpts) -> eyre::Result<()> {
    let cycle_cfg = CycleCfg::try_from(cfg).wrap_err("invalid configuration")?;
    let (backend, backend_name) = line::open(cfg, sim)?;

    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let flag = Arc::clone(&interrupted);
        ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
            .wrap_err("install Ctrl-C handler")?;
    }

    let state = SharedState::new();
    let mut cycle = ControlCycle::new(backend, cycle_cfg, state.clone());
    // Commands are judged against the input mirror, so it must hold a real sample first.
    cycle.prime().wrap_err("initial input sample")?;
    if state.emergency() {
        tracing::warn!(message = %state.error_message(), "starting with emergency latched");
    }

    let hub = SnapshotHub::new();
    let snapshots = hub.subscribe(SNAPSHOT_DEPTH);
    let runner = RunnerCfg {
        publish_every: cfg.publish.every_n_cycles,
        max_cycles: args.cycles,
    };
    let task = ControlTask::spawn(cycle, hub, runner).wrap_err("spawn control thread")?;
    tracing::info!(backend = backend_name, "line controller running");

    spawn_command_reader(CommandHandler::new(state))?;

    let stdout = std::io::stdout();
    loop {
        match snapshots.recv_timeout(POLL) {
            Ok(snap) => {
                let line = serde_json::to_string(&snap).wrap_err("encode snapshot")?;
                let mut out = stdout.lock();
                if writeln!(out, "{line}").and_then(|()| out.flush()).is_err() {
                    // Reader went away; nothing left to publish to.
                    tracing::debug!("stdout closed, stopping");
                    task.request_stop();
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            // The hub lives on the control thread: disconnected means the loop has exited.
            Err(RecvTimeoutError::Disconnected) => break,
        }
        if interrupted.load(Ordering::Relaxed) {
            task.request_stop();
        }
    }

    let stats = task.stop();
    if args.stats {
        report_stats(&stats);
    }
    Ok(())
}

/// JSON-lines commands on stdin feed the handler until EOF.
///
/// The thread is detached: a blocking stdin read cannot be interrupted, and
/// the handler only touches shared state.
fn spawn_command_reader(handler: CommandHandler) -> eyre::Result<()> {
    std::thread::Builder::new()
        .name("bander-commands".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match line.parse::<Command>() {
                    Ok(cmd) => match handler.apply(cmd) {
                        CommandOutcome::Ack => tracing::info!(?cmd, "command accepted"),
                        // Rejections are logged by the handler itself.
                        CommandOutcome::Rejected(_) => {}
                    },
                    Err(e) => tracing::warn!(error = %e, input = line, "ignoring malformed command"),
                }
            }
            tracing::debug!("command input closed");
        })
        .wrap_err("spawn command reader")?;
    Ok(())
}

fn report_stats(stats: &CycleStats) {
    if JSON_MODE.get().copied().unwrap_or(false) {
        let v = serde_json::json!({ "stats": stats });
        println!("{v}");
    } else {
        eprintln!(
            "cycles={} overruns={} io_faults={} max_work_us={}",
            stats.cycles, stats.overruns, stats.io_faults, stats.max_work_us
        );
    }
}

/// Validate the config, open the backend and take one full sample.
pub fn self_check(cfg: &Config, sim: &SimOpts) -> eyre::Result<()> {
    let cycle_cfg = CycleCfg::try_from(cfg).wrap_err("invalid configuration")?;
    let (backend, backend_name) = line::open(cfg, sim)?;
    let state = SharedState::new();
    let mut cycle = ControlCycle::new(backend, cycle_cfg, state.clone());
    cycle.prime().wrap_err("sample line inputs")?;
    let s = state.snapshot();

    if JSON_MODE.get().copied().unwrap_or(false) {
        let v = serde_json::json!({
            "status": "ok",
            "backend": backend_name,
            "inputs": s.inputs,
            "temperature_c": s.temperature_actual,
            "emergency": s.emergency,
            "edge_trimmer_offset_mm": cfg.line.edge_trimmer_offset_mm,
        });
        println!("{v}");
    } else {
        let circuit = |closed: bool| if closed { "closed" } else { "OPEN" };
        println!("backend: {backend_name}");
        println!(
            "stop circuits: infeed {}, outfeed {}",
            circuit(s.inputs.stop_entry),
            circuit(s.inputs.stop_exit)
        );
        let entry = if s.inputs.entry_sensor { "clear" } else { "covered" };
        println!("entry sensor: {entry}");
        if let Some(home) = s.inputs.end_trimmer_home {
            println!("end trimmer home input: {}", if home { "high" } else { "low" });
        }
        println!("roller temperature: {:.1} C", s.temperature_actual);
        if s.emergency {
            println!("WARNING: {}", s.error_message);
        }
        println!("self-check ok");
    }
    Ok(())
}
