//! The periodic control task.
//!
//! `run_loop` paces `ControlCycle::step` at the configured period: it sleeps
//! for whatever is left of the period and, on an overrun, starts the next
//! cycle immediately without trying to catch up. `ControlTask` owns a thread
//! running that loop; stopping or dropping it joins the thread, and the loop
//! drives every output low on its way out.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use bander_traits::LineIo;
use serde::Serialize;

use crate::cycle::ControlCycle;
use crate::publish::SnapshotHub;
use crate::util::{as_micros_u64, remaining};

#[derive(Debug, Clone, Copy)]
pub struct RunnerCfg {
    /// Publish a snapshot every N cycles.
    pub publish_every: u32,
    /// Stop after this many cycles (None = until shutdown).
    pub max_cycles: Option<u64>,
}

impl Default for RunnerCfg {
    fn default() -> Self {
        Self {
            publish_every: 1,
            max_cycles: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleStats {
    pub cycles: u64,
    pub overruns: u64,
    pub io_faults: u64,
    pub max_work_us: u64,
}

/// Run cycles until `shutdown` is set or `cfg.max_cycles` is reached.
pub fn run_loop<L: LineIo>(
    cycle: &mut ControlCycle<L>,
    hub: &SnapshotHub,
    cfg: RunnerCfg,
    shutdown: &AtomicBool,
) -> CycleStats {
    let clock = cycle.clock();
    let period = cycle.cfg().line.cycle_period;
    let publish_every = u64::from(cfg.publish_every.max(1));
    let mut stats = CycleStats::default();
    let mut faulted = false;
    let mut max_work = Duration::ZERO;

    tracing::info!(period_ms = period.as_millis(), "control loop started");
    loop {
        if shutdown.load(Ordering::Relaxed) {
            tracing::debug!("control loop received shutdown signal");
            break;
        }
        if let Some(max) = cfg.max_cycles
            && stats.cycles >= max
        {
            break;
        }

        let t0 = clock.now();
        match cycle.step() {
            Ok(_) => {
                if faulted {
                    tracing::info!("I/O recovered");
                    faulted = false;
                }
            }
            Err(e) => {
                stats.io_faults += 1;
                if !faulted {
                    tracing::error!(error = %format!("{e:#}"), "control cycle I/O fault");
                    faulted = true;
                }
                cycle.fail_safe(&e);
            }
        }
        stats.cycles += 1;
        if stats.cycles % publish_every == 0 {
            hub.publish(&cycle.state().snapshot());
        }

        let work = clock.now().saturating_duration_since(t0);
        max_work = max_work.max(work);
        match remaining(period, work) {
            Some(rest) => clock.sleep(rest),
            None => {
                stats.overruns += 1;
                tracing::warn!(work_us = as_micros_u64(work), "control cycle overran its period");
            }
        }
    }

    if let Err(e) = cycle.drive_all_low() {
        tracing::error!(error = %e, "could not drive outputs low on shutdown");
    }
    stats.max_work_us = as_micros_u64(max_work);
    tracing::info!(
        cycles = stats.cycles,
        overruns = stats.overruns,
        io_faults = stats.io_faults,
        max_work_us = stats.max_work_us,
        "control loop stopped"
    );
    stats
}

/// A supervised control thread.
///
/// Each `ControlTask` owns exactly one thread, which is signalled and joined
/// when the task is stopped or dropped.
pub struct ControlTask {
    shutdown: Arc<AtomicBool>,
    join_handle: Option<JoinHandle<CycleStats>>,
}

impl ControlTask {
    pub fn spawn<L: LineIo + Send + 'static>(
        mut cycle: ControlCycle<L>,
        hub: SnapshotHub,
        cfg: RunnerCfg,
    ) -> std::io::Result<Self> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);
        let join_handle = std::thread::Builder::new()
            .name("bander-cycle".into())
            .spawn(move || run_loop(&mut cycle, &hub, cfg, &flag))?;
        Ok(Self {
            shutdown,
            join_handle: Some(join_handle),
        })
    }

    /// Ask the loop to stop after the current cycle.
    pub fn request_stop(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// True once the loop has exited (e.g. `max_cycles` reached).
    pub fn is_finished(&self) -> bool {
        self.join_handle
            .as_ref()
            .is_none_or(JoinHandle::is_finished)
    }

    /// Stop the loop and wait for it; outputs are low when this returns.
    pub fn stop(mut self) -> CycleStats {
        self.join()
    }

    fn join(&mut self) -> CycleStats {
        self.request_stop();
        match self.join_handle.take() {
            Some(h) => h.join().unwrap_or_else(|_| {
                tracing::error!("control thread panicked");
                CycleStats::default()
            }),
            None => CycleStats::default(),
        }
    }
}

impl Drop for ControlTask {
    fn drop(&mut self) {
        if self.join_handle.is_some() {
            self.join();
        }
    }
}
