#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Control core for the edge-banding line (hardware-agnostic).
//!
//! All hardware access goes through the `bander_traits` capabilities; the
//! backends live in `bander_hardware`.
//!
//! ## Architecture
//!
//! - **State**: `MachineState` behind one lock (`shared::SharedState`)
//! - **Safety**: stop-circuit interlock with a latched emergency (`safety`)
//! - **Tracking**: virtual encoder for the current piece (`tracker`)
//! - **Heating**: PID or thermostat regulator (`regulator`)
//! - **Zones**: per-station sequencing with one-shot pulses (`zones`)
//! - **Commands**: validated operator commands (`command`)
//! - **Cycle / runner**: one pass of the loop and the paced thread running it
//! - **Publish**: non-blocking snapshot fan-out (`publish`)

pub mod command;
pub mod config;
pub mod conversions;
pub mod cycle;
pub mod error;
pub mod hw_error;
pub mod mocks;
pub mod publish;
pub mod regulator;
pub mod runner;
pub mod safety;
pub mod shared;
pub mod state;
pub mod tracker;
pub mod util;
pub mod zones;

pub use command::{Command, CommandHandler, CommandOutcome, Rejection};
pub use config::{CycleCfg, HeaterCfg, LineCfg, ZoneLayout};
pub use cycle::{ControlCycle, CycleOutcome};
pub use error::{BanderError, Result};
pub use publish::SnapshotHub;
pub use runner::{ControlTask, CycleStats, RunnerCfg, run_loop};
pub use safety::{SafetyMonitor, SafetyStatus, StopCircuits};
pub use shared::SharedState;
pub use state::{Feedback, MachineState, Zone, ZoneEnables};
