//! Stop-circuit interlock.
//!
//! Both stop circuits are normally closed: a high level is healthy, a low
//! level means somebody pressed a stop. Either one open trips the line.
use bander_traits::{DigitalIo, Input};

use crate::hw_error::map_boxed;
use crate::state::{InputMirror, MachineState};

pub const TRIP_MESSAGE: &str = "EMERGENCY STOP ACTIVE: check stop buttons";

/// Levels of the two stop circuits (`true` = closed/healthy).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopCircuits {
    pub entry_closed: bool,
    pub exit_closed: bool,
}

impl From<&InputMirror> for StopCircuits {
    fn from(m: &InputMirror) -> Self {
        Self {
            entry_closed: m.stop_entry,
            exit_closed: m.stop_exit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyStatus {
    Clear,
    Tripped { entry_open: bool, exit_open: bool },
}

impl SafetyStatus {
    #[inline]
    pub fn is_tripped(self) -> bool {
        matches!(self, Self::Tripped { .. })
    }

    /// Operator-facing text for a trip.
    pub fn message(self) -> Option<String> {
        match self {
            Self::Clear => None,
            Self::Tripped {
                entry_open,
                exit_open,
            } => {
                let which = match (entry_open, exit_open) {
                    (true, true) => "infeed and outfeed",
                    (true, false) => "infeed",
                    _ => "outfeed",
                };
                Some(format!("{TRIP_MESSAGE} ({which})"))
            }
        }
    }
}

/// Tracks the last seen status so transitions are logged once.
#[derive(Debug, Default)]
pub struct SafetyMonitor {
    tripped: bool,
}

impl SafetyMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pure evaluation of the circuit levels.
    #[inline]
    pub fn check(circuits: StopCircuits) -> SafetyStatus {
        if circuits.entry_closed && circuits.exit_closed {
            SafetyStatus::Clear
        } else {
            SafetyStatus::Tripped {
                entry_open: !circuits.entry_closed,
                exit_open: !circuits.exit_closed,
            }
        }
    }

    /// Read both circuits from the hardware.
    pub fn sample<D: DigitalIo + ?Sized>(io: &mut D) -> eyre::Result<StopCircuits> {
        Ok(StopCircuits {
            entry_closed: io.read_digital(Input::StopEntry).map_err(map_boxed)?,
            exit_closed: io.read_digital(Input::StopExit).map_err(map_boxed)?,
        })
    }

    /// Evaluate and, on a trip, latch the emergency into `st`.
    ///
    /// The caller is responsible for driving the physical outputs low.
    pub fn observe(&mut self, circuits: StopCircuits, st: &mut MachineState) -> SafetyStatus {
        let status = Self::check(circuits);
        match status {
            SafetyStatus::Tripped { .. } => {
                if !self.tripped {
                    tracing::warn!(?status, "stop circuit open: emergency latched");
                }
                st.emergency = true;
                st.run_enabled = false;
                if let Some(msg) = status.message() {
                    st.error_message = msg;
                }
                st.clear_actuation();
            }
            SafetyStatus::Clear => {
                if self.tripped {
                    tracing::info!("stop circuits closed again; waiting for reset");
                }
            }
        }
        self.tripped = status.is_tripped();
        status
    }
}
