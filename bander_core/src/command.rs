//! Operator commands and their validation against the machine state.
//!
//! Wire form is one JSON object per command:
//! `{"kind":"set_run","value":true}`,
//! `{"kind":"reset_emergency"}`,
//! `{"kind":"set_zone_enable","zone":"mill","value":false}`.
use serde::Deserialize;
use thiserror::Error;

use crate::safety::{SafetyMonitor, StopCircuits};
use crate::shared::SharedState;
use crate::state::Zone;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SetRun(bool),
    ResetEmergency,
    SetZoneEnable(Zone, bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    SetRun,
    ResetEmergency,
    SetZoneEnable,
}

/// Inbound message as it arrives from the command channel.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandMessage {
    pub kind: CommandKind,
    #[serde(default)]
    pub zone: Option<Zone>,
    #[serde(default)]
    pub value: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandParseError {
    #[error("malformed command: {0}")]
    Malformed(String),
    #[error("set_zone_enable needs a zone")]
    MissingZone,
}

impl TryFrom<CommandMessage> for Command {
    type Error = CommandParseError;

    fn try_from(m: CommandMessage) -> Result<Self, Self::Error> {
        Ok(match m.kind {
            CommandKind::SetRun => Self::SetRun(m.value),
            CommandKind::ResetEmergency => Self::ResetEmergency,
            CommandKind::SetZoneEnable => {
                Self::SetZoneEnable(m.zone.ok_or(CommandParseError::MissingZone)?, m.value)
            }
        })
    }
}

impl std::str::FromStr for Command {
    type Err = CommandParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let msg: CommandMessage =
            serde_json::from_str(s).map_err(|e| CommandParseError::Malformed(e.to_string()))?;
        Self::try_from(msg)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("emergency latched; only reset_emergency is accepted")]
    EmergencyLatched,
    #[error("{0}")]
    StopCircuitOpen(String),
    #[error("zone enables can only change while running")]
    NotRunning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Ack,
    Rejected(Rejection),
}

impl CommandOutcome {
    pub fn is_ack(&self) -> bool {
        matches!(self, Self::Ack)
    }
}

/// Applies commands to the shared state under its lock.
///
/// Safety is judged from the stop-circuit levels the control cycle mirrored
/// into the state, so the answer is never older than one cycle.
#[derive(Clone, Debug)]
pub struct CommandHandler {
    state: SharedState,
}

impl CommandHandler {
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    pub fn apply(&self, cmd: Command) -> CommandOutcome {
        let outcome = self.state.update(|st| {
            let safety = SafetyMonitor::check(StopCircuits::from(&st.inputs));
            if st.emergency && cmd != Command::ResetEmergency {
                return CommandOutcome::Rejected(Rejection::EmergencyLatched);
            }
            match cmd {
                Command::SetRun(true) => {
                    if let Some(msg) = safety.message() {
                        return CommandOutcome::Rejected(Rejection::StopCircuitOpen(msg));
                    }
                    if !st.run_enabled {
                        tracing::info!("run enabled");
                    }
                    st.run_enabled = true;
                    st.error_message.clear();
                    CommandOutcome::Ack
                }
                Command::SetRun(false) => {
                    if st.run_enabled {
                        tracing::info!("run disabled");
                    }
                    st.run_enabled = false;
                    CommandOutcome::Ack
                }
                Command::ResetEmergency => {
                    if let Some(msg) = safety.message() {
                        st.error_message.clone_from(&msg);
                        return CommandOutcome::Rejected(Rejection::StopCircuitOpen(msg));
                    }
                    if st.emergency {
                        tracing::info!("emergency reset");
                    }
                    st.emergency = false;
                    st.error_message.clear();
                    CommandOutcome::Ack
                }
                Command::SetZoneEnable(zone, value) => {
                    if !st.run_enabled {
                        return CommandOutcome::Rejected(Rejection::NotRunning);
                    }
                    st.enable.set(zone, value);
                    tracing::debug!(?zone, value, "zone enable");
                    CommandOutcome::Ack
                }
            }
        });
        if let CommandOutcome::Rejected(r) = &outcome {
            tracing::warn!(?cmd, reason = %r, "command rejected");
        }
        outcome
    }
}
