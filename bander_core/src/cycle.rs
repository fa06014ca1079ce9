//! One pass of the control loop.
//!
//! Order inside `step`:
//! 1. sample every input and the temperature channel (no lock held);
//! 2. under the state lock: mirror inputs, evaluate safety, then either the
//!    shutdown path or the run path (heater, motors, tracker, zones);
//! 3. write all outputs and the heater duty (no lock held).
use std::sync::Arc;
use std::time::Instant;

use bander_traits::clock::{Clock, MonotonicClock};
use bander_traits::{Input, LineIo, Output};
use eyre::WrapErr;

use crate::config::CycleCfg;
use crate::error::Result;
use crate::hw_error::map_boxed;
use crate::regulator::{TemperatureRegulator, round_tenth};
use crate::safety::{SafetyMonitor, StopCircuits};
use crate::shared::SharedState;
use crate::state::{Feedback, InputMirror, MachineState};
use crate::tracker::PositionTracker;
use crate::zones::{ZoneInputs, ZoneSequencer};

/// Raw readings taken at the top of a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub entry_level: bool,
    pub stops: StopCircuits,
    pub home_level: Option<bool>,
    pub adc_count: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A stop circuit is open; everything was driven low.
    Tripped,
    /// Run gate closed; everything was driven low.
    Stopped,
    Running,
    /// A zone precondition failed; run was dropped.
    ZoneFault,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct OutputFrame {
    levels: Feedback,
    duty_pct: f64,
}

impl OutputFrame {
    fn level(&self, output: Output) -> bool {
        let f = &self.levels;
        match output {
            Output::FeedChain => f.feed_chain,
            Output::MillMotor => f.mill_motor,
            Output::MillValve1 => f.mill_valve_1,
            Output::MillValve2 => f.mill_valve_2,
            Output::FeederValve => f.feeder_valve,
            Output::GuillotineValve => f.guillotine_valve,
            Output::EndTrimmerMotor => f.end_trimmer_motor,
            Output::EdgeTrimmerMotor => f.edge_trimmer_motor,
        }
    }
}

pub struct ControlCycle<L: LineIo> {
    line: L,
    cfg: CycleCfg,
    state: SharedState,
    clock: Arc<dyn Clock + Send + Sync>,
    safety: SafetyMonitor,
    tracker: PositionTracker,
    regulator: TemperatureRegulator,
    zones: ZoneSequencer,
    cycles: u64,
}

impl<L: LineIo> ControlCycle<L> {
    pub fn new(line: L, cfg: CycleCfg, state: SharedState) -> Self {
        Self {
            tracker: PositionTracker::new(&cfg.line),
            regulator: TemperatureRegulator::new(&cfg.heater, cfg.line.cycle_period.as_secs_f64()),
            zones: ZoneSequencer::new(cfg.zones.clone()),
            safety: SafetyMonitor::new(),
            clock: Arc::new(MonotonicClock::new()),
            line,
            cfg,
            state,
            cycles: 0,
        }
    }

    /// Replace the time source (pulse timers and pacing).
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    pub fn cfg(&self) -> &CycleCfg {
        &self.cfg
    }

    pub fn clock(&self) -> Arc<dyn Clock + Send + Sync> {
        Arc::clone(&self.clock)
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn line(&self) -> &L {
        &self.line
    }

    fn sample(&mut self) -> Result<Sample> {
        let stops = SafetyMonitor::sample(&mut self.line).wrap_err("read stop circuits")?;
        let entry_level = self
            .line
            .read_digital(Input::EntrySensor)
            .map_err(map_boxed)
            .wrap_err("read entry sensor")?;
        let home_level = if self.cfg.zones.end_trimmer_home_level.is_some() {
            Some(
                self.line
                    .read_digital(Input::EndTrimmerHome)
                    .map_err(map_boxed)
                    .wrap_err("read end-trimmer home sensor")?,
            )
        } else {
            None
        };
        let adc_count = self
            .line
            .read_channel(self.cfg.heater.channel.get())
            .map_err(map_boxed)
            .wrap_err("read temperature channel")?;
        Ok(Sample {
            entry_level,
            stops,
            home_level,
            adc_count,
        })
    }

    fn mirror(&self, st: &mut MachineState, s: &Sample) {
        st.inputs = InputMirror {
            entry_sensor: s.entry_level,
            stop_entry: s.stops.entry_closed,
            stop_exit: s.stops.exit_closed,
            end_trimmer_home: s.home_level,
        };
        st.temperature_actual = round_tenth(self.cfg.heater.scale.to_celsius(s.adc_count));
    }

    /// Sample once and publish inputs and safety without actuating anything.
    ///
    /// Call before accepting commands: until then the input mirror reads all
    /// stop circuits open and every command that needs a clear line is refused.
    pub fn prime(&mut self) -> Result<()> {
        let sample = self.sample()?;
        let state = self.state.clone();
        state.update(|st| {
            self.mirror(st, &sample);
            self.safety.observe(sample.stops, st);
        });
        self.drive_all_low()
    }

    /// Run one control cycle.
    pub fn step(&mut self) -> Result<CycleOutcome> {
        let sample = self.sample()?;
        let now = self.clock.now();
        let state = self.state.clone();
        let (frame, outcome) = state.update(|st| self.evaluate(st, &sample, now));
        self.write(&frame)?;
        self.cycles += 1;
        Ok(outcome)
    }

    fn evaluate(
        &mut self,
        st: &mut MachineState,
        sample: &Sample,
        now: Instant,
    ) -> (OutputFrame, CycleOutcome) {
        self.mirror(st, sample);

        if self.safety.observe(sample.stops, st).is_tripped() {
            self.zones.cancel_pulses();
            return (OutputFrame::default(), CycleOutcome::Tripped);
        }
        if !st.run_enabled {
            self.zones.cancel_pulses();
            st.clear_actuation();
            return (OutputFrame::default(), CycleOutcome::Stopped);
        }

        let en = st.enable;
        let measured = self.cfg.heater.scale.to_celsius(sample.adc_count);
        let duty = self
            .regulator
            .update(measured, self.cfg.heater.setpoint_c, en.heating);
        st.heater_duty_pct = duty;
        st.actual.heater = self.regulator.is_active(duty);
        st.actual.feed_chain = en.feed_chain;
        st.actual.mill_motor = en.mill;
        st.actual.end_trimmer_motor = en.end_trimmer;
        st.actual.edge_trimmer_motor = en.edge_trimmer;

        let track = self.tracker.advance(sample.entry_level, st.actual.feed_chain);
        if track.entered {
            self.zones.reset_piece();
            tracing::info!("piece entering line");
        }
        if track.fully_inside {
            tracing::info!(length_mm = track.piece_length_mm, "piece fully inside");
        }
        if track.egressed {
            tracing::info!("piece cleared line");
        }
        st.position_mm = track.position_mm;
        st.piece_present = track.piece_present;
        st.piece_length_mm = track.piece_length_mm;
        st.tracking_active = track.tracking_active;
        st.machine_busy = track.tracking_active;

        let zs = self.zones.evaluate(&ZoneInputs {
            position_mm: track.position_mm,
            piece_length_mm: track.piece_length_mm,
            piece_present: track.piece_present,
            tracking_active: track.tracking_active,
            enables: en,
            home_level: sample.home_level,
            now,
        });
        if let Some(fault) = zs.fault {
            tracing::warn!(%fault, position_mm = track.position_mm, "zone fault: run disabled");
            st.run_enabled = false;
            st.error_message = fault.to_string();
            self.zones.cancel_pulses();
            st.clear_actuation();
            return (OutputFrame::default(), CycleOutcome::ZoneFault);
        }
        st.actual.mill_valve_1 = zs.outputs.mill_valve_1;
        st.actual.mill_valve_2 = zs.outputs.mill_valve_2;
        st.actual.feeder_valve = zs.outputs.feeder_valve;
        st.actual.guillotine_valve = zs.outputs.guillotine_valve;
        st.end_trimmer_mid_stroke = zs.outputs.end_trimmer_mid_stroke;

        tracing::trace!(
            position_mm = st.position_mm,
            duty,
            temp_c = st.temperature_actual,
            "cycle"
        );
        (
            OutputFrame {
                levels: st.actual,
                duty_pct: duty,
            },
            CycleOutcome::Running,
        )
    }

    fn write(&mut self, frame: &OutputFrame) -> Result<()> {
        for output in Output::ALL {
            self.line
                .write_digital(output, frame.level(output))
                .map_err(map_boxed)
                .wrap_err_with(|| format!("write {output:?}"))?;
        }
        #[allow(clippy::cast_possible_truncation)]
        let duty = frame.duty_pct as f32;
        self.line
            .set_duty(duty)
            .map_err(map_boxed)
            .wrap_err("set heater duty")
    }

    /// Drive every output low and zero the heater.
    ///
    /// Tries every output even if one fails; returns the first error.
    pub fn drive_all_low(&mut self) -> Result<()> {
        let mut first = None;
        for output in Output::ALL {
            if let Err(e) = self.line.write_digital(output, false) {
                first.get_or_insert_with(|| map_boxed(e).wrap_err(format!("write {output:?} low")));
            }
        }
        if let Err(e) = self.line.set_duty(0.0) {
            first.get_or_insert_with(|| map_boxed(e).wrap_err("zero heater duty"));
        }
        first.map_or(Ok(()), Err)
    }

    /// Recover from an I/O failure: outputs low, run dropped, reason recorded.
    pub fn fail_safe(&mut self, err: &eyre::Report) {
        self.zones.cancel_pulses();
        let message = format!("I/O fault: {err:#}");
        self.state.update(|st| {
            st.run_enabled = false;
            st.clear_actuation();
            st.error_message.clone_from(&message);
        });
        tracing::debug!(error = %message, "cycle failed; outputs driven low");
        if let Err(e) = self.drive_all_low() {
            tracing::error!(error = %e, "could not drive outputs low");
        }
    }
}
