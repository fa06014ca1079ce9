//! Per-zone actuator sequencing.
//!
//! Each zone reacts to the tracker position and its enable flag:
//! - mill: two valves driven by position windows, no timers;
//! - feeder and guillotine: one-shot timed pulses;
//! - end trimmer: front and rear trim triggers, exposed as `mid_stroke`.
//!
//! One-shot flags are cleared only by `reset_piece`, which the cycle calls
//! on a new leading edge. Pulse timers are separate from the flags, so a
//! cancelled pulse never re-arms for the same piece.
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::config::ZoneLayout;
use crate::state::ZoneEnables;

/// Inputs to one sequencer evaluation.
#[derive(Debug, Clone, Copy)]
pub struct ZoneInputs {
    pub position_mm: f64,
    pub piece_length_mm: f64,
    pub piece_present: bool,
    pub tracking_active: bool,
    pub enables: ZoneEnables,
    /// Home sensor level, when the check is configured.
    pub home_level: Option<bool>,
    pub now: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ZoneOutputs {
    pub mill_valve_1: bool,
    pub mill_valve_2: bool,
    pub feeder_valve: bool,
    pub guillotine_valve: bool,
    pub end_trimmer_mid_stroke: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ZoneFault {
    #[error("END TRIMMER NOT AT HOME: rear trim blocked")]
    EndTrimmerNotHome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ZoneStep {
    pub outputs: ZoneOutputs,
    pub fault: Option<ZoneFault>,
}

/// A valve held on for a fixed time after a one-shot trigger.
#[derive(Debug, Clone)]
struct PulseZone {
    duration: Duration,
    fired: bool,
    started: Option<Instant>,
}

impl PulseZone {
    fn new(duration: Duration) -> Self {
        Self {
            duration,
            fired: false,
            started: None,
        }
    }

    fn step(&mut self, enabled: bool, trigger: bool, now: Instant) -> bool {
        if !enabled {
            self.started = None;
            return false;
        }
        if trigger && !self.fired {
            self.fired = true;
            self.started = Some(now);
        }
        match self.started {
            Some(t0) if now.saturating_duration_since(t0) < self.duration => true,
            Some(_) => {
                self.started = None;
                false
            }
            None => false,
        }
    }

    fn cancel(&mut self) {
        self.started = None;
    }

    fn reset(&mut self) {
        self.fired = false;
        self.started = None;
    }
}

#[derive(Debug, Clone, Default)]
struct EndTrimmer {
    front_done: bool,
    rear_done: bool,
}

pub struct ZoneSequencer {
    layout: ZoneLayout,
    feeder: PulseZone,
    guillotine: PulseZone,
    end_trimmer: EndTrimmer,
}

impl ZoneSequencer {
    pub fn new(layout: ZoneLayout) -> Self {
        Self {
            feeder: PulseZone::new(layout.feeder_pulse),
            guillotine: PulseZone::new(layout.guillotine_pulse),
            end_trimmer: EndTrimmer::default(),
            layout,
        }
    }

    pub fn layout(&self) -> &ZoneLayout {
        &self.layout
    }

    /// Clear every per-piece one-shot flag and timer.
    pub fn reset_piece(&mut self) {
        self.feeder.reset();
        self.guillotine.reset();
        self.end_trimmer = EndTrimmer::default();
    }

    /// Stop running pulses without re-arming them.
    pub fn cancel_pulses(&mut self) {
        self.feeder.cancel();
        self.guillotine.cancel();
    }

    pub fn evaluate(&mut self, i: &ZoneInputs) -> ZoneStep {
        let l = &self.layout;
        let pos = i.position_mm;
        let tracking = i.tracking_active;
        let mut out = ZoneOutputs::default();

        // Mill valves follow position only.
        if i.enables.mill && tracking {
            let tail = l.mill_offset_mm + i.piece_length_mm;
            out.mill_valve_1 = pos >= l.mill_offset_mm
                && (i.piece_present || pos < tail - l.mill_valve_1_tail_lead_mm);
            out.mill_valve_2 = !i.piece_present
                && pos >= tail - l.mill_valve_2_lead_mm
                && pos <= tail + l.mill_valve_2_lag_mm;
        }

        // Feeder and guillotine share the feeder group's enable.
        let feeder_trigger = tracking
            && pos >= l.feeder_offset_mm
            && pos < l.feeder_offset_mm + l.feeder_window_mm;
        out.feeder_valve = self.feeder.step(i.enables.feeder, feeder_trigger, i.now);

        let guillotine_trigger =
            tracking && !i.piece_present && pos >= l.guillotine_offset_mm + i.piece_length_mm;
        out.guillotine_valve = self
            .guillotine
            .step(i.enables.feeder, guillotine_trigger, i.now);

        let mut fault = None;
        if i.enables.end_trimmer && tracking {
            let front = l.end_trimmer_offset_mm;
            let rear = front + i.piece_length_mm - l.end_trimmer_rear_lead_mm;
            let et = &mut self.end_trimmer;
            if !et.front_done && pos >= front {
                et.front_done = true;
                tracing::debug!(position_mm = pos, "end trimmer: front cut");
            }
            if !et.rear_done && !i.piece_present && pos >= rear {
                let home_ok = l
                    .end_trimmer_home_level
                    .is_none_or(|want| i.home_level == Some(want));
                if home_ok {
                    et.rear_done = true;
                    tracing::debug!(position_mm = pos, "end trimmer: rear cut");
                } else {
                    fault = Some(ZoneFault::EndTrimmerNotHome);
                }
            }
            let stroke = l.end_trimmer_stroke_mm;
            out.end_trimmer_mid_stroke = (et.front_done && pos >= front && pos < front + stroke)
                || (et.rear_done && pos >= rear && pos < rear + stroke);
        }

        ZoneStep {
            outputs: out,
            fault,
        }
    }
}
