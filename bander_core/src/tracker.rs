//! Virtual encoder: position of the current piece from chain speed and time.
//!
//! The entry sensor is pulled up, so a falling level is the leading edge of
//! a piece and a rising level is its trailing edge.
use crate::config::LineCfg;

/// What changed during one `advance`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrackerUpdate {
    pub position_mm: f64,
    pub piece_present: bool,
    pub piece_length_mm: f64,
    pub tracking_active: bool,
    /// Leading edge seen this cycle; per-piece flags must be reset.
    pub entered: bool,
    /// Trailing edge seen this cycle; the length is now final.
    pub fully_inside: bool,
    /// The piece left the line envelope this cycle.
    pub egressed: bool,
}

#[derive(Debug, Clone)]
pub struct PositionTracker {
    step_mm: f64,
    line_length_mm: f64,
    egress_margin_mm: f64,
    position_mm: f64,
    piece_present: bool,
    piece_length_mm: f64,
    tracking_active: bool,
}

impl PositionTracker {
    pub fn new(line: &LineCfg) -> Self {
        Self {
            step_mm: line.step_mm(),
            line_length_mm: line.line_length_mm,
            egress_margin_mm: line.egress_margin_mm,
            position_mm: 0.0,
            piece_present: false,
            piece_length_mm: 0.0,
            tracking_active: false,
        }
    }

    #[inline]
    pub fn tracking_active(&self) -> bool {
        self.tracking_active
    }

    /// Position past which the current piece has cleared the line.
    #[inline]
    pub fn egress_threshold_mm(&self) -> f64 {
        self.line_length_mm + self.piece_length_mm + self.egress_margin_mm
    }

    /// Feed one sample of the entry sensor. `chain_driven` is the chain
    /// output as actually energized this cycle.
    pub fn advance(&mut self, sensor_level: bool, chain_driven: bool) -> TrackerUpdate {
        let mut up = TrackerUpdate::default();
        let covered_since_last = self.piece_present;

        if !sensor_level && !self.piece_present {
            self.piece_present = true;
            self.tracking_active = true;
            self.position_mm = 0.0;
            self.piece_length_mm = 0.0;
            up.entered = true;
        } else if sensor_level && self.piece_present {
            self.piece_present = false;
            up.fully_inside = true;
        }

        // The leading-edge cycle reports 0/0; travel counts from the next one.
        // Length grows for every interval that started with the sensor
        // covered, including the one ending on the trailing edge.
        if chain_driven && self.tracking_active && !up.entered {
            self.position_mm += self.step_mm;
            if covered_since_last {
                self.piece_length_mm += self.step_mm;
            }
            if self.position_mm > self.egress_threshold_mm() {
                self.tracking_active = false;
                self.position_mm = 0.0;
                up.egressed = true;
            }
        }

        up.position_mm = self.position_mm;
        up.piece_present = self.piece_present;
        up.piece_length_mm = self.piece_length_mm;
        up.tracking_active = self.tracking_active;
        up
    }
}
