//! The shared machine record published to the dashboard.
use serde::{Deserialize, Serialize};

/// Independently enabled processing groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    Heating,
    FeedChain,
    Mill,
    Feeder,
    EndTrimmer,
    EdgeTrimmer,
}

/// Operator intent per zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ZoneEnables {
    pub heating: bool,
    pub feed_chain: bool,
    pub mill: bool,
    pub feeder: bool,
    pub end_trimmer: bool,
    pub edge_trimmer: bool,
}

impl ZoneEnables {
    pub fn get(&self, zone: Zone) -> bool {
        match zone {
            Zone::Heating => self.heating,
            Zone::FeedChain => self.feed_chain,
            Zone::Mill => self.mill,
            Zone::Feeder => self.feeder,
            Zone::EndTrimmer => self.end_trimmer,
            Zone::EdgeTrimmer => self.edge_trimmer,
        }
    }

    pub fn set(&mut self, zone: Zone, value: bool) {
        let slot = match zone {
            Zone::Heating => &mut self.heating,
            Zone::FeedChain => &mut self.feed_chain,
            Zone::Mill => &mut self.mill,
            Zone::Feeder => &mut self.feeder,
            Zone::EndTrimmer => &mut self.end_trimmer,
            Zone::EdgeTrimmer => &mut self.edge_trimmer,
        };
        *slot = value;
    }
}

/// What the actuators are actually doing, as last written by the cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Feedback {
    pub heater: bool,
    pub feed_chain: bool,
    pub mill_motor: bool,
    pub mill_valve_1: bool,
    pub mill_valve_2: bool,
    pub feeder_valve: bool,
    pub guillotine_valve: bool,
    pub end_trimmer_motor: bool,
    pub edge_trimmer_motor: bool,
}

impl Feedback {
    pub fn any(&self) -> bool {
        *self != Self::default()
    }
}

/// Raw input levels from the last sample, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct InputMirror {
    pub entry_sensor: bool,
    pub stop_entry: bool,
    pub stop_exit: bool,
    /// Only sampled when the home check is configured.
    pub end_trimmer_home: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MachineState {
    pub run_enabled: bool,
    pub emergency: bool,
    pub error_message: String,

    pub position_mm: f64,
    pub piece_present: bool,
    pub piece_length_mm: f64,
    pub tracking_active: bool,
    pub machine_busy: bool,

    pub enable: ZoneEnables,
    pub actual: Feedback,
    pub temperature_actual: f64,
    pub heater_duty_pct: f64,

    pub inputs: InputMirror,
    pub end_trimmer_mid_stroke: bool,
}

impl MachineState {
    /// Drop every actuator to its rest state in the record.
    pub(crate) fn clear_actuation(&mut self) {
        self.actual = Feedback::default();
        self.heater_duty_pct = 0.0;
        self.end_trimmer_mid_stroke = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enables_round_trip_every_zone() {
        let mut en = ZoneEnables::default();
        for z in [
            Zone::Heating,
            Zone::FeedChain,
            Zone::Mill,
            Zone::Feeder,
            Zone::EndTrimmer,
            Zone::EdgeTrimmer,
        ] {
            assert!(!en.get(z));
            en.set(z, true);
            assert!(en.get(z));
        }
    }

    #[test]
    fn snapshot_serializes_named_fields() {
        let st = MachineState::default();
        let v = serde_json::to_value(&st).unwrap();
        assert_eq!(v["run_enabled"], false);
        assert_eq!(v["enable"]["feed_chain"], false);
        assert_eq!(v["actual"]["guillotine_valve"], false);
        assert!(v["inputs"]["end_trimmer_home"].is_null());
    }
}
