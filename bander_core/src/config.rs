//! Runtime configuration types for the control core.
//!
//! These are what the cycle actually consumes. They are separate from the
//! TOML-deserialized config in `bander_config`; see `conversions`.
use std::time::Duration;

use crate::error::BanderError;

/// Line pacing and envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct LineCfg {
    pub feed_speed_mm_s: f64,
    pub cycle_period: Duration,
    pub line_length_mm: f64,
    pub egress_margin_mm: f64,
}

impl LineCfg {
    /// Chain travel during one nominal cycle.
    #[inline]
    pub fn step_mm(&self) -> f64 {
        self.feed_speed_mm_s * self.cycle_period.as_secs_f64()
    }
}

impl Default for LineCfg {
    fn default() -> Self {
        Self {
            feed_speed_mm_s: 10.0 * 1000.0 / 60.0,
            cycle_period: Duration::from_millis(50),
            line_length_mm: 900.0,
            egress_margin_mm: 300.0,
        }
    }
}

/// Station offsets (from the entry sensor) and window geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneLayout {
    pub mill_offset_mm: f64,
    pub feeder_offset_mm: f64,
    pub guillotine_offset_mm: f64,
    pub end_trimmer_offset_mm: f64,
    pub mill_valve_1_tail_lead_mm: f64,
    pub mill_valve_2_lead_mm: f64,
    pub mill_valve_2_lag_mm: f64,
    pub feeder_window_mm: f64,
    pub feeder_pulse: Duration,
    pub guillotine_pulse: Duration,
    pub end_trimmer_rear_lead_mm: f64,
    pub end_trimmer_stroke_mm: f64,
    /// When set, the rear end-trim requires the home sensor at this level.
    pub end_trimmer_home_level: Option<bool>,
}

impl Default for ZoneLayout {
    fn default() -> Self {
        Self {
            mill_offset_mm: 150.0,
            feeder_offset_mm: 300.0,
            guillotine_offset_mm: 450.0,
            end_trimmer_offset_mm: 600.0,
            mill_valve_1_tail_lead_mm: 30.0,
            mill_valve_2_lead_mm: 40.0,
            mill_valve_2_lag_mm: 10.0,
            feeder_window_mm: 50.0,
            feeder_pulse: Duration::from_millis(4000),
            guillotine_pulse: Duration::from_millis(1000),
            end_trimmer_rear_lead_mm: 10.0,
            end_trimmer_stroke_mm: 100.0,
            end_trimmer_home_level: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeatingMode {
    #[default]
    Pid,
    OnOff,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

impl Default for PidGains {
    fn default() -> Self {
        Self {
            kp: 2.0,
            ki: 0.1,
            kd: 0.5,
        }
    }
}

/// A validated ADC channel index (0..=7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AnalogChannel(u8);

impl AnalogChannel {
    #[inline]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for AnalogChannel {
    type Error = BanderError;

    fn try_from(ch: u8) -> Result<Self, Self::Error> {
        if ch < bander_traits::ANALOG_CHANNELS {
            Ok(Self(ch))
        } else {
            Err(BanderError::InvalidChannel(ch))
        }
    }
}

/// Linear map from ADC counts to degrees Celsius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempScale {
    pub adc_max_count: u16,
    pub min_c: f64,
    pub max_c: f64,
}

impl Default for TempScale {
    fn default() -> Self {
        Self {
            adc_max_count: 1023,
            min_c: 0.0,
            max_c: 250.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeaterCfg {
    pub mode: HeatingMode,
    pub setpoint_c: f64,
    pub gains: PidGains,
    pub active_threshold_pct: f64,
    pub channel: AnalogChannel,
    pub scale: TempScale,
}

impl Default for HeaterCfg {
    fn default() -> Self {
        Self {
            mode: HeatingMode::Pid,
            setpoint_c: 190.0,
            gains: PidGains::default(),
            active_threshold_pct: 1.0,
            channel: AnalogChannel::default(),
            scale: TempScale::default(),
        }
    }
}

/// Everything one `ControlCycle` needs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CycleCfg {
    pub line: LineCfg,
    pub zones: ZoneLayout,
    pub heater: HeaterCfg,
}
