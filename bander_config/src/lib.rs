#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Deployment configuration for the edge-banding line.
//!
//! - `Config` and its sections are deserialized from TOML; every section has
//!   defaults matching the reference line, so a partial file is valid.
//! - `Config::validate` rejects values the control core cannot run with,
//!   most importantly an analog channel outside the ADC's 0..=7 range.
use serde::Deserialize;
use std::time::Duration;

/// Highest valid channel index on the temperature ADC.
pub const MAX_ANALOG_CHANNEL: u8 = 7;
/// Full-scale count of a 10-bit converter.
pub const MAX_ADC_COUNT: u16 = 1023;

/// BCM pin numbers.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Pins {
    pub entry_sensor: u8,
    pub stop_entry: u8,
    pub stop_exit: u8,
    /// Only read when `features.end_trimmer_home_check` is on.
    pub end_trimmer_home: Option<u8>,
    pub spi_clk: u8,
    pub spi_miso: u8,
    pub spi_mosi: u8,
    pub spi_cs: u8,
    pub feed_chain: u8,
    pub mill_motor: u8,
    pub mill_valve_1: u8,
    pub mill_valve_2: u8,
    pub heater_ssr: u8,
    pub feeder_valve: u8,
    pub guillotine_valve: u8,
    pub end_trimmer_motor: u8,
    pub edge_trimmer_motor: u8,
}

impl Default for Pins {
    fn default() -> Self {
        Self {
            entry_sensor: 4,
            stop_entry: 27,
            stop_exit: 22,
            end_trimmer_home: None,
            spi_clk: 11,
            spi_miso: 9,
            spi_mosi: 10,
            spi_cs: 8,
            feed_chain: 5,
            mill_motor: 6,
            mill_valve_1: 12,
            mill_valve_2: 16,
            heater_ssr: 18,
            feeder_valve: 20,
            guillotine_valve: 21,
            end_trimmer_motor: 23,
            edge_trimmer_motor: 26,
        }
    }
}

impl Pins {
    /// All output pins, used to detect wiring collisions.
    fn outputs(&self) -> [(&'static str, u8); 9] {
        [
            ("feed_chain", self.feed_chain),
            ("mill_motor", self.mill_motor),
            ("mill_valve_1", self.mill_valve_1),
            ("mill_valve_2", self.mill_valve_2),
            ("heater_ssr", self.heater_ssr),
            ("feeder_valve", self.feeder_valve),
            ("guillotine_valve", self.guillotine_valve),
            ("end_trimmer_motor", self.end_trimmer_motor),
            ("edge_trimmer_motor", self.edge_trimmer_motor),
        ]
    }
}

/// Line geometry and pacing. Offsets are measured from the entry sensor.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Line {
    /// Feed chain speed in metres per minute.
    pub feed_speed_m_min: f64,
    /// Control cycle period in milliseconds.
    pub cycle_ms: u64,
    pub mill_offset_mm: f64,
    pub feeder_offset_mm: f64,
    pub guillotine_offset_mm: f64,
    pub end_trimmer_offset_mm: f64,
    /// Informational: the edge trimmer runs whenever its zone is enabled and
    /// has no position window. Reported by `bander self-check`.
    pub edge_trimmer_offset_mm: f64,
    /// Length of the line envelope; egress happens past
    /// `line_length_mm + piece length + egress_margin_mm`.
    pub line_length_mm: f64,
    pub egress_margin_mm: f64,
}

impl Default for Line {
    fn default() -> Self {
        Self {
            feed_speed_m_min: 10.0,
            cycle_ms: 50,
            mill_offset_mm: 150.0,
            feeder_offset_mm: 300.0,
            guillotine_offset_mm: 450.0,
            end_trimmer_offset_mm: 600.0,
            edge_trimmer_offset_mm: 900.0,
            line_length_mm: 900.0,
            egress_margin_mm: 300.0,
        }
    }
}

impl Line {
    #[inline]
    pub fn feed_speed_mm_s(&self) -> f64 {
        self.feed_speed_m_min * 1000.0 / 60.0
    }

    #[inline]
    pub fn cycle_period(&self) -> Duration {
        Duration::from_millis(self.cycle_ms)
    }
}

/// Per-zone window widths and pulse durations.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Zones {
    /// Mill valve 1 closes this far before the trailing edge reaches the mill.
    pub mill_valve_1_tail_lead_mm: f64,
    /// Mill valve 2 opens this far before the trailing edge...
    pub mill_valve_2_lead_mm: f64,
    /// ...and stays open this far after it.
    pub mill_valve_2_lag_mm: f64,
    /// Width of the feeder trigger window past its offset.
    pub feeder_window_mm: f64,
    pub feeder_pulse_ms: u64,
    pub guillotine_pulse_ms: u64,
    /// Rear end-trim fires this far before the trailing edge reaches the trimmer.
    pub end_trimmer_rear_lead_mm: f64,
    /// Travel after a trim trigger during which the trimmer reports mid-stroke.
    pub end_trimmer_stroke_mm: f64,
}

impl Default for Zones {
    fn default() -> Self {
        Self {
            mill_valve_1_tail_lead_mm: 30.0,
            mill_valve_2_lead_mm: 40.0,
            mill_valve_2_lag_mm: 10.0,
            feeder_window_mm: 50.0,
            feeder_pulse_ms: 4000,
            guillotine_pulse_ms: 1000,
            end_trimmer_rear_lead_mm: 10.0,
            end_trimmer_stroke_mm: 100.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HeatingMode {
    /// Closed-loop PID producing a continuous duty.
    #[default]
    Pid,
    /// Thermostat: full duty below setpoint, off at or above.
    OnOff,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Heating {
    pub mode: HeatingMode,
    pub setpoint_c: f64,
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// Duty above which the heater is reported active.
    pub active_threshold_pct: f64,
    /// Software PWM frequency on the SSR pin.
    pub pwm_hz: f64,
    pub analog_channel: u8,
    pub adc_max_count: u16,
    pub temp_min_c: f64,
    pub temp_max_c: f64,
}

impl Default for Heating {
    fn default() -> Self {
        Self {
            mode: HeatingMode::Pid,
            setpoint_c: 190.0,
            kp: 2.0,
            ki: 0.1,
            kd: 0.5,
            active_threshold_pct: 1.0,
            pwm_hz: 2.0,
            analog_channel: 0,
            adc_max_count: MAX_ADC_COUNT,
            temp_min_c: 0.0,
            temp_max_c: 250.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Features {
    /// Require the end-trimmer home sensor before the rear cut.
    pub end_trimmer_home_check: bool,
    /// Input level that means "at home". Deliberately has no default: it
    /// depends on the fitted sensor and must be stated per deployment.
    pub home_confirmed_level: Option<bool>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Publish {
    /// Publish a snapshot every N cycles (1 = every cycle).
    pub every_n_cycles: u32,
}

impl Default for Publish {
    fn default() -> Self {
        Self { every_n_cycles: 1 }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Config {
    pub pins: Pins,
    pub line: Line,
    pub zones: Zones,
    pub heating: Heating,
    pub features: Features,
    pub publish: Publish,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Line
        if !(self.line.feed_speed_m_min.is_finite() && self.line.feed_speed_m_min > 0.0) {
            eyre::bail!("line.feed_speed_m_min must be > 0");
        }
        if self.line.cycle_ms == 0 {
            eyre::bail!("line.cycle_ms must be >= 1");
        }
        if self.line.cycle_ms > 1000 {
            eyre::bail!("line.cycle_ms is unreasonably large (>1s)");
        }
        for (name, v) in [
            ("line.mill_offset_mm", self.line.mill_offset_mm),
            ("line.feeder_offset_mm", self.line.feeder_offset_mm),
            ("line.guillotine_offset_mm", self.line.guillotine_offset_mm),
            ("line.end_trimmer_offset_mm", self.line.end_trimmer_offset_mm),
            ("line.edge_trimmer_offset_mm", self.line.edge_trimmer_offset_mm),
            ("line.line_length_mm", self.line.line_length_mm),
            ("line.egress_margin_mm", self.line.egress_margin_mm),
        ] {
            if !(v.is_finite() && v >= 0.0) {
                eyre::bail!("{name} must be >= 0");
            }
        }

        // Zones
        for (name, v) in [
            ("zones.mill_valve_1_tail_lead_mm", self.zones.mill_valve_1_tail_lead_mm),
            ("zones.mill_valve_2_lead_mm", self.zones.mill_valve_2_lead_mm),
            ("zones.mill_valve_2_lag_mm", self.zones.mill_valve_2_lag_mm),
            ("zones.end_trimmer_rear_lead_mm", self.zones.end_trimmer_rear_lead_mm),
        ] {
            if !(v.is_finite() && v >= 0.0) {
                eyre::bail!("{name} must be >= 0");
            }
        }
        if !(self.zones.feeder_window_mm.is_finite() && self.zones.feeder_window_mm > 0.0) {
            eyre::bail!("zones.feeder_window_mm must be > 0");
        }
        if !(self.zones.end_trimmer_stroke_mm.is_finite() && self.zones.end_trimmer_stroke_mm > 0.0)
        {
            eyre::bail!("zones.end_trimmer_stroke_mm must be > 0");
        }
        if self.zones.feeder_pulse_ms == 0 {
            eyre::bail!("zones.feeder_pulse_ms must be >= 1");
        }
        if self.zones.guillotine_pulse_ms == 0 {
            eyre::bail!("zones.guillotine_pulse_ms must be >= 1");
        }

        // Heating
        if self.heating.analog_channel > MAX_ANALOG_CHANNEL {
            eyre::bail!(
                "heating.analog_channel must be in 0..={MAX_ANALOG_CHANNEL}, got {}",
                self.heating.analog_channel
            );
        }
        if self.heating.adc_max_count == 0 || self.heating.adc_max_count > MAX_ADC_COUNT {
            eyre::bail!("heating.adc_max_count must be in 1..={MAX_ADC_COUNT}");
        }
        if !(self.heating.temp_min_c.is_finite()
            && self.heating.temp_max_c.is_finite()
            && self.heating.temp_max_c > self.heating.temp_min_c)
        {
            eyre::bail!("heating.temp_max_c must be greater than heating.temp_min_c");
        }
        if !self.heating.setpoint_c.is_finite() {
            eyre::bail!("heating.setpoint_c must be finite");
        }
        for (name, v) in [
            ("heating.kp", self.heating.kp),
            ("heating.ki", self.heating.ki),
            ("heating.kd", self.heating.kd),
        ] {
            if !(v.is_finite() && v >= 0.0) {
                eyre::bail!("{name} must be >= 0");
            }
        }
        if !(0.0..100.0).contains(&self.heating.active_threshold_pct) {
            eyre::bail!("heating.active_threshold_pct must be in [0.0, 100.0)");
        }
        if !(self.heating.pwm_hz.is_finite() && self.heating.pwm_hz > 0.0) {
            eyre::bail!("heating.pwm_hz must be > 0");
        }

        // Features
        if self.features.end_trimmer_home_check {
            if self.pins.end_trimmer_home.is_none() {
                eyre::bail!("features.end_trimmer_home_check requires pins.end_trimmer_home");
            }
            if self.features.home_confirmed_level.is_none() {
                eyre::bail!(
                    "features.end_trimmer_home_check requires features.home_confirmed_level (true = high means home)"
                );
            }
        }

        // Publish
        if self.publish.every_n_cycles == 0 {
            eyre::bail!("publish.every_n_cycles must be >= 1");
        }

        // Pins: no output may share a line with another output
        let outs = self.pins.outputs();
        for (i, (a_name, a)) in outs.iter().enumerate() {
            if let Some((b_name, _)) = outs[i + 1..].iter().find(|(_, b)| b == a) {
                eyre::bail!("pins.{a_name} and pins.{b_name} share GPIO {a}");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_reference_line() {
        let cfg = load_toml("").expect("parse");
        cfg.validate().expect("defaults are valid");
        assert_eq!(cfg.pins.entry_sensor, 4);
        assert_eq!(cfg.line.cycle_ms, 50);
        assert!((cfg.line.feed_speed_mm_s() - 166.666_666).abs() < 1e-3);
        assert_eq!(cfg.heating.mode, HeatingMode::Pid);
    }

    #[test]
    fn heating_mode_parses_snake_case() {
        let cfg = load_toml("[heating]\nmode = \"on_off\"\n").expect("parse");
        assert_eq!(cfg.heating.mode, HeatingMode::OnOff);
    }
}
