//! Conversions from `bander_config` types to the core's runtime config.
//!
//! Most are infallible `From`s; the analog channel goes through
//! `AnalogChannel::try_from`, so `CycleCfg` uses `TryFrom`.

use std::time::Duration;

use crate::config::{
    AnalogChannel, CycleCfg, HeaterCfg, HeatingMode, LineCfg, PidGains, TempScale, ZoneLayout,
};
use crate::error::BanderError;

impl From<&bander_config::Line> for LineCfg {
    fn from(c: &bander_config::Line) -> Self {
        Self {
            feed_speed_mm_s: c.feed_speed_mm_s(),
            cycle_period: c.cycle_period(),
            line_length_mm: c.line_length_mm,
            egress_margin_mm: c.egress_margin_mm,
        }
    }
}

impl From<bander_config::HeatingMode> for HeatingMode {
    fn from(m: bander_config::HeatingMode) -> Self {
        match m {
            bander_config::HeatingMode::Pid => Self::Pid,
            bander_config::HeatingMode::OnOff => Self::OnOff,
        }
    }
}

impl TryFrom<&bander_config::Heating> for HeaterCfg {
    type Error = BanderError;

    fn try_from(c: &bander_config::Heating) -> Result<Self, Self::Error> {
        Ok(Self {
            mode: c.mode.into(),
            setpoint_c: c.setpoint_c,
            gains: PidGains {
                kp: c.kp,
                ki: c.ki,
                kd: c.kd,
            },
            active_threshold_pct: c.active_threshold_pct,
            channel: AnalogChannel::try_from(c.analog_channel)?,
            scale: TempScale {
                adc_max_count: c.adc_max_count,
                min_c: c.temp_min_c,
                max_c: c.temp_max_c,
            },
        })
    }
}

/// Zone layout needs the line offsets, the zone windows and the home feature.
pub fn zone_layout(cfg: &bander_config::Config) -> ZoneLayout {
    let (l, z, f) = (&cfg.line, &cfg.zones, &cfg.features);
    ZoneLayout {
        mill_offset_mm: l.mill_offset_mm,
        feeder_offset_mm: l.feeder_offset_mm,
        guillotine_offset_mm: l.guillotine_offset_mm,
        end_trimmer_offset_mm: l.end_trimmer_offset_mm,
        mill_valve_1_tail_lead_mm: z.mill_valve_1_tail_lead_mm,
        mill_valve_2_lead_mm: z.mill_valve_2_lead_mm,
        mill_valve_2_lag_mm: z.mill_valve_2_lag_mm,
        feeder_window_mm: z.feeder_window_mm,
        feeder_pulse: Duration::from_millis(z.feeder_pulse_ms),
        guillotine_pulse: Duration::from_millis(z.guillotine_pulse_ms),
        end_trimmer_rear_lead_mm: z.end_trimmer_rear_lead_mm,
        end_trimmer_stroke_mm: z.end_trimmer_stroke_mm,
        end_trimmer_home_level: if f.end_trimmer_home_check {
            f.home_confirmed_level
        } else {
            None
        },
    }
}

impl TryFrom<&bander_config::Config> for CycleCfg {
    type Error = BanderError;

    fn try_from(c: &bander_config::Config) -> Result<Self, Self::Error> {
        if c.features.end_trimmer_home_check && c.features.home_confirmed_level.is_none() {
            return Err(BanderError::Config(
                "end-trimmer home check needs an explicit home_confirmed_level".into(),
            ));
        }
        Ok(Self {
            line: LineCfg::from(&c.line),
            zones: zone_layout(c),
            heater: HeaterCfg::try_from(&c.heating)?,
        })
    }
}
