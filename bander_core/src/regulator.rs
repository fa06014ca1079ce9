//! Heater regulation: PID or plain thermostat, plus the ADC scaling.
use crate::config::{HeaterCfg, HeatingMode, PidGains, TempScale};

/// Maximum heater duty in percent.
pub const MAX_DUTY_PCT: f64 = 100.0;

impl TempScale {
    /// Map a raw ADC count onto the configured temperature span.
    /// Counts above full scale are clamped.
    #[inline]
    pub fn to_celsius(&self, count: u16) -> f64 {
        let max = self.adc_max_count.max(1);
        let frac = f64::from(count.min(max)) / f64::from(max);
        self.min_c + frac * (self.max_c - self.min_c)
    }
}

/// One decimal place, as shown on the dashboard.
#[inline]
pub fn round_tenth(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

#[derive(Debug, Clone)]
pub struct TemperatureRegulator {
    mode: HeatingMode,
    gains: PidGains,
    dt_s: f64,
    active_threshold_pct: f64,
    integral: f64,
    prev_error: f64,
}

impl TemperatureRegulator {
    /// `dt_s` is the nominal cycle period.
    pub fn new(cfg: &HeaterCfg, dt_s: f64) -> Self {
        Self {
            mode: cfg.mode,
            gains: cfg.gains,
            dt_s: if dt_s > 0.0 { dt_s } else { f64::EPSILON },
            active_threshold_pct: cfg.active_threshold_pct,
            integral: 0.0,
            prev_error: 0.0,
        }
    }

    /// Duty in percent for this cycle. A disabled heater returns 0 and keeps
    /// the accumulated integral.
    pub fn update(&mut self, measured_c: f64, setpoint_c: f64, enabled: bool) -> f64 {
        if !enabled {
            return 0.0;
        }
        match self.mode {
            HeatingMode::OnOff => {
                if measured_c < setpoint_c {
                    MAX_DUTY_PCT
                } else {
                    0.0
                }
            }
            HeatingMode::Pid => {
                let error = setpoint_c - measured_c;
                self.integral += error * self.dt_s;
                let derivative = (error - self.prev_error) / self.dt_s;
                self.prev_error = error;
                let g = self.gains;
                let out = g.kp * error + g.ki * self.integral + g.kd * derivative;
                if out.is_finite() {
                    out.clamp(0.0, MAX_DUTY_PCT)
                } else {
                    0.0
                }
            }
        }
    }

    /// Whether `duty` counts as the heater being on.
    #[inline]
    pub fn is_active(&self, duty_pct: f64) -> bool {
        duty_pct > self.active_threshold_pct
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid() -> TemperatureRegulator {
        TemperatureRegulator::new(&HeaterCfg::default(), 0.05)
    }

    #[test]
    fn disabled_returns_zero_and_keeps_integral() {
        let mut r = pid();
        r.update(100.0, 190.0, true);
        let i = r.integral();
        assert!(i > 0.0);
        assert_eq!(r.update(100.0, 190.0, false), 0.0);
        assert_eq!(r.integral(), i);
    }

    #[test]
    fn duty_is_clamped() {
        let mut r = pid();
        assert_eq!(r.update(0.0, 190.0, true), MAX_DUTY_PCT);
        let mut r = pid();
        assert_eq!(r.update(250.0, 190.0, true), 0.0);
    }

    #[test]
    fn small_error_yields_proportional_duty() {
        let cfg = HeaterCfg {
            gains: PidGains {
                kp: 2.0,
                ki: 0.0,
                kd: 0.0,
            },
            ..HeaterCfg::default()
        };
        let mut r = TemperatureRegulator::new(&cfg, 0.05);
        let d = r.update(185.0, 190.0, true);
        assert!((d - 10.0).abs() < 1e-9);
        assert!(r.is_active(d));
        assert!(!r.is_active(0.5));
    }

    #[test]
    fn on_off_mode_is_a_thermostat() {
        let cfg = HeaterCfg {
            mode: HeatingMode::OnOff,
            ..HeaterCfg::default()
        };
        let mut r = TemperatureRegulator::new(&cfg, 0.05);
        assert_eq!(r.update(189.9, 190.0, true), MAX_DUTY_PCT);
        assert_eq!(r.update(190.0, 190.0, true), 0.0);
        assert_eq!(r.integral(), 0.0);
    }

    #[test]
    fn adc_scaling_is_linear_and_clamped() {
        let s = TempScale::default();
        assert_eq!(s.to_celsius(0), 0.0);
        assert_eq!(s.to_celsius(1023), 250.0);
        assert_eq!(s.to_celsius(4000), 250.0);
        assert_eq!(round_tenth(s.to_celsius(512)), 125.1);
    }
}
