//! Simulated edge-banding line.
//!
//! Integrates a small plant model on every capability call, using the
//! elapsed time of the supplied `Clock`:
//! - a conveyor that only moves while `Output::FeedChain` is on, carrying a
//!   train of pieces past the entry sensor;
//! - a first-order heater driven by the PWM duty;
//! - stop circuits that stay closed until a trip is injected through the
//!   `SimHandle`.
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use bander_traits::clock::{Clock, MonotonicClock};
use bander_traits::{ANALOG_CHANNELS, AnalogIn, DigitalIo, Input, Output, PwmOutput};

use crate::error::HwError;

/// Plant parameters for the simulated line.
#[derive(Debug, Clone)]
pub struct SimParams {
    pub feed_speed_mm_s: f64,
    pub piece_length_mm: f64,
    /// Free chain travel before the first piece and between pieces. Keep it
    /// above line length plus egress margin so each piece clears the line
    /// before the next leading edge.
    pub gap_mm: f64,
    /// Stop feeding pieces after this many (None = endless).
    pub piece_count: Option<u32>,
    pub ambient_c: f64,
    pub start_temp_c: f64,
    /// Heating rate at 100 % duty, before losses.
    pub heat_rate_c_s: f64,
    /// Fraction of the excess over ambient lost per second.
    pub loss_per_s: f64,
    pub temp_min_c: f64,
    pub temp_max_c: f64,
    pub adc_max_count: u16,
    /// Level reported on `Input::EndTrimmerHome`.
    pub home_level: bool,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            feed_speed_mm_s: 10.0 * 1000.0 / 60.0,
            piece_length_mm: 600.0,
            gap_mm: 1500.0,
            piece_count: None,
            ambient_c: 20.0,
            start_temp_c: 20.0,
            heat_rate_c_s: 12.0,
            loss_per_s: 0.04,
            temp_min_c: 0.0,
            temp_max_c: 250.0,
            adc_max_count: 1023,
            home_level: true,
        }
    }
}

#[derive(Debug)]
struct SimState {
    params: SimParams,
    last: Option<Instant>,
    conveyor_mm: f64,
    temp_c: f64,
    duty_pct: f64,
    outputs: [bool; Output::ALL.len()],
    stop_entry_closed: bool,
    stop_exit_closed: bool,
}

impl SimState {
    fn new(params: SimParams) -> Self {
        Self {
            temp_c: params.start_temp_c,
            params,
            last: None,
            conveyor_mm: 0.0,
            duty_pct: 0.0,
            outputs: [false; Output::ALL.len()],
            stop_entry_closed: true,
            stop_exit_closed: true,
        }
    }

    fn integrate(&mut self, now: Instant) {
        let Some(last) = self.last.replace(now) else {
            return;
        };
        let dt = now.saturating_duration_since(last).as_secs_f64();
        if dt <= 0.0 {
            return;
        }
        if self.outputs[output_index(Output::FeedChain)] {
            self.conveyor_mm += self.params.feed_speed_mm_s * dt;
        }
        let p = &self.params;
        let gain = self.duty_pct / 100.0 * p.heat_rate_c_s;
        let loss = (self.temp_c - p.ambient_c) * p.loss_per_s;
        self.temp_c += (gain - loss) * dt;
    }

    fn entry_covered(&self) -> bool {
        let p = &self.params;
        let travel = self.conveyor_mm - p.gap_mm;
        if travel < 0.0 {
            return false;
        }
        let pitch = p.piece_length_mm + p.gap_mm;
        if pitch <= 0.0 {
            return false;
        }
        let index = (travel / pitch).floor();
        if let Some(n) = p.piece_count
            && index >= f64::from(n)
        {
            return false;
        }
        travel - index * pitch < p.piece_length_mm
    }

    fn adc_count(&self) -> u16 {
        let p = &self.params;
        let span = p.temp_max_c - p.temp_min_c;
        if span <= 0.0 {
            return 0;
        }
        let frac = ((self.temp_c - p.temp_min_c) / span).clamp(0.0, 1.0);
        (frac * f64::from(p.adc_max_count)).round() as u16
    }
}

#[inline]
fn output_index(output: Output) -> usize {
    match output {
        Output::FeedChain => 0,
        Output::MillMotor => 1,
        Output::MillValve1 => 2,
        Output::MillValve2 => 3,
        Output::FeederValve => 4,
        Output::GuillotineValve => 5,
        Output::EndTrimmerMotor => 6,
        Output::EdgeTrimmerMotor => 7,
    }
}

/// Backend handed to the control core. Implements all three capabilities.
pub struct SimulatedLine<C: Clock = MonotonicClock> {
    state: Arc<Mutex<SimState>>,
    clock: C,
}

/// Observer/injector for a running `SimulatedLine`; cheap to clone.
#[derive(Clone)]
pub struct SimHandle {
    state: Arc<Mutex<SimState>>,
}

fn lock(state: &Mutex<SimState>) -> MutexGuard<'_, SimState> {
    // A panic while holding the lock leaves plain data behind; keep using it.
    state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl SimulatedLine<MonotonicClock> {
    pub fn new(params: SimParams) -> Self {
        Self::with_clock(params, MonotonicClock::new())
    }
}

impl<C: Clock> SimulatedLine<C> {
    pub fn with_clock(params: SimParams, clock: C) -> Self {
        tracing::debug!(
            piece_length_mm = params.piece_length_mm,
            gap_mm = params.gap_mm,
            "simulated line created"
        );
        Self {
            state: Arc::new(Mutex::new(SimState::new(params))),
            clock,
        }
    }

    pub fn handle(&self) -> SimHandle {
        SimHandle {
            state: Arc::clone(&self.state),
        }
    }

    fn sync(&self) -> MutexGuard<'_, SimState> {
        let now = self.clock.now();
        let mut st = lock(&self.state);
        st.integrate(now);
        st
    }
}

impl SimHandle {
    /// Open (`true`) or re-close (`false`) the infeed stop circuit.
    pub fn trip_entry_stop(&self, open: bool) {
        lock(&self.state).stop_entry_closed = !open;
    }

    /// Open (`true`) or re-close (`false`) the outfeed stop circuit.
    pub fn trip_exit_stop(&self, open: bool) {
        lock(&self.state).stop_exit_closed = !open;
    }

    pub fn set_home_level(&self, level: bool) {
        lock(&self.state).params.home_level = level;
    }

    pub fn output(&self, output: Output) -> bool {
        lock(&self.state).outputs[output_index(output)]
    }

    pub fn duty(&self) -> f64 {
        lock(&self.state).duty_pct
    }

    pub fn temperature(&self) -> f64 {
        lock(&self.state).temp_c
    }

    pub fn conveyor_mm(&self) -> f64 {
        lock(&self.state).conveyor_mm
    }
}

impl<C: Clock> DigitalIo for SimulatedLine<C> {
    fn read_digital(
        &mut self,
        input: Input,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let st = self.sync();
        Ok(match input {
            // Pulled up: low while covered.
            Input::EntrySensor => !st.entry_covered(),
            Input::StopEntry => st.stop_entry_closed,
            Input::StopExit => st.stop_exit_closed,
            Input::EndTrimmerHome => st.params.home_level,
        })
    }

    fn write_digital(
        &mut self,
        output: Output,
        level: bool,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut st = self.sync();
        st.outputs[output_index(output)] = level;
        Ok(())
    }
}

impl<C: Clock> AnalogIn for SimulatedLine<C> {
    fn read_channel(
        &mut self,
        channel: u8,
    ) -> Result<u16, Box<dyn std::error::Error + Send + Sync>> {
        if channel >= ANALOG_CHANNELS {
            return Err(Box::new(HwError::InvalidChannel(channel)));
        }
        let st = self.sync();
        let count = st.adc_count();
        tracing::trace!(channel, count, temp_c = st.temp_c, "sim adc sample");
        Ok(count)
    }
}

impl<C: Clock> PwmOutput for SimulatedLine<C> {
    fn set_duty(&mut self, percent: f32) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut st = self.sync();
        st.duty_pct = f64::from(percent).clamp(0.0, 100.0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bander_traits::clock::test_clock::TestClock;
    use rstest::rstest;

    fn line(params: SimParams) -> (SimulatedLine<TestClock>, TestClock) {
        let clock = TestClock::new();
        (SimulatedLine::with_clock(params, clock.clone()), clock)
    }

    #[test]
    fn entry_sensor_stays_clear_while_chain_is_off() {
        let (mut sim, clock) = line(SimParams {
            gap_mm: 100.0,
            ..SimParams::default()
        });
        assert!(sim.read_digital(Input::EntrySensor).unwrap());
        clock.advance_ms(5_000);
        assert!(sim.read_digital(Input::EntrySensor).unwrap());
        assert_eq!(sim.handle().conveyor_mm(), 0.0);
    }

    // 100 mm/s, 200 mm pieces every 300 mm after a 100 mm lead: covered on
    // [100, 300), [400, 600), ...
    #[rstest]
    #[case(500, true)]
    #[case(1_500, false)]
    #[case(2_900, false)]
    #[case(3_500, true)]
    #[case(4_500, false)]
    fn entry_sensor_follows_the_piece_train(#[case] run_ms: u64, #[case] clear: bool) {
        let (mut sim, clock) = line(SimParams {
            feed_speed_mm_s: 100.0,
            piece_length_mm: 200.0,
            gap_mm: 100.0,
            ..SimParams::default()
        });
        sim.write_digital(Output::FeedChain, true).unwrap();
        clock.advance_ms(run_ms);
        assert_eq!(sim.read_digital(Input::EntrySensor).unwrap(), clear);
    }

    #[test]
    fn default_train_leaves_room_for_egress() {
        let p = SimParams::default();
        // Reference line: 900 mm long with a 300 mm egress margin.
        assert!(p.gap_mm > 900.0 + 300.0);
    }

    #[test]
    fn piece_count_limits_train() {
        let params = SimParams {
            feed_speed_mm_s: 100.0,
            piece_length_mm: 100.0,
            gap_mm: 100.0,
            piece_count: Some(1),
            ..SimParams::default()
        };
        let (mut sim, clock) = line(params);
        sim.write_digital(Output::FeedChain, true).unwrap();
        sim.read_digital(Input::EntrySensor).unwrap();
        clock.advance_ms(3_500); // second piece would cover the sensor here
        assert!(sim.read_digital(Input::EntrySensor).unwrap());
    }

    #[test]
    fn heater_warms_with_duty_and_adc_tracks_it() {
        let (mut sim, clock) = line(SimParams::default());
        let cold = sim.read_channel(0).unwrap();
        sim.set_duty(100.0).unwrap();
        clock.advance_ms(10_000);
        let warm = sim.read_channel(0).unwrap();
        assert!(warm > cold, "{warm} <= {cold}");
        assert!(sim.handle().temperature() > 20.0);
    }

    #[test]
    fn invalid_channel_is_an_error() {
        let (mut sim, _clock) = line(SimParams::default());
        let err = sim.read_channel(8).unwrap_err();
        assert!(err.to_string().contains("invalid analog channel 8"));
    }

    #[rstest]
    #[case(Input::StopEntry)]
    #[case(Input::StopExit)]
    fn handle_injects_stop_trip(#[case] circuit: Input) {
        let (mut sim, _clock) = line(SimParams::default());
        let h = sim.handle();
        let trip = |open: bool| match circuit {
            Input::StopEntry => h.trip_entry_stop(open),
            _ => h.trip_exit_stop(open),
        };
        assert!(sim.read_digital(circuit).unwrap());
        trip(true);
        assert!(!sim.read_digital(circuit).unwrap());
        trip(false);
        assert!(sim.read_digital(circuit).unwrap());
    }
}
