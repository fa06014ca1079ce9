//! In-memory line backend for tests and benches.
//!
//! `FakeLine` is a cheap handle: clone it before handing one copy to the
//! control cycle and keep the other to inject inputs and inspect outputs.
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bander_traits::{AnalogIn, DigitalIo, Input, Output, PwmOutput};

#[derive(Debug)]
struct Inner {
    entry_covered: bool,
    stop_entry_closed: bool,
    stop_exit_closed: bool,
    home: bool,
    adc: u16,
    outputs: HashMap<Output, bool>,
    duty: Option<f64>,
    fail_reads: bool,
    fail_writes: bool,
}

#[derive(Debug, Clone)]
pub struct FakeLine {
    inner: Arc<Mutex<Inner>>,
}

impl Default for FakeLine {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeLine {
    /// Healthy stop circuits, no piece, ADC at zero.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                entry_covered: false,
                stop_entry_closed: true,
                stop_exit_closed: true,
                home: true,
                adc: 0,
                outputs: HashMap::new(),
                duty: None,
                fail_reads: false,
                fail_writes: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_entry_covered(&self, covered: bool) {
        self.lock().entry_covered = covered;
    }

    pub fn set_stops(&self, entry_closed: bool, exit_closed: bool) {
        let mut g = self.lock();
        g.stop_entry_closed = entry_closed;
        g.stop_exit_closed = exit_closed;
    }

    pub fn set_home(&self, level: bool) {
        self.lock().home = level;
    }

    pub fn set_adc(&self, count: u16) {
        self.lock().adc = count;
    }

    pub fn fail_reads(&self, fail: bool) {
        self.lock().fail_reads = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Last level written to `output`, if any.
    pub fn output(&self, output: Output) -> Option<bool> {
        self.lock().outputs.get(&output).copied()
    }

    pub fn duty(&self) -> Option<f64> {
        self.lock().duty
    }

    pub fn any_output_on(&self) -> bool {
        self.lock().outputs.values().any(|&v| v)
    }
}

fn io_error(what: &str) -> Box<dyn std::error::Error + Send + Sync> {
    Box::new(std::io::Error::other(format!("fake line: {what} failed")))
}

impl DigitalIo for FakeLine {
    fn read_digital(
        &mut self,
        input: Input,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let g = self.lock();
        if g.fail_reads {
            return Err(io_error("read"));
        }
        Ok(match input {
            Input::EntrySensor => !g.entry_covered,
            Input::StopEntry => g.stop_entry_closed,
            Input::StopExit => g.stop_exit_closed,
            Input::EndTrimmerHome => g.home,
        })
    }

    fn write_digital(
        &mut self,
        output: Output,
        level: bool,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut g = self.lock();
        if g.fail_writes {
            return Err(io_error("write"));
        }
        g.outputs.insert(output, level);
        Ok(())
    }
}

impl AnalogIn for FakeLine {
    fn read_channel(
        &mut self,
        channel: u8,
    ) -> Result<u16, Box<dyn std::error::Error + Send + Sync>> {
        let g = self.lock();
        if g.fail_reads {
            return Err(io_error("adc read"));
        }
        if channel >= bander_traits::ANALOG_CHANNELS {
            return Err(io_error("adc channel"));
        }
        Ok(g.adc)
    }
}

impl PwmOutput for FakeLine {
    fn set_duty(&mut self, percent: f32) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut g = self.lock();
        if g.fail_writes {
            return Err(io_error("pwm"));
        }
        g.duty = Some(f64::from(percent));
        Ok(())
    }
}
