//! Capability traits between the control core and the machine hardware.
//!
//! The core never touches GPIO directly: it reads inputs, writes outputs,
//! samples the temperature channel and sets the heater duty through these
//! traits. Backends live in `bander_hardware`.
pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// Number of single-ended channels on the temperature ADC.
pub const ANALOG_CHANNELS: u8 = 8;

/// Digital inputs wired to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Input {
    /// Entry photo/limit sensor, pulled up: low while a piece covers it.
    EntrySensor,
    /// Normally-closed stop circuit at the infeed: high when healthy.
    StopEntry,
    /// Normally-closed stop circuit at the outfeed: high when healthy.
    StopExit,
    /// Optional end-trimmer home confirmation sensor.
    EndTrimmerHome,
}

/// Digital outputs (contactors and solenoid valves).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Output {
    FeedChain,
    MillMotor,
    MillValve1,
    MillValve2,
    FeederValve,
    GuillotineValve,
    EndTrimmerMotor,
    EdgeTrimmerMotor,
}

impl Output {
    /// Every digital output, in wiring order.
    pub const ALL: [Output; 8] = [
        Output::FeedChain,
        Output::MillMotor,
        Output::MillValve1,
        Output::MillValve2,
        Output::FeederValve,
        Output::GuillotineValve,
        Output::EndTrimmerMotor,
        Output::EdgeTrimmerMotor,
    ];
}

pub trait DigitalIo {
    fn read_digital(
        &mut self,
        input: Input,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;
    fn write_digital(
        &mut self,
        output: Output,
        level: bool,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

pub trait AnalogIn {
    /// Sample one channel (0..ANALOG_CHANNELS) and return the 10-bit count.
    fn read_channel(&mut self, channel: u8)
    -> Result<u16, Box<dyn std::error::Error + Send + Sync>>;
}

pub trait PwmOutput {
    /// Set the heater duty cycle in percent (0.0..=100.0).
    fn set_duty(&mut self, percent: f32) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

impl<T: DigitalIo + ?Sized> DigitalIo for Box<T> {
    fn read_digital(
        &mut self,
        input: Input,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        (**self).read_digital(input)
    }

    fn write_digital(
        &mut self,
        output: Output,
        level: bool,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).write_digital(output, level)
    }
}

impl<T: AnalogIn + ?Sized> AnalogIn for Box<T> {
    fn read_channel(
        &mut self,
        channel: u8,
    ) -> Result<u16, Box<dyn std::error::Error + Send + Sync>> {
        (**self).read_channel(channel)
    }
}

impl<T: PwmOutput + ?Sized> PwmOutput for Box<T> {
    fn set_duty(&mut self, percent: f32) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).set_duty(percent)
    }
}

/// A complete line backend: digital I/O, the temperature ADC and the heater PWM.
pub trait LineIo: DigitalIo + AnalogIn + PwmOutput {}

impl<T: DigitalIo + AnalogIn + PwmOutput + ?Sized> LineIo for T {}
