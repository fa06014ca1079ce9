//! Raspberry Pi backend: rppal GPIO with pull-up inputs, low-initialised
//! outputs, software PWM on the heater SSR and an MCP3008 for temperature.
use rppal::gpio::{Gpio, InputPin, OutputPin};

use bander_traits::{AnalogIn, DigitalIo, Input, Output, PwmOutput};

use crate::error::{HwError, Result};
use crate::mcp3008::Mcp3008;
use crate::PinMap;

fn gpio_err(e: rppal::gpio::Error) -> HwError {
    HwError::Gpio(e.to_string())
}

pub struct RpiLine {
    entry_sensor: InputPin,
    stop_entry: InputPin,
    stop_exit: InputPin,
    end_trimmer_home: Option<InputPin>,
    outputs: Vec<(Output, OutputPin)>,
    heater_ssr: OutputPin,
    pwm_hz: f64,
    adc: Mcp3008,
}

impl RpiLine {
    pub fn open(pins: &PinMap, pwm_hz: f64) -> Result<Self> {
        let gpio = Gpio::new().map_err(gpio_err)?;
        let input = |pin: u8| -> Result<InputPin> {
            Ok(gpio.get(pin).map_err(gpio_err)?.into_input_pullup())
        };
        let output = |pin: u8| -> Result<OutputPin> {
            Ok(gpio.get(pin).map_err(gpio_err)?.into_output_low())
        };

        let outputs = vec![
            (Output::FeedChain, output(pins.feed_chain)?),
            (Output::MillMotor, output(pins.mill_motor)?),
            (Output::MillValve1, output(pins.mill_valve_1)?),
            (Output::MillValve2, output(pins.mill_valve_2)?),
            (Output::FeederValve, output(pins.feeder_valve)?),
            (Output::GuillotineValve, output(pins.guillotine_valve)?),
            (Output::EndTrimmerMotor, output(pins.end_trimmer_motor)?),
            (Output::EdgeTrimmerMotor, output(pins.edge_trimmer_motor)?),
        ];
        let adc = Mcp3008::new(
            output(pins.spi_clk)?,
            output(pins.spi_mosi)?,
            gpio.get(pins.spi_miso).map_err(gpio_err)?.into_input(),
            output(pins.spi_cs)?,
        );
        let end_trimmer_home = match pins.end_trimmer_home {
            Some(p) => Some(input(p)?),
            None => None,
        };

        tracing::info!(
            entry = pins.entry_sensor,
            stop_entry = pins.stop_entry,
            stop_exit = pins.stop_exit,
            "gpio initialised"
        );
        Ok(Self {
            entry_sensor: input(pins.entry_sensor)?,
            stop_entry: input(pins.stop_entry)?,
            stop_exit: input(pins.stop_exit)?,
            end_trimmer_home,
            outputs,
            heater_ssr: output(pins.heater_ssr)?,
            pwm_hz,
            adc,
        })
    }
}

impl DigitalIo for RpiLine {
    fn read_digital(
        &mut self,
        input: Input,
    ) -> std::result::Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let pin = match input {
            Input::EntrySensor => &self.entry_sensor,
            Input::StopEntry => &self.stop_entry,
            Input::StopExit => &self.stop_exit,
            Input::EndTrimmerHome => self
                .end_trimmer_home
                .as_ref()
                .ok_or(HwError::Unwired("end_trimmer_home"))?,
        };
        Ok(pin.is_high())
    }

    fn write_digital(
        &mut self,
        output: Output,
        level: bool,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if let Some((_, pin)) = self.outputs.iter_mut().find(|(o, _)| *o == output) {
            if level {
                pin.set_high();
            } else {
                pin.set_low();
            }
        }
        Ok(())
    }
}

impl AnalogIn for RpiLine {
    fn read_channel(
        &mut self,
        channel: u8,
    ) -> std::result::Result<u16, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.adc.read(channel)?)
    }
}

impl PwmOutput for RpiLine {
    fn set_duty(
        &mut self,
        percent: f32,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let duty = f64::from(percent).clamp(0.0, 100.0) / 100.0;
        if duty <= 0.0 {
            self.heater_ssr.clear_pwm().map_err(gpio_err)?;
            self.heater_ssr.set_low();
        } else {
            self.heater_ssr
                .set_pwm_frequency(self.pwm_hz, duty)
                .map_err(gpio_err)?;
        }
        Ok(())
    }
}

impl Drop for RpiLine {
    fn drop(&mut self) {
        for (_, pin) in &mut self.outputs {
            pin.set_low();
        }
        let _ = self.heater_ssr.clear_pwm();
        self.heater_ssr.set_low();
    }
}
