use rppal::gpio::{InputPin, OutputPin};
use tracing::trace;

use crate::error::{HwError, Result};

/// Bit-banged MCP3008 (8-channel, 10-bit SAR ADC) on four GPIO lines.
pub struct Mcp3008 {
    clk: OutputPin,
    mosi: OutputPin,
    miso: InputPin,
    cs: OutputPin,
}

impl Mcp3008 {
    pub fn new(mut clk: OutputPin, mut mosi: OutputPin, miso: InputPin, mut cs: OutputPin) -> Self {
        cs.set_high(); // deselected
        clk.set_low();
        mosi.set_low();
        Self {
            clk,
            mosi,
            miso,
            cs,
        }
    }

    /// Single-ended conversion on `channel` (0..=7).
    pub fn read(&mut self, channel: u8) -> Result<u16> {
        if channel > 7 {
            return Err(HwError::InvalidChannel(channel));
        }

        self.cs.set_high();
        self.clk.set_low();
        self.cs.set_low(); // chip select is active low

        // start bit + single-ended + 3 channel bits, MSB first
        let mut command = (channel | 0x18) << 3;
        for _ in 0..5 {
            if command & 0x80 != 0 {
                self.mosi.set_high();
            } else {
                self.mosi.set_low();
            }
            command <<= 1;
            self.pulse_clock();
        }

        // null bit, 10 data bits, trailing bit
        let mut value: u16 = 0;
        for _ in 0..12 {
            self.pulse_clock();
            value = (value << 1) | u16::from(self.miso.is_high());
        }
        self.cs.set_high();

        let count = (value >> 1) & 0x3FF;
        trace!(channel, count, "mcp3008 sample");
        Ok(count)
    }

    #[inline]
    fn pulse_clock(&mut self) {
        self.clk.set_high();
        std::hint::spin_loop();
        self.clk.set_low();
        std::hint::spin_loop();
    }
}
