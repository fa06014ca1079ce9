pub mod error;
#[cfg(feature = "hardware")]
pub mod mcp3008;
#[cfg(feature = "hardware")]
pub mod rpi;
pub mod sim;

pub use error::HwError;
pub use sim::{SimHandle, SimParams, SimulatedLine};

/// BCM pin assignment for the Raspberry Pi backend.
#[derive(Debug, Clone)]
pub struct PinMap {
    pub entry_sensor: u8,
    pub stop_entry: u8,
    pub stop_exit: u8,
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
