//! Backend selection: the simulated line, or the Raspberry Pi when built with
//! `--features hardware` and not told otherwise.

use bander_config::Config;
use bander_hardware::{SimParams, SimulatedLine};
use bander_traits::LineIo;

use crate::cli::SimOpts;

pub type BoxedLine = Box<dyn LineIo + Send>;

pub fn sim_params(cfg: &Config, opts: &SimOpts) -> SimParams {
    SimParams {
        feed_speed_mm_s: cfg.line.feed_speed_mm_s(),
        piece_length_mm: opts.sim_piece_mm,
        gap_mm: opts.sim_gap_mm,
        piece_count: opts.sim_pieces,
        start_temp_c: opts.sim_start_temp,
        temp_min_c: cfg.heating.temp_min_c,
        temp_max_c: cfg.heating.temp_max_c,
        adc_max_count: cfg.heating.adc_max_count,
        home_level: cfg.features.home_confirmed_level.unwrap_or(true),
        ..SimParams::default()
    }
}

/// Open the line backend. Returns the backend and a short name for reports.
pub fn open(cfg: &Config, opts: &SimOpts) -> eyre::Result<(BoxedLine, &'static str)> {
    #[cfg(feature = "hardware")]
    if !opts.sim {
        use eyre::WrapErr;
        let pins = pin_map(cfg);
        let line: BoxedLine = Box::new(
            bander_hardware::rpi::RpiLine::open(&pins, cfg.heating.pwm_hz)
                .wrap_err("open line GPIO")?,
        );
        return Ok((line, "rpi"));
    }

    let params = sim_params(cfg, opts);
    tracing::info!(
        piece_mm = params.piece_length_mm,
        gap_mm = params.gap_mm,
        "using simulated line"
    );
    let line: BoxedLine = Box::new(SimulatedLine::new(params));
    Ok((line, "sim"))
}

#[cfg(feature = "hardware")]
fn pin_map(cfg: &Config) -> bander_hardware::PinMap {
    let p = &cfg.pins;
    bander_hardware::PinMap {
        entry_sensor: p.entry_sensor,
        stop_entry: p.stop_entry,
        stop_exit: p.stop_exit,
        end_trimmer_home: if cfg.features.end_trimmer_home_check {
            p.end_trimmer_home
        } else {
            None
        },
        spi_clk: p.spi_clk,
        spi_miso: p.spi_miso,
        spi_mosi: p.spi_mosi,
        spi_cs: p.spi_cs,
        feed_chain: p.feed_chain,
        mill_motor: p.mill_motor,
        mill_valve_1: p.mill_valve_1,
        mill_valve_2: p.mill_valve_2,
        heater_ssr: p.heater_ssr,
        feeder_valve: p.feeder_valve,
        guillotine_valve: p.guillotine_valve,
        end_trimmer_motor: p.end_trimmer_motor,
        edge_trimmer_motor: p.edge_trimmer_motor,
    }
}
