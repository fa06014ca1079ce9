#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
mod cli;
mod error_fmt;
mod line;
mod logging;
mod run;

use clap::Parser;
use eyre::WrapErr;

use crate::cli::{Cli, Commands, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = real_main(&cli) {
        tracing::error!(error = %format!("{e:#}"), "bander exited with an error");
        if cli.json {
            println!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}

fn real_main(cli: &Cli) -> eyre::Result<()> {
    color_eyre::install()?;

    let text = std::fs::read_to_string(&cli.config)
        .wrap_err_with(|| format!("read config {}", cli.config.display()))?;
    let cfg = bander_config::load_toml(&text)?;

    // logging.level applies unless --log-level moved off its default.
    let level = match (&cfg.logging.level, cli.log_level.as_str()) {
        (Some(lvl), "info") => lvl.as_str(),
        _ => cli.log_level.as_str(),
    };
    logging::init(cli.json, level, &cfg.logging)?;
    cfg.validate().wrap_err("invalid configuration")?;
    tracing::debug!(config = %cli.config.display(), "config loaded");

    match &cli.cmd {
        Commands::Run { cycles, stats, sim } => run::run(
            &cfg,
            &run::RunArgs {
                cycles: *cycles,
                stats: *stats,
            },
            sim,
        ),
        Commands::SelfCheck { sim } => run::self_check(&cfg, sim),
    }
}
