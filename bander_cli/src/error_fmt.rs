//! Human-readable error descriptions and structured JSON error formatting.

use bander_core::BanderError;

/// Stable process exit codes.
pub mod exit {
    pub const GENERIC: i32 = 1;
    pub const CONFIG: i32 = 3;
    pub const HARDWARE: i32 = 4;
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BanderError>() {
        return match be {
            BanderError::InvalidChannel(ch) => format!(
                "What happened: Analog channel {ch} does not exist on the temperature ADC.\nLikely causes: heating.analog_channel set outside 0..=7.\nHow to fix: Set heating.analog_channel to the MCP3008 input the thermocouple amplifier is wired to."
            ),
            BanderError::Config(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun `bander self-check`."
            ),
            BanderError::Hardware(msg) | BanderError::HardwareFault(msg) => format!(
                "What happened: Line I/O failed ({msg}).\nLikely causes: Loose wiring, missing power on the I/O board, or insufficient GPIO permissions.\nHow to fix: Check the [pins] section and the wiring, then run `bander self-check`."
            ),
        };
    }

    if let Some(te) = err.downcast_ref::<toml::de::Error>() {
        return format!(
            "What happened: The config file is not valid TOML ({}).\nLikely causes: A typo, a value of the wrong type, or an unknown section.\nHow to fix: Compare against etc/bander_config.toml.",
            te.message()
        );
    }

    // String-based heuristics for errors coming from init or config
    let msg = format!("{err:#}");
    let lower = msg.to_ascii_lowercase();

    if lower.contains("read config") {
        return format!(
            "What happened: The config file could not be read.\nLikely causes: Wrong --config path or missing permissions.\nHow to fix: Pass --config <FILE> pointing at a readable TOML file. Original: {msg}"
        );
    }

    if lower.contains("open line gpio") || lower.contains("gpio") {
        return "What happened: Failed to initialize the line's GPIO.\nLikely causes: Incorrect pin numbers or insufficient GPIO permissions.\nHow to fix: Fix the [pins] values in the config; ensure the process can access /dev/gpiomem.".to_string();
    }

    if lower.contains("must be") || lower.contains("requires") || lower.contains("share gpio") {
        return format!(
            "What happened: Configuration is invalid ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun `bander self-check`."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

fn classify(err: &eyre::Report) -> (&'static str, i32) {
    if let Some(be) = err.downcast_ref::<BanderError>() {
        return match be {
            BanderError::InvalidChannel(_) | BanderError::Config(_) => ("Config", exit::CONFIG),
            BanderError::Hardware(_) | BanderError::HardwareFault(_) => {
                ("Hardware", exit::HARDWARE)
            }
        };
    }
    if err.downcast_ref::<toml::de::Error>().is_some() {
        return ("Config", exit::CONFIG);
    }
    let lower = format!("{err:#}").to_ascii_lowercase();
    if lower.contains("read config")
        || lower.contains("must be")
        || lower.contains("requires")
        || lower.contains("share gpio")
    {
        return ("Config", exit::CONFIG);
    }
    if lower.contains("gpio") {
        return ("Hardware", exit::HARDWARE);
    }
    ("Error", exit::GENERIC)
}

/// Config problems exit with 3, hardware with 4, everything else with 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    classify(err).1
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    let (reason, _) = classify(err);
    serde_json::json!({ "reason": reason, "message": humanize(err) }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyre::WrapErr;
    use rstest::rstest;

    #[rstest]
    #[case(eyre::Report::new(BanderError::InvalidChannel(9)), 3, "Analog channel 9")]
    #[case(eyre::Report::new(BanderError::Hardware("spi".into())), 4, "Line I/O failed")]
    #[case(eyre::Report::new(BanderError::HardwareFault("gpio 5".into())), 4, "Line I/O failed")]
    #[case(eyre::Report::new(BanderError::Config("pid gains".into())), 3, "pid gains")]
    #[case(eyre::eyre!("line.cycle_ms must be >= 1"), 3, "Configuration is invalid")]
    #[case(eyre::eyre!("boom"), 1, "Something went wrong")]
    fn maps_errors_to_codes_and_text(
        #[case] err: eyre::Report,
        #[case] code: i32,
        #[case] needle: &str,
    ) {
        assert_eq!(exit_code_for_error(&err), code);
        assert!(humanize(&err).contains(needle), "{}", humanize(&err));
    }

    #[test]
    fn wrapped_typed_error_still_classifies() {
        let err: eyre::Result<()> = Err(BanderError::Config("bad".into())).wrap_err("convert");
        let err = err.unwrap_err();
        // wrap_err keeps the typed error reachable through the chain
        assert!(format_error_json(&err).contains("\"reason\":\"Config\""));
    }
}
