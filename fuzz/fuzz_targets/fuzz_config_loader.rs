#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Arbitrary text must be rejected with an error, never a panic, at every
    // stage a config goes through before the line starts.
    let Ok(cfg) = bander_config::load_toml(data) else {
        return;
    };
    if cfg.validate().is_err() {
        return;
    }
    let _ = bander_core::CycleCfg::try_from(&cfg);
});
