use bander_config::load_toml;
use rstest::rstest;

fn assert_rejected(toml: &str, needle: &str) {
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("config should be rejected");
    let msg = format!("{err}").to_lowercase();
    assert!(msg.contains(needle), "expected '{needle}' in '{msg}'");
}

#[test]
fn rejects_analog_channel_out_of_range() {
    assert_rejected(
        r#"
[heating]
analog_channel = 8
"#,
        "heating.analog_channel must be in 0..=7",
    );
}

#[rstest]
#[case(0)]
#[case(3)]
#[case(7)]
fn accepts_every_adc_channel(#[case] ch: u8) {
    let cfg = load_toml(&format!("[heating]\nanalog_channel = {ch}\n")).expect("parse TOML");
    cfg.validate().expect("channel within range");
}

#[rstest]
#[case("[line]\ncycle_ms = 0\n", "line.cycle_ms must be >= 1")]
#[case("[line]\nfeed_speed_m_min = 0.0\n", "line.feed_speed_m_min must be > 0")]
#[case("[zones]\nfeeder_pulse_ms = 0\n", "zones.feeder_pulse_ms must be >= 1")]
#[case("[zones]\nguillotine_pulse_ms = 0\n", "zones.guillotine_pulse_ms must be >= 1")]
#[case("[heating]\ntemp_min_c = 300.0\n", "temp_max_c must be greater")]
#[case("[heating]\nadc_max_count = 4095\n", "adc_max_count must be in 1..=1023")]
#[case("[heating]\nkp = -1.0\n", "heating.kp must be >= 0")]
#[case("[publish]\nevery_n_cycles = 0\n", "every_n_cycles must be >= 1")]
#[case("[pins]\nmill_valve_2 = 12\n", "share gpio 12")]
fn rejects_invalid_values(#[case] toml: &str, #[case] needle: &str) {
    assert_rejected(toml, needle);
}

#[test]
fn home_check_requires_pin_and_level() {
    assert_rejected(
        r#"
[features]
end_trimmer_home_check = true
home_confirmed_level = true
"#,
        "requires pins.end_trimmer_home",
    );
    assert_rejected(
        r#"
[pins]
end_trimmer_home = 17

[features]
end_trimmer_home_check = true
"#,
        "requires features.home_confirmed_level",
    );
}

#[test]
fn accepts_full_reference_config() {
    let toml = r#"
[pins]
entry_sensor = 4
stop_entry = 27
stop_exit = 22
end_trimmer_home = 17

[line]
feed_speed_m_min = 10.0
cycle_ms = 50
mill_offset_mm = 150.0
feeder_offset_mm = 300.0
guillotine_offset_mm = 450.0
end_trimmer_offset_mm = 600.0
line_length_mm = 900.0
egress_margin_mm = 300.0

[zones]
feeder_pulse_ms = 4000
guillotine_pulse_ms = 1000

[heating]
mode = "pid"
setpoint_c = 190.0
kp = 2.0
ki = 0.1
kd = 0.5

[features]
end_trimmer_home_check = true
home_confirmed_level = true

[logging]
level = "debug"
rotation = "daily"
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    cfg.validate().expect("valid config should pass");
    assert_eq!(cfg.pins.end_trimmer_home, Some(17));
    assert_eq!(cfg.features.home_confirmed_level, Some(true));
}

#[test]
fn unknown_heating_mode_is_a_parse_error() {
    assert!(load_toml("[heating]\nmode = \"bang_bang\"\n").is_err());
}

#[test]
fn shipped_reference_config_is_valid() {
    let text = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/../etc/bander_config.toml"));
    let cfg = load_toml(text).expect("parse shipped config");
    cfg.validate().expect("shipped config validates");
    assert_eq!(cfg.heating.setpoint_c, 190.0);
    assert!(!cfg.features.end_trimmer_home_check);
}
