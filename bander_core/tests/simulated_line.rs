use std::sync::atomic::AtomicBool;

use bander_core::{
    Command, CommandHandler, ControlCycle, CycleCfg, RunnerCfg, SharedState, SnapshotHub, Zone,
    run_loop,
};
use bander_hardware::{SimParams, SimulatedLine};
use bander_traits::Output;
use bander_traits::clock::test_clock::TestClock;

#[test]
fn one_piece_travels_the_whole_line() {
    let clock = TestClock::new();
    let cfg = CycleCfg::default();
    let sim = SimulatedLine::with_clock(
        SimParams {
            feed_speed_mm_s: cfg.line.feed_speed_mm_s,
            piece_length_mm: 600.0,
            gap_mm: 500.0,
            piece_count: Some(1),
            ..SimParams::default()
        },
        clock.clone(),
    );
    let handle = sim.handle();
    let state = SharedState::new();
    let step_mm = cfg.line.step_mm();
    let mut cycle = ControlCycle::new(sim, cfg, state.clone()).with_clock(clock.clone());
    cycle.prime().unwrap();

    let cmd = CommandHandler::new(state.clone());
    assert!(cmd.apply(Command::SetRun(true)).is_ack());
    for z in [
        Zone::Heating,
        Zone::FeedChain,
        Zone::Mill,
        Zone::Feeder,
        Zone::EndTrimmer,
        Zone::EdgeTrimmer,
    ] {
        assert!(cmd.apply(Command::SetZoneEnable(z, true)).is_ack());
    }

    let hub = SnapshotHub::new();
    let rx = hub.subscribe(1000);
    let cfg = RunnerCfg {
        publish_every: 1,
        max_cycles: Some(340),
    };
    let stats = run_loop(&mut cycle, &hub, cfg, &AtomicBool::new(false));
    assert_eq!(stats.cycles, 340);
    assert_eq!(stats.io_faults, 0);

    let snaps: Vec<_> = rx.try_iter().collect();
    assert_eq!(snaps.len(), 340);
    let max_len = snaps
        .iter()
        .map(|s| s.piece_length_mm)
        .fold(0.0_f64, f64::max);
    assert!(
        (max_len - 600.0).abs() <= 2.0 * step_mm,
        "measured {max_len} mm"
    );
    assert!(snaps.iter().any(|s| s.actual.feeder_valve));
    assert!(snaps.iter().any(|s| s.actual.guillotine_valve));
    assert!(snaps.iter().any(|s| s.actual.mill_valve_1));
    assert!(snaps.iter().any(|s| s.actual.mill_valve_2));
    assert!(snaps.iter().any(|s| s.end_trimmer_mid_stroke));
    assert!(snaps.iter().any(|s| s.tracking_active));

    let last = snaps.last().unwrap();
    assert!(!last.tracking_active, "piece egressed");
    assert!(last.temperature_actual > 20.0, "heater warmed the roller");
    assert!(last.heater_duty_pct > 0.0);

    // Loop exit drives everything low.
    for o in Output::ALL {
        assert!(!handle.output(o), "{o:?} left on");
    }
    assert_eq!(handle.duty(), 0.0);
}

#[test]
fn injected_stop_trip_latches_emergency() {
    let clock = TestClock::new();
    let sim = SimulatedLine::with_clock(SimParams::default(), clock.clone());
    let handle = sim.handle();
    let state = SharedState::new();
    let mut cycle =
        ControlCycle::new(sim, CycleCfg::default(), state.clone()).with_clock(clock.clone());
    cycle.prime().unwrap();
    let cmd = CommandHandler::new(state.clone());
    assert!(cmd.apply(Command::SetRun(true)).is_ack());
    assert!(cmd.apply(Command::SetZoneEnable(Zone::FeedChain, true)).is_ack());
    cycle.step().unwrap();
    assert!(handle.output(Output::FeedChain));

    handle.trip_exit_stop(true);
    cycle.step().unwrap();
    assert!(state.emergency());
    assert!(!handle.output(Output::FeedChain));
    let travelled = handle.conveyor_mm();
    clock.advance_ms(500);
    cycle.step().unwrap();
    assert_eq!(handle.conveyor_mm(), travelled);
}

#[test]
fn default_train_clears_each_piece_before_the_next() {
    let clock = TestClock::new();
    let cfg = CycleCfg::default();
    let sim = SimulatedLine::with_clock(
        SimParams {
            feed_speed_mm_s: cfg.line.feed_speed_mm_s,
            ..SimParams::default()
        },
        clock.clone(),
    );
    let state = SharedState::new();
    let mut cycle = ControlCycle::new(sim, cfg, state.clone()).with_clock(clock.clone());
    cycle.prime().unwrap();
    let cmd = CommandHandler::new(state.clone());
    assert!(cmd.apply(Command::SetRun(true)).is_ack());
    for z in [Zone::FeedChain, Zone::Mill, Zone::Feeder, Zone::EndTrimmer] {
        assert!(cmd.apply(Command::SetZoneEnable(z, true)).is_ack());
    }

    let hub = SnapshotHub::new();
    let rx = hub.subscribe(1000);
    let cfg = RunnerCfg {
        publish_every: 1,
        max_cycles: Some(480),
    };
    run_loop(&mut cycle, &hub, cfg, &AtomicBool::new(false));
    let snaps: Vec<_> = rx.try_iter().collect();

    assert!(snaps.iter().any(|s| s.actual.guillotine_valve));
    // busy -> idle (egress) -> busy again (second piece)
    let first = snaps.iter().position(|s| s.tracking_active).expect("first piece");
    let idle = first
        + snaps[first..]
            .iter()
            .position(|s| !s.tracking_active)
            .expect("first piece egressed");
    assert!(!snaps[idle].machine_busy);
    assert!(
        snaps[idle..].iter().any(|s| s.tracking_active),
        "second piece arrived"
    );
}
