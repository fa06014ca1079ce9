use bander_core::mocks::FakeLine;
use bander_core::safety::TRIP_MESSAGE;
use bander_core::{
    Command, CommandHandler, CommandOutcome, ControlCycle, CycleCfg, CycleOutcome, Rejection,
    SharedState, Zone,
};
use bander_traits::clock::test_clock::TestClock;
use proptest::prelude::*;
use rstest::rstest;

const ALL_ZONES: [Zone; 6] = [
    Zone::Heating,
    Zone::FeedChain,
    Zone::Mill,
    Zone::Feeder,
    Zone::EndTrimmer,
    Zone::EdgeTrimmer,
];

fn running_line() -> (ControlCycle<FakeLine>, FakeLine, CommandHandler, SharedState) {
    let line = FakeLine::new();
    let state = SharedState::new();
    let mut cycle = ControlCycle::new(line.clone(), CycleCfg::default(), state.clone())
        .with_clock(TestClock::new());
    cycle.prime().unwrap();
    let cmd = CommandHandler::new(state.clone());
    assert!(cmd.apply(Command::SetRun(true)).is_ack());
    for z in ALL_ZONES {
        assert!(cmd.apply(Command::SetZoneEnable(z, true)).is_ack());
    }
    line.set_adc(200);
    (cycle, line, cmd, state)
}

#[rstest]
#[case(false, true)]
#[case(true, false)]
#[case(false, false)]
fn open_stop_circuit_latches_emergency(#[case] entry: bool, #[case] exit: bool) {
    let (mut cycle, line, _cmd, state) = running_line();
    line.set_entry_covered(true);
    for _ in 0..40 {
        cycle.step().unwrap();
    }
    assert!(line.any_output_on());

    line.set_stops(entry, exit);
    assert_eq!(cycle.step().unwrap(), CycleOutcome::Tripped);
    let s = state.snapshot();
    assert!(s.emergency);
    assert!(!s.run_enabled);
    assert!(!s.actual.any());
    assert_eq!(s.heater_duty_pct, 0.0);
    assert!(!s.end_trimmer_mid_stroke);
    assert!(s.error_message.starts_with(TRIP_MESSAGE));
    assert_eq!(s.inputs.stop_entry, entry);
    assert_eq!(s.inputs.stop_exit, exit);
    assert!(!line.any_output_on());
    assert_eq!(line.duty(), Some(0.0));
}

#[test]
fn only_reset_is_accepted_during_emergency() {
    let (mut cycle, line, cmd, state) = running_line();
    line.set_stops(false, true);
    cycle.step().unwrap();
    line.set_stops(true, true);
    cycle.step().unwrap();

    let before = state.snapshot();
    for c in [
        Command::SetRun(true),
        Command::SetRun(false),
        Command::SetZoneEnable(Zone::Mill, false),
    ] {
        assert_eq!(
            cmd.apply(c),
            CommandOutcome::Rejected(Rejection::EmergencyLatched)
        );
    }
    assert_eq!(state.snapshot(), before);

    // Circuits are closed again: still latched until reset.
    assert!(state.emergency());
    assert!(cmd.apply(Command::ResetEmergency).is_ack());
    assert!(!state.emergency());
    assert!(state.error_message().is_empty());
    assert!(!state.run_enabled());
    assert!(cmd.apply(Command::SetRun(true)).is_ack());
}

#[test]
fn reset_while_still_tripped_rereports_the_trip() {
    let (mut cycle, line, cmd, state) = running_line();
    line.set_stops(true, false);
    cycle.step().unwrap();
    match cmd.apply(Command::ResetEmergency) {
        CommandOutcome::Rejected(Rejection::StopCircuitOpen(msg)) => {
            assert!(msg.contains("outfeed"));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(state.emergency());
    assert!(state.error_message().starts_with(TRIP_MESSAGE));
}

#[test]
fn enabling_run_with_open_circuit_is_refused() {
    let line = FakeLine::new();
    let state = SharedState::new();
    let mut cycle = ControlCycle::new(line.clone(), CycleCfg::default(), state.clone());
    line.set_stops(true, false);
    cycle.prime().unwrap();
    assert!(state.emergency(), "tripped at start-up latches");
    let cmd = CommandHandler::new(state.clone());
    assert!(!cmd.apply(Command::SetRun(true)).is_ack());
    assert!(!state.run_enabled());
}

#[test]
fn commands_are_refused_before_the_first_sample() {
    // The mirror starts with both circuits reading open.
    let state = SharedState::new();
    let cmd = CommandHandler::new(state.clone());
    let before = state.snapshot();
    match cmd.apply(Command::SetRun(true)) {
        CommandOutcome::Rejected(Rejection::StopCircuitOpen(msg)) => {
            assert!(msg.starts_with(TRIP_MESSAGE));
            assert!(msg.contains("infeed and outfeed"));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(state.snapshot(), before);
}

#[test]
fn set_run_twice_is_the_same_as_once() {
    let (mut cycle, _line, cmd, state) = running_line();
    cycle.step().unwrap();
    assert!(cmd.apply(Command::SetRun(true)).is_ack());
    let once = state.snapshot();
    assert!(cmd.apply(Command::SetRun(true)).is_ack());
    assert_eq!(state.snapshot(), once);
}

#[test]
fn set_run_clears_a_previous_fault_message() {
    let (mut cycle, line, cmd, state) = running_line();
    line.fail_reads(true);
    let err = cycle.step().unwrap_err();
    cycle.fail_safe(&err);
    assert!(!state.error_message().is_empty());
    line.fail_reads(false);
    cycle.step().unwrap();
    assert!(cmd.apply(Command::SetRun(true)).is_ack());
    assert!(state.error_message().is_empty());
}

proptest! {
    // Whatever the line was doing, an open circuit leaves nothing energized.
    #[test]
    fn trip_always_shuts_everything_down(
        cycles_before in 0usize..120,
        covered_for in 0usize..60,
        adc in 0u16..=1023,
        entry_open in any::<bool>(),
    ) {
        let (mut cycle, line, _cmd, state) = running_line();
        line.set_adc(adc);
        for i in 0..cycles_before {
            line.set_entry_covered(i < covered_for);
            cycle.step().unwrap();
        }
        line.set_stops(!entry_open, entry_open);
        prop_assert_eq!(cycle.step().unwrap(), CycleOutcome::Tripped);
        let s = state.snapshot();
        prop_assert!(s.emergency && !s.run_enabled);
        prop_assert!(!s.actual.any());
        prop_assert_eq!(s.heater_duty_pct, 0.0);
        prop_assert!(!line.any_output_on());
    }
}
