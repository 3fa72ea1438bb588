use qkd_replay::playback::{EngineState, PlaybackConfig, PlaybackEngine, PlaybackError};
use qkd_replay::trace::{Basis, Bit, Role, RoleRecord, Trace, TraceError};
use qkd_replay::ui::{basis_symbol, bit_symbol, ReplayData};

use std::collections::VecDeque;

fn patterned_trace(step_count: usize, with_interceptor: bool) -> Trace {
    let bits: Vec<Bit> = (0..step_count)
        .map(|i| if i % 2 == 0 { Bit::Zero } else { Bit::One })
        .collect();
    let bases: Vec<Basis> = (0..step_count)
        .map(|i| {
            if i % 3 == 0 {
                Basis::Rectilinear
            } else {
                Basis::Diagonal
            }
        })
        .collect();
    let eve = if with_interceptor {
        RoleRecord::measured(bits.clone(), bases.clone())
    } else {
        RoleRecord::absent(step_count)
    };
    let sifted: Vec<Bit> = bits.iter().copied().take(step_count / 2).collect();
    let matching = sifted.len() as u32;
    Trace::new(
        RoleRecord::measured(bits.clone(), bases.clone()),
        eve,
        RoleRecord::measured(bits, bases),
        sifted,
        matching,
        0.0,
    )
    .expect("patterned trace is structurally sound")
}

fn running_engine(step_count: usize, with_interceptor: bool) -> PlaybackEngine {
    let mut engine = PlaybackEngine::new(PlaybackConfig::default());
    engine
        .load(patterned_trace(step_count, with_interceptor))
        .expect("patterned trace loads");
    engine
}

#[test]
fn load_starts_playback_at_step_zero() {
    let engine = running_engine(5, false);
    assert_eq!(engine.state(), EngineState::Running);
    assert_eq!(engine.step_count(), 5);
    assert_eq!(engine.current_step(), 0);
    assert_eq!(engine.step_progress(), 0.0);
    assert!(!engine.loop_banner_visible());
}

#[test]
fn load_rejects_empty_and_mismatched_traces() {
    let mut engine = PlaybackEngine::new(PlaybackConfig::default());

    let empty = Trace::new(
        RoleRecord::absent(0),
        RoleRecord::absent(0),
        RoleRecord::absent(0),
        Vec::new(),
        0,
        0.0,
    )
    .expect("zero-length records are aligned");
    let err = engine
        .load(empty)
        .expect_err("an empty trace is not playable");
    assert_eq!(err, PlaybackError::InvalidTrace(TraceError::Empty));
    assert_eq!(engine.state(), EngineState::Idle, "rejected loads leave the engine idle");

    let mismatched = Trace::new(
        RoleRecord::measured(vec![Bit::Zero, Bit::One], vec![Basis::Rectilinear; 2]),
        RoleRecord::absent(2),
        RoleRecord::measured(vec![Bit::Zero], vec![Basis::Rectilinear]),
        Vec::new(),
        0,
        0.0,
    );
    assert_eq!(
        mismatched.expect_err("bob is one step short"),
        TraceError::LengthMismatch {
            role: Role::Bob,
            sequence: "bits",
            expected: 2,
            actual: 1,
        }
    );
}

#[test]
fn split_ticks_match_one_large_tick() {
    let mut whole = running_engine(3, false);
    let mut chunked = running_engine(3, false);

    whole.tick(2400.0);
    for _ in 0..24 {
        chunked.tick(100.0);
    }
    assert_eq!(whole.current_step(), 1);
    assert_eq!(chunked.current_step(), 1);
    assert_eq!(whole.step_progress(), chunked.step_progress());

    whole.tick(600.0);
    for _ in 0..4 {
        chunked.tick(150.0);
    }
    assert_eq!(whole.current_step(), chunked.current_step());
    assert_eq!(
        whole.elapsed_in_step_ms(),
        chunked.elapsed_in_step_ms(),
        "granularity must not change where the clock lands"
    );
    assert_eq!(whole.step_progress(), 0.25);
}

#[test]
fn pause_freezes_and_resume_continues() {
    let mut engine = running_engine(4, false);
    engine.tick(600.0);
    engine.pause().expect("running playback can pause");
    assert_eq!(engine.state(), EngineState::Paused);

    // Ticks during a pause are swallowed regardless of their size.
    engine.tick(50_000.0);
    assert_eq!(engine.current_step(), 0);
    assert_eq!(engine.step_progress(), 0.25);

    engine.resume().expect("paused playback can resume");
    assert_eq!(engine.state(), EngineState::Running);
    assert_eq!(
        engine.step_progress(),
        0.25,
        "resume picks up where pause left off"
    );

    // The rest of the step takes exactly the un-played remainder.
    engine.tick(1799.0);
    assert_eq!(engine.current_step(), 0);
    engine.tick(1.0);
    assert_eq!(engine.current_step(), 1);
    assert_eq!(engine.step_progress(), 0.0);
}

#[test]
fn operations_outside_their_states_are_rejected() {
    let mut engine = PlaybackEngine::new(PlaybackConfig::default());
    assert_eq!(
        engine.pause().expect_err("nothing to pause while idle"),
        PlaybackError::StateViolation {
            operation: "pause",
            state: EngineState::Idle,
        }
    );
    assert_eq!(
        engine.resume().expect_err("nothing to resume while idle"),
        PlaybackError::StateViolation {
            operation: "resume",
            state: EngineState::Idle,
        }
    );

    engine
        .load(patterned_trace(2, false))
        .expect("patterned trace loads");
    assert_eq!(
        engine
            .load(patterned_trace(2, false))
            .expect_err("load requires an idle engine"),
        PlaybackError::StateViolation {
            operation: "load",
            state: EngineState::Running,
        }
    );
    assert_eq!(
        engine.resume().expect_err("running playback cannot resume"),
        PlaybackError::StateViolation {
            operation: "resume",
            state: EngineState::Running,
        }
    );

    engine.pause().expect("running playback can pause");
    assert_eq!(
        engine.pause().expect_err("paused playback cannot pause again"),
        PlaybackError::StateViolation {
            operation: "pause",
            state: EngineState::Paused,
        }
    );

    engine.resume().expect("paused playback can resume");
    engine.tick(2.0 * 2400.0);
    assert_eq!(engine.state(), EngineState::CycleComplete);
    assert_eq!(
        engine.pause().expect_err("the loop dwell cannot pause"),
        PlaybackError::StateViolation {
            operation: "pause",
            state: EngineState::CycleComplete,
        }
    );
}

#[test]
fn loop_banner_shows_once_per_cycle() {
    let mut engine = running_engine(3, false);
    let config = engine.config();
    let cycle_ms = 3.0 * config.step_duration_ms + config.loop_dwell_ms;

    let mut banner_raisings = 0;
    let mut banner_up = false;
    let chunks = (2.0 * cycle_ms / 100.0) as usize;
    for _ in 0..chunks {
        engine.tick(100.0);
        let visible = engine.loop_banner_visible();
        assert_eq!(
            visible,
            engine.current_step() == engine.step_count(),
            "banner must track the one-past-the-end step"
        );
        if visible && !banner_up {
            banner_raisings += 1;
        }
        banner_up = visible;
    }
    assert_eq!(banner_raisings, 2, "one banner per completed traversal");
    assert_eq!(engine.state(), EngineState::Running);
    assert_eq!(engine.current_step(), 0);
    assert_eq!(engine.step_progress(), 0.0);
}

#[test]
fn loop_dwell_holds_then_restarts() {
    let mut engine = running_engine(1, false);
    engine.tick(2400.0);
    assert!(engine.loop_banner_visible());
    assert_eq!(engine.current_step(), 1);
    assert_eq!(engine.dwell_remaining_ms(), 2000.0);

    engine.tick(1999.0);
    assert!(
        engine.loop_banner_visible(),
        "the banner holds for the whole dwell"
    );

    engine.tick(1.0);
    assert!(!engine.loop_banner_visible());
    assert_eq!(engine.state(), EngineState::Running);
    assert_eq!(engine.current_step(), 0);
    assert_eq!(engine.step_progress(), 0.0);

    // One oversized tick pushes through the step boundary, the dwell, and
    // into the next cycle.
    engine.tick(2400.0 + 2000.0 + 600.0);
    assert_eq!(engine.state(), EngineState::Running);
    assert_eq!(engine.current_step(), 0);
    assert_eq!(engine.step_progress(), 0.25);
}

#[test]
fn reset_discards_trace_and_cancels_dwell() {
    let mut engine = running_engine(1, false);
    engine.tick(2500.0);
    assert!(engine.loop_banner_visible());

    engine.reset();
    assert_eq!(engine.state(), EngineState::Idle);
    assert!(engine.trace().is_none());
    assert_eq!(engine.step_count(), 0);
    assert!(!engine.loop_banner_visible());
    assert_eq!(engine.dwell_remaining_ms(), 0.0);

    // Ticks while idle change nothing.
    engine.tick(10_000.0);
    assert_eq!(engine.state(), EngineState::Idle);

    // A fresh load is unaffected by the cancelled restart.
    engine
        .load(patterned_trace(2, false))
        .expect("idle engine accepts a new trace");
    assert_eq!(engine.current_step(), 0);
    assert_eq!(engine.step_progress(), 0.0);
    engine.tick(600.0);
    assert_eq!(engine.current_step(), 0);
    assert_eq!(engine.step_progress(), 0.25);

    // Reset is also legal mid-pause.
    engine.pause().expect("running playback can pause");
    engine.reset();
    assert_eq!(engine.state(), EngineState::Idle);
}

#[test]
fn direct_exchange_uses_one_full_channel_flight() {
    let mut engine = running_engine(5, false);
    engine.set_channel_width(480.0);

    for step in 0..5 {
        let schedule = engine
            .schedule()
            .expect("measured channel yields a schedule");
        assert_eq!(schedule.flights().len(), 1, "step {step} should fly one photon");
        let flight = schedule.flights()[0];
        assert_eq!(flight.role, Role::Alice);
        assert_eq!(flight.start_offset_ms, 0.0);
        assert_eq!(flight.duration_ms, 2400.0);
        assert_eq!((flight.start_position, flight.end_position), (0.0, 480.0));

        engine.tick(1200.0);
        let poses = engine.photon_poses();
        assert_eq!(poses.len(), 1);
        assert_eq!(poses[0].position, 240.0, "halfway in time is halfway across");
        engine.tick(1200.0);
    }

    assert!(engine.loop_banner_visible());
    assert!(engine.schedule().is_none(), "no flights during the loop dwell");
}

#[test]
fn relay_hands_off_at_the_midpoint() {
    let mut engine = running_engine(1, true);
    engine.set_channel_width(400.0);

    let schedule = engine
        .schedule()
        .expect("measured channel yields a schedule");
    let flights = schedule.flights();
    assert_eq!(flights.len(), 2, "a relayed step flies two legs");
    assert_eq!(flights[0].role, Role::Alice);
    assert_eq!(flights[0].start_offset_ms, 0.0);
    assert_eq!(flights[0].duration_ms, 1200.0);
    assert_eq!(
        (flights[0].start_position, flights[0].end_position),
        (0.0, 200.0)
    );
    assert_eq!(flights[1].role, Role::Eve);
    assert_eq!(flights[1].start_offset_ms, 1200.0);
    assert_eq!(flights[1].duration_ms, 1200.0);
    assert_eq!(
        (flights[1].start_position, flights[1].end_position),
        (200.0, 400.0)
    );

    // First half of the step: only the source leg is in flight.
    engine.tick(600.0);
    let poses = engine.photon_poses();
    assert_eq!(poses.len(), 1);
    assert_eq!(poses[0].role, Role::Alice);
    assert_eq!(poses[0].position, 100.0);

    // Crossing the midpoint hands off. The source leg never re-triggers.
    engine.tick(600.0);
    let poses = engine.photon_poses();
    assert_eq!(poses.len(), 1);
    assert_eq!(poses[0].role, Role::Eve);
    assert_eq!(poses[0].position, 200.0);

    engine.tick(600.0);
    let poses = engine.photon_poses();
    assert_eq!(poses.len(), 1);
    assert_eq!(poses[0].role, Role::Eve);
    assert_eq!(poses[0].position, 300.0);
}

#[test]
fn unmeasured_channel_defers_flights_without_stalling_playback() {
    let mut engine = running_engine(3, false);
    assert_eq!(engine.channel_width(), 0.0);
    assert!(
        engine.schedule().is_none(),
        "nothing to plan before a layout pass"
    );
    assert!(engine.photon_poses().is_empty());

    // Ticking is unaffected by the missing layout.
    engine.tick(3000.0);
    assert_eq!(engine.current_step(), 1);
    assert_eq!(engine.step_progress(), 0.25);

    // The first measurement brings flights up mid-step with no progress
    // disturbance.
    engine.set_channel_width(300.0);
    assert_eq!(engine.step_progress(), 0.25);
    let poses = engine.photon_poses();
    assert_eq!(poses.len(), 1);
    assert_eq!(poses[0].position, 75.0);

    // A resize retargets in place: same fraction, new geometry.
    engine.set_channel_width(600.0);
    assert_eq!(engine.step_progress(), 0.25);
    assert_eq!(engine.photon_poses()[0].position, 150.0);

    // Collapsing back to zero hides flights but keeps the clock moving.
    engine.set_channel_width(0.0);
    assert!(engine.photon_poses().is_empty());
    engine.tick(600.0);
    assert_eq!(engine.current_step(), 1);
    assert_eq!(engine.step_progress(), 0.5);
}

#[test]
fn exchange_glyphs_follow_basis_and_bit() {
    assert_eq!(basis_symbol(Some(Basis::Rectilinear)), '+');
    assert_eq!(basis_symbol(Some(Basis::Diagonal)), 'x');
    assert_eq!(basis_symbol(None), '·');

    assert_eq!(bit_symbol(Some(Basis::Rectilinear), Some(Bit::Zero)), '-');
    assert_eq!(bit_symbol(Some(Basis::Rectilinear), Some(Bit::One)), '|');
    assert_eq!(bit_symbol(Some(Basis::Diagonal), Some(Bit::Zero)), '/');
    assert_eq!(bit_symbol(Some(Basis::Diagonal), Some(Bit::One)), '\\');
    assert_eq!(bit_symbol(Some(Basis::Rectilinear), None), '·');
    assert_eq!(bit_symbol(None, Some(Bit::One)), '·');
}

#[test]
fn replay_snapshot_mirrors_the_engine() {
    let mut engine = running_engine(4, true);
    engine.set_channel_width(100.0);
    engine.tick(600.0);

    let mut logs = VecDeque::new();
    logs.push_front("trace loaded: 4 steps".to_string());
    let data = ReplayData::capture(&engine, None, &logs, 3);

    let summary = data.summary.expect("a loaded engine has a summary");
    assert_eq!(summary.step_count, 4);
    assert!(summary.interceptor_present);

    assert_eq!(data.playback.state, "running");
    assert_eq!(data.playback.current_step, 0);
    assert_eq!(data.playback.step_progress, 0.25);
    assert_eq!(data.playback.cycles_completed, 3);
    assert!(!data.playback.loop_banner_visible);

    assert_eq!(data.rows.len(), 4, "short traces list every step");
    assert!(data.rows[0].current);
    assert!(!data.rows[1].current);

    assert_eq!(data.photons.len(), 1);
    assert_eq!(data.photons[0].role, "Alice");
    assert_eq!(
        data.photons[0].fraction, 0.25,
        "halfway through the first leg is a quarter of the channel"
    );
    assert_eq!(data.logs.len(), 1);
}
