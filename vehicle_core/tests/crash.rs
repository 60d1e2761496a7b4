use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use rstest::rstest;
use vehicle_core::mocks::{FailingSensor, RecordingNotifier, ScriptedAccelerometer};
use vehicle_core::{CrashCfg, CrashDetector, CrashEvent, LatchState};
use vehicle_traits::RawSample;
use vehicle_traits::clock::test_clock::TestClock;

const GRAVITY: RawSample = RawSample::new(0.0, 0.0, 1.0);
const IMPACT: RawSample = RawSample::new(3.0, 3.0, 3.0);

fn detector() -> CrashDetector<ScriptedAccelerometer, TestClock> {
    CrashDetector::new(
        ScriptedAccelerometer::new(vec![GRAVITY]),
        TestClock::new(),
        CrashCfg::default(),
    )
}

#[test]
fn gravity_alone_never_latches() {
    let mut d = detector();
    for _ in 0..200 {
        assert!(d.tick().is_none());
    }
    assert!(!d.handle().is_crashed());
    assert!(d.handle().last_event().is_none());
}

#[test]
fn strong_impact_latches_once() {
    let mut d = detector();
    let h = d.handle();
    let hits = Arc::new(AtomicU32::new(0));
    let seen = hits.clone();
    h.register_callback(move |_: &CrashEvent| {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    let ev = d.process(&IMPACT).expect("first impact latches");
    assert!((ev.impact_force - (27.0_f32.sqrt() - 1.0)).abs() < 1e-5);
    for _ in 0..5 {
        assert!(d.process(&IMPACT).is_none(), "latched detector must not re-fire");
    }
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert!(h.is_crashed());
    assert_eq!(h.state(), LatchState::Latched);
    assert_eq!(h.last_event(), Some(ev));
}

#[test]
fn event_carries_wall_clock_timestamp_and_notifies_sink() {
    let notifier = RecordingNotifier::default();
    let mut d = detector().with_notifier(Box::new(notifier.clone()));
    let ev = d.process(&IMPACT).expect("latch");
    assert_eq!(ev.timestamp, 1_712_342_400);
    assert_eq!(ev.formatted_timestamp, "2024-04-05 18_40_00");
    assert_eq!(notifier.lines(), vec!["2024-04-05 18_40_00\n".to_string()]);
}

#[rstest]
#[case(0.0)]
#[case(-1.0)]
#[case(f32::NAN)]
fn non_positive_threshold_is_ignored(#[case] bad: f32) {
    let mut d = detector();
    let h = d.handle();
    let before = h.threshold();
    h.set_threshold(bad);
    assert_eq!(h.threshold(), before);
    // Gravity must still read as no impact under the kept threshold.
    assert!(d.process(&GRAVITY).is_none());
    assert!(d.process(&IMPACT).is_some());
}

#[test]
fn lowered_threshold_takes_effect() {
    let mut d = detector();
    let h = d.handle();
    let moderate = RawSample::new(0.0, 0.0, 2.5);
    assert!(d.process(&moderate).is_none());
    h.set_threshold(1.0);
    assert!(d.process(&moderate).is_some());
}

#[test]
fn manual_reset_rearms_detector() {
    let mut d = detector();
    let h = d.handle();
    d.process(&IMPACT).expect("latch");
    h.reset();
    assert!(!h.is_crashed());
    assert!(h.last_event().is_none());
    assert!(d.process(&IMPACT).is_some(), "re-armed detector fires again");
}

#[test]
fn auto_reset_clears_latch() {
    let cfg = CrashCfg {
        reset_ms: 40,
        ..CrashCfg::default()
    };
    let mut d = CrashDetector::new(
        ScriptedAccelerometer::new(vec![GRAVITY]),
        TestClock::new(),
        cfg,
    );
    let h = d.handle();
    d.process(&IMPACT).expect("latch");
    assert!(h.is_crashed());
    let deadline = std::time::Instant::now() + Duration::from_secs(2);
    while h.is_crashed() && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    assert!(!h.is_crashed());
    assert!(h.last_event().is_none());
}

#[test]
fn manual_reset_cancels_pending_auto_reset() {
    let cfg = CrashCfg {
        reset_ms: 150,
        ..CrashCfg::default()
    };
    let mut d = CrashDetector::new(
        ScriptedAccelerometer::new(vec![GRAVITY]),
        TestClock::new(),
        cfg,
    );
    let h = d.handle();
    d.process(&IMPACT).expect("latch");
    std::thread::sleep(Duration::from_millis(60));
    h.reset();
    // Latch again; the first timer must not clear this newer latch early.
    d.process(&IMPACT).expect("second latch");
    std::thread::sleep(Duration::from_millis(120));
    assert!(h.is_crashed());
}

#[test]
fn listener_may_reset_from_inside_callback() {
    let mut d = detector();
    let h = d.handle();
    let inner = h.clone();
    h.register_callback(move |_: &CrashEvent| inner.reset());
    d.process(&IMPACT).expect("latch");
    assert!(!h.is_crashed());
    assert!(d.process(&IMPACT).is_some());
}

#[test]
fn read_failures_are_ignored() {
    let mut d = CrashDetector::new(FailingSensor, TestClock::new(), CrashCfg::default());
    for _ in 0..10 {
        assert!(d.tick().is_none());
    }
    assert!(!d.handle().is_crashed());
}
