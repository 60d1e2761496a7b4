use std::sync::{Arc, Mutex};

use rstest::rstest;
use vehicle_core::mocks::ManualRange;
use vehicle_core::{Direction, ProximityCfg, ProximityMonitor, ProximityZone, SpeedReader, classify};

#[rstest]
#[case(Direction::Forward, ProximityZone::FrontClose)]
#[case(Direction::Backward, ProximityZone::BackClose)]
#[case(Direction::Unknown, ProximityZone::BackClose)]
#[case(Direction::Right, ProximityZone::BackClose)]
fn twenty_centimetres(#[case] dir: Direction, #[case] want: ProximityZone) {
    assert_eq!(classify(20, dir, &ProximityCfg::default()), want);
}

#[test]
fn custom_bands_are_honoured() {
    let cfg = ProximityCfg {
        danger_cm: 10,
        warning_cm: 20,
        safe_cm: 40,
        ..ProximityCfg::default()
    };
    assert_eq!(classify(15, Direction::Forward, &cfg), ProximityZone::FrontMid);
    assert_eq!(classify(45, Direction::Forward, &cfg), ProximityZone::NoneNear);
}

#[test]
fn monitor_uses_speed_direction_and_reports_changes() {
    let range = ManualRange::new(500);
    // Reader that was never published reports Unknown, so the back ladder applies.
    let mut m = ProximityMonitor::new(range.clone(), SpeedReader::default(), ProximityCfg::default());
    let h = m.handle();
    let seen: Arc<Mutex<Vec<(ProximityZone, u32)>>> = Arc::default();
    let sink = seen.clone();
    h.register_callback(move |z: ProximityZone, d: u32| {
        sink.lock().expect("lock").push((z, d));
    });

    assert_eq!(m.tick(), Some(ProximityZone::NoneNear));
    assert_eq!(h.distance_cm(), 400, "clamped to max range");
    range.set(60);
    assert_eq!(m.tick(), Some(ProximityZone::BackMid));
    assert_eq!(m.tick(), None);
    assert_eq!(
        *seen.lock().expect("lock"),
        vec![(ProximityZone::NoneNear, 400), (ProximityZone::BackMid, 60)]
    );
}

#[test]
fn ranging_failure_counts_as_max_range() {
    let range = ManualRange::new(20);
    let mut m = ProximityMonitor::new(range.clone(), SpeedReader::default(), ProximityCfg::default());
    assert_eq!(m.tick(), Some(ProximityZone::BackClose));
    range.set_failing(true);
    assert_eq!(m.tick(), Some(ProximityZone::NoneNear));
    assert_eq!(m.handle().distance_cm(), 400);
}
