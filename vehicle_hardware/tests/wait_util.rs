use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::Duration;

use rstest::rstest;
use vehicle_hardware::error::HwError;
use vehicle_hardware::util::{echo_to_cm, wait_for_level_with_timeout};

#[test]
fn wait_for_level_success_path() {
    let high = Arc::new(AtomicBool::new(false));
    let high_bg = high.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(3));
        high_bg.store(true, Ordering::Relaxed);
    });

    let res = wait_for_level_with_timeout(
        || high.load(Ordering::Relaxed),
        true,
        Duration::from_millis(200),
        Duration::from_micros(200),
    );
    assert!(res.is_ok(), "expected success, got {res:?}");
}

#[test]
fn wait_for_level_timeout_path() {
    let high = Arc::new(AtomicBool::new(true));
    let err = wait_for_level_with_timeout(
        || high.load(Ordering::Relaxed),
        false,
        Duration::from_millis(5),
        Duration::ZERO,
    )
    .expect_err("expected timeout error");

    match err {
        HwError::EchoTimeout => {}
        other => panic!("unexpected error: {other:?}"),
    }
}

#[rstest]
#[case(Duration::from_micros(0), 0)]
#[case(Duration::from_micros(580), 10)]
#[case(Duration::from_micros(5_800), 100)]
#[case(Duration::from_millis(30), 400)]
fn echo_width_to_distance(#[case] width: Duration, #[case] cm: u32) {
    assert_eq!(echo_to_cm(width, 400), cm);
}
