use std::io::Write;

use vehicle_hardware::error::HwError;
use vehicle_hardware::{LineNotifier, SimulatedAccelerometer, SimulatedRange, DriveProfile};
use vehicle_traits::{Accelerometer, CrashNotifier, RangeFinder};

#[test]
fn notifier_writes_one_line_per_crash() {
    let mut n = LineNotifier::new(Vec::new());
    n.notify("2024-04-05 18_40_00").expect("write");
    n.notify("2024-04-05 18_40_07").expect("write");
    let text = String::from_utf8(n.into_inner()).expect("utf8");
    assert_eq!(text, "2024-04-05 18_40_00\n2024-04-05 18_40_07\n");
}

#[test]
fn notifier_writes_to_file() {
    let mut f = tempfile::NamedTempFile::new().expect("tmp");
    {
        let mut n = LineNotifier::new(f.as_file_mut());
        n.notify("2024-04-05 18_40_00").expect("write");
    }
    f.flush().expect("flush");
    let text = std::fs::read_to_string(f.path()).expect("read");
    assert_eq!(text, "2024-04-05 18_40_00\n");
}

struct BrokenPipe;

impl Write for BrokenPipe {
    fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
        Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe))
    }
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn notifier_surfaces_write_errors() {
    let mut n = LineNotifier::new(BrokenPipe);
    let err = n.notify("x").expect_err("broken pipe");
    assert!(err.downcast_ref::<HwError>().is_some());
}

#[test]
fn range_sweeps_towards_obstacle_and_restarts() {
    let mut r = SimulatedRange::new(100, 40, 30);
    let seq: Vec<u32> = (0..5).map(|_| r.measure_cm(400).expect("range")).collect();
    assert_eq!(seq, vec![100, 70, 40, 100, 70]);
}

#[test]
fn range_beyond_max_times_out() {
    let mut r = SimulatedRange::new(500, 100, 50);
    let err = r.measure_cm(400).expect_err("out of range");
    assert!(matches!(err.downcast_ref::<HwError>(), Some(HwError::EchoTimeout)));
}

#[test]
fn accelerometer_replays_profile() {
    let profile = DriveProfile::default();
    let mut a = SimulatedAccelerometer::new(profile.clone());
    for n in 0..100 {
        assert_eq!(a.read().expect("sample"), profile.sample(n));
    }
}
