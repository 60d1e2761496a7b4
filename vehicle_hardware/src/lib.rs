//! Sensor backends for the instrumentation controller.
//!
//! - `sim`: deterministic simulators and a line-oriented crash notifier
//! - `gpio` (feature `hardware`): Raspberry Pi presence input and ultrasonic ranger
pub mod error;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod gpio;
pub mod sim;
pub mod util;

pub use sim::{
    DriveProfile, LineNotifier, SimulatedAccelerometer, SimulatedLight, SimulatedPresence,
    SimulatedRange,
};
