#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Vehicle instrumentation core (hardware-agnostic).
//!
//! Sensors, the crash notification sink and the clock are consumed through
//! the traits in `vehicle_traits`. Each subsystem runs as its own periodic
//! task and publishes into shared state that the `Controller` reads.
//!
//! ## Architecture
//!
//! - **Acceleration**: low-pass filtered 3-axis samples behind a bounded-wait lock (`accel`)
//! - **Speed**: damped integration with zero-velocity updates, plus heading (`speed`)
//! - **Crash**: latched threshold detector with auto-reset timer (`crash`)
//! - **Door**: debounced presence with a bounded event queue (`door`)
//! - **Light**: day/night hysteresis over a moving lux average (`light`)
//! - **Proximity**: distance + heading to parking zone (`proximity`)
//!
//! The state machines expose pure `observe`/`update`/`process` entry points
//! so they can be driven deterministically in tests without threads.

pub mod accel;
pub mod config;
pub mod controller;
pub mod conversions;
pub mod crash;
pub mod door;
pub mod error;
pub mod hw_error;
pub mod light;
pub mod listener;
pub mod mocks;
pub mod proximity;
pub mod speed;
pub mod status;
pub mod task;
pub mod timer;
pub mod util;

pub use accel::{AccelState, AccelerationSampler, SharedAccel};
pub use config::{AccelCfg, CoreConfig, CrashCfg, DoorCfg, LightCfg, ProximityCfg, SpeedCfg};
pub use controller::{Controller, ControllerBuilder};
pub use crash::{CrashDetector, CrashEvent, CrashHandle, CrashListener, LatchState};
pub use door::{DoorEvent, DoorHandle, DoorListener, DoorState, DoorStateMachine};
pub use error::{BuildError, CoreError, Result};
pub use light::{DayNightStateMachine, LightHandle, LightListener, LightState};
pub use proximity::{ProximityHandle, ProximityListener, ProximityMonitor, ProximityZone, classify};
pub use speed::{Direction, SpeedEstimator, SpeedReader};
pub use status::Status;
