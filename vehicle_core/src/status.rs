//! Point-in-time summary of every subsystem.
use crate::accel::AccelState;
use crate::crash::CrashEvent;
use crate::door::DoorState;
use crate::light::LightState;
use crate::proximity::ProximityZone;
use crate::speed::Direction;

#[derive(Debug, Clone, PartialEq)]
pub struct Status {
    /// None when the acceleration snapshot timed out.
    pub accel: Option<AccelState>,
    pub speed_kmh: f32,
    pub direction: Direction,
    pub crashed: bool,
    pub last_crash: Option<CrashEvent>,
    pub crash_threshold_g: f32,
    pub door: DoorState,
    pub light: LightState,
    pub lux: f64,
    pub zone: ProximityZone,
    pub distance_cm: u32,
}
