//! `run`: start the controller, report state changes, print a final status.

use crate::sensors;
use eyre::WrapErr;
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use vehicle_config::Config;
use vehicle_core::{
    Controller, ControllerBuilder, CoreConfig, CrashEvent, DoorEvent, LightState, ProximityZone,
    Status,
};

const POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOpts {
    pub duration: Option<Duration>,
    pub sim_crash_at: Option<u64>,
}

/// Write one line to stdout. A closed pipe drops the line instead of
/// panicking, since listeners run on the sensor task threads.
fn write_stdout(text: &str) {
    let mut out = std::io::stdout().lock();
    if let Err(e) = writeln!(out, "{text}") {
        tracing::debug!(error = %e, "stdout write failed; output dropped");
    }
}

/// One output record: a JSON line in `--json` mode, text otherwise.
fn emit(json: bool, value: &serde_json::Value, text: &str) {
    if json {
        write_stdout(&value.to_string());
    } else {
        write_stdout(text);
    }
}

fn emit_door(json: bool, e: &DoorEvent) {
    emit(
        json,
        &json!({ "event": "door", "state": e.state.as_str(), "t_ms": e.timestamp_ms }),
        &format!("door: {} (t={} ms)", e.state, e.timestamp_ms),
    );
}

/// Door events are reported from the queue, not a listener, so the queue
/// never fills up during a long run.
fn drain_door_events(c: &Controller, json: bool) {
    while let Some(e) = c.poll_door_event(Duration::ZERO) {
        emit_door(json, &e);
    }
}

/// Install the reporters on the builder so the first transitions of each
/// task are not missed.
fn with_reporters(builder: ControllerBuilder, json: bool) -> ControllerBuilder {
    builder
        .with_crash_callback(move |e: &CrashEvent| {
            emit(
                json,
                &json!({
                    "event": "crash",
                    "impact_g": e.impact_force,
                    "timestamp": e.formatted_timestamp,
                }),
                &format!(
                    "crash: impact {:.2} g at {}",
                    e.impact_force, e.formatted_timestamp
                ),
            );
        })
        .with_light_callback(move |s: LightState| {
            emit(
                json,
                &json!({ "event": "light", "state": s.as_str() }),
                &format!("light: {s}"),
            );
        })
        .with_proximity_callback(move |zone: ProximityZone, d: u32| {
            emit(
                json,
                &json!({ "event": "proximity", "zone": zone.as_str(), "distance_cm": d }),
                &format!("proximity: {zone} ({d} cm)"),
            );
        })
}

fn print_status(s: &Status, ticks: &[(&'static str, u64)], json: bool) {
    if json {
        let ticks: serde_json::Map<String, serde_json::Value> = ticks
            .iter()
            .map(|(name, n)| ((*name).to_string(), json!(n)))
            .collect();
        let v = json!({
            "event": "status",
            "speed_kmh": s.speed_kmh,
            "direction": s.direction.as_str(),
            "crashed": s.crashed,
            "crash_threshold_g": s.crash_threshold_g,
            "door": s.door.as_str(),
            "light": s.light.as_str(),
            "lux": s.lux,
            "zone": s.zone.as_str(),
            "distance_cm": s.distance_cm,
            "ticks": ticks,
        });
        write_stdout(&v.to_string());
        return;
    }
    let ticks: Vec<String> = ticks.iter().map(|(n, t)| format!("{n}={t}")).collect();
    let lines = [
        "status:".to_string(),
        format!("  speed: {:.2} km/h ({})", s.speed_kmh, s.direction),
        format!(
            "  crash: {} (threshold {:.2} g)",
            if s.crashed { "latched" } else { "clear" },
            s.crash_threshold_g
        ),
        format!("  door: {}", s.door),
        format!("  light: {} ({:.1} lux)", s.light, s.lux),
        format!("  proximity: {} ({} cm)", s.zone, s.distance_cm),
        format!("  ticks: {}", ticks.join(" ")),
    ];
    write_stdout(&lines.join("\n"));
}

pub fn run(cfg: &Config, opts: RunOpts, json: bool) -> eyre::Result<()> {
    let sensors = sensors::build(cfg, opts.sim_crash_at)?;
    let mut builder = with_reporters(Controller::builder(), json)
        .with_config(CoreConfig::from(cfg))
        .with_accelerometer(sensors.accelerometer)
        .with_presence_sensor(sensors.presence)
        .with_light_sensor(sensors.light)
        .with_range_finder(sensors.ranger);
    if let Some(n) = sensors.notifier {
        builder = builder.with_notifier(n);
    }
    let controller = builder.try_start()?;

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || stop.store(true, Ordering::Relaxed))
            .wrap_err("install Ctrl-C handler")?;
    }

    let deadline = opts.duration.map(|d| Instant::now() + d);
    tracing::info!(duration_ms = ?opts.duration.map(|d| d.as_millis()), "running");
    while !stop.load(Ordering::Relaxed) {
        let mut nap = POLL;
        if let Some(dl) = deadline {
            let now = Instant::now();
            if now >= dl {
                break;
            }
            nap = nap.min(dl - now);
        }
        drain_door_events(&controller, json);
        std::thread::sleep(nap);
    }

    drain_door_events(&controller, json);
    print_status(&controller.status(), &controller.task_ticks(), json);
    if !controller.shutdown() {
        eyre::bail!("a sensor task panicked during the run");
    }
    Ok(())
}
