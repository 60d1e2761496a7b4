//! `self-check`: read every sensor once.

use crate::sensors;
use serde_json::json;
use vehicle_config::Config;
use vehicle_traits::{Accelerometer, LightSensor, PresenceSensor, RangeFinder};

type Reading = Result<String, String>;

pub fn self_check(cfg: &Config, json: bool) -> eyre::Result<()> {
    let mut s = sensors::build(cfg, None)?;
    let max_cm = cfg.proximity.max_cm;

    let readings: [(&str, Reading); 4] = [
        (
            "accelerometer",
            s.accelerometer
                .read()
                .map(|r| format!("x={:.3} y={:.3} z={:.3} g", r.x, r.y, r.z))
                .map_err(|e| e.to_string()),
        ),
        (
            "presence",
            s.presence
                .is_present()
                .map(|p| if p { "present" } else { "absent" }.to_string())
                .map_err(|e| e.to_string()),
        ),
        (
            "light",
            s.light
                .read_lux()
                .map(|l| format!("{l:.1} lux"))
                .map_err(|e| e.to_string()),
        ),
        (
            "range",
            s.ranger
                .measure_cm(max_cm)
                .map(|d| format!("{d} cm"))
                .map_err(|e| e.to_string()),
        ),
    ];

    let mut failed = 0usize;
    for (name, reading) in &readings {
        let (ok, detail) = match reading {
            Ok(d) => (true, d.as_str()),
            Err(e) => {
                failed += 1;
                tracing::warn!(sensor = name, error = %e, "self-check read failed");
                (false, e.as_str())
            }
        };
        if json {
            println!("{}", json!({ "check": name, "ok": ok, "detail": detail }));
        } else {
            println!("{name}: {} ({detail})", if ok { "ok" } else { "FAIL" });
        }
    }

    if failed > 0 {
        eyre::bail!("self-check failed: {failed} sensor(s) reported errors");
    }
    Ok(())
}
