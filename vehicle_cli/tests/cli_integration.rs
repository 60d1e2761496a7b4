use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tempfile::tempdir;

// Short periods so a sub-second run sees every subsystem report.
const FAST: &str = r#"
[accel]
period_ms = 40

[speed]
period_ms = 20

[crash]
period_ms = 5
reset_ms = 10000

[door]
period_ms = 5
debounce_count = 1

[light]
period_ms = 5

[proximity]
period_ms = 5
"#;

fn write_config(dir: &tempfile::TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("vehicle.toml");
    fs::write(&path, body).unwrap();
    path
}

fn vehicle(dir: &tempfile::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("vehicle").unwrap();
    // Keep the default config path from resolving to a real file.
    cmd.current_dir(dir.path());
    cmd.env_remove("RUST_LOG");
    cmd
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["classify", "--distance", "20", "--direction", "forward"], 0, "FrontClose", "stdout")]
#[case(&["classify", "--distance", "20", "--direction", "backward"], 0, "BackClose", "stdout")]
#[case(&["classify", "--distance", "500", "--direction", "left"], 0, "None", "stdout")]
#[case(&["classify", "--distance", "20", "--direction", "sideways"], 2, "invalid value", "stderr")]
#[case(&["classify", "--direction", "forward"], 2, "required", "stderr")]
#[case(&["fly"], 2, "unrecognized subcommand", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let assert = vehicle(&dir).args(args).assert().code(exit_code);
    let out = assert.get_output();
    let text = if stream == "stdout" {
        String::from_utf8_lossy(&out.stdout).to_string()
    } else {
        String::from_utf8_lossy(&out.stderr).to_string()
    };
    assert!(
        text.contains(needle),
        "expected {needle:?} in {stream}, got:\n{text}"
    );
}

#[test]
fn classify_uses_configured_bands() {
    let dir = tempdir().unwrap();
    let cfg = write_config(
        &dir,
        "[proximity]\ndanger_cm = 10\nwarning_cm = 20\nsafe_cm = 40\nmax_cm = 100\n",
    );
    vehicle(&dir)
        .arg("--config")
        .arg(&cfg)
        .args(["classify", "--distance", "15", "--direction", "forward"])
        .assert()
        .success()
        .stdout(predicate::str::contains("FrontMid"));
}

#[test]
fn run_reports_state_changes_and_final_status() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, FAST);
    vehicle(&dir)
        .arg("--config")
        .arg(&cfg)
        .args(["run", "--duration-ms", "600", "--sim-crash-at", "20"])
        .assert()
        .success()
        .stdout(predicate::str::contains("door: Closed"))
        .stdout(predicate::str::contains("door: Open"))
        .stdout(predicate::str::contains("light: Day"))
        .stdout(predicate::str::contains("light: Night"))
        .stdout(predicate::str::contains("crash: impact"))
        .stdout(predicate::str::contains("status:"))
        .stdout(predicate::str::contains("crash: latched"));
}

#[test]
fn long_run_keeps_the_door_queue_drained() {
    let dir = tempdir().unwrap();
    // A small queue fills after a few commits unless the run loop drains it.
    let body = FAST.replace("debounce_count = 1", "debounce_count = 1\nqueue_capacity = 2");
    let cfg = write_config(&dir, &body);
    let out = vehicle(&dir)
        .arg("--config")
        .arg(&cfg)
        .args(["run", "--duration-ms", "1500"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    let stderr = String::from_utf8(out.stderr).unwrap();
    assert!(!stderr.contains("queue full"), "stderr: {stderr}");
    let commits = stdout.lines().filter(|l| l.starts_with("door: ")).count();
    assert!(commits > 2, "expected more door events than the queue holds:\n{stdout}");
}

#[test]
fn closed_stdout_does_not_kill_sensor_tasks() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, FAST);
    let mut child = vehicle(&dir)
        .arg("--config")
        .arg(&cfg)
        .args(["run", "--duration-ms", "400", "--sim-crash-at", "20"])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    drop(child.stdout.take());
    let out = child.wait_with_output().unwrap();
    let stderr = String::from_utf8(out.stderr).unwrap();
    assert!(!stderr.contains("panicked"), "stderr: {stderr}");
    assert!(out.status.success(), "stderr: {stderr}");
}

#[test]
fn json_run_emits_one_object_per_line() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, FAST);
    let out = vehicle(&dir)
        .arg("--config")
        .arg(&cfg)
        .args(["--json", "run", "--duration-ms", "500"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    let lines: Vec<serde_json::Value> = stdout
        .lines()
        .map(|l| serde_json::from_str(l).unwrap_or_else(|e| panic!("bad JSON {l:?}: {e}")))
        .collect();
    assert!(lines.iter().any(|v| v["event"] == "door"));
    let status = lines.last().expect("status line");
    assert_eq!(status["event"], "status");
    assert_eq!(status["crashed"], false);
    assert!(status["ticks"]["accel-sampler"].as_u64().unwrap() >= 1);
}

#[test]
fn crash_notifier_writes_timestamp_line() {
    let dir = tempdir().unwrap();
    let sink = dir.path().join("crash.log");
    let body = format!("{FAST}\n[hardware]\nnotifier_path = {:?}\n", sink.display().to_string());
    let cfg = write_config(&dir, &body);
    vehicle(&dir)
        .arg("--config")
        .arg(&cfg)
        .args(["run", "--duration-ms", "300", "--sim-crash-at", "20"])
        .assert()
        .success();
    let written = fs::read_to_string(&sink).unwrap();
    assert!(
        predicate::str::is_match(r"^\d{4}-\d{2}-\d{2} \d{2}_\d{2}_\d{2}\n$")
            .unwrap()
            .eval(&written),
        "unexpected notifier output {written:?}"
    );
}

#[test]
fn invalid_config_exits_with_runtime_error() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "[door]\ndebounce_count = 0\n");
    vehicle(&dir)
        .arg("--config")
        .arg(&cfg)
        .args(["run", "--duration-ms", "50"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("door.debounce_count"));
}

#[test]
fn missing_explicit_config_is_an_error() {
    let dir = tempdir().unwrap();
    vehicle(&dir)
        .args(["--config", "nope.toml", "self-check"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("could not be read"));
}

#[test]
fn json_errors_are_structured() {
    let dir = tempdir().unwrap();
    let out = vehicle(&dir)
        .args(["--json", "--config", "nope.toml", "self-check"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8(out.stderr).unwrap();
    let last = stderr.lines().last().expect("error line");
    let v: serde_json::Value = serde_json::from_str(last).unwrap();
    assert_eq!(v["reason"], "config");
    assert!(v["message"].as_str().unwrap().contains("read config"));
}

#[test]
fn self_check_reads_every_sensor() {
    let dir = tempdir().unwrap();
    vehicle(&dir)
        .arg("self-check")
        .assert()
        .success()
        .stdout(predicate::str::contains("accelerometer: ok"))
        .stdout(predicate::str::contains("presence: ok (present)"))
        .stdout(predicate::str::contains("light: ok"))
        .stdout(predicate::str::contains("range: ok"));
}
