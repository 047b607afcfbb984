use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

// Two heaters against the simulator; gains persist inside the temp dir.
fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let gains = dir.path().join("gains.toml");
    let toml = format!(
        r#"
[control]
tick_ms = 250
bang_bang_threshold = 8

[sanity]
enabled = true
band_qc = 12
min_tolerance_ticks = 4

[storage]
gains_file = "{}"

[[heater]]
name = "extruder"
pin = 3
sensor = "thermistor"
watts = 40
dead_time_ms = 10000

[[heater]]
name = "bed"
pin = 4
pwm = false
sensor = "thermocouple"
watts = 200
dead_time_ms = 10000
"#,
        gains.display().to_string().replace('\\', "/")
    );
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["run", "--ticks", "20", "--fast", "--target", "extruder=100"], 0, "extruder T:", "stdout")]
#[case(&["run", "--ticks", "100", "--fast", "--target", "extruder=200", "--detach", "extruder"], 3, "Sanity watchdog", "stderr")]
#[case(&["run", "--ticks", "100", "--fast", "--target", "bed=60", "--disconnect", "bed"], 3, "bed", "stderr")]
#[case(&["run", "--ticks", "1", "--target", "ghost=50"], 4, "No heater named", "stderr")]
#[case(&["run", "--target", "extruder"], 2, "NAME=CELSIUS", "stderr")]
#[case(&["self-check"], 0, "OK: 2 heaters", "stdout")]
#[case(&["show"], 0, "extruder pin=3 pwm", "stdout")]
#[case(&["show", "--heater", "bed"], 0, "on/off", "stdout")]
#[case(&["set-gain", "extruder", "i_limit", "-1"], 4, "cannot be represented", "stderr")]
#[case(&["set-gain", "extruder", "q", "1"], 2, "unknown gain", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("heaterctl").unwrap();

    // Always include a valid config to avoid relying on default path
    cmd.arg("--config").arg(&cfg);
    for a in args {
        cmd.arg(a);
    }

    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[test]
fn set_gain_persists_across_invocations() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    Command::cargo_bin("heaterctl")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .args(["set-gain", "extruder", "p", "1234"])
        .assert()
        .success()
        .stdout(predicate::str::contains("extruder: p=1234"));

    assert!(dir.path().join("gains.toml").exists());

    Command::cargo_bin("heaterctl")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .args(["show", "--heater", "extruder"])
        .assert()
        .success()
        .stdout(predicate::str::contains("p=1234"));

    // the other heater keeps its configured defaults
    Command::cargo_bin("heaterctl")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .args(["show", "--heater", "bed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("p=8192"));
}

#[test]
fn set_gain_without_gains_file_is_rejected() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("cfg.toml");
    fs::write(
        &cfg,
        "[[heater]]\nname = \"h\"\npin = 1\nwatts = 40\ndead_time_ms = 10000\n",
    )
    .unwrap();

    Command::cargo_bin("heaterctl")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .args(["set-gain", "h", "p", "1"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("storage.gains_file"));
}

#[test]
fn missing_config_file_is_reported() {
    let dir = tempdir().unwrap();
    Command::cargo_bin("heaterctl")
        .unwrap()
        .arg("--config")
        .arg(dir.path().join("absent.toml"))
        .arg("show")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Could not read the config file"));
}

#[test]
fn invalid_config_is_reported() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("cfg.toml");
    fs::write(
        &cfg,
        r#"
[[heater]]
name = "h"
pin = 1
watts = 40
dead_time_ms = 10000

[[heater]]
name = "h"
pin = 2
watts = 40
dead_time_ms = 10000
"#,
    )
    .unwrap();

    Command::cargo_bin("heaterctl")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("self-check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid configuration"));
}

#[test]
fn stats_are_printed_on_request() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    Command::cargo_bin("heaterctl")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .args(["run", "--ticks", "10", "--fast", "--every", "0", "--stats"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Ticks: 10"))
        .stderr(predicate::str::contains("Faults raised: 0"));
}

#[test]
fn fault_injected_later_still_trips() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    Command::cargo_bin("heaterctl")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .args([
            "run",
            "--ticks",
            "200",
            "--fast",
            "--every",
            "0",
            "--target",
            "extruder=150",
            "--detach",
            "extruder",
            "--fault-after",
            "30",
        ])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("FAULT: heater extruder"));
}
