use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use ledsense::analysis::color::ReferenceColor;
use ledsense::audio::wav;
use ledsense::config::{default_map, AppConfig};

fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_ledsense"))
}

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("ledsense_cli_{}_{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

/// Fast two-color configuration with provisioned tones, saved into `dir`.
fn write_fast_config(dir: &PathBuf) -> PathBuf {
    let mut config = AppConfig::default();
    config.detection.poll_interval_ms = 1;
    config.sensor.integration_time_ms = 1;
    config.sensor.light_holdoff_ms = 1;
    config.telemetry.interval_s = 1;
    config.colors = vec![
        ReferenceColor::new("red", [900, 120, 100]),
        ReferenceColor::new("blue", [110, 140, 880]),
    ];
    config.playback.resource_dir = dir.join("sounds");
    config.playback.map = default_map(&config.stations, &config.colors);

    std::fs::create_dir_all(&config.playback.resource_dir).expect("create sounds dir");
    for entry in &config.playback.map {
        let path = config.playback.resource_path(entry);
        wav::write_tone(&path, 660.0, Duration::from_millis(100), 8_000).expect("write tone");
    }

    let path = dir.join("config.json");
    config.save_to_file(&path).expect("save config");
    path
}

#[test]
fn save_default_writes_loadable_config() {
    let dir = temp_dir("save_default");
    let path = dir.join("default.json");

    let output = cli()
        .arg("save-default")
        .arg(&path)
        .output()
        .expect("failed to run ledsense save-default");
    assert!(output.status.success(), "exit {:?}", output.status.code());

    let loaded = AppConfig::load_from_file(&path).expect("load saved config");
    assert_eq!(loaded, AppConfig::default());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn color_analysis_prints_closest_pairs() {
    let output = cli()
        .arg("color-analysis")
        .output()
        .expect("failed to run ledsense color-analysis");
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).expect("stdout UTF-8");
    assert_eq!(stdout.lines().filter(|l| l.starts_with("Dist:")).count(), 10);
    assert!(stdout.contains("RGB Length"));
}

#[test]
fn invalid_config_is_rejected() {
    let dir = temp_dir("invalid_config");
    let path = dir.join("broken.json");
    std::fs::write(&path, "{ not json").expect("write broken config");

    let output = cli()
        .args(["--config"])
        .arg(&path)
        .arg("color-analysis")
        .output()
        .expect("failed to run ledsense");
    assert_eq!(output.status.code(), Some(1));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn sensing_modes_need_a_sensor() {
    let output = cli()
        .args(["detect", "--limit", "1"])
        .output()
        .expect("failed to run ledsense detect");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--simulate"));
}

#[test]
fn simulated_classify_names_colors() {
    let dir = temp_dir("classify");
    let config = write_fast_config(&dir);

    let output = cli()
        .arg("--config")
        .arg(&config)
        .args(["--simulate", "classify", "--cycles", "2"])
        .output()
        .expect("failed to run ledsense classify");
    assert!(output.status.success(), "exit {:?}", output.status.code());

    let stdout = String::from_utf8(output.stdout).expect("stdout UTF-8");
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("-> red"));
    assert!(lines[1].contains("-> blue"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn simulated_toggle_dump_honours_limit() {
    let output = cli()
        .args(["--simulate", "dump", "--light", "toggle", "--limit", "6"])
        .output()
        .expect("failed to run ledsense dump");
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).expect("stdout UTF-8");
    assert_eq!(stdout.lines().count(), 6);
    assert!(stdout.lines().all(|l| l.starts_with("R:")));
}

#[test]
fn simulated_run_plays_and_writes_log_file() {
    let dir = temp_dir("run");
    let config = write_fast_config(&dir);
    let log_file = dir.join("ledsense.log");

    let output = cli()
        .arg("--config")
        .arg(&config)
        .arg("--log-file")
        .arg(&log_file)
        .args(["--simulate", "--station-pattern", "1,0,1", "run", "--cycles", "2"])
        .output()
        .expect("failed to run ledsense run");
    assert!(output.status.success(), "exit {:?}", output.status.code());

    let stdout = String::from_utf8(output.stdout).expect("stdout UTF-8");
    assert!(stdout.contains("Cycles: 2, matches: 2"));

    let log = std::fs::read_to_string(&log_file).expect("read log file");
    assert!(log.contains("[Orchestrator]"));
    assert!(log.contains("301.wav"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn cal_analysis_requires_files() {
    let output = cli()
        .arg("cal-analysis")
        .output()
        .expect("failed to run ledsense cal-analysis");
    assert!(!output.status.success());
}
