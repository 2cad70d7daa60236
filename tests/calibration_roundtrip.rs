use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use ledsense::analysis::color::{ReferenceColor, Rgb};
use ledsense::calibration::{
    run_analysis, run_session, session_file_name, CalibrationArtifact, CalibrationProgress,
    OperatorPrompt,
};
use ledsense::config::AppConfig;
use ledsense::error::{CalibrationError, SensingError};
use ledsense::sensor::{FixedPattern, SensorHandle, SimulatedRig, StubTimeSource};
use ledsense::signals::ExitSignal;

const RED: Rgb = Rgb { r: 900, g: 120, b: 100 };
const BLUE: Rgb = Rgb { r: 110, g: 140, b: 880 };

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("ledsense_{}_{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn config() -> AppConfig {
    let mut config = AppConfig::default();
    config.detection.poll_interval_ms = 0;
    config.sensor.integration_time_ms = 0;
    config.sensor.light_holdoff_ms = 0;
    config.colors = vec![
        ReferenceColor::new("red", [1000, 100, 100]),
        ReferenceColor::new("blue", [100, 100, 1000]),
    ];
    config
}

fn sensor(cubes: Vec<Rgb>, seed: u64) -> SensorHandle {
    let rig = SimulatedRig::new(cubes, seed)
        .with_noise(1)
        .with_phase_lengths(3, 30);
    SensorHandle::new(
        Box::new(rig.source()),
        Box::new(rig.light()),
        Arc::new(StubTimeSource::new()),
        Duration::ZERO,
    )
}

#[derive(Default)]
struct CountingPrompt {
    presented: Vec<String>,
    recorded: usize,
    wrong: usize,
}

impl OperatorPrompt for CountingPrompt {
    fn present(&mut self, label: &str) {
        self.presented.push(label.to_string());
    }

    fn remove(&mut self) {}

    fn progress(&mut self, _progress: &CalibrationProgress) {
        self.recorded += 1;
    }

    fn wrong_color(&mut self, _label: &str, _distance: f64) {
        self.wrong += 1;
    }
}

fn session(station_pattern: Vec<u8>, cubes: Vec<Rgb>, seed: u64) -> CalibrationArtifact {
    let config = config();
    let mut sensor = sensor(cubes, seed);
    let mut prompt = CountingPrompt::default();
    run_session(
        &config,
        &mut sensor,
        &mut FixedPattern(station_pattern),
        &mut prompt,
        3,
        ExitSignal::new(),
    )
    .unwrap()
}

#[test]
fn test_session_records_every_color_and_detects_unswapped_cube() {
    let config = config();
    // the fourth cube is still red although blue is expected
    let mut sensor = sensor(vec![RED, RED, RED, RED, BLUE, BLUE, BLUE], 21);
    let mut prompt = CountingPrompt::default();

    let artifact = run_session(
        &config,
        &mut sensor,
        &mut FixedPattern(vec![1, 1, 0]),
        &mut prompt,
        3,
        ExitSignal::new(),
    )
    .unwrap();

    assert_eq!(prompt.presented, vec!["red".to_string(), "blue".to_string()]);
    assert_eq!(prompt.recorded, 6);
    assert_eq!(prompt.wrong, 1);

    assert_eq!(artifact.station, Some(2));
    assert_eq!(artifact.labels(), vec!["red", "blue"]);
    assert!(artifact.values.iter().all(|v| v.samples.len() == 3));
    assert!(artifact.colors[0].rgb.distance(&RED) < 5.0);
    assert!(artifact.colors[1].rgb.distance(&BLUE) < 5.0);
    assert!(artifact.desc.contains("station: 2"));
}

#[test]
fn test_undefined_station_fails_before_sampling() {
    let config = config();
    let mut sensor = sensor(vec![RED], 1);
    let mut prompt = CountingPrompt::default();

    let err = run_session(
        &config,
        &mut sensor,
        &mut FixedPattern(vec![0, 0, 0]),
        &mut prompt,
        3,
        ExitSignal::new(),
    )
    .unwrap_err();

    assert!(matches!(
        err,
        CalibrationError::Sensing(SensingError::UndefinedStation { .. })
    ));
    assert!(prompt.presented.is_empty());
    assert_eq!(sensor.monitor().total_readings(), 0);
}

#[test]
fn test_artifact_round_trips_and_serves_as_config() {
    let dir = temp_dir("calibration_roundtrip");
    let artifact = session(vec![1, 1, 1], vec![RED, RED, RED, BLUE, BLUE, BLUE], 2);

    let name = session_file_name(&chrono::Local::now(), 1);
    assert!(name.ends_with("_station_1.json"));
    let path = artifact.write(&dir, &name).unwrap();

    let loaded = CalibrationArtifact::load(&path).unwrap();
    assert_eq!(loaded.values, artifact.values);
    assert_eq!(loaded.colors, artifact.colors);
    assert_eq!(loaded.station, Some(1));
    assert_eq!(loaded.report.len(), 2);

    let as_config = AppConfig::load_from_file(&path).unwrap();
    assert_eq!(as_config.colors, artifact.colors);
    assert_eq!(as_config.stations, AppConfig::default().stations);
    assert!(as_config.validate().is_ok());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_analysis_of_two_stations_writes_combined_artifact() {
    let dir = temp_dir("calibration_analysis");
    let first = session(vec![1, 1, 1], vec![RED, RED, RED, BLUE, BLUE, BLUE], 3);
    let second = session(vec![1, 0, 1], vec![RED, RED, RED, BLUE, BLUE, BLUE], 4);
    let paths = vec![
        first.write(&dir, "a_station_1.json").unwrap(),
        second.write(&dir, "b_station_3.json").unwrap(),
    ];

    let out = dir.join("combined");
    let (report, combined_path) = run_analysis(&paths, &out).unwrap();

    assert!(report.mismatches.is_empty());
    assert_eq!(report.stations, vec![Some(1), Some(3)]);
    assert!(report.cells.iter().flatten().all(|cell| cell.ok == 3 && cell.count == 3));
    assert!(combined_path.starts_with(&out));
    assert!(combined_path.to_string_lossy().ends_with("_all.json"));

    let combined = CalibrationArtifact::load(&combined_path).unwrap();
    assert_eq!(combined.labels(), vec!["red", "blue"]);
    assert!(combined.values.iter().all(|v| v.samples.len() == 6));

    let rendered = report.render();
    assert!(rendered.contains("red"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_analysis_rejects_mismatched_color_sets() {
    let dir = temp_dir("calibration_mismatch");
    let first = session(vec![1, 1, 1], vec![RED, RED, RED, BLUE, BLUE, BLUE], 5);
    let mut second = first.clone();
    second.values.reverse();
    let paths = vec![
        first.write(&dir, "a.json").unwrap(),
        second.write(&dir, "b.json").unwrap(),
    ];

    let err = run_analysis(&paths, &dir).unwrap_err();
    assert!(matches!(err, CalibrationError::IncompatibleArtifact { .. }));

    let _ = std::fs::remove_dir_all(&dir);
}
