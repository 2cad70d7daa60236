//! Configuration management for the sensing kiosk
//!
//! Everything tunable lives in one JSON document: detection and stabilization
//! parameters, the reference color table, station patterns and the mapping
//! from (station, color) to audio resource. Calibration artifacts use the
//! same top-level keys, so a calibration result can be loaded directly as the
//! next run's configuration.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::analysis::classifier::ColorClassifier;
use crate::analysis::color::ReferenceColor;
use crate::error::ConfigError;
use crate::sensor::station::{StationPattern, StationResolver};

pub const DEFAULT_DESCRIPTION: &str = "DEFAULT DESCRIPTION";

/// RAL reference colors as measured on the reference rig.
static DEFAULT_COLORS: Lazy<Vec<ReferenceColor>> = Lazy::new(|| {
    [
        // yellow tones
        ("RAL 1000 - Grünbeige", [4080, 3300, 2328]),
        ("RAL 1001 - Beige", [4188, 3079, 2263]),
        ("RAL 1002 - Sandgelb", [3888, 2799, 1889]),
        ("RAL 1003 - Signalgelb", [4812, 2828, 1466]),
        ("RAL 1004 - Goldgelb", [4172, 2535, 1356]),
        ("RAL 1005 - Honiggelb", [3232, 2102, 1196]),
        ("RAL 1006 - Maisgelb", [4016, 2272, 1310]),
        ("RAL 1007 - Narzissengelb", [4048, 2140, 1228]),
        ("RAL 1011 - Braunbeige", [2764, 1849, 1347]),
        ("RAL 1012 - Zitronengelb", [3851, 2708, 1530]),
        ("RAL 1013 - Perlweiß", [5165, 4411, 3649]),
        ("RAL 1014 - Elfenbein", [4541, 3593, 2631]),
        ("RAL 1015 - Hellelfenbein", [5117, 4189, 3297]),
        ("RAL 1016 - Schwefelgelb", [5651, 4455, 2353]),
        ("RAL 1017 - Safrangelb", [4890, 2856, 1728]),
        // blue tones
        ("RAL 5008 - Graublau", [1026, 914, 842]),
        ("RAL 5009 - Azurblau", [1116, 1216, 1280]),
        ("RAL 5010 - Enzianblau", [973, 1073, 1316]),
        ("RAL 5011 - Stahlblau", [887, 783, 752]),
        ("RAL 5012 - Lichtblau", [1476, 1990, 2394]),
        ("RAL 5013 - Kobaltblau", [926, 839, 878]),
        ("RAL 5014 - Taubenblau", [1761, 1764, 1822]),
        ("RAL 5015 - Himmelblau", [1249, 1745, 2243]),
        ("RAL 5017 - Verkehrsblau", [984, 1202, 1554]),
        ("RAL 5018 - Türkisblau", [1451, 1959, 1856]),
        ("RAL 5019 - Capriblau", [1022, 1207, 1422]),
        ("RAL 5020 - Ozeanblau", [894, 888, 873]),
        ("RAL 5021 - Wasserblau", [1114, 1494, 1449]),
        ("RAL 5022 - Nachtblau", [952, 851, 912]),
        ("RAL 5023 - Fernblau", [1351, 1440, 1592]),
    ]
    .into_iter()
    .map(|(name, rgb): (&str, [u32; 3])| ReferenceColor::new(name, rgb))
    .collect()
});

/// The default reference color table.
pub fn default_colors() -> Vec<ReferenceColor> {
    DEFAULT_COLORS.clone()
}

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub desc: String,
    pub detection: DetectionConfig,
    pub stabilization: StabilizationConfig,
    pub sensor: SensorConfig,
    pub colors: Vec<ReferenceColor>,
    pub stations: Vec<StationPattern>,
    pub playback: PlaybackConfig,
    pub telemetry: TelemetryConfig,
    pub calibration: CalibrationConfig,
}

/// Presence detection parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Clear channel value below which a cube counts as present
    pub threshold: u16,
    /// Settle delay between presence polls
    pub poll_interval_ms: u64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            threshold: 2,
            poll_interval_ms: 50,
        }
    }
}

/// Stable sampler and classifier parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilizationConfig {
    /// Samples per stabilization run (at least 2)
    pub stable_count: usize,
    /// Max distance between consecutive samples of an accepted run
    pub stable_distance: f64,
    /// Rejection band of the classifier
    pub max_distance: f64,
}

impl Default for StabilizationConfig {
    fn default() -> Self {
        Self {
            stable_count: 5,
            stable_distance: 10.0,
            max_distance: 300.0,
        }
    }
}

/// Sensor setup, echoed into calibration artifacts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    pub integration_time_ms: u64,
    pub gain: u32,
    /// Settle delay after toggling the light
    pub light_holdoff_ms: u64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            integration_time_ms: 50,
            gain: 16,
            light_holdoff_ms: 60,
        }
    }
}

/// One (station, color) to audio resource assignment.
///
/// Only the part of `resource` before the first `_` names the file, so
/// several entries may share one clip while keeping descriptive names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackEntry {
    pub station: u8,
    pub resource: String,
    pub label: String,
}

impl PlaybackEntry {
    pub fn file_name(&self) -> String {
        if Path::new(&self.resource).extension().is_some() {
            return self.resource.clone();
        }
        let stem = self.resource.split('_').next().unwrap_or(&self.resource);
        format!("{}.wav", stem)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub resource_dir: PathBuf,
    pub map: Vec<PlaybackEntry>,
}

impl PlaybackConfig {
    /// Entry for (station, label), first match wins.
    pub fn lookup(&self, station: u8, label: &str) -> Option<&PlaybackEntry> {
        self.map
            .iter()
            .find(|entry| entry.station == station && entry.label == label)
    }

    pub fn resource_path(&self, entry: &PlaybackEntry) -> PathBuf {
        self.resource_dir.join(entry.file_name())
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            resource_dir: PathBuf::from("sounds"),
            map: default_map(&default_stations(), &DEFAULT_COLORS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub interval_s: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self { interval_s: 10 }
    }
}

/// Calibration session parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Minimum distance from the previous label's mean before the first
    /// sample of a new label is accepted
    pub change_threshold: f64,
    pub output_dir: PathBuf,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            change_threshold: 300.0,
            output_dir: PathBuf::from("calibration"),
        }
    }
}

pub fn default_stations() -> Vec<StationPattern> {
    vec![
        StationPattern::new([1, 1, 1], 1),
        StationPattern::new([1, 1, 0], 2),
        StationPattern::new([1, 0, 1], 3),
        StationPattern::new([0, 1, 1], 4),
    ]
}

/// Map every station to every color, one clip per (station, color).
pub fn default_map(stations: &[StationPattern], colors: &[ReferenceColor]) -> Vec<PlaybackEntry> {
    let mut map = Vec::with_capacity(stations.len() * colors.len());
    for station in stations {
        for (idx, color) in colors.iter().enumerate() {
            map.push(PlaybackEntry {
                station: station.station,
                resource: format!("{}{:02}_{}", station.station, idx + 1, slug(&color.name)),
                label: color.name.clone(),
            });
        }
    }
    map
}

fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_matches('-').to_string()
}

impl Default for AppConfig {
    /// Default configuration values (fallback if no config file is given)
    fn default() -> Self {
        Self {
            desc: DEFAULT_DESCRIPTION.to_string(),
            detection: DetectionConfig::default(),
            stabilization: StabilizationConfig::default(),
            sensor: SensorConfig::default(),
            colors: default_colors(),
            stations: default_stations(),
            playback: PlaybackConfig::default(),
            telemetry: TelemetryConfig::default(),
            calibration: CalibrationConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    ///
    /// # Returns
    /// * `Ok(AppConfig)` - Parsed configuration; missing sections use defaults
    /// * `Err(ConfigError)` - File unreadable or not valid JSON
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|err| ConfigError::Io {
            path: path.display().to_string(),
            details: err.to_string(),
        })?;
        let config: AppConfig =
            serde_json::from_str(&contents).map_err(|err| ConfigError::Parse {
                path: path.display().to_string(),
                details: err.to_string(),
            })?;
        log::info!("[Config] Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load from `path`, or fall back to defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => {
                log::info!("[Config] Trying to load config file: {:?}", path);
                Self::load_from_file(path)
            }
            None => {
                log::info!("[Config] No config file given. Using defaults.");
                Ok(Self::default())
            }
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).map_err(|err| ConfigError::Parse {
            path: path.display().to_string(),
            details: err.to_string(),
        })?;
        fs::write(path, json).map_err(|err| ConfigError::Io {
            path: path.display().to_string(),
            details: err.to_string(),
        })?;
        log::info!("[Config] Saved configuration to {:?}", path);
        Ok(())
    }

    /// Reject configurations the sensing pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stabilization.stable_count < 2 {
            return Err(ConfigError::Invalid {
                reason: format!(
                    "stable_count has to be at least 2, is {}",
                    self.stabilization.stable_count
                ),
            });
        }

        if self.telemetry.interval_s == 0 {
            return Err(ConfigError::Invalid {
                reason: "telemetry interval_s has to be at least 1".to_string(),
            });
        }

        let mut labels = HashSet::new();
        for color in &self.colors {
            if !labels.insert(color.name.as_str()) {
                return Err(ConfigError::Invalid {
                    reason: format!("duplicate color label '{}'", color.name),
                });
            }
        }

        let width = self.stations.first().map(|s| s.pattern.len());
        let mut ids = HashSet::new();
        let mut patterns = HashSet::new();
        for station in &self.stations {
            if Some(station.pattern.len()) != width {
                return Err(ConfigError::Invalid {
                    reason: format!(
                        "station {} pattern {:?} differs in width from the others",
                        station.station, station.pattern
                    ),
                });
            }
            if station.pattern.iter().any(|bit| *bit > 1) {
                return Err(ConfigError::Invalid {
                    reason: format!(
                        "station {} pattern {:?} may only contain 0 and 1",
                        station.station, station.pattern
                    ),
                });
            }
            if !ids.insert(station.station) {
                return Err(ConfigError::Invalid {
                    reason: format!("duplicate station id {}", station.station),
                });
            }
            if !patterns.insert(station.pattern.as_slice()) {
                return Err(ConfigError::Invalid {
                    reason: format!(
                        "station {} repeats pattern {:?}",
                        station.station, station.pattern
                    ),
                });
            }
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.detection.poll_interval_ms)
    }

    pub fn light_holdoff(&self) -> Duration {
        Duration::from_millis(self.sensor.light_holdoff_ms)
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sensor.integration_time_ms)
    }

    pub fn telemetry_interval(&self) -> Duration {
        Duration::from_secs(self.telemetry.interval_s)
    }

    pub fn station_resolver(&self) -> StationResolver {
        StationResolver::new(self.stations.clone())
    }

    pub fn classifier(&self) -> ColorClassifier {
        ColorClassifier::new(self.colors.clone(), self.stabilization.max_distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("ledsense_config_{}_{}", std::process::id(), name))
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.detection.threshold, 2);
        assert_eq!(config.stabilization.stable_count, 5);
        assert_eq!(config.stabilization.stable_distance, 10.0);
        assert_eq!(config.colors.len(), 30);
        assert_eq!(config.colors[0].name, "RAL 1000 - Grünbeige");
        assert_eq!(config.playback.map.len(), 4 * 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_json_roundtrip() {
        let config = AppConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let parsed: AppConfig =
            serde_json::from_str(r#"{"desc": "bench", "detection": {"threshold": 7}}"#).unwrap();
        assert_eq!(parsed.desc, "bench");
        assert_eq!(parsed.detection.threshold, 7);
        assert_eq!(parsed.detection.poll_interval_ms, 50);
        assert_eq!(parsed.colors.len(), 30);
    }

    #[test]
    fn test_file_roundtrip_and_errors() {
        let path = temp_path("roundtrip.json");
        let mut config = AppConfig::default();
        config.desc = "saved".to_string();
        config.save_to_file(&path).unwrap();
        assert_eq!(AppConfig::load(Some(path.as_path())).unwrap().desc, "saved");
        let _ = fs::remove_file(&path);

        let missing = AppConfig::load_from_file(temp_path("missing.json")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));

        let bad = temp_path("bad.json");
        fs::write(&bad, "{ not json").unwrap();
        assert!(matches!(
            AppConfig::load_from_file(&bad).unwrap_err(),
            ConfigError::Parse { .. }
        ));
        let _ = fs::remove_file(&bad);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.stabilization.stable_count = 1;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.colors.push(config.colors[0].clone());
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.stations.push(StationPattern::new([1, 0], 9));
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.stations[0].pattern = vec![1, 2, 1];
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.stations[1].station = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_telemetry_interval() {
        let mut config = AppConfig::default();
        config.telemetry.interval_s = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_validate_rejects_repeated_station_pattern() {
        let mut config = AppConfig::default();
        config.stations[1].pattern = config.stations[0].pattern.clone();
        match config.validate() {
            Err(ConfigError::Invalid { reason }) => assert!(reason.contains("repeats pattern")),
            other => panic!("expected invalid config, got {:?}", other),
        }
    }

    #[test]
    fn test_resource_file_name_uses_prefix() {
        let entry = PlaybackEntry {
            station: 1,
            resource: "101_ral-1000".to_string(),
            label: "RAL 1000".to_string(),
        };
        assert_eq!(entry.file_name(), "101.wav");

        let explicit = PlaybackEntry {
            resource: "intro.wav".to_string(),
            ..entry
        };
        assert_eq!(explicit.file_name(), "intro.wav");
    }

    #[test]
    fn test_default_map_covers_every_pair() {
        let config = AppConfig::default();
        for station in &config.stations {
            for color in &config.colors {
                assert!(config.playback.lookup(station.station, &color.name).is_some());
            }
        }
        assert_eq!(config.playback.map[0].resource, "101_ral-1000-gr-nbeige");
    }
}
