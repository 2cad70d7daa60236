//! Calibration artifact: the persisted result of a session or an analysis.
//!
//! The document shares its top-level keys with `AppConfig` (`desc`,
//! `detection`, `stabilization`, `sensor`, `colors`), so an artifact can be
//! loaded as a configuration directly; the extra keys are ignored there.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::analysis::color::{ReferenceColor, Rgb};
use crate::config::{DetectionConfig, SensorConfig, StabilizationConfig};
use crate::error::CalibrationError;

/// Raw samples of one label. Serialized as `["label", [[r, g, b], ...]]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, Vec<Rgb>)", into = "(String, Vec<Rgb>)")]
pub struct LabelSamples {
    pub label: String,
    pub samples: Vec<Rgb>,
}

impl From<(String, Vec<Rgb>)> for LabelSamples {
    fn from((label, samples): (String, Vec<Rgb>)) -> Self {
        Self { label, samples }
    }
}

impl From<LabelSamples> for (String, Vec<Rgb>) {
    fn from(value: LabelSamples) -> Self {
        (value.label, value.samples)
    }
}

/// Configured reference next to what was measured for one label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelReport {
    pub label: String,
    pub reference: Rgb,
    pub measured: Rgb,
    pub std: [f64; 3],
    /// Distance between reference and measured value
    pub distance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationArtifact {
    pub desc: String,
    pub detection: DetectionConfig,
    pub stabilization: StabilizationConfig,
    pub sensor: SensorConfig,
    /// (label, measured median) in calibration order
    pub colors: Vec<ReferenceColor>,
    /// (label, raw samples), parallel to `colors`
    pub values: Vec<LabelSamples>,
    #[serde(default)]
    pub report: Vec<LabelReport>,
    /// Station the session ran on; absent for combined analysis results
    #[serde(default)]
    pub station: Option<u8>,
}

/// Filesystem-safe timestamp used in artifact names.
pub fn file_timestamp(now: &DateTime<Local>) -> String {
    now.format("%Y-%m-%dT%H-%M-%S").to_string()
}

pub fn session_file_name(now: &DateTime<Local>, station: u8) -> String {
    format!("{}_station_{}.json", file_timestamp(now), station)
}

pub fn combined_file_name(now: &DateTime<Local>) -> String {
    format!("{}_all.json", file_timestamp(now))
}

impl CalibrationArtifact {
    pub fn labels(&self) -> Vec<&str> {
        self.colors.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn load(path: &Path) -> Result<Self, CalibrationError> {
        let contents = fs::read_to_string(path).map_err(|err| CalibrationError::Io {
            path: path.display().to_string(),
            details: err.to_string(),
        })?;
        serde_json::from_str(&contents).map_err(|err| CalibrationError::Serialization {
            path: path.display().to_string(),
            details: err.to_string(),
        })
    }

    /// Write as pretty JSON to `dir/file_name`, creating `dir` if needed.
    pub fn write(&self, dir: &Path, file_name: &str) -> Result<PathBuf, CalibrationError> {
        let io_error = |path: &Path, err: std::io::Error| CalibrationError::Io {
            path: path.display().to_string(),
            details: err.to_string(),
        };
        fs::create_dir_all(dir).map_err(|err| io_error(dir, err))?;

        let path = dir.join(file_name);
        let json =
            serde_json::to_string_pretty(self).map_err(|err| CalibrationError::Serialization {
                path: path.display().to_string(),
                details: err.to_string(),
            })?;
        fs::write(&path, json).map_err(|err| io_error(&path, err))?;
        tracing::info!("[Calibration] Saved {:?}", path);
        Ok(path)
    }
}
