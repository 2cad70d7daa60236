//! Startup checks run before the first orchestrator cycle.
//!
//! The color table and the playback map are compared in both directions;
//! mismatches are advisory and only counted. Audio resources are validated:
//! a missing file aborts startup, a corrupt one is counted.

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::audio::wav;
use crate::config::AppConfig;
use crate::error::{ConfigError, PlaybackError};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsistencyReport {
    /// Reference colors with no map entry at any station
    pub color_vs_map: usize,
    /// Map entries with an unknown label plus (station, color) pairs
    /// without an entry
    pub map_vs_color: usize,
    pub warnings: Vec<ConfigError>,
}

impl ConsistencyReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Compare reference colors, configured stations and the playback map.
pub fn check_consistency(config: &AppConfig) -> ConsistencyReport {
    let mut report = ConsistencyReport::default();
    let map = &config.playback.map;

    for color in &config.colors {
        if !map.iter().any(|entry| entry.label == color.name) {
            let warning = ConfigError::ConfigurationMismatch {
                detail: format!("color '{}' is not used in the playback map", color.name),
            };
            tracing::warn!("[Checks] {}", warning);
            report.color_vs_map += 1;
            report.warnings.push(warning);
        }
    }

    for entry in map {
        if !config.colors.iter().any(|color| color.name == entry.label) {
            let warning = ConfigError::ConfigurationMismatch {
                detail: format!(
                    "map entry '{}' for station {} uses unknown color '{}'",
                    entry.resource, entry.station, entry.label
                ),
            };
            tracing::warn!("[Checks] {}", warning);
            report.map_vs_color += 1;
            report.warnings.push(warning);
        }
    }

    for station in &config.stations {
        for color in &config.colors {
            if config.playback.lookup(station.station, &color.name).is_none() {
                let warning = ConfigError::ConfigurationMismatch {
                    detail: format!(
                        "station {} has no map entry for color '{}'",
                        station.station, color.name
                    ),
                };
                tracing::warn!("[Checks] {}", warning);
                report.map_vs_color += 1;
                report.warnings.push(warning);
            }
        }
    }

    report
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceReport {
    pub checked: Vec<PathBuf>,
    pub corrupt: Vec<PlaybackError>,
}

/// Validate every distinct audio file referenced by the playback map.
///
/// Fails on the first missing file.
pub fn check_resources(config: &AppConfig) -> Result<ResourceReport, PlaybackError> {
    let paths: BTreeSet<PathBuf> = config
        .playback
        .map
        .iter()
        .map(|entry| config.playback.resource_path(entry))
        .collect();

    let mut report = ResourceReport::default();
    for path in paths {
        match wav::validate(&path) {
            Ok(duration) => {
                tracing::debug!("[Checks] {:?} ok ({:?})", path, duration);
            }
            Err(err @ PlaybackError::MissingResource { .. }) => return Err(err),
            Err(err) => {
                tracing::warn!("[Checks] {}", err);
                report.corrupt.push(err);
            }
        }
        report.checked.push(path);
    }
    Ok(report)
}
