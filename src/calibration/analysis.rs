//! Cross-session calibration analysis.
//!
//! Several session artifacts (usually one per station) are pooled: every
//! label gets a global median over all sessions, then each session's raw
//! samples are classified against those medians. Labels that end up nearest
//! to a different global color point at a miscalibrated sensor or station.

use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Serialize;

use crate::analysis::classifier::nearest;
use crate::analysis::color::{median, std_dev, ReferenceColor, Rgb};
use crate::calibration::artifact::{CalibrationArtifact, LabelSamples};
use crate::error::CalibrationError;

/// Artifact together with the file it came from.
#[derive(Debug, Clone)]
pub struct LoadedArtifact {
    pub path: PathBuf,
    pub artifact: CalibrationArtifact,
}

pub fn load_artifacts(paths: &[PathBuf]) -> Result<Vec<LoadedArtifact>, CalibrationError> {
    if paths.is_empty() {
        return Err(CalibrationError::NoArtifacts);
    }
    paths
        .iter()
        .map(|path| {
            Ok(LoadedArtifact {
                path: path.clone(),
                artifact: CalibrationArtifact::load(path)?,
            })
        })
        .collect()
}

/// Check every artifact carries the same labels in the same order, in both
/// `colors` and `values`, using the first artifact as reference.
pub fn verify_labels(artifacts: &[LoadedArtifact]) -> Result<Vec<String>, CalibrationError> {
    let first = artifacts.first().ok_or(CalibrationError::NoArtifacts)?;
    let labels: Vec<String> = first
        .artifact
        .colors
        .iter()
        .map(|c| c.name.clone())
        .collect();

    for loaded in artifacts {
        let file = loaded.path.display().to_string();
        let incompatible = |reason: String| CalibrationError::IncompatibleArtifact {
            file: file.clone(),
            reason,
        };
        let artifact = &loaded.artifact;
        if artifact.colors.len() != labels.len() {
            return Err(incompatible(format!(
                "color count differs in 'colors' ({} vs {})",
                artifact.colors.len(),
                labels.len()
            )));
        }
        if artifact.values.len() != labels.len() {
            return Err(incompatible(format!(
                "color count differs in 'values' ({} vs {})",
                artifact.values.len(),
                labels.len()
            )));
        }
        for (idx, label) in labels.iter().enumerate() {
            if &artifact.colors[idx].name != label {
                return Err(incompatible(format!(
                    "color differs in 'colors' ({} vs {})",
                    artifact.colors[idx].name, label
                )));
            }
            if &artifact.values[idx].label != label {
                return Err(incompatible(format!(
                    "color differs in 'values' ({} vs {})",
                    artifact.values[idx].label, label
                )));
            }
        }
    }
    Ok(labels)
}

/// Classification result of one label within one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CellStats {
    pub ok: usize,
    pub count: usize,
    /// Residual distances of the samples that matched their own label
    pub distances: Vec<f64>,
}

impl CellStats {
    pub fn avg_distance(&self) -> Option<f64> {
        if self.distances.is_empty() {
            return None;
        }
        Some(self.distances.iter().sum::<f64>() / self.distances.len() as f64)
    }

    pub fn max_distance(&self) -> Option<f64> {
        self.distances.iter().copied().reduce(f64::max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mismatch {
    pub station: Option<u8>,
    /// Label the sample was recorded for
    pub intended: String,
    /// Label whose global median is nearest
    pub actual: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub files: Vec<PathBuf>,
    pub stations: Vec<Option<u8>>,
    /// Global median per label over every session
    pub global: Vec<ReferenceColor>,
    pub global_std: Vec<[f64; 3]>,
    pub pooled: Vec<LabelSamples>,
    /// `cells[label][session]`
    pub cells: Vec<Vec<CellStats>>,
    pub mismatches: Vec<Mismatch>,
}

pub fn analyse(artifacts: &[LoadedArtifact]) -> Result<AnalysisReport, CalibrationError> {
    let labels = verify_labels(artifacts)?;
    tracing::info!("[CalAnalysis] {} files share {} colors", artifacts.len(), labels.len());

    let mut global = Vec::with_capacity(labels.len());
    let mut global_std = Vec::with_capacity(labels.len());
    let mut pooled = Vec::with_capacity(labels.len());
    for (idx, label) in labels.iter().enumerate() {
        let samples: Vec<Rgb> = artifacts
            .iter()
            .flat_map(|loaded| loaded.artifact.values[idx].samples.iter().copied())
            .collect();
        let Some(center) = median(&samples) else {
            return Err(CalibrationError::InsufficientSamples {
                label: label.clone(),
                required: 1,
                collected: 0,
            });
        };
        global.push(ReferenceColor::new(label.clone(), center));
        global_std.push(std_dev(&samples));
        pooled.push(LabelSamples {
            label: label.clone(),
            samples,
        });
    }

    let mut cells = Vec::with_capacity(labels.len());
    let mut mismatches = Vec::new();
    for (idx, label) in labels.iter().enumerate() {
        let mut row = Vec::with_capacity(artifacts.len());
        for loaded in artifacts {
            let mut cell = CellStats::default();
            for sample in &loaded.artifact.values[idx].samples {
                cell.count += 1;
                let Some(found) = nearest(sample, &global) else {
                    continue;
                };
                if &found.name == label {
                    cell.ok += 1;
                    cell.distances.push(found.distance);
                } else {
                    mismatches.push(Mismatch {
                        station: loaded.artifact.station,
                        intended: label.clone(),
                        actual: found.name,
                    });
                }
            }
            row.push(cell);
        }
        cells.push(row);
    }

    Ok(AnalysisReport {
        files: artifacts.iter().map(|a| a.path.clone()).collect(),
        stations: artifacts.iter().map(|a| a.artifact.station).collect(),
        global,
        global_std,
        pooled,
        cells,
        mismatches,
    })
}

fn station_name(station: &Option<u8>) -> String {
    station.map_or_else(|| "-".to_string(), |s| s.to_string())
}

impl AnalysisReport {
    /// OK/CNT table, AVG/MAX table and the mismatch list.
    pub fn render(&self) -> String {
        let rule = "*".repeat(80);
        let mut out = String::new();

        out.push_str(&format!("{}\n{:35}", rule, ""));
        for station in &self.stations {
            out.push_str(&format!("{:>9}", station_name(station)));
        }
        out.push_str(&format!("\n{:35}", ""));
        out.push_str(&"   OK/CNT".repeat(self.stations.len()));
        out.push('\n');
        for (color, row) in self.global.iter().zip(&self.cells) {
            out.push_str(&format!("{:>35}", color.name));
            for cell in row {
                out.push_str(&format!("  {:3}/{:3}", cell.ok, cell.count));
            }
            out.push('\n');
        }

        out.push_str(&format!("{}\n{:35}", rule, ""));
        for station in &self.stations {
            out.push_str(&format!("{:>10}", station_name(station)));
        }
        out.push_str(&format!("\n{:35}", ""));
        out.push_str(&"  AVG/ MAX".repeat(self.stations.len()));
        out.push('\n');
        for (color, row) in self.global.iter().zip(&self.cells) {
            out.push_str(&format!("{:>35}", color.name));
            for cell in row {
                let avg = cell
                    .avg_distance()
                    .map_or_else(|| "----".to_string(), |v| format!("{}", v as u64));
                let max = cell
                    .max_distance()
                    .map_or_else(|| "----".to_string(), |v| format!("{}", v as u64));
                out.push_str(&format!(" {:>4}/{:>4}", avg, max));
            }
            out.push('\n');
        }

        out.push_str(&rule);
        out.push('\n');
        for m in &self.mismatches {
            out.push_str(&format!(
                "Station: {:>2}: set: {:>30} - act: {:>30}\n",
                station_name(&m.station),
                m.intended,
                m.actual
            ));
        }
        out
    }

    /// Combined artifact with the global medians, based on the first file's
    /// detection, stabilization and sensor settings.
    pub fn to_artifact(&self, base: &CalibrationArtifact) -> CalibrationArtifact {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        let mut desc = format!(
            "Automatically created with cal analysis routine date: {} ",
            timestamp
        );
        for (idx, file) in self.files.iter().enumerate() {
            desc.push_str(&format!("File {}: '{}', ", idx, file.display()));
        }

        CalibrationArtifact {
            desc,
            detection: base.detection.clone(),
            stabilization: base.stabilization.clone(),
            sensor: base.sensor.clone(),
            colors: self.global.clone(),
            values: self.pooled.clone(),
            report: Vec::new(),
            station: None,
        }
    }
}

/// Load, analyse and write the combined `<timestamp>_all.json` into `out_dir`.
pub fn run_analysis(
    paths: &[PathBuf],
    out_dir: &Path,
) -> Result<(AnalysisReport, PathBuf), CalibrationError> {
    let artifacts = load_artifacts(paths)?;
    let report = analyse(&artifacts)?;
    let combined = report.to_artifact(&artifacts[0].artifact);
    let path = combined.write(
        out_dir,
        &crate::calibration::artifact::combined_file_name(&Local::now()),
    )?;
    Ok((report, path))
}
