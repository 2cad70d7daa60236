// Calibration procedure - builds the reference color table from live samples
//
// The operator presents every configured color in turn. Each color is
// measured `cycles` times; the median and standard deviation of the accepted
// samples become the new reference. Before the first sample of a new color is
// accepted it has to differ from the previous color's median by more than the
// change threshold, otherwise the operator most likely forgot to swap cubes
// and is asked again.

use chrono::Local;
use serde::Serialize;

use crate::analysis::color::{median, spread, std_dev, ReferenceColor, Rgb};
use crate::calibration::artifact::{CalibrationArtifact, LabelReport, LabelSamples};
use crate::config::AppConfig;
use crate::engine::pipeline::DetectionPipeline;
use crate::error::{CalibrationError, SensingError};
use crate::sensor::{SensorHandle, StationPatternSource};
use crate::signals::ExitSignal;

/// Accepted samples and running statistics for one label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorAccumulator {
    pub label: String,
    pub reference: Rgb,
    pub values: Vec<Rgb>,
    pub median: Rgb,
    pub std: [f64; 3],
}

impl ColorAccumulator {
    pub fn new(color: &ReferenceColor) -> Self {
        Self {
            label: color.name.clone(),
            reference: color.rgb,
            values: Vec::new(),
            median: Rgb::default(),
            std: [0.0; 3],
        }
    }

    pub fn record(&mut self, rgb: Rgb) {
        self.values.push(rgb);
        self.median = median(&self.values).unwrap_or(rgb);
        self.std = std_dev(&self.values);
    }
}

/// Progress information after an accepted sample
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationProgress {
    pub label: String,
    /// 1-based number of the accepted sample
    pub cycle: usize,
    pub cycles: usize,
    pub rgb: Rgb,
    /// Distance to the configured reference
    pub dist_reference: f64,
    /// Distance to the median before this sample
    pub dist_median: f64,
}

/// What happened to a submitted sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SampleDecision {
    Recorded(CalibrationProgress),
    /// Too close to the previous label's median; the cube was probably not
    /// swapped. Nothing was recorded.
    NotSwapped { label: String, distance: f64 },
    /// Every label already has all its samples
    Complete,
}

/// Operator interaction during a session.
pub trait OperatorPrompt {
    /// Ask for the cube of `label` to be placed.
    fn present(&mut self, label: &str);
    /// A stable color was read, the cube may be removed.
    fn remove(&mut self);
    fn progress(&mut self, progress: &CalibrationProgress);
    /// The cube looks like the previous color.
    fn wrong_color(&mut self, label: &str, distance: f64);
}

/// Prompt that only logs; for unattended and simulated sessions.
#[derive(Debug, Default)]
pub struct LogPrompt;

impl OperatorPrompt for LogPrompt {
    fn present(&mut self, label: &str) {
        tracing::info!("[Calibration] Put color {} on detector", label);
    }

    fn remove(&mut self) {
        tracing::info!("[Calibration] Remove cube");
    }

    fn progress(&mut self, p: &CalibrationProgress) {
        tracing::info!(
            "[Calibration] {:<15} Distances: Config {:.0}, Median {:.0} ({} of {})",
            p.label,
            p.dist_reference,
            p.dist_median,
            p.cycle,
            p.cycles
        );
    }

    fn wrong_color(&mut self, label: &str, distance: f64) {
        tracing::warn!(
            "[Calibration] Please use the correct color {}, it seems you are still using the old one. Dist: {:.0}",
            label,
            distance
        );
    }
}

/// Sample bookkeeping of one calibration session.
#[derive(Debug, Clone)]
pub struct CalibrationProcedure {
    accumulators: Vec<ColorAccumulator>,
    cycles: usize,
    change_threshold: f64,
    current: usize,
    color_changed: bool,
    first_sample: bool,
    previous_median: Rgb,
}

impl CalibrationProcedure {
    pub fn new(
        colors: &[ReferenceColor],
        cycles: usize,
        change_threshold: f64,
    ) -> Result<Self, CalibrationError> {
        if cycles == 0 {
            return Err(SensingError::InvalidArgument {
                name: "cycles".to_string(),
                reason: "at least one sample per color is required".to_string(),
            }
            .into());
        }
        Ok(Self {
            accumulators: colors.iter().map(ColorAccumulator::new).collect(),
            cycles,
            change_threshold,
            current: 0,
            color_changed: false,
            first_sample: true,
            previous_median: Rgb::default(),
        })
    }

    /// Label currently being calibrated, `None` once complete.
    pub fn current_label(&self) -> Option<&str> {
        self.accumulators
            .get(self.current)
            .map(|acc| acc.label.as_str())
    }

    pub fn is_complete(&self) -> bool {
        self.current >= self.accumulators.len()
    }

    pub fn accumulators(&self) -> &[ColorAccumulator] {
        &self.accumulators
    }

    pub fn submit(&mut self, rgb: Rgb) -> SampleDecision {
        let Some(acc) = self.accumulators.get_mut(self.current) else {
            return SampleDecision::Complete;
        };

        if self.first_sample {
            self.first_sample = false;
            self.color_changed = true;
        } else if !self.color_changed {
            let distance = self.previous_median.distance(&rgb);
            if distance > self.change_threshold {
                self.color_changed = true;
            } else {
                return SampleDecision::NotSwapped {
                    label: acc.label.clone(),
                    distance,
                };
            }
        }

        let dist_reference = acc.reference.distance(&rgb);
        let dist_median = acc.median.distance(&rgb);
        acc.record(rgb);
        let progress = CalibrationProgress {
            label: acc.label.clone(),
            cycle: acc.values.len(),
            cycles: self.cycles,
            rgb,
            dist_reference,
            dist_median,
        };

        if acc.values.len() >= self.cycles {
            self.previous_median = acc.median;
            self.current += 1;
            self.color_changed = false;
        }
        SampleDecision::Recorded(progress)
    }

    /// Build the session artifact. Fails if a label is still short of samples.
    pub fn finish(
        self,
        config: &AppConfig,
        station: u8,
    ) -> Result<CalibrationArtifact, CalibrationError> {
        for acc in &self.accumulators {
            if acc.values.len() < self.cycles {
                return Err(CalibrationError::InsufficientSamples {
                    label: acc.label.clone(),
                    required: self.cycles,
                    collected: acc.values.len(),
                });
            }
        }

        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        let report = self
            .accumulators
            .iter()
            .map(|acc| LabelReport {
                label: acc.label.clone(),
                reference: acc.reference,
                measured: acc.median,
                std: acc.std,
                distance: acc.reference.distance(&acc.median),
            })
            .collect();

        Ok(CalibrationArtifact {
            desc: format!(
                "Automatically created with calibration routine date: {}, station: {}",
                timestamp, station
            ),
            detection: config.detection.clone(),
            stabilization: config.stabilization.clone(),
            sensor: config.sensor.clone(),
            colors: self
                .accumulators
                .iter()
                .map(|acc| ReferenceColor::new(acc.label.clone(), acc.median))
                .collect(),
            values: self
                .accumulators
                .into_iter()
                .map(|acc| LabelSamples {
                    label: acc.label,
                    samples: acc.values,
                })
                .collect(),
            report,
            station: Some(station),
        })
    }
}

/// Run a complete session on the live sensor.
///
/// The station is resolved before any sampling; an unknown pattern aborts
/// the session right away.
pub fn run_session(
    config: &AppConfig,
    sensor: &mut SensorHandle,
    station_source: &mut dyn StationPatternSource,
    prompt: &mut dyn OperatorPrompt,
    cycles: usize,
    exit: ExitSignal,
) -> Result<CalibrationArtifact, CalibrationError> {
    let station = config.station_resolver().read_station(station_source)?;
    tracing::info!(
        "[Calibration] Station {}, detection threshold {}, stable count {}, stable dist {:.1}",
        station,
        config.detection.threshold,
        config.stabilization.stable_count,
        config.stabilization.stable_distance
    );

    let mut procedure =
        CalibrationProcedure::new(&config.colors, cycles, config.calibration.change_threshold)?;
    let mut pipeline = DetectionPipeline::from_config(config, exit);

    while let Some(label) = procedure.current_label().map(str::to_string) {
        prompt.present(&label);
        while procedure.current_label() == Some(label.as_str()) {
            let rgb = pipeline.measure_cube(sensor)?;
            prompt.remove();
            pipeline.await_removal(sensor)?;

            match procedure.submit(rgb) {
                SampleDecision::Recorded(progress) => prompt.progress(&progress),
                SampleDecision::NotSwapped { label, distance } => {
                    prompt.wrong_color(&label, distance)
                }
                SampleDecision::Complete => break,
            }
        }
    }

    for acc in procedure.accumulators() {
        tracing::info!(
            "[Calibration] {:<35} Distances: Config vs Median {:4.0}, Std {:4.0}",
            acc.label,
            acc.reference.distance(&acc.median),
            spread(&acc.std)
        );
    }
    procedure.finish(config, station)
}
