//! Loops behind the single-purpose CLI modes.
//!
//! Each loop runs until its optional limit is reached or the exit signal is
//! raised, and reports lines through a sink so the caller decides where the
//! output goes.

use serde::Serialize;

use crate::analysis::classifier::{ColorClassifier, ColorMatch};
use crate::analysis::color::Rgb;
use crate::analysis::probe::ToggleDiagram;
use crate::engine::pipeline::DetectionPipeline;
use crate::error::SensingError;
use crate::sensor::SensorHandle;
use crate::signals::ExitSignal;

/// Light handling of the raw dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightMode {
    On,
    Off,
    /// Three readings lit, three dark, repeated; shown with a position bar
    Toggle,
}

/// Readings per light state in toggle mode.
const TOGGLE_READS: usize = 3;

fn limit_reached(limit: Option<u64>, done: u64) -> bool {
    limit.is_some_and(|max| done >= max)
}

/// Print raw RGBC readings. Returns the number of readings taken.
pub fn run_dump(
    sensor: &mut SensorHandle,
    mode: LightMode,
    limit: Option<u64>,
    exit: &ExitSignal,
    mut sink: impl FnMut(String),
) -> u64 {
    let mut taken = 0u64;
    match mode {
        LightMode::On | LightMode::Off => {
            sensor.set_light(mode == LightMode::On);
            while !exit.is_raised() && !limit_reached(limit, taken) {
                sink(sensor.read().to_string());
                taken += 1;
            }
        }
        LightMode::Toggle => {
            let mut diagram = ToggleDiagram::new(40);
            'outer: loop {
                for on in [true, false] {
                    sensor.set_light(on);
                    for _ in 0..TOGGLE_READS {
                        if exit.is_raised() || limit_reached(limit, taken) {
                            break 'outer;
                        }
                        let reading = sensor.read();
                        diagram.add(reading.r as u32, None);
                        sink(format!("{} | {:<40}", reading, diagram.render()));
                        taken += 1;
                    }
                }
            }
        }
    }
    taken
}

/// Log presence and removal transitions. Returns completed cycles.
pub fn run_detect(
    pipeline: &DetectionPipeline,
    sensor: &mut SensorHandle,
    limit: Option<u64>,
    mut sink: impl FnMut(String),
) -> Result<u64, SensingError> {
    let mut cycles = 0u64;
    while !limit_reached(limit, cycles) {
        let clear = pipeline.await_object(sensor)?;
        sink(format!("Cube detected (clear {})", clear));
        let clear = pipeline.await_removal(sensor)?;
        sink(format!("Cube removed (clear {})", clear));
        cycles += 1;
    }
    Ok(cycles)
}

/// Print stabilized colors continuously with the light on.
pub fn run_stable(
    pipeline: &mut DetectionPipeline,
    sensor: &mut SensorHandle,
    limit: Option<u64>,
    mut sink: impl FnMut(String),
) -> Result<Vec<Rgb>, SensingError> {
    let mut results = Vec::new();
    pipeline.illuminate(sensor);
    while !limit_reached(limit, results.len() as u64) {
        let rgb = pipeline.stabilize(sensor)?;
        sink(format!("RGB: {}", rgb));
        results.push(rgb);
    }
    Ok(results)
}

/// Outcome of one cube in the classification-only mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub rgb: Rgb,
    pub color: Option<ColorMatch>,
}

/// Classify cubes without playback.
pub fn run_classification(
    pipeline: &mut DetectionPipeline,
    classifier: &ColorClassifier,
    sensor: &mut SensorHandle,
    limit: Option<u64>,
    mut sink: impl FnMut(String),
) -> Result<Vec<Classification>, SensingError> {
    let mut results = Vec::new();
    while !limit_reached(limit, results.len() as u64) {
        let (rgb, color) = pipeline.classify_cycle(sensor, classifier)?;
        match &color {
            Some(m) => sink(format!(
                "{} -> {} {} dist {:.1}",
                rgb, m.name, m.reference, m.distance
            )),
            None => sink(format!("{} -> no color within {:.1}", rgb, classifier.max_distance())),
        }
        results.push(Classification { rgb, color });
    }
    Ok(results)
}
