//! Detection pipeline: the sensing steps shared by every operating mode.
//!
//! Light handling lives here: the light is off while waiting for a cube or
//! for its removal (the covered sensor must go dark) and on while the color
//! is sampled.

use crate::analysis::classifier::{ColorClassifier, ColorMatch};
use crate::analysis::color::Rgb;
use crate::analysis::presence::PresenceDetector;
use crate::analysis::stability::StableColorSampler;
use crate::config::AppConfig;
use crate::error::SensingError;
use crate::sensor::SensorHandle;
use crate::signals::ExitSignal;

pub struct DetectionPipeline {
    detector: PresenceDetector,
    sampler: StableColorSampler,
    threshold: u16,
    stable_count: usize,
    stable_distance: f64,
}

impl DetectionPipeline {
    pub fn from_config(config: &AppConfig, exit: ExitSignal) -> Self {
        Self {
            detector: PresenceDetector::new(config.poll_interval()).with_exit(exit.clone()),
            sampler: StableColorSampler::new()
                .with_sample_interval(config.sample_interval())
                .with_exit(exit),
            threshold: config.detection.threshold,
            stable_count: config.stabilization.stable_count,
            stable_distance: config.stabilization.stable_distance,
        }
    }

    /// AWAIT_OBJECT: light off, wait for the clear channel to drop.
    pub fn await_object(&self, sensor: &mut SensorHandle) -> Result<u16, SensingError> {
        sensor.set_light(false);
        let clear = self.detector.await_presence(sensor, self.threshold)?;
        tracing::info!("[Pipeline] Cube detected, clear {}", clear);
        Ok(clear)
    }

    /// ILLUMINATE: light on; the sensor handle applies the holdoff.
    pub fn illuminate(&self, sensor: &mut SensorHandle) {
        sensor.set_light(true);
    }

    pub fn stabilize(&mut self, sensor: &mut SensorHandle) -> Result<Rgb, SensingError> {
        let rgb = self
            .sampler
            .sample_stable(sensor, self.stable_count, self.stable_distance)?;
        tracing::info!("[Pipeline] Stable RGB {}", rgb);
        Ok(rgb)
    }

    /// AWAIT_REMOVAL: light off, wait for ambient light to return.
    pub fn await_removal(&self, sensor: &mut SensorHandle) -> Result<u16, SensingError> {
        sensor.set_light(false);
        let clear = self.detector.await_absence(sensor, self.threshold)?;
        tracing::info!("[Pipeline] Cube removed, clear {}", clear);
        Ok(clear)
    }

    /// Presence, illumination and stabilization in one step.
    pub fn measure_cube(&mut self, sensor: &mut SensorHandle) -> Result<Rgb, SensingError> {
        self.await_object(sensor)?;
        self.illuminate(sensor);
        self.stabilize(sensor)
    }

    /// One complete cycle without playback: measure, classify, wait for removal.
    pub fn classify_cycle(
        &mut self,
        sensor: &mut SensorHandle,
        classifier: &ColorClassifier,
    ) -> Result<(Rgb, Option<ColorMatch>), SensingError> {
        let rgb = self.measure_cube(sensor)?;
        let result = classifier.classify(&rgb);
        match &result {
            Some(m) => tracing::info!(
                "[Pipeline] Color {} (dist {:.1}) for {}",
                m.name,
                m.distance,
                rgb
            ),
            None => tracing::info!("[Pipeline] Max RGB color distance exceeded for {}", rgb),
        }
        self.await_removal(sensor)?;
        Ok((rgb, result))
    }

    pub fn rejected_runs(&self) -> u64 {
        self.sampler.rejected_runs()
    }

    pub fn threshold(&self) -> u16 {
        self.threshold
    }
}
