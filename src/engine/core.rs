//! Orchestrator: the classify-and-play control loop.
//!
//! One cycle runs AWAIT_OBJECT, ILLUMINATE, STABILIZE_AND_CLASSIFY, DISPATCH
//! and AWAIT_REMOVAL on the calling thread. The audio and telemetry workers
//! are started once per run and checked for liveness before every dispatch.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::analysis::classifier::ColorClassifier;
use crate::audio::AudioBackend;
use crate::config::AppConfig;
use crate::engine::checks::{check_consistency, check_resources};
use crate::engine::pipeline::DetectionPipeline;
use crate::engine::workers::{spawn_telemetry_worker, AudioWorker, WorkerHandle};
use crate::error::{PlaybackError, SensingError};
use crate::sensor::{SensorHandle, SystemTimeSource, TimeSource};
use crate::signals::{ExitSignal, PlaybackSignals, PlaybackSlot};

/// Grace period for each worker to join on shutdown.
pub const JOIN_GRACE: Duration = Duration::from_secs(3);

/// Counters for one orchestrator run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub cycles: u64,
    pub matches: u64,
    pub rejections: u64,
    /// Labels handed to the audio worker, in order
    pub dispatched: Vec<String>,
    /// Requests that replaced one the audio worker had not picked up yet
    pub overwritten: u64,
    /// True when the run ended on the exit signal
    pub cancelled: bool,
}

pub struct Orchestrator {
    station: u8,
    pipeline: DetectionPipeline,
    classifier: ColorClassifier,
    config: AppConfig,
    slot: Arc<PlaybackSlot>,
    signals: PlaybackSignals,
    exit: ExitSignal,
    telemetry_interval: Duration,
    telemetry_time: Arc<dyn TimeSource>,
    join_grace: Duration,
}

impl Orchestrator {
    pub fn new(config: &AppConfig, station: u8, exit: ExitSignal) -> Self {
        Self {
            station,
            pipeline: DetectionPipeline::from_config(config, exit.clone()),
            classifier: config.classifier(),
            config: config.clone(),
            slot: Arc::new(PlaybackSlot::new()),
            signals: PlaybackSignals::new(exit.clone()),
            exit,
            telemetry_interval: config.telemetry_interval(),
            telemetry_time: Arc::new(SystemTimeSource::default()),
            join_grace: JOIN_GRACE,
        }
    }

    pub fn with_join_grace(mut self, grace: Duration) -> Self {
        self.join_grace = grace;
        self
    }

    pub fn station(&self) -> u8 {
        self.station
    }

    /// Run cycles until `max_cycles` is reached or the exit signal is raised.
    ///
    /// The startup checks run first: map mismatches are logged, a missing
    /// audio resource fails the run before any worker starts. Raises exit on
    /// the way out and joins both workers with the grace period.
    pub fn run(
        &mut self,
        sensor: &mut SensorHandle,
        backend: Box<dyn AudioBackend>,
        max_cycles: Option<u64>,
    ) -> Result<RunSummary, PlaybackError> {
        tracing::info!(
            "[Orchestrator] Starting for station {} with max distance {:.1}",
            self.station,
            self.classifier.max_distance()
        );
        self.startup_checks()?;

        let audio = AudioWorker {
            station: self.station,
            playback: self.config.playback.clone(),
            slot: Arc::clone(&self.slot),
            signals: self.signals.clone(),
            backend,
        }
        .spawn()?;
        let telemetry = match spawn_telemetry_worker(
            sensor.monitor().clone(),
            self.telemetry_interval,
            Arc::clone(&self.telemetry_time),
            self.exit.clone(),
        ) {
            Ok(handle) => handle,
            Err(err) => {
                self.shutdown(vec![audio]);
                return Err(err);
            }
        };

        let mut summary = RunSummary::default();
        let result = self.cycle_loop(sensor, &audio, &telemetry, max_cycles, &mut summary);
        self.shutdown(vec![audio, telemetry]);

        match result {
            Ok(()) => Ok(summary),
            Err(PlaybackError::Sensing(SensingError::Cancelled)) => {
                tracing::info!("[Orchestrator] Exit requested, stopping");
                summary.cancelled = true;
                Ok(summary)
            }
            Err(err) => Err(err),
        }
    }

    fn startup_checks(&self) -> Result<(), PlaybackError> {
        let consistency = check_consistency(&self.config);
        if !consistency.is_clean() {
            tracing::warn!(
                "[Orchestrator] Color vs map: {}, map vs color: {}",
                consistency.color_vs_map,
                consistency.map_vs_color
            );
        }
        let resources = check_resources(&self.config)?;
        tracing::info!(
            "[Orchestrator] {} resources checked, {} corrupt",
            resources.checked.len(),
            resources.corrupt.len()
        );
        Ok(())
    }

    fn cycle_loop(
        &mut self,
        sensor: &mut SensorHandle,
        audio: &WorkerHandle,
        telemetry: &WorkerHandle,
        max_cycles: Option<u64>,
        summary: &mut RunSummary,
    ) -> Result<(), PlaybackError> {
        while max_cycles.map_or(true, |max| summary.cycles < max) {
            // AWAIT_OBJECT
            self.pipeline.await_object(sensor)?;
            // ILLUMINATE
            self.pipeline.illuminate(sensor);
            // STABILIZE_AND_CLASSIFY
            let rgb = self.pipeline.stabilize(sensor)?;
            let result = self.classifier.classify(&rgb);

            audio.ensure_alive()?;
            telemetry.ensure_alive()?;

            // DISPATCH
            match result {
                Some(m) => {
                    tracing::info!(
                        "[Orchestrator] {} matches {} (dist {:.1}), playing",
                        rgb,
                        m.name,
                        m.distance
                    );
                    self.signals.stop.clear();
                    if let Some(previous) = self.slot.offer(m.name.clone())? {
                        tracing::debug!("[Orchestrator] Replaced unplayed request {}", previous);
                        summary.overwritten += 1;
                    }
                    summary.matches += 1;
                    summary.dispatched.push(m.name);
                }
                None => {
                    tracing::info!(
                        "[Orchestrator] Max RGB color distance exceeded for {}. Not playing...",
                        rgb
                    );
                    summary.rejections += 1;
                }
            }

            // AWAIT_REMOVAL
            self.pipeline.await_removal(sensor)?;
            self.signals.stop.set();
            summary.cycles += 1;
        }
        Ok(())
    }

    fn shutdown(&self, workers: Vec<WorkerHandle>) {
        self.exit.raise();
        for worker in workers {
            let name = worker.name().to_string();
            if !worker.join_with_grace(self.join_grace) {
                tracing::warn!("[Orchestrator] Leaving {} behind", name);
            }
        }
        tracing::info!("[Orchestrator] Shutdown complete");
    }
}
