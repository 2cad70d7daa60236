//! Light toggle diagnostics: a scaled position bar for raw dumps and the
//! stability-timing probe that shortens the settle delay series by series.

use std::time::Duration;

use serde::Serialize;

use crate::error::SensingError;
use crate::sensor::SensorHandle;
use crate::signals::ExitSignal;

/// Which end of the scale a reading is expected to land on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedBin {
    Low,
    High,
}

/// Tracks the largest value seen so far and renders each new value as a
/// marker on a fixed-width bar.
///
/// Values within `bin` (fraction of the maximum) of either end count as
/// settled; anything in between was read while the light was still
/// changing. A new maximum resets the statistics.
#[derive(Debug, Clone)]
pub struct ToggleDiagram {
    width: usize,
    bin: f64,
    max: u32,
    max_updated: bool,
    last_value: u32,
    count: u32,
    good: u32,
    bad_deviation: Vec<f64>,
}

impl ToggleDiagram {
    pub fn new(width: usize) -> Self {
        Self::with_bin(width, 0.01)
    }

    pub fn with_bin(width: usize, bin: f64) -> Self {
        Self {
            width,
            bin,
            max: 1,
            max_updated: false,
            last_value: 0,
            count: 0,
            good: 0,
            bad_deviation: Vec::new(),
        }
    }

    pub fn add(&mut self, value: u32, expected: Option<ExpectedBin>) {
        self.last_value = value;
        self.count += 1;

        let max = self.max as f64;
        let lower = max * self.bin;
        let upper = max * (1.0 - self.bin);
        let v = value as f64;
        let settled = match expected {
            Some(ExpectedBin::Low) => v < lower,
            Some(ExpectedBin::High) => v > upper,
            None => v < lower || v > upper,
        };
        if settled {
            self.good += 1;
        } else {
            match expected {
                Some(ExpectedBin::Low) => self.bad_deviation.push(v - lower),
                Some(ExpectedBin::High) => self.bad_deviation.push((max - v) - lower),
                None => {}
            }
        }

        if value > self.max {
            self.max = value;
            self.max_updated = true;
            self.reset_stats();
        }
    }

    pub fn reset_stats(&mut self) {
        self.count = 0;
        self.good = 0;
        self.bad_deviation.clear();
    }

    /// Marker for the last value; flags a freshly raised maximum once.
    pub fn render(&mut self) -> String {
        let pos = (self.last_value as f64 / self.max as f64 * self.width as f64).round() as usize;
        let mut line = format!("{}O", " ".repeat(pos));
        if self.max_updated {
            line.push_str(&" ".repeat(self.width.saturating_sub(pos + 2)));
            line.push_str(" !!! Max Updated !!!");
            self.max_updated = false;
        }
        line
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn good_percent(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        100.0 * self.good as f64 / self.count as f64
    }

    pub fn mean_bad_deviation(&self) -> f64 {
        if self.bad_deviation.is_empty() {
            return 0.0;
        }
        self.bad_deviation.iter().sum::<f64>() / self.bad_deviation.len() as f64
    }
}

/// Shape of a stability-timing probe.
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    pub series: u32,
    pub cycles: u32,
    pub repetitions: u32,
    /// Holdoff of the first series; each series multiplies it by `decay`.
    pub initial_holdoff: Duration,
    pub decay: f64,
    pub pause_between_series: Duration,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            series: 10,
            cycles: 20,
            repetitions: 2,
            initial_holdoff: Duration::from_secs(1),
            decay: 0.98,
            pause_between_series: Duration::from_secs(2),
        }
    }
}

impl ProbeSettings {
    /// Readings taken per series: one on and one off phase per cycle.
    pub fn measurements_per_series(&self) -> u64 {
        u64::from(self.cycles)
            .saturating_mul(2)
            .saturating_mul(u64::from(self.repetitions))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SeriesSummary {
    pub holdoff_ms: f64,
    pub count: u32,
    pub good_percent: f64,
    pub bad_deviation: f64,
    pub avg_measurement_ms: f64,
}

/// Toggle the light on and off with a shrinking holdoff and record how many
/// readings already settled into the expected bin.
///
/// Restores the sensor's original holdoff before returning.
pub fn run_speed_probe(
    sensor: &mut SensorHandle,
    settings: &ProbeSettings,
    exit: &ExitSignal,
) -> Result<Vec<SeriesSummary>, SensingError> {
    let original_holdoff = sensor.light_holdoff();
    let result = probe_series(sensor, settings, exit);
    sensor.set_light_holdoff(original_holdoff);
    result
}

fn probe_series(
    sensor: &mut SensorHandle,
    settings: &ProbeSettings,
    exit: &ExitSignal,
) -> Result<Vec<SeriesSummary>, SensingError> {
    let mut diagram = ToggleDiagram::new(40);
    let mut summaries = Vec::with_capacity(settings.series as usize);
    let mut holdoff = settings.initial_holdoff.as_secs_f64();

    for _ in 0..settings.series {
        holdoff *= settings.decay;
        sensor.set_light_holdoff(Duration::from_secs_f64(holdoff));

        let start = sensor.time().now();
        for _ in 0..settings.cycles {
            for (on, expected) in [(true, ExpectedBin::High), (false, ExpectedBin::Low)] {
                if exit.is_raised() {
                    return Err(SensingError::Cancelled);
                }
                sensor.set_light(on);
                for _ in 0..settings.repetitions {
                    let reading = sensor.read();
                    diagram.add(reading.r as u32, Some(expected));
                    tracing::debug!("[Probe] {} | {:<40}", reading, diagram.render());
                }
            }
        }
        let elapsed = sensor.time().now().saturating_duration_since(start);
        let measurements = settings.measurements_per_series().max(1);

        let summary = SeriesSummary {
            holdoff_ms: holdoff * 1000.0,
            count: diagram.count(),
            good_percent: diagram.good_percent(),
            bad_deviation: diagram.mean_bad_deviation(),
            avg_measurement_ms: elapsed.as_secs_f64() * 1000.0 / measurements as f64,
        };
        tracing::info!(
            "[Probe] Holdoff {:.4}ms: {} readings, {:.2}% good, bad dev {:.1}, {:.2}ms each",
            summary.holdoff_ms,
            summary.count,
            summary.good_percent,
            summary.bad_deviation,
            summary.avg_measurement_ms
        );
        summaries.push(summary);
        diagram.reset_stats();
        sensor.sleep(settings.pause_between_series);
    }
    Ok(summaries)
}
