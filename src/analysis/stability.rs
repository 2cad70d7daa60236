//! Noise-tolerant color stabilization.

use std::time::Duration;

use crate::analysis::color::{median, Rgb};
use crate::error::SensingError;
use crate::sensor::SensorHandle;
use crate::signals::ExitSignal;

/// Largest Euclidean distance between temporally adjacent samples.
pub fn max_consecutive_distance(samples: &[Rgb]) -> f64 {
    samples
        .windows(2)
        .map(|pair| pair[0].distance(&pair[1]))
        .fold(0.0, f64::max)
}

/// Collects runs of RGB samples until one run is internally consistent.
#[derive(Debug, Clone, Default)]
pub struct StableColorSampler {
    sample_interval: Duration,
    exit: Option<ExitSignal>,
    rejected_runs: u64,
}

impl StableColorSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait between single samples (sensor integration time).
    pub fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = interval;
        self
    }

    pub fn with_exit(mut self, exit: ExitSignal) -> Self {
        self.exit = Some(exit);
        self
    }

    /// Runs discarded since construction.
    pub fn rejected_runs(&self) -> u64 {
        self.rejected_runs
    }

    /// Median of the first run of `count` samples whose consecutive distances
    /// all stay within `max_pairwise_distance`.
    ///
    /// Retries without bound; only the exit signal ends the wait early.
    pub fn sample_stable(
        &mut self,
        sensor: &mut SensorHandle,
        count: usize,
        max_pairwise_distance: f64,
    ) -> Result<Rgb, SensingError> {
        if count < 2 {
            return Err(SensingError::InvalidArgument {
                name: "count".to_string(),
                reason: format!("has to be at least 2, is {}", count),
            });
        }

        let mut run = Vec::with_capacity(count);
        loop {
            run.clear();
            for _ in 0..count {
                if self.exit.as_ref().is_some_and(ExitSignal::is_raised) {
                    return Err(SensingError::Cancelled);
                }
                run.push(sensor.read_rgb());
                if !self.sample_interval.is_zero() {
                    sensor.sleep(self.sample_interval);
                }
            }

            let max_dist = max_consecutive_distance(&run);
            if max_dist > max_pairwise_distance {
                self.rejected_runs += 1;
                tracing::debug!(
                    "[StableSampler] Max dist {:.1} over limit {:.1}, restarting",
                    max_dist,
                    max_pairwise_distance
                );
                continue;
            }

            if let Some(stable) = median(&run) {
                return Ok(stable);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::{NoLight, ScriptedSource, StubTimeSource};
    use std::sync::Arc;

    fn sensor(values: &[[u16; 3]]) -> SensorHandle {
        SensorHandle::new(
            Box::new(ScriptedSource::from_rgb(values)),
            Box::new(NoLight),
            Arc::new(StubTimeSource::new()),
            Duration::ZERO,
        )
    }

    #[test]
    fn test_constant_input_returns_exact_value() {
        for count in 2..8 {
            for limit in [0.0, 1.0, 50.0] {
                let mut sensor = sensor(&[[123, 45, 6789]]);
                let mut sampler = StableColorSampler::new();
                let rgb = sampler.sample_stable(&mut sensor, count, limit).unwrap();
                assert_eq!(rgb, Rgb::new(123, 45, 6789));
                assert_eq!(sampler.rejected_runs(), 0);
            }
        }
    }

    #[test]
    fn test_count_below_two_is_invalid() {
        for count in 0..2 {
            let mut sensor = sensor(&[[1, 1, 1]]);
            let err = StableColorSampler::new()
                .sample_stable(&mut sensor, count, 10.0)
                .unwrap_err();
            assert!(matches!(err, SensingError::InvalidArgument { .. }));
        }
    }

    #[test]
    fn test_linear_ramp_within_limit_accepts_first_window() {
        // step 2 per channel: consecutive distance sqrt(12) ~ 3.46
        let values: Vec<[u16; 3]> = (0..5).map(|i| [10 + 2 * i, 20 + 2 * i, 30 + 2 * i]).collect();
        let mut sensor = sensor(&values);
        let mut sampler = StableColorSampler::new();

        let rgb = sampler.sample_stable(&mut sensor, 5, 4.0).unwrap();
        assert_eq!(rgb, Rgb::new(14, 24, 34));
        assert_eq!(sampler.rejected_runs(), 0);
    }

    #[test]
    fn test_capped_ramp_stabilizes_later() {
        // steep ramp of 10 per step, then flat at 60
        let values: Vec<[u16; 3]> = (0..6)
            .map(|i| {
                let v = 10 * i as u16 + 10;
                [v, v, v]
            })
            .collect();
        let mut sensor = sensor(&values);
        let mut sampler = StableColorSampler::new();

        let rgb = sampler.sample_stable(&mut sensor, 3, 5.0).unwrap();
        assert_eq!(rgb, Rgb::new(60, 60, 60));
        assert_eq!(sampler.rejected_runs(), 2);
    }

    #[test]
    fn test_rejected_first_window() {
        // deltas of 6 per channel in the first window exceed the limit of 5
        let mut sensor = sensor(&[[10, 10, 10], [16, 16, 16], [22, 22, 22], [11, 11, 11]]);
        let mut sampler = StableColorSampler::new();

        let rgb = sampler.sample_stable(&mut sensor, 3, 5.0).unwrap();
        assert_eq!(rgb, Rgb::new(11, 11, 11));
        assert_eq!(sampler.rejected_runs(), 1);
    }

    #[test]
    fn test_even_count_median_truncates() {
        let mut sensor = sensor(&[[10, 10, 10], [13, 13, 13]]);
        let rgb = StableColorSampler::new()
            .sample_stable(&mut sensor, 2, 10.0)
            .unwrap();
        assert_eq!(rgb, Rgb::new(11, 11, 11));
    }

    #[test]
    fn test_exit_cancels_unstable_scene() {
        let exit = ExitSignal::new();
        exit.raise();
        let mut sensor = sensor(&[[0, 0, 0]]);
        let err = StableColorSampler::new()
            .with_exit(exit)
            .sample_stable(&mut sensor, 3, 1.0)
            .unwrap_err();
        assert_eq!(err, SensingError::Cancelled);
    }

    #[test]
    fn test_max_consecutive_distance_ignores_non_adjacent() {
        let samples = [Rgb::new(0, 0, 0), Rgb::new(3, 4, 0), Rgb::new(6, 8, 0)];
        assert_eq!(max_consecutive_distance(&samples), 5.0);
    }
}
