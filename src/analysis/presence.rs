//! Presence detection from the clear channel.
//!
//! A covered sensor sees almost no ambient light, so the clear channel drops
//! below the threshold while a cube sits on it. The caller owns the light
//! state; the detector only polls.

use std::time::Duration;

use crate::error::SensingError;
use crate::sensor::SensorHandle;
use crate::signals::ExitSignal;

/// Polls the sensor until the clear channel crosses a threshold.
#[derive(Debug, Clone)]
pub struct PresenceDetector {
    poll_interval: Duration,
    exit: Option<ExitSignal>,
}

impl PresenceDetector {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            exit: None,
        }
    }

    /// Leave the polling loops with `Cancelled` once `exit` is raised.
    pub fn with_exit(mut self, exit: ExitSignal) -> Self {
        self.exit = Some(exit);
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Block until clear < `threshold`; returns that clear value.
    pub fn await_presence(
        &self,
        sensor: &mut SensorHandle,
        threshold: u16,
    ) -> Result<u16, SensingError> {
        self.poll_until(sensor, |c| c < threshold)
    }

    /// Block until clear > `threshold`; returns that clear value.
    pub fn await_absence(
        &self,
        sensor: &mut SensorHandle,
        threshold: u16,
    ) -> Result<u16, SensingError> {
        self.poll_until(sensor, |c| c > threshold)
    }

    fn poll_until(
        &self,
        sensor: &mut SensorHandle,
        done: impl Fn(u16) -> bool,
    ) -> Result<u16, SensingError> {
        loop {
            if self.exit.as_ref().is_some_and(ExitSignal::is_raised) {
                return Err(SensingError::Cancelled);
            }
            let c = sensor.read().c;
            if done(c) {
                return Ok(c);
            }
            sensor.sleep(self.poll_interval);
        }
    }
}
