//! Deterministic stand-ins for the hardware capabilities.

use std::collections::VecDeque;

use super::{ChannelReading, ChannelSource, Illumination, StationPatternSource};

/// Replays a fixed sequence of readings, then repeats the last one forever.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    queue: VecDeque<ChannelReading>,
    last: ChannelReading,
    served: usize,
}

impl ScriptedSource {
    pub fn new(readings: impl IntoIterator<Item = ChannelReading>) -> Self {
        let queue: VecDeque<ChannelReading> = readings.into_iter().collect();
        let last = queue.back().copied().unwrap_or_default();
        Self {
            queue,
            last,
            served: 0,
        }
    }

    pub fn constant(reading: ChannelReading) -> Self {
        Self::new([reading])
    }

    /// Convenience for RGB-only scripts; the clear channel is left at zero.
    pub fn from_rgb(values: &[[u16; 3]]) -> Self {
        Self::new(
            values
                .iter()
                .map(|v| ChannelReading::new(v[0], v[1], v[2], 0)),
        )
    }

    /// Number of readings handed out so far.
    pub fn served(&self) -> usize {
        self.served
    }
}

impl ChannelSource for ScriptedSource {
    fn read(&mut self) -> ChannelReading {
        self.served += 1;
        match self.queue.pop_front() {
            Some(reading) => {
                self.last = reading;
                reading
            }
            None => self.last,
        }
    }
}

/// Illumination sink for setups without a controllable light.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLight;

impl Illumination for NoLight {
    fn set(&mut self, _on: bool) {}
}

/// Station pattern given up front (CLI flag or test fixture).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedPattern(pub Vec<u8>);

impl StationPatternSource for FixedPattern {
    fn read_pattern(&mut self) -> Vec<u8> {
        self.0.clone()
    }
}
