//! Seeded software rig standing in for sensor, light and cube.
//!
//! Cubes are presented one after another: the rig reports an empty bay for a
//! number of reads, then a covered bay for a number of reads, then moves on
//! to the next cube. Ambient light reaches the clear channel only while the
//! bay is empty; the cube color is visible only while the light is on.

use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::analysis::color::Rgb;

use super::{ChannelReading, ChannelSource, Illumination};

const AMBIENT_CLEAR: u16 = 180;
const COVERED_CLEAR: u16 = 0;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Bay {
    Empty,
    Covered(Rgb),
}

struct RigState {
    rng: StdRng,
    light_on: bool,
    cubes: Vec<Rgb>,
    next_cube: usize,
    bay: Bay,
    reads_in_phase: u32,
    empty_reads: u32,
    covered_reads: u32,
    noise: u32,
}

impl RigState {
    fn advance(&mut self) {
        self.reads_in_phase += 1;
        match self.bay {
            Bay::Empty if self.reads_in_phase > self.empty_reads && !self.cubes.is_empty() => {
                let cube = self.cubes[self.next_cube % self.cubes.len()];
                self.next_cube += 1;
                self.bay = Bay::Covered(cube);
                self.reads_in_phase = 0;
            }
            Bay::Covered(_) if self.reads_in_phase > self.covered_reads => {
                self.bay = Bay::Empty;
                self.reads_in_phase = 0;
            }
            _ => {}
        }
    }

    fn jitter(&mut self, value: u32) -> u16 {
        let noise = self.noise as i64;
        let delta = if noise == 0 {
            0
        } else {
            self.rng.gen_range(-noise..=noise)
        };
        (value as i64 + delta).clamp(0, u16::MAX as i64) as u16
    }

    fn sample(&mut self) -> ChannelReading {
        self.advance();
        match (self.bay, self.light_on) {
            (Bay::Empty, _) => {
                let c = self.jitter(AMBIENT_CLEAR as u32);
                ChannelReading::new(c / 3, c / 3, c / 3, c)
            }
            (Bay::Covered(_), false) => ChannelReading::new(0, 0, 0, COVERED_CLEAR),
            (Bay::Covered(cube), true) => {
                let r = self.jitter(cube.r);
                let g = self.jitter(cube.g);
                let b = self.jitter(cube.b);
                let c = r.saturating_add(g).saturating_add(b);
                ChannelReading::new(r, g, b, c)
            }
        }
    }
}

/// Shared rig; hand out its source and light to a [`super::SensorHandle`].
#[derive(Clone)]
pub struct SimulatedRig {
    state: Arc<Mutex<RigState>>,
}

impl SimulatedRig {
    pub fn new(cubes: Vec<Rgb>, seed: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(RigState {
                rng: StdRng::seed_from_u64(seed),
                light_on: false,
                cubes,
                next_cube: 0,
                bay: Bay::Empty,
                reads_in_phase: 0,
                empty_reads: 20,
                covered_reads: 60,
                noise: 2,
            })),
        }
    }

    /// Reads spent in each phase before the bay changes.
    pub fn with_phase_lengths(self, empty_reads: u32, covered_reads: u32) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.empty_reads = empty_reads;
            state.covered_reads = covered_reads;
        }
        self
    }

    /// Maximum per-channel noise amplitude.
    pub fn with_noise(self, noise: u32) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.noise = noise;
        }
        self
    }

    pub fn source(&self) -> RigSource {
        RigSource {
            state: Arc::clone(&self.state),
        }
    }

    pub fn light(&self) -> RigLight {
        RigLight {
            state: Arc::clone(&self.state),
        }
    }

    /// Number of cubes presented so far.
    pub fn cubes_presented(&self) -> usize {
        self.state.lock().map(|s| s.next_cube).unwrap_or(0)
    }
}

pub struct RigSource {
    state: Arc<Mutex<RigState>>,
}

impl ChannelSource for RigSource {
    fn read(&mut self) -> ChannelReading {
        match self.state.lock() {
            Ok(mut state) => state.sample(),
            Err(poisoned) => poisoned.into_inner().sample(),
        }
    }
}

pub struct RigLight {
    state: Arc<Mutex<RigState>>,
}

impl Illumination for RigLight {
    fn set(&mut self, on: bool) {
        match self.state.lock() {
            Ok(mut state) => state.light_on = on,
            Err(poisoned) => poisoned.into_inner().light_on = on,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_bay_reports_ambient_clear() {
        let rig = SimulatedRig::new(vec![Rgb::new(250, 0, 0)], 7).with_noise(0);
        let mut source = rig.source();
        assert_eq!(source.read().c, AMBIENT_CLEAR);
    }

    #[test]
    fn test_covered_bay_shows_color_only_when_lit() {
        let rig = SimulatedRig::new(vec![Rgb::new(250, 10, 5)], 7)
            .with_noise(0)
            .with_phase_lengths(0, 10);
        let mut source = rig.source();
        let mut light = rig.light();

        let dark = source.read();
        assert_eq!(dark.c, COVERED_CLEAR);
        assert_eq!(dark.rgb(), Rgb::new(0, 0, 0));

        light.set(true);
        assert_eq!(source.read().rgb(), Rgb::new(250, 10, 5));
        assert_eq!(rig.cubes_presented(), 1);
    }

    #[test]
    fn test_same_seed_same_readings() {
        let make = || {
            let rig = SimulatedRig::new(vec![Rgb::new(100, 100, 100)], 42).with_phase_lengths(0, 50);
            rig.light().set(true);
            let mut source = rig.source();
            (0..10).map(|_| source.read()).collect::<Vec<_>>()
        };
        assert_eq!(make(), make());
    }
}
