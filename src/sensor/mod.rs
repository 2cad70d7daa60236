//! Sensor capabilities consumed by the sensing pipeline.
//!
//! Register access, I2C transport and GPIO reads live outside this crate; the
//! pipeline only sees the narrow traits below. A [`SensorHandle`] bundles the
//! capabilities a component needs and is passed to it explicitly.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::analysis::color::Rgb;
use crate::telemetry::ReadingMonitor;

pub mod rig;
pub mod scripted;
pub mod station;

pub use rig::SimulatedRig;
pub use scripted::{FixedPattern, NoLight, ScriptedSource};
pub use station::StationResolver;

/// One poll of the four raw intensity channels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelReading {
    pub r: u16,
    pub g: u16,
    pub b: u16,
    pub c: u16,
}

impl ChannelReading {
    pub const fn new(r: u16, g: u16, b: u16, c: u16) -> Self {
        Self { r, g, b, c }
    }

    /// Drop the clear channel.
    pub fn rgb(&self) -> Rgb {
        Rgb::new(self.r as u32, self.g as u32, self.b as u32)
    }
}

impl std::fmt::Display for ChannelReading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "R: {:5} G: {:5} B: {:5} C: {:5}",
            self.r, self.g, self.b, self.c
        )
    }
}

/// Yields raw (r, g, b, c) readings on demand.
pub trait ChannelSource: Send {
    fn read(&mut self) -> ChannelReading;
}

/// Switches the light source used while sampling color.
pub trait Illumination: Send {
    fn set(&mut self, on: bool);
}

/// Reads the fixed-width digital pattern identifying the station.
pub trait StationPatternSource: Send {
    fn read_pattern(&mut self) -> Vec<u8>;
}

/// Trait representing a monotonic time source with a blocking sleep.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// Default time source backed by `Instant::now` and `thread::sleep`.
#[derive(Default)]
pub struct SystemTimeSource {
    _unit: (),
}

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Virtual time source for tests.
///
/// `sleep` returns immediately and advances the virtual clock, so open-ended
/// polling loops can be simulated without real waiting.
pub struct StubTimeSource {
    start: Instant,
    offset_us: AtomicU64,
}

impl StubTimeSource {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            offset_us: AtomicU64::new(0),
        }
    }

    /// Total virtual time slept so far.
    pub fn elapsed(&self) -> Duration {
        Duration::from_micros(self.offset_us.load(Ordering::SeqCst))
    }
}

impl Default for StubTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for StubTimeSource {
    fn now(&self) -> Instant {
        self.start + self.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        self.offset_us
            .fetch_add(duration.as_micros() as u64, Ordering::SeqCst);
    }
}

/// Explicit sensor handle: channel source, light and time source.
///
/// Every reading is recorded in the attached [`ReadingMonitor`] so the
/// telemetry worker can report the latest value.
pub struct SensorHandle {
    source: Box<dyn ChannelSource>,
    light: Box<dyn Illumination>,
    time: Arc<dyn TimeSource>,
    light_holdoff: Duration,
    light_on: Option<bool>,
    monitor: ReadingMonitor,
}

impl SensorHandle {
    pub fn new(
        source: Box<dyn ChannelSource>,
        light: Box<dyn Illumination>,
        time: Arc<dyn TimeSource>,
        light_holdoff: Duration,
    ) -> Self {
        Self {
            source,
            light,
            time,
            light_holdoff,
            light_on: None,
            monitor: ReadingMonitor::new(),
        }
    }

    /// Record readings into a monitor shared with the telemetry worker.
    pub fn with_monitor(mut self, monitor: ReadingMonitor) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn monitor(&self) -> &ReadingMonitor {
        &self.monitor
    }

    pub fn read(&mut self) -> ChannelReading {
        let reading = self.source.read();
        self.monitor.record(reading);
        reading
    }

    pub fn read_rgb(&mut self) -> Rgb {
        self.read().rgb()
    }

    /// Switch the light and wait for the holdoff so the next reading settles.
    pub fn set_light(&mut self, on: bool) {
        self.light.set(on);
        self.light_on = Some(on);
        self.time.sleep(self.light_holdoff);
    }

    /// Last commanded light state, `None` before the first toggle.
    pub fn light_on(&self) -> Option<bool> {
        self.light_on
    }

    pub fn light_holdoff(&self) -> Duration {
        self.light_holdoff
    }

    pub fn set_light_holdoff(&mut self, holdoff: Duration) {
        self.light_holdoff = holdoff;
    }

    pub fn time(&self) -> &Arc<dyn TimeSource> {
        &self.time
    }

    pub fn sleep(&self, duration: Duration) {
        self.time.sleep(duration);
    }
}
