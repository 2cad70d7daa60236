//! Periodic reporting of the most recent sensor reading.
//!
//! The sensing path records each reading into a [`ReadingMonitor`]; the
//! telemetry worker logs the latest value once per interval and checks the
//! exit signal in small steps so shutdown stays responsive.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::sensor::{ChannelReading, TimeSource};
use crate::signals::ExitSignal;

/// Sub-steps per interval at which the exit signal is checked.
pub const EXIT_CHECKS_PER_INTERVAL: u32 = 100;

/// Latest reading plus a running counter, shared across threads.
#[derive(Clone, Default)]
pub struct ReadingMonitor {
    latest: Arc<Mutex<Option<ChannelReading>>>,
    total: Arc<AtomicU64>,
}

impl ReadingMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, reading: ChannelReading) {
        self.total.fetch_add(1, Ordering::Relaxed);
        match self.latest.lock() {
            Ok(mut latest) => *latest = Some(reading),
            Err(poisoned) => *poisoned.into_inner() = Some(reading),
        }
    }

    pub fn latest(&self) -> Option<ChannelReading> {
        match self.latest.lock() {
            Ok(latest) => *latest,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    pub fn total_readings(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }
}

/// Log the latest reading every `interval` until `exit` is raised.
///
/// Returns the number of log lines emitted.
pub fn run_telemetry_loop(
    monitor: &ReadingMonitor,
    interval: Duration,
    time: &dyn TimeSource,
    exit: &ExitSignal,
) -> u64 {
    let step = (interval / EXIT_CHECKS_PER_INTERVAL).max(Duration::from_millis(1));
    let mut emitted = 0u64;

    tracing::info!("[Telemetry] Started, interval {:?}", interval);
    'outer: loop {
        if exit.is_raised() {
            break;
        }
        let mut waited = Duration::ZERO;
        while waited < interval {
            if exit.is_raised() {
                break 'outer;
            }
            time.sleep(step);
            waited += step;
        }

        match monitor.latest() {
            Some(reading) => tracing::info!(
                "[Telemetry] RGBC: [{}, {}, {}, {}] ({} readings)",
                reading.r,
                reading.g,
                reading.b,
                reading.c,
                monitor.total_readings()
            ),
            None => tracing::info!("[Telemetry] No reading yet"),
        }
        emitted += 1;
    }
    tracing::info!("[Telemetry] Stopped after {} reports", emitted);
    emitted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::StubTimeSource;

    /// Time source that raises the exit signal after a fixed virtual span.
    struct ExpiringTime {
        inner: StubTimeSource,
        limit: Duration,
        exit: ExitSignal,
    }

    impl TimeSource for ExpiringTime {
        fn now(&self) -> std::time::Instant {
            self.inner.now()
        }

        fn sleep(&self, duration: Duration) {
            self.inner.sleep(duration);
            if self.inner.elapsed() >= self.limit {
                self.exit.raise();
            }
        }
    }

    #[test]
    fn test_monitor_keeps_latest() {
        let monitor = ReadingMonitor::new();
        assert_eq!(monitor.latest(), None);
        monitor.record(ChannelReading::new(1, 2, 3, 4));
        monitor.record(ChannelReading::new(5, 6, 7, 8));
        assert_eq!(monitor.latest(), Some(ChannelReading::new(5, 6, 7, 8)));
        assert_eq!(monitor.total_readings(), 2);
    }

    #[test]
    fn test_loop_reports_once_per_interval() {
        let exit = ExitSignal::new();
        let time = ExpiringTime {
            inner: StubTimeSource::new(),
            limit: Duration::from_millis(3500),
            exit: exit.clone(),
        };
        let monitor = ReadingMonitor::new();
        monitor.record(ChannelReading::new(1, 1, 1, 1));

        let emitted = run_telemetry_loop(&monitor, Duration::from_secs(1), &time, &exit);
        assert_eq!(emitted, 3);
    }

    #[test]
    fn test_loop_exits_immediately_when_raised() {
        let exit = ExitSignal::new();
        exit.raise();
        let time = StubTimeSource::new();
        let emitted = run_telemetry_loop(&ReadingMonitor::new(), Duration::from_secs(10), &time, &exit);
        assert_eq!(emitted, 0);
        assert_eq!(time.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_zero_interval_still_honours_exit() {
        let exit = ExitSignal::new();
        exit.raise();
        let time = StubTimeSource::new();
        let emitted = run_telemetry_loop(&ReadingMonitor::new(), Duration::ZERO, &time, &exit);
        assert_eq!(emitted, 0);
    }
}
