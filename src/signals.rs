//! Shared signals between the sensing loop and the background workers.
//!
//! The control thread is the only writer of the playback request and the stop
//! flag; the exit flag may be raised from anywhere (operator interrupt, run
//! completion) and is never cleared again.
//!
//! The playback request is a single-slot channel: a new request replaces any
//! request the audio worker has not picked up yet, so there is never a backlog.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use crate::error::PlaybackError;

/// Monotonic cooperative cancellation token.
#[derive(Debug, Clone, Default)]
pub struct ExitSignal {
    raised: Arc<AtomicBool>,
}

impl ExitSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal. Raising twice is harmless.
    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }
}

/// Level-triggered request to halt the clip that is currently playing.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    set: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.set.store(true, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.set.store(false, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.set.load(Ordering::SeqCst)
    }
}

/// Flags an audio backend polls while a clip is playing.
#[derive(Debug, Clone, Default)]
pub struct PlaybackSignals {
    pub stop: StopSignal,
    pub exit: ExitSignal,
}

impl PlaybackSignals {
    pub fn new(exit: ExitSignal) -> Self {
        Self {
            stop: StopSignal::new(),
            exit,
        }
    }

    /// True when the current clip has to be cut short.
    pub fn should_halt(&self) -> bool {
        self.stop.is_set() || self.exit.is_raised()
    }
}

/// Overwrite-on-send, take-on-receive slot carrying the label to play.
#[derive(Debug, Default)]
pub struct PlaybackSlot {
    request: Mutex<Option<String>>,
    ready: Condvar,
}

impl PlaybackSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a request, returning the unconsumed request it replaced.
    pub fn offer(&self, label: impl Into<String>) -> Result<Option<String>, PlaybackError> {
        let mut guard = self.request.lock().map_err(|_| poisoned())?;
        let replaced = guard.replace(label.into());
        self.ready.notify_all();
        Ok(replaced)
    }

    /// Take the pending request without blocking.
    pub fn take(&self) -> Result<Option<String>, PlaybackError> {
        let mut guard = self.request.lock().map_err(|_| poisoned())?;
        Ok(guard.take())
    }

    pub fn is_pending(&self) -> bool {
        self.request
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    /// Block until a request arrives or `exit` is raised.
    ///
    /// `poll` bounds how long the exit signal can go unnoticed. Returns
    /// `Ok(None)` once exit is raised.
    pub fn wait_take(
        &self,
        exit: &ExitSignal,
        poll: Duration,
    ) -> Result<Option<String>, PlaybackError> {
        let mut guard = self.request.lock().map_err(|_| poisoned())?;
        loop {
            if exit.is_raised() {
                return Ok(None);
            }
            if let Some(label) = guard.take() {
                return Ok(Some(label));
            }
            let (next, _) = self
                .ready
                .wait_timeout(guard, poll)
                .map_err(|_| poisoned())?;
            guard = next;
        }
    }
}

fn poisoned() -> PlaybackError {
    PlaybackError::LockPoisoned {
        component: "PlaybackSlot".to_string(),
    }
}
