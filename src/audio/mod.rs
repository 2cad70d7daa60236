// Audio module - playback of the clip selected per (station, color)
//
// The audio worker hands a resolved file path to an `AudioBackend`, which
// blocks until the clip is finished or the stop/exit signals cut it short.
// Backends poll the signals at PLAYBACK_POLL_INTERVAL.

use std::path::Path;
use std::time::Duration;

use crate::error::PlaybackError;
use crate::signals::PlaybackSignals;

pub mod stubs;
pub mod wav;

#[cfg(feature = "speaker")]
pub mod speaker;

pub use stubs::{PlayRecord, SimulatedPlayer};
pub use wav::Clip;

#[cfg(feature = "speaker")]
pub use speaker::SpeakerBackend;

/// Cadence at which a playing backend checks the stop and exit signals.
pub const PLAYBACK_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How a playback attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Finished,
    Stopped,
}

/// Plays one audio resource to completion or until halted.
pub trait AudioBackend: Send {
    fn play(
        &mut self,
        path: &Path,
        signals: &PlaybackSignals,
    ) -> Result<PlaybackOutcome, PlaybackError>;
}
