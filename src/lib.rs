// LED Sense Core - color-sensing kiosk
// Presence detection, color stabilization, classification and playback orchestration

// Module declarations
pub mod analysis;
pub mod audio;
pub mod calibration;
pub mod config;
pub mod engine;
pub mod error;
pub mod sensor;
pub mod signals;
pub mod telemetry;

// Re-exports for convenience
pub use analysis::{classify, ColorClassifier, ColorMatch, ReferenceColor, Rgb};
pub use config::AppConfig;
pub use engine::{DetectionPipeline, Orchestrator, RunSummary};
pub use sensor::{ChannelReading, SensorHandle, StationResolver};
pub use signals::{ExitSignal, PlaybackSignals, PlaybackSlot};
