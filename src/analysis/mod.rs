// Analysis module - sensing and decision pipeline
//
// Raw readings flow through the presence detector and the stable sampler into
// the classifier. The calibration engine reuses the first two stages and
// replaces classification with accumulation.
//
// Also hosts the diagnostics that only need color math: the color table
// self-analysis and the light toggle probe.

pub mod classifier;
pub mod color;
pub mod color_report;
pub mod presence;
pub mod probe;
pub mod stability;

pub use classifier::{classify, nearest, ColorClassifier, ColorMatch};
pub use color::{median, std_dev, ReferenceColor, Rgb, ScalarStats};
pub use presence::PresenceDetector;
pub use stability::StableColorSampler;
