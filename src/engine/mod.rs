//! Engine module housing the playback orchestration layer.
//!
//! `pipeline` holds the sensing steps, `core` the orchestrator that couples
//! them to the audio and telemetry workers (`workers`), `checks` the startup
//! validation and `diagnostics` the loops of the single-purpose modes.

pub mod checks;
pub mod core;
pub mod diagnostics;
pub mod pipeline;
pub mod shutdown;
pub mod workers;

pub use checks::{check_consistency, check_resources, ConsistencyReport, ResourceReport};
pub use core::{Orchestrator, RunSummary, JOIN_GRACE};
pub use diagnostics::LightMode;
pub use pipeline::DetectionPipeline;
pub use shutdown::install_interrupt_handler;
pub use workers::{AudioWorker, WorkerHandle};
