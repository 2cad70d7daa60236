// Calibration module - reference table measurement and cross-session analysis
//
// This module provides three components:
// 1. CalibrationProcedure: sample bookkeeping and the cube swap check
// 2. CalibrationArtifact: the timestamped result file of a session
// 3. analysis: pools several artifacts and reports per-station accuracy
//
// The calibration workflow:
// 1. Resolve the station (abort if unknown)
// 2. Measure every configured color `cycles` times
// 3. Finish to create the artifact and write it to the output directory

pub mod analysis;
pub mod artifact;
pub mod procedure;

pub use analysis::{analyse, run_analysis, AnalysisReport, LoadedArtifact};
pub use artifact::{session_file_name, CalibrationArtifact, LabelReport, LabelSamples};
pub use procedure::{
    run_session, CalibrationProcedure, CalibrationProgress, LogPrompt, OperatorPrompt,
    SampleDecision,
};
