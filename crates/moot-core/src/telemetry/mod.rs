//! Telemetry domain: per-frame analysis results, gaze history and the
//! coaching suggestion algorithm.

pub mod gateway;
pub mod gaze_history;
pub mod model;
pub mod suggestion;

pub use gateway::{AnalysisGateway, CapturedFrame, FrameSource};
pub use gaze_history::{DEFAULT_GAZE_HISTORY_CAPACITY, GazeHistory};
pub use model::{
    AnalysisPeriod, BackendStatus, EyeAnalysis, FrameAnalysisResult, GazeDirection,
    GazeObservation, GazeResult, SaveAck, SummaryReport,
};
pub use suggestion::{Priority, RenderedSuggestion, Suggestion, SuggestionKind};
