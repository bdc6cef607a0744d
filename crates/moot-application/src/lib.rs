//! Application layer for MOOT.
//!
//! Hosts the two live-session components: the persona `SessionController`
//! and the frame-analysis `TelemetryPipeline`. They share no state.

mod call;
pub mod session_controller;
pub mod telemetry_pipeline;

pub use session_controller::{MESSAGE_QUEUE_LIMIT, SessionController};
pub use telemetry_pipeline::{PipelineSettings, PipelineSnapshot, StartOutcome, TelemetryPipeline};
