//! Analysis backend and capture source traits.

use chrono::{DateTime, Utc};

use super::model::{BackendStatus, FrameAnalysisResult, SaveAck, SummaryReport};
use crate::error::Result;

/// The remote frame-analysis service.
#[async_trait::async_trait]
pub trait AnalysisGateway: Send + Sync {
    /// Analyses one encoded frame. `save_frame` asks the backend to keep it.
    async fn analyze_frame(
        &self,
        frame_base64: &str,
        timestamp: DateTime<Utc>,
        save_frame: bool,
    ) -> Result<FrameAnalysisResult>;

    /// Asks the backend to persist everything analysed so far.
    async fn save_analysis(&self) -> Result<SaveAck>;

    async fn analysis_summary(&self) -> Result<SummaryReport>;

    async fn status(&self) -> Result<BackendStatus>;
}

/// An encoded still captured from the local video source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedFrame {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl CapturedFrame {
    pub fn jpeg(bytes: Vec<u8>) -> Self {
        Self {
            mime_type: "image/jpeg".to_string(),
            bytes,
        }
    }
}

/// A live local capture source (camera, file replay, ...).
#[async_trait::async_trait]
pub trait FrameSource: Send + Sync {
    /// Whether the source is currently producing frames.
    fn is_live(&self) -> bool;

    async fn capture(&self) -> Result<CapturedFrame>;
}
