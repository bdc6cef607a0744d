//! Telemetry wire and domain types.
//!
//! Field names follow the analysis backend's JSON. Missing numeric fields
//! default to zero, matching how the backend's partial error payloads look.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Discretized gaze estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GazeDirection {
    Left,
    Right,
    Up,
    Down,
    Center,
    /// Anything the backend reports outside the known set (e.g. "no_eyes")
    #[serde(other)]
    Unknown,
}

/// Gaze part of one frame analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GazeResult {
    #[serde(rename = "gaze_direction")]
    pub direction: GazeDirection,
    #[serde(default)]
    pub is_looking_at_screen: bool,
    #[serde(default)]
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EyeAnalysis {
    #[serde(default)]
    pub eyes_detected: u32,
    #[serde(rename = "gaze_analysis", default)]
    pub gaze: Option<GazeResult>,
}

/// One server-returned analysis for one captured frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameAnalysisResult {
    /// Backend timestamp (ISO-8601, possibly without offset)
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub faces_detected: u32,
    /// Mean grey level, 0..=255
    #[serde(default)]
    pub brightness: f64,
    #[serde(default = "unknown_emotion")]
    pub estimated_emotion: String,
    #[serde(default)]
    pub eye_analysis: EyeAnalysis,
    /// Set by the backend when the frame could not be decoded or analysed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Path of the persisted frame when `save_frame` was requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_frame: Option<String>,
}

fn unknown_emotion() -> String {
    "unknown".to_string()
}

/// One entry of the rolling gaze history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GazeObservation {
    pub timestamp: Option<String>,
    pub direction: GazeDirection,
    pub is_looking_at_screen: bool,
    pub confidence: f64,
}

impl GazeObservation {
    pub fn from_result(result: &FrameAnalysisResult) -> Option<Self> {
        let gaze = result.eye_analysis.gaze.as_ref()?;
        Some(Self {
            timestamp: result.timestamp.clone(),
            direction: gaze.direction,
            is_looking_at_screen: gaze.is_looking_at_screen,
            confidence: gaze.confidence,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalysisPeriod {
    pub start: Option<String>,
    pub end: Option<String>,
}

/// Aggregate report computed by the backend over every analysed frame.
///
/// Kept as the backend sent it; unknown fields survive in `extra`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SummaryReport {
    /// Present instead of the totals when nothing was analysed yet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub total_frames_analyzed: u64,
    #[serde(default)]
    pub total_faces_detected: u64,
    #[serde(default)]
    pub total_eyes_detected: u64,
    #[serde(default)]
    pub emotion_distribution: BTreeMap<String, u64>,
    #[serde(default)]
    pub gaze_direction_distribution: BTreeMap<String, u64>,
    #[serde(default)]
    pub looking_at_screen_percentage: Option<f64>,
    #[serde(default)]
    pub average_brightness: Option<f64>,
    #[serde(default)]
    pub analysis_period: Option<AnalysisPeriod>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl SummaryReport {
    /// Plain-text rendering used by the CLI.
    pub fn render_text(&self) -> String {
        let mut out = String::from("Analysis Summary:\n\n");
        if let Some(message) = &self.message {
            let _ = writeln!(out, "{message}");
            return out;
        }

        let _ = writeln!(out, "Total Frames: {}", self.total_frames_analyzed);
        let _ = writeln!(out, "Faces Detected: {}", self.total_faces_detected);
        let _ = writeln!(out, "Eyes Detected: {}", self.total_eyes_detected);
        let _ = writeln!(
            out,
            "Looking at Screen: {:.1}%",
            self.looking_at_screen_percentage.unwrap_or(0.0)
        );
        match self.average_brightness {
            Some(brightness) => {
                let _ = writeln!(out, "Average Brightness: {brightness:.0}");
            }
            None => out.push_str("Average Brightness: N/A\n"),
        }

        if !self.gaze_direction_distribution.is_empty() {
            out.push_str("\nGaze Directions:\n");
            for (direction, count) in &self.gaze_direction_distribution {
                let _ = writeln!(out, "{direction}: {count}");
            }
        }

        if !self.emotion_distribution.is_empty() {
            out.push_str("\nEmotion Distribution:\n");
            for (emotion, count) in &self.emotion_distribution {
                let _ = writeln!(out, "{emotion}: {count}");
            }
        }

        out
    }
}

/// Backend acknowledgement of a save request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SaveAck {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub filepath: Option<String>,
}

/// Backend health report.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BackendStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub frames_analyzed: u64,
    #[serde(default)]
    pub processor_ready: bool,
}
