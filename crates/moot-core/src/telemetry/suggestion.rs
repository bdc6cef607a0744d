//! Coaching suggestion selection.
//!
//! Candidates are collected in a fixed order (faces, eyes/gaze, lighting,
//! court etiquette) and the first candidate of the highest priority present
//! is displayed. Everything here is a pure function of one analysis result
//! and the processed-frame count.

use serde::{Deserialize, Serialize};

use super::model::{FrameAnalysisResult, GazeDirection, GazeResult};

pub const TOO_DARK_BELOW: f64 = 80.0;
pub const TOO_BRIGHT_ABOVE: f64 = 200.0;

/// Rotating etiquette tips, cycled by processed-frame count.
pub const COURT_TIPS: [&str; 8] = [
    "Maintain eye contact with the judge",
    "Keep a neutral, respectful expression",
    "Sit up straight and appear confident",
    "Show respect through body language",
    "Take notes when appropriate",
    "Listen carefully to all proceedings",
    "Keep your eyes on the screen/camera",
    "Maintain professional demeanor",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SuggestionKind {
    Warning,
    Info,
    Success,
    Tip,
}

impl SuggestionKind {
    /// Accent colour used by hint renderers.
    pub fn color(self) -> &'static str {
        match self {
            SuggestionKind::Warning => "#e74c3c",
            SuggestionKind::Info => "#f39c12",
            SuggestionKind::Success => "#27ae60",
            SuggestionKind::Tip => "#3498db",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// A single coaching hint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub kind: SuggestionKind,
    pub message: String,
    pub priority: Priority,
}

impl Suggestion {
    pub fn new(kind: SuggestionKind, message: impl Into<String>, priority: Priority) -> Self {
        Self {
            kind,
            message: message.into(),
            priority,
        }
    }
}

/// What a hint sink receives: the suggestion plus the frame counter it was
/// computed at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedSuggestion {
    pub suggestion: Suggestion,
    pub frames_processed: u64,
    pub color: String,
}

impl RenderedSuggestion {
    pub fn new(suggestion: Suggestion, frames_processed: u64) -> Self {
        let color = suggestion.kind.color().to_string();
        Self {
            suggestion,
            frames_processed,
            color,
        }
    }
}

/// Index into [`COURT_TIPS`] for a frame count.
pub fn tip_index(frame_count: u64) -> usize {
    (frame_count % COURT_TIPS.len() as u64) as usize
}

/// Builds every candidate for one analysis result, in display-precedence order.
pub fn candidates(result: &FrameAnalysisResult, frame_count: u64) -> Vec<Suggestion> {
    let faces = result.faces_detected;
    let brightness = result.brightness;
    let gaze = result.eye_analysis.gaze.as_ref();
    let mut out = Vec::new();

    if faces == 0 {
        out.push(Suggestion::new(
            SuggestionKind::Warning,
            "No face detected - Make sure you're facing the camera",
            Priority::High,
        ));
    } else if faces > 1 {
        out.push(Suggestion::new(
            SuggestionKind::Info,
            "Multiple faces detected - Try to be the only person in frame",
            Priority::Medium,
        ));
    }

    if let Some(gaze) = gaze {
        match result.eye_analysis.eyes_detected {
            0 => out.push(Suggestion::new(
                SuggestionKind::Warning,
                "Eyes not detected - Ensure good lighting and face the camera",
                Priority::High,
            )),
            1 => out.push(Suggestion::new(
                SuggestionKind::Warning,
                "Only one eye visible - Adjust head position",
                Priority::Medium,
            )),
            _ if !gaze.is_looking_at_screen => out.push(Suggestion::new(
                SuggestionKind::Warning,
                format!("Not looking at screen - Gaze direction: {}", gaze.direction),
                Priority::High,
            )),
            _ => out.push(gaze_feedback(gaze.direction)),
        }
    }

    if brightness < TOO_DARK_BELOW {
        out.push(Suggestion::new(
            SuggestionKind::Warning,
            "Too dark - Move to better lighting or turn on lights",
            Priority::High,
        ));
    } else if brightness > TOO_BRIGHT_ABOVE {
        out.push(Suggestion::new(
            SuggestionKind::Warning,
            "Too bright - Avoid direct sunlight or bright lights",
            Priority::Medium,
        ));
    }

    out.extend(court_etiquette(faces, brightness, gaze, frame_count));
    out
}

/// Feedback for a gaze that is on screen.
fn gaze_feedback(direction: GazeDirection) -> Suggestion {
    match direction {
        GazeDirection::Left => Suggestion::new(
            SuggestionKind::Tip,
            "Looking left - Try to look at the center of the screen",
            Priority::Medium,
        ),
        GazeDirection::Right => Suggestion::new(
            SuggestionKind::Tip,
            "Looking right - Try to look at the center of the screen",
            Priority::Medium,
        ),
        GazeDirection::Up => Suggestion::new(
            SuggestionKind::Tip,
            "Looking up - Lower your gaze to the screen",
            Priority::Medium,
        ),
        GazeDirection::Down => Suggestion::new(
            SuggestionKind::Tip,
            "Looking down - Raise your gaze to the screen",
            Priority::Medium,
        ),
        GazeDirection::Center => Suggestion::new(
            SuggestionKind::Success,
            "Perfect! Looking at the screen",
            Priority::Low,
        ),
        GazeDirection::Unknown => Suggestion::new(
            SuggestionKind::Info,
            "Eye direction unclear - Ensure good lighting",
            Priority::Medium,
        ),
    }
}

/// Etiquette candidates, only offered with a face in usable light.
fn court_etiquette(
    faces: u32,
    brightness: f64,
    gaze: Option<&GazeResult>,
    frame_count: u64,
) -> Vec<Suggestion> {
    if faces == 0 || !(TOO_DARK_BELOW..=TOO_BRIGHT_ABOVE).contains(&brightness) {
        return Vec::new();
    }

    let mut out = Vec::with_capacity(2);
    if gaze.is_some_and(|g| g.is_looking_at_screen) {
        out.push(Suggestion::new(
            SuggestionKind::Success,
            "Excellent eye contact - Maintain this focus",
            Priority::Low,
        ));
    }
    out.push(Suggestion::new(
        SuggestionKind::Tip,
        COURT_TIPS[tip_index(frame_count)],
        Priority::Low,
    ));
    out
}

/// First `high`, else first `medium`, else first `low`.
pub fn select(candidates: &[Suggestion]) -> Option<&Suggestion> {
    [Priority::High, Priority::Medium, Priority::Low]
        .into_iter()
        .find_map(|priority| candidates.iter().find(|c| c.priority == priority))
}

/// The suggestion to display for one analysis result.
pub fn suggest(result: &FrameAnalysisResult, frame_count: u64) -> Option<Suggestion> {
    select(&candidates(result, frame_count)).cloned()
}
