//! File-backed capture sources.
//!
//! `ReplayFrameSource` replays still images from disk in name order, looping
//! at the end. It stands in for a camera in headless runs and tests.

use async_trait::async_trait;
use moot_core::error::{MootError, Result};
use moot_core::telemetry::{CapturedFrame, FrameSource};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

const SUPPORTED_EXTENSIONS: [(&str, &str); 3] = [
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
];

pub struct ReplayFrameSource {
    frames: Vec<PathBuf>,
    next: AtomicUsize,
    live: AtomicBool,
}

impl ReplayFrameSource {
    /// Builds a source from a single image or a directory of images.
    ///
    /// Unsupported files in a directory are ignored. An empty directory gives
    /// a source that is not live.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let frames = if path.is_dir() {
            let mut frames: Vec<PathBuf> = std::fs::read_dir(path)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && mime_for(p).is_some())
                .collect();
            frames.sort();
            frames
        } else if mime_for(path).is_some() {
            vec![path.to_path_buf()]
        } else {
            return Err(MootError::capture(format!(
                "Unsupported frame file: {}",
                path.display()
            )));
        };

        tracing::debug!(target: "telemetry", "Replay source with {} frame(s) from {}", frames.len(), path.display());
        let live = !frames.is_empty();
        Ok(Self {
            frames,
            next: AtomicUsize::new(0),
            live: AtomicBool::new(live),
        })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Marks the source as ended; it stops reporting live.
    pub fn close(&self) {
        self.live.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl FrameSource for ReplayFrameSource {
    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst) && !self.frames.is_empty()
    }

    async fn capture(&self) -> Result<CapturedFrame> {
        if !self.is_live() {
            return Err(MootError::NoCaptureSource(
                "replay source is closed or empty".to_string(),
            ));
        }
        let index = self.next.fetch_add(1, Ordering::SeqCst) % self.frames.len();
        let path = &self.frames[index];
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            MootError::capture(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let mime_type = mime_for(path).unwrap_or("application/octet-stream");
        Ok(CapturedFrame {
            mime_type: mime_type.to_string(),
            bytes,
        })
    }
}

fn mime_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    SUPPORTED_EXTENSIONS
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
}
