//! TelemetryPipeline - periodic frame capture and analysis.
//!
//! A single interval timer drives the loop. Each tick captures a frame and
//! dispatches it to the analysis backend; while an analysis is outstanding
//! further ticks are skipped and counted, never queued. Successful results
//! feed the gaze history and replace the displayed suggestion.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use moot_core::config::MootConfig;
use moot_core::error::{MootError, Result};
use moot_core::status::{FailureKind, SessionStatus};
use moot_core::telemetry::suggestion::suggest;
use moot_core::telemetry::{
    AnalysisGateway, CapturedFrame, DEFAULT_GAZE_HISTORY_CAPACITY, FrameAnalysisResult,
    FrameSource, GazeHistory, GazeObservation, RenderedSuggestion, SaveAck, SummaryReport,
};
use tokio::sync::{Mutex, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::call::bounded;

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    /// Every n-th processed frame is flagged `save_frame`
    pub save_every: u64,
    pub gaze_capacity: usize,
    pub request_timeout: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            save_every: 10,
            gaze_capacity: DEFAULT_GAZE_HISTORY_CAPACITY,
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl PipelineSettings {
    pub fn from_config(config: &MootConfig) -> Self {
        Self {
            save_every: config.analysis.save_every,
            request_timeout: config.timeouts.request(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// A loop is already running; nothing changed
    AlreadyRunning,
    /// No live capture source; carries the message shown to the user
    NoCaptureSource(String),
    InvalidPeriod,
}

/// Point-in-time view of the pipeline counters and gaze history.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSnapshot {
    pub is_analyzing: bool,
    pub frame_count: u64,
    pub missed_ticks: u64,
    pub failed_ticks: u64,
    /// Oldest first
    pub gaze_history: Vec<GazeObservation>,
    pub latest_suggestion: Option<RenderedSuggestion>,
}

#[derive(Clone)]
pub struct TelemetryPipeline {
    inner: Arc<Inner>,
}

struct Inner {
    analysis: Arc<dyn AnalysisGateway>,
    source: Arc<dyn FrameSource>,
    settings: PipelineSettings,
    is_analyzing: AtomicBool,
    in_flight: AtomicBool,
    /// Bumped on every start and stop; a response from an older run is dropped
    run_generation: AtomicU64,
    frame_count: AtomicU64,
    missed_ticks: AtomicU64,
    failed_ticks: AtomicU64,
    gaze: Mutex<GazeHistory>,
    poll: Mutex<Option<CancellationToken>>,
    suggestion_tx: watch::Sender<Option<RenderedSuggestion>>,
    status_tx: watch::Sender<SessionStatus>,
}

impl TelemetryPipeline {
    pub fn new(
        analysis: Arc<dyn AnalysisGateway>,
        source: Arc<dyn FrameSource>,
        settings: PipelineSettings,
    ) -> Self {
        let (suggestion_tx, _) = watch::channel(None);
        let (status_tx, _) = watch::channel(SessionStatus::default());
        let gaze = GazeHistory::with_capacity(settings.gaze_capacity);
        Self {
            inner: Arc::new(Inner {
                analysis,
                source,
                settings,
                is_analyzing: AtomicBool::new(false),
                in_flight: AtomicBool::new(false),
                run_generation: AtomicU64::new(0),
                frame_count: AtomicU64::new(0),
                missed_ticks: AtomicU64::new(0),
                failed_ticks: AtomicU64::new(0),
                gaze: Mutex::new(gaze),
                poll: Mutex::new(None),
                suggestion_tx,
                status_tx,
            }),
        }
    }

    pub fn is_analyzing(&self) -> bool {
        self.inner.is_analyzing.load(Ordering::SeqCst)
    }

    pub fn frame_count(&self) -> u64 {
        self.inner.frame_count.load(Ordering::SeqCst)
    }

    pub fn failed_ticks(&self) -> u64 {
        self.inner.failed_ticks.load(Ordering::SeqCst)
    }

    /// Receives the rendered suggestion after every successful analysis.
    pub fn subscribe_suggestions(&self) -> watch::Receiver<Option<RenderedSuggestion>> {
        self.inner.suggestion_tx.subscribe()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SessionStatus> {
        self.inner.status_tx.subscribe()
    }

    pub fn status(&self) -> SessionStatus {
        self.inner.status_tx.borrow().clone()
    }

    pub async fn snapshot(&self) -> PipelineSnapshot {
        let gaze_history = self.inner.gaze.lock().await.to_vec();
        PipelineSnapshot {
            is_analyzing: self.is_analyzing(),
            frame_count: self.frame_count(),
            missed_ticks: self.inner.missed_ticks.load(Ordering::SeqCst),
            failed_ticks: self.failed_ticks(),
            gaze_history,
            latest_suggestion: self.inner.suggestion_tx.borrow().clone(),
        }
    }

    /// Starts the capture loop. The first tick fires one `period` from now.
    pub async fn start(&self, period: Duration) -> StartOutcome {
        if period.is_zero() {
            tracing::warn!(target: "telemetry", "Refusing to start with a zero period");
            return StartOutcome::InvalidPeriod;
        }
        if !self.inner.source.is_live() {
            let message = "No live video source. Start the camera before enabling analysis.";
            tracing::error!(target: "telemetry", "{}", message);
            return StartOutcome::NoCaptureSource(message.to_string());
        }
        // The flag and the token change together under the poll lock
        let mut poll = self.inner.poll.lock().await;
        if self
            .inner
            .is_analyzing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::info!(target: "telemetry", "Analysis already running");
            return StartOutcome::AlreadyRunning;
        }

        let generation = self.inner.run_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = CancellationToken::new();
        if let Some(stale) = poll.replace(cancel.clone()) {
            stale.cancel();
        }
        drop(poll);

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => Arc::clone(&inner).on_tick(generation),
                }
            }
            tracing::debug!(target: "telemetry", "Poll loop {} exited", generation);
        });

        tracing::info!(target: "telemetry", "Analysis started ({:?} period)", period);
        StartOutcome::Started
    }

    /// Stops the loop and asks the backend to persist the run.
    ///
    /// Idempotent: only the call that actually stops a running loop
    /// finalizes. A finalize failure is logged and reported through the
    /// status channel only.
    pub async fn stop(&self) -> Option<SaveAck> {
        {
            let mut poll = self.inner.poll.lock().await;
            if self
                .inner
                .is_analyzing
                .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                tracing::debug!(target: "telemetry", "stop ignored: analysis not running");
                return None;
            }
            self.inner.run_generation.fetch_add(1, Ordering::SeqCst);
            if let Some(cancel) = poll.take() {
                cancel.cancel();
            }
        }
        tracing::info!(target: "telemetry", "Analysis stopped. Processed {} frames.", self.frame_count());

        match bounded(
            "save_analysis",
            self.inner.settings.request_timeout,
            self.inner.analysis.save_analysis(),
        )
        .await
        {
            Ok(ack) => {
                tracing::info!(target: "telemetry", "Analysis saved: {} ({})", ack.message, ack.filepath.as_deref().unwrap_or("-"));
                Some(ack)
            }
            Err(err) => {
                tracing::error!(target: "telemetry", "Error saving analysis: {}", err);
                self.inner.publish(SessionStatus::failure(
                    FailureKind::Finalize,
                    format!("Failed to save analysis: {err}"),
                ));
                None
            }
        }
    }

    /// Fetches the backend's aggregate report as sent.
    pub async fn get_summary(&self) -> Option<SummaryReport> {
        match bounded(
            "analysis_summary",
            self.inner.settings.request_timeout,
            self.inner.analysis.analysis_summary(),
        )
        .await
        {
            Ok(summary) => Some(summary),
            Err(err) => {
                tracing::error!(target: "telemetry", "Error getting summary: {}", err);
                self.inner.publish(SessionStatus::failure(
                    FailureKind::Finalize,
                    format!("Failed to fetch analysis summary: {err}"),
                ));
                None
            }
        }
    }
}

impl Inner {
    fn publish(&self, status: SessionStatus) {
        self.status_tx.send_replace(status);
    }

    fn is_current(&self, generation: u64) -> bool {
        self.is_analyzing.load(Ordering::SeqCst)
            && self.run_generation.load(Ordering::SeqCst) == generation
    }

    fn on_tick(self: Arc<Self>, generation: u64) {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            let missed = self.missed_ticks.fetch_add(1, Ordering::SeqCst) + 1;
            tracing::debug!(target: "telemetry", "Previous analysis still outstanding; tick skipped ({} missed)", missed);
            return;
        }

        tokio::spawn(async move {
            self.run_tick(generation).await;
            self.in_flight.store(false, Ordering::SeqCst);
        });
    }

    async fn run_tick(&self, generation: u64) {
        let save_frame = match self.settings.save_every {
            0 => false,
            n => self.frame_count.load(Ordering::SeqCst) % n == 0,
        };
        let outcome = self.analyze_once(save_frame).await;

        if !self.is_current(generation) {
            tracing::debug!(target: "telemetry", "Discarding analysis that finished after stop");
            return;
        }

        match outcome {
            Ok(result) => self.apply(result).await,
            Err(err) => {
                let failed = self.failed_ticks.fetch_add(1, Ordering::SeqCst) + 1;
                tracing::warn!(target: "telemetry", "Error in frame analysis ({} failed): {}", failed, err);
                self.publish(SessionStatus::failure(
                    FailureKind::AnalysisTick,
                    format!("Frame analysis failed: {err}"),
                ));
            }
        }
    }

    async fn analyze_once(&self, save_frame: bool) -> Result<FrameAnalysisResult> {
        let limit = self.settings.request_timeout;
        let frame = bounded("capture_frame", limit, self.source.capture()).await?;
        let frame_data = encode_data_url(&frame);
        let result = bounded(
            "analyze_frame",
            limit,
            self.analysis.analyze_frame(&frame_data, Utc::now(), save_frame),
        )
        .await?;

        match result.error {
            Some(error) => Err(MootError::gateway(None, error, false)),
            None => Ok(result),
        }
    }

    async fn apply(&self, result: FrameAnalysisResult) {
        let frame_count = self.frame_count.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(observation) = GazeObservation::from_result(&result) {
            tracing::debug!(target: "telemetry", "Gaze {} (on screen: {})", observation.direction, observation.is_looking_at_screen);
            self.gaze.lock().await.push(observation);
        }

        let rendered = suggest(&result, frame_count)
            .map(|suggestion| RenderedSuggestion::new(suggestion, frame_count));
        self.suggestion_tx.send_replace(rendered);
    }
}

/// Encodes a frame the way the analysis backend expects it.
pub fn encode_data_url(frame: &CapturedFrame) -> String {
    format!("data:{};base64,{}", frame.mime_type, STANDARD.encode(&frame.bytes))
}

#[cfg(test)]
#[path = "telemetry_pipeline_test.rs"]
mod tests;
