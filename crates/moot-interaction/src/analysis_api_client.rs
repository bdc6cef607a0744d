//! HttpAnalysisGateway - client for the frame analysis backend.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use moot_core::config::AnalysisSettings;
use moot_core::error::{MootError, Result};
use moot_core::telemetry::{AnalysisGateway, BackendStatus, FrameAnalysisResult, SaveAck, SummaryReport};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use crate::http::read_json;

#[derive(Clone)]
pub struct HttpAnalysisGateway {
    client: Client,
    base_url: String,
}

impl HttpAnalysisGateway {
    /// Creates a client for the given base URL (e.g. `http://localhost:8003/api`).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_settings(settings: &AnalysisSettings, timeout: Duration) -> Result<Self> {
        Self::new(settings.base_url.clone(), timeout)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

fn transport_error(what: &str, err: reqwest::Error) -> MootError {
    MootError::gateway(
        None,
        format!("{what} request failed: {err}"),
        err.is_connect() || err.is_timeout(),
    )
}

#[async_trait]
impl AnalysisGateway for HttpAnalysisGateway {
    async fn analyze_frame(
        &self,
        frame_base64: &str,
        timestamp: DateTime<Utc>,
        save_frame: bool,
    ) -> Result<FrameAnalysisResult> {
        let body = AnalyzeFrameRequest {
            frame_data: frame_base64,
            timestamp: timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            save_frame,
        };
        let response = self
            .client
            .post(self.url("analyze-frame"))
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error("Analyze frame", e))?;
        read_json(response, "analyze frame").await
    }

    async fn save_analysis(&self) -> Result<SaveAck> {
        let response = self
            .client
            .post(self.url("save-analysis"))
            .send()
            .await
            .map_err(|e| transport_error("Save analysis", e))?;
        read_json(response, "save analysis").await
    }

    async fn analysis_summary(&self) -> Result<SummaryReport> {
        let response = self
            .client
            .get(self.url("analysis-summary"))
            .send()
            .await
            .map_err(|e| transport_error("Analysis summary", e))?;
        read_json(response, "analysis summary").await
    }

    async fn status(&self) -> Result<BackendStatus> {
        let response = self
            .client
            .get(self.url("status"))
            .send()
            .await
            .map_err(|e| transport_error("Status", e))?;
        read_json(response, "status").await
    }
}

#[derive(Serialize)]
struct AnalyzeFrameRequest<'a> {
    frame_data: &'a str,
    timestamp: String,
    save_frame: bool,
}
