use anyhow::{Context, Result};
use colored::{ColoredString, Colorize};
use moot_core::config::MootConfig;
use moot_core::telemetry::{RenderedSuggestion, SuggestionKind};
use moot_infrastructure::ConfigService;
use moot_interaction::HttpAnalysisGateway;
use std::path::Path;

pub fn load_config(config_dir: Option<&Path>) -> Result<MootConfig> {
    let config = ConfigService::new(config_dir)
        .get_config()
        .context("Failed to load configuration")?;
    tracing::debug!(
        "Persona API {}, analysis backend {}",
        config.persona.base_url,
        config.analysis.base_url
    );
    Ok(config)
}

pub fn analysis_gateway(config: &MootConfig) -> Result<HttpAnalysisGateway> {
    HttpAnalysisGateway::from_settings(&config.analysis, config.timeouts.request())
        .context("Failed to build analysis client")
}

fn paint(kind: SuggestionKind, text: &str) -> ColoredString {
    match kind {
        SuggestionKind::Warning => text.red().bold(),
        SuggestionKind::Info => text.yellow(),
        SuggestionKind::Success => text.green(),
        SuggestionKind::Tip => text.blue(),
    }
}

pub fn print_suggestion(rendered: &RenderedSuggestion) {
    let suggestion = &rendered.suggestion;
    let label = format!("[{} / {}]", suggestion.kind, suggestion.priority);
    println!(
        "{} {}  {}",
        paint(suggestion.kind, &label),
        suggestion.message,
        format!("({} frames processed)", rendered.frames_processed).dimmed()
    );
}
