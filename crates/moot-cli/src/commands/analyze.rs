use anyhow::{Context, Result};
use chrono::Utc;
use moot_application::telemetry_pipeline::encode_data_url;
use moot_core::config::MootConfig;
use moot_core::telemetry::suggestion::suggest;
use moot_core::telemetry::{AnalysisGateway, FrameSource, RenderedSuggestion};
use moot_infrastructure::ReplayFrameSource;
use std::path::Path;

use super::utils::{analysis_gateway, print_suggestion};

pub async fn run(config: &MootConfig, image: &Path, save: bool) -> Result<()> {
    if image.is_dir() {
        anyhow::bail!("{} is a directory; use `moot watch` for directories", image.display());
    }
    let source = ReplayFrameSource::from_path(image)?;
    let frame = source
        .capture()
        .await
        .with_context(|| format!("Failed to read {}", image.display()))?;

    let gateway = analysis_gateway(config)?;
    let result = gateway
        .analyze_frame(&encode_data_url(&frame), Utc::now(), save)
        .await?;
    if let Some(error) = &result.error {
        anyhow::bail!("Backend could not analyse the frame: {error}");
    }

    println!("Faces:      {}", result.faces_detected);
    println!("Eyes:       {}", result.eye_analysis.eyes_detected);
    println!("Brightness: {:.0}", result.brightness);
    println!("Emotion:    {}", result.estimated_emotion);
    if let Some(gaze) = &result.eye_analysis.gaze {
        println!(
            "Gaze:       {} (on screen: {}, confidence {:.2})",
            gaze.direction, gaze.is_looking_at_screen, gaze.confidence
        );
    }
    if let Some(saved) = &result.saved_frame {
        println!("Saved as:   {saved}");
    }

    if let Some(suggestion) = suggest(&result, 0) {
        println!();
        print_suggestion(&RenderedSuggestion::new(suggestion, 0));
    }
    Ok(())
}
