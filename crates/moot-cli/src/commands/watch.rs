use anyhow::{Result, bail};
use colored::Colorize;
use moot_application::{PipelineSettings, StartOutcome, TelemetryPipeline};
use moot_core::config::MootConfig;
use moot_infrastructure::ReplayFrameSource;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use super::utils::{analysis_gateway, print_suggestion};

pub const DEFAULT_MAX_FAILURES: u64 = 5;

pub async fn run(
    config: &MootConfig,
    dir: &Path,
    period_secs: Option<f64>,
    frames: Option<u64>,
    max_failures: u64,
) -> Result<()> {
    let source = Arc::new(ReplayFrameSource::from_path(dir)?);
    let target = frames.unwrap_or(source.len() as u64);
    let period = match period_secs {
        Some(secs) => Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO),
        None => config.analysis.period(),
    };

    let pipeline = TelemetryPipeline::new(
        Arc::new(analysis_gateway(config)?),
        source.clone(),
        PipelineSettings::from_config(config),
    );

    match pipeline.start(period).await {
        StartOutcome::Started | StartOutcome::AlreadyRunning => {}
        StartOutcome::NoCaptureSource(message) => bail!("{message}"),
        StartOutcome::InvalidPeriod => bail!("Capture period must be greater than zero"),
    }
    println!(
        "Analysing {} frame(s) from {} every {:.1}s. Press Ctrl-C to stop.",
        target,
        dir.display(),
        period.as_secs_f64()
    );

    let mut suggestions = pipeline.subscribe_suggestions();
    let mut status = pipeline.subscribe_status();
    while pipeline.frame_count() < target {
        if pipeline.failed_ticks() >= max_failures {
            eprintln!(
                "{}",
                format!("Giving up after {max_failures} failed analyses.").red()
            );
            break;
        }
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = suggestions.changed() => {
                if changed.is_err() {
                    break;
                }
                if let Some(rendered) = suggestions.borrow_and_update().clone() {
                    print_suggestion(&rendered);
                }
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = status.borrow_and_update().clone();
                if current.is_failure() {
                    eprintln!("{}", current.message.red());
                }
            }
        }
    }

    source.close();
    if let Some(ack) = pipeline.stop().await {
        println!("{} {}", ack.message, ack.filepath.unwrap_or_default());
    }

    let snapshot = pipeline.snapshot().await;
    println!(
        "Processed {} frame(s); {} tick(s) skipped while busy, {} failed.",
        snapshot.frame_count, snapshot.missed_ticks, snapshot.failed_ticks
    );
    if let Some(summary) = pipeline.get_summary().await {
        println!();
        print!("{}", summary.render_text());
    }
    Ok(())
}
