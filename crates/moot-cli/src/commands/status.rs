use anyhow::Result;
use colored::Colorize;
use moot_core::config::MootConfig;
use moot_core::telemetry::AnalysisGateway;

use super::utils::analysis_gateway;

pub async fn run(config: &MootConfig) -> Result<()> {
    let gateway = analysis_gateway(config)?;
    let status = gateway.status().await?;

    let ready = if status.processor_ready {
        "ready".green()
    } else {
        "not ready".red()
    };
    println!("Backend:   {}", config.analysis.base_url);
    println!("Status:    {}", status.status);
    println!("Processor: {ready}");
    println!("Frames:    {}", status.frames_analyzed);
    Ok(())
}
