use anyhow::Result;
use moot_core::config::MootConfig;
use moot_core::telemetry::AnalysisGateway;

use super::utils::analysis_gateway;

pub async fn run(config: &MootConfig) -> Result<()> {
    let summary = analysis_gateway(config)?.analysis_summary().await?;
    print!("{}", summary.render_text());
    Ok(())
}
