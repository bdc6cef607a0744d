use anyhow::{Context, Result};
use colored::Colorize;
use moot_core::config::MootConfig;
use moot_core::persona::PersonaGateway;
use moot_infrastructure::SecretServiceImpl;
use moot_interaction::{AnamPersonaGateway, find_preset};
use std::path::Path;

pub async fn run(config: &MootConfig, config_dir: Option<&Path>, preset: Option<&str>) -> Result<()> {
    let preset_id = preset.unwrap_or(&config.persona.preset);
    let profile = find_preset(preset_id).with_context(|| format!("Unknown persona preset '{preset_id}'"))?;

    let anam = SecretServiceImpl::new(config_dir).resolve_anam().await?;
    let gateway = AnamPersonaGateway::from_settings(anam.api_key, &config.persona, config.timeouts.request())?;

    let token = gateway.issue_session_token(&profile.to_config(None)?).await?;
    println!(
        "{} session token for {}: {}",
        "Issued".green(),
        profile.display_name,
        token.redacted()
    );
    Ok(())
}
