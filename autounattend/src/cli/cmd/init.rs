use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::config::UnattendConfig;
use crate::config::presets::Preset;

pub fn run(preset: Option<Preset>, output: Option<PathBuf>) -> Result<()> {
    let config = match preset {
        Some(preset) => preset.config(),
        None => UnattendConfig::default(),
    };

    let output = output.unwrap_or_else(|| PathBuf::from("unattend-config.json"));
    if output.exists() {
        bail!("refusing to overwrite {}", output.display());
    }

    let json = serde_json::to_string_pretty(&config)?;
    std::fs::write(&output, json)
        .with_context(|| format!("failed to write {}", output.display()))?;
    info!(path = %output.display(), "wrote configuration");
    Ok(())
}
