use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use super::ScriptFormat;
use crate::builder::tweaks;
use crate::config::UnattendConfig;

pub fn run(config_path: &Path, format: ScriptFormat, output: Option<PathBuf>) -> Result<()> {
    let text = std::fs::read_to_string(config_path)
        .with_context(|| format!("file could not be read: {}", config_path.display()))?;
    let config: UnattendConfig =
        serde_json::from_str(&text).context("configuration is invalid JSON")?;

    let script = match format {
        ScriptFormat::Batch => tweaks::batch_script(&config),
        ScriptFormat::Powershell => tweaks::powershell_script(&config),
    };
    if script.is_empty() {
        warn!("no system tweaks selected, script is empty");
    }

    match output {
        Some(path) => {
            std::fs::write(&path, script)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "wrote tweak script");
        }
        None => print!("{script}"),
    }
    Ok(())
}
