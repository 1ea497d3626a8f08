use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;
use validator::Validate;

use crate::builder;
use crate::config::{ComputerNameMode, UnattendConfig};
use crate::random_computer_name;

pub fn run(config_path: &Path, output: Option<PathBuf>, resolve_computer_name: bool) -> Result<()> {
    let text = std::fs::read_to_string(config_path)
        .with_context(|| format!("file could not be read: {}", config_path.display()))?;
    let mut config: UnattendConfig =
        serde_json::from_str(&text).context("configuration is invalid JSON")?;
    config.validate().context("configuration is invalid")?;

    if resolve_computer_name && config.computer_name_mode == ComputerNameMode::Random {
        config.computer_name_mode = ComputerNameMode::Custom;
        config.computer_name = random_computer_name();
        info!(name = %config.computer_name, "generated computer name");
    }

    let xml = builder::build(&config)?;

    let output = output.unwrap_or_else(|| PathBuf::from("autounattend.xml"));
    std::fs::write(&output, xml)
        .with_context(|| format!("failed to write {}", output.display()))?;
    info!(path = %output.display(), "wrote answer file");
    Ok(())
}
