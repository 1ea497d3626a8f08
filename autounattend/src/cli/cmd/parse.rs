use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::parser;

pub fn run(xml_path: &Path, output: Option<PathBuf>) -> Result<()> {
    let text = std::fs::read_to_string(xml_path)
        .with_context(|| format!("file could not be read: {}", xml_path.display()))?;
    let config = parser::parse(&text).context("XML is malformed")?;

    let json = serde_json::to_string_pretty(&config)?;
    match output {
        Some(path) => {
            std::fs::write(&path, json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "wrote recovered configuration");
        }
        None => println!("{json}"),
    }
    Ok(())
}
