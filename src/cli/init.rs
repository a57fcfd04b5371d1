//! Init command - write an example config

use anyhow::{bail, Context, Result};
use console::style;
use hostaudit::config::{CONFIG_FILE_NAME, EXAMPLE_CONFIG};
use std::path::Path;

/// Write `hostaudit.toml` into `dir`, refusing to overwrite
pub(super) fn run(dir: &Path) -> Result<()> {
    let config_path = dir.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        bail!(
            "{} already exists; remove it first to regenerate",
            config_path.display()
        );
    }

    std::fs::write(&config_path, EXAMPLE_CONFIG)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    println!(
        "{} Created {}",
        style("✓").green(),
        style(config_path.display()).cyan()
    );
    Ok(())
}
