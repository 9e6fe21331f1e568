//! Config command implementation.
//!
//! Manages the configuration file.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use graph_tiles_ops::Config;

/// Show the effective configuration.
pub fn show(config: &Config, path: Option<&Path>) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    if let Some(path) = path {
        eprintln!("\nConfig file: {}", path.display());
    }
    Ok(())
}

/// Print where the config file lives.
pub fn path(path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => println!("{}", path.display()),
        None => println!("(no config file path available)"),
    }
    Ok(())
}

/// Write a default configuration file.
pub fn init(path: Option<PathBuf>, force: bool) -> Result<()> {
    let Some(path) = path.or_else(Config::config_file_path) else {
        bail!("No config file path available; pass --config");
    };
    if path.exists() && !force {
        bail!(
            "Config file {} already exists. Use --force to overwrite",
            path.display()
        );
    }

    Config::default()
        .save_to(&path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}
