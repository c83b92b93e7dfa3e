//! Config command: print the effective settings
use crate::Settings;
use anyhow::{Context, Result};

/// Print `settings` as TOML on stdout.
pub fn config(settings: &Settings) -> Result<()> {
    print!("{}", render(settings)?);
    Ok(())
}

fn render(settings: &Settings) -> Result<String> {
    toml::to_string(settings).context("Failed to serialize settings")
}
