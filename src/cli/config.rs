//! Code related to CLI interface for inspecting the calculation configuration
use crate::config::CalculationConfig;
use anyhow::{Context, Result};
use clap::Subcommand;

/// Subcommands for the calculation configuration
#[derive(Subcommand)]
pub enum ConfigSubcommands {
    /// Write the default calculation configuration to the console, as TOML
    DumpDefault,
}

impl ConfigSubcommands {
    /// Execute the supplied config subcommand
    pub fn execute(self) -> Result<()> {
        match self {
            Self::DumpDefault => handle_dump_default_command(),
        }
    }
}

/// Handle the `dump-default` command
fn handle_dump_default_command() -> Result<()> {
    let contents = CalculationConfig::default_file_contents()
        .context("Could not convert configuration to TOML")?;
    print!("{contents}");

    Ok(())
}
