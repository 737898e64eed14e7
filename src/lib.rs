//! Sizing, pricing and financial projection for grid-tied solar PV proposals.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod cli;
pub mod config;
pub mod dimensioning;
pub mod error;
pub mod finance;
pub mod input;
pub mod log;
pub mod output;
pub mod projection;
pub mod proposal;
pub mod settings;
pub mod units;

#[cfg(test)]
mod fixture;

/// Get the config folder for the program.
///
/// Falls back to the current directory if the platform has no config folder.
pub fn get_config_dir() -> PathBuf {
    let mut dir = dirs::config_dir().unwrap_or_default();
    dir.push("solar-proposal");
    dir
}
