//! The module responsible for writing proposals to disk.
use crate::proposal::Proposal;
use anyhow::{Context, Result, ensure};
use std::fs;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// The root folder in which request-specific output folders will be created
pub const OUTPUT_DIRECTORY_ROOT: &str = "solar_proposal_results";

/// The output file name for the full proposal
const PROPOSAL_FILE_NAME: &str = "proposta.json";

/// The output file name for the yearly projection
const PROJECTION_FILE_NAME: &str = "projecao.csv";

/// The output file name for the seasonal generation curve
const GENERATION_CURVE_FILE_NAME: &str = "curva_geracao.csv";

/// Get the default output directory for the specified request file
pub fn get_output_dir(request_path: &Path) -> Result<PathBuf> {
    let request_name = request_path
        .file_stem()
        .context("Request path has no file name")?
        .to_str()
        .context("Invalid chars in request file name")?;

    Ok([OUTPUT_DIRECTORY_ROOT, request_name].iter().collect())
}

/// Create a new output directory.
///
/// If the directory already exists and is not empty, it is only replaced when `allow_overwrite`
/// is set.
///
/// # Returns
///
/// Whether an existing directory was overwritten
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    let overwrite = if let Ok(mut it) = fs::read_dir(output_dir) {
        if it.next().is_none() {
            // Folder exists and is empty: nothing to do
            return Ok(false);
        }

        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. \
            Please specify a different folder or use the --overwrite option."
        );

        fs::remove_dir_all(output_dir)?;
        true
    } else {
        false
    };

    // Try to create the directory, with parents
    fs::create_dir_all(output_dir)?;

    Ok(overwrite)
}

/// Write a proposal as JSON plus CSV files for the yearly projection and the generation curve
pub fn write_proposal(output_dir: &Path, proposal: &Proposal) -> Result<()> {
    let file_path = output_dir.join(PROPOSAL_FILE_NAME);
    let file = File::create(&file_path)
        .with_context(|| format!("Could not create {}", file_path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), proposal)?;

    let mut writer = csv::Writer::from_path(output_dir.join(PROJECTION_FILE_NAME))?;
    for year in &proposal.projection.years {
        writer.serialize(year)?;
    }
    writer.flush()?;

    let mut writer = csv::Writer::from_path(output_dir.join(GENERATION_CURVE_FILE_NAME))?;
    for month in &proposal.projection.generation_curve {
        writer.serialize(month)?;
    }
    writer.flush()?;

    Ok(())
}
