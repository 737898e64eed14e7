//! Provides the main entry point to the program.
use human_panic::{metadata, setup_panic};
use log::error;
use solar_proposal::cli::run_cli;
use solar_proposal::log::is_logger_initialised;

fn main() {
    setup_panic!(metadata!().support("Open an issue with the request file that triggered it."));

    if let Err(err) = run_cli() {
        if is_logger_initialised() {
            error!("{err:?}");
        } else {
            eprintln!("Error: {err:?}");
        }

        // Terminate program, signalling an error
        std::process::exit(1);
    }
}
