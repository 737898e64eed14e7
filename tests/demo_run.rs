//! Integration tests for the `demo run` command.
use solar_proposal::cli::RunOpts;
use solar_proposal::cli::demo::handle_demo_run_command;
use solar_proposal::settings::Settings;
use std::fs;
use tempfile::tempdir;

/// An integration test for the `demo run` command.
#[test]
fn test_handle_demo_run_command() {
    unsafe { std::env::set_var("SOLAR_PROPOSAL_LOG_LEVEL", "off") };

    let dir = tempdir().unwrap();
    let opts = RunOpts {
        output_dir: Some(dir.path().to_path_buf()),
        overwrite: false,
    };
    handle_demo_run_command("comercial", &opts, Some(Settings::default())).unwrap();

    let projection = fs::read_to_string(dir.path().join("projecao.csv")).unwrap();
    assert_eq!(projection.lines().count(), 26);

    let proposal: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("proposta.json")).unwrap())
            .unwrap();
    assert_eq!(proposal["cliente"], "Padaria Estrela");
    assert!(proposal["projecao"]["meses_payback"].is_u64());
}
