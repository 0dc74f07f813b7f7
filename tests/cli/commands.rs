use blockfs::config::StorageConfig;
use blockfs::store::persistence::open_repository;
use blockfs::tooling::cli::{Cli, CliContext};
use blockfs::FileSystem;
use clap::Parser;
use std::path::Path;
use tempfile::TempDir;

fn run(workspace: &Path, args: &[&str]) -> Result<String, blockfs::FsError> {
    let mut argv = vec!["blockfs", "--workspace"];
    let ws = workspace.to_str().unwrap();
    argv.push(ws);
    argv.extend_from_slice(args);
    let cli = Cli::try_parse_from(argv).unwrap();
    CliContext::new(cli.workspace.clone(), cli.config.clone(), cli.state.clone())?
        .with_output_format(&cli.format)?
        .execute(&cli.command)
}

fn workspace() -> TempDir {
    let temp = tempfile::tempdir().unwrap();
    std::fs::write(
        temp.path().join("blockfs.toml"),
        "[disk]\ndisk_size = 32\nblock_size = 8\n",
    )
    .unwrap();
    temp
}

fn saved_state(workspace: &Path) -> FileSystem {
    let repo = open_repository(&StorageConfig::default(), workspace).unwrap();
    FileSystem::from_snapshot(repo.load().unwrap().unwrap()).unwrap()
}

#[test]
fn init_refuses_to_overwrite_without_force() {
    let temp = workspace();
    let out = run(temp.path(), &["init"]).unwrap();
    assert!(out.contains("32 blocks"));
    assert!(run(temp.path(), &["init"]).is_err());
    assert!(run(temp.path(), &["init", "--force", "--disk-size", "16"]).is_ok());
    assert_eq!(saved_state(temp.path()).disk().disk_size(), 16);
}

#[test]
fn create_write_and_read_back() {
    let temp = workspace();
    run(temp.path(), &["mkdir", "/docs"]).unwrap();
    run(temp.path(), &["create", "/docs/a.txt", "--content", "hello", "--method", "linked"]).unwrap();
    assert_eq!(run(temp.path(), &["cat", "/docs/a.txt"]).unwrap(), "hello");

    run(temp.path(), &["write", "/docs/a.txt", "--content", "hello, block world"]).unwrap();
    let state = saved_state(temp.path());
    let id = state.resolve_path("/docs/a.txt").unwrap();
    let file = state.node(id).unwrap().as_file().unwrap();
    assert_eq!(file.blocks.len(), 3);
    assert!(state.check_invariants().is_valid());

    let listing = run(temp.path(), &["ls", "/docs", "--format", "json"]).unwrap();
    let entries: serde_json::Value = serde_json::from_str(&listing).unwrap();
    assert_eq!(entries[0]["name"], "a.txt");
    assert_eq!(entries[0]["method"], "linked");
}

#[test]
fn rejected_create_does_not_touch_saved_state() {
    let temp = workspace();
    run(temp.path(), &["create", "a.txt", "--content", "x"]).unwrap();
    let before = saved_state(temp.path());
    let big = "y".repeat(8 * 40);
    let err = run(temp.path(), &["create", "big.txt", "--content", &big]).unwrap_err();
    assert!(err.is_allocation_failure());
    assert_eq!(saved_state(temp.path()), before);
}

#[test]
fn non_empty_folder_needs_confirmation_when_not_interactive() {
    let temp = workspace();
    run(temp.path(), &["mkdir", "docs"]).unwrap();
    run(temp.path(), &["create", "docs/a.txt", "--content", "a"]).unwrap();
    if !std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        assert!(run(temp.path(), &["rm", "docs"]).is_err());
    }
    let out = run(temp.path(), &["rm", "docs", "--yes"]).unwrap();
    assert!(out.contains("2 node(s)"));
    assert_eq!(saved_state(temp.path()).disk_usage().used, 0);
}

#[test]
fn import_keeps_files_that_fit() {
    let temp = workspace();
    let small = temp.path().join("small.txt");
    let large = temp.path().join("large.txt");
    std::fs::write(&small, "tiny").unwrap();
    std::fs::write(&large, vec![b'z'; 8 * 64]).unwrap();

    let out = run(
        temp.path(),
        &["import", "/", small.to_str().unwrap(), large.to_str().unwrap(), "--format", "json"],
    )
    .unwrap();
    let report: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(report["accepted"].as_array().unwrap().len(), 1);
    assert_eq!(report["rejected"].as_array().unwrap().len(), 1);
    assert!(saved_state(temp.path()).resolve_path("/small.txt").is_ok());
}

#[test]
fn validate_reports_and_repairs_tampering() {
    let temp = workspace();
    run(temp.path(), &["create", "a.txt", "--content", "abc"]).unwrap();
    let path = StorageConfig::default().resolve_path(temp.path());
    let mut raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    raw["used_blocks"] = serde_json::json!([0, 31]);
    std::fs::write(&path, raw.to_string()).unwrap();

    let out = run(temp.path(), &["validate", "--format", "json"]).unwrap();
    let report: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(report["valid"], false);

    let out = run(temp.path(), &["validate", "--repair", "--format", "json"]).unwrap();
    let report: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(report["valid"], true);
    assert!(saved_state(temp.path()).check_invariants().is_valid());
}

#[test]
fn config_shows_workspace_overrides() {
    let temp = workspace();
    let out = run(temp.path(), &["config"]).unwrap();
    assert!(out.contains("disk_size = 32"));
    assert!(out.contains("block_size = 8"));
}
