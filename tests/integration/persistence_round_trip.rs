use blockfs::alloc::AllocationMethod;
use blockfs::config::{StorageBackend, StorageConfig};
use blockfs::engine::{CreateRequest, FileSystem};
use blockfs::error::FsError;
use blockfs::store::persistence::open_repository;
use std::fs;

fn populated() -> FileSystem {
    let state = FileSystem::new(64, 16).unwrap();
    let root = state.root();
    let (state, notes) = state.create(&CreateRequest::folder(root, "notes")).unwrap();
    let (state, todo) = state
        .create(&CreateRequest::file(notes, "todo.md", "- write tests\n- ship"))
        .unwrap();
    let (state, _) = state
        .create(
            &CreateRequest::file(root, "chain.bin", vec![9u8; 40])
                .with_method(AllocationMethod::Linked),
        )
        .unwrap();
    let (state, _) = state
        .create(
            &CreateRequest::file(notes, "index.json", "{\"k\": 1}")
                .with_method(AllocationMethod::Indexed),
        )
        .unwrap();
    state.navigate_to(notes).unwrap().open_file(todo).unwrap()
}

#[test]
fn both_backends_restore_identical_state() {
    let temp = tempfile::tempdir().unwrap();
    let original = populated();
    for backend in [StorageBackend::Json, StorageBackend::Sled] {
        let config = StorageConfig {
            backend,
            path: None,
        };
        let repo = open_repository(&config, temp.path()).unwrap();
        repo.save(&original.to_snapshot()).unwrap();
        let restored = FileSystem::from_snapshot(repo.load().unwrap().unwrap()).unwrap();
        assert_eq!(restored, original, "backend {backend:?}");
    }
}

#[test]
fn restored_state_keeps_allocating_fresh_ids() {
    let temp = tempfile::tempdir().unwrap();
    let repo = open_repository(&StorageConfig::default(), temp.path()).unwrap();
    let original = populated();
    repo.save(&original.to_snapshot()).unwrap();

    let restored = FileSystem::from_snapshot(repo.load().unwrap().unwrap()).unwrap();
    let root = restored.root();
    let (restored, id) = restored
        .create(&CreateRequest::file(root, "later.txt", "after reload"))
        .unwrap();
    assert!(original.node(id).is_err());
    assert!(restored.check_invariants().is_valid());
}

#[test]
fn tampered_json_is_rejected_then_repaired() {
    let temp = tempfile::tempdir().unwrap();
    let config = StorageConfig::default();
    let repo = open_repository(&config, temp.path()).unwrap();
    repo.save(&populated().to_snapshot()).unwrap();

    let path = config.resolve_path(temp.path());
    let mut raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    raw["used_blocks"] = serde_json::json!([0, 63]);
    fs::write(&path, serde_json::to_string(&raw).unwrap()).unwrap();

    let snapshot = repo.load().unwrap().unwrap();
    assert!(matches!(
        FileSystem::from_snapshot(snapshot.clone()),
        Err(FsError::CorruptState(_))
    ));
    let (repaired, report) = FileSystem::from_snapshot_repaired(snapshot).unwrap();
    assert!(!report.is_clean());
    assert!(repaired.check_invariants().is_valid());
    assert!(!repaired.disk().is_used(63));
}
