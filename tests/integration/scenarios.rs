use blockfs::alloc::AllocationMethod;
use blockfs::engine::{CreateRequest, FileSystem, Operation, Session};
use blockfs::error::FsError;
use blockfs::types::NodeId;
use std::collections::BTreeSet;

fn used(fs: &FileSystem) -> Vec<u32> {
    fs.disk().used_blocks().iter().copied().collect()
}

/// Five one-byte files on a 5-block disk, then the second and fourth removed.
fn fragmented_five() -> (FileSystem, NodeId) {
    let mut fs = FileSystem::new(5, 1).unwrap();
    let root = fs.root();
    let mut ids = Vec::new();
    for name in ["a", "b", "c", "d", "e"] {
        let (next, id) = fs.create(&CreateRequest::file(root, name, "x")).unwrap();
        fs = next;
        ids.push(id);
    }
    let fs = fs.delete(ids[1]).unwrap().delete(ids[3]).unwrap();
    (fs, root)
}

#[test]
fn contiguous_files_fill_first_runs() {
    let fs = FileSystem::new(10, 10).unwrap();
    let root = fs.root();

    let (fs, a) = fs
        .create(&CreateRequest::file(root, "a.txt", vec![b'a'; 25]))
        .unwrap();
    assert_eq!(fs.node(a).unwrap().as_file().unwrap().blocks, vec![0, 1, 2]);
    assert_eq!(used(&fs), vec![0, 1, 2]);

    let (fs, b) = fs
        .create(&CreateRequest::file(root, "b.txt", vec![b'b'; 15]))
        .unwrap();
    assert_eq!(fs.node(b).unwrap().as_file().unwrap().blocks, vec![3, 4]);
    assert_eq!(used(&fs), vec![0, 1, 2, 3, 4]);
    assert!(fs.check_invariants().is_valid());
}

#[test]
fn fragmented_disk_rejects_contiguous_but_accepts_linked() {
    let (fs, root) = fragmented_five();
    assert_eq!(used(&fs), vec![0, 2, 4]);

    let contiguous = fs.create(&CreateRequest::file(root, "big", "xy"));
    assert_eq!(contiguous.unwrap_err(), FsError::FragmentationFailure { needed: 2 });

    let (fs, linked) = fs
        .create(&CreateRequest::file(root, "big", "xy").with_method(AllocationMethod::Linked))
        .unwrap();
    let file = fs.node(linked).unwrap().as_file().unwrap();
    assert_eq!(file.blocks, vec![1, 3]);
    assert_eq!(file.next_block, Some(1));
    assert_eq!(fs.linked_chain(linked).unwrap(), vec![(1, Some(3)), (3, None)]);
    assert_eq!(fs.disk_usage().free, 0);
}

#[test]
fn indexed_file_reserves_index_block_first() {
    let fs = FileSystem::new(10, 10).unwrap();
    let root = fs.root();
    let (fs, id) = fs
        .create(
            &CreateRequest::file(root, "idx.md", vec![0u8; 20])
                .with_method(AllocationMethod::Indexed),
        )
        .unwrap();
    let file = fs.node(id).unwrap().as_file().unwrap();
    assert_eq!(file.index_block, Some(0));
    assert_eq!(file.blocks, vec![1, 2]);
    assert_eq!(used(&fs), vec![0, 1, 2]);
}

#[test]
fn failed_growth_restores_original_file() {
    let fs = FileSystem::new(4, 10).unwrap();
    let root = fs.root();
    let (fs, small) = fs.create(&CreateRequest::file(root, "s.txt", "short")).unwrap();
    let (fs, _) = fs
        .create(&CreateRequest::file(root, "other.txt", vec![1u8; 20]))
        .unwrap();
    let before_node = fs.node(small).unwrap().clone();
    let before_used = used(&fs);

    let err = fs.update_content(small, &[7u8; 35], None).unwrap_err();
    assert!(err.is_allocation_failure(), "got {err:?}");
    assert_eq!(fs.node(small).unwrap(), &before_node);
    assert_eq!(used(&fs), before_used);

    let mut session = Session::new(fs.clone());
    let op = Operation::UpdateContent {
        node: small,
        content: vec![7u8; 35],
        allocation_method: None,
    };
    assert!(session.apply(&op).is_err());
    assert_eq!(session.state(), &fs);
}

#[test]
fn deleting_a_folder_frees_every_block_below_it() {
    let fs = FileSystem::new(20, 4).unwrap();
    let root = fs.root();
    let (fs, docs) = fs.create(&CreateRequest::folder(root, "docs")).unwrap();
    let (fs, deep) = fs.create(&CreateRequest::folder(docs, "deep")).unwrap();
    let (fs, a) = fs.create(&CreateRequest::file(docs, "a.txt", "12345")).unwrap();
    let (fs, _) = fs
        .create(&CreateRequest::file(deep, "b.txt", "123").with_method(AllocationMethod::Indexed))
        .unwrap();
    let (fs, keep) = fs.create(&CreateRequest::file(root, "keep.txt", "k")).unwrap();
    let fs = fs.navigate_to(deep).unwrap().open_file(a).unwrap();

    let fs = fs.delete(docs).unwrap();
    assert_eq!(fs.node_count(), 2);
    let keep_blocks: BTreeSet<u32> = fs
        .node(keep)
        .unwrap()
        .as_file()
        .unwrap()
        .blocks
        .iter()
        .copied()
        .collect();
    assert_eq!(fs.disk().used_blocks(), &keep_blocks);
    assert_eq!(fs.navigation().current_folder, root);
    assert!(fs.navigation().open_files.is_empty());
    assert_eq!(fs.navigation().active_file, None);
    assert!(fs.check_invariants().is_valid());
}

#[test]
fn batch_is_all_or_nothing_on_the_engine_and_partial_in_a_session() {
    let fs = FileSystem::new(3, 10).unwrap();
    let root = fs.root();
    let ops = vec![
        Operation::Create(CreateRequest::file(root, "one.txt", vec![0u8; 10])),
        Operation::Create(CreateRequest::file(root, "huge.txt", vec![0u8; 100])),
        Operation::Create(CreateRequest::file(root, "two.txt", vec![0u8; 10])),
    ];

    let (index, err) = fs.apply_all(&ops).unwrap_err();
    assert_eq!(index, 1);
    assert!(err.is_allocation_failure());

    let mut session = Session::new(fs);
    let report = session.apply_batch(&ops);
    assert_eq!(report.accepted.len(), 2);
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.rejected[0].0, 1);
    assert_eq!(session.state().disk_usage().used, 2);
}

#[test]
fn listing_breadcrumb_and_paths_agree() {
    let fs = FileSystem::with_defaults();
    let root = fs.root();
    let (fs, src) = fs.create(&CreateRequest::folder(root, "src")).unwrap();
    let (fs, _) = fs.create(&CreateRequest::file(root, "b.txt", "b")).unwrap();
    let (fs, _) = fs.create(&CreateRequest::folder(root, "Assets")).unwrap();
    let (fs, main) = fs.create(&CreateRequest::file(src, "main.rs", "fn main() {}")).unwrap();

    let names: Vec<&str> = fs
        .children_sorted(root)
        .unwrap()
        .into_iter()
        .map(|n| n.name.as_str())
        .collect();
    assert_eq!(names, vec!["Assets", "src", "b.txt"]);

    let crumbs: Vec<String> = fs
        .breadcrumb(main)
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(crumbs, vec!["Root", "src", "main.rs"]);
    assert_eq!(fs.path_string(main).unwrap(), "/src/main.rs");
    assert_eq!(fs.resolve_path("/src/main.rs").unwrap(), main);
    assert!(!fs.file_details(main).unwrap().is_text);
}
