use blockfs::alloc::AllocationMethod;
use blockfs::engine::{CreateRequest, FileSystem, Operation};
use blockfs::types::NodeId;
use proptest::prelude::*;
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
enum Step {
    CreateFile { parent: usize, name: u8, len: usize, method: usize },
    CreateFolder { parent: usize, name: u8 },
    Delete { target: usize },
    Rename { target: usize, name: u8 },
    Update { target: usize, len: usize, method: Option<usize> },
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        (any::<usize>(), 0u8..6, 0usize..200, 0usize..3).prop_map(|(parent, name, len, method)| {
            Step::CreateFile {
                parent,
                name,
                len,
                method,
            }
        }),
        (any::<usize>(), 0u8..6).prop_map(|(parent, name)| Step::CreateFolder { parent, name }),
        any::<usize>().prop_map(|target| Step::Delete { target }),
        (any::<usize>(), 0u8..6).prop_map(|(target, name)| Step::Rename { target, name }),
        (any::<usize>(), 0usize..200, proptest::option::of(0usize..3))
            .prop_map(|(target, len, method)| Step::Update { target, len, method }),
    ]
}

fn pick(ids: &[NodeId], i: usize) -> NodeId {
    ids[i % ids.len()]
}

fn to_operation(fs: &FileSystem, step: &Step) -> Operation {
    let ids: Vec<NodeId> = fs.store().iter().map(|(id, _)| *id).collect();
    let folders: Vec<NodeId> = fs
        .store()
        .iter()
        .filter(|(_, n)| n.is_folder())
        .map(|(id, _)| *id)
        .collect();
    match *step {
        Step::CreateFile {
            parent,
            name,
            len,
            method,
        } => Operation::Create(
            CreateRequest::file(pick(&folders, parent), format!("f{name}"), vec![b'x'; len])
                .with_method(AllocationMethod::ALL[method]),
        ),
        Step::CreateFolder { parent, name } => {
            Operation::Create(CreateRequest::folder(pick(&folders, parent), format!("d{name}")))
        }
        Step::Delete { target } => Operation::Delete {
            node: pick(&ids, target),
        },
        Step::Rename { target, name } => Operation::Rename {
            node: pick(&ids, target),
            name: format!("r{name}"),
        },
        Step::Update {
            target,
            len,
            method,
        } => Operation::UpdateContent {
            node: pick(&ids, target),
            content: vec![b'y'; len],
            allocation_method: method.map(|m| AllocationMethod::ALL[m]),
        },
    }
}

proptest! {
    #[test]
    fn random_histories_preserve_every_invariant(steps in proptest::collection::vec(step(), 1..40)) {
        let mut fs = FileSystem::new(32, 16).unwrap();
        for step in &steps {
            let op = to_operation(&fs, step);
            match fs.apply(&op) {
                Ok(applied) => {
                    let report = applied.state.check_invariants();
                    prop_assert!(report.is_valid(), "{:?} broke {:?}", op, report.errors);
                    fs = applied.state;
                }
                Err(_) => {
                    prop_assert!(fs.check_invariants().is_valid());
                }
            }
        }
    }

    #[test]
    fn rejected_operations_leave_state_unchanged(steps in proptest::collection::vec(step(), 1..30)) {
        let mut fs = FileSystem::new(8, 16).unwrap();
        for step in &steps {
            let op = to_operation(&fs, step);
            let before = fs.clone();
            match fs.apply(&op) {
                Ok(applied) => fs = applied.state,
                Err(_) => prop_assert_eq!(&fs, &before),
            }
        }
    }

    #[test]
    fn delete_frees_exactly_the_subtree(steps in proptest::collection::vec(step(), 1..30), victim in any::<usize>()) {
        let mut fs = FileSystem::new(64, 8).unwrap();
        for step in &steps {
            if let Ok(applied) = fs.apply(&to_operation(&fs, step)) {
                fs = applied.state;
            }
        }
        let candidates: Vec<NodeId> = fs
            .store()
            .iter()
            .map(|(id, _)| *id)
            .filter(|id| *id != fs.root())
            .collect();
        prop_assume!(!candidates.is_empty());
        let target = candidates[victim % candidates.len()];
        let subtree: BTreeSet<NodeId> = fs.store().subtree(&target).into_iter().collect();
        let freed: BTreeSet<u32> = subtree
            .iter()
            .filter_map(|id| fs.node(*id).ok()?.as_file().map(|f| f.owned_blocks()))
            .flatten()
            .collect();

        let after = fs.delete(target).unwrap();
        prop_assert_eq!(after.node_count(), fs.node_count() - subtree.len());
        let expected: BTreeSet<u32> = fs.disk().used_blocks().difference(&freed).copied().collect();
        prop_assert_eq!(after.disk().used_blocks(), &expected);
    }

    #[test]
    fn snapshots_round_trip_through_json(steps in proptest::collection::vec(step(), 1..25)) {
        let mut fs = FileSystem::new(32, 16).unwrap();
        for step in &steps {
            if let Ok(applied) = fs.apply(&to_operation(&fs, step)) {
                fs = applied.state;
            }
        }
        let json = serde_json::to_string(&fs.to_snapshot()).unwrap();
        let restored = FileSystem::from_snapshot(serde_json::from_str(&json).unwrap()).unwrap();
        prop_assert_eq!(restored, fs);
    }

    #[test]
    fn renaming_to_the_current_name_is_a_no_op_on_the_tree(len in 0usize..100) {
        let fs = FileSystem::new(16, 16).unwrap();
        let root = fs.root();
        let (fs, id) = fs.create(&CreateRequest::file(root, "same.txt", vec![1u8; len])).unwrap();
        let renamed = fs.rename(id, "same.txt").unwrap();
        prop_assert_eq!(&renamed.node(id).unwrap().name, "same.txt");
        prop_assert_eq!(renamed.disk(), fs.disk());
        prop_assert!(renamed.check_invariants().is_valid());
    }
}
