//! Tree and block-table invariant checks.
//!
//! Used to vet snapshots loaded from outside and by `blockfs validate`.

use super::FileSystem;
use crate::alloc::{blocks_needed, AllocationMethod};
use crate::tree::normalize_name;
use crate::types::{BlockIndex, NodeId};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Outcome of an invariant check
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InvariantReport {
    pub node_count: usize,
    pub file_count: usize,
    pub used_blocks: usize,
    pub errors: Vec<String>,
}

impl InvariantReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, message: String) {
        self.errors.push(message);
    }
}

impl FileSystem {
    /// Check every structural and block-table invariant.
    pub fn check_invariants(&self) -> InvariantReport {
        let mut report = InvariantReport {
            node_count: self.store.len(),
            used_blocks: self.disk.used_count(),
            ..Default::default()
        };
        check_tree(self, &mut report);
        check_blocks(self, &mut report);
        check_navigation(self, &mut report);
        report
    }

    /// Violations only; empty when the state is sound.
    pub fn validate(&self) -> Vec<String> {
        self.check_invariants().errors
    }
}

fn check_tree(fs: &FileSystem, report: &mut InvariantReport) {
    let store = &fs.store;
    let root = store.root();
    match store.get(&root) {
        None => report.error(format!("root {} is missing", root)),
        Some(node) => {
            if node.parent.is_some() {
                report.error(format!("root {} has a parent", root));
            }
            if !node.is_folder() {
                report.error(format!("root {} is not a folder", root));
            }
        }
    }

    for (id, node) in store.iter() {
        if node.id != *id {
            report.error(format!("node stored under {} claims id {}", id, node.id));
        }
        match normalize_name(&node.name) {
            Ok(normalized) if normalized == node.name => {}
            _ => report.error(format!("node {} has invalid name {:?}", id, node.name)),
        }
        if *id != root {
            match node.parent.and_then(|p| store.get(&p)) {
                None => report.error(format!("node {} has no live parent", id)),
                Some(parent) => {
                    if !parent.children().any(|c| c == *id) {
                        report.error(format!(
                            "node {} is not listed by its parent {}",
                            id, parent.id
                        ));
                    }
                }
            }
        }

        let mut names: HashSet<&str> = HashSet::new();
        for child_id in node.children() {
            match store.get(&child_id) {
                None => report.error(format!("folder {} lists missing child {}", id, child_id)),
                Some(child) => {
                    if child.parent != Some(*id) {
                        report.error(format!(
                            "folder {} lists {} whose parent is {:?}",
                            id, child_id, child.parent
                        ));
                    }
                    if !names.insert(child.name.as_str()) {
                        report.error(format!(
                            "folder {} has two children named {:?}",
                            id, child.name
                        ));
                    }
                }
            }
        }
    }

    let reachable = store.subtree(&root).len();
    if reachable != store.len() {
        report.error(format!(
            "{} of {} nodes are unreachable from the root",
            store.len() - reachable,
            store.len()
        ));
    }
}

fn check_blocks(fs: &FileSystem, report: &mut InvariantReport) {
    let disk = &fs.disk;
    let mut owners: BTreeMap<BlockIndex, NodeId> = BTreeMap::new();

    for (id, node) in fs.store.iter() {
        let Some(file) = node.as_file() else {
            continue;
        };
        report.file_count += 1;

        if file.size != file.content.len() as u64 {
            report.error(format!(
                "file {} records size {} but holds {} bytes",
                id,
                file.size,
                file.content.len()
            ));
        }
        let expected = blocks_needed(file.content.len(), disk.block_size());
        if file.blocks.len() != expected {
            report.error(format!(
                "file {} has {} data blocks, needs {}",
                id,
                file.blocks.len(),
                expected
            ));
        }
        match file.allocation_method {
            AllocationMethod::Contiguous => {
                if file.blocks.windows(2).any(|w| w[0].checked_add(1) != Some(w[1])) {
                    report.error(format!("contiguous file {} is not one run", id));
                }
                if file.index_block.is_some() || file.next_block.is_some() {
                    report.error(format!("contiguous file {} carries chain pointers", id));
                }
            }
            AllocationMethod::Linked => {
                if file.next_block != file.blocks.first().copied() {
                    report.error(format!("linked file {} head does not match its first block", id));
                }
                if file.index_block.is_some() {
                    report.error(format!("linked file {} has an index block", id));
                }
            }
            AllocationMethod::Indexed => {
                if file.index_block.is_none() {
                    report.error(format!("indexed file {} has no index block", id));
                }
                if file.next_block.is_some() {
                    report.error(format!("indexed file {} carries a chain head", id));
                }
            }
        }

        for block in file.owned_blocks() {
            if block >= disk.disk_size() {
                report.error(format!("file {} uses block {} beyond the disk", id, block));
            }
            if let Some(owner) = owners.insert(block, *id) {
                report.error(format!("block {} is claimed by {} and {}", block, owner, id));
            }
        }
    }

    let owned: BTreeSet<BlockIndex> = owners.keys().copied().collect();
    if &owned != disk.used_blocks() {
        let leaked: Vec<_> = disk.used_blocks().difference(&owned).collect();
        let untracked: Vec<_> = owned.difference(disk.used_blocks()).collect();
        report.error(format!(
            "used block set is out of sync: leaked {:?}, untracked {:?}",
            leaked, untracked
        ));
    }
}

fn check_navigation(fs: &FileSystem, report: &mut InvariantReport) {
    let nav = &fs.nav;
    if !fs
        .store
        .get(&nav.current_folder)
        .is_some_and(|n| n.is_folder())
    {
        report.error(format!("current folder {} is not a live folder", nav.current_folder));
    }
    if let Some(selected) = nav.selected {
        if !fs.store.contains(&selected) {
            report.error(format!("selected node {} is missing", selected));
        }
    }
    for open in &nav.open_files {
        if !fs.store.get(open).is_some_and(|n| n.is_file()) {
            report.error(format!("open file {} is not a live file", open));
        }
    }
    if let Some(active) = nav.active_file {
        if !nav.is_open(&active) {
            report.error(format!("active file {} is not open", active));
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::alloc::AllocationMethod;
    use crate::engine::{CreateRequest, FileSystem};

    #[test]
    fn engine_states_are_valid() {
        let fs = FileSystem::new(20, 10).unwrap();
        let root = fs.root();
        let (fs, docs) = fs.create(&CreateRequest::folder(root, "docs")).unwrap();
        let (fs, _) = fs
            .create(&CreateRequest::file(docs, "a", vec![0u8; 25]).with_method(AllocationMethod::Linked))
            .unwrap();
        let (fs, _) = fs
            .create(&CreateRequest::file(root, "b", vec![0u8; 5]).with_method(AllocationMethod::Indexed))
            .unwrap();
        let report = fs.check_invariants();
        assert!(report.is_valid(), "{:?}", report.errors);
        assert_eq!(report.node_count, 4);
        assert_eq!(report.file_count, 2);
        assert_eq!(report.used_blocks, 5);
    }

    #[test]
    fn detects_leaked_blocks() {
        let mut fs = FileSystem::new(10, 10).unwrap();
        fs.disk.reserve([7]);
        let report = fs.check_invariants();
        assert!(!report.is_valid());
        assert!(report.errors[0].contains("leaked"));
    }
}
