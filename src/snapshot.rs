//! Snapshot
//!
//! Flat, serializable form of a [`FileSystem`]: the id→node map, the disk
//! model fields and navigation. Loading a snapshot never trusts it; it is
//! either checked against every invariant or repaired into a valid state.

use crate::alloc::{self, blocks_needed, AllocationMethod};
use crate::disk::DiskModel;
use crate::engine::{FileSystem, InvariantReport, ROOT_NAME};
use crate::error::FsError;
use crate::nav::Navigation;
use crate::store::NodeStore;
use crate::tree::{normalize_name, FileNode, Node, NodeKind};
use crate::types::{BlockIndex, NodeId};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub root: NodeId,
    pub nodes: BTreeMap<NodeId, Node>,
    pub disk_size: u32,
    pub block_size: u32,
    pub used_blocks: Vec<BlockIndex>,
    pub navigation: Navigation,
    pub next_seq: u64,
}

/// What a repair changed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    pub actions: Vec<String>,
}

impl RepairReport {
    pub fn is_clean(&self) -> bool {
        self.actions.is_empty()
    }

    fn note(&mut self, action: String) {
        warn!(%action, "snapshot repair");
        self.actions.push(action);
    }
}

impl FileSystem {
    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            version: SNAPSHOT_VERSION,
            root: self.store.root(),
            nodes: self.store.nodes().clone(),
            disk_size: self.disk.disk_size(),
            block_size: self.disk.block_size(),
            used_blocks: self.disk.used_blocks().iter().copied().collect(),
            navigation: self.nav.clone(),
            next_seq: self.next_seq,
        }
    }

    /// Load a snapshot, rejecting it if any invariant fails.
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self, FsError> {
        let fs = Self::assemble(snapshot)?;
        let report = fs.snapshot_report();
        if !report.is_valid() {
            return Err(FsError::CorruptState(report.errors.join("; ")));
        }
        Ok(fs)
    }

    /// Every violation in a snapshot, without loading or repairing it.
    pub fn check_snapshot(snapshot: Snapshot) -> Result<InvariantReport, FsError> {
        Ok(Self::assemble(snapshot)?.snapshot_report())
    }

    fn assemble(snapshot: Snapshot) -> Result<Self, FsError> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(FsError::CorruptState(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }
        let mut disk = DiskModel::new(snapshot.disk_size, snapshot.block_size)
            .map_err(|e| FsError::CorruptState(e.to_string()))?;
        disk.replace_used(snapshot.used_blocks.into_iter().collect());
        Ok(FileSystem::from_parts(
            NodeStore::from_parts(snapshot.nodes, snapshot.root),
            disk,
            snapshot.navigation,
            snapshot.next_seq,
        ))
    }

    fn snapshot_report(&self) -> InvariantReport {
        let mut report = self.check_invariants();
        if self.next_seq < seq_floor(self) {
            report.errors.push(format!(
                "id sequence {} is behind the node count",
                self.next_seq
            ));
        }
        if self.next_seq == u64::MAX {
            report.errors.push("id sequence is exhausted".to_string());
        }
        report
    }

    /// Load a snapshot, fixing what can be fixed.
    ///
    /// Dangling child ids are dropped, orphans move under the root, duplicate
    /// sibling names get a numeric suffix, sizes are recomputed, files with an
    /// impossible or colliding layout are re-allocated (or dropped when the
    /// disk cannot hold them), the used-block set is rebuilt from live files
    /// and stale navigation is cleared.
    pub fn from_snapshot_repaired(snapshot: Snapshot) -> Result<(Self, RepairReport), FsError> {
        let mut report = RepairReport::default();
        let disk = DiskModel::new(snapshot.disk_size, snapshot.block_size)
            .map_err(|e| FsError::CorruptState(e.to_string()))?;
        let mut nodes = snapshot.nodes;
        for (id, node) in nodes.iter_mut() {
            if node.id != *id {
                report.note(format!("node stored under {} claimed id {}", id, node.id));
                node.id = *id;
            }
        }

        let root = repair_root(&mut nodes, snapshot.root, &mut report);
        repair_names(&mut nodes, &mut report);
        repair_links(&mut nodes, root, &mut report);
        repair_sibling_names(&mut nodes, &mut report);
        let used = repair_blocks(&mut nodes, &disk, &mut report);

        let mut disk = disk;
        let recorded: BTreeSet<BlockIndex> = snapshot.used_blocks.iter().copied().collect();
        if used != recorded {
            report.note("rebuilt used block set from live files".to_string());
        }
        disk.replace_used(used);

        let store = NodeStore::from_parts(nodes, root);
        let nav = repair_navigation(&store, snapshot.navigation, &mut report);
        let mut fs = FileSystem::from_parts(store, disk, nav, snapshot.next_seq);
        let floor = seq_floor(&fs);
        if fs.next_seq < floor {
            fs.next_seq = floor;
        }

        let check = fs.check_invariants();
        if !check.is_valid() {
            return Err(FsError::CorruptState(check.errors.join("; ")));
        }
        if !report.is_clean() {
            info!(actions = report.actions.len(), "snapshot repaired");
        }
        Ok((fs, report))
    }
}

/// Every live node consumed one sequence number, so the counter is at least
/// the node count.
fn seq_floor(fs: &FileSystem) -> u64 {
    fs.store.len() as u64
}

fn repair_root(
    nodes: &mut BTreeMap<NodeId, Node>,
    root: NodeId,
    report: &mut RepairReport,
) -> NodeId {
    let usable = nodes.get(&root).is_some_and(|n| n.is_folder());
    let root = if usable {
        root
    } else {
        let mut seq = 0;
        let fresh = loop {
            let id = NodeId::derive(seq, ROOT_NAME);
            if !nodes.contains_key(&id) {
                break id;
            }
            seq += 1;
        };
        report.note(format!("root {} missing or not a folder; created {}", root, fresh));
        nodes.insert(
            fresh,
            Node::folder(fresh, ROOT_NAME.to_string(), None, Utc::now()),
        );
        fresh
    };
    if let Some(node) = nodes.get_mut(&root) {
        if node.parent.take().is_some() {
            report.note(format!("root {} had a parent", root));
        }
    }
    root
}

fn repair_names(nodes: &mut BTreeMap<NodeId, Node>, report: &mut RepairReport) {
    for (id, node) in nodes.iter_mut() {
        let fixed = normalize_name(&node.name).unwrap_or_else(|_| format!("unnamed-{}", id.short()));
        if fixed != node.name {
            report.note(format!("renamed {} from {:?} to {:?}", id, node.name, fixed));
            node.name = fixed;
        }
    }
}

/// Make parent pointers and child sets agree, and hang everything off the root.
fn repair_links(nodes: &mut BTreeMap<NodeId, Node>, root: NodeId, report: &mut RepairReport) {
    // Child sets keep only live, non-root nodes that point back at the folder.
    let parents: BTreeMap<NodeId, Option<NodeId>> =
        nodes.iter().map(|(id, n)| (*id, n.parent)).collect();
    for (id, node) in nodes.iter_mut() {
        if let Some(folder) = node.as_folder_mut() {
            let before = folder.children.len();
            folder
                .children
                .retain(|c| *c != root && parents.get(c).copied().flatten() == Some(*id));
            if folder.children.len() != before {
                report.note(format!(
                    "dropped {} stale child ids from {}",
                    before - folder.children.len(),
                    id
                ));
            }
        }
    }

    // Parent pointers must name a live folder; otherwise reattach to the root.
    let ids: Vec<NodeId> = nodes.keys().copied().filter(|id| *id != root).collect();
    for id in &ids {
        let parent = nodes.get(id).and_then(|n| n.parent);
        let parent_ok = parent
            .and_then(|p| nodes.get(&p))
            .is_some_and(|p| p.is_folder());
        let target = if parent_ok {
            parent.unwrap_or(root)
        } else {
            report.note(format!("reattached orphan {} under the root", id));
            root
        };
        reparent(nodes, *id, target);
    }

    // Parent cycles are unreachable from the root; break them one node at a time.
    loop {
        let reachable = NodeStore::from_parts(nodes.clone(), root).subtree(&root);
        let reachable: BTreeSet<NodeId> = reachable.into_iter().collect();
        let Some(stray) = nodes.keys().copied().find(|id| !reachable.contains(id)) else {
            break;
        };
        report.note(format!("broke parent cycle at {}", stray));
        let old_parent = nodes.get(&stray).and_then(|n| n.parent);
        if let Some(folder) = old_parent
            .and_then(|p| nodes.get_mut(&p))
            .and_then(Node::as_folder_mut)
        {
            folder.children.remove(&stray);
        }
        reparent(nodes, stray, root);
    }
}

fn reparent(nodes: &mut BTreeMap<NodeId, Node>, id: NodeId, parent: NodeId) {
    if let Some(node) = nodes.get_mut(&id) {
        node.parent = Some(parent);
    }
    if let Some(folder) = nodes.get_mut(&parent).and_then(Node::as_folder_mut) {
        folder.children.insert(id);
    }
}

fn repair_sibling_names(nodes: &mut BTreeMap<NodeId, Node>, report: &mut RepairReport) {
    let folders: Vec<(NodeId, Vec<NodeId>)> = nodes
        .iter()
        .filter_map(|(id, n)| n.as_folder().map(|f| (*id, f.children.iter().copied().collect())))
        .collect();
    for (folder, children) in folders {
        let mut taken: BTreeSet<String> = BTreeSet::new();
        for child in children {
            let Some(name) = nodes.get(&child).map(|n| n.name.clone()) else {
                continue;
            };
            if taken.insert(name.clone()) {
                continue;
            }
            let mut n = 2;
            let unique = loop {
                let candidate = format!("{} ({})", name, n);
                if !taken.contains(&candidate)
                    && !nodes_named_in(nodes, folder, &candidate)
                {
                    break candidate;
                }
                n += 1;
            };
            report.note(format!(
                "renamed duplicate {:?} in {} to {:?}",
                name, folder, unique
            ));
            taken.insert(unique.clone());
            if let Some(node) = nodes.get_mut(&child) {
                node.name = unique;
            }
        }
    }
}

fn nodes_named_in(nodes: &BTreeMap<NodeId, Node>, folder: NodeId, name: &str) -> bool {
    nodes
        .get(&folder)
        .map(|f| {
            f.children()
                .filter_map(|c| nodes.get(&c))
                .any(|c| c.name == name)
        })
        .unwrap_or(false)
}

/// Keep valid, non-colliding layouts in id order; re-allocate the rest.
fn repair_blocks(
    nodes: &mut BTreeMap<NodeId, Node>,
    disk: &DiskModel,
    report: &mut RepairReport,
) -> BTreeSet<BlockIndex> {
    let mut claimed: BTreeSet<BlockIndex> = BTreeSet::new();
    let mut needs_layout: Vec<NodeId> = Vec::new();

    for (id, node) in nodes.iter_mut() {
        let Some(file) = node.as_file_mut() else {
            continue;
        };
        if file.size != file.content.len() as u64 {
            report.note(format!("recomputed size of {}", id));
            file.size = file.content.len() as u64;
        }
        let owned = file.owned_blocks();
        let distinct: BTreeSet<BlockIndex> = owned.iter().copied().collect();
        let fits = layout_is_sound(file, disk)
            && distinct.len() == owned.len()
            && distinct.is_disjoint(&claimed);
        if fits {
            claimed.extend(distinct);
        } else {
            needs_layout.push(*id);
        }
    }

    for id in needs_layout {
        let Some(file) = nodes.get(&id).and_then(Node::as_file) else {
            continue;
        };
        let mut view = disk.clone();
        view.replace_used(claimed.clone());
        match alloc::allocate(&view, file.content.len(), file.allocation_method) {
            Ok(allocation) => {
                report.note(format!("re-allocated blocks for {}", id));
                claimed.extend(allocation.owned_blocks());
                let rebuilt = FileNode::new(file.content.clone(), file.allocation_method, allocation);
                if let Some(node) = nodes.get_mut(&id) {
                    node.kind = NodeKind::File(rebuilt);
                }
            }
            Err(err) => {
                report.note(format!("dropped {}: {}", id, err));
                let parent = nodes.remove(&id).and_then(|n| n.parent);
                if let Some(folder) = parent
                    .and_then(|p| nodes.get_mut(&p))
                    .and_then(Node::as_folder_mut)
                {
                    folder.children.remove(&id);
                }
            }
        }
    }
    claimed
}

fn layout_is_sound(file: &FileNode, disk: &DiskModel) -> bool {
    let in_range = file.owned_blocks().iter().all(|b| *b < disk.disk_size());
    let count_ok = file.blocks.len() == blocks_needed(file.content.len(), disk.block_size());
    let shape_ok = match file.allocation_method {
        AllocationMethod::Contiguous => {
            file.index_block.is_none()
                && file.next_block.is_none()
                && file.blocks.windows(2).all(|w| w[0].checked_add(1) == Some(w[1]))
        }
        AllocationMethod::Linked => {
            file.index_block.is_none() && file.next_block == file.blocks.first().copied()
        }
        AllocationMethod::Indexed => file.index_block.is_some() && file.next_block.is_none(),
    };
    in_range && count_ok && shape_ok
}

fn repair_navigation(store: &NodeStore, nav: Navigation, report: &mut RepairReport) -> Navigation {
    let mut fixed = nav.clone();
    if !store.get(&fixed.current_folder).is_some_and(|n| n.is_folder()) {
        fixed.current_folder = store.root();
    }
    if fixed.selected.is_some_and(|id| !store.contains(&id)) {
        fixed.selected = None;
    }
    fixed
        .open_files
        .retain(|id| store.get(id).is_some_and(|n| n.is_file()));
    if fixed.active_file.is_some_and(|id| !fixed.open_files.contains(&id)) {
        fixed.active_file = None;
    }
    if fixed != nav {
        report.note("cleared stale navigation references".to_string());
    }
    fixed
}
