//! Read Views
//!
//! Read-only queries that rendering layers use: sorted listings, breadcrumbs,
//! disk usage and per-file block layouts. None of these change state.

use crate::alloc::AllocationMethod;
use crate::disk::DiskUsage;
use crate::engine::FileSystem;
use crate::error::FsError;
use crate::tree::name::{extension, is_text_file};
use crate::tree::Node;
use crate::types::{BlockIndex, NodeId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One step of a breadcrumb path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreadcrumbEntry {
    pub id: NodeId,
    pub name: String,
}

/// Role of a disk block relative to one file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockState {
    FileData,
    Index,
    OtherUsed,
    Free,
}

/// Everything the details panel shows for a file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileDetails {
    pub id: NodeId,
    pub name: String,
    pub path: String,
    pub extension: String,
    pub is_text: bool,
    pub size: u64,
    pub allocation_method: AllocationMethod,
    pub blocks: Vec<BlockIndex>,
    pub index_block: Option<BlockIndex>,
    pub next_block: Option<BlockIndex>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

/// Counts for a node and everything below it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SubtreeSummary {
    pub nodes: usize,
    pub files: usize,
    pub blocks: usize,
}

/// Folders before files, then case-insensitive by name.
fn display_order(a: &Node, b: &Node) -> Ordering {
    b.is_folder()
        .cmp(&a.is_folder())
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        .then_with(|| a.name.cmp(&b.name))
}

impl FileSystem {
    pub fn node(&self, id: NodeId) -> Result<&Node, FsError> {
        self.store.get_or_error(&id)
    }

    /// Children of a folder in display order.
    pub fn children_sorted(&self, folder: NodeId) -> Result<Vec<&Node>, FsError> {
        let node = self.node(folder)?;
        if !node.is_folder() {
            return Err(FsError::InvalidOperation(format!(
                "\"{}\" is not a folder",
                node.name
            )));
        }
        let mut children: Vec<&Node> = node
            .children()
            .filter_map(|id| self.store.get(&id))
            .collect();
        children.sort_by(|a, b| display_order(a, b));
        Ok(children)
    }

    /// Path from the root down to `id`, root first.
    pub fn breadcrumb(&self, id: NodeId) -> Result<Vec<BreadcrumbEntry>, FsError> {
        let mut path = Vec::new();
        let mut current = Some(self.node(id)?);
        while let Some(node) = current {
            path.push(BreadcrumbEntry {
                id: node.id,
                name: node.name.clone(),
            });
            if path.len() > self.store.len() {
                return Err(FsError::CorruptState(format!(
                    "parent links from {} form a cycle",
                    id
                )));
            }
            current = node.parent.and_then(|p| self.store.get(&p));
        }
        path.reverse();
        Ok(path)
    }

    /// Slash-separated path; the root is `/`.
    pub fn path_string(&self, id: NodeId) -> Result<String, FsError> {
        let crumbs = self.breadcrumb(id)?;
        if crumbs.len() <= 1 {
            return Ok("/".to_string());
        }
        Ok(crumbs
            .iter()
            .skip(1)
            .fold(String::new(), |mut acc, entry| {
                acc.push('/');
                acc.push_str(&entry.name);
                acc
            }))
    }

    /// Resolve a slash-separated path from the root. Empty segments are ignored.
    pub fn resolve_path(&self, path: &str) -> Result<NodeId, FsError> {
        let mut current = self.root();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            let segment = crate::tree::normalize_name(segment)
                .map_err(|_| FsError::PathNotFound(path.to_string()))?;
            current = self
                .store
                .child_named(&current, &segment)
                .map(|n| n.id)
                .ok_or_else(|| FsError::PathNotFound(path.to_string()))?;
        }
        Ok(current)
    }

    pub fn disk_usage(&self) -> DiskUsage {
        self.disk.usage()
    }

    /// State of every disk block as seen from one file.
    pub fn block_map(&self, file: NodeId) -> Result<Vec<BlockState>, FsError> {
        let data = self.file_node(file)?;
        let mut map: Vec<BlockState> = (0..self.disk.disk_size())
            .map(|i| {
                if self.disk.is_used(i) {
                    BlockState::OtherUsed
                } else {
                    BlockState::Free
                }
            })
            .collect();
        for &block in &data.blocks {
            if let Some(slot) = map.get_mut(block as usize) {
                *slot = BlockState::FileData;
            }
        }
        if let Some(slot) = data.index_block.and_then(|b| map.get_mut(b as usize)) {
            *slot = BlockState::Index;
        }
        Ok(map)
    }

    /// Each block of a linked file paired with its successor; the last has none.
    pub fn linked_chain(
        &self,
        file: NodeId,
    ) -> Result<Vec<(BlockIndex, Option<BlockIndex>)>, FsError> {
        let data = self.file_node(file)?;
        if data.allocation_method != AllocationMethod::Linked {
            return Err(FsError::InvalidOperation(format!(
                "{} uses {} allocation, not linked",
                file, data.allocation_method
            )));
        }
        Ok(data
            .blocks
            .iter()
            .enumerate()
            .map(|(i, &block)| (block, data.blocks.get(i + 1).copied()))
            .collect())
    }

    pub fn file_details(&self, file: NodeId) -> Result<FileDetails, FsError> {
        let node = self.node(file)?;
        let data = self.file_node(file)?;
        Ok(FileDetails {
            id: node.id,
            name: node.name.clone(),
            path: self.path_string(file)?,
            extension: extension(&node.name),
            is_text: is_text_file(&node.name),
            size: data.size,
            allocation_method: data.allocation_method,
            blocks: data.blocks.clone(),
            index_block: data.index_block,
            next_block: data.next_block,
            created_at: node.created_at,
            modified_at: node.modified_at,
        })
    }

    pub fn subtree_summary(&self, id: NodeId) -> Result<SubtreeSummary, FsError> {
        self.node(id)?;
        let mut summary = SubtreeSummary::default();
        for node_id in self.store.subtree(&id) {
            summary.nodes += 1;
            if let Some(file) = self.store.get(&node_id).and_then(Node::as_file) {
                summary.files += 1;
                summary.blocks += file.owned_blocks().len();
            }
        }
        Ok(summary)
    }

    fn file_node(&self, id: NodeId) -> Result<&crate::tree::FileNode, FsError> {
        let node = self.node(id)?;
        node.as_file().ok_or_else(|| {
            FsError::InvalidOperation(format!("\"{}\" is a folder, not a file", node.name))
        })
    }
}
