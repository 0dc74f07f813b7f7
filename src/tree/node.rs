//! File and folder node types

use crate::alloc::{Allocation, AllocationMethod};
use crate::types::{BlockIndex, NodeId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeSet;

/// File or folder in the tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    /// Owning folder; `None` only for the root
    pub parent: Option<NodeId>,
    pub kind: NodeKind,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    Folder(FolderNode),
    File(FileNode),
}

/// Folder payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderNode {
    pub children: BTreeSet<NodeId>,
}

/// File payload: content plus its block layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileNode {
    pub content: Vec<u8>,
    /// Always `content.len()`
    pub size: u64,
    pub allocation_method: AllocationMethod,
    pub blocks: Vec<BlockIndex>,
    pub index_block: Option<BlockIndex>,
    /// Head of the chain for linked files; the chain itself follows `blocks` order
    pub next_block: Option<BlockIndex>,
}

impl FileNode {
    pub fn new(content: Vec<u8>, method: AllocationMethod, allocation: Allocation) -> Self {
        Self {
            size: content.len() as u64,
            content,
            allocation_method: method,
            blocks: allocation.blocks,
            index_block: allocation.index_block,
            next_block: allocation.next_block,
        }
    }

    /// Data blocks plus the index block, if any.
    pub fn owned_blocks(&self) -> Vec<BlockIndex> {
        self.blocks.iter().copied().chain(self.index_block).collect()
    }

    pub fn content_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }
}

impl Node {
    pub fn folder(id: NodeId, name: String, parent: Option<NodeId>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name,
            parent,
            kind: NodeKind::Folder(FolderNode::default()),
            created_at: now,
            modified_at: now,
        }
    }

    pub fn file(id: NodeId, name: String, parent: NodeId, file: FileNode, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name,
            parent: Some(parent),
            kind: NodeKind::File(file),
            created_at: now,
            modified_at: now,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self.kind, NodeKind::Folder(_))
    }

    pub fn is_file(&self) -> bool {
        matches!(self.kind, NodeKind::File(_))
    }

    pub fn as_folder(&self) -> Option<&FolderNode> {
        match &self.kind {
            NodeKind::Folder(folder) => Some(folder),
            NodeKind::File(_) => None,
        }
    }

    pub fn as_folder_mut(&mut self) -> Option<&mut FolderNode> {
        match &mut self.kind {
            NodeKind::Folder(folder) => Some(folder),
            NodeKind::File(_) => None,
        }
    }

    pub fn as_file(&self) -> Option<&FileNode> {
        match &self.kind {
            NodeKind::File(file) => Some(file),
            NodeKind::Folder(_) => None,
        }
    }

    pub fn as_file_mut(&mut self) -> Option<&mut FileNode> {
        match &mut self.kind {
            NodeKind::File(file) => Some(file),
            NodeKind::Folder(_) => None,
        }
    }

    /// Children of a folder; empty for files.
    pub fn children(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.as_folder()
            .into_iter()
            .flat_map(|folder| folder.children.iter().copied())
    }

    /// Size in bytes; folders report zero.
    pub fn size(&self) -> u64 {
        self.as_file().map(|file| file.size).unwrap_or(0)
    }

    pub fn kind_label(&self) -> &'static str {
        match self.kind {
            NodeKind::Folder(_) => "folder",
            NodeKind::File(_) => "file",
        }
    }
}
