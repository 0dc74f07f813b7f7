//! Mutation Engine
//!
//! [`FileSystem`] is one immutable version of the whole state: node arena,
//! disk model and navigation. Every operation borrows the current version and
//! returns a new one, so a rejected operation leaves the caller holding the
//! untouched previous version.

pub mod invariants;
mod mutation;
pub mod operation;
pub mod session;

pub use invariants::InvariantReport;
pub use mutation::{CreateRequest, EntryKind};
pub use operation::{Applied, Operation};
pub use session::{BatchReport, Session};

use crate::config::DiskConfig;
use crate::disk::DiskModel;
use crate::error::FsError;
use crate::nav::Navigation;
use crate::store::NodeStore;
use crate::tree::Node;
use crate::types::NodeId;
use chrono::Utc;

pub const ROOT_NAME: &str = "Root";

#[derive(Debug, Clone, PartialEq)]
pub struct FileSystem {
    pub(crate) store: NodeStore,
    pub(crate) disk: DiskModel,
    pub(crate) nav: Navigation,
    /// Next sequence number fed into id derivation
    pub(crate) next_seq: u64,
}

impl FileSystem {
    /// Fresh file system with an empty root folder.
    pub fn new(disk_size: u32, block_size: u32) -> Result<Self, FsError> {
        Ok(Self::on_disk(DiskModel::new(disk_size, block_size)?))
    }

    /// 1000 blocks of 1024 bytes.
    pub fn with_defaults() -> Self {
        Self::on_disk(DiskModel::default())
    }

    fn on_disk(disk: DiskModel) -> Self {
        let root_id = NodeId::derive(0, ROOT_NAME);
        let root = Node::folder(root_id, ROOT_NAME.to_string(), None, Utc::now());
        Self {
            store: NodeStore::with_root(root),
            disk,
            nav: Navigation::at(root_id),
            next_seq: 1,
        }
    }

    pub fn from_config(config: &DiskConfig) -> Result<Self, FsError> {
        Self::new(config.disk_size, config.block_size)
    }

    pub(crate) fn from_parts(
        store: NodeStore,
        disk: DiskModel,
        nav: Navigation,
        next_seq: u64,
    ) -> Self {
        Self {
            store,
            disk,
            nav,
            next_seq,
        }
    }

    pub fn root(&self) -> NodeId {
        self.store.root()
    }

    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    pub fn disk(&self) -> &DiskModel {
        &self.disk
    }

    pub fn navigation(&self) -> &Navigation {
        &self.nav
    }

    pub fn node_count(&self) -> usize {
        self.store.len()
    }

    /// Id derivation input is never reused, and the derived id is skipped on
    /// the rare hash collision with a live node.
    pub(crate) fn fresh_id(&mut self, name: &str) -> Result<NodeId, FsError> {
        loop {
            let id = NodeId::derive(self.next_seq, name);
            self.next_seq = self.next_seq.checked_add(1).ok_or_else(|| {
                FsError::CorruptState("node id sequence is exhausted".to_string())
            })?;
            if !self.store.contains(&id) {
                return Ok(id);
            }
        }
    }
}

impl Default for FileSystem {
    fn default() -> Self {
        Self::with_defaults()
    }
}
