//! blockfs: Hierarchical File System over a Simulated Block Device
//!
//! A folder/file tree whose file contents occupy blocks of a fixed-size
//! simulated disk, placed by contiguous, linked or indexed allocation.
//! Every operation produces a new version of the whole state; a rejected
//! operation leaves the previous version untouched.

pub mod alloc;
pub mod config;
pub mod disk;
pub mod engine;
pub mod error;
pub mod logging;
pub mod nav;
pub mod snapshot;
pub mod store;
pub mod tooling;
pub mod tree;
pub mod types;
pub mod views;

pub use alloc::{Allocation, AllocationMethod};
pub use disk::{DiskModel, DiskUsage};
pub use engine::{BatchReport, CreateRequest, EntryKind, FileSystem, Operation, Session};
pub use error::FsError;
pub use nav::Navigation;
pub use snapshot::{RepairReport, Snapshot};
pub use types::{BlockIndex, NodeId};
