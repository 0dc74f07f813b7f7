//! Disk Model
//!
//! The simulated block device: a fixed block count, a fixed block size and the
//! set of blocks currently owned by some file.

use crate::error::FsError;
use crate::types::BlockIndex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const DEFAULT_DISK_SIZE: u32 = 1000;
pub const DEFAULT_BLOCK_SIZE: u32 = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskModel {
    disk_size: u32,
    block_size: u32,
    used_blocks: BTreeSet<BlockIndex>,
}

impl DiskModel {
    /// Create an empty disk. Both dimensions must be non-zero.
    pub fn new(disk_size: u32, block_size: u32) -> Result<Self, FsError> {
        if disk_size == 0 {
            return Err(FsError::ConfigError("disk_size must be at least 1 block".to_string()));
        }
        if block_size == 0 {
            return Err(FsError::ConfigError("block_size must be at least 1 byte".to_string()));
        }
        Ok(Self {
            disk_size,
            block_size,
            used_blocks: BTreeSet::new(),
        })
    }

    pub fn disk_size(&self) -> u32 {
        self.disk_size
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    pub fn used_blocks(&self) -> &BTreeSet<BlockIndex> {
        &self.used_blocks
    }

    pub fn is_used(&self, block: BlockIndex) -> bool {
        self.used_blocks.contains(&block)
    }

    pub fn used_count(&self) -> usize {
        self.used_blocks.len()
    }

    /// Free blocks on the whole disk, `disk_size - |used_blocks|`.
    pub fn free_count(&self) -> usize {
        (self.disk_size as usize).saturating_sub(self.used_blocks.len())
    }

    pub fn usage(&self) -> DiskUsage {
        DiskUsage::new(self.used_count(), self.disk_size as usize)
    }

    pub(crate) fn reserve<I: IntoIterator<Item = BlockIndex>>(&mut self, blocks: I) {
        self.used_blocks.extend(blocks);
    }

    pub(crate) fn release<'a, I: IntoIterator<Item = &'a BlockIndex>>(&mut self, blocks: I) {
        for block in blocks {
            self.used_blocks.remove(block);
        }
    }

    pub(crate) fn replace_used(&mut self, used: BTreeSet<BlockIndex>) {
        self.used_blocks = used;
    }
}

impl Default for DiskModel {
    fn default() -> Self {
        Self {
            disk_size: DEFAULT_DISK_SIZE,
            block_size: DEFAULT_BLOCK_SIZE,
            used_blocks: BTreeSet::new(),
        }
    }
}

/// Aggregate disk usage, as shown by the usage bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiskUsage {
    pub used: usize,
    pub free: usize,
    pub total: usize,
    pub percent: f64,
}

impl DiskUsage {
    pub fn new(used: usize, total: usize) -> Self {
        let percent = if total == 0 {
            0.0
        } else {
            used as f64 / total as f64 * 100.0
        };
        Self {
            used,
            free: total.saturating_sub(used),
            total,
            percent,
        }
    }

    /// Above 90% the usage display switches to a warning color.
    pub fn is_nearly_full(&self) -> bool {
        self.percent > 90.0
    }
}
