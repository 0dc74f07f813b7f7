//! Block Allocator
//!
//! Pure placement functions. Given a byte count and a read-only view of the
//! disk, pick the block indices a file would occupy under a strategy. Nothing
//! here mutates the disk; committing an [`Allocation`] is the engine's job.

use crate::disk::DiskModel;
use crate::types::BlockIndex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// How a file's blocks are laid out on disk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllocationMethod {
    /// One uninterrupted run of blocks
    #[default]
    Contiguous,
    /// Any free blocks, chained in list order
    Linked,
    /// Any free blocks, addressed through one extra index block
    Indexed,
}

impl AllocationMethod {
    pub const ALL: [AllocationMethod; 3] = [
        AllocationMethod::Contiguous,
        AllocationMethod::Linked,
        AllocationMethod::Indexed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AllocationMethod::Contiguous => "contiguous",
            AllocationMethod::Linked => "linked",
            AllocationMethod::Indexed => "indexed",
        }
    }
}

impl fmt::Display for AllocationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AllocationMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "contiguous" => Ok(AllocationMethod::Contiguous),
            "linked" => Ok(AllocationMethod::Linked),
            "indexed" => Ok(AllocationMethod::Indexed),
            other => Err(format!(
                "Invalid allocation method: {} (must be 'contiguous', 'linked', or 'indexed')",
                other
            )),
        }
    }
}

/// A complete block assignment for one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    /// Data blocks in file order
    pub blocks: Vec<BlockIndex>,
    /// Present only for indexed allocation
    pub index_block: Option<BlockIndex>,
    /// Present only for linked allocation: head of the chain
    pub next_block: Option<BlockIndex>,
}

impl Allocation {
    /// Every block the allocation owns: data blocks plus the index block.
    pub fn owned_blocks(&self) -> impl Iterator<Item = BlockIndex> + '_ {
        self.blocks.iter().copied().chain(self.index_block)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    #[error("need {needed} blocks but only {free} are free")]
    InsufficientCapacity { needed: usize, free: usize },
    #[error("no run of {needed} contiguous free blocks")]
    Fragmented { needed: usize },
}

/// Blocks needed to hold `byte_length` bytes; an empty file still takes one.
pub fn blocks_needed(byte_length: usize, block_size: u32) -> usize {
    let block_size = (block_size as usize).max(1);
    byte_length.div_ceil(block_size).max(1)
}

/// First-fit search for `n` consecutive free blocks, scanning left to right.
pub fn find_contiguous(
    disk_size: u32,
    used_blocks: &BTreeSet<BlockIndex>,
    n: usize,
) -> Option<Vec<BlockIndex>> {
    if n == 0 {
        return Some(Vec::new());
    }
    let mut run_start: BlockIndex = 0;
    let mut run_len = 0usize;
    for i in 0..disk_size {
        if used_blocks.contains(&i) {
            run_len = 0;
            continue;
        }
        if run_len == 0 {
            run_start = i;
        }
        run_len += 1;
        if run_len == n {
            return Some((run_start..=i).collect());
        }
    }
    None
}

/// The first `n` free blocks in ascending order, adjacent or not.
pub fn find_scattered(
    disk_size: u32,
    used_blocks: &BTreeSet<BlockIndex>,
    n: usize,
) -> Option<Vec<BlockIndex>> {
    let found: Vec<BlockIndex> = (0..disk_size)
        .filter(|i| !used_blocks.contains(i))
        .take(n)
        .collect();
    (found.len() == n).then_some(found)
}

/// Compute a full assignment for `byte_length` bytes, or fail without side effects.
pub fn allocate(
    disk: &DiskModel,
    byte_length: usize,
    method: AllocationMethod,
) -> Result<Allocation, AllocationError> {
    let needed = blocks_needed(byte_length, disk.block_size());
    let free = disk.free_count();
    if needed > free {
        debug!(needed, free, %method, "allocation rejected: disk full");
        return Err(AllocationError::InsufficientCapacity { needed, free });
    }

    let used = disk.used_blocks();
    let allocation = match method {
        AllocationMethod::Contiguous => {
            let blocks = find_contiguous(disk.disk_size(), used, needed)
                .ok_or(AllocationError::Fragmented { needed })?;
            Allocation {
                blocks,
                index_block: None,
                next_block: None,
            }
        }
        AllocationMethod::Linked => {
            let blocks = find_scattered(disk.disk_size(), used, needed)
                .ok_or(AllocationError::InsufficientCapacity { needed, free })?;
            Allocation {
                next_block: blocks.first().copied(),
                blocks,
                index_block: None,
            }
        }
        AllocationMethod::Indexed => {
            let mut blocks = find_scattered(disk.disk_size(), used, needed + 1).ok_or(
                AllocationError::InsufficientCapacity {
                    needed: needed + 1,
                    free,
                },
            )?;
            let index_block = blocks.remove(0);
            Allocation {
                blocks,
                index_block: Some(index_block),
                next_block: None,
            }
        }
    };

    debug!(
        %method,
        needed,
        blocks = ?allocation.blocks,
        index_block = ?allocation.index_block,
        "allocation computed"
    );
    Ok(allocation)
}
