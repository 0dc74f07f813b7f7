//! Operation requests and dispatch.

use super::{CreateRequest, FileSystem};
use crate::alloc::AllocationMethod;
use crate::error::FsError;
use crate::types::NodeId;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One inbound request from a caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Create(CreateRequest),
    Delete {
        node: NodeId,
    },
    Rename {
        node: NodeId,
        name: String,
    },
    UpdateContent {
        node: NodeId,
        content: Vec<u8>,
        #[serde(default)]
        allocation_method: Option<AllocationMethod>,
    },
}

impl Operation {
    pub fn label(&self) -> &'static str {
        match self {
            Operation::Create(_) => "create",
            Operation::Delete { .. } => "delete",
            Operation::Rename { .. } => "rename",
            Operation::UpdateContent { .. } => "update",
        }
    }
}

/// Successful transition
#[derive(Debug, Clone)]
pub struct Applied {
    pub state: FileSystem,
    /// Id of the node a create added
    pub created: Option<NodeId>,
}

impl FileSystem {
    /// Apply one operation, producing the next version.
    pub fn apply(&self, op: &Operation) -> Result<Applied, FsError> {
        debug!(op = op.label(), "applying operation");
        match op {
            Operation::Create(request) => {
                let (state, id) = self.create(request)?;
                Ok(Applied {
                    state,
                    created: Some(id),
                })
            }
            Operation::Delete { node } => Ok(Applied {
                state: self.delete(*node)?,
                created: None,
            }),
            Operation::Rename { node, name } => Ok(Applied {
                state: self.rename(*node, name)?,
                created: None,
            }),
            Operation::UpdateContent {
                node,
                content,
                allocation_method,
            } => Ok(Applied {
                state: self.update_content(*node, content, *allocation_method)?,
                created: None,
            }),
        }
    }

    /// Apply operations in order as one transition.
    ///
    /// Either every operation applies or none does; the error carries the
    /// index of the first rejected operation.
    pub fn apply_all(
        &self,
        ops: &[Operation],
    ) -> Result<(Self, Vec<Option<NodeId>>), (usize, FsError)> {
        let mut state = self.clone();
        let mut created = Vec::with_capacity(ops.len());
        for (index, op) in ops.iter().enumerate() {
            let applied = state.apply(op).map_err(|e| (index, e))?;
            state = applied.state;
            created.push(applied.created);
        }
        Ok((state, created))
    }
}
