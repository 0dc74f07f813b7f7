//! Session: the caller's handle on the current file-system version.

use super::{Applied, CreateRequest, FileSystem, Operation};
use crate::alloc::AllocationMethod;
use crate::error::FsError;
use crate::types::NodeId;
use serde::Serialize;
use tracing::{info, warn};

/// Result of a best-effort batch
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    /// Index of each accepted operation and the node it created, if any
    pub accepted: Vec<(usize, Option<NodeId>)>,
    /// Index and reason of each rejected operation
    pub rejected: Vec<(usize, String)>,
}

impl BatchReport {
    pub fn all_accepted(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Holds the current version and swaps it for the next one on success.
///
/// Operations run one at a time in submission order; each sees the committed
/// result of the previous one.
#[derive(Debug, Clone, Default)]
pub struct Session {
    current: FileSystem,
}

impl Session {
    pub fn new(state: FileSystem) -> Self {
        Self { current: state }
    }

    pub fn state(&self) -> &FileSystem {
        &self.current
    }

    pub fn into_state(self) -> FileSystem {
        self.current
    }

    /// Apply one operation. A rejection is logged and the current version is kept.
    pub fn apply(&mut self, op: &Operation) -> Result<Option<NodeId>, FsError> {
        match self.current.apply(op) {
            Ok(Applied { state, created }) => {
                self.current = state;
                Ok(created)
            }
            Err(err) => {
                warn!(op = op.label(), error = %err, "operation rejected");
                Err(err)
            }
        }
    }

    /// Apply a batch atomically.
    pub fn apply_all(&mut self, ops: &[Operation]) -> Result<Vec<Option<NodeId>>, FsError> {
        match self.current.apply_all(ops) {
            Ok((state, created)) => {
                self.current = state;
                info!(count = ops.len(), "batch applied");
                Ok(created)
            }
            Err((index, err)) => {
                warn!(index, error = %err, "batch rejected");
                Err(err)
            }
        }
    }

    /// Apply each operation independently, keeping the ones that succeed.
    pub fn apply_batch(&mut self, ops: &[Operation]) -> BatchReport {
        let mut report = BatchReport::default();
        for (index, op) in ops.iter().enumerate() {
            match self.apply(op) {
                Ok(created) => report.accepted.push((index, created)),
                Err(err) => report.rejected.push((index, err.to_string())),
            }
        }
        if !report.all_accepted() {
            warn!(
                accepted = report.accepted.len(),
                rejected = report.rejected.len(),
                "batch partially applied"
            );
        }
        report
    }

    /// Run any state transition, such as navigation, under the same commit rule.
    pub fn transition<F>(&mut self, label: &str, f: F) -> Result<(), FsError>
    where
        F: FnOnce(&FileSystem) -> Result<FileSystem, FsError>,
    {
        match f(&self.current) {
            Ok(next) => {
                self.current = next;
                Ok(())
            }
            Err(err) => {
                warn!(op = label, error = %err, "transition rejected");
                Err(err)
            }
        }
    }

    /// Create a file in the current folder.
    pub fn create_file_here(
        &mut self,
        name: &str,
        content: impl Into<Vec<u8>>,
        method: Option<AllocationMethod>,
    ) -> Result<NodeId, FsError> {
        let mut request = CreateRequest::file(self.current.nav.current_folder, name, content);
        request.allocation_method = method;
        self.apply_create(request)
    }

    /// Create a folder in the current folder.
    pub fn create_folder_here(&mut self, name: &str) -> Result<NodeId, FsError> {
        self.apply_create(CreateRequest::folder(self.current.nav.current_folder, name))
    }

    fn apply_create(&mut self, request: CreateRequest) -> Result<NodeId, FsError> {
        let created = self.apply(&Operation::Create(request))?;
        created.ok_or_else(|| FsError::InvalidOperation("create returned no node".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_operation_keeps_current_version() {
        let mut session = Session::new(FileSystem::new(2, 10).unwrap());
        session.create_file_here("a", "x", None).unwrap();
        let before = session.state().clone();
        let err = session
            .create_file_here("b", vec![0u8; 30], None)
            .unwrap_err();
        assert!(err.is_allocation_failure());
        assert_eq!(session.state(), &before);
    }

    #[test]
    fn batch_accepts_valid_subset() {
        let mut session = Session::new(FileSystem::new(10, 10).unwrap());
        let root = session.state().root();
        let ops = vec![
            Operation::Create(CreateRequest::file(root, "a", "1")),
            Operation::Create(CreateRequest::file(root, "a", "2")),
            Operation::Create(CreateRequest::folder(root, "docs")),
        ];
        let report = session.apply_batch(&ops);
        assert_eq!(report.accepted.len(), 2);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].0, 1);
        assert_eq!(session.state().node_count(), 3);
    }

    #[test]
    fn create_here_uses_current_folder() {
        let mut session = Session::default();
        let docs = session.create_folder_here("docs").unwrap();
        session.transition("navigate", |fs| fs.navigate_to(docs)).unwrap();
        let file = session.create_file_here("a.txt", "hi", Some(AllocationMethod::Linked)).unwrap();
        assert_eq!(session.state().store().get(&file).unwrap().parent, Some(docs));
    }
}
