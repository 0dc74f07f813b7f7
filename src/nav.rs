//! Navigation and selection state
//!
//! Current folder, selected node and the open/active file set. These refer to
//! nodes by id and carry no allocation logic; delete keeps them pointing at
//! live nodes.

use crate::engine::FileSystem;
use crate::error::FsError;
use crate::types::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Navigation {
    pub current_folder: NodeId,
    pub selected: Option<NodeId>,
    pub open_files: BTreeSet<NodeId>,
    pub active_file: Option<NodeId>,
}

impl Navigation {
    /// Nothing selected or open, viewing `folder`.
    pub fn at(folder: NodeId) -> Self {
        Self {
            current_folder: folder,
            selected: None,
            open_files: BTreeSet::new(),
            active_file: None,
        }
    }

    pub fn is_open(&self, file: &NodeId) -> bool {
        self.open_files.contains(file)
    }

    /// Drop every reference into `removed`; the current folder falls back to `fallback`.
    pub(crate) fn forget(&mut self, removed: &BTreeSet<NodeId>, fallback: NodeId) {
        if removed.contains(&self.current_folder) {
            self.current_folder = fallback;
        }
        if self.selected.is_some_and(|id| removed.contains(&id)) {
            self.selected = None;
        }
        if self.active_file.is_some_and(|id| removed.contains(&id)) {
            self.active_file = None;
        }
        self.open_files.retain(|id| !removed.contains(id));
    }
}

impl FileSystem {
    /// View `folder`.
    pub fn navigate_to(&self, folder: NodeId) -> Result<Self, FsError> {
        let node = self.store.get_or_error(&folder)?;
        if !node.is_folder() {
            return Err(FsError::InvalidOperation(format!(
                "\"{}\" is not a folder",
                node.name
            )));
        }
        let mut next = self.clone();
        next.nav.current_folder = folder;
        debug!(folder = %folder, "navigated");
        Ok(next)
    }

    /// Select a node, or clear the selection.
    pub fn select(&self, node: Option<NodeId>) -> Result<Self, FsError> {
        if let Some(id) = node {
            self.store.get_or_error(&id)?;
        }
        let mut next = self.clone();
        next.nav.selected = node;
        Ok(next)
    }

    /// Open a file and make it active.
    pub fn open_file(&self, file: NodeId) -> Result<Self, FsError> {
        let node = self.store.get_or_error(&file)?;
        if !node.is_file() {
            return Err(FsError::InvalidOperation(format!(
                "\"{}\" is a folder and cannot be opened",
                node.name
            )));
        }
        let mut next = self.clone();
        next.nav.open_files.insert(file);
        next.nav.active_file = Some(file);
        Ok(next)
    }

    /// Close a file; closing one that is not open changes nothing.
    pub fn close_file(&self, file: NodeId) -> Result<Self, FsError> {
        let mut next = self.clone();
        next.nav.open_files.remove(&file);
        if next.nav.active_file == Some(file) {
            next.nav.active_file = None;
        }
        Ok(next)
    }

    /// Switch the active file among the open ones, or clear it.
    pub fn set_active(&self, file: Option<NodeId>) -> Result<Self, FsError> {
        if let Some(id) = file {
            self.store.get_or_error(&id)?;
            if !self.nav.is_open(&id) {
                return Err(FsError::InvalidOperation(format!("{} is not open", id)));
            }
        }
        let mut next = self.clone();
        next.nav.active_file = file;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::{CreateRequest, FileSystem};
    use crate::error::FsError;

    #[test]
    fn open_close_tracks_active_file() {
        let fs = FileSystem::new(10, 10).unwrap();
        let (fs, a) = fs.create(&CreateRequest::file(fs.root(), "a.txt", "hi")).unwrap();
        let (fs, b) = fs.create(&CreateRequest::file(fs.root(), "b.txt", "yo")).unwrap();

        let fs = fs.open_file(a).unwrap().open_file(b).unwrap();
        assert_eq!(fs.navigation().active_file, Some(b));
        let fs = fs.set_active(Some(a)).unwrap();
        let fs = fs.close_file(a).unwrap();
        assert_eq!(fs.navigation().active_file, None);
        assert!(fs.navigation().is_open(&b));
        assert!(matches!(fs.set_active(Some(a)), Err(FsError::InvalidOperation(_))));
    }

    #[test]
    fn navigate_requires_folder() {
        let fs = FileSystem::new(10, 10).unwrap();
        let (fs, docs) = fs.create(&CreateRequest::folder(fs.root(), "docs")).unwrap();
        let (fs, file) = fs.create(&CreateRequest::file(docs, "a.txt", "")).unwrap();
        let moved = fs.navigate_to(docs).unwrap();
        assert_eq!(moved.navigation().current_folder, docs);
        assert!(matches!(fs.navigate_to(file), Err(FsError::InvalidOperation(_))));
        assert!(matches!(fs.open_file(docs), Err(FsError::InvalidOperation(_))));
    }

    #[test]
    fn delete_clears_references_into_subtree() {
        let fs = FileSystem::new(10, 10).unwrap();
        let root = fs.root();
        let (fs, docs) = fs.create(&CreateRequest::folder(root, "docs")).unwrap();
        let (fs, a) = fs.create(&CreateRequest::file(docs, "a.txt", "x")).unwrap();
        let fs = fs
            .navigate_to(docs)
            .unwrap()
            .select(Some(a))
            .unwrap()
            .open_file(a)
            .unwrap();

        let fs = fs.delete(docs).unwrap();
        let nav = fs.navigation();
        assert_eq!(nav.current_folder, root);
        assert_eq!(nav.selected, None);
        assert_eq!(nav.active_file, None);
        assert!(nav.open_files.is_empty());
    }
}
