//! Selection state of one card conversation
//!
//! A session remembers the current DF (base for relative selection) and the
//! current file (target of READ commands). It starts at the MF.

use std::sync::Arc;

use crate::filesystem::{FileNode, FileTree, NodeId};

/// Per-conversation card state
#[derive(Debug, Clone)]
pub struct CardSession {
    tree: Arc<FileTree>,
    /// Always a container
    current_container: NodeId,
    current_file: NodeId,
}

impl CardSession {
    /// Create a session with the MF selected
    pub fn new(tree: Arc<FileTree>) -> Self {
        let root = tree.root();
        Self {
            tree,
            current_container: root,
            current_file: root,
        }
    }

    pub fn tree(&self) -> &FileTree {
        &self.tree
    }

    pub fn current_container(&self) -> NodeId {
        self.current_container
    }

    pub fn current_file(&self) -> NodeId {
        self.current_file
    }

    /// The currently selected node
    pub fn current_file_node(&self) -> &FileNode {
        self.tree.node(self.current_file)
    }

    /// Make `id` the current file. Containers also become the current DF;
    /// selecting an EF leaves the current DF alone.
    pub fn select_node(&mut self, id: NodeId) {
        self.current_file = id;
        if self.tree.node(id).is_container() {
            self.current_container = id;
        }
    }

    /// Select the MF
    pub fn reset_to_root(&mut self) {
        let root = self.tree.root();
        self.current_container = root;
        self.current_file = root;
    }

    /// Search under the current DF
    pub fn find_relative(&self, fid: u16) -> Option<NodeId> {
        self.tree.find(self.current_container, fid)
    }

    /// Search from the MF
    pub fn find_global(&self, fid: u16) -> Option<NodeId> {
        self.tree.find(self.tree.root(), fid)
    }
}
