//! Arena-backed file tree
//!
//! All nodes live in one `Vec`, the root at index 0. Ownership is strictly
//! top-down through [`Container`] child lists; the parent link on each node
//! is a plain index used for path reconstruction only.

use log::debug;

use super::node::{Container, ContainerKind, FileNode, NodeKind};
use super::FsError;

/// Handle to a node inside one [`FileTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// The card file system
#[derive(Debug, Clone)]
pub struct FileTree {
    nodes: Vec<FileNode>,
}

impl FileTree {
    /// Create a tree holding only the MF
    pub fn new(root_fid: u16, root_name: impl Into<String>) -> Self {
        Self {
            nodes: vec![FileNode {
                fid: root_fid,
                name: root_name.into(),
                parent: None,
                kind: NodeKind::Container(Container::new(ContainerKind::Master)),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn root_fid(&self) -> u16 {
        self.nodes[0].fid
    }

    /// Get a node. `id` must come from this tree.
    pub fn node(&self, id: NodeId) -> &FileNode {
        &self.nodes[id.0]
    }

    /// Total number of nodes, MF included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Attach a new node under the container `parent`.
    ///
    /// Fails with [`FsError::DuplicateFid`] if a direct child already uses
    /// `fid`; the tree is left untouched in that case.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        fid: u16,
        name: impl Into<String>,
        kind: impl Into<NodeKind>,
    ) -> Result<NodeId, FsError> {
        let kind = kind.into();
        if let NodeKind::Container(c) = &kind {
            if c.kind() == ContainerKind::Master {
                return Err(FsError::MisplacedMaster(fid));
            }
        }

        let container = self
            .node(parent)
            .as_container()
            .ok_or_else(|| FsError::NotAContainer(self.path_str(parent)))?;
        if let Some(existing) = container.get_child(fid) {
            return Err(FsError::DuplicateFid {
                fid,
                parent: self.path_str(parent),
                existing: self.node(existing).name.clone(),
            });
        }

        let id = NodeId(self.nodes.len());
        self.nodes.push(FileNode {
            fid,
            name: name.into(),
            parent: Some(parent),
            kind,
        });
        if let NodeKind::Container(c) = &mut self.nodes[parent.0].kind {
            c.insert(fid, id);
        }
        debug!("Added {}", self.path_str(id));
        Ok(id)
    }

    /// Direct-children lookup under `container`
    pub fn get_child(&self, container: NodeId, fid: u16) -> Option<NodeId> {
        self.node(container).as_container()?.get_child(fid)
    }

    /// Search downwards from `from`.
    ///
    /// Order: the node itself, then its direct children, then each child
    /// container's subtree in insertion order. EFs are never searched into.
    pub fn find(&self, from: NodeId, fid: u16) -> Option<NodeId> {
        let node = self.node(from);
        if node.fid == fid {
            return Some(from);
        }
        let container = node.as_container()?;
        if let Some(hit) = container.get_child(fid) {
            return Some(hit);
        }
        container
            .children()
            .iter()
            .filter(|&&child| self.node(child).is_container())
            .find_map(|&child| self.find(child, fid))
    }

    /// FIDs from the MF down to `id`
    pub fn path_fids(&self, id: NodeId) -> Vec<u16> {
        let mut fids: Vec<u16> = self.ancestry(id).map(|n| n.fid).collect();
        fids.reverse();
        fids
    }

    /// `MF(3F00)/ADF_USIM(7FFF)/EF_IMSI(6F07)` style path to `id`
    pub fn path_str(&self, id: NodeId) -> String {
        let mut parts: Vec<String> = self.ancestry(id).map(FileNode::label).collect();
        parts.reverse();
        parts.join("/")
    }

    fn ancestry(&self, id: NodeId) -> impl Iterator<Item = &FileNode> + '_ {
        std::iter::successors(Some(self.node(id)), move |n| n.parent.map(|p| self.node(p)))
    }
}
