//! File node kinds
//!
//! Every node is one of a closed set of kinds. Handlers match on
//! [`NodeKind`] directly, so a new kind shows up at every match site.

use std::collections::HashMap;

use super::tree::NodeId;
use super::FsError;

/// Container flavours. All of them behave the same; the flavour is kept
/// for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    /// Master File (root)
    Master,
    /// Dedicated File
    Dedicated,
    /// Application Dedicated File
    Application,
}

impl ContainerKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Master => "MF",
            Self::Dedicated => "DF",
            Self::Application => "ADF",
        }
    }
}

/// A DF-like node holding children keyed by FID
#[derive(Debug, Clone)]
pub struct Container {
    kind: ContainerKind,
    /// Children in insertion order
    children: Vec<NodeId>,
    by_fid: HashMap<u16, NodeId>,
}

impl Container {
    pub(crate) fn new(kind: ContainerKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
            by_fid: HashMap::new(),
        }
    }

    /// An empty DF
    pub fn dedicated() -> Self {
        Self::new(ContainerKind::Dedicated)
    }

    /// An empty ADF
    pub fn application() -> Self {
        Self::new(ContainerKind::Application)
    }

    pub fn kind(&self) -> ContainerKind {
        self.kind
    }

    /// Direct children, in insertion order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Direct-children lookup only
    pub fn get_child(&self, fid: u16) -> Option<NodeId> {
        self.by_fid.get(&fid).copied()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub(crate) fn insert(&mut self, fid: u16, id: NodeId) {
        self.by_fid.insert(fid, id);
        self.children.push(id);
    }
}

/// Transparent EF: a flat byte array read by offset
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransparentEf {
    content: Vec<u8>,
}

impl TransparentEf {
    pub fn new(content: Vec<u8>) -> Self {
        Self { content }
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn size(&self) -> usize {
        self.content.len()
    }

    /// Read `length` bytes starting at `offset`.
    ///
    /// `offset == size` is valid and yields nothing. A request running past
    /// the end is truncated, so the result may be shorter than `length`.
    pub fn read_binary(&self, offset: usize, length: usize) -> Result<&[u8], FsError> {
        if offset > self.content.len() {
            return Err(FsError::OffsetOutOfRange {
                offset,
                size: self.content.len(),
            });
        }
        let end = offset.saturating_add(length).min(self.content.len());
        Ok(&self.content[offset..end])
    }
}

/// Linear Fixed EF: equal-length records addressed 1-based
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearFixedEf {
    record_len: usize,
    records: Vec<Vec<u8>>,
}

impl LinearFixedEf {
    /// Build the file, checking every record is exactly `record_len` bytes
    pub fn new(record_len: usize, records: Vec<Vec<u8>>) -> Result<Self, FsError> {
        if record_len == 0 {
            return Err(FsError::InvalidArgument("record_len must be > 0"));
        }
        if let Some((index, record)) = records
            .iter()
            .enumerate()
            .find(|(_, r)| r.len() != record_len)
        {
            return Err(FsError::RecordLengthMismatch {
                index: index + 1,
                expected: record_len,
                actual: record.len(),
            });
        }
        Ok(Self { record_len, records })
    }

    pub fn record_len(&self) -> usize {
        self.record_len
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Read record `number` (1 is the first record)
    pub fn read_record(&self, number: usize) -> Result<&[u8], FsError> {
        if number == 0 || number > self.records.len() {
            return Err(FsError::RecordOutOfRange {
                record: number,
                count: self.records.len(),
            });
        }
        Ok(&self.records[number - 1])
    }
}

/// The closed set of node kinds
#[derive(Debug, Clone)]
pub enum NodeKind {
    Container(Container),
    Transparent(TransparentEf),
    LinearFixed(LinearFixedEf),
}

impl NodeKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Container(c) => c.kind().label(),
            Self::Transparent(_) => "EF_TRANSPARENT",
            Self::LinearFixed(_) => "EF_LINEAR_FIXED",
        }
    }
}

impl From<Container> for NodeKind {
    fn from(container: Container) -> Self {
        Self::Container(container)
    }
}

impl From<TransparentEf> for NodeKind {
    fn from(ef: TransparentEf) -> Self {
        Self::Transparent(ef)
    }
}

impl From<LinearFixedEf> for NodeKind {
    fn from(ef: LinearFixedEf) -> Self {
        Self::LinearFixed(ef)
    }
}

/// A node of the file tree
#[derive(Debug, Clone)]
pub struct FileNode {
    pub(crate) fid: u16,
    pub(crate) name: String,
    /// Non-owning link to the parent container, None for the root
    pub(crate) parent: Option<NodeId>,
    pub(crate) kind: NodeKind,
}

impl FileNode {
    pub fn fid(&self) -> u16 {
        self.fid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn is_container(&self) -> bool {
        matches!(self.kind, NodeKind::Container(_))
    }

    pub fn as_container(&self) -> Option<&Container> {
        match &self.kind {
            NodeKind::Container(c) => Some(c),
            _ => None,
        }
    }

    /// `NAME(FID)` label used in paths and logs
    pub fn label(&self) -> String {
        format!("{}({:04X})", self.name, self.fid)
    }
}
