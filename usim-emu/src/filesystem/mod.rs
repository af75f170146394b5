//! On-card file system
//!
//! MF/DF/ADF containers and Transparent / Linear Fixed elementary files,
//! stored in an arena ([`FileTree`]) and addressed by [`NodeId`].
//! The tree is built once (usually by [`loader::load_profile`]) and is
//! read-only afterwards.

pub mod loader;
pub mod node;
pub mod tree;

pub use loader::{load_profile, ProfileError};
pub use node::{Container, ContainerKind, FileNode, LinearFixedEf, NodeKind, TransparentEf};
pub use tree::{FileTree, NodeId};

use thiserror::Error;

/// Well known FID of the Master File
pub const MF_FID: u16 = 0x3F00;

/// Errors raised by tree construction and file access
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FsError {
    #[error("duplicate FID {fid:04X} under {parent} (already used by {existing})")]
    DuplicateFid {
        fid: u16,
        parent: String,
        existing: String,
    },

    #[error("{0} is not a DF and cannot hold children")]
    NotAContainer(String),

    #[error("MF {0:04X} can only be the root of the tree")]
    MisplacedMaster(u16),

    #[error("offset {offset} out of range for {size} byte file")]
    OffsetOutOfRange { offset: usize, size: usize },

    #[error("record {record} not found ({count} records)")]
    RecordOutOfRange { record: usize, count: usize },

    #[error("record {index} has length {actual}, expected {expected}")]
    RecordLengthMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
}
