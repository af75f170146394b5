//! Card profile loader
//!
//! Builds a [`FileTree`] from a JSON profile. Each node object carries a
//! `type`, a `fid`, an optional `name` and type-specific content:
//!
//! ```json
//! { "type": "MF", "fid": "3F00", "children": [
//!     { "type": "EF_TRANSPARENT", "fid": "2FE2", "content_hex": "98 10 32 54" },
//!     { "type": "ADF", "fid": "7FFF", "name": "ADF_USIM", "children": [
//!         { "type": "EF_LINEAR_FIXED", "fid": "6F3C", "record_len": 4,
//!           "records_hex": ["00FFFFFF", "01FFFFFF"] }
//!     ] }
//! ] }
//! ```
//!
//! Validation (FID uniqueness, record lengths) happens while building; any
//! failure aborts the whole load.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::info;
use serde::Deserialize;
use thiserror::Error;

use super::node::{Container, LinearFixedEf, NodeKind, TransparentEf};
use super::tree::{FileTree, NodeId};
use super::FsError;

/// Errors raised while loading a profile
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed profile: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid FID {0:?}")]
    InvalidFid(String),

    #[error("unknown node type '{node_type}' for {node}")]
    UnknownType { node_type: String, node: String },

    #[error("profile root must be type MF, got {0}")]
    RootNotMaster(String),

    #[error("{0} missing 'record_len' for EF_LINEAR_FIXED")]
    MissingRecordLen(String),

    #[error("bad hex content in {node}: {source}")]
    Hex {
        node: String,
        #[source]
        source: hex::FromHexError,
    },

    #[error("non-ASCII text content in {0}")]
    NotAscii(String),

    #[error("records_file of {node} is {len} bytes, not a multiple of record_len {record_len}")]
    RecordsFileLength {
        node: String,
        len: usize,
        record_len: usize,
    },

    #[error("invalid node {node}: {source}")]
    Tree {
        node: String,
        #[source]
        source: FsError,
    },
}

/// FID as written in a profile: a number or a hex string ("3F00", "0x3F00")
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FidValue {
    Number(u64),
    Text(String),
}

impl FidValue {
    pub fn parse(&self) -> Result<u16, ProfileError> {
        match self {
            Self::Number(n) => u16::try_from(*n).map_err(|_| ProfileError::InvalidFid(n.to_string())),
            Self::Text(s) => {
                let trimmed = s.trim();
                let digits = trimmed
                    .strip_prefix("0x")
                    .or_else(|| trimmed.strip_prefix("0X"))
                    .unwrap_or(trimmed);
                u16::from_str_radix(digits, 16).map_err(|_| ProfileError::InvalidFid(s.clone()))
            }
        }
    }
}

/// One node of a profile description
#[derive(Debug, Clone, Deserialize)]
pub struct NodeSpec {
    #[serde(rename = "type", default)]
    pub node_type: String,
    pub fid: FidValue,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub children: Vec<NodeSpec>,

    // Transparent EF content, first present wins
    #[serde(default)]
    pub content_file: Option<PathBuf>,
    #[serde(default)]
    pub content_hex: Option<String>,
    #[serde(default)]
    pub content_ascii: Option<String>,

    // Linear Fixed EF content, first present wins
    #[serde(default)]
    pub record_len: Option<usize>,
    #[serde(default)]
    pub records_hex: Option<Vec<String>>,
    #[serde(default)]
    pub records_file: Option<PathBuf>,
    #[serde(default)]
    pub records_ascii: Option<Vec<String>>,
}

/// Node types accepted in the `type` field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpecType {
    Master,
    Dedicated,
    Application,
    Transparent,
    LinearFixed,
}

impl FromStr for SpecType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MF" => Ok(Self::Master),
            "DF" => Ok(Self::Dedicated),
            "ADF" => Ok(Self::Application),
            "EF_TRANSPARENT" | "TRANSPARENT_EF" | "EF_T" => Ok(Self::Transparent),
            "EF_LINEAR_FIXED" | "LINEAR_FIXED_EF" | "EF_LF" => Ok(Self::LinearFixed),
            _ => Err(()),
        }
    }
}

/// Load a profile file. Content files are resolved against `data_dir`, or
/// the profile's own directory when `data_dir` is None.
pub fn load_profile(profile_path: &Path, data_dir: Option<&Path>) -> Result<FileTree, ProfileError> {
    let base_dir = data_dir
        .map(Path::to_path_buf)
        .or_else(|| profile_path.parent().map(Path::to_path_buf))
        .unwrap_or_default();

    let text = read_to_string(profile_path)?;
    let spec: NodeSpec = serde_json::from_str(&text)?;
    let tree = build_tree(&spec, &base_dir)?;

    info!(
        "Loaded profile {:?}: {} nodes, MF {:04X}",
        profile_path,
        tree.len(),
        tree.root_fid()
    );
    Ok(tree)
}

/// Build a validated tree from an already parsed description
pub fn build_tree(spec: &NodeSpec, base_dir: &Path) -> Result<FileTree, ProfileError> {
    let fid = spec.fid.parse()?;
    let name = node_name(spec, fid);
    if parse_type(spec, &name)? != SpecType::Master {
        return Err(ProfileError::RootNotMaster(name));
    }

    let mut tree = FileTree::new(fid, name);
    let root = tree.root();
    for child in &spec.children {
        add_node(&mut tree, root, child, base_dir)?;
    }
    Ok(tree)
}

fn add_node(
    tree: &mut FileTree,
    parent: NodeId,
    spec: &NodeSpec,
    base_dir: &Path,
) -> Result<(), ProfileError> {
    let fid = spec.fid.parse()?;
    let name = node_name(spec, fid);
    let label = format!("{}({:04X})", name, fid);

    let kind: NodeKind = match parse_type(spec, &label)? {
        SpecType::Master => {
            return Err(ProfileError::Tree {
                node: label,
                source: FsError::MisplacedMaster(fid),
            })
        }
        SpecType::Dedicated => Container::dedicated().into(),
        SpecType::Application => Container::application().into(),
        SpecType::Transparent => TransparentEf::new(read_content(spec, &label, base_dir)?).into(),
        SpecType::LinearFixed => {
            let record_len = spec
                .record_len
                .ok_or_else(|| ProfileError::MissingRecordLen(label.clone()))?;
            let records = read_records(spec, record_len, &label, base_dir)?;
            LinearFixedEf::new(record_len, records)
                .map_err(|source| ProfileError::Tree {
                    node: label.clone(),
                    source,
                })?
                .into()
        }
    };

    let id = tree
        .add_child(parent, fid, name, kind)
        .map_err(|source| ProfileError::Tree {
            node: label,
            source,
        })?;

    for child in &spec.children {
        add_node(tree, id, child, base_dir)?;
    }
    Ok(())
}

fn node_name(spec: &NodeSpec, fid: u16) -> String {
    spec.name.clone().unwrap_or_else(|| format!("FID_{:04X}", fid))
}

fn parse_type(spec: &NodeSpec, label: &str) -> Result<SpecType, ProfileError> {
    spec.node_type
        .parse()
        .map_err(|_| ProfileError::UnknownType {
            node_type: spec.node_type.clone(),
            node: label.to_string(),
        })
}

/// content_file > content_hex > content_ascii > empty
fn read_content(spec: &NodeSpec, label: &str, base_dir: &Path) -> Result<Vec<u8>, ProfileError> {
    if let Some(file) = &spec.content_file {
        return read_file(&base_dir.join(file));
    }
    if let Some(text) = &spec.content_hex {
        return decode_hex(text, label);
    }
    if let Some(text) = &spec.content_ascii {
        return ascii_bytes(text, label);
    }
    Ok(Vec::new())
}

/// records_hex > records_file > records_ascii > empty
fn read_records(
    spec: &NodeSpec,
    record_len: usize,
    label: &str,
    base_dir: &Path,
) -> Result<Vec<Vec<u8>>, ProfileError> {
    if let Some(records) = &spec.records_hex {
        return records.iter().map(|r| decode_hex(r, label)).collect();
    }
    if let Some(file) = &spec.records_file {
        let blob = read_file(&base_dir.join(file))?;
        if record_len == 0 || blob.len() % record_len != 0 {
            return Err(ProfileError::RecordsFileLength {
                node: label.to_string(),
                len: blob.len(),
                record_len,
            });
        }
        return Ok(blob.chunks(record_len).map(<[u8]>::to_vec).collect());
    }
    if let Some(records) = &spec.records_ascii {
        return records.iter().map(|r| ascii_bytes(r, label)).collect();
    }
    Ok(Vec::new())
}

fn decode_hex(text: &str, label: &str) -> Result<Vec<u8>, ProfileError> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(compact).map_err(|source| ProfileError::Hex {
        node: label.to_string(),
        source,
    })
}

fn ascii_bytes(text: &str, label: &str) -> Result<Vec<u8>, ProfileError> {
    if !text.is_ascii() {
        return Err(ProfileError::NotAscii(label.to_string()));
    }
    Ok(text.as_bytes().to_vec())
}

fn read_file(path: &Path) -> Result<Vec<u8>, ProfileError> {
    fs::read(path).map_err(|source| ProfileError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn read_to_string(path: &Path) -> Result<String, ProfileError> {
    fs::read_to_string(path).map_err(|source| ProfileError::Io {
        path: path.to_path_buf(),
        source,
    })
}
