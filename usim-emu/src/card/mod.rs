//! Virtual card: session state, command handlers and dispatch

pub mod dispatcher;
pub mod handlers;
pub mod session;

pub use dispatcher::{dispatch, dispatch_apdu, Handler};
pub use session::CardSession;

use std::sync::Arc;

use log::info;
use parking_lot::Mutex;

use crate::config::SessionPolicy;
use crate::filesystem::FileTree;

/// A card built from one file tree.
///
/// Hands out a [`SessionHandle`] per conversation according to the
/// configured [`SessionPolicy`].
#[derive(Debug, Clone)]
pub struct VirtualCard {
    tree: Arc<FileTree>,
    policy: SessionPolicy,
    /// Only set for [`SessionPolicy::Shared`]
    shared: Option<Arc<Mutex<CardSession>>>,
}

impl VirtualCard {
    pub fn new(tree: Arc<FileTree>, policy: SessionPolicy) -> Self {
        let shared = match policy {
            SessionPolicy::PerConnection => None,
            SessionPolicy::Shared => Some(Arc::new(Mutex::new(CardSession::new(tree.clone())))),
        };
        info!(
            "Virtual card ready: MF {:04X}, {} files, {} sessions",
            tree.root_fid(),
            tree.len(),
            policy
        );
        Self {
            tree,
            policy,
            shared,
        }
    }

    pub fn tree(&self) -> &Arc<FileTree> {
        &self.tree
    }

    pub fn policy(&self) -> SessionPolicy {
        self.policy
    }

    /// Session for a new conversation
    pub fn open_session(&self) -> SessionHandle {
        match &self.shared {
            Some(shared) => SessionHandle::Shared(shared.clone()),
            None => SessionHandle::Owned(CardSession::new(self.tree.clone())),
        }
    }
}

/// The session used by one conversation
#[derive(Debug)]
pub enum SessionHandle {
    /// Private to the conversation
    Owned(CardSession),
    /// One card shared by every conversation; each command runs under the lock
    Shared(Arc<Mutex<CardSession>>),
}

impl SessionHandle {
    /// Process one raw command, see [`dispatch`]
    pub fn dispatch(&mut self, raw: &[u8]) -> Vec<u8> {
        match self {
            Self::Owned(session) => dispatch(session, raw),
            Self::Shared(shared) => dispatch(&mut shared.lock(), raw),
        }
    }
}
