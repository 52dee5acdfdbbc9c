use crate::core_network::pasv::PassiveListener;
use crate::core_path::VirtualPath;
use crate::core_tree::{GitTree, NodeId, TreeError};
use std::net::Ipv4Addr;

/// State of one control connection.
///
/// Fields drop in declaration order: the pending passive listener goes
/// first and the tree view, which owns the root, goes last.
pub struct Session {
    pub pasv: Option<PassiveListener>,
    pub current_path: VirtualPath,
    pub current_dir: NodeId,
    pub local_ip: Option<Ipv4Addr>, // None when the control connection is not IPv4
    pub tree: GitTree,
}

impl Session {
    pub fn new(tree: GitTree, local_ip: Option<Ipv4Addr>) -> Self {
        Self {
            pasv: None,
            current_path: VirtualPath::root(),
            current_dir: tree.root(),
            local_ip,
            tree,
        }
    }

    /// Moves to `path`, which must already be normalized. On failure the
    /// session keeps its current location.
    pub fn change_dir(&mut self, path: VirtualPath) -> Result<(), TreeError> {
        let node = if path.is_root() {
            self.tree.root()
        } else {
            self.tree.resolve_dir(&path)?
        };
        self.current_path = path;
        self.current_dir = node;
        Ok(())
    }

    /// Short id of the served revision, for the greeting.
    pub fn revision_short_id(&self) -> String {
        self.tree.revision().short_id()
    }
}
