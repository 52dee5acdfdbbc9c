// Read-only view of one git revision, addressed by virtual paths.
pub mod error;
pub mod filter;
pub mod git_tree;

#[cfg(test)]
pub mod test_fixture;

pub use error::TreeError;
pub use git_tree::GitTree;

use crate::constants::SHORT_ID_LEN;
use git2::Oid;

/// Handle to a tree or blob of the opened revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub Oid);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Directory,
    File,
    ExecutableFile,
}

/// One row of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: Vec<u8>, // Raw bytes as stored in the tree
    pub kind: NodeKind,
    pub size: u64,
    pub links: usize, // Child count for directories, 1 otherwise
    pub modified: i64, // Seconds since the epoch
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileNode {
    pub id: NodeId,
    pub size: u64,
    pub executable: bool,
}

#[derive(Debug, Clone)]
pub struct Revision {
    pub name: String,
    pub id: Oid,
    pub root: Oid,
    pub time: i64,
}

impl Revision {
    pub fn short_id(&self) -> String {
        let mut id = self.id.to_string();
        id.truncate(SHORT_ID_LEN);
        id
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TreeOptions {
    pub text_filters: bool,
    pub last_modified_lookup: bool,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            text_filters: true,
            last_modified_lookup: true,
        }
    }
}
