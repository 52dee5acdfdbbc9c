use super::filter::render_for_checkout;
use super::{DirEntry, FileNode, NodeId, NodeKind, Revision, TreeError, TreeOptions};
use crate::core_path::VirtualPath;
use git2::{ObjectType, Oid, Repository, Sort, Tree, TreeEntry};
use log::{debug, info};
use std::collections::HashMap;
use std::path::Path;

const EXECUTABLE_MODE: i32 = 0o100755;

/// One session's view of a repository revision.
///
/// Nodes are handed out as [`NodeId`]s and looked up again on use, so no
/// borrowed libgit2 object outlives a call. Fields drop in declaration
/// order, the repository last.
pub struct GitTree {
    mtime_cache: HashMap<VirtualPath, i64>,
    options: TreeOptions,
    revision: Revision,
    repo: Repository,
}

impl GitTree {
    /// Opens the repository at `path` and resolves the first usable name in
    /// `candidates`.
    pub fn open<P: AsRef<Path>>(
        path: P,
        candidates: &[String],
        options: TreeOptions,
    ) -> Result<Self, TreeError> {
        let path = path.as_ref();
        let repo = Repository::open(path).map_err(|source| TreeError::Open {
            path: path.display().to_string(),
            source,
        })?;
        let revision = find_revision(&repo, candidates)?;

        info!(
            "Opened {} at {} ({})",
            path.display(),
            revision.name,
            revision.short_id()
        );

        Ok(Self {
            mtime_cache: HashMap::new(),
            options,
            revision,
            repo,
        })
    }

    pub fn revision(&self) -> &Revision {
        &self.revision
    }

    pub fn root(&self) -> NodeId {
        NodeId(self.revision.root)
    }

    /// Resolves `path` to a directory. The root never goes through the
    /// provider's path lookup.
    pub fn resolve_dir(&self, path: &VirtualPath) -> Result<NodeId, TreeError> {
        if path.is_root() {
            return Ok(self.root());
        }

        let entry = self.entry_at(path)?;
        match entry.kind() {
            Some(ObjectType::Tree) => Ok(NodeId(entry.id())),
            _ => Err(TreeError::NotADirectory(path.to_string())),
        }
    }

    pub fn resolve_file(&self, path: &VirtualPath) -> Result<FileNode, TreeError> {
        if path.is_root() {
            return Err(TreeError::NotAFile(path.to_string()));
        }

        let entry = self.entry_at(path)?;
        if entry.kind() != Some(ObjectType::Blob) {
            return Err(TreeError::NotAFile(path.to_string()));
        }

        let blob = self.repo.find_blob(entry.id())?;
        Ok(FileNode {
            id: NodeId(entry.id()),
            size: blob.size() as u64,
            executable: entry.filemode() == EXECUTABLE_MODE,
        })
    }

    /// Immediate children of `dir`, in the order git stores them.
    pub fn list(&mut self, dir: NodeId, dir_path: &VirtualPath) -> Result<Vec<DirEntry>, TreeError> {
        let mut entries = Vec::new();
        let mut ids = Vec::new();

        {
            let tree = self.repo.find_tree(dir.0)?;
            for entry in tree.iter() {
                let name = entry.name_bytes().to_vec();
                let (kind, size, links) = match entry.kind() {
                    Some(ObjectType::Tree) => {
                        let children = self.repo.find_tree(entry.id())?.len();
                        (NodeKind::Directory, 0, children)
                    }
                    Some(ObjectType::Blob) => {
                        let size = self.repo.find_blob(entry.id())?.size() as u64;
                        let kind = if entry.filemode() == EXECUTABLE_MODE {
                            NodeKind::ExecutableFile
                        } else {
                            NodeKind::File
                        };
                        (kind, size, 1)
                    }
                    // submodule
                    _ => (NodeKind::Directory, 0, 0),
                };

                ids.push((name.clone(), entry.id()));
                entries.push(DirEntry {
                    name,
                    kind,
                    size,
                    links,
                    modified: self.revision.time,
                });
            }
        }

        if self.options.last_modified_lookup {
            let times = self.children_last_modified(dir_path, &ids)?;
            for (entry, modified) in entries.iter_mut().zip(times) {
                entry.modified = modified;
            }
        }

        Ok(entries)
    }

    /// Leaf content, rendered for checkout when text filters are enabled.
    pub fn read(&self, file: &FileNode, path: &VirtualPath) -> Result<Vec<u8>, TreeError> {
        let blob = self.repo.find_blob(file.id.0)?;
        if !self.options.text_filters {
            return Ok(blob.content().to_vec());
        }

        let rel = path.to_provider_path().unwrap_or_default();
        Ok(render_for_checkout(&self.repo, &rel, &blob)?)
    }

    fn entry_at(&self, path: &VirtualPath) -> Result<TreeEntry<'static>, TreeError> {
        let not_found = || TreeError::NotFound(path.to_string());
        let (name, parents) = path.segments().split_last().ok_or_else(not_found)?;

        let root = self.repo.find_tree(self.revision.root)?;
        let dir = subtree(&self.repo, root, parents)?.ok_or_else(not_found)?;
        let entry = child(&dir, name).map(|entry| entry.to_owned());
        entry.ok_or_else(not_found)
    }

    /// Last-modified times for the given children of `dir_path`, in order.
    fn children_last_modified(
        &mut self,
        dir_path: &VirtualPath,
        children: &[(Vec<u8>, Oid)],
    ) -> Result<Vec<i64>, TreeError> {
        let keys: Vec<VirtualPath> = children
            .iter()
            .map(|(name, _)| dir_path.child(name))
            .collect();

        let pending: Vec<(usize, &[u8], Oid)> = children
            .iter()
            .enumerate()
            .filter(|(index, _)| !self.mtime_cache.contains_key(&keys[*index]))
            .map(|(index, (name, id))| (index, name.as_slice(), *id))
            .collect();

        if !pending.is_empty() {
            debug!(
                "Walking history of {} for {} entries",
                dir_path,
                pending.len()
            );
            for (index, time) in self.walk_history(dir_path, &pending)? {
                self.mtime_cache.insert(keys[index].clone(), time);
            }
        }

        Ok(keys
            .iter()
            .map(|key| {
                self.mtime_cache
                    .get(key)
                    .copied()
                    .unwrap_or(self.revision.time)
            })
            .collect())
    }

    /// Follows first parents from the opened revision. An entry's time is
    /// that of the oldest commit in the unbroken run where it still has its
    /// current object id.
    fn walk_history(
        &self,
        dir_path: &VirtualPath,
        pending: &[(usize, &[u8], Oid)],
    ) -> Result<Vec<(usize, i64)>, TreeError> {
        let mut walk = self.repo.revwalk()?;
        walk.set_sorting(Sort::TOPOLOGICAL)?;
        walk.push(self.revision.id)?;
        walk.simplify_first_parent()?;

        let mut open: Vec<(usize, &[u8], Oid, i64)> = pending
            .iter()
            .map(|&(index, name, id)| (index, name, id, self.revision.time))
            .collect();
        let mut done = Vec::with_capacity(pending.len());

        for commit_id in walk {
            if open.is_empty() {
                break;
            }

            let commit = self.repo.find_commit(commit_id?)?;
            let when = commit.time().seconds();
            let dir = subtree(&self.repo, commit.tree()?, dir_path.segments())?;

            let mut still_open = Vec::with_capacity(open.len());
            for (index, name, id, seen) in open {
                let here = dir
                    .as_ref()
                    .and_then(|tree| child(tree, name).map(|entry| entry.id()));
                if here == Some(id) {
                    still_open.push((index, name, id, when));
                } else {
                    done.push((index, seen));
                }
            }
            open = still_open;
        }

        done.extend(open.into_iter().map(|(index, _, _, seen)| (index, seen)));
        Ok(done)
    }
}

fn find_revision(repo: &Repository, candidates: &[String]) -> Result<Revision, TreeError> {
    for name in candidates {
        let commit = match repo
            .revparse_single(&format!("{}^{{commit}}", name))
            .and_then(|object| object.peel_to_commit())
        {
            Ok(commit) => commit,
            Err(e) => {
                debug!("Revision {} is not usable: {}", name, e.message());
                continue;
            }
        };

        return Ok(Revision {
            name: name.clone(),
            id: commit.id(),
            root: commit.tree_id(),
            time: commit.time().seconds(),
        });
    }

    Err(TreeError::RevisionNotFound(candidates.to_vec()))
}

/// Follows `segments` down from `tree`; `None` when a segment is missing or
/// is not a directory.
fn subtree<'r>(
    repo: &'r Repository,
    tree: Tree<'r>,
    segments: &[Vec<u8>],
) -> Result<Option<Tree<'r>>, TreeError> {
    let mut tree = tree;
    for segment in segments {
        let next = match child(&tree, segment) {
            Some(entry) if entry.kind() == Some(ObjectType::Tree) => entry.id(),
            _ => return Ok(None),
        };
        tree = repo.find_tree(next)?;
    }
    Ok(Some(tree))
}

/// Looks up one entry by its raw name. Git names never contain NUL.
fn child<'t>(tree: &'t Tree<'_>, name: &[u8]) -> Option<TreeEntry<'t>> {
    if name.contains(&0) {
        return None;
    }
    tree.get_name_bytes(name)
}
