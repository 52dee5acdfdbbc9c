// Builds small git repositories for tests.

use git2::{Commit, Oid, Repository, Signature, Time};
use std::collections::BTreeMap;
use std::path::Path;
use tempfile::TempDir;

pub const FIRST_TIME: i64 = 1_600_000_000;
pub const SECOND_TIME: i64 = 1_700_000_000;

pub const BLOB: i32 = 0o100644;
pub const BLOB_EXECUTABLE: i32 = 0o100755;
const TREE: i32 = 0o040000;

pub const README: &[u8] = b"hello\n";
pub const MAIN_RS: &[u8] = b"fn main() {}\n";
pub const GUIDE: &[u8] = b"step one\nstep two\n";
pub const RUN_SH: &[u8] = b"#!/bin/sh\necho run\n";
pub const SPACED: &[u8] = b"spaced\n";

pub struct Fixture {
    pub dir: TempDir,
    pub first: Oid,
    pub second: Oid,
}

impl Fixture {
    /// Two commits on `branch`:
    ///
    /// ```text
    /// first  README.md, src/main.rs, src/lib.rs
    /// second + docs/guide.txt, bin/run.sh (755), dir with space/a b.txt,
    ///          src/lib.rs changed
    /// ```
    pub fn new(branch: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let refname = format!("refs/heads/{}", branch);

        let first = commit(
            &repo,
            &refname,
            FIRST_TIME,
            None,
            &[
                ("README.md", README, BLOB),
                ("src/main.rs", MAIN_RS, BLOB),
                ("src/lib.rs", b"pub fn lib() {}\n".as_slice(), BLOB),
            ],
        );
        let second = commit(
            &repo,
            &refname,
            SECOND_TIME,
            Some(first),
            &[
                ("README.md", README, BLOB),
                ("src/main.rs", MAIN_RS, BLOB),
                ("src/lib.rs", b"pub fn lib() -> u8 { 1 }\n".as_slice(), BLOB),
                ("docs/guide.txt", GUIDE, BLOB),
                ("bin/run.sh", RUN_SH, BLOB_EXECUTABLE),
                ("dir with space/a b.txt", SPACED, BLOB),
            ],
        );

        Self { dir, first, second }
    }

    /// A single commit on `branch` holding exactly `files`, whose paths are
    /// raw bytes so that names need not be UTF-8.
    pub fn with_files(branch: &str, files: &[(&[u8], &[u8], i32)]) -> Self {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let refname = format!("refs/heads/{}", branch);
        let id = commit_bytes(&repo, &refname, FIRST_TIME, None, files);

        Self {
            dir,
            first: id,
            second: id,
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

fn commit(
    repo: &Repository,
    refname: &str,
    time: i64,
    parent: Option<Oid>,
    files: &[(&str, &[u8], i32)],
) -> Oid {
    let files: Vec<(&[u8], &[u8], i32)> = files
        .iter()
        .map(|&(path, content, mode)| (path.as_bytes(), content, mode))
        .collect();
    commit_bytes(repo, refname, time, parent, &files)
}

fn commit_bytes(
    repo: &Repository,
    refname: &str,
    time: i64,
    parent: Option<Oid>,
    files: &[(&[u8], &[u8], i32)],
) -> Oid {
    let tree_id = build_tree(repo, files);
    let tree = repo.find_tree(tree_id).unwrap();
    let sig = Signature::new("Fixture", "fixture@example.com", &Time::new(time, 0)).unwrap();
    let parent = parent.map(|id| repo.find_commit(id).unwrap());
    let parents: Vec<&Commit> = parent.iter().collect();
    repo.commit(Some(refname), &sig, &sig, "fixture", &tree, &parents)
        .unwrap()
}

fn build_tree<'a>(repo: &Repository, files: &[(&'a [u8], &'a [u8], i32)]) -> Oid {
    let mut builder = repo.treebuilder(None).unwrap();
    let mut subdirs: BTreeMap<&'a [u8], Vec<(&'a [u8], &'a [u8], i32)>> = BTreeMap::new();

    for &(path, content, mode) in files {
        match path.iter().position(|&byte| byte == b'/') {
            Some(slash) => subdirs
                .entry(&path[..slash])
                .or_default()
                .push((&path[slash + 1..], content, mode)),
            None => {
                let blob = repo.blob(content).unwrap();
                builder.insert(path, blob, mode).unwrap();
            }
        }
    }
    for (dir, entries) in subdirs {
        let subtree = build_tree(repo, &entries);
        builder.insert(dir, subtree, TREE).unwrap();
    }

    builder.write().unwrap()
}
