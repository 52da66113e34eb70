//! Tree merge and serialization
//!
//! Merges a staged tree over an optional base snapshot, one directory level
//! at a time, depth-first and post-order:
//!
//! 1. Seed the level with the base entries, keyed by sort key.
//! 2. Overlay staged entries. File content and tombstones own their name at
//!    that level: any base file *or* directory of the same name is dropped,
//!    then content becomes a blob record. A staged directory recurses with
//!    the matching base child and replaces a base file of the same name only
//!    if the merged subtree has entries.
//! 3. Encode the level canonically (see `Tree`) and hash it.
//!
//! Nothing is written while merging. Every blob and tree of the result is
//! queued in a `WriteSet`, children before parents, so the caller decides
//! whether (and when) to persist.
//!
//! Directories left with no entries after the merge are omitted from their
//! parent instead of being recorded as the empty tree, as `git write-tree`
//! never records empty subtrees. The root is always kept.

use crate::areas::store::{ObjectReader, ObjectWriter};
use crate::artifacts::objects::entry_mode::EntryMode;
use crate::artifacts::objects::object::Packable;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tree::{sort_key, Tree, TreeEntry};
use crate::artifacts::staging::base_tree::BaseTree;
use crate::artifacts::staging::staged_tree::{StagedEntry, StagedTree};
use crate::artifacts::staging::write_set::WriteSet;
use crate::errors::{StageError, StageResult};
use tracing::debug;

/// Result of a merge: the root tree plus every object it needs
#[derive(Debug, Clone)]
pub struct MergedTree {
    oid: ObjectId,
    root: Tree,
    objects: WriteSet,
}

impl MergedTree {
    pub fn oid(&self) -> &ObjectId {
        &self.oid
    }

    pub fn root(&self) -> &Tree {
        &self.root
    }

    /// The merged root as a snapshot, usable as the base of a later merge
    pub fn into_base(self) -> BaseTree {
        BaseTree::from_parts(self.oid, self.root)
    }

    pub fn objects(&self) -> &WriteSet {
        &self.objects
    }

    /// Persist all objects of the merged tree, children first
    pub fn flush<W: ObjectWriter + ?Sized>(&self, writer: &W) -> StageResult<()> {
        self.objects.flush(writer)
    }
}

pub struct TreeWriter<'r, R: ?Sized> {
    reader: &'r R,
    objects: WriteSet,
}

impl<'r, R: ObjectReader + ?Sized> TreeWriter<'r, R> {
    /// `reader` is used to load base subdirectories as the merge reaches them
    pub fn new(reader: &'r R) -> Self {
        TreeWriter {
            reader,
            objects: WriteSet::default(),
        }
    }

    pub fn merge(mut self, staged: &StagedTree, base: Option<&BaseTree>) -> StageResult<MergedTree> {
        let root = self.merge_level(staged, base, "")?;
        let oid = self.push_tree(&root, "")?;

        Ok(MergedTree {
            oid,
            root,
            objects: self.objects,
        })
    }

    fn merge_level(
        &mut self,
        staged: &StagedTree,
        base: Option<&BaseTree>,
        path: &str,
    ) -> StageResult<Tree> {
        let mut tree = base.map(|base| base.tree().clone()).unwrap_or_default();

        for (name, entry) in staged.entries() {
            let file_key = sort_key(name.as_bytes(), false);
            let dir_key = sort_key(name.as_bytes(), true);

            match entry {
                StagedEntry::FileContent { content, mode } => {
                    tree.remove(&file_key);
                    tree.remove(&dir_key);
                    let oid = self.objects.push(ObjectType::Blob, content.clone());
                    tree.insert(TreeEntry::new(name.clone(), *mode, oid));
                }
                StagedEntry::Directory(child) => {
                    let base_child = match base {
                        Some(base) => base.child(self.reader, name)?,
                        None => None,
                    };
                    let child_path = join_path(path, name);

                    let subtree = self.merge_level(child, base_child.as_ref(), &child_path)?;
                    tree.remove(&dir_key);
                    if subtree.is_empty() {
                        // a base file of the same name survives
                        debug!(path = %child_path, "omitting empty directory");
                        continue;
                    }

                    tree.remove(&file_key);
                    let oid = self.push_tree(&subtree, &child_path)?;
                    tree.insert(TreeEntry::new(name.clone(), EntryMode::Directory, oid));
                }
                StagedEntry::Deleted => {
                    tree.remove(&file_key);
                    tree.remove(&dir_key);
                    debug!(path = %join_path(path, name), "removed entry");
                }
            }
        }

        Ok(tree)
    }

    fn push_tree(&mut self, tree: &Tree, path: &str) -> StageResult<ObjectId> {
        let content = tree.serialize().map_err(|source| StageError::Write {
            kind: ObjectType::Tree,
            source,
        })?;
        let oid = self.objects.push(ObjectType::Tree, content);
        debug!(path, entries = tree.len(), %oid, "serialized tree level");

        Ok(oid)
    }
}

fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}
