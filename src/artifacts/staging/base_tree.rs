//! Base tree snapshots
//!
//! A `BaseTree` is one level of a committed tree, loaded read-only from the
//! object store. Subdirectories are loaded on demand, only when the merge
//! descends into them.

use crate::areas::store::{ObjectReader, RefStore};
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object::Unpackable;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tree::{Tree, TreeEntry};
use crate::errors::{StageError, StageResult};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseTree {
    oid: ObjectId,
    tree: Tree,
}

impl BaseTree {
    /// Load the tree object `oid`
    ///
    /// Fails with `NotFound` if the object is missing and `Corrupt` if it is
    /// not a well-formed tree.
    pub fn load<R: ObjectReader + ?Sized>(reader: &R, oid: &ObjectId) -> StageResult<Self> {
        let (object_type, content) = reader
            .get(oid)?
            .ok_or_else(|| StageError::NotFound(format!("tree {oid}")))?;
        if object_type != ObjectType::Tree {
            return Err(StageError::corrupt(
                oid,
                format!("expected a tree, found a {object_type}"),
            ));
        }

        let tree = Tree::deserialize(&content)
            .map_err(|error| StageError::corrupt(oid, format!("{error:#}")))?;

        Ok(BaseTree {
            oid: oid.clone(),
            tree,
        })
    }

    /// Resolve a revision to the tree it names
    ///
    /// A full hex ID is used directly; anything else is looked up through the
    /// ref store. Commits are peeled to their tree.
    pub fn resolve<R, F>(reader: &R, refs: &F, revision: &str) -> StageResult<Self>
    where
        R: ObjectReader + ?Sized,
        F: RefStore + ?Sized,
    {
        let not_found = || StageError::NotFound(format!("revision {revision}"));

        let oid = if ObjectId::is_full_hex(revision) {
            ObjectId::try_parse(revision.to_string()).map_err(|_| not_found())?
        } else {
            match refs.read_ref(revision) {
                Ok(oid) => oid.ok_or_else(not_found)?,
                // revision syntax such as `HEAD~1` is not a ref name either
                Err(StageError::InvalidRefName(_)) => return Err(not_found()),
                Err(error) => return Err(error),
            }
        };

        let (object_type, content) = reader.get(&oid)?.ok_or_else(not_found)?;
        let tree_oid = match object_type {
            ObjectType::Tree => oid,
            ObjectType::Commit => Commit::deserialize(&content)
                .map_err(|error| StageError::corrupt(&oid, format!("{error:#}")))?
                .tree_oid()
                .clone(),
            ObjectType::Blob => return Err(not_found()),
        };
        debug!(revision, tree = %tree_oid, "resolved base tree");

        Self::load(reader, &tree_oid)
    }

    pub(crate) fn from_parts(oid: ObjectId, tree: Tree) -> Self {
        BaseTree { oid, tree }
    }

    pub fn oid(&self) -> &ObjectId {
        &self.oid
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Entries of this level, in canonical order
    pub fn entries(&self) -> impl Iterator<Item = &TreeEntry> {
        self.tree.entries()
    }

    /// Snapshot of the subdirectory `name`, if this level has one
    pub fn child<R: ObjectReader + ?Sized>(
        &self,
        reader: &R,
        name: &str,
    ) -> StageResult<Option<BaseTree>> {
        self.tree
            .directory(name)
            .map(|entry| Self::load(reader, &entry.oid))
            .transpose()
    }
}
