//! Staging session and commit builder
//!
//! A `Stage` owns the pending changes of one session: the staged tree and
//! an optional base snapshot. It turns them into tree objects and commits
//! through the object and ref stores it is given.
//!
//! ## Commit sequence
//!
//! 1. Merge the staged tree over the base. Nothing is written yet.
//! 2. If the merged root equals `last_tree`, stop with `NoChanges`.
//! 3. Resolve the author and check the ref name.
//! 4. Persist blobs and trees (children first), then the commit object.
//! 5. Point the ref at the new commit.
//!
//! After a successful commit the staged entries are cleared and the merged
//! root becomes the new base, so the session can keep going. Any failure
//! leaves the session as it was.

use crate::areas::config::IdentityResolver;
use crate::areas::refs::{validate_ref_name, DEFAULT_BRANCH};
use crate::areas::store::{ObjectStore, ObjectWriter, RefStore};
use crate::artifacts::objects::commit::{Author, Commit, Identity};
use crate::artifacts::objects::entry_mode::EntryMode;
use crate::artifacts::objects::object::Packable;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::staging::base_tree::BaseTree;
use crate::artifacts::staging::staged_tree::StagedTree;
use crate::artifacts::staging::tree_writer::{MergedTree, TreeWriter};
use crate::errors::{StageError, StageResult};
use bytes::Bytes;
use chrono::{DateTime, FixedOffset};
use tracing::{debug, info};

/// Everything a commit needs besides the tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitRequest {
    message: String,
    parents: Vec<ObjectId>,
    author: Option<Identity>,
    timestamp: Option<DateTime<FixedOffset>>,
    last_tree: Option<ObjectId>,
    ref_name: Option<String>,
}

impl CommitRequest {
    /// The message is stored verbatim
    pub fn new(message: impl Into<String>) -> Self {
        CommitRequest {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn parent(mut self, parent: ObjectId) -> Self {
        self.parents.push(parent);
        self
    }

    pub fn parents(mut self, parents: impl IntoIterator<Item = ObjectId>) -> Self {
        self.parents.extend(parents);
        self
    }

    /// Commit as `identity` instead of asking the identity resolver
    pub fn author(mut self, identity: Identity) -> Self {
        self.author = Some(identity);
        self
    }

    /// Fixed author and committer time; defaults to now
    pub fn timestamp(mut self, timestamp: DateTime<FixedOffset>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Tree of the previous commit; an identical merge result is not committed
    pub fn last_tree(mut self, tree: ObjectId) -> Self {
        self.last_tree = Some(tree);
        self
    }

    /// Ref to advance; defaults to `master`
    pub fn ref_name(mut self, name: impl Into<String>) -> Self {
        self.ref_name = Some(name.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed { commit: ObjectId, tree: ObjectId },
    /// The merged tree matched `last_tree`; nothing was written
    NoChanges { tree: ObjectId },
}

pub struct Stage<S, R> {
    store: S,
    refs: R,
    identity: Option<Box<dyn IdentityResolver>>,
    staged: StagedTree,
    base: Option<BaseTree>,
}

impl<S: ObjectStore, R: RefStore> Stage<S, R> {
    pub fn new(store: S, refs: R) -> Self {
        Stage {
            store,
            refs,
            identity: None,
            staged: StagedTree::default(),
            base: None,
        }
    }

    /// Where the author comes from when a request names none
    pub fn with_identity_resolver(mut self, resolver: impl IdentityResolver + 'static) -> Self {
        self.identity = Some(Box::new(resolver));
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn refs(&self) -> &R {
        &self.refs
    }

    pub fn add(&mut self, path: &str, content: impl Into<Bytes>) -> StageResult<()> {
        self.staged.add(path, content)?;
        debug!(path, "staged file");
        Ok(())
    }

    pub fn add_executable(&mut self, path: &str, content: impl Into<Bytes>) -> StageResult<()> {
        self.staged.add_with_mode(path, content, EntryMode::Executable)?;
        debug!(path, "staged executable");
        Ok(())
    }

    pub fn add_with_mode(
        &mut self,
        path: &str,
        content: impl Into<Bytes>,
        mode: EntryMode,
    ) -> StageResult<()> {
        self.staged.add_with_mode(path, content, mode)?;
        debug!(path, %mode, "staged file");
        Ok(())
    }

    pub fn delete(&mut self, path: &str) -> StageResult<()> {
        self.staged.delete(path)?;
        debug!(path, "staged removal");
        Ok(())
    }

    /// Drop all staged entries; the base is kept
    pub fn clear(&mut self) {
        self.staged.clear();
    }

    pub fn staged(&self) -> &StagedTree {
        &self.staged
    }

    /// Use the tree named by `revision` as the base of later merges
    pub fn read_base(&mut self, revision: &str) -> StageResult<&BaseTree> {
        let base = BaseTree::resolve(&self.store, &self.refs, revision)?;
        debug!(revision, tree = %base.oid(), "loaded base");

        Ok(self.base.insert(base))
    }

    pub fn set_base(&mut self, base: Option<BaseTree>) {
        self.base = base;
    }

    pub fn base(&self) -> Option<&BaseTree> {
        self.base.as_ref()
    }

    /// Compute the merged tree without writing anything
    pub fn merge(&self) -> StageResult<MergedTree> {
        TreeWriter::new(&self.store).merge(&self.staged, self.base.as_ref())
    }

    /// Merge and persist the resulting trees, returning the root ID
    pub fn write_tree(&self) -> StageResult<ObjectId> {
        let merged = self.merge()?;
        merged.flush(&self.store)?;
        debug!(tree = %merged.oid(), objects = merged.objects().len(), "wrote tree");

        Ok(merged.oid().clone())
    }

    /// Store a single blob, outside of any tree
    pub fn write_blob(&self, content: &[u8]) -> StageResult<ObjectId> {
        self.store.put(ObjectType::Blob, content)
    }

    pub fn commit(&mut self, request: CommitRequest) -> StageResult<CommitOutcome> {
        let merged = self.merge()?;

        if request.last_tree.as_ref() == Some(merged.oid()) {
            info!(tree = %merged.oid(), "tree unchanged, skipping commit");
            return Ok(CommitOutcome::NoChanges {
                tree: merged.oid().clone(),
            });
        }

        let identity = match request.author {
            Some(identity) => identity,
            None => self.resolve_identity()?,
        };
        let ref_name = request
            .ref_name
            .unwrap_or_else(|| DEFAULT_BRANCH.to_string());
        validate_ref_name(&ref_name)?;

        merged.flush(&self.store)?;

        let author = match request.timestamp {
            Some(timestamp) => Author::new_with_timestamp(identity, timestamp),
            None => Author::new(identity),
        };
        let commit = Commit::new(
            request.parents,
            merged.oid().clone(),
            author,
            request.message,
        );
        let content = commit.serialize().map_err(|source| StageError::Write {
            kind: ObjectType::Commit,
            source,
        })?;
        let commit_oid = self.store.put(ObjectType::Commit, &content)?;

        self.refs.update_ref(&ref_name, &commit_oid)?;
        info!(
            commit = %commit_oid,
            tree = %merged.oid(),
            ref_name = %ref_name,
            parents = commit.parents().len(),
            "created commit"
        );

        let tree = merged.oid().clone();
        self.staged.clear();
        self.base = Some(merged.into_base());

        Ok(CommitOutcome::Committed {
            commit: commit_oid,
            tree,
        })
    }

    fn resolve_identity(&self) -> StageResult<Identity> {
        match &self.identity {
            Some(resolver) => resolver
                .resolve_identity()?
                .ok_or(StageError::MissingIdentity),
            None => Err(StageError::MissingIdentity),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::areas::memory::{MemoryRefs, MemoryStore};
    use crate::areas::store::ObjectReader;
    use crate::artifacts::objects::object::Unpackable;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    type MemoryStage<'a> = Stage<&'a MemoryStore, &'a MemoryRefs>;

    /// Fails every tree write
    struct RejectingTrees(MemoryStore);

    impl ObjectWriter for RejectingTrees {
        fn put(&self, object_type: ObjectType, content: &[u8]) -> StageResult<ObjectId> {
            if object_type == ObjectType::Tree {
                return Err(StageError::Write {
                    kind: object_type,
                    source: anyhow::anyhow!("disk full"),
                });
            }
            self.0.put(object_type, content)
        }
    }

    impl ObjectReader for RejectingTrees {
        fn get(&self, oid: &ObjectId) -> StageResult<Option<(ObjectType, Bytes)>> {
            self.0.get(oid)
        }
    }

    /// Fails every ref update, as a held lock would
    struct LockedRefs;

    impl RefStore for LockedRefs {
        fn read_ref(&self, _name: &str) -> StageResult<Option<ObjectId>> {
            Ok(None)
        }

        fn update_ref(&self, name: &str, _oid: &ObjectId) -> StageResult<()> {
            Err(StageError::RefUpdate {
                name: name.to_string(),
                source: anyhow::anyhow!("Unable to create '{name}.lock': File exists"),
            })
        }
    }

    #[fixture]
    fn fixed_time() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2024-05-01T12:00:00+02:00").expect("valid timestamp")
    }

    fn committed(outcome: CommitOutcome) -> (ObjectId, ObjectId) {
        match outcome {
            CommitOutcome::Committed { commit, tree } => (commit, tree),
            other => panic!("expected a commit, got {other:?}"),
        }
    }

    fn load_commit(store: &MemoryStore, oid: &ObjectId) -> anyhow::Result<Commit> {
        let (kind, content) = store.get(oid)?.expect("commit stored");
        assert_eq!(kind, ObjectType::Commit);
        Commit::deserialize(&content)
    }

    #[rstest]
    fn first_commit_writes_blob_tree_commit_and_ref(
        fixed_time: DateTime<FixedOffset>,
    ) -> anyhow::Result<()> {
        let store = MemoryStore::new();
        let refs = MemoryRefs::new();
        let mut stage: MemoryStage = Stage::new(&store, &refs);

        stage.add("README", "hello")?;
        let outcome = stage.commit(
            CommitRequest::new("init")
                .author(Identity::new("A", "a@x.com"))
                .timestamp(fixed_time)
                .ref_name("main"),
        )?;
        let (commit_oid, tree_oid) = committed(outcome);

        assert_eq!(
            store.writes().iter().map(|(kind, _)| *kind).collect::<Vec<_>>(),
            vec![ObjectType::Blob, ObjectType::Tree, ObjectType::Commit]
        );
        assert_eq!(refs.updates(), vec![("main".to_string(), commit_oid.clone())]);

        let commit = load_commit(&store, &commit_oid)?;
        assert_eq!(commit.tree_oid(), &tree_oid);
        assert!(commit.parents().is_empty());
        assert_eq!(commit.message(), "init");
        assert_eq!(commit.author().display(), "A <a@x.com> 1714557600 +0200");

        let raw = String::from_utf8(commit.serialize()?.to_vec())?;
        assert!(!raw.contains("parent "));
        Ok(())
    }

    #[rstest]
    fn unchanged_tree_writes_nothing(fixed_time: DateTime<FixedOffset>) -> anyhow::Result<()> {
        let store = MemoryStore::new();
        let refs = MemoryRefs::new();
        let mut stage: MemoryStage = Stage::new(&store, &refs);
        stage.add("README", "hello")?;
        let expected = stage.merge()?.oid().clone();

        let outcome = stage.commit(
            CommitRequest::new("again")
                .timestamp(fixed_time)
                .last_tree(expected.clone()),
        )?;

        assert_eq!(outcome, CommitOutcome::NoChanges { tree: expected });
        assert!(store.writes().is_empty());
        assert!(refs.updates().is_empty());
        assert!(stage.staged().get("README").is_some());
        Ok(())
    }

    #[test]
    fn missing_identity_fails_before_any_write() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        let refs = MemoryRefs::new();
        let mut stage: MemoryStage = Stage::new(&store, &refs);
        stage.add("a.txt", "a")?;

        let result = stage.commit(CommitRequest::new("msg"));

        assert!(matches!(result, Err(StageError::MissingIdentity)));
        assert!(store.writes().is_empty());
        assert!(refs.updates().is_empty());
        Ok(())
    }

    #[test]
    fn invalid_ref_name_fails_before_any_write() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        let refs = MemoryRefs::new();
        let mut stage: MemoryStage = Stage::new(&store, &refs);
        stage.add("a.txt", "a")?;

        let result = stage.commit(
            CommitRequest::new("msg")
                .author(Identity::new("A", "a@x.com"))
                .ref_name("bad..name"),
        );

        assert!(matches!(result, Err(StageError::InvalidRefName(_))));
        assert!(store.writes().is_empty());
        Ok(())
    }

    #[test]
    fn resolver_supplies_identity_and_default_ref() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        let refs = MemoryRefs::new();
        let mut stage: MemoryStage =
            Stage::new(&store, &refs).with_identity_resolver(Identity::new("R", "r@x.com"));
        stage.add("a.txt", "a")?;

        let (commit_oid, _) = committed(stage.commit(CommitRequest::new("msg"))?);

        let commit = load_commit(&store, &commit_oid)?;
        assert_eq!(commit.author().identity(), &Identity::new("R", "r@x.com"));
        assert_eq!(commit.committer(), commit.author());
        assert_eq!(refs.read_ref(DEFAULT_BRANCH)?, Some(commit_oid));
        Ok(())
    }

    #[rstest]
    fn session_continues_from_the_committed_tree(
        fixed_time: DateTime<FixedOffset>,
    ) -> anyhow::Result<()> {
        let store = MemoryStore::new();
        let refs = MemoryRefs::new();
        let mut stage: MemoryStage = Stage::new(&store, &refs);
        let author = Identity::new("A", "a@x.com");

        stage.add("src/lib.rs", "lib")?;
        stage.add("README", "hello")?;
        let (first, first_tree) = committed(stage.commit(
            CommitRequest::new("one")
                .author(author.clone())
                .timestamp(fixed_time),
        )?);

        assert!(stage.staged().is_empty());
        assert_eq!(stage.base().map(|base| base.oid()), Some(&first_tree));

        stage.add("src/main.rs", "main")?;
        let (second, second_tree) = committed(stage.commit(
            CommitRequest::new("two")
                .author(author)
                .timestamp(fixed_time)
                .parent(first.clone())
                .last_tree(first_tree.clone()),
        )?);

        let commit = load_commit(&store, &second)?;
        assert_eq!(commit.parents(), &[first]);
        assert_ne!(second_tree, first_tree);

        let mut names = Vec::new();
        let root = BaseTree::load(&store, &second_tree)?;
        for entry in root.entries() {
            names.push(entry.name_lossy().into_owned());
        }
        let src = root.child(&store, "src")?.expect("src kept");
        for entry in src.entries() {
            names.push(format!("src/{}", entry.name_lossy()));
        }
        assert_eq!(names, vec!["README", "src", "src/lib.rs", "src/main.rs"]);
        Ok(())
    }

    #[rstest]
    fn base_read_by_ref_is_merged_into_the_commit(
        fixed_time: DateTime<FixedOffset>,
    ) -> anyhow::Result<()> {
        let store = MemoryStore::new();
        let refs = MemoryRefs::new();
        let author = Identity::new("A", "a@x.com");

        let mut first: MemoryStage = Stage::new(&store, &refs);
        first.add("keep.txt", "keep")?;
        first.add("drop.txt", "drop")?;
        first.commit(
            CommitRequest::new("one")
                .author(author.clone())
                .timestamp(fixed_time)
                .ref_name("main"),
        )?;

        let mut second: MemoryStage = Stage::new(&store, &refs);
        second.read_base("main")?;
        second.delete("drop.txt")?;
        second.add("new.txt", "new")?;
        let tree = second.write_tree()?;

        let names = BaseTree::load(&store, &tree)?
            .entries()
            .map(|entry| entry.name_lossy().into_owned())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["keep.txt", "new.txt"]);
        Ok(())
    }

    #[test]
    fn failed_tree_write_creates_no_commit_and_keeps_the_session() -> anyhow::Result<()> {
        let store = RejectingTrees(MemoryStore::new());
        let refs = MemoryRefs::new();
        let mut stage = Stage::new(&store, &refs);
        stage.add("a.txt", "a")?;

        let result = stage.commit(CommitRequest::new("msg").author(Identity::new("A", "a@x.com")));

        assert!(matches!(result, Err(StageError::Write { kind: ObjectType::Tree, .. })));
        assert_eq!(store.0.write_count(ObjectType::Commit), 0);
        assert!(refs.updates().is_empty());
        assert!(stage.staged().get("a.txt").is_some());
        assert!(stage.base().is_none());
        Ok(())
    }

    #[rstest]
    fn failed_ref_update_keeps_the_session(fixed_time: DateTime<FixedOffset>) -> anyhow::Result<()> {
        let store = MemoryStore::new();
        let mut stage = Stage::new(&store, LockedRefs);
        stage.add("a.txt", "a")?;

        let result = stage.commit(
            CommitRequest::new("msg")
                .author(Identity::new("A", "a@x.com"))
                .timestamp(fixed_time),
        );

        assert!(matches!(result, Err(StageError::RefUpdate { ref name, .. }) if name == "master"));
        // objects already written stay in the store
        assert_eq!(store.write_count(ObjectType::Commit), 1);
        assert!(stage.staged().get("a.txt").is_some());
        assert!(stage.base().is_none());

        // a retry recomputes the same tree and commit
        let retry = stage.commit(
            CommitRequest::new("msg")
                .author(Identity::new("A", "a@x.com"))
                .timestamp(fixed_time),
        );
        assert!(matches!(retry, Err(StageError::RefUpdate { .. })));
        assert_eq!(store.len(), 3);
        Ok(())
    }

    #[test]
    fn invalid_paths_are_rejected_at_staging_time() {
        let store = MemoryStore::new();
        let refs = MemoryRefs::new();
        let mut stage: MemoryStage = Stage::new(&store, &refs);

        for path in ["", "a//b", "/abs", "a/../b"] {
            assert!(matches!(
                stage.add(path, "x"),
                Err(StageError::InvalidPath { .. })
            ));
        }
        assert!(stage.staged().is_empty());
    }
}
