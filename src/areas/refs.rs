//! Git references (branches, HEAD, tags)
//!
//! References are human-readable names pointing to commits. They are stored
//! as text files under the git directory containing either:
//! - A 40-character SHA-1 hash (direct reference)
//! - `ref: <path>` for symbolic references
//!
//! Short names resolve the way git does: `<name>`, `refs/<name>`,
//! `refs/tags/<name>`, then `refs/heads/<name>`. Updates to a short name
//! always target `refs/heads/<name>`.

use crate::areas::store::RefStore;
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::{StageError, StageResult};
use anyhow::Context;
use derive_new::new;
use file_guard::Lock;
use std::io::{Seek, SeekFrom, Write};
use std::ops::DerefMut;
use std::path::Path;
use tracing::debug;

/// Name of the HEAD reference
pub const HEAD_REF_NAME: &str = "HEAD";

/// Branch git creates when none is configured
pub const DEFAULT_BRANCH: &str = "master";

const REFS_PREFIX: &str = "refs/";
const HEADS_PREFIX: &str = "refs/heads/";
const TAGS_PREFIX: &str = "refs/tags/";
/// Symbolic refs followed before giving up, as git does
const MAX_SYMREF_DEPTH: usize = 5;

/// Regex pattern for parsing symbolic references
const SYMREF_REGEX: &str = r"^ref: (.+)$";

/// Patterns git refuses in ref names
pub const INVALID_REF_NAME_REGEX: &str =
    r"^\.|\/\.|\.\.|^\/|\/$|\.lock$|@\{|[\x00-\x20\*:\?\[\\~\^\x7f]";

/// Git references manager backed by a `.git` directory
#[derive(Debug, new)]
pub struct Refs {
    path: Box<Path>,
}

/// Internal representation of a reference value
#[derive(Debug, Clone)]
enum SymRefOrOid {
    SymRef { target: String },
    Oid(ObjectId),
}

impl SymRefOrOid {
    fn read_symref_or_oid(path: &Path) -> anyhow::Result<Option<SymRefOrOid>> {
        if !path.is_file() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read ref file at {:?}", path))?;
        let content = content.trim();

        if content.is_empty() {
            return Ok(None);
        }

        let symref_match = regex::Regex::new(SYMREF_REGEX)?.captures(content);
        if let Some(symref_match) = symref_match {
            Ok(Some(SymRefOrOid::SymRef {
                target: symref_match[1].to_string(),
            }))
        } else {
            Ok(Some(SymRefOrOid::Oid(ObjectId::try_parse(
                content.to_string(),
            )?)))
        }
    }
}

/// Validate a ref name against git's naming rules
pub fn validate_ref_name(name: &str) -> StageResult<()> {
    let invalid = || StageError::InvalidRefName(name.to_string());
    let re = regex::Regex::new(INVALID_REF_NAME_REGEX).map_err(|_| invalid())?;

    if name.is_empty() || re.is_match(name) {
        return Err(invalid());
    }
    Ok(())
}

/// Full name a short ref name is written under
pub fn qualify_ref_name(name: &str) -> String {
    if name == HEAD_REF_NAME || name.starts_with(REFS_PREFIX) {
        name.to_string()
    } else {
        format!("{HEADS_PREFIX}{name}")
    }
}

impl Refs {
    pub fn head_path(&self) -> Box<Path> {
        self.path.join(HEAD_REF_NAME).into_boxed_path()
    }

    pub fn refs_path(&self) -> Box<Path> {
        self.path.join("refs").into_boxed_path()
    }

    pub fn heads_path(&self) -> Box<Path> {
        self.path.join(HEADS_PREFIX).into_boxed_path()
    }

    /// Point HEAD at a branch symbolically
    pub fn set_head_branch(&self, branch: &str) -> anyhow::Result<()> {
        self.write_ref_file(
            &self.head_path(),
            &format!("ref: {}\n", qualify_ref_name(branch)),
        )
    }

    /// Follow symbolic references from `path` until a direct OID (or nothing)
    fn read_symref(&self, path: &Path, depth: usize) -> anyhow::Result<Option<ObjectId>> {
        match SymRefOrOid::read_symref_or_oid(path)? {
            Some(SymRefOrOid::SymRef { target }) => {
                Self::check_depth(path, depth)?;
                self.read_symref(&self.path.join(target), depth + 1)
            }
            Some(SymRefOrOid::Oid(oid)) => Ok(Some(oid)),
            None => Ok(None),
        }
    }

    /// Update the reference at `path`, writing through symbolic references
    ///
    /// Holds an exclusive lock on the reference file while it is rewritten.
    fn update_symref(&self, path: &Path, oid: &ObjectId, depth: usize) -> anyhow::Result<()> {
        match SymRefOrOid::read_symref_or_oid(path)? {
            Some(SymRefOrOid::SymRef { target }) => {
                Self::check_depth(path, depth)?;
                self.update_symref(&self.path.join(target), oid, depth + 1)
            }
            Some(SymRefOrOid::Oid(_)) | None => {
                self.write_ref_file(path, &format!("{oid}\n"))
            }
        }
    }

    fn check_depth(path: &Path, depth: usize) -> anyhow::Result<()> {
        if depth >= MAX_SYMREF_DEPTH {
            anyhow::bail!("symbolic ref {:?} nests too deep (possible cycle)", path);
        }
        Ok(())
    }

    fn write_ref_file(&self, path: &Path, raw_ref: &str) -> anyhow::Result<()> {
        // create all the parent directories if they don't exist
        std::fs::create_dir_all(path.parent().with_context(|| {
            format!(
                "failed to create parent directories for ref file at {:?}",
                path
            )
        })?)?;

        let mut ref_file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("failed to open ref file at {:?}", path))?;
        let mut lock = file_guard::lock(&mut ref_file, Lock::Exclusive, 0, 1)
            .with_context(|| format!("failed to lock ref file at {:?}", path))?;

        let file = lock.deref_mut();
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(raw_ref.as_bytes())
            .with_context(|| format!("failed to write ref file at {:?}", path))?;

        Ok(())
    }

    fn candidates(name: &str) -> Vec<String> {
        if name == HEAD_REF_NAME || name.starts_with(REFS_PREFIX) {
            return vec![name.to_string()];
        }

        vec![
            name.to_string(),
            format!("{REFS_PREFIX}{name}"),
            format!("{TAGS_PREFIX}{name}"),
            format!("{HEADS_PREFIX}{name}"),
        ]
    }
}

impl RefStore for Refs {
    fn read_ref(&self, name: &str) -> StageResult<Option<ObjectId>> {
        validate_ref_name(name)?;

        for candidate in Self::candidates(name) {
            let path = self.path.join(&candidate);
            if !path.is_file() {
                continue;
            }

            return self
                .read_symref(&path, 0)
                .map_err(|source| StageError::RefRead {
                    name: candidate,
                    source,
                });
        }

        Ok(None)
    }

    fn update_ref(&self, name: &str, oid: &ObjectId) -> StageResult<()> {
        validate_ref_name(name)?;
        let qualified = qualify_ref_name(name);

        self.update_symref(&self.path.join(&qualified), oid, 0)
            .map_err(|source| StageError::RefUpdate {
                name: qualified.clone(),
                source,
            })?;
        debug!(name = %qualified, %oid, "updated ref");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::objects::object_type::ObjectType;
    use assert_fs::TempDir;
    use pretty_assertions::assert_eq;
    use proptest::proptest;

    fn commit_id(seed: &str) -> ObjectId {
        ObjectId::hash_object(ObjectType::Commit, seed.as_bytes())
    }

    #[test]
    fn short_names_are_written_under_heads() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let refs = Refs::new(dir.path().into());
        let oid = commit_id("a");

        refs.update_ref("main", &oid)?;

        let content = std::fs::read_to_string(dir.path().join("refs/heads/main"))?;
        assert_eq!(content, format!("{oid}\n"));
        assert_eq!(refs.read_ref("main")?, Some(oid.clone()));
        assert_eq!(refs.read_ref("refs/heads/main")?, Some(oid));
        Ok(())
    }

    #[test]
    fn updating_head_writes_through_to_the_branch() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let refs = Refs::new(dir.path().into());
        refs.set_head_branch(DEFAULT_BRANCH)?;
        let oid = commit_id("b");

        refs.update_ref(HEAD_REF_NAME, &oid)?;

        assert_eq!(
            std::fs::read_to_string(dir.path().join("HEAD"))?,
            "ref: refs/heads/master\n"
        );
        assert_eq!(refs.read_ref("master")?, Some(oid.clone()));
        assert_eq!(refs.read_ref(HEAD_REF_NAME)?, Some(oid));
        Ok(())
    }

    #[test]
    fn shorter_rewrite_leaves_no_stale_bytes() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let refs = Refs::new(dir.path().into());
        let path = dir.path().join("refs/heads/topic");
        std::fs::create_dir_all(path.parent().unwrap())?;
        std::fs::write(&path, format!("{}\n\n\n", commit_id("old")))?;

        let oid = commit_id("new");
        refs.update_ref("topic", &oid)?;

        assert_eq!(std::fs::read_to_string(&path)?, format!("{oid}\n"));
        Ok(())
    }

    #[test]
    fn unborn_refs_read_as_none() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let refs = Refs::new(dir.path().into());
        refs.set_head_branch(DEFAULT_BRANCH)?;

        assert_eq!(refs.read_ref(HEAD_REF_NAME)?, None);
        assert_eq!(refs.read_ref("feature")?, None);
        Ok(())
    }

    #[test]
    fn symbolic_ref_cycles_fail_instead_of_recursing() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let refs = Refs::new(dir.path().into());
        std::fs::write(dir.path().join("HEAD"), "ref: HEAD\n")?;

        assert!(matches!(
            refs.read_ref(HEAD_REF_NAME),
            Err(StageError::RefRead { .. })
        ));
        assert!(matches!(
            refs.update_ref(HEAD_REF_NAME, &commit_id("d")),
            Err(StageError::RefUpdate { .. })
        ));
        assert_eq!(std::fs::read_to_string(dir.path().join("HEAD"))?, "ref: HEAD\n");
        Ok(())
    }

    #[test]
    fn invalid_names_are_rejected_before_touching_disk() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let refs = Refs::new(dir.path().into());

        let result = refs.update_ref("bad..name", &commit_id("c"));

        assert!(matches!(result, Err(StageError::InvalidRefName(_))));
        assert!(!dir.path().join("refs").exists());
        Ok(())
    }

    proptest! {
        #[test]
        fn plain_and_hierarchical_names_are_valid(
            prefix in "[a-zA-Z0-9_-]+",
            suffix in "[a-zA-Z0-9_-]+"
        ) {
            assert!(validate_ref_name(&prefix).is_ok());
            assert!(validate_ref_name(&format!("{prefix}/{suffix}")).is_ok());
        }

        #[test]
        fn names_with_forbidden_sequences_are_invalid(
            prefix in "[a-zA-Z0-9_-]+",
            suffix in "[a-zA-Z0-9_-]+",
            special in r"(\.\.|@\{|[\*:\?\[\\^~ ])"
        ) {
            let name = format!("{prefix}{special}{suffix}");
            assert!(validate_ref_name(&name).is_err());
        }

        #[test]
        fn lock_suffix_is_invalid(prefix in "[a-zA-Z0-9_-]+") {
            assert!(validate_ref_name(&format!("{prefix}.lock")).is_err());
        }
    }
}
