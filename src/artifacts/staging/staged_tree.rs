//! Staged tree
//!
//! Pending changes are kept as an owned recursive map from segment name to
//! entry. Output order never depends on insertion order: the tree writer
//! sorts every level canonically before encoding it.

use crate::artifacts::objects::entry_mode::EntryMode;
use crate::artifacts::staging::path_key::PathKey;
use crate::errors::StageResult;
use bytes::Bytes;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagedEntry {
    /// File content to be stored as a blob
    FileContent { content: Bytes, mode: EntryMode },
    /// Intermediate node, materialized when any descendant is staged
    Directory(StagedTree),
    /// Tombstone: the name is removed from the base at merge time
    Deleted,
}

impl StagedEntry {
    pub fn file(content: impl Into<Bytes>) -> Self {
        StagedEntry::FileContent {
            content: content.into(),
            mode: EntryMode::Regular,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagedTree {
    entries: BTreeMap<String, StagedEntry>,
}

impl StagedTree {
    /// Stage `content` at `path`, replacing whatever was staged there
    pub fn add(&mut self, path: &str, content: impl Into<Bytes>) -> StageResult<()> {
        self.stage(&PathKey::parse(path)?, StagedEntry::file(content));
        Ok(())
    }

    /// Stage `content` at `path` with an explicit file mode
    pub fn add_with_mode(
        &mut self,
        path: &str,
        content: impl Into<Bytes>,
        mode: EntryMode,
    ) -> StageResult<()> {
        let entry = StagedEntry::FileContent {
            content: content.into(),
            mode,
        };
        self.stage(&PathKey::parse(path)?, entry);
        Ok(())
    }

    /// Stage removal of the entry at `path`
    ///
    /// Removal is path-exact: it drops the file or directory of that name
    /// from the base level that contains it. A base directory left with no
    /// entries is omitted from its parent rather than kept as an empty tree,
    /// and a path below a base file leaves that file alone.
    pub fn delete(&mut self, path: &str) -> StageResult<()> {
        self.stage(&PathKey::parse(path)?, StagedEntry::Deleted);
        Ok(())
    }

    /// Place `entry` at `key`, creating intermediate directories
    ///
    /// A file or tombstone staged where a directory is needed is replaced by
    /// that directory.
    pub fn stage(&mut self, key: &PathKey, entry: StagedEntry) {
        let mut level = self;
        for dir in key.parents() {
            let slot = level
                .entries
                .entry(dir.clone())
                .or_insert_with(|| StagedEntry::Directory(StagedTree::default()));
            if !matches!(slot, StagedEntry::Directory(_)) {
                *slot = StagedEntry::Directory(StagedTree::default());
            }
            level = match slot {
                StagedEntry::Directory(tree) => tree,
                _ => unreachable!(),
            };
        }

        level.entries.insert(key.name().to_string(), entry);
    }

    /// Look up the entry staged at `path`
    pub fn get(&self, path: &str) -> Option<&StagedEntry> {
        let key = PathKey::parse(path).ok()?;

        let mut level = self;
        for dir in key.parents() {
            match level.entries.get(dir)? {
                StagedEntry::Directory(tree) => level = tree,
                _ => return None,
            }
        }
        level.entries.get(key.name())
    }

    /// Entries of this level, in name order
    pub fn entries(&self) -> impl Iterator<Item = (&String, &StagedEntry)> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries at this level
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StageError;
    use pretty_assertions::assert_eq;

    #[test]
    fn nested_paths_share_intermediate_directories() -> anyhow::Result<()> {
        let mut staged = StagedTree::default();
        staged.add("a/b/c", "c")?;
        staged.add("a/b/d", "d")?;

        assert_eq!(staged.len(), 1);
        let Some(StagedEntry::Directory(a)) = staged.get("a") else {
            panic!("a should be a directory");
        };
        assert_eq!(a.len(), 1);
        let Some(StagedEntry::Directory(b)) = staged.get("a/b") else {
            panic!("a/b should be a directory");
        };
        assert_eq!(
            b.entries().map(|(name, _)| name.as_str()).collect::<Vec<_>>(),
            vec!["c", "d"]
        );
        assert_eq!(staged.get("a/b/c"), Some(&StagedEntry::file("c")));
        assert_eq!(staged.get("a/b/d"), Some(&StagedEntry::file("d")));
        Ok(())
    }

    #[test]
    fn later_stage_overwrites_directory_with_file() -> anyhow::Result<()> {
        let mut staged = StagedTree::default();
        staged.add("a/b/c", "c")?;
        staged.add("a/b", "now a file")?;

        assert_eq!(staged.get("a/b"), Some(&StagedEntry::file("now a file")));
        assert_eq!(staged.get("a/b/c"), None);
        Ok(())
    }

    #[test]
    fn later_stage_turns_file_into_directory() -> anyhow::Result<()> {
        let mut staged = StagedTree::default();
        staged.add("a", "file")?;
        staged.add("a/b", "nested")?;

        assert!(matches!(staged.get("a"), Some(StagedEntry::Directory(_))));
        assert_eq!(staged.get("a/b"), Some(&StagedEntry::file("nested")));
        Ok(())
    }

    #[test]
    fn delete_stages_a_tombstone() -> anyhow::Result<()> {
        let mut staged = StagedTree::default();
        staged.add("docs/guide.md", "guide")?;
        staged.delete("docs/guide.md")?;

        assert_eq!(staged.get("docs/guide.md"), Some(&StagedEntry::Deleted));
        Ok(())
    }

    #[test]
    fn invalid_paths_leave_the_tree_untouched() {
        let mut staged = StagedTree::default();

        assert!(matches!(
            staged.add("", "x"),
            Err(StageError::InvalidPath { .. })
        ));
        assert!(matches!(
            staged.delete("a//b"),
            Err(StageError::InvalidPath { .. })
        ));
        assert!(staged.is_empty());
    }

    #[test]
    fn insertion_order_does_not_matter() -> anyhow::Result<()> {
        let mut forward = StagedTree::default();
        forward.add("x/1", "1")?;
        forward.add("y", "2")?;
        forward.delete("z")?;

        let mut backward = StagedTree::default();
        backward.delete("z")?;
        backward.add("y", "2")?;
        backward.add("x/1", "1")?;

        assert_eq!(forward, backward);
        Ok(())
    }
}
