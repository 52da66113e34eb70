//! Git tree object
//!
//! Trees represent one directory level. Each record is
//! `<mode> <name>\0<20-byte-sha1>` and records are concatenated with no
//! separator.
//!
//! ## Ordering
//!
//! Git orders records as if directory names carried a trailing `/`. Entries
//! are therefore keyed by that augmented *sort key*, so a plain byte-wise map
//! ordering is already canonical, and a file `foo` (key `foo`) can never
//! collide with a directory `foo` (key `foo/`).

use crate::artifacts::objects::entry_mode::EntryMode;
use crate::artifacts::objects::object::{Object, Packable, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use anyhow::Context;
use bytes::Bytes;
use derive_new::new;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::io::{BufRead, Write};

/// Separator appended to directory names when ordering entries
pub const PATH_SEPARATOR: u8 = b'/';

/// A single record of a tree object
///
/// Names are raw bytes: git only forbids `/` and NUL in them.
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct TreeEntry {
    #[new(into)]
    pub name: Bytes,
    pub mode: EntryMode,
    pub oid: ObjectId,
    /// Mode text as found in a decoded record, when it differs from the canonical one
    #[new(default)]
    recorded_mode: Option<Box<str>>,
}

impl TreeEntry {
    pub fn is_tree(&self) -> bool {
        self.mode.is_tree()
    }

    pub fn sort_key(&self) -> Vec<u8> {
        sort_key(&self.name, self.is_tree())
    }

    /// Name for display, invalid UTF-8 replaced
    pub fn name_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.name)
    }

    /// Mode text written back when the entry is encoded
    pub fn mode_text(&self) -> &str {
        self.recorded_mode
            .as_deref()
            .unwrap_or_else(|| self.mode.as_str())
    }

    fn write_to(&self, writer: &mut impl Write) -> anyhow::Result<()> {
        write!(writer, "{} ", self.mode_text())?;
        writer.write_all(&self.name)?;
        writer.write_all(&[0])?;
        self.oid.write_h40_to(writer)
    }
}

/// Sort key of an entry name: the name itself, plus `/` for directories
pub fn sort_key(name: &[u8], is_tree: bool) -> Vec<u8> {
    let mut key = Vec::with_capacity(name.len() + 1);
    key.extend_from_slice(name);
    if is_tree {
        key.push(PATH_SEPARATOR);
    }
    key
}

/// Git tree object, entries held in canonical order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    entries: BTreeMap<Vec<u8>, TreeEntry>,
}

impl Tree {
    /// Insert an entry, replacing any entry under the same sort key
    pub fn insert(&mut self, entry: TreeEntry) -> Option<TreeEntry> {
        self.entries.insert(entry.sort_key(), entry)
    }

    /// Remove the entry stored under `sort_key`
    pub fn remove(&mut self, sort_key: &[u8]) -> Option<TreeEntry> {
        self.entries.remove(sort_key)
    }

    /// Look up the directory entry named `name`
    pub fn directory(&self, name: impl AsRef<[u8]>) -> Option<&TreeEntry> {
        self.entries.get(&sort_key(name.as_ref(), true))
    }

    /// Look up the non-directory entry named `name`
    pub fn file(&self, name: impl AsRef<[u8]>) -> Option<&TreeEntry> {
        self.entries.get(&sort_key(name.as_ref(), false))
    }

    pub fn entries(&self) -> impl Iterator<Item = &TreeEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `ls-tree` style listing, one entry per line
    pub fn display(&self) -> String {
        self.entries()
            .map(|entry| {
                let object_type = match entry.mode {
                    EntryMode::Directory => ObjectType::Tree.as_str(),
                    EntryMode::Gitlink => ObjectType::Commit.as_str(),
                    _ => ObjectType::Blob.as_str(),
                };
                format!(
                    "{:0>6} {} {}\t{}",
                    entry.mode_text(),
                    object_type,
                    entry.oid,
                    entry.name_lossy()
                )
            })
            .collect::<Vec<String>>()
            .join("\n")
    }
}

impl FromIterator<TreeEntry> for Tree {
    fn from_iter<I: IntoIterator<Item = TreeEntry>>(iter: I) -> Self {
        let mut tree = Tree::default();
        for entry in iter {
            tree.insert(entry);
        }
        tree
    }
}

impl Packable for Tree {
    fn serialize(&self) -> anyhow::Result<Bytes> {
        let mut content_bytes = Vec::new();
        for entry in self.entries() {
            entry.write_to(&mut content_bytes)?;
        }

        Ok(Bytes::from(content_bytes))
    }
}

impl Unpackable for Tree {
    fn deserialize(content: &[u8]) -> anyhow::Result<Self> {
        let mut tree = Tree::default();
        let mut reader = content;

        // Reuse scratch buffers to reduce allocs
        let mut mode_bytes = Vec::new();
        let mut name_bytes = Vec::new();

        loop {
            mode_bytes.clear();
            // Read "mode " (space-delimited)
            let n = reader.read_until(b' ', &mut mode_bytes)?;
            if n == 0 {
                break; // clean EOF: no more entries
            }
            if mode_bytes.pop() != Some(b' ') {
                anyhow::bail!("unexpected EOF in mode");
            }
            let mode_text = std::str::from_utf8(&mode_bytes)?;
            let mode = EntryMode::from_octal_str(mode_text)?;

            // Read "name\0"
            name_bytes.clear();
            reader.read_until(b'\0', &mut name_bytes)?;
            if name_bytes.pop() != Some(b'\0') {
                anyhow::bail!("unexpected EOF in name");
            }
            if name_bytes.is_empty() || name_bytes.contains(&PATH_SEPARATOR) {
                anyhow::bail!(
                    "invalid entry name {:?}",
                    String::from_utf8_lossy(&name_bytes)
                );
            }

            let oid =
                ObjectId::read_h40_from(&mut reader).context("unexpected EOF in object id")?;

            let mut entry = TreeEntry::new(name_bytes.clone(), mode, oid);
            if mode_text != mode.as_str() {
                entry.recorded_mode = Some(mode_text.into());
            }
            if let Some(duplicate) = tree.insert(entry) {
                anyhow::bail!("duplicate entry {:?}", duplicate.name_lossy());
            }
        }

        Ok(tree)
    }
}

impl Object for Tree {
    fn object_type(&self) -> ObjectType {
        ObjectType::Tree
    }
}
