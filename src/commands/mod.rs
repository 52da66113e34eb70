//! Git command implementations
//!
//! Commands are `impl Repository` blocks, organized the way git splits them:
//!
//! - `plumbing`: Low-level object commands (hash-object, write-tree, cat-file)
//! - `porcelain`: User-facing commands (init, commit)

pub mod plumbing;
pub mod porcelain;

use crate::areas::database::Database;
use crate::areas::refs::Refs;
use crate::areas::repository::Repository;
use crate::areas::stage::Stage;
use anyhow::Context;
use is_executable::IsExecutable;
use std::path::PathBuf;
use std::str::FromStr;

/// `PATH=FILE`: stage the contents of `FILE` under the tree path `PATH`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddSpec {
    pub path: String,
    pub file: PathBuf,
}

impl FromStr for AddSpec {
    type Err = anyhow::Error;

    fn from_str(spec: &str) -> anyhow::Result<Self> {
        let (path, file) = spec
            .split_once('=')
            .with_context(|| format!("expected PATH=FILE, got '{spec}'"))?;
        anyhow::ensure!(!file.is_empty(), "no file given for '{path}'");

        Ok(AddSpec {
            path: path.to_string(),
            file: PathBuf::from(file),
        })
    }
}

/// Changes given on the command line, applied in order: adds, then deletes
#[derive(Debug, Clone, Default)]
pub struct Changes {
    pub adds: Vec<AddSpec>,
    pub deletes: Vec<String>,
}

impl Repository {
    pub(crate) fn apply_changes(
        &self,
        stage: &mut Stage<&Database, &Refs>,
        changes: &Changes,
    ) -> anyhow::Result<()> {
        for add in &changes.adds {
            let file = self.path().join(&add.file);
            let content = std::fs::read(&file)
                .with_context(|| format!("Unable to read {}", file.display()))?;

            if file.is_executable() {
                stage.add_executable(&add.path, content)?;
            } else {
                stage.add(&add.path, content)?;
            }
        }

        for path in &changes.deletes {
            stage.delete(path)?;
        }

        Ok(())
    }
}
