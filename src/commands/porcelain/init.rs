use crate::areas::refs::DEFAULT_BRANCH;
use crate::areas::repository::Repository;
use anyhow::Context;
use std::fs;
use std::io::Write;

impl Repository {
    pub fn init(&mut self) -> anyhow::Result<()> {
        fs::create_dir_all(self.database().objects_path())
            .context("Failed to create .git/objects directory")?;

        fs::create_dir_all(self.refs().refs_path())
            .context("Failed to create .git/refs directory")?;

        fs::create_dir_all(self.refs().heads_path())
            .context("Failed to create .git/refs/heads directory")?;

        // an existing HEAD may point at another branch already
        if !self.refs().head_path().exists() {
            self.refs()
                .set_head_branch(DEFAULT_BRANCH)
                .context("Failed to create initial HEAD reference")?;
        }

        writeln!(
            self.writer(),
            "Initialized empty Git repository in {}",
            self.git_path().display()
        )?;

        Ok(())
    }
}
