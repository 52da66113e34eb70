use crate::areas::repository::Repository;
use crate::commands::Changes;
use std::io::Write;

impl Repository {
    /// Merge `changes` over `base` (if any), store the trees and print the root ID
    pub fn write_tree(&mut self, base: Option<&str>, changes: &Changes) -> anyhow::Result<()> {
        let mut stage = self.stage();
        if let Some(revision) = base {
            stage.read_base(revision)?;
        }
        self.apply_changes(&mut stage, changes)?;

        let tree_oid = stage.write_tree()?;

        writeln!(self.writer(), "{tree_oid}")?;

        Ok(())
    }
}
