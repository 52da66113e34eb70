use crate::areas::repository::Repository;
use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::object::{Object, Packable};
use anyhow::Context;
use std::io::Write;

impl Repository {
    pub fn hash_object(&mut self, object_path: &str, write: bool) -> anyhow::Result<()> {
        let file = self.path().join(object_path);
        let content = std::fs::read(&file)
            .with_context(|| format!("Unable to read {}", file.display()))?;
        let blob = Blob::new(content);

        let object_id = if write {
            self.stage().write_blob(&blob.serialize()?)?
        } else {
            blob.object_id()?
        };

        writeln!(self.writer(), "{object_id}")?;

        Ok(())
    }
}
