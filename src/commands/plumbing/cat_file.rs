use crate::areas::repository::Repository;
use crate::artifacts::objects::object::Unpackable;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tree::Tree;
use std::io::Write;

impl Repository {
    pub fn cat_file(&mut self, object_id: &str) -> anyhow::Result<()> {
        let object_id = ObjectId::try_parse(object_id.to_string())?;
        let (object_type, content) = self
            .database()
            .load(&object_id)?
            .ok_or_else(|| anyhow::anyhow!("Not a valid object name {object_id}"))?;

        match object_type {
            ObjectType::Blob | ObjectType::Commit => self.writer().write_all(&content)?,
            ObjectType::Tree => {
                let tree = Tree::deserialize(&content)?;
                if !tree.is_empty() {
                    writeln!(self.writer(), "{}", tree.display())?;
                }
            }
        }

        Ok(())
    }
}
