//! Loose object database
//!
//! Objects are stored zlib-compressed at `objects/<xx>/<yyyy…>` with the
//! `<type> <size>\0` header in front of their content, exactly as git does.

use crate::areas::store::{ObjectReader, ObjectWriter};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::errors::{StageError, StageResult};
use anyhow::Context;
use bytes::Bytes;
use fake::rand;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug)]
pub struct Database {
    path: Box<Path>,
}

// TODO: implement packfile reads so bases from cloned repositories resolve
impl Database {
    pub fn new(path: Box<Path>) -> Self {
        Database { path }
    }

    pub fn objects_path(&self) -> &Path {
        &self.path
    }

    /// Store raw content under its object ID, unless it already exists
    pub fn store(&self, object_type: ObjectType, content: &[u8]) -> anyhow::Result<ObjectId> {
        let oid = ObjectId::hash_object(object_type, content);
        let object_path = self.path.join(oid.to_path());

        // write the object to disk unless it already exists
        if !object_path.exists() {
            std::fs::create_dir_all(
                object_path
                    .parent()
                    .context(format!("Invalid object path {}", object_path.display()))?,
            )
            .context(format!(
                "Unable to create object directory {}",
                object_path.display()
            ))?;

            let mut object_bytes = format!("{} {}\0", object_type, content.len()).into_bytes();
            object_bytes.extend_from_slice(content);
            self.write_object(&object_path, object_bytes.into())?;
            debug!(%oid, kind = %object_type, "stored object");
        }

        Ok(oid)
    }

    /// Load an object, returning its type and content
    pub fn load(&self, oid: &ObjectId) -> anyhow::Result<Option<(ObjectType, Bytes)>> {
        let object_path = self.path.join(oid.to_path());
        if !object_path.exists() {
            return Ok(None);
        }

        let raw = self.read_object(&object_path)?;
        let mut reader = &raw[..];
        let (object_type, size) = ObjectType::parse_header(&mut reader)?;
        if reader.len() != size {
            anyhow::bail!(
                "object {oid} declares {size} bytes but holds {}",
                reader.len()
            );
        }

        Ok(Some((object_type, raw.slice(raw.len() - size..))))
    }

    fn read_object(&self, object_path: &Path) -> anyhow::Result<Bytes> {
        let object_content = std::fs::read(object_path).context(format!(
            "Unable to read object file {}",
            object_path.display()
        ))?;

        Self::decompress(object_content.into())
    }

    fn write_object(&self, object_path: &Path, object_content: Bytes) -> anyhow::Result<()> {
        let object_dir = object_path
            .parent()
            .context(format!("Invalid object path {}", object_path.display()))?;
        let temp_object_path = object_dir.join(Self::generate_temp_name());

        let object_content = Self::compress(object_content)?;

        let mut file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_object_path)
            .context(format!(
                "Unable to open object file {}",
                temp_object_path.display()
            ))?;

        file.write_all(&object_content).context(format!(
            "Unable to write object file {}",
            temp_object_path.display()
        ))?;
        file.sync_all().context(format!(
            "Unable to flush object file {}",
            temp_object_path.display()
        ))?;

        // rename the temp file to the object file to make it atomic
        std::fs::rename(&temp_object_path, object_path).context(format!(
            "Unable to rename object file to {}",
            object_path.display()
        ))?;

        Ok(())
    }

    fn compress(data: Bytes) -> anyhow::Result<Bytes> {
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder
            .write_all(&data)
            .context("Unable to compress object content")?;

        encoder
            .finish()
            .map(|compressed_content| compressed_content.into())
            .context("Unable to finish compressing object content")
    }

    fn decompress(data: Bytes) -> anyhow::Result<Bytes> {
        let mut decoder = flate2::read::ZlibDecoder::new(&*data);
        let mut decompressed_content = Vec::new();
        decoder
            .read_to_end(&mut decompressed_content)
            .context("Unable to decompress object content")?;

        Ok(decompressed_content.into())
    }

    fn generate_temp_name() -> String {
        format!("tmp-obj-{}", rand::random::<u32>())
    }

    pub fn object_path(&self, oid: &ObjectId) -> PathBuf {
        self.path.join(oid.to_path())
    }
}

impl ObjectWriter for Database {
    fn put(&self, object_type: ObjectType, content: &[u8]) -> StageResult<ObjectId> {
        self.store(object_type, content)
            .map_err(|source| StageError::Write {
                kind: object_type,
                source,
            })
    }
}

impl ObjectReader for Database {
    fn get(&self, oid: &ObjectId) -> StageResult<Option<(ObjectType, Bytes)>> {
        self.load(oid).map_err(|source| StageError::Read {
            oid: oid.clone(),
            source,
        })
    }
}
