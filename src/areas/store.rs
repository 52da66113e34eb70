//! Collaborator seams
//!
//! The staging engine never touches disk directly. It talks to an object
//! store and a ref store through these traits; `Database`/`Refs` implement
//! them over a `.git` directory and `MemoryStore`/`MemoryRefs` in memory.
//!
//! Implementations are expected to be content-addressed and deterministic:
//! the same type and content always produce the same ID. Failures are
//! propagated to the caller, never retried here.

use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::errors::StageResult;
use bytes::Bytes;

pub trait ObjectWriter {
    /// Durably store `content` as an object of `object_type` and return its ID
    ///
    /// Writing an object that already exists is a no-op.
    fn put(&self, object_type: ObjectType, content: &[u8]) -> StageResult<ObjectId>;
}

pub trait ObjectReader {
    /// Load an object's type and content (header stripped)
    ///
    /// Returns `Ok(None)` if the object does not exist.
    fn get(&self, oid: &ObjectId) -> StageResult<Option<(ObjectType, Bytes)>>;
}

/// Both halves of an object database
pub trait ObjectStore: ObjectReader + ObjectWriter {}

impl<T: ObjectReader + ObjectWriter + ?Sized> ObjectStore for T {}

pub trait RefStore {
    /// Resolve a ref name (following symbolic refs) to the ID it points at
    fn read_ref(&self, name: &str) -> StageResult<Option<ObjectId>>;

    /// Point `name` at `oid`
    fn update_ref(&self, name: &str, oid: &ObjectId) -> StageResult<()>;
}

impl<T: ObjectWriter + ?Sized> ObjectWriter for &T {
    fn put(&self, object_type: ObjectType, content: &[u8]) -> StageResult<ObjectId> {
        (**self).put(object_type, content)
    }
}

impl<T: ObjectReader + ?Sized> ObjectReader for &T {
    fn get(&self, oid: &ObjectId) -> StageResult<Option<(ObjectType, Bytes)>> {
        (**self).get(oid)
    }
}

impl<T: RefStore + ?Sized> RefStore for &T {
    fn read_ref(&self, name: &str) -> StageResult<Option<ObjectId>> {
        (**self).read_ref(name)
    }

    fn update_ref(&self, name: &str, oid: &ObjectId) -> StageResult<()> {
        (**self).update_ref(name, oid)
    }
}
