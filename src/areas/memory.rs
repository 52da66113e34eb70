//! In-memory object and ref stores
//!
//! Hash exactly like the on-disk database, so IDs computed here match git.
//! Every write and ref update is recorded in call order, which makes them
//! handy for embedding and for asserting on collaborator traffic in tests.

use crate::areas::store::{ObjectReader, ObjectWriter, RefStore};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::errors::StageResult;
use bytes::Bytes;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RefCell<HashMap<ObjectId, (ObjectType, Bytes)>>,
    writes: RefCell<Vec<(ObjectType, ObjectId)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `put` call so far, in order, including re-writes of known objects
    pub fn writes(&self) -> Vec<(ObjectType, ObjectId)> {
        self.writes.borrow().clone()
    }

    /// Number of `put` calls for objects of `object_type`
    pub fn write_count(&self, object_type: ObjectType) -> usize {
        self.writes
            .borrow()
            .iter()
            .filter(|(kind, _)| *kind == object_type)
            .count()
    }

    pub fn len(&self) -> usize {
        self.objects.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.borrow().is_empty()
    }

    pub fn contains(&self, oid: &ObjectId) -> bool {
        self.objects.borrow().contains_key(oid)
    }
}

impl ObjectWriter for MemoryStore {
    fn put(&self, object_type: ObjectType, content: &[u8]) -> StageResult<ObjectId> {
        let oid = ObjectId::hash_object(object_type, content);

        self.objects
            .borrow_mut()
            .entry(oid.clone())
            .or_insert_with(|| (object_type, Bytes::copy_from_slice(content)));
        self.writes.borrow_mut().push((object_type, oid.clone()));

        Ok(oid)
    }
}

impl ObjectReader for MemoryStore {
    fn get(&self, oid: &ObjectId) -> StageResult<Option<(ObjectType, Bytes)>> {
        Ok(self.objects.borrow().get(oid).cloned())
    }
}

/// Flat map of ref names to IDs; names are stored verbatim
#[derive(Debug, Default)]
pub struct MemoryRefs {
    refs: RefCell<BTreeMap<String, ObjectId>>,
    updates: RefCell<Vec<(String, ObjectId)>>,
}

impl MemoryRefs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `update_ref` call so far, in order
    pub fn updates(&self) -> Vec<(String, ObjectId)> {
        self.updates.borrow().clone()
    }
}

impl RefStore for MemoryRefs {
    fn read_ref(&self, name: &str) -> StageResult<Option<ObjectId>> {
        Ok(self.refs.borrow().get(name).cloned())
    }

    fn update_ref(&self, name: &str, oid: &ObjectId) -> StageResult<()> {
        self.refs.borrow_mut().insert(name.to_string(), oid.clone());
        self.updates
            .borrow_mut()
            .push((name.to_string(), oid.clone()));
        Ok(())
    }
}
