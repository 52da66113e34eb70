use crate::areas::store::ObjectWriter;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::errors::{StageError, StageResult};
use bytes::Bytes;
use std::collections::HashSet;
use tracing::debug;

/// An encoded object whose ID is already known
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingObject {
    pub object_type: ObjectType,
    pub oid: ObjectId,
    pub content: Bytes,
}

/// Objects produced by a merge, in the order they must be persisted
///
/// Objects are queued post-order, so every tree follows the objects it
/// references. Content appearing twice is queued once.
#[derive(Debug, Clone, Default)]
pub struct WriteSet {
    objects: Vec<PendingObject>,
    seen: HashSet<ObjectId>,
}

impl WriteSet {
    /// Hash `content` and queue it unless an identical object is queued already
    pub fn push(&mut self, object_type: ObjectType, content: Bytes) -> ObjectId {
        let oid = ObjectId::hash_object(object_type, &content);

        if self.seen.insert(oid.clone()) {
            self.objects.push(PendingObject {
                object_type,
                oid: oid.clone(),
                content,
            });
        }

        oid
    }

    pub fn objects(&self) -> &[PendingObject] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Persist every queued object, stopping at the first failure
    ///
    /// The writer must return the ID computed here; anything else means it
    /// hashes differently and the trees already built would reference
    /// objects it does not hold.
    pub fn flush<W: ObjectWriter + ?Sized>(&self, writer: &W) -> StageResult<()> {
        for object in &self.objects {
            let actual = writer.put(object.object_type, &object.content)?;
            if actual != object.oid {
                return Err(StageError::HashMismatch {
                    kind: object.object_type,
                    expected: object.oid.clone(),
                    actual,
                });
            }
            debug!(oid = %object.oid, kind = %object.object_type, "flushed object");
        }

        Ok(())
    }
}
