use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use bytes::Bytes;

/// An object that can be encoded into its canonical content bytes
pub trait Packable {
    fn serialize(&self) -> anyhow::Result<Bytes>;
}

/// An object that can be decoded from its content bytes (header already stripped)
pub trait Unpackable {
    fn deserialize(content: &[u8]) -> anyhow::Result<Self>
    where
        Self: Sized;
}

pub trait Object: Packable {
    fn object_type(&self) -> ObjectType;

    fn object_id(&self) -> anyhow::Result<ObjectId> {
        Ok(ObjectId::hash_object(self.object_type(), &self.serialize()?))
    }
}
