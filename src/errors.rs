//! Error taxonomy for staging, merging and committing
//!
//! Collaborator failures (object writes, ref updates) carry the backend's
//! `anyhow` context chain as their source so callers see the original cause.

use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;

#[derive(Debug, thiserror::Error)]
pub enum StageError {
    /// Empty path, empty segment, or a segment git cannot store.
    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: &'static str },

    /// A revision or object could not be resolved.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("unable to write {kind} object")]
    Write {
        kind: ObjectType,
        #[source]
        source: anyhow::Error,
    },

    #[error("unable to read object {oid}")]
    Read {
        oid: ObjectId,
        #[source]
        source: anyhow::Error,
    },

    #[error("corrupt object {oid}: {reason}")]
    Corrupt { oid: ObjectId, reason: String },

    /// The object writer returned an id different from the locally computed one.
    #[error("hash mismatch for {kind} object: expected {expected}, store returned {actual}")]
    HashMismatch {
        kind: ObjectType,
        expected: ObjectId,
        actual: ObjectId,
    },

    #[error("unable to update ref {name}")]
    RefUpdate {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("unable to read ref {name}")]
    RefRead {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("invalid ref name: {0}")]
    InvalidRefName(String),

    #[error("no author identity: pass one explicitly or configure user.name and user.email")]
    MissingIdentity,
}

pub type StageResult<T> = Result<T, StageError>;

impl StageError {
    pub(crate) fn invalid_path(path: &str, reason: &'static str) -> Self {
        StageError::InvalidPath {
            path: path.to_string(),
            reason,
        }
    }

    pub(crate) fn corrupt(oid: &ObjectId, reason: impl Into<String>) -> Self {
        StageError::Corrupt {
            oid: oid.clone(),
            reason: reason.into(),
        }
    }
}
