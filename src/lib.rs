//! Staging and tree serialization for git object stores
//!
//! Stage file contents under slash-separated paths, optionally on top of an
//! existing tree, then produce git-compatible tree and commit objects:
//!
//! ```no_run
//! use bit_stage::areas::memory::{MemoryRefs, MemoryStore};
//! use bit_stage::areas::stage::{CommitRequest, Stage};
//! use bit_stage::artifacts::objects::commit::Identity;
//!
//! # fn main() -> Result<(), bit_stage::errors::StageError> {
//! let (store, refs) = (MemoryStore::new(), MemoryRefs::new());
//! let mut stage = Stage::new(&store, &refs);
//! stage.add("README", "hello")?;
//! stage.commit(CommitRequest::new("init").author(Identity::new("A", "a@x.com")))?;
//! # Ok(())
//! # }
//! ```

pub mod areas;
pub mod artifacts;
pub mod commands;
pub mod errors;

pub use areas::stage::{CommitOutcome, CommitRequest, Stage};
pub use errors::{StageError, StageResult};
