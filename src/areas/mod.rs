//! Repository areas and the staging session
//!
//! - `store`: Object and ref store traits the staging engine is written against
//! - `database`: Loose object database under `.git/objects`
//! - `refs`: Reference management (branches, HEAD)
//! - `memory`: In-memory stores for embedding and tests
//! - `config`: Author identity lookup
//! - `stage`: Staging session and commit builder
//! - `repository`: On-disk repository tying the above together

pub mod config;
pub mod database;
pub mod memory;
pub mod refs;
pub mod repository;
pub mod stage;
pub mod store;
