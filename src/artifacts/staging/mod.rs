//! Staging and tree merging
//!
//! - `path_key`: Validated slash-delimited paths
//! - `staged_tree`: In-memory hierarchy of pending additions and deletions
//! - `base_tree`: Read-only snapshot of a committed tree used as merge base
//! - `write_set`: Encoded objects waiting to be persisted, children first
//! - `tree_writer`: Recursive merge of staged entries over a base snapshot

pub mod base_tree;
pub mod path_key;
pub mod staged_tree;
pub mod tree_writer;
pub mod write_set;
