//! Plumbing commands (low-level Git operations)
//!
//! ## Commands
//!
//! - `hash-object`: Compute object ID and optionally store in database
//! - `write-tree`: Merge staged changes over a base and store the trees
//! - `cat-file`: Print an object

pub mod cat_file;
pub mod hash_object;
pub mod write_tree;
