//! Git data structures and algorithms
//!
//! - `objects`: Git object types (blob, tree, commit) and their encodings
//! - `staging`: Staged changes, base snapshots and the tree merge

pub mod objects;
pub mod staging;
