//! Git object types and their canonical encodings
//!
//! - **Blob**: File content (raw bytes)
//! - **Tree**: Directory listing (names, modes, and object IDs)
//! - **Commit**: Snapshot with metadata (author, message, parent commits, tree)
//!
//! Every object is hashed as `<type> <size>\0<content>`; the content encodings
//! here must match git byte for byte or the resulting IDs diverge.

pub mod blob;
pub mod commit;
pub mod entry_mode;
pub mod object;
pub mod object_id;
pub mod object_type;
pub mod tree;

/// Length of a SHA-1 hash in hexadecimal format
pub const OBJECT_ID_LENGTH: usize = 40;

/// Length of a SHA-1 hash in raw bytes, as embedded in tree records
pub const RAW_OBJECT_ID_LENGTH: usize = 20;
