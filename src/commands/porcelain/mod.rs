//! Porcelain commands (user-facing Git operations)
//!
//! ## Commands
//!
//! - `init`: Initialize a new repository
//! - `commit`: Create a new commit from staged changes

pub mod commit;
pub mod init;
