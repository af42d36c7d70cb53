//! Filesystem-backed room and file store.
//!
//! A room is a directory under the data root and a file is a regular file
//! inside it. There is no index besides the directory tree itself.

pub mod error;
pub mod mime;
pub mod name;
pub mod storage;

pub use error::{Result, StoreError};
pub use name::{RoomName, sanitize_file_name};
pub use storage::Store;
