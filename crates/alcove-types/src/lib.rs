pub mod api;
pub mod models;

pub use models::{FileKind, FileMeta, human_size};
