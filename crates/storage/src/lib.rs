pub mod backend;
pub mod error;
pub mod file;
mod hash;
mod path;

pub use crate::backend::{ByteStream, StorageBackend};
pub use crate::file::FileInfo;
pub use crate::hash::{digest, digest_bytes};
pub use crate::path::validate as validate_path;
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
