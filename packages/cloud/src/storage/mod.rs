//! File store collaborator.
//!
//! The coordinator only ever needs single-level primitives: read a file,
//! overwrite a file, list one directory, test and create one folder.
//! Missing parent folders are created by the caller, one segment at a time.

mod in_memory;
mod local_disk;

use std::path::PathBuf;

pub use in_memory::MemoryFileStore;
pub use local_disk::LocalFileStore;

use crate::error::CloudResult;
use crate::path::AssetPath;

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

pub trait FileStore {
    fn read_file(&self, path: &AssetPath) -> CloudResult<Vec<u8>>;

    /// Write `data` to `path`, replacing any existing file. The parent
    /// folder must already exist.
    fn write_file(&self, path: &AssetPath, data: &[u8]) -> CloudResult<()>;

    /// Entries directly under `path`, sorted by name.
    fn list_dir(&self, path: &AssetPath) -> CloudResult<Vec<DirEntry>>;

    fn folder_exists(&self, path: &AssetPath) -> bool;

    /// Create exactly one folder. The parent must already exist.
    fn create_folder(&self, path: &AssetPath) -> CloudResult<()>;

    /// Where `path` lives, for messages shown to the user.
    fn absolute_path(&self, path: &AssetPath) -> PathBuf;
}
