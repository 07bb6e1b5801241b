use std::{fs, io, path};

use super::{DirEntry, FileStore};
use crate::error::{CloudError, CloudResult};
use crate::path::AssetPath;

/// A file store rooted at a directory on disk.
///
/// Every path is built from validated [`AssetPath`] components, so nothing
/// outside the root is ever touched.
pub struct LocalFileStore {
    root: path::PathBuf,
}

impl LocalFileStore {
    pub fn new(root: path::PathBuf) -> CloudResult<LocalFileStore> {
        let attr = fs::metadata(&root).map_err(|error| CloudError::io(root.display(), error))?;

        if !attr.is_dir() {
            return Err(CloudError::io(
                root.display(),
                io::Error::other("Root path must be a directory."),
            ));
        }

        if attr.permissions().readonly() {
            return Err(CloudError::io(
                root.display(),
                io::Error::other("Root directory must be writable"),
            ));
        }

        match root.canonicalize() {
            Ok(root) => Ok(LocalFileStore { root }),
            Err(error) => Err(CloudError::io(root.display(), error)),
        }
    }

    /// Create the root directory (and its parents) if needed, then open it.
    pub fn create(root: path::PathBuf) -> CloudResult<LocalFileStore> {
        fs::create_dir_all(&root).map_err(|error| CloudError::io(root.display(), error))?;
        Self::new(root)
    }

    pub fn root(&self) -> &path::Path {
        &self.root
    }

    fn asset_path_to_file_path(&self, path: &AssetPath) -> path::PathBuf {
        let mut file_path = self.root.clone();
        file_path.extend(path.components());
        file_path
    }
}

impl FileStore for LocalFileStore {
    fn read_file(&self, path: &AssetPath) -> CloudResult<Vec<u8>> {
        let file_path = self.asset_path_to_file_path(path);
        log::debug!("Reading {}...", file_path.display());
        fs::read(&file_path).map_err(|error| CloudError::io(path, error))
    }

    fn write_file(&self, path: &AssetPath, data: &[u8]) -> CloudResult<()> {
        let file_path = self.asset_path_to_file_path(path);
        log::debug!("Writing {} ({} bytes)...", file_path.display(), data.len());
        fs::write(&file_path, data).map_err(|error| CloudError::io(path, error))
    }

    fn list_dir(&self, path: &AssetPath) -> CloudResult<Vec<DirEntry>> {
        let dir_path = self.asset_path_to_file_path(path);
        let mut entries = Vec::new();
        for entry in fs::read_dir(&dir_path).map_err(|error| CloudError::io(path, error))? {
            let entry = entry.map_err(|error| CloudError::io(path, error))?;
            let file_type = entry
                .file_type()
                .map_err(|error| CloudError::io(path, error))?;
            // Names that are not UTF-8 cannot be expressed as asset paths.
            let Ok(name) = entry.file_name().into_string() else {
                log::warn!("Skipping non UTF-8 entry in {}", dir_path.display());
                continue;
            };
            entries.push(DirEntry {
                name,
                is_dir: file_type.is_dir(),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn folder_exists(&self, path: &AssetPath) -> bool {
        self.asset_path_to_file_path(path).is_dir()
    }

    fn create_folder(&self, path: &AssetPath) -> CloudResult<()> {
        let dir_path = self.asset_path_to_file_path(path);
        log::debug!("Creating folder {}...", dir_path.display());
        fs::create_dir(&dir_path).map_err(|error| CloudError::io(path, error))
    }

    fn absolute_path(&self, path: &AssetPath) -> path::PathBuf {
        self.asset_path_to_file_path(path)
    }
}
