//! In-process file store.

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{DirEntry, FileStore};
use crate::error::{CloudError, CloudResult};
use crate::path::AssetPath;

#[derive(Default)]
struct Inner {
    files: BTreeMap<AssetPath, Vec<u8>>,
    folders: BTreeSet<AssetPath>,
    created: Vec<AssetPath>,
}

/// A file store that keeps everything in memory.
///
/// Clones share the same contents, so a test can hand one clone to the
/// coordinator and inspect the other.
///
/// # Example
///
/// ```rust
/// use cloudsync::{AssetPath, FileStore, MemoryFileStore};
///
/// let store = MemoryFileStore::new();
/// let dir = AssetPath::parse("sub").unwrap();
/// let file = AssetPath::parse("sub/file.cfg").unwrap();
///
/// store.create_folder(&dir).unwrap();
/// store.write_file(&file, b"bind x kill").unwrap();
///
/// assert_eq!(store.read_file(&file).unwrap(), b"bind x kill");
/// assert_eq!(store.created_folders(), vec![dir]);
/// ```
#[derive(Clone, Default)]
pub struct MemoryFileStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryFileStore {
    /// Create a new empty store. The root folder always exists.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file, silently adding any folders leading to it.
    ///
    /// Seeded folders are not reported by [`created_folders`](Self::created_folders).
    pub fn insert_file(&self, path: &AssetPath, data: impl Into<Vec<u8>>) {
        let mut inner = self.lock();
        inner.folders.extend(path.ancestors());
        inner.files.insert(path.clone(), data.into());
    }

    /// Seed an empty folder and its ancestors.
    pub fn insert_folder(&self, path: &AssetPath) {
        let mut inner = self.lock();
        inner.folders.extend(path.ancestors());
        inner.folders.insert(path.clone());
    }

    /// Folders created through [`FileStore::create_folder`], in call order.
    pub fn created_folders(&self) -> Vec<AssetPath> {
        self.lock().created.clone()
    }

    pub fn contains_file(&self, path: &AssetPath) -> bool {
        self.lock().files.contains_key(path)
    }

    pub fn file(&self, path: &AssetPath) -> Option<Vec<u8>> {
        self.lock().files.get(path).cloned()
    }

    pub fn file_count(&self) -> usize {
        self.lock().files.len()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Inner {
    fn has_folder(&self, path: Option<&AssetPath>) -> bool {
        match path {
            None => true,
            Some(path) => self.folders.contains(path),
        }
    }
}

fn not_found(path: &AssetPath, what: &str) -> CloudError {
    CloudError::io(path, io::Error::new(io::ErrorKind::NotFound, what.to_string()))
}

impl FileStore for MemoryFileStore {
    fn read_file(&self, path: &AssetPath) -> CloudResult<Vec<u8>> {
        self.lock()
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| not_found(path, "no such file"))
    }

    fn write_file(&self, path: &AssetPath, data: &[u8]) -> CloudResult<()> {
        let mut inner = self.lock();
        if !inner.has_folder(path.parent().as_ref()) {
            return Err(not_found(path, "parent folder does not exist"));
        }
        if inner.folders.contains(path) {
            return Err(CloudError::io(
                path,
                io::Error::other("a folder exists at this path"),
            ));
        }
        log::debug!("Writing {} ({} bytes)...", path, data.len());
        inner.files.insert(path.clone(), data.to_vec());
        Ok(())
    }

    fn list_dir(&self, path: &AssetPath) -> CloudResult<Vec<DirEntry>> {
        let inner = self.lock();
        if !inner.folders.contains(path) {
            return Err(not_found(path, "no such folder"));
        }
        let depth = path.len() + 1;
        let direct_child = |candidate: &AssetPath| candidate.len() == depth && candidate.has_prefix(path);

        let mut entries: Vec<DirEntry> = inner
            .folders
            .iter()
            .filter(|p| direct_child(*p))
            .map(|p| DirEntry {
                name: p.file_name().to_string(),
                is_dir: true,
            })
            .chain(inner.files.keys().filter(|p| direct_child(*p)).map(|p| DirEntry {
                name: p.file_name().to_string(),
                is_dir: false,
            }))
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn folder_exists(&self, path: &AssetPath) -> bool {
        self.lock().folders.contains(path)
    }

    fn create_folder(&self, path: &AssetPath) -> CloudResult<()> {
        let mut inner = self.lock();
        if !inner.has_folder(path.parent().as_ref()) {
            return Err(not_found(path, "parent folder does not exist"));
        }
        if inner.folders.contains(path) || inner.files.contains_key(path) {
            return Err(CloudError::io(
                path,
                io::Error::from(io::ErrorKind::AlreadyExists),
            ));
        }
        inner.folders.insert(path.clone());
        inner.created.push(path.clone());
        Ok(())
    }

    fn absolute_path(&self, path: &AssetPath) -> PathBuf {
        PathBuf::from("/memory").join(path.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> AssetPath {
        AssetPath::parse(s).unwrap()
    }

    #[test]
    fn top_level_write_needs_no_folder() {
        let store = MemoryFileStore::new();
        store.write_file(&path("a.cfg"), b"x").unwrap();
        assert_eq!(store.read_file(&path("a.cfg")).unwrap(), b"x");
    }

    #[test]
    fn nested_write_needs_parent() {
        let store = MemoryFileStore::new();
        let err = store.write_file(&path("sub/a.cfg"), b"x").unwrap_err();
        assert!(matches!(err, CloudError::Io { .. }));
        assert!(!store.contains_file(&path("sub/a.cfg")));
    }

    #[test]
    fn create_folder_is_single_level_and_recorded() {
        let store = MemoryFileStore::new();
        assert!(store.create_folder(&path("sub/dir")).is_err());

        store.create_folder(&path("sub")).unwrap();
        store.create_folder(&path("sub/dir")).unwrap();
        assert!(store.create_folder(&path("sub")).is_err());

        assert_eq!(store.created_folders(), vec![path("sub"), path("sub/dir")]);
    }

    #[test]
    fn insert_file_adds_folders_silently() {
        let store = MemoryFileStore::new();
        store.insert_file(&path("assets/hud/x.png"), b"png".to_vec());

        assert!(store.folder_exists(&path("assets")));
        assert!(store.folder_exists(&path("assets/hud")));
        assert!(store.created_folders().is_empty());
    }

    #[test]
    fn list_dir_is_non_recursive() {
        let store = MemoryFileStore::new();
        store.insert_file(&path("assets/game/a.png"), b"a".to_vec());
        store.insert_file(&path("assets/game/b.png"), b"b".to_vec());
        store.insert_file(&path("assets/game/deep/c.png"), b"c".to_vec());

        let entries = store.list_dir(&path("assets/game")).unwrap();
        let names: Vec<_> = entries.iter().map(|e| (e.name.as_str(), e.is_dir)).collect();
        assert_eq!(names, vec![("a.png", false), ("b.png", false), ("deep", true)]);
    }

    #[test]
    fn list_missing_folder_fails() {
        let store = MemoryFileStore::new();
        assert!(store.list_dir(&path("nope")).is_err());
    }

    #[test]
    fn clones_share_contents() {
        let store = MemoryFileStore::new();
        let other = store.clone();
        store.write_file(&path("a.cfg"), b"x").unwrap();
        assert_eq!(other.file(&path("a.cfg")), Some(b"x".to_vec()));
        assert_eq!(other.file_count(), 1);
    }
}
