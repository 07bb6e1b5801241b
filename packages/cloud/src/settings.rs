//! Config store collaborator.
//!
//! The coordinator treats settings as an opaque JSON document: it asks the
//! store for the document to upload, hands it the downloaded document, and
//! asks it to save.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::{CloudError, CloudResult};

pub trait ConfigStore {
    /// The document uploaded by a settings push.
    fn to_document(&self) -> Value;

    /// Apply a document received from a settings pull.
    fn load_document(&mut self, document: &Value) -> CloudResult<()>;

    /// Replace the settings wholesale with a document previously returned
    /// by [`to_document`](ConfigStore::to_document). Used to roll back a
    /// pull that could not be saved.
    fn restore_document(&mut self, document: &Value) -> CloudResult<()>;

    /// Write the current settings to durable storage.
    fn persist(&self) -> CloudResult<()>;
}

/// Settings kept as a flat JSON object and saved to a single file.
///
/// Uploaded as `{"settings": {...}}`; the service answers a pull with
/// `{"settings": {...}, "updatedAt": "..."}`.
#[derive(Debug, Clone)]
pub struct JsonConfigStore {
    path: PathBuf,
    settings: Map<String, Value>,
}

impl JsonConfigStore {
    /// An empty store that will be saved at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            settings: Map::new(),
        }
    }

    /// Load the store from `path`, or start empty if the file is missing.
    pub fn open(path: impl Into<PathBuf>) -> CloudResult<Self> {
        let path = path.into();
        if !path.exists() {
            log::debug!("No settings at {}, starting empty", path.display());
            return Ok(Self::new(path));
        }

        log::debug!("Reading {}...", path.display());
        let data = fs::read(&path).map_err(|e| CloudError::io(path.display(), e))?;
        let value: Value = serde_json::from_slice(&data)?;
        let mut store = Self::new(path);
        store.load_document(&value)?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.settings.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.settings.insert(key.into(), value);
    }

    pub fn settings(&self) -> &Map<String, Value> {
        &self.settings
    }
}

impl ConfigStore for JsonConfigStore {
    fn to_document(&self) -> Value {
        let mut document = Map::new();
        document.insert("settings".to_string(), Value::Object(self.settings.clone()));
        Value::Object(document)
    }

    fn load_document(&mut self, document: &Value) -> CloudResult<()> {
        for (key, value) in settings_of(document)? {
            self.settings.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    fn restore_document(&mut self, document: &Value) -> CloudResult<()> {
        self.settings = settings_of(document)?.clone();
        Ok(())
    }

    fn persist(&self) -> CloudResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| CloudError::io(parent.display(), e))?;
            }
        }

        let data = serde_json::to_vec_pretty(&self.to_document())?;
        log::debug!("Writing {}...", self.path.display());
        fs::write(&self.path, data).map_err(|e| CloudError::io(self.path.display(), e))
    }
}

fn settings_of(document: &Value) -> CloudResult<&Map<String, Value>> {
    document
        .get("settings")
        .and_then(Value::as_object)
        .ok_or_else(|| CloudError::malformed("document has no \"settings\" object"))
}
