//! Cached listing of the assets stored remotely.
//!
//! Rebuilt wholesale from every successful inventory fetch. Fields are
//! type-checked one by one: a wrong-typed field falls back to zero or empty
//! rather than failing the whole listing.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{CloudError, CloudResult};

/// Rough classification of a remote file, used to badge listings and to
/// pick which entries a config pull downloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    /// Lives under an `assets/` folder.
    Asset,
    Config,
    Json,
    File,
}

impl AssetKind {
    pub fn classify(filename: &str) -> Self {
        let lower = filename.to_ascii_lowercase();
        if filename.contains("assets/") {
            AssetKind::Asset
        } else if lower.ends_with(".cfg") {
            AssetKind::Config
        } else if lower.ends_with(".json") {
            AssetKind::Json
        } else {
            AssetKind::File
        }
    }

    pub fn badge(&self) -> &'static str {
        match self {
            AssetKind::Asset => "[ASSET]",
            AssetKind::Config => "[CONFIG]",
            AssetKind::Json => "[JSON]",
            AssetKind::File => "[FILE]",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryAsset {
    /// Unique key on the server.
    pub filename: String,
    /// Where the file is saved locally, relative to the save directory.
    pub local_path: String,
    pub latest_version: u64,
    pub version_count: u64,
    /// Bytes across every stored version.
    pub total_size: u64,
    pub last_updated: String,
}

impl InventoryAsset {
    pub fn kind(&self) -> AssetKind {
        AssetKind::classify(&self.filename)
    }

    fn from_object(object: &Map<String, Value>) -> Self {
        let filename = string_field(object, "filename");
        let local_path = match object.get("local_path").and_then(Value::as_str) {
            Some(path) if !path.is_empty() => path.to_string(),
            _ => filename.clone(),
        };

        InventoryAsset {
            local_path,
            latest_version: count_field(object, "latest_version"),
            version_count: count_field(object, "version_count"),
            total_size: count_field(object, "total_size"),
            last_updated: string_field(object, "last_updated"),
            filename,
        }
    }
}

/// Account-wide storage figures reported alongside the listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StorageSummary {
    pub storage_used_mb: Option<f64>,
    pub storage_limit_mb: Option<f64>,
    pub version_limit: Option<u64>,
}

impl StorageSummary {
    fn from_response(response: &Map<String, Value>) -> Self {
        // The service formats the used figure as a string with two decimals.
        let megabytes = |key: &str| match response.get(key) {
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            Some(value) => value.as_f64(),
            None => None,
        };

        StorageSummary {
            storage_used_mb: megabytes("storage_used_mb"),
            storage_limit_mb: megabytes("storage_limit_mb"),
            version_limit: response.get("version_limit").and_then(Value::as_u64),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Inventory {
    assets: Vec<InventoryAsset>,
    summary: StorageSummary,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an inventory from a fetch response.
    ///
    /// The response must carry an `assets` array. Elements that are not
    /// objects are skipped.
    pub fn from_response(response: &Value) -> CloudResult<Self> {
        let object = response
            .as_object()
            .ok_or_else(|| CloudError::malformed("inventory response is not an object"))?;
        let entries = object
            .get("assets")
            .and_then(Value::as_array)
            .ok_or_else(|| CloudError::malformed("inventory response has no \"assets\" array"))?;

        let mut assets = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            match entry.as_object() {
                Some(asset) => assets.push(InventoryAsset::from_object(asset)),
                None => log::warn!("Skipping inventory entry {}: not an object", index),
            }
        }

        Ok(Inventory {
            assets,
            summary: StorageSummary::from_response(object),
        })
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&InventoryAsset> {
        self.assets.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &InventoryAsset> {
        self.assets.iter()
    }

    pub fn find(&self, filename: &str) -> Option<&InventoryAsset> {
        self.assets.iter().find(|asset| asset.filename == filename)
    }

    /// Local save path recorded for `filename`, if it is listed.
    pub fn local_path_for(&self, filename: &str) -> Option<&str> {
        self.find(filename).map(|asset| asset.local_path.as_str())
    }

    pub fn summary(&self) -> &StorageSummary {
        &self.summary
    }
}

fn string_field(object: &Map<String, Value>, key: &str) -> String {
    object
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn count_field(object: &Map<String, Value>, key: &str) -> u64 {
    match object.get(key) {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_full_record() {
        let inventory = Inventory::from_response(&json!({
            "assets": [{
                "filename": "a.cfg",
                "local_path": "a.cfg",
                "latest_version": 2,
                "version_count": 3,
                "total_size": 100,
                "last_updated": "t"
            }]
        }))
        .unwrap();

        let asset = inventory.get(0).unwrap();
        assert_eq!(asset.latest_version, 2);
        assert_eq!(asset.version_count, 3);
        assert_eq!(asset.total_size, 100);
        assert_eq!(asset.last_updated, "t");
        assert!(inventory.get(1).is_none());
    }

    #[test]
    fn wrong_types_fall_back() {
        let inventory = Inventory::from_response(&json!({
            "assets": [{
                "filename": "identities.json",
                "latest_version": "2",
                "version_count": -1,
                "total_size": 12.0,
                "last_updated": 5
            }]
        }))
        .unwrap();

        let asset = inventory.get(0).unwrap();
        assert_eq!(asset.local_path, "identities.json");
        assert_eq!(asset.latest_version, 0);
        assert_eq!(asset.version_count, 0);
        assert_eq!(asset.total_size, 12);
        assert_eq!(asset.last_updated, "");
    }

    #[test]
    fn non_object_entries_are_skipped() {
        let inventory =
            Inventory::from_response(&json!({"assets": [1, {"filename": "x.cfg"}, null]})).unwrap();
        assert_eq!(inventory.len(), 1);
        assert_eq!(inventory.get(0).unwrap().filename, "x.cfg");
    }

    #[test]
    fn missing_assets_array_is_malformed() {
        assert!(matches!(
            Inventory::from_response(&json!({"assets": "nope"})),
            Err(CloudError::MalformedPayload { .. })
        ));
        assert!(Inventory::from_response(&json!([])).is_err());
    }

    #[test]
    fn local_path_lookup() {
        let inventory = Inventory::from_response(&json!({
            "assets": [
                {"filename": "assets/game/x.png", "local_path": "assets/game/x.png"},
                {"filename": "remote.cfg", "local_path": "sub/dir/local.cfg"}
            ]
        }))
        .unwrap();

        assert_eq!(inventory.local_path_for("remote.cfg"), Some("sub/dir/local.cfg"));
        assert_eq!(inventory.local_path_for("unknown.cfg"), None);
        assert!(inventory.find("assets/game/x.png").is_some());
    }

    #[test]
    fn storage_summary_accepts_strings_and_numbers() {
        let inventory = Inventory::from_response(&json!({
            "assets": [],
            "storage_used_mb": "1.25",
            "storage_limit_mb": 100,
            "version_limit": 5
        }))
        .unwrap();

        assert!(inventory.is_empty());
        assert_eq!(
            inventory.summary(),
            &StorageSummary {
                storage_used_mb: Some(1.25),
                storage_limit_mb: Some(100.0),
                version_limit: Some(5),
            }
        );
    }

    #[test]
    fn kinds_match_badges() {
        assert_eq!(AssetKind::classify("assets/hud/a.png"), AssetKind::Asset);
        assert_eq!(AssetKind::classify("settings_ddnet.cfg"), AssetKind::Config);
        assert_eq!(AssetKind::classify("identities.json"), AssetKind::Json);
        assert_eq!(AssetKind::classify("notes.txt"), AssetKind::File);
        assert_eq!(AssetKind::Config.badge(), "[CONFIG]");
    }
}
