//! Client configuration.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CloudError, CloudResult};

pub const DEFAULT_SERVICE_URL: &str = "http://localhost:3000/api";

/// Environment variable that overrides [`CloudConfig::service_url`].
pub const SERVICE_URL_ENV: &str = "CLOUDSYNC_URL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudConfig {
    /// Root of the service routes.
    pub service_url: String,
    pub request_timeout_secs: u64,
    /// Directory every synced file lives under.
    pub save_dir: PathBuf,
    /// Local settings document. Relative paths resolve against `save_dir`.
    pub settings_file: PathBuf,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.to_string(),
            request_timeout_secs: 30,
            save_dir: default_save_dir(),
            settings_file: PathBuf::from("settings.json"),
        }
    }
}

fn default_save_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cloudsync")
}

impl CloudConfig {
    /// Read a JSON config file. Missing keys take their defaults.
    pub fn load(path: &Path) -> CloudResult<Self> {
        log::debug!("Reading {}...", path.display());
        let data = fs::read(path).map_err(|e| CloudError::io(path.display(), e))?;
        let config: CloudConfig = serde_json::from_slice(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the environment.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = env::var(SERVICE_URL_ENV) {
            if !url.trim().is_empty() {
                log::debug!("{} overrides service url with {}", SERVICE_URL_ENV, url);
                self.service_url = url;
            }
        }
        self
    }

    pub fn validate(&self) -> CloudResult<()> {
        if self.request_timeout_secs == 0 {
            return Err(CloudError::Config {
                message: "request_timeout_secs must be greater than zero".to_string(),
            });
        }
        if self.service_url.trim().is_empty() {
            return Err(CloudError::Config {
                message: "service_url must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn settings_path(&self) -> PathBuf {
        if self.settings_file.is_absolute() {
            self.settings_file.clone()
        } else {
            self.save_dir.join(&self.settings_file)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults() {
        let config = CloudConfig::default();
        assert_eq!(config.service_url, "http://localhost:3000/api");
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert!(config.save_dir.ends_with("cloudsync"));
        assert_eq!(
            config.settings_path(),
            config.save_dir.join("settings.json")
        );
    }

    #[test]
    fn load_fills_missing_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cloudsync.json");
        fs::write(
            &path,
            br#"{"service_url": "https://sync.example.com/api", "save_dir": "/tmp/save"}"#,
        )
        .unwrap();

        let config = CloudConfig::load(&path).unwrap();
        assert_eq!(config.service_url, "https://sync.example.com/api");
        assert_eq!(config.save_dir, PathBuf::from("/tmp/save"));
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.settings_path(), PathBuf::from("/tmp/save/settings.json"));
    }

    #[test]
    fn load_rejects_zero_timeout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cloudsync.json");
        fs::write(&path, br#"{"request_timeout_secs": 0}"#).unwrap();

        assert!(matches!(
            CloudConfig::load(&path),
            Err(CloudError::Config { .. })
        ));
    }

    #[test]
    fn absolute_settings_file_is_kept() {
        let config = CloudConfig {
            settings_file: PathBuf::from("/etc/cloudsync/settings.json"),
            ..CloudConfig::default()
        };
        assert_eq!(
            config.settings_path(),
            PathBuf::from("/etc/cloudsync/settings.json")
        );
    }
}
