// Configuration file handling

use crate::query::{SortMode, StatusFilter, ViewQuery};
use crate::store::DEFAULT_STORAGE_KEY;
use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const FILE_NAME: &str = "config.yml";
const APP_DIR: &str = "taskhub";

/// Settings read from `config.yml`; every field is optional in the file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the `.taskhub` slot database
    pub store_path: PathBuf,
    /// Slot key the collection is stored under
    pub storage_key: String,
    pub default_sort: SortMode,
    pub default_filter: StatusFilter,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            default_sort: SortMode::default(),
            default_filter: StatusFilter::default(),
        }
    }
}

impl Config {
    /// `<config_dir>/taskhub/config.yml`, if the platform has a config dir
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(FILE_NAME))
    }

    /// Load from `custom_path` or the default location
    ///
    /// A missing default file yields defaults; a missing custom file is an error.
    pub fn load(custom_path: Option<&Path>) -> Result<Self> {
        let path = match custom_path {
            Some(path) => {
                if !path.exists() {
                    return Err(eyre!("Config file not found: {}", path.display()));
                }
                path.to_path_buf()
            }
            None => match Self::default_path() {
                Some(path) if path.exists() => path,
                _ => {
                    debug!("No config file, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let contents =
            fs::read_to_string(&path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_yaml(&contents).with_context(|| format!("Invalid config file {}", path.display()))?;

        debug!(path = ?path, "Loaded config");
        Ok(config)
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(contents)?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Initial view selections
    pub fn query(&self) -> ViewQuery {
        ViewQuery::new(self.default_filter, self.default_sort)
    }
}

fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.storage_key, DEFAULT_STORAGE_KEY);
        assert_eq!(config.default_sort, SortMode::Newest);
        assert_eq!(config.default_filter, StatusFilter::All);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = Config::from_yaml("default_sort: dueSoon\n").unwrap();
        assert_eq!(config.default_sort, SortMode::DueSoon);
        assert_eq!(config.storage_key, DEFAULT_STORAGE_KEY);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(Config::from_yaml("").unwrap(), Config::default());
    }

    #[test]
    fn test_invalid_sort_rejected() {
        assert!(Config::from_yaml("default_sort: sideways\n").is_err());
    }

    #[test]
    fn test_load_custom_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(FILE_NAME);
        fs::write(
            &path,
            "store_path: /tmp/tasks\nstorage_key: mine\ndefault_filter: active\ndefault_sort: manual\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.store_path, PathBuf::from("/tmp/tasks"));
        assert_eq!(config.storage_key, "mine");

        let query = config.query();
        assert_eq!(query.filter, StatusFilter::Active);
        assert_eq!(query.sort, SortMode::Manual);
    }

    #[test]
    fn test_load_missing_custom_path_errors() {
        let temp = TempDir::new().unwrap();
        assert!(Config::load(Some(&temp.path().join("nope.yml"))).is_err());
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = Config {
            storage_key: "k".to_string(),
            ..Config::default()
        };
        let yaml = config.to_yaml().unwrap();
        assert_eq!(Config::from_yaml(&yaml).unwrap(), config);
    }
}
