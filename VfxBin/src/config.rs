//! Engine configuration (`config.toml`)
//!
//! ```toml
//! [assets]
//! search_roots = ["/mods/ahri/unpacked"]
//! cache_dir = "/tmp/vfxbin-cache"
//! max_upload_bytes = 26214400
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::assets::{AssetLimits, DEFAULT_MAX_UPLOAD_BYTES};
use crate::error::Result;

fn default_max_upload_bytes() -> u64 {
    DEFAULT_MAX_UPLOAD_BYTES
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub assets: AssetConfig,
}

/// `[assets]` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetConfig {
    /// Directories asset references are resolved against, in order
    #[serde(default)]
    pub search_roots: Vec<PathBuf>,
    /// Where `copy_asset` puts files; the platform cache dir when unset
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            search_roots: Vec::new(),
            cache_dir: None,
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl AssetConfig {
    #[must_use]
    pub fn limits(&self) -> AssetLimits {
        AssetLimits { max_bytes: self.max_upload_bytes }
    }

    /// Configured cache directory, else `<cache dir>/vfxbin/assets`
    #[must_use]
    pub fn cache_dir(&self) -> Option<PathBuf> {
        self.cache_dir
            .clone()
            .or_else(|| dirs::cache_dir().map(|p| p.join("vfxbin").join("assets")))
    }
}

impl EngineConfig {
    /// `<config dir>/vfxbin/config.toml`
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("vfxbin").join("config.toml"))
    }

    /// Read a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load from [`Self::default_path`], or defaults when there is no file
    ///
    /// A file that exists but does not parse is an error.
    pub fn load_or_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Write the config, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_missing_fields_take_defaults() {
        let config: EngineConfig = toml::from_str("[assets]\nsearch_roots = [\"/a\"]\n").unwrap();
        assert_eq!(config.assets.search_roots, vec![PathBuf::from("/a")]);
        assert_eq!(config.assets.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert_eq!(toml::from_str::<EngineConfig>("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");
        let mut config = EngineConfig::default();
        config.assets.cache_dir = Some(temp.path().join("cache"));
        config.assets.max_upload_bytes = 1024;

        config.save(&path).unwrap();
        assert_eq!(EngineConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[assets]\nmax_upload_bytes = \"lots\"\n").unwrap();
        assert!(matches!(EngineConfig::load(&path), Err(crate::Error::Config(_))));
    }
}
