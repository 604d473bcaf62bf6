//! Accessor configuration
//!
//! Every field has a default, so an empty TOML document is a valid config.
//!
//! ```toml
//! strict_ident = true
//! layout = "left4dead2"
//!
//! [backup]
//! suffix = ".bak"
//! overwrite = true
//! ```

use crate::bsp::{DirectoryLayout, LumpId};
use crate::error::Result;
use crate::fileio::DEFAULT_BLOCK_SIZE;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Options consumed by [`BspFile::open_with`](crate::BspFile::open_with)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessorConfig {
    /// Refuse to open files whose ident is not a recognized magic value
    pub strict_ident: bool,

    /// Force a descriptor layout instead of detecting it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<DirectoryLayout>,

    /// Let bulk writes extend a lump into free space that follows it
    pub allow_growth: bool,

    /// Lump selected right after open
    pub default_lump: usize,

    pub backup: BackupConfig,
}

impl Default for AccessorConfig {
    fn default() -> Self {
        Self {
            strict_ident: false,
            layout: None,
            allow_growth: true,
            default_lump: LumpId::Entities.index(),
            backup: BackupConfig::default(),
        }
    }
}

impl AccessorConfig {
    /// Parse a config from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load a config from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Render the config as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Whole-file backup settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// Appended to the source path to form the backup path
    pub suffix: String,

    /// Copy block size in bytes
    pub block_size: usize,

    /// Replace an existing backup
    pub overwrite: bool,

    /// Re-read the copy and compare its CRC32 with the source
    pub verify: bool,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            suffix: ".old".to_string(),
            block_size: DEFAULT_BLOCK_SIZE,
            overwrite: false,
            verify: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        let config = AccessorConfig::from_toml_str("").unwrap();
        assert_eq!(config, AccessorConfig::default());
        assert_eq!(config.backup.suffix, ".old");
        assert!(config.allow_growth);
    }

    #[test]
    fn test_partial_document() {
        let config = AccessorConfig::from_toml_str(
            r#"
            strict_ident = true
            layout = "left4dead2"

            [backup]
            suffix = ".bak"
            "#,
        )
        .unwrap();

        assert!(config.strict_ident);
        assert_eq!(config.layout, Some(DirectoryLayout::Left4Dead2));
        assert_eq!(config.backup.suffix, ".bak");
        assert_eq!(config.backup.block_size, DEFAULT_BLOCK_SIZE);
        assert!(!config.backup.overwrite);
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = AccessorConfig::default();
        config.allow_growth = false;
        config.default_lump = LumpId::Brushes.index();

        let text = config.to_toml_string().unwrap();
        let parsed = AccessorConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_invalid_document() {
        let result = AccessorConfig::from_toml_str("strict_ident = \"yes\"");
        assert!(result.is_err());
    }
}
