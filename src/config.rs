use crate::paths;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameworkConfig {
    /// Reserved name of the top-level menu; an existing menu with this name is replaced on build.
    pub menu_name: String,
    pub menu_label: String,
    pub parent_window: String,
    pub plugins_dir: Option<PathBuf>,
    pub disabled: BTreeSet<String>,
    pub signatures: Option<PathBuf>,
}

impl Default for FrameworkConfig {
    fn default() -> Self {
        Self {
            menu_name: "CFAToolsMenu".to_string(),
            menu_label: "CFA Tools".to_string(),
            parent_window: "MayaWindow".to_string(),
            plugins_dir: None,
            disabled: BTreeSet::new(),
            signatures: None,
        }
    }
}

impl FrameworkConfig {
    pub fn load() -> Result<Self> {
        let path = paths::config_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {:?}", path))?;
        let config: FrameworkConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {:?}", path))?;
        Ok(config)
    }

    pub fn effective_plugins_dir(&self) -> Option<PathBuf> {
        match &self.plugins_dir {
            Some(dir) => Some(dir.clone()),
            None => paths::plugins_dir().ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn load_from_returns_default_when_file_missing() {
        // Arrange
        let temp_dir = TempDir::new().unwrap();

        // Act
        let config = FrameworkConfig::load_from(&temp_dir.path().join("config.toml")).unwrap();

        // Assert
        assert_eq!(config.menu_name, "CFAToolsMenu");
        assert_eq!(config.menu_label, "CFA Tools");
        assert_eq!(config.parent_window, "MayaWindow");
        assert!(config.plugins_dir.is_none());
        assert!(config.disabled.is_empty());
    }

    #[test]
    fn load_from_fills_missing_fields_with_defaults() {
        // Arrange
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "menu_label = \"Studio Tools\"\ndisabled = [\"plugin_template\"]\n").unwrap();

        // Act
        let config = FrameworkConfig::load_from(&path).unwrap();

        // Assert
        assert_eq!(config.menu_label, "Studio Tools");
        assert_eq!(config.menu_name, "CFAToolsMenu");
        assert!(config.disabled.contains("plugin_template"));
        assert!(!config.disabled.contains("abc_importer"));
    }

    #[test]
    fn load_from_rejects_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "menu_name = {{{").unwrap();

        assert!(FrameworkConfig::load_from(&path).is_err());
    }

    #[test]
    fn effective_plugins_dir_prefers_explicit_setting() {
        let cases = [
            (Some(PathBuf::from("/studio/plugins")), "/studio/plugins"),
            (None, "cfa-tools/plugins"),
        ];

        for (plugins_dir, expected_suffix) in cases {
            let config = FrameworkConfig { plugins_dir, ..Default::default() };
            let dir = config.effective_plugins_dir().unwrap();
            assert!(dir.ends_with(expected_suffix), "{:?} should end with {}", dir, expected_suffix);
        }
    }
}
