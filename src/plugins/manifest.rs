use super::{CommandEntry, Plugin, PluginDescriptor};
use crate::error::LoadError;
use crate::host::{self, HostUi};
use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "plugin.toml";

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{(\w+)\}\}").expect("placeholder pattern is valid")
});

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PluginManifest {
    pub plugin: PluginInfo,
    pub commands: Vec<ManifestCommand>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PluginInfo {
    #[serde(flatten)]
    pub descriptor: PluginDescriptor,
    #[serde(default)]
    pub platforms: Option<Vec<String>>,
}

impl PluginInfo {
    pub fn supports_current_platform(&self) -> bool {
        match &self.platforms {
            None => true,
            Some(platforms) => platforms.iter().any(|p| p == std::env::consts::OS),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum PickKind {
    #[default]
    None,
    File,
    Folder,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ManifestCommand {
    pub label: String,
    /// Host command template; `{{name}}` placeholders are filled at invocation.
    pub command: String,
    #[serde(default)]
    pub pick: PickKind,
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default)]
    pub requires: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ManifestPlugin {
    pub id: String,
    pub manifest: PluginManifest,
    pub path: PathBuf,
}

impl ManifestPlugin {
    pub fn manifest_path(dir: &Path) -> PathBuf {
        dir.join(MANIFEST_FILE)
    }

    pub fn load(id: &str, dir: &Path) -> Result<Self, LoadError> {
        let manifest_path = Self::manifest_path(dir);
        let import_error = |source: anyhow::Error| LoadError::Import {
            id: id.to_string(),
            source,
        };

        let content = std::fs::read_to_string(&manifest_path)
            .with_context(|| format!("Failed to read {:?}", manifest_path))
            .map_err(import_error)?;
        let table: toml::Table = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {:?}", manifest_path))
            .map_err(import_error)?;

        for (key, capability) in [("plugin", "descriptor"), ("commands", "command list")] {
            if !table.contains_key(key) {
                return Err(LoadError::MissingCapability {
                    id: id.to_string(),
                    capability,
                });
            }
        }

        let manifest: PluginManifest = toml::from_str(&content)
            .context("Invalid plugin.toml")
            .map_err(import_error)?;

        if !manifest.plugin.supports_current_platform() {
            return Err(LoadError::UnsupportedPlatform {
                id: id.to_string(),
                platform: std::env::consts::OS,
            });
        }

        Ok(Self {
            id: id.to_string(),
            manifest,
            path: dir.to_path_buf(),
        })
    }

    fn bind(&self, command: &ManifestCommand) -> CommandEntry {
        let command = command.clone();
        let plugin_id = self.id.clone();
        let plugin_dir = self.path.clone();

        CommandEntry::new(command.label.clone(), move |host: &mut dyn HostUi| {
            let mut params = HashMap::new();
            params.insert("plugin_id", plugin_id.clone());
            params.insert("plugin_dir", host::escape(&plugin_dir.to_string_lossy()));

            let picked = match command.pick {
                PickKind::None => None,
                PickKind::File => {
                    let filter = command.filter.as_deref().unwrap_or("All Files (*.*)");
                    match host.pick_file(&command.label, filter)? {
                        Some(path) => Some(("file", path)),
                        None => return Ok(()),
                    }
                }
                PickKind::Folder => match host.pick_folder(&command.label)? {
                    Some(path) => Some(("folder", path)),
                    None => return Ok(()),
                },
            };
            if let Some((key, path)) = picked {
                params.insert(key, host::escape(&path.to_string_lossy()));
            }

            if let Some(extension) = &command.requires {
                if !host.is_extension_loaded(extension) {
                    host.load_extension(extension)?;
                }
            }

            let line = interpolate(&command.command, &params);
            log::info!("[{}] Running: {}", plugin_id, line);
            host.run_command(&line)
                .with_context(|| format!("{} failed", command.label))
        })
    }
}

impl Plugin for ManifestPlugin {
    fn descriptor(&self) -> Result<PluginDescriptor> {
        Ok(self.manifest.plugin.descriptor.clone())
    }

    fn commands(&self) -> Result<Vec<CommandEntry>> {
        Ok(self.manifest.commands.iter().map(|c| self.bind(c)).collect())
    }
}

pub fn interpolate(template: &str, params: &HashMap<&str, String>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &regex::Captures| {
            params.get(&caps[1]).cloned().unwrap_or_default()
        })
        .to_string()
}
