pub mod builtin;
pub mod catalog;
pub mod manifest;
pub mod registry;

pub use catalog::PluginCatalog;
pub use manifest::{ManifestPlugin, PluginManifest};
pub use registry::PluginRegistry;

use crate::host::HostUi;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

pub type Action = Arc<dyn Fn(&mut dyn HostUi) -> Result<()> + Send + Sync>;

pub fn action<F>(f: F) -> Action
where
    F: Fn(&mut dyn HostUi) -> Result<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    pub name: String,
    pub version: String,
    pub description: String,
    #[serde(default = "unknown_author")]
    pub author: String,
}

fn unknown_author() -> String {
    "Unknown".to_string()
}

#[derive(Clone)]
pub struct CommandEntry {
    pub label: String,
    pub action: Action,
}

impl CommandEntry {
    pub fn new<F>(label: impl Into<String>, action: F) -> Self
    where
        F: Fn(&mut dyn HostUi) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            action: self::action(action),
        }
    }
}

impl fmt::Debug for CommandEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandEntry").field("label", &self.label).finish_non_exhaustive()
    }
}

pub trait Plugin: Send + Sync {
    fn descriptor(&self) -> Result<PluginDescriptor>;
    /// Commands in the order they appear in the plugin's submenu.
    fn commands(&self) -> Result<Vec<CommandEntry>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginSource {
    Builtin,
    Manifest(PathBuf),
}

#[derive(Debug, Clone)]
pub struct LoadedPlugin {
    pub id: String,
    pub descriptor: PluginDescriptor,
    pub commands: Vec<CommandEntry>,
    pub source: PluginSource,
}

impl LoadedPlugin {
    pub fn about_text(&self) -> String {
        let d = &self.descriptor;
        format!(
            "{} v{}\n\nDescription: {}\nAuthor: {}\nPlugin ID: {}\n",
            d.name, d.version, d.description, d.author, self.id
        )
    }
}
