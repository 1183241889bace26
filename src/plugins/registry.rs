use super::{LoadedPlugin, ManifestPlugin, Plugin, PluginCatalog, PluginSource};
use crate::config::FrameworkConfig;
use crate::error::LoadError;
use crate::paths;
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: Vec<String>,
    pub failed: Vec<LoadError>,
}

pub struct PluginRegistry {
    catalog: PluginCatalog,
    plugins_dir: Option<PathBuf>,
    disabled: BTreeSet<String>,
    loaded: BTreeMap<String, LoadedPlugin>,
}

impl PluginRegistry {
    pub fn new(catalog: PluginCatalog, plugins_dir: Option<PathBuf>) -> Self {
        Self {
            catalog,
            plugins_dir,
            disabled: BTreeSet::new(),
            loaded: BTreeMap::new(),
        }
    }

    pub fn from_config(config: &FrameworkConfig, catalog: PluginCatalog) -> Self {
        Self::new(catalog, config.effective_plugins_dir()).with_disabled(config.disabled.clone())
    }

    pub fn with_disabled(mut self, disabled: BTreeSet<String>) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn plugins_dir(&self) -> Option<&Path> {
        self.plugins_dir.as_deref()
    }

    pub fn discover(&self) -> Vec<String> {
        let mut candidates: BTreeSet<String> = self.catalog.ids().map(String::from).collect();

        if let Some(dir) = &self.plugins_dir {
            for id in discover_dir(dir) {
                if !candidates.insert(id.clone()) {
                    log::debug!("Plugin directory {} is shadowed by a builtin", id);
                }
            }
        }

        candidates.retain(|id| {
            let enabled = !self.disabled.contains(id);
            if !enabled {
                log::info!("Skipping disabled plugin: {}", id);
            }
            enabled
        });

        let candidates: Vec<String> = candidates.into_iter().collect();
        log::info!("Discovered plugins: {:?}", candidates);
        candidates
    }

    pub fn load(&mut self, id: &str) -> Result<(), LoadError> {
        if !paths::is_safe_path_component(id) {
            return Err(LoadError::InvalidIdentifier(id.to_string()));
        }
        if self.disabled.contains(id) {
            return Err(LoadError::Disabled(id.to_string()));
        }

        let (plugin, source) = self.instantiate(id)?;
        let descriptor = isolate(|| plugin.descriptor()).map_err(|message| LoadError::Accessor {
            id: id.to_string(),
            accessor: "descriptor",
            message,
        })?;
        let commands = isolate(|| plugin.commands()).map_err(|message| LoadError::Accessor {
            id: id.to_string(),
            accessor: "commands",
            message,
        })?;

        let loaded = LoadedPlugin {
            id: id.to_string(),
            descriptor,
            commands,
            source,
        };
        log::info!("Loaded plugin: {} ({})", loaded.descriptor.name, id);
        if self.loaded.insert(id.to_string(), loaded).is_some() {
            log::info!("Replaced previously loaded plugin: {}", id);
        }
        Ok(())
    }

    pub fn load_all(&mut self) -> LoadReport {
        let mut report = LoadReport::default();

        for id in self.discover() {
            match self.load(&id) {
                Ok(()) => report.loaded.push(id),
                Err(e) => {
                    log::warn!("Failed to load plugin {}: {}", id, e);
                    report.failed.push(e);
                }
            }
        }

        log::info!("Loaded {} plugin(s), {} failed", report.loaded.len(), report.failed.len());
        report
    }

    fn instantiate(&self, id: &str) -> Result<(Box<dyn Plugin>, PluginSource), LoadError> {
        if self.catalog.contains(id) {
            let plugin = isolate(|| {
                self.catalog
                    .instantiate(id)
                    .unwrap_or_else(|| Err(anyhow::anyhow!("no factory registered")))
            })
            .map_err(|message| LoadError::Import {
                id: id.to_string(),
                source: anyhow::Error::msg(message),
            })?;
            return Ok((plugin, PluginSource::Builtin));
        }

        if !is_candidate_name(id) {
            return Err(LoadError::ReservedName(id.to_string()));
        }
        let dir = self
            .plugins_dir
            .as_deref()
            .and_then(|root| paths::plugin_dir(root, id))
            .filter(|d| ManifestPlugin::manifest_path(d).exists())
            .ok_or_else(|| LoadError::NotFound(id.to_string()))?;

        let plugin = ManifestPlugin::load(id, &dir)?;
        Ok((Box::new(plugin), PluginSource::Manifest(dir)))
    }

    pub fn get(&self, id: &str) -> Option<&LoadedPlugin> {
        self.loaded.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LoadedPlugin> {
        self.loaded.values()
    }

    pub fn len(&self) -> usize {
        self.loaded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
    }

    pub fn clear(&mut self) {
        self.loaded.clear();
    }
}

fn is_candidate_name(name: &str) -> bool {
    paths::is_safe_path_component(name)
        && !name.starts_with('.')
        && !name.starts_with("__")
        && !name.ends_with(".backup")
}

fn discover_dir(dir: &Path) -> Vec<String> {
    if !dir.exists() {
        log::info!("Plugin directory does not exist: {:?}", dir);
        return Vec::new();
    }

    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::warn!("Failed to read plugin directory entry in {:?}: {}", dir, e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_dir())
        .filter_map(|entry| entry.file_name().to_str().map(String::from))
        .filter(|name| is_candidate_name(name))
        .filter(|name| ManifestPlugin::manifest_path(&dir.join(name)).exists())
        .collect()
}

/// Runs plugin code, turning both errors and panics into a message.
fn isolate<T>(f: impl FnOnce() -> anyhow::Result<T>) -> Result<T, String> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(format!("{:#}", e)),
        Err(payload) => Err(panic_message(payload.as_ref())),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::{CommandEntry, PluginDescriptor};
    use anyhow::Result;
    use std::fs;
    use tempfile::TempDir;

    const VALID_MANIFEST: &str = r#"
[plugin]
name = "Dir Plugin"
version = "0.3"
description = "From a directory"

[[commands]]
label = "Run"
command = "print 1"
"#;

    struct Fixed {
        name: &'static str,
        fail_descriptor: bool,
    }

    impl Plugin for Fixed {
        fn descriptor(&self) -> Result<PluginDescriptor> {
            if self.fail_descriptor {
                anyhow::bail!("descriptor exploded");
            }
            Ok(PluginDescriptor {
                name: self.name.to_string(),
                version: "1.0".to_string(),
                description: String::new(),
                author: String::new(),
            })
        }

        fn commands(&self) -> Result<Vec<CommandEntry>> {
            Ok(vec![CommandEntry::new("Go", |_| Ok(()))])
        }
    }

    struct Panicky;

    impl Plugin for Panicky {
        fn descriptor(&self) -> Result<PluginDescriptor> {
            Fixed { name: "Panicky", fail_descriptor: false }.descriptor()
        }

        fn commands(&self) -> Result<Vec<CommandEntry>> {
            panic!("commands panicked");
        }
    }

    fn fixed(name: &'static str) -> Box<dyn Plugin> {
        Box::new(Fixed { name, fail_descriptor: false })
    }

    fn write_plugin_dir(root: &Path, name: &str, manifest: &str) {
        let dir = root.join(name);
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("plugin.toml"), manifest).unwrap();
    }

    #[test]
    fn discover_returns_empty_when_no_valid_plugins() {
        let temp_dir = TempDir::new().unwrap();
        let registry = PluginRegistry::new(PluginCatalog::new(), Some(temp_dir.path().to_path_buf()));

        // Empty dir
        assert!(registry.discover().is_empty());

        // File instead of dir
        fs::write(temp_dir.path().join("file.txt"), "content").unwrap();
        assert!(registry.discover().is_empty());

        // Dir without manifest
        fs::create_dir(temp_dir.path().join("no-manifest")).unwrap();
        assert!(registry.discover().is_empty());

        // Nonexistent dir
        let missing = PluginRegistry::new(PluginCatalog::new(), Some(PathBuf::from("/nonexistent/path")));
        assert!(missing.discover().is_empty());
    }

    #[test]
    fn discover_skips_reserved_and_backup_names() {
        // Arrange
        let temp_dir = TempDir::new().unwrap();
        for name in ["__pycache__", ".hidden", "old.backup", "real_plugin"] {
            write_plugin_dir(temp_dir.path(), name, VALID_MANIFEST);
        }
        let registry = PluginRegistry::new(PluginCatalog::new(), Some(temp_dir.path().to_path_buf()));

        // Act
        let candidates = registry.discover();

        // Assert
        assert_eq!(candidates, vec!["real_plugin"]);
    }

    #[test]
    fn discover_merges_catalog_and_directory_sorted_without_duplicates() {
        let temp_dir = TempDir::new().unwrap();
        write_plugin_dir(temp_dir.path(), "mid", VALID_MANIFEST);
        write_plugin_dir(temp_dir.path(), "alpha", VALID_MANIFEST);
        let catalog = PluginCatalog::new()
            .with("zulu", || Ok(fixed("Z")))
            .with("alpha", || Ok(fixed("A")));
        let registry = PluginRegistry::new(catalog, Some(temp_dir.path().to_path_buf()));

        assert_eq!(registry.discover(), vec!["alpha", "mid", "zulu"]);
    }

    #[test]
    fn discover_omits_disabled_plugins() {
        let catalog = PluginCatalog::new()
            .with("keep", || Ok(fixed("Keep")))
            .with("drop", || Ok(fixed("Drop")));
        let registry = PluginRegistry::new(catalog, None)
            .with_disabled(BTreeSet::from(["drop".to_string()]));

        assert_eq!(registry.discover(), vec!["keep"]);
    }

    #[test]
    #[cfg(unix)]
    fn discover_follows_symlinks() {
        use std::os::unix::fs::symlink;

        let temp_dir = TempDir::new().unwrap();
        let source_dir = TempDir::new().unwrap();
        fs::write(source_dir.path().join("plugin.toml"), VALID_MANIFEST).unwrap();
        symlink(source_dir.path(), temp_dir.path().join("linked")).unwrap();
        let registry = PluginRegistry::new(PluginCatalog::new(), Some(temp_dir.path().to_path_buf()));

        assert_eq!(registry.discover(), vec!["linked"]);
    }

    #[test]
    fn load_builtin_and_manifest_plugins() {
        // Arrange
        let temp_dir = TempDir::new().unwrap();
        write_plugin_dir(temp_dir.path(), "dir_plugin", VALID_MANIFEST);
        let catalog = PluginCatalog::new().with("builtin", || Ok(fixed("Builtin")));
        let mut registry = PluginRegistry::new(catalog, Some(temp_dir.path().to_path_buf()));

        // Act
        registry.load("builtin").unwrap();
        registry.load("dir_plugin").unwrap();

        // Assert
        assert_eq!(registry.get("builtin").unwrap().source, PluginSource::Builtin);
        let dir_plugin = registry.get("dir_plugin").unwrap();
        assert_eq!(dir_plugin.descriptor.name, "Dir Plugin");
        assert_eq!(dir_plugin.descriptor.author, "Unknown");
        assert_eq!(dir_plugin.source, PluginSource::Manifest(temp_dir.path().join("dir_plugin")));
    }

    #[test]
    fn load_rejects_unknown_and_unsafe_identifiers() {
        let mut registry = PluginRegistry::new(PluginCatalog::new(), None);

        assert!(matches!(registry.load("missing"), Err(LoadError::NotFound(_))));
        assert!(matches!(registry.load("../etc"), Err(LoadError::InvalidIdentifier(_))));
        assert!(registry.is_empty());
    }

    #[test]
    fn load_refuses_disabled_plugins() {
        // Arrange
        let temp_dir = TempDir::new().unwrap();
        write_plugin_dir(temp_dir.path(), "dir_plugin", VALID_MANIFEST);
        let catalog = PluginCatalog::new().with("builtin", || Ok(fixed("Builtin")));
        let disabled = BTreeSet::from(["builtin".to_string(), "dir_plugin".to_string()]);
        let mut registry =
            PluginRegistry::new(catalog, Some(temp_dir.path().to_path_buf())).with_disabled(disabled);

        // Act / Assert
        for id in ["builtin", "dir_plugin"] {
            assert!(matches!(registry.load(id), Err(LoadError::Disabled(_))), "id: {}", id);
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn load_refuses_reserved_directory_names() {
        // Arrange
        let temp_dir = TempDir::new().unwrap();
        let names = [".hidden", "__pycache__", "old.backup"];
        for name in names {
            write_plugin_dir(temp_dir.path(), name, VALID_MANIFEST);
        }
        let mut registry = PluginRegistry::new(PluginCatalog::new(), Some(temp_dir.path().to_path_buf()));

        // Act / Assert
        for name in names {
            assert!(matches!(registry.load(name), Err(LoadError::ReservedName(_))), "name: {}", name);
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn load_maps_factory_error_to_import_failure() {
        let catalog = PluginCatalog::new().with("broken", || anyhow::bail!("missing dependency"));
        let mut registry = PluginRegistry::new(catalog, None);

        let result = registry.load("broken");

        assert!(matches!(result, Err(LoadError::Import { .. })));
        assert!(registry.get("broken").is_none());
    }

    #[test]
    fn load_isolates_accessor_errors_and_panics() {
        let catalog = PluginCatalog::new()
            .with("erring", || Ok(Box::new(Fixed { name: "E", fail_descriptor: true })))
            .with("panicky", || Ok(Box::new(Panicky)));
        let mut registry = PluginRegistry::new(catalog, None);

        match registry.load("erring") {
            Err(LoadError::Accessor { accessor, message, .. }) => {
                assert_eq!(accessor, "descriptor");
                assert!(message.contains("descriptor exploded"));
            }
            other => panic!("expected accessor failure, got {:?}", other),
        }
        match registry.load("panicky") {
            Err(LoadError::Accessor { accessor, message, .. }) => {
                assert_eq!(accessor, "commands");
                assert!(message.contains("commands panicked"));
            }
            other => panic!("expected accessor failure, got {:?}", other),
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn load_all_continues_past_failures() {
        // Arrange
        let catalog = PluginCatalog::new()
            .with("a", || Ok(fixed("A")))
            .with("b", || Ok(Box::new(Fixed { name: "B", fail_descriptor: true })))
            .with("c", || Ok(fixed("C")));
        let mut registry = PluginRegistry::new(catalog, None);

        // Act
        let report = registry.load_all();

        // Assert
        assert_eq!(report.loaded, vec!["a", "c"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].id(), "b");
        let ids: Vec<&str> = registry.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn reload_overwrites_previous_entry() {
        // Arrange
        let temp_dir = TempDir::new().unwrap();
        write_plugin_dir(temp_dir.path(), "tool", VALID_MANIFEST);
        let mut registry = PluginRegistry::new(PluginCatalog::new(), Some(temp_dir.path().to_path_buf()));
        registry.load("tool").unwrap();
        fs::write(
            temp_dir.path().join("tool").join("plugin.toml"),
            VALID_MANIFEST.replace("0.3", "0.4"),
        )
        .unwrap();

        // Act
        registry.load("tool").unwrap();

        // Assert
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("tool").unwrap().descriptor.version, "0.4");
    }
}
