use anyhow::{Context, Result};
use std::path::{Component, Path, PathBuf};

const APP_DIR: &str = "cfa-tools";

pub fn is_safe_path_component(name: &str) -> bool {
    if name.is_empty() || name.contains(['\\', '\0']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(c)), None) if c == name
    )
}

pub fn config_dir() -> Result<PathBuf> {
    let base = dirs::config_dir().context("Could not determine config directory")?;
    Ok(base.join(APP_DIR))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

pub fn plugins_dir() -> Result<PathBuf> {
    Ok(config_dir()?.join("plugins"))
}

pub fn plugin_dir(root: &Path, id: &str) -> Option<PathBuf> {
    is_safe_path_component(id).then(|| root.join(id))
}
