use crate::host::{self, HostUi, Toggle, ToggleResponse};
use crate::plugins::{CommandEntry, Plugin, PluginDescriptor};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub const ID: &str = "abc_importer";

const EXTENSION: &str = "AbcImport";
const FILE_FILTER: &str = "Alembic Files (*.abc)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSettings {
    pub connect_time: bool,
    pub create_proxy: bool,
    pub preserve_hierarchy: bool,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            connect_time: true,
            create_proxy: false,
            preserve_hierarchy: true,
        }
    }
}

impl ImportSettings {
    fn toggles(&self) -> Vec<Toggle> {
        [
            ("abc_connect_time", "Connect time", self.connect_time),
            ("abc_create_proxy", "Create proxy geometry", self.create_proxy),
            ("abc_preserve_hierarchy", "Preserve hierarchy", self.preserve_hierarchy),
        ]
        .into_iter()
        .map(|(key, label, value)| Toggle {
            key: key.to_string(),
            label: label.to_string(),
            value,
        })
        .collect()
    }

    fn from_values(values: &[bool]) -> Result<Self> {
        match values {
            [connect_time, create_proxy, preserve_hierarchy] => Ok(Self {
                connect_time: *connect_time,
                create_proxy: *create_proxy,
                preserve_hierarchy: *preserve_hierarchy,
            }),
            _ => anyhow::bail!("Expected 3 import settings, got {}", values.len()),
        }
    }
}

#[derive(Debug, Default)]
pub struct AbcImporter {
    settings: Arc<Mutex<ImportSettings>>,
}

impl AbcImporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn settings(&self) -> ImportSettings {
        *self.settings.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Plugin for AbcImporter {
    fn descriptor(&self) -> Result<PluginDescriptor> {
        Ok(PluginDescriptor {
            name: "ABC Importer".to_string(),
            version: "1.0".to_string(),
            description: "Import Alembic (ABC) files into the scene".to_string(),
            author: "CFA Tools Team".to_string(),
        })
    }

    fn commands(&self) -> Result<Vec<CommandEntry>> {
        let settings = self.settings.clone();
        Ok(vec![
            CommandEntry::new("Import ABC File", |host| {
                report_failure(host, "Failed to import ABC file", import_file)
            }),
            CommandEntry::new("Batch Import ABC", |host| {
                report_failure(host, "Failed to batch import ABC files", batch_import)
            }),
            CommandEntry::new("Import Settings", move |host| edit_settings(host, &settings)),
        ])
    }
}

fn report_failure(
    host: &mut dyn HostUi,
    context: &str,
    run: fn(&mut dyn HostUi) -> Result<()>,
) -> Result<()> {
    if let Err(e) = run(host) {
        let message = format!("{}: {:#}", context, e);
        log::error!("{}", message);
        host.confirm_dialog("Import Error", &message, &["OK"])?;
    }
    Ok(())
}

fn ensure_extension(host: &mut dyn HostUi) -> Result<()> {
    if !host.is_extension_loaded(EXTENSION) {
        log::info!("Loading host extension {}", EXTENSION);
        host.load_extension(EXTENSION)?;
    }
    Ok(())
}

pub fn import_command(path: &Path) -> String {
    format!("AbcImport -mode import {};", host::quote(&path.to_string_lossy()))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

fn import_file(host: &mut dyn HostUi) -> Result<()> {
    let Some(path) = host.pick_file("Select ABC File", FILE_FILTER)? else {
        return Ok(());
    };

    log::info!("Importing ABC file: {:?}", path);
    ensure_extension(host)?;
    host.run_command(&import_command(&path))?;

    host.confirm_dialog(
        "Import Complete",
        &format!("Imported ABC file: {}", file_name(&path)),
        &["OK"],
    )?;
    Ok(())
}

pub fn find_abc_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).with_context(|| format!("Failed to read {:?}", dir))?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("abc")))
        .collect();
    files.sort();
    Ok(files)
}

fn batch_import(host: &mut dyn HostUi) -> Result<()> {
    let Some(dir) = host.pick_folder("Select Folder Containing ABC Files")? else {
        return Ok(());
    };

    let files = find_abc_files(&dir)?;
    if files.is_empty() {
        host.confirm_dialog("No Files Found", "No ABC files found in the selected folder", &["OK"])?;
        return Ok(());
    }

    ensure_extension(host)?;

    let mut imported = 0;
    for file in &files {
        match host.run_command(&import_command(file)) {
            Ok(()) => {
                imported += 1;
                log::info!("Imported: {}", file_name(file));
            }
            Err(e) => log::warn!("Failed to import {}: {:#}", file_name(file), e),
        }
    }

    host.confirm_dialog(
        "Batch Import Complete",
        &format!("Imported {}/{} ABC files", imported, files.len()),
        &["OK"],
    )?;
    Ok(())
}

fn edit_settings(host: &mut dyn HostUi, settings: &Mutex<ImportSettings>) -> Result<()> {
    let current = *settings.lock().unwrap_or_else(|e| e.into_inner());

    match host.toggle_dialog("ABC Import Settings", &current.toggles())? {
        ToggleResponse::Save(values) => {
            let updated = ImportSettings::from_values(&values)?;
            *settings.lock().unwrap_or_else(|e| e.into_inner()) = updated;
            log::info!("ABC import settings saved: {:?}", updated);
            host.confirm_dialog("Settings Saved", "ABC import settings saved", &["OK"])?;
        }
        ToggleResponse::Reset => {
            *settings.lock().unwrap_or_else(|e| e.into_inner()) = ImportSettings::default();
            log::info!("ABC import settings reset to defaults");
            host.confirm_dialog("Settings Reset", "ABC import settings reset to defaults", &["OK"])?;
        }
        ToggleResponse::Dismissed => {}
    }
    Ok(())
}
