pub mod memory;

use anyhow::Result;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MenuHandle(String);

impl MenuHandle {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MenuHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Toggle {
    pub key: String,
    pub label: String,
    pub value: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToggleResponse {
    Save(Vec<bool>),
    Reset,
    Dismissed,
}

/// UI and command surface of the host application.
///
/// Menu items carry an ID instead of a callback; the host reports a click by
/// handing the ID back to [`crate::framework::Framework::dispatch`].
pub trait HostUi {
    fn menu_exists(&self, name: &str) -> bool;
    fn delete_menu(&mut self, name: &str) -> Result<()>;
    fn create_menu(&mut self, name: &str, label: &str, parent: &str) -> Result<MenuHandle>;
    fn add_submenu(&mut self, parent: &MenuHandle, label: &str, tear_off: bool) -> Result<MenuHandle>;
    fn add_item(&mut self, parent: &MenuHandle, id: &str, label: &str) -> Result<()>;
    fn add_separator(&mut self, parent: &MenuHandle) -> Result<()>;

    fn confirm_dialog(&mut self, title: &str, message: &str, buttons: &[&str]) -> Result<String>;
    fn pick_file(&mut self, caption: &str, filter: &str) -> Result<Option<PathBuf>>;
    fn pick_folder(&mut self, caption: &str) -> Result<Option<PathBuf>>;
    fn toggle_dialog(&mut self, title: &str, toggles: &[Toggle]) -> Result<ToggleResponse>;

    fn is_extension_loaded(&self, name: &str) -> bool;
    fn load_extension(&mut self, name: &str) -> Result<()>;
    /// Evaluates a command in the host's own command language.
    fn run_command(&mut self, command: &str) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupCommand {
    DeleteScriptNode(String),
    KillScriptJob(u32),
}

pub trait SceneHost {
    fn script_nodes(&self) -> Result<Vec<String>>;
    fn script_node_body(&self, node: &str) -> Result<Option<String>>;
    fn set_script_node_body(&mut self, node: &str, body: &str) -> Result<()>;
    fn unlock_node(&mut self, node: &str) -> Result<()>;
    fn node_exists(&self, node: &str) -> bool;
    fn delete_node(&mut self, node: &str) -> Result<()>;

    /// Job listings in the host's `"<id>: <description>"` form.
    fn script_jobs(&self) -> Result<Vec<String>>;
    fn script_job_exists(&self, id: u32) -> bool;
    fn kill_script_job(&mut self, id: u32) -> Result<()>;

    fn procedure_defined(&self, name: &str) -> bool;
    fn define_empty_procedure(&mut self, name: &str) -> Result<()>;

    fn user_scripts_dir(&self) -> Option<PathBuf>;
    fn defer(&mut self, command: CleanupCommand);
}

pub fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub fn quote(value: &str) -> String {
    format!("\"{}\"", escape(value))
}
