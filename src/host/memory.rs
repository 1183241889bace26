use super::{CleanupCommand, HostUi, MenuHandle, SceneHost, Toggle, ToggleResponse};
use anyhow::{Context, Result};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt::Write as _;
use std::path::PathBuf;

pub const SEPARATOR_LABEL: &str = "---";

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Menu { name: String, parent: String },
    Submenu { tear_off: bool },
    Item { id: String },
    Separator,
}

#[derive(Debug, Clone)]
struct Node {
    label: String,
    kind: NodeKind,
    children: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dialog {
    pub title: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct MemoryHost {
    nodes: Vec<Node>,
    menus: Vec<(String, usize)>,
    dialogs: Vec<Dialog>,
    file_picks: VecDeque<Option<PathBuf>>,
    folder_picks: VecDeque<Option<PathBuf>>,
    toggle_responses: VecDeque<ToggleResponse>,
    toggle_requests: Vec<Vec<Toggle>>,
    extensions: BTreeSet<String>,
    commands: Vec<String>,
    failing_commands: Vec<String>,
    failing_submenus: Vec<String>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_file_pick(&mut self, pick: Option<PathBuf>) {
        self.file_picks.push_back(pick);
    }

    pub fn queue_folder_pick(&mut self, pick: Option<PathBuf>) {
        self.folder_picks.push_back(pick);
    }

    pub fn queue_toggle_response(&mut self, response: ToggleResponse) {
        self.toggle_responses.push_back(response);
    }

    /// Any command containing `pattern` fails when run.
    pub fn fail_commands_containing(&mut self, pattern: &str) {
        self.failing_commands.push(pattern.to_string());
    }

    pub fn fail_submenu(&mut self, label: &str) {
        self.failing_submenus.push(label.to_string());
    }

    pub fn menu_names(&self) -> Vec<&str> {
        self.menus.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn dialogs(&self) -> &[Dialog] {
        &self.dialogs
    }

    pub fn last_dialog(&self) -> Option<&Dialog> {
        self.dialogs.last()
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    pub fn toggle_requests(&self) -> &[Vec<Toggle>] {
        &self.toggle_requests
    }

    /// Labels directly under the named menu; separators read as [`SEPARATOR_LABEL`].
    pub fn top_level_labels(&self, menu: &str) -> Option<Vec<String>> {
        let root = self.root(menu)?;
        Some(self.child_labels(root))
    }

    pub fn submenu_labels(&self, menu: &str, submenu: &str) -> Option<Vec<String>> {
        let idx = self.find_path(menu, &[submenu])?;
        Some(self.child_labels(idx))
    }

    pub fn submenu_tear_off(&self, menu: &str, submenu: &str) -> Option<bool> {
        let idx = self.find_path(menu, &[submenu])?;
        match self.nodes[idx].kind {
            NodeKind::Submenu { tear_off } => Some(tear_off),
            _ => None,
        }
    }

    pub fn item_id(&self, menu: &str, path: &[&str]) -> Option<String> {
        let idx = self.find_path(menu, path)?;
        match &self.nodes[idx].kind {
            NodeKind::Item { id } => Some(id.clone()),
            _ => None,
        }
    }

    pub fn render(&self, menu: &str) -> Option<String> {
        let root = self.root(menu)?;
        let mut out = String::new();
        let _ = writeln!(out, "{} [{}]", self.nodes[root].label, menu);
        for &child in &self.nodes[root].children {
            self.render_node(child, 1, &mut out);
        }
        Some(out)
    }

    fn render_node(&self, idx: usize, depth: usize, out: &mut String) {
        let node = &self.nodes[idx];
        let indent = "  ".repeat(depth);
        match &node.kind {
            NodeKind::Separator => {
                let _ = writeln!(out, "{}{}", indent, SEPARATOR_LABEL);
            }
            NodeKind::Item { id } => {
                let _ = writeln!(out, "{}{}  ({})", indent, node.label, id);
            }
            NodeKind::Submenu { tear_off } => {
                let marker = if *tear_off { " [tear-off]" } else { "" };
                let _ = writeln!(out, "{}{}{}", indent, node.label, marker);
                for &child in &node.children {
                    self.render_node(child, depth + 1, out);
                }
            }
            NodeKind::Menu { .. } => {}
        }
    }

    fn root(&self, menu: &str) -> Option<usize> {
        self.menus
            .iter()
            .find(|(name, _)| name == menu)
            .map(|(_, idx)| *idx)
    }

    fn find_path(&self, menu: &str, path: &[&str]) -> Option<usize> {
        let mut current = self.root(menu)?;
        for label in path {
            current = *self.nodes[current]
                .children
                .iter()
                .find(|&&c| self.nodes[c].label == *label)?;
        }
        Some(current)
    }

    fn child_labels(&self, idx: usize) -> Vec<String> {
        self.nodes[idx]
            .children
            .iter()
            .map(|&c| self.nodes[c].label.clone())
            .collect()
    }

    fn node_index(&self, handle: &MenuHandle) -> Result<usize> {
        let idx: usize = handle
            .as_str()
            .parse()
            .with_context(|| format!("Invalid menu handle: {}", handle))?;
        if idx >= self.nodes.len() {
            anyhow::bail!("Unknown menu handle: {}", handle);
        }
        Ok(idx)
    }

    fn push_child(&mut self, parent: &MenuHandle, label: &str, kind: NodeKind) -> Result<usize> {
        let parent_idx = self.node_index(parent)?;
        let idx = self.nodes.len();
        self.nodes.push(Node {
            label: label.to_string(),
            kind,
            children: Vec::new(),
        });
        self.nodes[parent_idx].children.push(idx);
        Ok(idx)
    }
}

impl HostUi for MemoryHost {
    fn menu_exists(&self, name: &str) -> bool {
        self.root(name).is_some()
    }

    fn delete_menu(&mut self, name: &str) -> Result<()> {
        let before = self.menus.len();
        self.menus.retain(|(n, _)| n != name);
        if self.menus.len() == before {
            anyhow::bail!("Menu not found: {}", name);
        }
        Ok(())
    }

    fn create_menu(&mut self, name: &str, label: &str, parent: &str) -> Result<MenuHandle> {
        // Name clashes get a numeric suffix, the way the host does it.
        let mut unique = name.to_string();
        let mut suffix = 1;
        while self.menu_exists(&unique) {
            unique = format!("{}{}", name, suffix);
            suffix += 1;
        }

        let idx = self.nodes.len();
        self.nodes.push(Node {
            label: label.to_string(),
            kind: NodeKind::Menu {
                name: unique.clone(),
                parent: parent.to_string(),
            },
            children: Vec::new(),
        });
        self.menus.push((unique, idx));
        Ok(MenuHandle::new(idx.to_string()))
    }

    fn add_submenu(&mut self, parent: &MenuHandle, label: &str, tear_off: bool) -> Result<MenuHandle> {
        if self.failing_submenus.iter().any(|l| l == label) {
            anyhow::bail!("Host refused to create submenu {}", label);
        }
        let idx = self.push_child(parent, label, NodeKind::Submenu { tear_off })?;
        Ok(MenuHandle::new(idx.to_string()))
    }

    fn add_item(&mut self, parent: &MenuHandle, id: &str, label: &str) -> Result<()> {
        self.push_child(parent, label, NodeKind::Item { id: id.to_string() })?;
        Ok(())
    }

    fn add_separator(&mut self, parent: &MenuHandle) -> Result<()> {
        self.push_child(parent, SEPARATOR_LABEL, NodeKind::Separator)?;
        Ok(())
    }

    fn confirm_dialog(&mut self, title: &str, message: &str, buttons: &[&str]) -> Result<String> {
        log::info!("[dialog] {}\n{}", title, message);
        self.dialogs.push(Dialog {
            title: title.to_string(),
            message: message.to_string(),
        });
        Ok(buttons.first().copied().unwrap_or("OK").to_string())
    }

    fn pick_file(&mut self, _caption: &str, _filter: &str) -> Result<Option<PathBuf>> {
        Ok(self.file_picks.pop_front().flatten())
    }

    fn pick_folder(&mut self, _caption: &str) -> Result<Option<PathBuf>> {
        Ok(self.folder_picks.pop_front().flatten())
    }

    fn toggle_dialog(&mut self, _title: &str, toggles: &[Toggle]) -> Result<ToggleResponse> {
        self.toggle_requests.push(toggles.to_vec());
        Ok(self.toggle_responses.pop_front().unwrap_or(ToggleResponse::Dismissed))
    }

    fn is_extension_loaded(&self, name: &str) -> bool {
        self.extensions.contains(name)
    }

    fn load_extension(&mut self, name: &str) -> Result<()> {
        self.extensions.insert(name.to_string());
        Ok(())
    }

    fn run_command(&mut self, command: &str) -> Result<()> {
        self.commands.push(command.to_string());
        if let Some(pattern) = self.failing_commands.iter().find(|p| command.contains(p.as_str())) {
            anyhow::bail!("Command failed (matched {:?}): {}", pattern, command);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
struct ScriptNode {
    body: String,
    locked: bool,
}

#[derive(Debug, Default)]
pub struct MemoryScene {
    nodes: BTreeMap<String, ScriptNode>,
    jobs: BTreeMap<u32, String>,
    procedures: BTreeSet<String>,
    emptied_procedures: BTreeSet<String>,
    scripts_dir: Option<PathBuf>,
    deferred: VecDeque<CleanupCommand>,
}

impl MemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script_node(mut self, name: &str, body: &str) -> Self {
        self.nodes.insert(name.to_string(), ScriptNode { body: body.to_string(), locked: false });
        self
    }

    pub fn with_locked_script_node(mut self, name: &str, body: &str) -> Self {
        self.nodes.insert(name.to_string(), ScriptNode { body: body.to_string(), locked: true });
        self
    }

    pub fn with_job(mut self, id: u32, description: &str) -> Self {
        self.jobs.insert(id, description.to_string());
        self
    }

    pub fn with_procedure(mut self, name: &str) -> Self {
        self.procedures.insert(name.to_string());
        self
    }

    pub fn with_scripts_dir(mut self, dir: PathBuf) -> Self {
        self.scripts_dir = Some(dir);
        self
    }

    pub fn body(&self, node: &str) -> Option<&str> {
        self.nodes.get(node).map(|n| n.body.as_str())
    }

    pub fn job_ids(&self) -> Vec<u32> {
        self.jobs.keys().copied().collect()
    }

    pub fn is_emptied(&self, procedure: &str) -> bool {
        self.emptied_procedures.contains(procedure)
    }

    pub fn deferred(&self) -> impl Iterator<Item = &CleanupCommand> {
        self.deferred.iter()
    }

    pub fn take_deferred(&mut self) -> Vec<CleanupCommand> {
        self.deferred.drain(..).collect()
    }
}

impl SceneHost for MemoryScene {
    fn script_nodes(&self) -> Result<Vec<String>> {
        Ok(self.nodes.keys().cloned().collect())
    }

    fn script_node_body(&self, node: &str) -> Result<Option<String>> {
        let node = self.nodes.get(node).with_context(|| format!("No such node: {}", node))?;
        if node.body.is_empty() {
            return Ok(None);
        }
        Ok(Some(node.body.clone()))
    }

    fn set_script_node_body(&mut self, node: &str, body: &str) -> Result<()> {
        let entry = self.nodes.get_mut(node).with_context(|| format!("No such node: {}", node))?;
        entry.body = body.to_string();
        Ok(())
    }

    fn unlock_node(&mut self, node: &str) -> Result<()> {
        let entry = self.nodes.get_mut(node).with_context(|| format!("No such node: {}", node))?;
        entry.locked = false;
        Ok(())
    }

    fn node_exists(&self, node: &str) -> bool {
        self.nodes.contains_key(node)
    }

    fn delete_node(&mut self, node: &str) -> Result<()> {
        let entry = self.nodes.get(node).with_context(|| format!("No such node: {}", node))?;
        if entry.locked {
            anyhow::bail!("Cannot delete locked node: {}", node);
        }
        self.nodes.remove(node);
        Ok(())
    }

    fn script_jobs(&self) -> Result<Vec<String>> {
        Ok(self
            .jobs
            .iter()
            .map(|(id, description)| format!("{}: {}", id, description))
            .collect())
    }

    fn script_job_exists(&self, id: u32) -> bool {
        self.jobs.contains_key(&id)
    }

    fn kill_script_job(&mut self, id: u32) -> Result<()> {
        self.jobs
            .remove(&id)
            .map(|_| ())
            .with_context(|| format!("No such script job: {}", id))
    }

    fn procedure_defined(&self, name: &str) -> bool {
        self.procedures.contains(name)
    }

    fn define_empty_procedure(&mut self, name: &str) -> Result<()> {
        self.procedures.insert(name.to_string());
        self.emptied_procedures.insert(name.to_string());
        Ok(())
    }

    fn user_scripts_dir(&self) -> Option<PathBuf> {
        self.scripts_dir.clone()
    }

    fn defer(&mut self, command: CleanupCommand) {
        self.deferred.push_back(command);
    }
}
