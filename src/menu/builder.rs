use super::router::ActionRouter;
use crate::assets;
use crate::config::FrameworkConfig;
use crate::host::{HostUi, MenuHandle};
use crate::plugins::manifest::interpolate;
use crate::plugins::{action, LoadedPlugin, PluginRegistry};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fmt::Write as _;

pub const MANAGER_ID: &str = "__manager__";
pub const ABOUT_ID: &str = "__about__";

pub fn command_id(plugin_id: &str, index: usize) -> String {
    format!("{}::{}", plugin_id, index)
}

pub fn plugin_about_id(plugin_id: &str) -> String {
    format!("{}::{}", plugin_id, ABOUT_ID)
}

pub fn build_menu(
    host: &mut dyn HostUi,
    registry: &PluginRegistry,
    config: &FrameworkConfig,
) -> Result<(MenuHandle, ActionRouter)> {
    if host.menu_exists(&config.menu_name) {
        log::debug!("Removing existing menu: {}", config.menu_name);
        host.delete_menu(&config.menu_name)?;
    }

    let menu = host.create_menu(&config.menu_name, &config.menu_label, &config.parent_window)?;
    let mut router = ActionRouter::default();

    for plugin in registry.iter() {
        add_plugin_submenu(host, &menu, plugin, &mut router)
            .with_context(|| format!("Failed to build submenu for plugin {}", plugin.id))?;
    }

    host.add_separator(&menu)?;

    host.add_item(&menu, MANAGER_ID, "Plugin Manager")?;
    let manager_title = format!("{} Plugin Manager", config.menu_label);
    let summary = manager_text(&manager_title, registry.iter());
    router.add(
        MANAGER_ID,
        action(move |host| {
            host.confirm_dialog(&manager_title, &summary, &["OK"])?;
            Ok(())
        }),
    );

    let about_title = format!("About {}", config.menu_label);
    host.add_item(&menu, ABOUT_ID, &about_title)?;
    let about = about_text(&config.menu_label)?;
    router.add(
        ABOUT_ID,
        action(move |host| {
            host.confirm_dialog(&about_title, &about, &["OK"])?;
            Ok(())
        }),
    );

    log::info!("{} menu created with {} plugin(s)", config.menu_label, registry.len());
    Ok((menu, router))
}

fn add_plugin_submenu(
    host: &mut dyn HostUi,
    menu: &MenuHandle,
    plugin: &LoadedPlugin,
    router: &mut ActionRouter,
) -> Result<()> {
    let name = &plugin.descriptor.name;
    log::debug!("Creating submenu for plugin: {}", plugin.id);
    let submenu = host.add_submenu(menu, name, true)?;

    for (index, command) in plugin.commands.iter().enumerate() {
        let id = command_id(&plugin.id, index);
        host.add_item(&submenu, &id, &command.label)?;
        router.add(id, command.action.clone());
    }

    host.add_separator(&submenu)?;

    let about_id = plugin_about_id(&plugin.id);
    let title = format!("About {}", name);
    host.add_item(&submenu, &about_id, &title)?;
    let text = plugin.about_text();
    router.add(
        about_id,
        action(move |host| {
            host.confirm_dialog(&title, &text, &["OK"])?;
            Ok(())
        }),
    );
    Ok(())
}

pub fn manager_text<'a>(title: &str, plugins: impl Iterator<Item = &'a LoadedPlugin>) -> String {
    let plugins: Vec<&LoadedPlugin> = plugins.collect();
    let mut text = format!("{}\n\nLoaded plugins: {}\n\n", title, plugins.len());
    for plugin in plugins {
        let d = &plugin.descriptor;
        let _ = write!(
            text,
            "• {} v{}\n  Description: {}\n  Author: {}\n\n",
            d.name, d.version, d.description, d.author
        );
    }
    text
}

fn about_text(label: &str) -> Result<String> {
    let template = assets::text("about.txt")?;
    let params = HashMap::from([
        ("label", label.to_string()),
        ("version", env!("CARGO_PKG_VERSION").to_string()),
    ]);
    Ok(interpolate(&template, &params))
}
