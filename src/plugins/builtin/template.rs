use crate::host::HostUi;
use crate::plugins::{CommandEntry, Plugin, PluginDescriptor};
use anyhow::Result;

pub const ID: &str = "plugin_template";

pub struct PluginTemplate;

impl Plugin for PluginTemplate {
    fn descriptor(&self) -> Result<PluginDescriptor> {
        Ok(PluginDescriptor {
            name: "Plugin Template".to_string(),
            version: "1.0".to_string(),
            description: "Skeleton for new plugins".to_string(),
            author: "CFA Tools Team".to_string(),
        })
    }

    fn commands(&self) -> Result<Vec<CommandEntry>> {
        Ok(vec![
            CommandEntry::new("Command 1", |host| announce(host, "Command 1")),
            CommandEntry::new("Command 2", |host| announce(host, "Command 2")),
        ])
    }
}

fn announce(host: &mut dyn HostUi, name: &str) -> Result<()> {
    host.confirm_dialog(name, &format!("{} executed", name), &["OK"])?;
    Ok(())
}
