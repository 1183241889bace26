use crate::config::FrameworkConfig;
use crate::error::FrameworkError;
use crate::host::HostUi;
use crate::menu::{build_menu, ActionRouter};
use crate::plugins::registry::LoadReport;
use crate::plugins::{PluginCatalog, PluginRegistry};

#[derive(Debug, Clone, PartialEq)]
pub enum FrameworkState {
    Inactive,
    Active,
    /// Activation stopped part-way; whatever menu was built is left in place.
    Degraded(String),
}

pub struct Framework {
    config: FrameworkConfig,
    registry: PluginRegistry,
    router: Option<ActionRouter>,
    state: FrameworkState,
}

impl Framework {
    pub fn new(config: FrameworkConfig, catalog: PluginCatalog) -> Self {
        let registry = PluginRegistry::from_config(&config, catalog);
        Self::with_registry(config, registry)
    }

    pub fn with_registry(config: FrameworkConfig, registry: PluginRegistry) -> Self {
        Self {
            config,
            registry,
            router: None,
            state: FrameworkState::Inactive,
        }
    }

    pub fn config(&self) -> &FrameworkConfig {
        &self.config
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn state(&self) -> &FrameworkState {
        &self.state
    }

    pub fn router(&self) -> Option<&ActionRouter> {
        self.router.as_ref()
    }

    pub fn activate(&mut self, host: &mut dyn HostUi) -> Result<LoadReport, FrameworkError> {
        self.registry.clear();
        self.router = None;

        let report = self.registry.load_all();
        self.rebuild(host)?;
        Ok(report)
    }

    pub fn reload_plugin(&mut self, host: &mut dyn HostUi, id: &str) -> Result<(), FrameworkError> {
        if self.state == FrameworkState::Inactive {
            return Err(FrameworkError::NotActive);
        }
        log::info!("Reloading plugin: {}", id);
        self.registry.load(id)?;
        self.rebuild(host)
    }

    fn rebuild(&mut self, host: &mut dyn HostUi) -> Result<(), FrameworkError> {
        match build_menu(host, &self.registry, &self.config) {
            Ok((_menu, router)) => {
                self.router = Some(router);
                self.state = FrameworkState::Active;
                Ok(())
            }
            Err(e) => {
                self.router = None;
                self.state = FrameworkState::Degraded(format!("{:#}", e));
                Err(FrameworkError::MenuBuild(e))
            }
        }
    }

    pub fn deactivate(&mut self, host: &mut dyn HostUi) -> Result<(), FrameworkError> {
        self.router = None;
        self.registry.clear();
        self.state = FrameworkState::Inactive;

        if host.menu_exists(&self.config.menu_name) {
            host.delete_menu(&self.config.menu_name)
                .map_err(FrameworkError::Teardown)?;
        }
        Ok(())
    }

    pub fn dispatch(&self, host: &mut dyn HostUi, item_id: &str) -> Result<bool, FrameworkError> {
        let router = self.router.as_ref().ok_or(FrameworkError::NotActive)?;

        match router.route(item_id, host) {
            Ok(matched) => Ok(matched),
            Err(source) => {
                log::error!("Menu action {} failed: {:#}", item_id, source);
                let message = format!("{:#}", source);
                if let Err(e) = host.confirm_dialog("Error", &message, &["OK"]) {
                    log::warn!("Failed to show error dialog: {:#}", e);
                }
                Err(FrameworkError::Action {
                    id: item_id.to_string(),
                    source,
                })
            }
        }
    }
}

pub fn initialize_plugin(
    host: &mut dyn HostUi,
    config: FrameworkConfig,
    catalog: PluginCatalog,
) -> Framework {
    let mut framework = Framework::new(config, catalog);
    match framework.activate(host) {
        Ok(report) => log::info!(
            "{} framework initialized ({} plugin(s) loaded)",
            framework.config.menu_label,
            report.loaded.len()
        ),
        Err(e) => log::error!("{} framework initialization failed: {}", framework.config.menu_label, e),
    }
    framework
}

pub fn uninitialize_plugin(host: &mut dyn HostUi, mut framework: Framework) {
    match framework.deactivate(host) {
        Ok(()) => log::info!("{} framework unloaded", framework.config.menu_label),
        Err(e) => log::error!("{} framework unload error: {}", framework.config.menu_label, e),
    }
}
