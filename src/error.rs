use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("plugin '{0}' is not registered and has no plugin directory")]
    NotFound(String),

    #[error("'{0}' is not a valid plugin identifier")]
    InvalidIdentifier(String),

    #[error("plugin '{0}' is disabled in the config")]
    Disabled(String),

    #[error("'{0}' is a reserved directory name, not a plugin")]
    ReservedName(String),

    #[error("failed to import plugin '{id}': {source:#}")]
    Import {
        id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("plugin '{id}' is missing the required {capability} capability")]
    MissingCapability { id: String, capability: &'static str },

    #[error("plugin '{id}' does not support platform {platform}")]
    UnsupportedPlatform { id: String, platform: &'static str },

    #[error("plugin '{id}' failed in {accessor}: {message}")]
    Accessor {
        id: String,
        accessor: &'static str,
        message: String,
    },
}

impl LoadError {
    pub fn id(&self) -> &str {
        match self {
            LoadError::NotFound(id)
            | LoadError::InvalidIdentifier(id)
            | LoadError::Disabled(id)
            | LoadError::ReservedName(id) => id,
            LoadError::Import { id, .. }
            | LoadError::MissingCapability { id, .. }
            | LoadError::UnsupportedPlatform { id, .. }
            | LoadError::Accessor { id, .. } => id,
        }
    }
}

#[derive(Debug, Error)]
pub enum FrameworkError {
    #[error("failed to build menu: {0:#}")]
    MenuBuild(#[source] anyhow::Error),

    #[error("failed to tear down menu: {0:#}")]
    Teardown(#[source] anyhow::Error),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("menu is not built")]
    NotActive,

    #[error("menu action '{id}' failed: {source:#}")]
    Action {
        id: String,
        #[source]
        source: anyhow::Error,
    },
}
