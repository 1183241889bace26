use crate::host::HostUi;
use crate::plugins::Action;
use anyhow::Result;

pub struct ActionRoute {
    pub id: String,
    pub action: Action,
}

#[derive(Default)]
pub struct ActionRouter {
    routes: Vec<ActionRoute>,
}

impl ActionRouter {
    pub fn new(routes: Vec<ActionRoute>) -> Self {
        Self { routes }
    }

    pub fn add(&mut self, id: impl Into<String>, action: Action) {
        self.routes.push(ActionRoute {
            id: id.into(),
            action,
        });
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|r| r.id.as_str())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.routes.iter().any(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Runs the first route registered for `id`. Returns `false` when nothing matched.
    pub fn route(&self, id: &str, host: &mut dyn HostUi) -> Result<bool> {
        match self.routes.iter().find(|r| r.id == id) {
            Some(route) => {
                (route.action)(host)?;
                Ok(true)
            }
            None => {
                log::warn!("No route found for menu item: {}", id);
                Ok(false)
            }
        }
    }
}
