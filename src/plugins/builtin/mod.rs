pub mod abc_importer;
pub mod template;

use super::PluginCatalog;

pub fn catalog() -> PluginCatalog {
    PluginCatalog::new()
        .with(abc_importer::ID, || Ok(Box::new(abc_importer::AbcImporter::new())))
        .with(template::ID, || Ok(Box::new(template::PluginTemplate)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_registers_every_builtin() {
        let catalog = catalog();

        assert_eq!(catalog.ids().collect::<Vec<_>>(), vec![abc_importer::ID, template::ID]);
    }

    #[test]
    fn every_builtin_describes_itself() {
        let catalog = catalog();

        for id in catalog.ids() {
            let plugin = catalog.instantiate(id).unwrap().unwrap();
            let descriptor = plugin.descriptor().unwrap();
            assert!(!descriptor.name.is_empty(), "{} has no name", id);
            assert!(!plugin.commands().unwrap().is_empty(), "{} has no commands", id);
        }
    }
}
