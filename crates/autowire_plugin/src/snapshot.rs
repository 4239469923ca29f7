use log::debug;
use std::sync::{Arc, PoisonError, RwLock};

use autowire_core::{Config, MappingSnapshot, PathFilter, create_mapping};

/// The current import mapping, shared between transforms and the watcher.
///
/// Readers take a cheap `Arc` clone and keep a consistent view for as long
/// as they hold it. A rebuild never mutates a published snapshot.
#[derive(Debug)]
pub struct SharedMapping {
    config: Config,
    filter: PathFilter,
    current: RwLock<Arc<MappingSnapshot>>,
}

impl SharedMapping {
    /// Builds the initial snapshot.
    pub fn new(config: Config, filter: PathFilter) -> Self {
        let initial = create_mapping(&config, &filter);
        SharedMapping { config, filter, current: RwLock::new(Arc::new(initial)) }
    }

    pub fn load(&self) -> Arc<MappingSnapshot> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Rescans everything and publishes the result.
    pub fn rebuild(&self) -> Arc<MappingSnapshot> {
        let fresh = Arc::new(create_mapping(&self.config, &self.filter));
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&fresh);
        debug!("Published mapping with {} symbols", fresh.imports.len());
        fresh
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn filter(&self) -> &PathFilter {
        &self.filter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autowire_core::{UserConfig, normalize_config};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn create_test_file(dir: &Path, path: &str, content: &str) {
        let file_path = dir.join(path);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(file_path, content).unwrap();
    }

    fn shared(root: &Path) -> SharedMapping {
        let user: UserConfig =
            serde_json::from_str(r#"{ "components": [{ "directory": "src/lib", "flat": true }] }"#)
                .unwrap();
        let config = normalize_config(user, root).unwrap();
        let filter = PathFilter::new(&config.root, &config.include, &config.exclude).unwrap();
        SharedMapping::new(config, filter)
    }

    #[test]
    fn test_rebuild_picks_up_new_component() {
        let temp_dir = TempDir::new().unwrap();
        create_test_file(temp_dir.path(), "src/lib/Button.svelte", "<button />");
        let mapping = shared(temp_dir.path());

        let before = mapping.load();
        assert!(before.imports.contains_key("Button"));
        assert!(!before.imports.contains_key("Card"));

        create_test_file(temp_dir.path(), "src/lib/Card.svelte", "<div />");
        mapping.rebuild();

        assert!(mapping.load().imports.contains_key("Card"));
        assert!(!before.imports.contains_key("Card"));
    }

    #[test]
    fn test_rebuild_drops_removed_component() {
        let temp_dir = TempDir::new().unwrap();
        create_test_file(temp_dir.path(), "src/lib/Button.svelte", "<button />");
        let mapping = shared(temp_dir.path());

        fs::remove_file(temp_dir.path().join("src/lib/Button.svelte")).unwrap();
        let after = mapping.rebuild();
        assert!(after.imports.is_empty());
        assert!(Arc::ptr_eq(&after, &mapping.load()));
    }
}
