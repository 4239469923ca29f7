use log::{debug, info, trace, warn};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use autowire_core::{
    Config, MappingSnapshot, PathFilter, Result, UserConfig, normalize_config,
    render_declarations, traverse,
};
use autowire_transform::{TransformOptions, Transformed, transform};

use crate::ordering::{PLUGIN_NAME, enforce_plugin_ordering};
use crate::preprocessor::{ConfigLoader, resolve_preprocessor};
use crate::snapshot::SharedMapping;
use crate::watch::{WatchCallback, WatchEvent, WatchRegistry};

/// The build-tool facing side of autowire.
///
/// Construction does all fallible setup; the hooks themselves never fail a
/// build for a single bad file.
pub struct AutowirePlugin {
    mapping: Arc<SharedMapping>,
    options: TransformOptions,
}

impl AutowirePlugin {
    pub fn new(user_config: UserConfig, root: &Path) -> Result<Self> {
        let config = normalize_config(user_config, root)?;
        let filter = PathFilter::new(&config.root, &config.include, &config.exclude)?;
        let mapping = Arc::new(SharedMapping::new(config, filter));
        info!("{} ready with {} symbols", PLUGIN_NAME, mapping.load().imports.len());
        Ok(AutowirePlugin { mapping, options: TransformOptions::default() })
    }

    pub fn name(&self) -> &'static str {
        PLUGIN_NAME
    }

    /// Checks the host's plugin order and picks up the component extensions
    /// from the preprocessor configuration.
    pub fn config_resolved<S: AsRef<str>>(
        &mut self,
        plugin_names: &[S],
        loader: &dyn ConfigLoader,
    ) -> Result<()> {
        enforce_plugin_ordering(plugin_names)?;
        let preprocessor = resolve_preprocessor(loader, &self.mapping.config().root);
        self.options = TransformOptions { component_extensions: preprocessor.extensions };
        Ok(())
    }

    /// Returns the rewritten source, or `None` when the file is left alone.
    pub fn transform(&self, code: &str, filename: &Path) -> Option<String> {
        if !self.mapping.filter().matches(filename) {
            trace!("Not transforming {}", filename.display());
            return None;
        }

        let snapshot = self.mapping.load();
        match transform(code, filename, &snapshot.imports, &self.options) {
            Ok(Transformed::Changed { code, added }) => {
                debug!("{}: imported {}", filename.display(), added.join(", "));
                Some(code)
            }
            Ok(Transformed::Unchanged) => None,
            Err(e) => {
                warn!("{}", e);
                None
            }
        }
    }

    /// Watches the component directories and rebuilds the mapping when a
    /// file appears or disappears.
    pub fn configure_server(&self, registry: &mut dyn WatchRegistry) -> Result<()> {
        let paths: Vec<PathBuf> = self.mapping.load().watch_paths.clone();
        if paths.is_empty() {
            return Ok(());
        }
        let mapping = Arc::clone(&self.mapping);
        let callback: WatchCallback = Arc::new(move |event: WatchEvent| {
            debug!("Rebuilding mapping after {:?}", event);
            mapping.rebuild();
        });
        registry.add(&paths, callback)
    }

    /// Ambient declarations for the current mapping, relative to `file`.
    pub fn declarations(&self, file: &Path) -> String {
        render_declarations(&self.mapping.load().declarations, file)
    }

    /// Every file under the root that `transform` would consider.
    pub fn candidate_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        let root = &self.mapping.config().root;
        traverse(root, self.mapping.filter(), |file| files.push(file.to_path_buf()));
        files
    }

    pub fn config(&self) -> &Config {
        self.mapping.config()
    }

    pub fn snapshot(&self) -> Arc<MappingSnapshot> {
        self.mapping.load()
    }

    pub fn options(&self) -> &TransformOptions {
        &self.options
    }
}
