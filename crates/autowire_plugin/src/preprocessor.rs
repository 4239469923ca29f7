//! Optional Svelte preprocessor configuration.
//!
//! The only setting the transformer needs is the list of component
//! extensions. It is read statically from `svelte.config.*`; the file is
//! never executed.

use log::{debug, trace, warn};
use oxc_allocator::Allocator;
use oxc_ast::ast::*;
use oxc_ast_visit::{Visit, walk};
use oxc_parser::{Parser as OxcParser, ParserReturn};
use oxc_span::SourceType;
use std::{
    fs,
    path::{Path, PathBuf},
};

use autowire_core::{AutowireError, DEFAULT_COMPONENT_EXTENSIONS, Result};

const CONFIG_FILES: &[&str] =
    &["svelte.config.js", "svelte.config.mjs", "svelte.config.cjs", "svelte.config.ts"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreprocessorConfig {
    pub extensions: Vec<String>,
}

impl Default for PreprocessorConfig {
    fn default() -> Self {
        PreprocessorConfig {
            extensions: DEFAULT_COMPONENT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Source of an optional user-supplied preprocessor configuration.
pub trait ConfigLoader {
    /// `Ok(None)` when no configuration exists under `root`.
    fn try_load(&self, root: &Path) -> Result<Option<PreprocessorConfig>>;
}

/// Loads the configuration, falling back to the defaults with a warning
/// when it is missing or unreadable.
pub fn resolve_preprocessor(loader: &dyn ConfigLoader, root: &Path) -> PreprocessorConfig {
    match loader.try_load(root) {
        Ok(Some(config)) => {
            debug!("Using component extensions {:?}", config.extensions);
            config
        }
        Ok(None) => {
            warn!("No svelte.config found under {}, using defaults", root.display());
            PreprocessorConfig::default()
        }
        Err(e) => {
            warn!("{}; using defaults", e);
            PreprocessorConfig::default()
        }
    }
}

/// Reads `extensions` from the first `svelte.config.*` in the root.
#[derive(Debug, Default, Clone, Copy)]
pub struct SvelteConfigLoader;

impl ConfigLoader for SvelteConfigLoader {
    fn try_load(&self, root: &Path) -> Result<Option<PreprocessorConfig>> {
        let Some(path) = CONFIG_FILES.iter().map(|f| root.join(f)).find(|p| p.is_file()) else {
            return Ok(None);
        };
        trace!("Reading preprocessor config from {}", path.display());
        let src = fs::read_to_string(&path).map_err(|e| resolution_error(&path, e.to_string()))?;

        let st = SourceType::default()
            .with_module(!path.extension().is_some_and(|e| e == "cjs"))
            .with_typescript(path.extension().is_some_and(|e| e == "ts"));
        let allocator = Allocator::default();
        let ParserReturn { program, errors, panicked, .. } =
            OxcParser::new(&allocator, &src, st).parse();
        if panicked || !errors.is_empty() {
            let message = errors.first().map(|e| e.to_string()).unwrap_or_default();
            return Err(resolution_error(&path, message));
        }

        let mut finder = ExtensionsFinder::default();
        finder.visit_program(&program);
        let config = match finder.extensions {
            Some(extensions) if !extensions.is_empty() => PreprocessorConfig { extensions },
            _ => PreprocessorConfig::default(),
        };
        debug!("Loaded preprocessor config from {}: {:?}", path.display(), config);
        Ok(Some(config))
    }
}

fn resolution_error(path: &Path, message: String) -> AutowireError {
    AutowireError::PreprocessorResolution { path: PathBuf::from(path), message }
}

#[derive(Default)]
struct ExtensionsFinder {
    extensions: Option<Vec<String>>,
}

impl<'a> Visit<'a> for ExtensionsFinder {
    fn visit_object_property(&mut self, it: &ObjectProperty<'a>) {
        let is_extensions = match &it.key {
            PropertyKey::StaticIdentifier(id) => id.name == "extensions",
            PropertyKey::StringLiteral(s) => s.value == "extensions",
            _ => false,
        };
        if is_extensions
            && self.extensions.is_none()
            && let Expression::ArrayExpression(array) = &it.value
        {
            let extensions = array
                .elements
                .iter()
                .filter_map(|elem| match elem.as_expression() {
                    Some(Expression::StringLiteral(sl)) => Some(sl.value.to_string()),
                    _ => None,
                })
                .collect();
            self.extensions = Some(extensions);
        }
        walk::walk_object_property(self, it);
    }
}
