use log::{debug, info, trace, warn};
use std::{
    collections::BTreeMap,
    path::{Component, Path, PathBuf},
};

use crate::filter::{PathFilter, to_forward_slashes};
use crate::naming::resolve;
use crate::traverse::traverse;
use crate::types::{Config, ImportSpec};

/// Where a symbol is imported from. Rendered per consumer file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportSource {
    /// A component file, imported by its default export.
    Component { path: PathBuf },
    /// A binding of a package or module path, used verbatim.
    Module { module: String, spec: ImportSpec },
    /// Import text supplied by the user.
    Literal { text: String },
}

impl ImportSource {
    /// Import statement binding `local` for a file at `consumer`.
    pub fn render(&self, consumer: &Path, local: &str) -> String {
        match self {
            ImportSource::Component { path } => {
                format!("import {} from '{}'", local, relative_import_path(consumer, path))
            }
            ImportSource::Module { module, spec: ImportSpec::Named { name, .. } } => {
                format!("import {{ {} as {} }} from '{}'", name, local, module)
            }
            ImportSource::Module { module, spec: ImportSpec::Namespace { .. } } => {
                format!("import * as {} from '{}'", local, module)
            }
            ImportSource::Literal { text } => text.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolEntry {
    pub namespaces: Vec<String>,
    pub source: ImportSource,
}

/// Ambient type declaration for one symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclarationSource {
    Component { path: PathBuf },
    Module { module: String, spec: ImportSpec },
}

impl DeclarationSource {
    pub fn render(&self, consumer: &Path, symbol: &str) -> String {
        match self {
            DeclarationSource::Component { path } => format!(
                "declare const {}: typeof import(\"{}\")[\"default\"];",
                symbol,
                relative_import_path(consumer, path)
            ),
            DeclarationSource::Module { module, spec: ImportSpec::Named { name, .. } } => {
                format!("declare const {}: typeof import(\"{}\")[\"{}\"];", symbol, module, name)
            }
            DeclarationSource::Module { module, spec: ImportSpec::Namespace { .. } } => {
                format!("declare const {}: typeof import(\"{}\");", symbol, module)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationEntry {
    pub namespaces: Vec<String>,
    pub source: DeclarationSource,
}

pub type ImportMapping = BTreeMap<String, SymbolEntry>;
pub type TypeDeclarationMapping = BTreeMap<String, DeclarationEntry>;

/// One complete result of a mapping build. Never mutated after creation.
#[derive(Debug, Clone, Default)]
pub struct MappingSnapshot {
    pub imports: ImportMapping,
    pub declarations: TypeDeclarationMapping,
    /// Component directories whose contents the snapshot depends on.
    pub watch_paths: Vec<PathBuf>,
}

/// Scans the component directories and registers module and literal
/// bindings. Later registrations replace earlier ones with the same key:
/// components, then modules, then the literal mapping.
pub fn create_mapping(config: &Config, filter: &PathFilter) -> MappingSnapshot {
    debug!("Building import mapping");
    let mut snapshot = MappingSnapshot::default();

    for component in &config.components {
        let root = &component.directory;
        snapshot.watch_paths.push(root.clone());
        traverse(root, filter, |file| {
            let resolved = match resolve(
                root,
                file,
                component.naming_strategy,
                &component.namespace,
                &component.prefix,
            ) {
                Ok(resolved) => resolved,
                Err(e) => {
                    warn!("Skipping component {}: {}", file.display(), e);
                    return;
                }
            };

            let path = file.to_path_buf();
            let previous = snapshot.imports.insert(
                resolved.name.clone(),
                SymbolEntry {
                    namespaces: resolved.namespaces.clone(),
                    source: ImportSource::Component { path: path.clone() },
                },
            );
            if let Some(previous) = previous {
                debug!("'{}' now refers to {} ({:?} replaced)", resolved.name, file.display(), previous.source);
            }
            snapshot.declarations.insert(
                resolved.name,
                DeclarationEntry {
                    namespaces: resolved.namespaces,
                    source: DeclarationSource::Component { path },
                },
            );
        });
    }

    for (module, specs) in &config.module {
        for spec in specs {
            let key = spec.key().to_string();
            trace!("Registering '{}' from module '{}'", key, module);
            snapshot.imports.insert(
                key.clone(),
                SymbolEntry {
                    namespaces: Vec::new(),
                    source: ImportSource::Module { module: module.clone(), spec: spec.clone() },
                },
            );
            snapshot.declarations.insert(
                key,
                DeclarationEntry {
                    namespaces: Vec::new(),
                    source: DeclarationSource::Module { module: module.clone(), spec: spec.clone() },
                },
            );
        }
    }

    for (key, text) in &config.mapping {
        trace!("Registering literal mapping for '{}'", key);
        snapshot.imports.insert(
            key.clone(),
            SymbolEntry {
                namespaces: Vec::new(),
                source: ImportSource::Literal { text: text.clone() },
            },
        );
        snapshot.declarations.remove(key);
    }

    info!("Import mapping has {} symbols", snapshot.imports.len());
    snapshot
}

/// Path of `target` as seen from the directory of `consumer`, in import
/// specifier form: forward slashes, `./`-prefixed unless it starts with `.`.
pub fn relative_import_path(consumer: &Path, target: &Path) -> String {
    let base = consumer.parent().unwrap_or(consumer);
    let relative = match make_relative(target, base) {
        Some(rel) => to_forward_slashes(&rel),
        None => to_forward_slashes(target),
    };
    if relative.starts_with('.') || relative.starts_with('/') {
        relative
    } else {
        format!("./{}", relative)
    }
}

/// Create a relative path from `base` to `target`
fn make_relative(target: &Path, base: &Path) -> Option<PathBuf> {
    let mut target_components = target.components().peekable();
    let mut base_components = base.components().peekable();

    // Different roots (e.g. Windows drives) cannot be related.
    if target_components.peek() != base_components.peek() {
        return None;
    }

    // Skip the common prefix
    while let (Some(t), Some(b)) = (target_components.peek(), base_components.peek()) {
        if t != b {
            break;
        }
        target_components.next();
        base_components.next();
    }

    // "../" for each remaining base component, then the rest of the target
    let mut result = PathBuf::new();
    for component in base_components {
        match component {
            Component::Normal(_) | Component::ParentDir => result.push(".."),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    for component in target_components {
        match component {
            Component::Normal(p) => result.push(p),
            Component::ParentDir => result.push(".."),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }

    if result.as_os_str().is_empty() { Some(PathBuf::from(".")) } else { Some(result) }
}
