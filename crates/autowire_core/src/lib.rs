//! Import mapping for autowired Svelte projects.
//!
//! This crate turns a user configuration into a table of symbols that can be
//! used without an explicit import, including:
//! - Normalizing the user configuration (defaults, absolute paths)
//! - Filtering paths with include/exclude globs
//! - Walking component directories
//! - Deriving component names from file paths
//! - Rendering import statements and ambient type declarations per consumer

mod config;
mod constants;
mod declarations;
mod error;
mod filter;
mod mapping;
mod naming;
mod traverse;
mod types;

// Re-export public API
pub use config::{
    ComponentEntry, ComponentOptions, OneOrMany, UserConfig, find_project_root, load_user_config,
    normalize_config,
};
pub use constants::{BUILTIN_EXCLUDES, DEFAULT_COMPONENT_EXTENSIONS, DEFAULT_INCLUDE, SCRIPT_EXTENSIONS};
pub use declarations::render_declarations;
pub use error::{AutowireError, Result};
pub use filter::PathFilter;
pub use mapping::{
    DeclarationEntry, DeclarationSource, ImportMapping, ImportSource, MappingSnapshot,
    SymbolEntry, TypeDeclarationMapping, create_mapping, relative_import_path,
};
pub use naming::{ResolvedName, is_binding_name, is_identifier, resolve, to_pascal_case};
pub use traverse::traverse;
pub use types::{ComponentSource, Config, ImportSpec, NamingStrategy};
