//! Build-tool integration for autowire.
//!
//! This crate exposes the hooks a dev server or bundler calls:
//! - Plugin ordering checks against the Svelte compiler plugin
//! - Reading component extensions from `svelte.config.*`
//! - Transforming files against the current import mapping
//! - Rebuilding the mapping when component files come and go

mod ordering;
mod plugin;
mod preprocessor;
mod snapshot;
mod watch;

// Re-export public API
pub use ordering::{PLUGIN_NAME, SVELTE_PLUGIN_NAME, enforce_plugin_ordering};
pub use plugin::AutowirePlugin;
pub use preprocessor::{ConfigLoader, PreprocessorConfig, SvelteConfigLoader, resolve_preprocessor};
pub use snapshot::SharedMapping;
pub use watch::{DirectoryWatcher, WatchCallback, WatchEvent, WatchRegistry, classify};
