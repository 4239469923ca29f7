//! Import injection for Svelte components and script modules.
//!
//! Given a file's source text and an import mapping, this crate finds the
//! mapped symbols the file uses without importing them and inserts the
//! missing import statements. Insertion is a text splice: everything outside
//! the inserted lines is left byte-for-byte intact.

mod markup;
mod parser;
mod sfc;
mod transformer;

// Re-export public API
pub use parser::{ScriptAnalysis, analyze_script, component_source_type, source_type_for};
pub use sfc::{ScriptBlock, SfcBlocks, split_component};
pub use transformer::{TransformOptions, Transformed, transform};
