//! Defaults shared by the configuration normalizer, the path filter and the
//! transformer.

/// Files considered for transformation when `include` is not configured.
pub const DEFAULT_INCLUDE: &[&str] = &["**/*.svelte"];

/// Always excluded, on top of the user's `exclude` list.
pub const BUILTIN_EXCLUDES: &[&str] =
    &["**/node_modules/**", "**/.git/**", "**/.svelte-kit/**", "**/.svelte/**"];

/// Component file extensions when no preprocessor config is available.
pub const DEFAULT_COMPONENT_EXTENSIONS: &[&str] = &[".svelte"];

/// Extensions handled as plain script modules rather than components.
pub const SCRIPT_EXTENSIONS: &[&str] = &[
    "ts",  // TypeScript
    "tsx", // TypeScript with JSX
    "mts", // TypeScript module
    "cts", // TypeScript CommonJS
    "js",  // JavaScript
    "jsx", // JavaScript with JSX
    "mjs", // JavaScript module
    "cjs", // JavaScript CommonJS
];
