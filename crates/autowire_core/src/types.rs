use serde::{Deserialize, Serialize};
use indexmap::IndexMap;
use std::{collections::BTreeMap, fmt, path::PathBuf};

use crate::error::{AutowireError, Result};
use crate::naming::{is_binding_name, is_identifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamingStrategy {
    /// Only the file's base name contributes to the symbol.
    Flat,
    /// Every directory below the component root contributes a segment.
    #[default]
    Namespaced,
}

/// One root directory scanned for components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentSource {
    pub directory: PathBuf,
    pub naming_strategy: NamingStrategy,
    pub namespace: String,
    pub prefix: String,
}

/// A single entry of a `module` binding list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportSpec {
    /// `name` or `name as alias`
    Named { name: String, alias: Option<String> },
    /// `* as alias`
    Namespace { alias: String },
}

impl ImportSpec {
    /// Parses `name`, `name as alias` or `* as alias`.
    pub fn parse(raw: &str) -> Result<Self> {
        let parts: Vec<&str> = raw.split_whitespace().collect();
        let spec = match parts.as_slice() {
            ["*", "as", alias] => ImportSpec::Namespace { alias: alias.to_string() },
            [name, "as", alias] => {
                ImportSpec::Named { name: name.to_string(), alias: Some(alias.to_string()) }
            }
            [name] if *name != "*" => ImportSpec::Named { name: name.to_string(), alias: None },
            _ => {
                return Err(AutowireError::config(format!(
                    "unsupported module import '{}', expected 'name', 'name as alias' or '* as alias'",
                    raw.trim()
                )));
            }
        };

        if let ImportSpec::Named { name, .. } = &spec
            && !is_identifier(name)
        {
            return Err(AutowireError::config(format!("'{}' is not a valid export name", name)));
        }
        let key = spec.key();
        if !is_binding_name(key) {
            return Err(AutowireError::config(format!(
                "'{}' cannot be used as a local binding name",
                key
            )));
        }
        Ok(spec)
    }

    /// The symbol under which this spec is registered.
    pub fn key(&self) -> &str {
        match self {
            ImportSpec::Named { name, alias } => alias.as_deref().unwrap_or(name),
            ImportSpec::Namespace { alias } => alias,
        }
    }
}

impl fmt::Display for ImportSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportSpec::Named { name, alias: Some(alias) } => write!(f, "{} as {}", name, alias),
            ImportSpec::Named { name, alias: None } => write!(f, "{}", name),
            ImportSpec::Namespace { alias } => write!(f, "* as {}", alias),
        }
    }
}

/// Fully normalized configuration. Built once by [`crate::normalize_config`].
#[derive(Debug, Clone)]
pub struct Config {
    pub root: PathBuf,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub components: Vec<ComponentSource>,
    /// In configuration order; later modules win on a shared key.
    pub module: IndexMap<String, Vec<ImportSpec>>,
    pub mapping: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_named_spec() {
        let spec = ImportSpec::parse("debounce").unwrap();
        assert_eq!(spec, ImportSpec::Named { name: "debounce".into(), alias: None });
        assert_eq!(spec.key(), "debounce");
    }

    #[test]
    fn test_parse_aliased_spec() {
        let spec = ImportSpec::parse("debounce  as  db").unwrap();
        assert_eq!(spec.key(), "db");
        assert_eq!(spec.to_string(), "debounce as db");
    }

    #[test]
    fn test_parse_namespace_spec() {
        let spec = ImportSpec::parse("* as _").unwrap();
        assert_eq!(spec, ImportSpec::Namespace { alias: "_".into() });
        assert_eq!(spec.key(), "_");
    }

    #[test]
    fn test_bare_star_is_rejected() {
        assert!(matches!(ImportSpec::parse("*"), Err(AutowireError::Configuration(_))));
    }

    #[test]
    fn test_malformed_specs_are_rejected() {
        assert!(ImportSpec::parse("").is_err());
        assert!(ImportSpec::parse("a as").is_err());
        assert!(ImportSpec::parse("a b c d").is_err());
        assert!(ImportSpec::parse("foo as 1bar").is_err());
    }
}
