use log::trace;
use std::path::{Component, Path};

use crate::error::{AutowireError, Result};
use crate::types::NamingStrategy;

const RESERVED_WORDS: &[&str] = &[
    "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default",
    "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for", "function",
    "if", "import", "in", "instanceof", "let", "new", "null", "return", "static", "super",
    "switch", "this", "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

/// The symbol a component file is registered under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedName {
    pub name: String,
    /// Grouping used by generated type declarations. Empty for flat names.
    pub namespaces: Vec<String>,
}

/// Computes the symbol for `file` below `root` according to `strategy`.
///
/// `prefix` is prepended under both strategies; `namespace` only applies to
/// namespaced naming, where it becomes the leading segment.
pub fn resolve(
    root: &Path,
    file: &Path,
    strategy: NamingStrategy,
    namespace: &str,
    prefix: &str,
) -> Result<ResolvedName> {
    let relative = file.strip_prefix(root).map_err(|_| {
        AutowireError::config(format!(
            "{} is not inside component directory {}",
            file.display(),
            root.display()
        ))
    })?;

    let base = file
        .file_stem()
        .and_then(|n| n.to_str())
        .ok_or_else(|| AutowireError::InvalidName { path: file.to_path_buf() })?;

    let mut name = to_pascal_case(prefix);
    let mut namespaces = Vec::new();

    if strategy == NamingStrategy::Namespaced {
        let namespace = to_pascal_case(namespace);
        if !namespace.is_empty() {
            namespaces.push(namespace);
        }
        if let Some(parent) = relative.parent() {
            for component in parent.components() {
                if let Component::Normal(segment) = component {
                    let segment = to_pascal_case(&segment.to_string_lossy());
                    if !segment.is_empty() {
                        namespaces.push(segment);
                    }
                }
            }
        }
        name.extend(namespaces.iter().map(String::as_str));
    }

    name.push_str(&to_pascal_case(base));

    if name.is_empty() {
        return Err(AutowireError::InvalidName { path: file.to_path_buf() });
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }

    trace!("Resolved {} to '{}' ({:?})", file.display(), name, namespaces);
    Ok(ResolvedName { name, namespaces })
}

/// `my-button` -> `MyButton`, `forms` -> `Forms`, `+page` -> `Page`.
///
/// Non-alphanumeric characters separate words; only the first character of
/// each word changes case.
pub fn to_pascal_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for word in raw.split(|c: char| !c.is_alphanumeric()) {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

/// Syntactic identifier check (ASCII subset of the ECMAScript grammar plus
/// any alphabetic code point).
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// An identifier usable as a local binding.
pub fn is_binding_name(s: &str) -> bool {
    is_identifier(s) && !RESERVED_WORDS.contains(&s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn names(root: &str, file: &str, strategy: NamingStrategy, namespace: &str) -> ResolvedName {
        resolve(Path::new(root), Path::new(file), strategy, namespace, "").unwrap()
    }

    #[test]
    fn test_flat_ignores_directories() {
        let r = names("/p/src/lib", "/p/src/lib/forms/deep/Button.svelte", NamingStrategy::Flat, "UI");
        assert_eq!(r.name, "Button");
        assert!(r.namespaces.is_empty());
    }

    #[test]
    fn test_namespaced_with_namespace() {
        let r = names("/p/src/lib", "/p/src/lib/forms/Input.svelte", NamingStrategy::Namespaced, "UI");
        assert_eq!(r.name, "UIFormsInput");
        assert_eq!(r.namespaces, vec!["UI".to_string(), "Forms".to_string()]);
    }

    #[test]
    fn test_namespaced_at_root_level() {
        let r = names("/p/src/lib", "/p/src/lib/Button.svelte", NamingStrategy::Namespaced, "");
        assert_eq!(r.name, "Button");
        assert!(r.namespaces.is_empty());
    }

    #[test]
    fn test_kebab_case_segments() {
        let r = names(
            "/p/lib",
            "/p/lib/date-pickers/range_picker.svelte",
            NamingStrategy::Namespaced,
            "",
        );
        assert_eq!(r.name, "DatePickersRangePicker");
    }

    #[test]
    fn test_prefix_applies_to_both_strategies() {
        let root = Path::new("/p/lib");
        let file = Path::new("/p/lib/icons/arrow.svelte");
        let flat = resolve(root, file, NamingStrategy::Flat, "", "app").unwrap();
        assert_eq!(flat.name, "AppArrow");
        let namespaced = resolve(root, file, NamingStrategy::Namespaced, "", "app").unwrap();
        assert_eq!(namespaced.name, "AppIconsArrow");
    }

    #[test]
    fn test_leading_digit_is_escaped() {
        let r = names("/p/lib", "/p/lib/404.svelte", NamingStrategy::Flat, "");
        assert_eq!(r.name, "_404");
        assert!(is_identifier(&r.name));
    }

    #[test]
    fn test_file_outside_root_is_configuration_error() {
        let err = resolve(
            Path::new("/p/lib"),
            Path::new("/p/routes/Page.svelte"),
            NamingStrategy::Flat,
            "",
            "",
        )
        .unwrap_err();
        assert!(matches!(err, AutowireError::Configuration(_)));
    }

    #[test]
    fn test_unnameable_file() {
        let err = resolve(
            Path::new("/p/lib"),
            Path::new("/p/lib/+.svelte"),
            NamingStrategy::Flat,
            "",
            "",
        )
        .unwrap_err();
        assert!(matches!(err, AutowireError::InvalidName { .. }));
    }

    #[test]
    fn test_resolution_is_deterministic_and_valid() {
        let root = PathBuf::from("/p/src/components");
        let files = [
            "/p/src/components/a/b/c-d.svelte",
            "/p/src/components/x.y.svelte",
            "/p/src/components/routes/+page.svelte",
            "/p/src/components/9lives/cat.svelte",
        ];
        for strategy in [NamingStrategy::Flat, NamingStrategy::Namespaced] {
            for file in files {
                let first = resolve(&root, Path::new(file), strategy, "ns", "").unwrap();
                let second = resolve(&root, Path::new(file), strategy, "ns", "").unwrap();
                assert_eq!(first, second);
                assert!(is_identifier(&first.name), "'{}' is not an identifier", first.name);
            }
        }
    }

    #[test]
    fn test_pascal_case() {
        assert_eq!(to_pascal_case("my-button"), "MyButton");
        assert_eq!(to_pascal_case("myButton"), "MyButton");
        assert_eq!(to_pascal_case("+page"), "Page");
        assert_eq!(to_pascal_case("x.y"), "XY");
        assert_eq!(to_pascal_case(""), "");
    }

    #[test]
    fn test_identifier_checks() {
        assert!(is_identifier("Button"));
        assert!(is_identifier("$store"));
        assert!(is_identifier("_"));
        assert!(!is_identifier("1a"));
        assert!(!is_identifier("a-b"));
        assert!(is_identifier("default"));
        assert!(!is_binding_name("default"));
    }
}
