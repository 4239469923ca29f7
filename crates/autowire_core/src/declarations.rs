use log::debug;
use std::{collections::BTreeMap, path::Path};

use crate::mapping::TypeDeclarationMapping;

const HEADER: &str = "// Generated by autowire. Do not edit.\n";

/// Ambient declaration file contents for editor tooling.
///
/// Paths are relative to `declaration_file`. Symbols are grouped by their
/// namespaces, each group under a `// A/B` comment.
pub fn render_declarations(declarations: &TypeDeclarationMapping, declaration_file: &Path) -> String {
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (symbol, entry) in declarations {
        groups
            .entry(entry.namespaces.join("/"))
            .or_default()
            .push(entry.source.render(declaration_file, symbol));
    }

    let mut out = String::from(HEADER);
    for (group, lines) in &groups {
        out.push('\n');
        if !group.is_empty() {
            out.push_str("// ");
            out.push_str(group);
            out.push('\n');
        }
        for line in lines {
            out.push_str(line);
            out.push('\n');
        }
    }
    debug!("Rendered {} declarations in {} groups", declarations.len(), groups.len());
    out
}
