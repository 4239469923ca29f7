use log::{debug, trace};
use std::{
    collections::{BTreeSet, HashSet},
    path::Path,
};

use autowire_core::{DEFAULT_COMPONENT_EXTENSIONS, ImportMapping, Result, SCRIPT_EXTENSIONS};

use crate::markup::{BlockEdge, MarkupItem, scan_markup};
use crate::parser::{ScriptAnalysis, analyze_script, component_source_type, source_type_for};
use crate::sfc::{SfcBlocks, split_component};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOptions {
    /// Extensions (with leading dot) of files parsed as components.
    pub component_extensions: Vec<String>,
}

impl Default for TransformOptions {
    fn default() -> Self {
        TransformOptions {
            component_extensions: DEFAULT_COMPONENT_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transformed {
    /// Nothing to import; the input stands as is.
    Unchanged,
    Changed {
        code: String,
        /// Symbols that received an import, in insertion order.
        added: Vec<String>,
    },
}

impl Transformed {
    pub fn is_changed(&self) -> bool {
        matches!(self, Transformed::Changed { .. })
    }

    /// The resulting text, borrowing the input when nothing changed.
    pub fn code<'s>(&'s self, original: &'s str) -> &'s str {
        match self {
            Transformed::Unchanged => original,
            Transformed::Changed { code, .. } => code,
        }
    }
}

enum SourceKind {
    Component,
    Script,
    Other,
}

/// Adds an import for every symbol of `mapping` that `source` uses without
/// importing or declaring it.
///
/// `consumer` is the absolute path of the file and decides the relative
/// paths of component imports.
pub fn transform(
    source: &str,
    consumer: &Path,
    mapping: &ImportMapping,
    options: &TransformOptions,
) -> Result<Transformed> {
    let kind = source_kind(consumer, options);
    let (analysis, blocks) = match kind {
        SourceKind::Component => {
            let blocks = split_component(source, consumer)?;
            (analyze_component(source, &blocks, consumer)?, Some(blocks))
        }
        SourceKind::Script => {
            let mut analysis = ScriptAnalysis::default();
            analyze_script(source, source_type_for(consumer), consumer, &mut analysis)?;
            (analysis, None)
        }
        SourceKind::Other => {
            trace!("Not a component or script, skipping: {}", consumer.display());
            return Ok(Transformed::Unchanged);
        }
    };

    let missing: BTreeSet<&str> = analysis
        .references
        .iter()
        .map(String::as_str)
        .filter(|name| mapping.contains_key(*name) && !analysis.is_bound(name))
        .collect();

    if missing.is_empty() {
        trace!("No missing imports in {}", consumer.display());
        return Ok(Transformed::Unchanged);
    }

    let statements: Vec<String> = missing
        .iter()
        .map(|name| terminate(mapping[*name].source.render(consumer, name)))
        .collect();
    let added: Vec<String> = missing.iter().map(|s| s.to_string()).collect();
    debug!("Adding {} imports to {}: {:?}", added.len(), consumer.display(), added);

    let code = match blocks {
        Some(blocks) => insert_into_component(source, &blocks, &statements),
        None => insert_into_script(source, &statements),
    };
    Ok(Transformed::Changed { code, added })
}

fn source_kind(path: &Path, options: &TransformOptions) -> SourceKind {
    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    if options.component_extensions.iter().any(|ext| file_name.ends_with(ext.as_str())) {
        return SourceKind::Component;
    }
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if SCRIPT_EXTENSIONS.contains(&ext) => SourceKind::Script,
        _ => SourceKind::Other,
    }
}

fn analyze_component(source: &str, blocks: &SfcBlocks, path: &Path) -> Result<ScriptAnalysis> {
    let mut analysis = ScriptAnalysis::default();
    for script in blocks.scripts() {
        let st = component_source_type(script.is_typescript());
        analyze_script(&source[script.content.clone()], st, path, &mut analysis)?;
    }

    let markup = scan_markup(source, &blocks.markup, path)?;
    let st = component_source_type(blocks.is_typescript());
    // Innermost last; the component level is never popped.
    let mut scopes: Vec<HashSet<String>> = vec![HashSet::new()];
    let bound = |scopes: &[HashSet<String>], name: &str| scopes.iter().any(|s| s.contains(name));

    for item in markup.items {
        match item {
            MarkupItem::Reference(name) => {
                if !bound(&scopes, &name) {
                    analysis.references.insert(name);
                }
            }
            MarkupItem::LetBinding(name) => {
                if let Some(scope) = scopes.last_mut() {
                    scope.insert(name);
                }
            }
            MarkupItem::Expression { code, edge } => {
                if matches!(edge, BlockEdge::Branch | BlockEdge::Close) && scopes.len() > 1 {
                    scopes.pop();
                }
                let Some(code) = code else {
                    if matches!(edge, BlockEdge::Open | BlockEdge::Branch) {
                        scopes.push(HashSet::new());
                    }
                    continue;
                };
                let mut fragment = ScriptAnalysis::default();
                analyze_script(&code, st, path, &mut fragment)?;
                for name in fragment.references {
                    if !bound(&scopes, &name) {
                        analysis.references.insert(name);
                    }
                }
                if let Some(scope) = scopes.last_mut() {
                    scope.extend(fragment.declared);
                }
                if matches!(edge, BlockEdge::Open | BlockEdge::Branch) {
                    scopes.push(fragment.parameters);
                }
            }
        }
    }
    trace!("Markup of {} left {} open blocks", path.display(), scopes.len() - 1);
    // Component-level markup bindings (`let:` on the root, top-level
    // `@const`, snippets) shadow the mapping everywhere.
    if let Some(root) = scopes.into_iter().next() {
        analysis.declared.extend(root);
    }
    Ok(analysis)
}

fn terminate(statement: String) -> String {
    let trimmed = statement.trim_end();
    if trimmed.ends_with(';') { trimmed.to_string() } else { format!("{};", trimmed) }
}

fn insert_into_component(source: &str, blocks: &SfcBlocks, statements: &[String]) -> String {
    let added: usize = statements.iter().map(|s| s.len() + 1).sum();
    let mut out = String::with_capacity(source.len() + added + 32);
    match &blocks.instance {
        Some(instance) => {
            let at = instance.content.start;
            out.push_str(&source[..at]);
            for statement in statements {
                out.push('\n');
                out.push_str(statement);
            }
            out.push_str(&source[at..]);
        }
        None => {
            out.push_str(if blocks.is_typescript() { "<script lang=\"ts\">\n" } else { "<script>\n" });
            for statement in statements {
                out.push_str(statement);
                out.push('\n');
            }
            out.push_str("</script>\n\n");
            out.push_str(source);
        }
    }
    out
}

fn insert_into_script(source: &str, statements: &[String]) -> String {
    let at = if source.starts_with("#!") {
        source.find('\n').map(|i| i + 1).unwrap_or(source.len())
    } else {
        0
    };
    let mut out = String::with_capacity(source.len() + 64 * statements.len());
    out.push_str(&source[..at]);
    if at == source.len() && at > 0 && !source.ends_with('\n') {
        out.push('\n');
    }
    for statement in statements {
        out.push_str(statement);
        out.push('\n');
    }
    out.push_str(&source[at..]);
    out
}
