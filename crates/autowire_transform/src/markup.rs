//! Reference discovery in component markup.
//!
//! Markup is not parsed into a tree. Component tags and directive targets
//! are recognized by name, and every `{...}` tag is rewritten into a small
//! script fragment that the script analyzer can parse. Items come out in
//! source order so block bindings can be scoped to their blocks.

use std::ops::Range;
use std::path::Path;

use autowire_core::{AutowireError, Result};
use log::trace;

/// Directives whose target is a value in scope: `use:action`,
/// `transition:fade`, `in:fly`, `out:slide`, `animate:flip`.
const VALUE_DIRECTIVES: &[&str] = &["use", "transition", "in", "out", "animate"];

/// Where a `{...}` tag sits in the block structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockEdge {
    /// `{#if}`, `{#each}`, `{#await}`, `{#key}`, `{#snippet}`
    Open,
    /// `{:else}`, `{:else if}`, `{:then}`, `{:catch}`
    Branch,
    /// `{/if}`, `{/each}` and the like
    Close,
    Inline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupItem {
    /// First segment of a component tag (`<Button>`, `<UI.Input>`) or the
    /// target of a value directive.
    Reference(String),
    /// Name introduced by a `let:` directive.
    LetBinding(String),
    /// A `{...}` tag. Block bindings (`each` items, `then` values, snippet
    /// parameters) are the parameters of the fragment's first function.
    Expression { code: Option<String>, edge: BlockEdge },
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MarkupScan {
    pub items: Vec<MarkupItem>,
}

pub fn scan_markup(source: &str, ranges: &[Range<usize>], path: &Path) -> Result<MarkupScan> {
    let mut scan = MarkupScan::default();
    for range in ranges {
        scan_range(&source[range.clone()], range.start, path, &mut scan)?;
    }
    trace!("Markup of {}: {} items", path.display(), scan.items.len());
    Ok(scan)
}

fn scan_range(text: &str, offset: usize, path: &Path, scan: &mut MarkupScan) -> Result<()> {
    let bytes = text.as_bytes();
    let mut in_tag = false;
    let mut quote: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == q {
                quote = None;
            }
            if b != b'{' {
                i += 1;
                continue;
            }
        }
        match b {
            b'{' => {
                let end = matching_brace(bytes, i).ok_or_else(|| AutowireError::Parse {
                    path: path.to_path_buf(),
                    message: format!("unclosed '{{' at byte {}", offset + i),
                })?;
                let (code, edge) = fragment_for(text[i + 1..end].trim());
                scan.items.push(MarkupItem::Expression { code, edge });
                i = end + 1;
            }
            b'<' if !in_tag => {
                let name = read_while(&text[i + 1..], |c| {
                    c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '.' | ':' | '-')
                });
                if is_component_tag(name) {
                    let head = name.split('.').next().unwrap_or(name);
                    scan.items.push(MarkupItem::Reference(head.to_string()));
                }
                in_tag = !name.is_empty();
                i += 1 + name.len();
            }
            b'>' if in_tag => {
                in_tag = false;
                i += 1;
            }
            b'"' | b'\'' if in_tag => {
                quote = Some(b);
                i += 1;
            }
            _ if in_tag && i > 0 && bytes[i - 1].is_ascii_whitespace() && !b.is_ascii_whitespace() => {
                let attr = read_while(&text[i..], |c| {
                    !c.is_whitespace() && !matches!(c, '=' | '>' | '/' | '{' | '"' | '\'')
                });
                if let Some(item) = attribute_item(attr) {
                    scan.items.push(item);
                }
                i += attr.len().max(1);
            }
            _ => i += 1,
        }
    }
    Ok(())
}

fn attribute_item(attr: &str) -> Option<MarkupItem> {
    let (directive, target) = attr.split_once(':')?;
    let name = read_while(target, |c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$'));
    if name.is_empty() {
        return None;
    }
    match directive {
        "let" => Some(MarkupItem::LetBinding(name.to_string())),
        d if VALUE_DIRECTIVES.contains(&d) => Some(MarkupItem::Reference(name.to_string())),
        _ => None,
    }
}

fn is_component_tag(name: &str) -> bool {
    if name.is_empty() || name.contains(':') || name.contains('-') {
        return false;
    }
    name.starts_with(|c: char| c.is_ascii_uppercase()) || name.contains('.')
}

fn read_while(text: &str, accept: impl Fn(char) -> bool) -> &str {
    let end = text.find(|c: char| !accept(c)).unwrap_or(text.len());
    &text[..end]
}

/// Index of the `}` closing the `{` at `open`, skipping string literals.
pub(crate) fn matching_brace(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            q @ (b'"' | b'\'' | b'`') => {
                i += 1;
                while i < bytes.len() && bytes[i] != q {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Script fragment equivalent to the contents of one `{...}` tag, with its
/// place in the block structure.
fn fragment_for(inner: &str) -> (Option<String>, BlockEdge) {
    let expression = |e: &str| (!e.trim().is_empty()).then(|| format!("({});", e.trim()));
    // Bindings become parameters so that they stay local to the block.
    let scoped = |params: &str, body: &str| format!("(function ({}) {{{}}});", params.trim(), body);

    if let Some(rest) = inner.strip_prefix('#') {
        let (keyword, body) = split_keyword(rest);
        let code = match keyword {
            "if" | "key" => expression(body),
            "each" => match body.split_once(" as ") {
                Some((items, item)) => {
                    let (item, key) = split_each_key(item);
                    let key = key.and_then(expression).unwrap_or_default();
                    Some(format!("{}{}", scoped(item, &key), expression(items).unwrap_or_default()))
                }
                None => expression(body),
            },
            "await" => {
                match body.split_once(" then ").or_else(|| body.split_once(" catch ")) {
                    Some((promise, value)) => Some(format!(
                        "{}{}",
                        scoped(value, ""),
                        expression(promise).unwrap_or_default()
                    )),
                    None => expression(body.trim().trim_end_matches(" then").trim_end_matches(" catch")),
                }
            }
            "snippet" => Some(format!("function {} {{}}", body.trim())),
            _ => None,
        };
        return (code, BlockEdge::Open);
    }
    if let Some(rest) = inner.strip_prefix(':') {
        let (keyword, body) = split_keyword(rest);
        let code = match keyword {
            "else" => body.trim().strip_prefix("if ").and_then(expression),
            "then" | "catch" => Some(scoped(body, "")),
            _ => None,
        };
        return (code, BlockEdge::Branch);
    }
    if inner.starts_with('/') {
        return (None, BlockEdge::Close);
    }
    if let Some(rest) = inner.strip_prefix('@') {
        let (keyword, body) = split_keyword(rest);
        let code = match keyword {
            "html" | "debug" | "render" | "attach" => expression(body),
            "const" => Some(format!("const {};", body.trim())),
            _ => None,
        };
        return (code, BlockEdge::Inline);
    }
    (expression(inner.strip_prefix("...").unwrap_or(inner)), BlockEdge::Inline)
}

fn split_keyword(rest: &str) -> (&str, &str) {
    let keyword = read_while(rest, |c| c.is_ascii_alphabetic());
    (keyword, &rest[keyword.len()..])
}

/// `item, i (item.id)` -> (`item, i`, Some(`item.id`))
fn split_each_key(item: &str) -> (&str, Option<&str>) {
    let item = item.trim();
    match (item.ends_with(')'), item.rfind(" (")) {
        (true, Some(idx)) => (&item[..idx], Some(&item[idx + 2..item.len() - 1])),
        _ => (item, None),
    }
}
