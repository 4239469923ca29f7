//! Splits a Svelte component into its top-level blocks.
//!
//! Only the outer structure is recovered: `<script>` blocks (with their
//! attributes and byte ranges), `<style>` blocks and HTML comments are cut
//! out, and everything else is markup.

use std::ops::Range;

use autowire_core::{AutowireError, Result};

use crate::markup::matching_brace;
use log::trace;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptBlock {
    /// Byte range of the opening `<script ...>` tag.
    pub open_tag: Range<usize>,
    /// Byte range between the opening and closing tags.
    pub content: Range<usize>,
    pub attrs: Vec<(String, Option<String>)>,
}

impl ScriptBlock {
    fn attr(&self, name: &str) -> Option<Option<&str>> {
        self.attrs
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_deref())
    }

    /// `<script context="module">` (Svelte 4) or `<script module>` (Svelte 5).
    pub fn is_module(&self) -> bool {
        matches!(self.attr("context"), Some(Some("module"))) || self.attr("module").is_some()
    }

    pub fn is_typescript(&self) -> bool {
        matches!(self.attr("lang"), Some(Some("ts" | "typescript")))
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SfcBlocks {
    pub instance: Option<ScriptBlock>,
    pub module: Option<ScriptBlock>,
    pub markup: Vec<Range<usize>>,
}

impl SfcBlocks {
    pub fn scripts(&self) -> impl Iterator<Item = &ScriptBlock> {
        self.module.iter().chain(self.instance.iter())
    }

    pub fn is_typescript(&self) -> bool {
        self.scripts().any(ScriptBlock::is_typescript)
    }
}

/// Splits `source` into its top-level script blocks and markup.
///
/// Only `<script>` elements at the top level are instance or module
/// scripts. A `<script>` or `<style>` nested in another element (such as
/// `<svelte:head>`) is raw text: it is neither a block nor markup.
pub fn split_component(source: &str, path: &Path) -> Result<SfcBlocks> {
    let bytes = source.as_bytes();
    let mut blocks = SfcBlocks::default();
    let mut open_elements: Vec<String> = Vec::new();
    let mut markup_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' => {
                // Unbalanced braces are reported by the markup scanner.
                i = matching_brace(bytes, i).map(|end| end + 1).unwrap_or(i + 1);
                continue;
            }
            b'<' => {}
            _ => {
                i += 1;
                continue;
            }
        }
        let rest = &source[i..];
        if rest.starts_with("<!--") {
            let end = rest.find("-->").map(|e| i + e + 3).unwrap_or(bytes.len());
            push_markup(&mut blocks, markup_start..i);
            markup_start = end;
            i = end;
        } else if let Some(name) = raw_text_tag(rest) {
            push_markup(&mut blocks, markup_start..i);
            let open_end = find_tag_end(source, i)
                .ok_or_else(|| parse_error(path, format!("unterminated <{}> tag", name)))?;
            let close = format!("</{}", name);
            let close_start = find_ignore_case(source, open_end, &close)
                .ok_or_else(|| parse_error(path, format!("missing </{}>", name)))?;
            let close_end = source[close_start..]
                .find('>')
                .map(|e| close_start + e + 1)
                .ok_or_else(|| parse_error(path, format!("unterminated </{}>", name)))?;

            if name == "script" && open_elements.is_empty() {
                let block = ScriptBlock {
                    attrs: parse_attrs(&source[i + 1 + name.len()..open_end - 1]),
                    open_tag: i..open_end,
                    content: open_end..close_start,
                };
                trace!("Found <script> block at {:?} in {}", block.content, path.display());
                let slot = if block.is_module() { &mut blocks.module } else { &mut blocks.instance };
                if slot.is_some() {
                    return Err(parse_error(
                        path,
                        "a component can only have one instance and one module script",
                    ));
                }
                *slot = Some(block);
            } else if !open_elements.is_empty() {
                trace!("Skipping <{}> nested in <{}>", name, open_elements.join("> <"));
            }
            markup_start = close_end;
            i = close_end;
        } else if let Some(name) = rest.strip_prefix("</").map(tag_name).filter(|n| !n.is_empty()) {
            if let Some(depth) = open_elements.iter().rposition(|open| open == name) {
                open_elements.truncate(depth);
            }
            i = find_tag_end(source, i).unwrap_or(bytes.len());
        } else if let Some(name) = Some(tag_name(&rest[1..])).filter(|n| !n.is_empty()) {
            let end = find_tag_end(source, i).unwrap_or(bytes.len());
            let self_closing = source[..end].trim_end_matches('>').ends_with('/');
            if !self_closing && !is_void_element(name) {
                open_elements.push(name.to_string());
            }
            i = end;
        } else {
            i += 1;
        }
    }
    push_markup(&mut blocks, markup_start..bytes.len());
    Ok(blocks)
}

/// Element name at the start of `text`, empty when `text` does not start one.
fn tag_name(text: &str) -> &str {
    if !text.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return "";
    }
    let end = text
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, ':' | '-' | '.' | '_')))
        .unwrap_or(text.len());
    &text[..end]
}

fn is_void_element(name: &str) -> bool {
    const VOID: &[&str] = &[
        "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
        "source", "track", "wbr",
    ];
    VOID.iter().any(|v| v.eq_ignore_ascii_case(name))
}

fn push_markup(blocks: &mut SfcBlocks, range: Range<usize>) {
    if !range.is_empty() {
        blocks.markup.push(range);
    }
}

fn raw_text_tag(rest: &str) -> Option<&'static str> {
    ["script", "style"].into_iter().find(|name| {
        let after = 1 + name.len();
        rest.len() > after
            && rest.as_bytes()[1..after].eq_ignore_ascii_case(name.as_bytes())
            && matches!(rest.as_bytes()[after], b'>' | b' ' | b'\t' | b'\n' | b'\r' | b'/')
    })
}

/// Index just past the `>` closing the tag that starts at `start`. Quoted
/// attribute values and `{...}` expressions may contain `>`.
fn find_tag_end(source: &str, start: usize) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = start;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if b == b'{' => {
                i = matching_brace(bytes, i)?;
            }
            None if b == b'>' => return Some(i + 1),
            None => {}
        }
        i += 1;
    }
    None
}

fn find_ignore_case(source: &str, from: usize, needle: &str) -> Option<usize> {
    let haystack = source.as_bytes();
    let needle = needle.as_bytes();
    (from..=haystack.len().checked_sub(needle.len())?)
        .find(|&i| haystack[i..i + needle.len()].eq_ignore_ascii_case(needle))
}

fn parse_attrs(raw: &str) -> Vec<(String, Option<String>)> {
    let raw = raw.trim_end_matches('/');
    let mut attrs = Vec::new();
    let mut chars = raw.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        let mut end = start;
        while let Some(&(idx, c)) = chars.peek() {
            if c.is_whitespace() || c == '=' {
                break;
            }
            end = idx + c.len_utf8();
            chars.next();
        }
        let name = raw[start..end].to_string();

        let mut value = None;
        if let Some(&(_, '=')) = chars.peek() {
            chars.next();
            match chars.peek().copied() {
                Some((q_idx, q @ ('"' | '\''))) => {
                    chars.next();
                    let mut v_end = raw.len();
                    for (idx, c) in chars.by_ref() {
                        if c == q {
                            v_end = idx;
                            break;
                        }
                    }
                    value = Some(raw[q_idx + 1..v_end].to_string());
                }
                Some((v_start, _)) => {
                    let mut v_end = raw.len();
                    while let Some(&(idx, c)) = chars.peek() {
                        if c.is_whitespace() {
                            v_end = idx;
                            break;
                        }
                        chars.next();
                    }
                    value = Some(raw[v_start..v_end].to_string());
                }
                None => {}
            }
        }
        if !name.is_empty() {
            attrs.push((name, value));
        }
    }
    attrs
}

fn parse_error(path: &Path, message: impl Into<String>) -> AutowireError {
    AutowireError::Parse { path: path.to_path_buf(), message: message.into() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(source: &str) -> SfcBlocks {
        split_component(source, Path::new("/p/App.svelte")).unwrap()
    }

    #[test]
    fn test_instance_and_module_scripts() {
        let source = "<script context=\"module\">export const x = 1;</script>\n<script lang=\"ts\">let y = 2;</script>\n<h1>{y}</h1>";
        let blocks = split(source);
        let module = blocks.module.as_ref().unwrap();
        let instance = blocks.instance.as_ref().unwrap();
        assert_eq!(&source[module.content.clone()], "export const x = 1;");
        assert_eq!(&source[instance.content.clone()], "let y = 2;");
        assert_eq!(&source[instance.open_tag.clone()], "<script lang=\"ts\">");
        assert!(instance.is_typescript());
        assert!(!module.is_typescript());
        assert!(blocks.is_typescript());
        let markup: String = blocks.markup.iter().map(|r| &source[r.clone()]).collect();
        assert_eq!(markup, "\n\n<h1>{y}</h1>");
    }

    #[test]
    fn test_svelte5_module_attribute() {
        let blocks = split("<script module>export const a = 1;</script>");
        assert!(blocks.module.is_some());
        assert!(blocks.instance.is_none());
    }

    #[test]
    fn test_style_and_comments_are_not_markup() {
        let source = "<!-- <Hidden/> --><div/><style>.a { color: red }</style>";
        let blocks = split(source);
        let markup: Vec<&str> = blocks.markup.iter().map(|r| &source[r.clone()]).collect();
        assert_eq!(markup, vec!["<div/>"]);
    }

    #[test]
    fn test_markup_only() {
        let source = "<Button>hi</Button>";
        let blocks = split(source);
        assert!(blocks.instance.is_none());
        assert_eq!(blocks.markup, vec![0..source.len()]);
    }

    #[test]
    fn test_quoted_gt_in_attribute() {
        let source = "<script data-x=\"a>b\">let a;</script>";
        let blocks = split(source);
        let instance = blocks.instance.unwrap();
        assert_eq!(&source[instance.content], "let a;");
    }

    #[test]
    fn test_unclosed_script_is_parse_error() {
        let err = split_component("<script>let a;", Path::new("/p/Bad.svelte")).unwrap_err();
        assert!(matches!(err, AutowireError::Parse { .. }));
    }

    #[test]
    fn test_duplicate_instance_script() {
        let err = split_component("<script></script><script></script>", Path::new("/p/Bad.svelte"))
            .unwrap_err();
        assert!(matches!(err, AutowireError::Parse { .. }));
    }

    #[test]
    fn test_script_in_svelte_head_is_not_a_block() {
        let source = "<svelte:head><script type=\"application/ld+json\">{\"a\": 1}</script></svelte:head>\n<script>let x = 1;</script>\n<Button/>";
        let blocks = split(source);
        let instance = blocks.instance.as_ref().unwrap();
        assert_eq!(&source[instance.content.clone()], "let x = 1;");
        assert!(blocks.module.is_none());
        let markup: String = blocks.markup.iter().map(|r| &source[r.clone()]).collect();
        assert_eq!(markup, "<svelte:head></svelte:head>\n\n<Button/>");
    }

    #[test]
    fn test_nested_script_without_instance() {
        let source = "<svelte:head><script src=\"/analytics.js\"></script></svelte:head>\n<Button/>";
        let blocks = split(source);
        assert!(blocks.instance.is_none());
        assert!(blocks.module.is_none());
    }

    #[test]
    fn test_script_inside_elements() {
        let source = "<div><img src=\"a.png\"><br/><p>{a > b}</p><script>x()</script></div><script>let y;</script>";
        let blocks = split(source);
        let instance = blocks.instance.unwrap();
        assert_eq!(&source[instance.content], "let y;");
    }

    #[test]
    fn test_arrow_in_attribute_does_not_end_tag() {
        let source = "<Button on:click={() => count > 1}><script>nested()</script></Button><script>let a;</script>";
        let blocks = split(source);
        assert_eq!(&source[blocks.instance.unwrap().content], "let a;");
    }

    #[test]
    fn test_scriptish_tag_names_are_markup() {
        let blocks = split("<scripts>text</scripts>");
        assert!(blocks.instance.is_none());
        assert_eq!(blocks.markup.len(), 1);
    }
}
