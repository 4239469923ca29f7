use std::{
    io::{self, Write},
    path::Path,
};

use autowire_core::{ImportSource, MappingSnapshot};
use autowire_plugin::WatchEvent;
use colored::Colorize;
use log::trace;

use crate::commands::Rewrite;

/// `path` relative to the project root with forward slashes, or the full
/// path when it lies outside.
pub fn display_path(root: &Path, path: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(relative) => relative.to_string_lossy().replace('\\', "/"),
        Err(_) => {
            trace!("{} is outside {}", path.display(), root.display());
            path.display().to_string()
        }
    }
}

pub fn print_rewrites<W: Write>(
    out: &mut W,
    root: &Path,
    rewrites: &[Rewrite],
    written: bool,
) -> io::Result<()> {
    if rewrites.is_empty() {
        return writeln!(out, "{} No missing imports.", "✓".green());
    }

    let verb = if written { "Updated" } else { "Missing imports in" };
    writeln!(
        out,
        "{} {} {} {}:",
        if written { "✓".green() } else { "✗".red() },
        verb,
        rewrites.len().to_string().cyan(),
        if rewrites.len() == 1 { "file" } else { "files" }
    )?;
    for rewrite in rewrites {
        writeln!(out, "  {}", display_path(root, &rewrite.path).bold())?;
    }
    Ok(())
}

pub fn print_mapping<W: Write>(out: &mut W, root: &Path, snapshot: &MappingSnapshot) -> io::Result<()> {
    if snapshot.imports.is_empty() {
        return writeln!(out, "{} No symbols configured.", "●".bright_blue());
    }

    let width = snapshot.imports.keys().map(String::len).max().unwrap_or(0);
    for (symbol, entry) in &snapshot.imports {
        let source = match &entry.source {
            ImportSource::Component { path } => display_path(root, path).normal(),
            ImportSource::Module { module, spec } => format!("{} ({})", module, spec).normal(),
            ImportSource::Literal { text } => text.dimmed(),
        };
        writeln!(out, "{:width$}  {}", symbol.cyan(), source, width = width)?;
    }
    writeln!(
        out,
        "\n{} {} symbols from {} component directories.",
        "●".bright_blue(),
        snapshot.imports.len().to_string().cyan(),
        snapshot.watch_paths.len().to_string().cyan()
    )
}

pub fn print_watch_event(root: &Path, event: &WatchEvent) {
    let (marker, path) = match event {
        WatchEvent::Add(path) => ("+".green(), path),
        WatchEvent::Unlink(path) => ("-".red(), path),
    };
    println!("{} {}", marker, display_path(root, path));
}
