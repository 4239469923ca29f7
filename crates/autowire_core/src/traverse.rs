use ignore::WalkBuilder;
use log::{debug, trace, warn};
use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use crate::filter::PathFilter;

/// Walks `root` depth-first and calls `visit` for every file accepted by
/// `filter`. Returns the number of visited files.
///
/// Directories are always descended; only files are filtered. Symlinks are
/// followed, and a file reachable through several links is visited once.
pub fn traverse(root: &Path, filter: &PathFilter, mut visit: impl FnMut(&Path)) -> usize {
    if !root.is_dir() {
        warn!("Component directory {} does not exist, skipping", root.display());
        return 0;
    }
    debug!("Walking directory tree from root: {}", root.display());

    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(true)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut visited = 0;
    for res in walker {
        let dent = match res {
            Ok(dent) => dent,
            Err(e) => {
                // Symlink loops and unreadable entries surface here.
                warn!("Skipping entry under {}: {}", root.display(), e);
                continue;
            }
        };
        let p = dent.path();
        if !p.is_file() {
            continue;
        }
        if !filter.matches(p) {
            trace!("Filtered out: {}", p.display());
            continue;
        }

        let real = p.canonicalize().unwrap_or_else(|_| p.to_path_buf());
        if !seen.insert(real) {
            trace!("Already visited through another link: {}", p.display());
            continue;
        }

        trace!("Visiting file: {}", p.display());
        visit(p);
        visited += 1;
    }
    debug!("Visited {} files under {}", visited, root.display());
    visited
}
