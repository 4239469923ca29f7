use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use log::{debug, trace};
use std::path::{Path, PathBuf};

use crate::constants::BUILTIN_EXCLUDES;
use crate::error::{AutowireError, Result};

/// Include/exclude matcher for candidate and component files.
#[derive(Debug, Clone)]
pub struct PathFilter {
    root: PathBuf,
    include: GlobSet,
    include_all: bool,
    exclude: GlobSet,
}

impl PathFilter {
    /// Builds a filter; the built-in excludes are always appended.
    ///
    /// Relative patterns are anchored at `root`; patterns starting with `**`
    /// or `/` are used as written.
    pub fn new(root: &Path, include: &[String], exclude: &[String]) -> Result<Self> {
        let builtin: Vec<String> = BUILTIN_EXCLUDES.iter().map(|s| s.to_string()).collect();
        debug!(
            "Building path filter with {} include and {} exclude patterns",
            include.len(),
            exclude.len() + builtin.len()
        );
        Ok(PathFilter {
            root: root.to_path_buf(),
            include: build_globset(root, include)?,
            include_all: include.is_empty(),
            exclude: build_globset(root, exclude.iter().chain(builtin.iter()))?,
        })
    }

    pub fn matches(&self, path: &Path) -> bool {
        let absolute = if path.is_absolute() { path.to_path_buf() } else { self.root.join(path) };
        let normalized = to_forward_slashes(&absolute);
        let included = self.include_all || self.include.is_match(&normalized);
        let excluded = self.exclude.is_match(&normalized);
        trace!("Filter {}: included={} excluded={}", normalized, included, excluded);
        included && !excluded
    }
}

fn build_globset<'a>(
    root: &Path,
    patterns: impl IntoIterator<Item = &'a String>,
) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let anchored = anchor_pattern(root, pattern);
        builder.add(compile(&anchored)?);
    }
    builder.build().map_err(|e| AutowireError::config(format!("invalid glob set: {}", e)))
}

fn anchor_pattern(root: &Path, pattern: &str) -> String {
    let pattern = pattern.trim_start_matches("./");
    if pattern.starts_with("**") || pattern.starts_with('/') {
        pattern.to_string()
    } else {
        format!("{}/{}", to_forward_slashes(root).trim_end_matches('/'), pattern)
    }
}

fn compile(pattern: &str) -> Result<Glob> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|e| AutowireError::config(format!("invalid glob '{}': {}", pattern, e)))
}

pub(crate) fn to_forward_slashes(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_default_svelte_include() {
        let filter = PathFilter::new(Path::new("/p"), &strings(&["**/*.svelte"]), &[]).unwrap();
        assert!(filter.matches(Path::new("/p/src/routes/+page.svelte")));
        assert!(filter.matches(Path::new("/p/App.svelte")));
        assert!(!filter.matches(Path::new("/p/src/app.ts")));
    }

    #[test]
    fn test_builtin_excludes() {
        let filter = PathFilter::new(Path::new("/p"), &strings(&["**/*.svelte"]), &[]).unwrap();
        assert!(!filter.matches(Path::new("/p/node_modules/lib/Button.svelte")));
        assert!(!filter.matches(Path::new("/p/.svelte-kit/generated/root.svelte")));
    }

    #[test]
    fn test_relative_patterns_are_anchored_at_root() {
        let filter = PathFilter::new(
            Path::new("/p"),
            &strings(&["src/**/*.svelte"]),
            &strings(&["src/legacy/**"]),
        )
        .unwrap();
        assert!(filter.matches(Path::new("/p/src/lib/Button.svelte")));
        assert!(!filter.matches(Path::new("/p/other/Button.svelte")));
        assert!(!filter.matches(Path::new("/p/src/legacy/Old.svelte")));
        assert!(filter.matches(Path::new("src/lib/Card.svelte")));
    }

    #[test]
    fn test_empty_include_matches_everything() {
        let filter = PathFilter::new(Path::new("/p"), &[], &[]).unwrap();
        assert!(filter.matches(Path::new("/p/a/b/c.txt")));
        assert!(!filter.matches(Path::new("/p/.git/HEAD")));
    }

    #[test]
    fn test_invalid_glob() {
        let err = PathFilter::new(Path::new("/p"), &strings(&["src/[abc"]), &[]).unwrap_err();
        assert!(matches!(err, AutowireError::Configuration(_)));
    }
}
