//! File watching for component directories.

use log::{debug, trace, warn};
use notify::{
    Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
    event::{ModifyKind, RenameMode},
};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use autowire_core::{AutowireError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Add(PathBuf),
    Unlink(PathBuf),
}

impl WatchEvent {
    pub fn path(&self) -> &Path {
        match self {
            WatchEvent::Add(path) | WatchEvent::Unlink(path) => path,
        }
    }
}

pub type WatchCallback = Arc<dyn Fn(WatchEvent) + Send + Sync>;

/// The host's file watcher, as far as this plugin needs it.
pub trait WatchRegistry {
    /// Watches each path recursively and reports file additions and
    /// removals to `callback`. Content changes are not reported.
    fn add(&mut self, paths: &[PathBuf], callback: WatchCallback) -> Result<()>;
}

/// A [`WatchRegistry`] backed by the platform's native file events.
#[derive(Default)]
pub struct DirectoryWatcher {
    watchers: Vec<RecommendedWatcher>,
}

impl DirectoryWatcher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WatchRegistry for DirectoryWatcher {
    fn add(&mut self, paths: &[PathBuf], callback: WatchCallback) -> Result<()> {
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                for watch_event in classify(&event) {
                    trace!("{:?}", watch_event);
                    callback(watch_event);
                }
            }
            Err(e) => warn!("File watcher error: {}", e),
        })
        .map_err(|e| watch_error(paths.first().map(PathBuf::as_path).unwrap_or(Path::new("")), e))?;

        for path in paths {
            if !path.exists() {
                warn!("Not watching {}: directory does not exist", path.display());
                continue;
            }
            watcher.watch(path, RecursiveMode::Recursive).map_err(|e| watch_error(path, e))?;
            debug!("Watching {}", path.display());
        }
        self.watchers.push(watcher);
        Ok(())
    }
}

fn watch_error(path: &Path, e: notify::Error) -> AutowireError {
    AutowireError::Watch { path: path.to_path_buf(), message: e.to_string() }
}

/// Maps a native event onto additions and removals. Renames are reported
/// by whether each path still exists afterwards.
pub fn classify(event: &Event) -> Vec<WatchEvent> {
    match event.kind {
        EventKind::Create(_) => event.paths.iter().cloned().map(WatchEvent::Add).collect(),
        EventKind::Remove(_) => event.paths.iter().cloned().map(WatchEvent::Unlink).collect(),
        EventKind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::From => event.paths.iter().cloned().map(WatchEvent::Unlink).collect(),
            RenameMode::To => event.paths.iter().cloned().map(WatchEvent::Add).collect(),
            RenameMode::Both if event.paths.len() == 2 => vec![
                WatchEvent::Unlink(event.paths[0].clone()),
                WatchEvent::Add(event.paths[1].clone()),
            ],
            _ => event
                .paths
                .iter()
                .map(|p| if p.exists() { WatchEvent::Add(p.clone()) } else { WatchEvent::Unlink(p.clone()) })
                .collect(),
        },
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, RemoveKind};
    use tempfile::TempDir;

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        paths.iter().fold(Event::new(kind), |e, p| e.add_path(PathBuf::from(p)))
    }

    #[test]
    fn test_create_is_add() {
        let events = classify(&event(EventKind::Create(CreateKind::File), &["/p/lib/A.svelte"]));
        assert_eq!(events, vec![WatchEvent::Add(PathBuf::from("/p/lib/A.svelte"))]);
    }

    #[test]
    fn test_remove_is_unlink() {
        let events = classify(&event(EventKind::Remove(RemoveKind::Any), &["/p/lib/A.svelte"]));
        assert_eq!(events, vec![WatchEvent::Unlink(PathBuf::from("/p/lib/A.svelte"))]);
    }

    #[test]
    fn test_content_change_is_ignored() {
        let kind = EventKind::Modify(ModifyKind::Data(DataChange::Content));
        assert!(classify(&event(kind, &["/p/lib/A.svelte"])).is_empty());
        assert!(classify(&event(EventKind::Access(notify::event::AccessKind::Any), &["/x"])).is_empty());
    }

    #[test]
    fn test_rename_both() {
        let kind = EventKind::Modify(ModifyKind::Name(RenameMode::Both));
        let events = classify(&event(kind, &["/p/lib/A.svelte", "/p/lib/B.svelte"]));
        assert_eq!(
            events,
            vec![
                WatchEvent::Unlink(PathBuf::from("/p/lib/A.svelte")),
                WatchEvent::Add(PathBuf::from("/p/lib/B.svelte")),
            ]
        );
    }

    #[test]
    fn test_unknown_rename_uses_existence() {
        let temp_dir = TempDir::new().unwrap();
        let present = temp_dir.path().join("Present.svelte");
        std::fs::write(&present, "").unwrap();
        let missing = temp_dir.path().join("Missing.svelte");

        let kind = EventKind::Modify(ModifyKind::Name(RenameMode::Any));
        let e = Event::new(kind).add_path(present.clone()).add_path(missing.clone());
        assert_eq!(classify(&e), vec![WatchEvent::Add(present), WatchEvent::Unlink(missing)]);
    }
}
