use std::path::{Path, PathBuf};

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use super::paths::is_document;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalEvent {
    Changed { path: PathBuf },
}

/// Watches `root` recursively. The watcher stops delivering events once
/// the returned handle is dropped.
pub fn start_notify_watcher(
    root: &Path,
) -> notify::Result<(RecommendedWatcher, mpsc::UnboundedReceiver<LocalEvent>)> {
    let (tx, rx) = mpsc::unbounded_channel();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            for local in map_event(event) {
                let _ = tx.send(local);
            }
        }
        Err(err) => tracing::warn!("file watcher error: {err}"),
    })?;
    watcher.watch(root, RecursiveMode::Recursive)?;
    Ok((watcher, rx))
}

fn map_event(event: Event) -> Vec<LocalEvent> {
    match event.kind {
        EventKind::Modify(ModifyKind::Name(_)) => Vec::new(),
        EventKind::Create(_) | EventKind::Modify(_) => event
            .paths
            .into_iter()
            .filter(|path| is_document(path) && !path.is_dir())
            .map(|path| LocalEvent::Changed { path })
            .collect(),
        _ => Vec::new(),
    }
}
