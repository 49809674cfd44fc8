//! Coalesces bursts of file events into one push per quiet period.
//!
//! Every observed event overwrites the path's `observed_at` and arms a
//! timer. A timer only emits a push intent when the path has been quiet for
//! the full window; superseded timers find a newer timestamp and do nothing.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

type PendingChanges = Arc<Mutex<HashMap<PathBuf, Instant>>>;

pub struct DebounceScheduler {
    debounce: Duration,
    pending: PendingChanges,
    intents: mpsc::UnboundedSender<PathBuf>,
    cancel: CancellationToken,
}

impl DebounceScheduler {
    /// Returns the scheduler and the receiving end of its push intents.
    pub fn new(debounce: Duration) -> (Self, mpsc::UnboundedReceiver<PathBuf>) {
        let (intents, rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            debounce,
            pending: Arc::new(Mutex::new(HashMap::new())),
            intents,
            cancel: CancellationToken::new(),
        };
        (scheduler, rx)
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Records a change for `path` and arms a timer for it.
    pub fn observe(&self, path: PathBuf) {
        if self.cancel.is_cancelled() {
            return;
        }
        let observed_at = Instant::now();
        lock(&self.pending).insert(path.clone(), observed_at);

        let pending = Arc::clone(&self.pending);
        let intents = self.intents.clone();
        let cancel = self.cancel.clone();
        let debounce = self.debounce;
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep_until(observed_at + debounce) => {
                    fire(&pending, path, debounce, &intents);
                }
            }
        });
    }

    pub fn pending_len(&self) -> usize {
        lock(&self.pending).len()
    }

    /// Abandons every armed timer. Later events are ignored.
    pub fn shutdown(&self) {
        self.cancel.cancel();
        lock(&self.pending).clear();
    }
}

fn fire(
    pending: &PendingChanges,
    path: PathBuf,
    debounce: Duration,
    intents: &mpsc::UnboundedSender<PathBuf>,
) {
    {
        let mut pending = lock(pending);
        let Some(observed_at) = pending.get(&path).copied() else {
            return;
        };
        if Instant::now().saturating_duration_since(observed_at) < debounce {
            return;
        }
        pending.remove(&path);
    }
    tracing::debug!(path = %path.display(), "debounce window elapsed");
    let _ = intents.send(path);
}

fn lock(pending: &PendingChanges) -> MutexGuard<'_, HashMap<PathBuf, Instant>> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}
