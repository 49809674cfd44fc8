use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use markd_core::MarkdClient;
use tokio_util::task::TaskTracker;

use crate::config::SyncConfig;
use crate::sync::debounce::DebounceScheduler;
use crate::sync::local_watcher::{LocalEvent, start_notify_watcher};
use crate::sync::pull::{PullEngine, PullSummary};
use crate::sync::push::{PushEngine, PushOutcome};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// One authenticated sync session over a document root.
pub struct SyncRuntime {
    config: SyncConfig,
    push: Arc<PushEngine>,
    pull: PullEngine,
}

impl SyncRuntime {
    /// Logs in and prepares the document root. Any failure here is fatal.
    pub async fn bootstrap(config: SyncConfig) -> anyhow::Result<Self> {
        let client = MarkdClient::connect(&config.api_url, &config.credential)
            .await
            .context("authentication failed")?;
        match client.session().username() {
            Some(username) => tracing::info!("authenticated as {username}"),
            None => tracing::info!("using provided session token"),
        }

        if !tokio::fs::try_exists(&config.docs_root).await.unwrap_or(false) {
            tracing::warn!(
                "docs directory does not exist, creating {}",
                config.docs_root.display()
            );
        }
        tokio::fs::create_dir_all(&config.docs_root)
            .await
            .with_context(|| format!("failed to create docs root at {:?}", config.docs_root))?;

        tracing::info!(
            "workspace={}, docs_root={}",
            config.workspace_id,
            config.docs_root.display()
        );
        Ok(Self::with_client(config, client))
    }

    pub fn with_client(config: SyncConfig, client: MarkdClient) -> Self {
        let push = Arc::new(PushEngine::new(client.clone(), config.workspace_id.clone()));
        let pull = PullEngine::new(
            client,
            config.workspace_id.clone(),
            config.docs_root.clone(),
        );
        Self { config, push, pull }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub async fn push_once(&self, path: &Path) -> Option<PushOutcome> {
        self.push.push_and_report(path).await
    }

    pub async fn pull_once(&self) -> anyhow::Result<PullSummary> {
        tracing::info!("pulling documents");
        let summary = self
            .pull
            .pull_workspace()
            .await
            .context("pull failed")?;
        tracing::info!(
            "pull finished: files={}, folders={}, skipped={}, failed={}",
            summary.files_written,
            summary.folders_created,
            summary.skipped,
            summary.failed
        );
        Ok(summary)
    }

    /// Default mode: optional initial pull, then watch until Ctrl-C when
    /// watching is enabled.
    pub async fn run(self) -> anyhow::Result<()> {
        if self.config.auto_pull {
            self.pull_once().await?;
        }
        if self.config.watch_enabled {
            self.watch(shutdown_signal()).await?;
        }
        Ok(())
    }

    /// Pushes debounced local changes until `shutdown` completes.
    pub async fn watch<F>(&self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()>,
    {
        let (watcher, mut local_rx) = start_notify_watcher(&self.config.docs_root)
            .with_context(|| format!("failed to watch {:?}", self.config.docs_root))?;
        let (scheduler, mut intents) = DebounceScheduler::new(self.config.debounce);
        let pushes = TaskTracker::new();
        tracing::info!(
            "watching {} for changes (debounce {:?})",
            self.config.docs_root.display(),
            scheduler.debounce()
        );

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                Some(event) = local_rx.recv() => match event {
                    LocalEvent::Changed { path } => {
                        tracing::debug!("local change: {}", path.display());
                        scheduler.observe(path);
                    }
                },
                Some(path) = intents.recv() => {
                    let push = Arc::clone(&self.push);
                    pushes.spawn(async move {
                        push.push_and_report(&path).await;
                    });
                }
            }
        }

        drop(watcher);
        scheduler.shutdown();
        pushes.close();
        if tokio::time::timeout(SHUTDOWN_GRACE, pushes.wait())
            .await
            .is_err()
        {
            tracing::warn!("abandoning {} in-flight pushes", pushes.len());
        }
        tracing::info!("stopped watching");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed waiting for shutdown signal: {err}");
    }
}

#[cfg(test)]
#[path = "daemon_tests.rs"]
mod tests;
