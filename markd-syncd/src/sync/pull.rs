use std::path::{Path, PathBuf};

use markd_core::{FileNode, FolderNode, MarkdClient, MarkdError, RemoteNode};
use thiserror::Error;

use super::header;
use super::paths::{document_path_for, folder_path_for};

#[derive(Debug, Error)]
pub enum PullError {
    #[error("failed to fetch document tree: {0}")]
    Tree(#[from] MarkdError),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PullSummary {
    pub files_written: usize,
    pub folders_created: usize,
    pub content_fallbacks: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Reconciles the remote tree onto the local document root.
#[derive(Clone)]
pub struct PullEngine {
    client: MarkdClient,
    workspace_id: String,
    docs_root: PathBuf,
}

impl PullEngine {
    pub fn new(client: MarkdClient, workspace_id: impl Into<String>, docs_root: PathBuf) -> Self {
        Self {
            client,
            workspace_id: workspace_id.into(),
            docs_root,
        }
    }

    /// Fetches the whole workspace tree and mirrors it under the document
    /// root. Nothing is written when the tree itself cannot be fetched.
    pub async fn pull_workspace(&self) -> Result<PullSummary, PullError> {
        let tree = self.client.fetch_tree(&self.workspace_id).await?;
        Ok(self.reconcile(&tree, &self.docs_root).await)
    }

    /// Depth-first walk over `nodes`, keeping sibling order. Failures are
    /// contained to the node they happen on.
    pub async fn reconcile(&self, nodes: &[RemoteNode], dir: &Path) -> PullSummary {
        let mut summary = PullSummary::default();
        let mut stack: Vec<(&RemoteNode, PathBuf)> = nodes
            .iter()
            .rev()
            .map(|node| (node, dir.to_path_buf()))
            .collect();

        while let Some((node, parent_dir)) = stack.pop() {
            match node {
                RemoteNode::File(file) => self.pull_file(file, &parent_dir, &mut summary).await,
                RemoteNode::Folder(folder) => {
                    let Some(folder_dir) = prepare_folder(folder, &parent_dir, &mut summary).await
                    else {
                        continue;
                    };
                    stack.extend(
                        folder
                            .children
                            .iter()
                            .rev()
                            .map(|child| (child, folder_dir.clone())),
                    );
                }
                RemoteNode::Unsupported => {
                    tracing::debug!("skipping remote node of unsupported type");
                    summary.skipped += 1;
                }
            }
        }
        summary
    }

    async fn pull_file(&self, file: &FileNode, dir: &Path, summary: &mut PullSummary) {
        let target = match document_path_for(dir, &file.name) {
            Ok(target) => target,
            Err(err) => {
                tracing::warn!("skipping remote file {}: {err}", file.id);
                summary.skipped += 1;
                return;
            }
        };

        let body = match self.client.fetch_content(&file.id).await {
            Ok(body) => body,
            Err(err) => {
                tracing::warn!("content fetch for {} failed, writing empty body: {err}", file.id);
                summary.content_fallbacks += 1;
                String::new()
            }
        };
        let content = header::inject(&body, &file.id, &file.name, file.parent_id.as_deref());

        match tokio::fs::write(&target, content).await {
            Ok(()) => {
                tracing::info!("pulled {}", target.display());
                summary.files_written += 1;
            }
            Err(err) => {
                tracing::error!("failed to write {}: {err}", target.display());
                summary.failed += 1;
            }
        }
    }
}

async fn prepare_folder(
    folder: &FolderNode,
    dir: &Path,
    summary: &mut PullSummary,
) -> Option<PathBuf> {
    let target = match folder_path_for(dir, &folder.name) {
        Ok(target) => target,
        Err(err) => {
            tracing::warn!("skipping remote folder {}: {err}", folder.id);
            summary.skipped += 1;
            return None;
        }
    };
    match tokio::fs::create_dir_all(&target).await {
        Ok(()) => {
            summary.folders_created += 1;
            Some(target)
        }
        Err(err) => {
            tracing::error!("failed to create {}: {err}", target.display());
            summary.failed += 1;
            None
        }
    }
}
