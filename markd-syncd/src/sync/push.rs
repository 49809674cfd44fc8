use std::path::{Path, PathBuf};

use markd_core::{ApiErrorClass, MarkdClient, MarkdError};
use thiserror::Error;

use super::header;
use super::paths::document_name;

#[derive(Debug, Error)]
pub enum PushError {
    #[error("failed to access {path:?}: {source}")]
    LocalIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("api error: {0}")]
    Remote(#[from] MarkdError),
}

impl PushError {
    /// Class of the API failure, if the remote rejected the request.
    pub fn classification(&self) -> Option<ApiErrorClass> {
        match self {
            PushError::Remote(err) => err.classification(),
            PushError::LocalIo { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    Created { remote_id: String },
    Updated { remote_id: String },
}

/// Propagates a single local document to the remote workspace.
#[derive(Clone)]
pub struct PushEngine {
    client: MarkdClient,
    workspace_id: String,
}

impl PushEngine {
    pub fn new(client: MarkdClient, workspace_id: impl Into<String>) -> Self {
        Self {
            client,
            workspace_id: workspace_id.into(),
        }
    }

    /// Creates the remote document when the file carries no identity yet,
    /// otherwise updates the document it is bound to.
    pub async fn push_file(&self, path: &Path) -> Result<PushOutcome, PushError> {
        let content = read_document(path).await?;
        let meta = header::extract(&content);
        let name = meta
            .display_name
            .clone()
            .unwrap_or_else(|| document_name(path));
        let body = header::strip(&content);

        match meta.remote_id {
            Some(remote_id) => {
                self.client
                    .update_document(&remote_id, body, &name)
                    .await?;
                Ok(PushOutcome::Updated { remote_id })
            }
            None => {
                let parent = meta.parent_remote_id.as_deref();
                let remote_id = self
                    .client
                    .create_document(&name, body, parent, &self.workspace_id)
                    .await?;
                // Re-read so edits made while the create was in flight survive.
                let current = read_document(path).await?;
                let bound = header::inject(&current, &remote_id, &name, parent);
                tokio::fs::write(path, bound)
                    .await
                    .map_err(|source| PushError::LocalIo {
                        path: path.to_path_buf(),
                        source,
                    })?;
                Ok(PushOutcome::Created { remote_id })
            }
        }
    }

    /// Like [`push_file`](Self::push_file), but reports failures instead of
    /// returning them.
    pub async fn push_and_report(&self, path: &Path) -> Option<PushOutcome> {
        let file = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        match self.push_file(path).await {
            Ok(PushOutcome::Created { remote_id }) => {
                tracing::info!("created and pushed {file} -> {remote_id}");
                Some(PushOutcome::Created { remote_id })
            }
            Ok(PushOutcome::Updated { remote_id }) => {
                tracing::info!("pushed {file} -> {remote_id}");
                Some(PushOutcome::Updated { remote_id })
            }
            Err(err) => {
                tracing::error!(
                    class = ?err.classification(),
                    "error pushing {}: {err}",
                    path.display()
                );
                None
            }
        }
    }
}

async fn read_document(path: &Path) -> Result<String, PushError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| PushError::LocalIo {
            path: path.to_path_buf(),
            source,
        })
}
