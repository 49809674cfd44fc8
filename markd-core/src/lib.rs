mod auth;
mod client;

pub use auth::{AuthError, Credential, SESSION_COOKIE, Session};
pub use client::{ApiErrorClass, FileNode, FolderNode, MarkdClient, MarkdError, RemoteNode};
