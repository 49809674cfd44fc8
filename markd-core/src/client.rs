use reqwest::{Client, StatusCode};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use url::Url;

use crate::auth::{AuthError, Credential, Session};

#[derive(Debug, Error)]
pub enum MarkdError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("api returned {status}: {body}")]
    Api { status: StatusCode, body: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorClass {
    Auth,
    NotFound,
    Transient,
    Permanent,
}

/// Typed access to the MarkD document API.
///
/// Every request carries the session credential the client was built with.
#[derive(Clone)]
pub struct MarkdClient {
    http: Client,
    base_url: Url,
    session: Session,
}

impl MarkdClient {
    pub fn new(base_url: &str, session: Session) -> Result<Self, MarkdError> {
        Ok(Self {
            http: Client::new(),
            base_url: parse_base_url(base_url)?,
            session,
        })
    }

    /// Establishes a session for `credential` and returns a client bound to it.
    pub async fn connect(base_url: &str, credential: &Credential) -> Result<Self, AuthError> {
        let http = Client::new();
        let base_url = parse_base_url(base_url)?;
        let session = Session::establish(&http, &base_url, credential).await?;
        Ok(Self {
            http,
            base_url,
            session,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub async fn create_document(
        &self,
        name: &str,
        content: &str,
        parent_id: Option<&str>,
        workspace_id: &str,
    ) -> Result<String, MarkdError> {
        let url = self.endpoint("api/documents")?;
        let request = CreateDocumentRequest {
            name,
            kind: "file",
            content,
            parent_id,
            workspace_id,
        };
        let response = self
            .http
            .post(url)
            .header(reqwest::header::COOKIE, self.session.cookie_header())
            .json(&request)
            .send()
            .await?;
        let payload: DocumentEnvelope<CreatedDocument> = Self::handle_response(response).await?;
        Ok(payload.document.id)
    }

    pub async fn update_document(
        &self,
        remote_id: &str,
        content: &str,
        name: &str,
    ) -> Result<(), MarkdError> {
        let url = self.document_endpoint(remote_id)?;
        let response = self
            .http
            .put(url)
            .header(reqwest::header::COOKIE, self.session.cookie_header())
            .json(&UpdateDocumentRequest { content, name })
            .send()
            .await?;
        Self::ensure_success(response).await
    }

    pub async fn fetch_tree(&self, workspace_id: &str) -> Result<Vec<RemoteNode>, MarkdError> {
        let mut url = self.endpoint("api/documents/tree")?;
        url.query_pairs_mut()
            .append_pair("workspace_id", workspace_id);
        let response = self
            .http
            .get(url)
            .header(reqwest::header::COOKIE, self.session.cookie_header())
            .send()
            .await?;
        let payload: TreeResponse = Self::handle_response(response).await?;
        Ok(payload.tree)
    }

    /// Fetches a document body. A non-success status yields an empty body
    /// so a single unreadable node never aborts a tree pull.
    pub async fn fetch_content(&self, remote_id: &str) -> Result<String, MarkdError> {
        let url = self.document_endpoint(remote_id)?;
        let response = self
            .http
            .get(url)
            .header(reqwest::header::COOKIE, self.session.cookie_header())
            .send()
            .await?;
        if !response.status().is_success() {
            tracing::debug!(
                remote_id,
                status = %response.status(),
                "content fetch failed, using empty body"
            );
            return Ok(String::new());
        }
        let payload: DocumentEnvelope<DocumentContent> = response.json().await?;
        Ok(payload.document.content.unwrap_or_default())
    }

    fn endpoint(&self, path: &str) -> Result<Url, MarkdError> {
        Ok(self.base_url.join(path)?)
    }

    fn document_endpoint(&self, remote_id: &str) -> Result<Url, MarkdError> {
        let mut url = self.endpoint("api/documents")?;
        url.path_segments_mut()
            .map_err(|_| MarkdError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .push(remote_id);
        Ok(url)
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, MarkdError> {
        if response.status().is_success() {
            Ok(response.json::<T>().await?)
        } else {
            Err(Self::api_error(response).await)
        }
    }

    async fn ensure_success(response: reqwest::Response) -> Result<(), MarkdError> {
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::api_error(response).await)
        }
    }

    async fn api_error(response: reqwest::Response) -> MarkdError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        MarkdError::Api { status, body }
    }
}

/// Parses the API base url so that endpoint paths join below any prefix it
/// carries (`https://host/markd` serves `https://host/markd/api/...`).
pub(crate) fn parse_base_url(base_url: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(base_url)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

impl MarkdError {
    pub fn classification(&self) -> Option<ApiErrorClass> {
        match self {
            MarkdError::Api { status, .. } => Some(classify_api_status(*status)),
            _ => None,
        }
    }
}

fn classify_api_status(status: StatusCode) -> ApiErrorClass {
    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        ApiErrorClass::Auth
    } else if status == StatusCode::NOT_FOUND {
        ApiErrorClass::NotFound
    } else if status.is_server_error()
        || matches!(
            status,
            StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS
        )
    {
        ApiErrorClass::Transient
    } else {
        ApiErrorClass::Permanent
    }
}

/// A node of the remote document tree.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RemoteNode {
    File(FileNode),
    Folder(FolderNode),
    /// Node of a type this client does not sync.
    #[serde(other)]
    Unsupported,
}

impl RemoteNode {
    pub fn id(&self) -> Option<&str> {
        match self {
            RemoteNode::File(node) => Some(&node.id),
            RemoteNode::Folder(node) => Some(&node.id),
            RemoteNode::Unsupported => None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            RemoteNode::File(node) => Some(&node.name),
            RemoteNode::Folder(node) => Some(&node.name),
            RemoteNode::Unsupported => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct FileNode {
    #[serde(deserialize_with = "opaque_id")]
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "optional_opaque_id")]
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct FolderNode {
    #[serde(deserialize_with = "opaque_id")]
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "optional_opaque_id")]
    pub parent_id: Option<String>,
    #[serde(default, deserialize_with = "nullable_children")]
    pub children: Vec<RemoteNode>,
}

// Ids are opaque; the API may send them as strings or integers.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(text) => text,
            RawId::Number(number) => number.to_string(),
        }
    }
}

fn opaque_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    RawId::deserialize(deserializer).map(String::from)
}

fn optional_opaque_id<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(Option::<RawId>::deserialize(deserializer)?.map(String::from))
}

fn nullable_children<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<RemoteNode>, D::Error> {
    Ok(Option::<Vec<RemoteNode>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Serialize)]
struct CreateDocumentRequest<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_id: Option<&'a str>,
    workspace_id: &'a str,
}

#[derive(Debug, Serialize)]
struct UpdateDocumentRequest<'a> {
    content: &'a str,
    name: &'a str,
}

#[derive(Debug, Deserialize)]
struct DocumentEnvelope<T> {
    document: T,
}

#[derive(Debug, Deserialize)]
struct CreatedDocument {
    #[serde(deserialize_with = "opaque_id")]
    id: String,
}

#[derive(Debug, Deserialize)]
struct DocumentContent {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TreeResponse {
    #[serde(default)]
    tree: Vec<RemoteNode>,
}
