//! GitHub Contents API request and response shapes

use serde::{Deserialize, Serialize};

/// One entry from a directory listing or single-file read.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentEntry {
    pub name: String,
    pub sha: String,
    /// Raw-content URL; present for files, absent for directories.
    #[serde(default)]
    pub download_url: Option<String>,
    /// Base64 file body; only populated on single-file reads.
    #[serde(default)]
    pub content: Option<String>,
}

/// Repository metadata returned by the connection test.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoInfo {
    pub full_name: String,
    pub private: bool,
}

/// Result of a successful connection test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub repository: String,
    pub private: bool,
}

/// The remote categories file together with its concurrency token.
#[derive(Debug, Clone)]
pub struct RemoteCategories {
    pub categories: Vec<String>,
    pub sha: String,
}

/// Body for `PUT /contents/{path}` (create when `sha` is absent, update when
/// it matches the current blob).
#[derive(Debug, Serialize)]
pub(crate) struct PutContentBody<'a> {
    pub message: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<&'a str>,
    pub branch: &'a str,
}

/// Body for `DELETE /contents/{path}`.
#[derive(Debug, Serialize)]
pub(crate) struct DeleteContentBody<'a> {
    pub message: String,
    pub sha: &'a str,
    pub branch: &'a str,
}

/// Envelope around the entry returned by a successful PUT.
#[derive(Debug, Deserialize)]
pub(crate) struct PutContentResponse {
    #[serde(default)]
    pub content: Option<ContentEntry>,
}

/// Error body GitHub attaches to non-2xx responses.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub message: String,
}
