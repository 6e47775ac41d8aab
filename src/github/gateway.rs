//! Maps prompt and category CRUD onto the GitHub Contents API.
//!
//! Every mutation carries the blob SHA it read; a stale SHA is rejected by
//! GitHub with 409 and surfaced as [`Error::Conflict`]. Retrying is the
//! caller's job — the gateway performs no merging or locking of its own.

use std::path::Path;
use std::sync::Arc;

use base64::engine::general_purpose;
use base64::Engine as _;
use chrono::Utc;
use futures::future::join_all;
use reqwest::{Client, Response, StatusCode};

use super::types::{
    ApiErrorBody, ConnectionInfo, ContentEntry, DeleteContentBody, PutContentBody,
    PutContentResponse, RemoteCategories, RepoInfo,
};
use crate::config::Config;
use crate::data::{Attachment, NewPrompt, Prompt, RemotePrompt};
use crate::error::{Error, Result};
use crate::util::slugify;

/// Remote file holding the category list, kept outside the prompts folder so
/// listings never mistake it for a prompt document.
pub const CATEGORIES_FILE: &str = "categories.json";

const GITKEEP_CONTENT: &str = "# This file keeps the prompts folder in git";

/// Client for the configured repository's Contents API.
pub struct GitHubGateway {
    client: Client,
    config: Arc<Config>,
    base_url: String,
}

impl GitHubGateway {
    pub fn new(config: Arc<Config>) -> Self {
        let base_url = config.api_base_url();
        Self {
            client: Client::new(),
            config,
            base_url,
        }
    }

    /// Build a gateway against a different API root. Used to point at a local
    /// mock server in tests.
    pub fn with_api_root(config: Arc<Config>, api_root: &str) -> Self {
        let base_url = format!(
            "{}/repos/{}/{}",
            api_root.trim_end_matches('/'),
            config.repo_owner,
            config.repo_name
        );
        Self {
            client: Client::new(),
            config,
            base_url,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn ensure_configured(&self) -> Result<()> {
        if self.config.is_configured() {
            Ok(())
        } else {
            Err(Error::ConfigurationMissing)
        }
    }

    fn contents_url(&self, path: &str) -> String {
        format!("{}/contents/{}", self.base_url, path)
    }

    /// List the prompts folder and fetch every `.json` document in it.
    ///
    /// A missing folder is the first-run case and yields an empty collection.
    /// Individual files that fail to download or parse are skipped so one
    /// corrupt document cannot abort the whole listing.
    pub async fn fetch_all(&self) -> Result<Vec<RemotePrompt>> {
        self.ensure_configured()?;

        let url = self.contents_url(&self.config.prompts_folder);
        let response = self
            .client
            .get(&url)
            .headers(self.config.headers())
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(api_error(response, "Failed to fetch prompts").await);
        }

        let entries: Vec<ContentEntry> = response.json().await?;
        let fetches = entries
            .iter()
            .filter(|e| e.name.ends_with(".json"))
            .map(|e| self.fetch_one(e));
        let prompts = join_all(fetches).await.into_iter().flatten().collect();
        Ok(prompts)
    }

    async fn fetch_one(&self, entry: &ContentEntry) -> Option<RemotePrompt> {
        let Some(url) = entry.download_url.as_deref() else {
            tracing::warn!(file = %entry.name, "Entry has no download URL, skipping");
            return None;
        };
        let response = match self.client.get(url).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                tracing::warn!(file = %entry.name, status = %response.status(), "Failed to fetch prompt content");
                return None;
            }
            Err(e) => {
                tracing::warn!(file = %entry.name, error = %e, "Failed to fetch prompt content");
                return None;
            }
        };
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(file = %entry.name, error = %e, "Failed to read prompt content");
                return None;
            }
        };
        match serde_json::from_str::<Prompt>(&body) {
            Ok(prompt) => Some(RemotePrompt {
                prompt,
                filename: entry.name.clone(),
                sha: entry.sha.clone(),
            }),
            Err(e) => {
                tracing::warn!(file = %entry.name, error = %e, "Skipping unparseable prompt file");
                None
            }
        }
    }

    /// Create a new prompt document. Assigns id and timestamps, derives the
    /// filename from the name, and commits the JSON blob.
    pub async fn create(&self, new_prompt: NewPrompt) -> Result<RemotePrompt> {
        self.ensure_configured()?;
        new_prompt.validate()?;

        let prompt = new_prompt.into_prompt();
        let filename = format!("{}.json", slugify(&prompt.name));
        let url = self.contents_url(&format!("{}/{}", self.config.prompts_folder, filename));
        let body = PutContentBody {
            message: format!("Add prompt: {}", prompt.name),
            content: encode_json(&prompt)?,
            sha: None,
            branch: &self.config.branch_name,
        };

        let response = self
            .client
            .put(&url)
            .headers(self.config.headers())
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error(response, "Failed to create prompt").await);
        }

        let sha = put_response_sha(response).await;
        Ok(RemotePrompt {
            prompt,
            filename,
            sha,
        })
    }

    /// Rewrite an existing prompt document in place.
    ///
    /// `sha` must match the current remote blob or GitHub rejects the write;
    /// the filename never changes, even when the prompt was renamed.
    pub async fn update(&self, filename: &str, sha: &str, mut prompt: Prompt) -> Result<RemotePrompt> {
        self.ensure_configured()?;

        prompt.updated_at = Utc::now();
        let url = self.contents_url(&format!("{}/{}", self.config.prompts_folder, filename));
        let body = PutContentBody {
            message: format!("Update prompt: {}", prompt.name),
            content: encode_json(&prompt)?,
            sha: Some(sha),
            branch: &self.config.branch_name,
        };

        let response = self
            .client
            .put(&url)
            .headers(self.config.headers())
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error(response, "Failed to update prompt").await);
        }

        let sha = put_response_sha(response).await;
        Ok(RemotePrompt {
            prompt,
            filename: filename.to_string(),
            sha,
        })
    }

    /// Remove a prompt document, using `sha` as the concurrency token.
    pub async fn delete(&self, filename: &str, sha: &str) -> Result<()> {
        self.ensure_configured()?;

        let url = self.contents_url(&format!("{}/{}", self.config.prompts_folder, filename));
        let body = DeleteContentBody {
            message: format!("Delete prompt: {filename}"),
            sha,
            branch: &self.config.branch_name,
        };

        let response = self
            .client
            .delete(&url)
            .headers(self.config.headers())
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error(response, "Failed to delete prompt").await);
        }
        Ok(())
    }

    /// Probe the prompts folder, creating it via a `.gitkeep` placeholder when
    /// absent. A folder that already exists is success, not an error.
    pub async fn ensure_folder_exists(&self) -> Result<()> {
        self.ensure_configured()?;

        let url = self.contents_url(&self.config.prompts_folder);
        let response = self
            .client
            .get(&url)
            .headers(self.config.headers())
            .send()
            .await?;
        if response.status() != StatusCode::NOT_FOUND {
            return Ok(());
        }

        let keep_url = self.contents_url(&format!("{}/.gitkeep", self.config.prompts_folder));
        let body = PutContentBody {
            message: "Create prompts folder".to_string(),
            content: general_purpose::STANDARD.encode(GITKEEP_CONTENT),
            sha: None,
            branch: &self.config.branch_name,
        };
        let response = self
            .client
            .put(&keep_url)
            .headers(self.config.headers())
            .json(&body)
            .send()
            .await?;
        // 422 means the placeholder appeared between probe and create
        if response.status() == StatusCode::UNPROCESSABLE_ENTITY {
            tracing::debug!("Prompts folder already exists");
            return Ok(());
        }
        if !response.status().is_success() {
            return Err(api_error(response, "Failed to create prompts folder").await);
        }
        Ok(())
    }

    /// Read the repository root to validate the owner/repo/token combination.
    pub async fn test_connection(&self) -> Result<ConnectionInfo> {
        self.ensure_configured()?;

        let response = self
            .client
            .get(&self.base_url)
            .headers(self.config.headers())
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error(response, "Failed to connect to repository").await);
        }
        let repo: RepoInfo = response.json().await?;
        Ok(ConnectionInfo {
            repository: repo.full_name,
            private: repo.private,
        })
    }

    /// Read the remote category list, if the file exists yet.
    pub async fn read_categories(&self) -> Result<Option<RemoteCategories>> {
        self.ensure_configured()?;

        let url = self.contents_url(CATEGORIES_FILE);
        let response = self
            .client
            .get(&url)
            .headers(self.config.headers())
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(api_error(response, "Failed to fetch categories").await);
        }

        let entry: ContentEntry = response.json().await?;
        // GitHub wraps the base64 body across lines
        let encoded: String = entry
            .content
            .unwrap_or_default()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        let raw = match general_purpose::STANDARD.decode(encoded) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "Malformed categories file content, ignoring");
                return Ok(None);
            }
        };
        let categories: Vec<String> = match serde_json::from_slice(&raw) {
            Ok(categories) => categories,
            Err(e) => {
                tracing::warn!(error = %e, "Unparseable categories file, ignoring");
                return Ok(None);
            }
        };
        Ok(Some(RemoteCategories {
            categories,
            sha: entry.sha,
        }))
    }

    /// Write the category list, creating the file when `sha` is `None`.
    /// Returns the new blob SHA.
    pub async fn write_categories(&self, categories: &[String], sha: Option<&str>) -> Result<String> {
        self.ensure_configured()?;

        let url = self.contents_url(CATEGORIES_FILE);
        let body = PutContentBody {
            message: "Update categories".to_string(),
            content: encode_json(&categories)?,
            sha,
            branch: &self.config.branch_name,
        };
        let response = self
            .client
            .put(&url)
            .headers(self.config.headers())
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error(response, "Failed to update categories").await);
        }
        Ok(put_response_sha(response).await)
    }

    /// Read a local file into an attachment: base64 data URL plus metadata.
    /// The caller enforces the size cap before invoking this.
    pub async fn process_attachment(path: &Path) -> Result<Attachment> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime = mime_guess::from_path(path).first_or_octet_stream();
        let data = format!(
            "data:{};base64,{}",
            mime,
            general_purpose::STANDARD.encode(&bytes)
        );
        Ok(Attachment {
            name,
            content_type: mime.to_string(),
            size: bytes.len() as u64,
            data,
        })
    }
}

/// Serialize a value as pretty JSON and base64-encode it for the Contents API.
fn encode_json<T: serde::Serialize>(value: &T) -> Result<String> {
    let json = serde_json::to_string_pretty(value)?;
    Ok(general_purpose::STANDARD.encode(json))
}

/// Extract the new blob SHA from a successful PUT response.
async fn put_response_sha(response: Response) -> String {
    match response.json::<PutContentResponse>().await {
        Ok(parsed) => parsed.content.map(|c| c.sha).unwrap_or_default(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to parse content response");
            String::new()
        }
    }
}

/// Convert a non-2xx response into the crate error, folding in the provider's
/// message. 409 is the stale-SHA rejection and maps to [`Error::Conflict`].
async fn api_error(response: Response, context: &str) -> Error {
    let status = response.status();
    let body: ApiErrorBody = response.json().await.unwrap_or_default();
    if status == StatusCode::CONFLICT {
        Error::Conflict(format!("{context}: {}", body.message))
    } else {
        Error::Api {
            status: status.as_u16(),
            message: format!("{context}. {}", body.message),
        }
    }
}
