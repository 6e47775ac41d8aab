//! Repository configuration and request-header construction

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};

use super::credentials::{CredentialMode, CredentialStore, TokenPrompt};
use crate::error::{Error, Result};
use crate::storage::SharedStore;

/// Folder in the repository that holds prompt documents.
pub const PROMPTS_FOLDER: &str = "prompts";

const KEY_REPO_OWNER: &str = "repo-owner";
const KEY_REPO_NAME: &str = "repo-name";
const KEY_BRANCH_NAME: &str = "branch-name";
const KEY_CREDENTIAL_MODE: &str = "credential-mode";

/// Repository coordinates plus the credential store.
///
/// Loaded from persisted settings at startup; mutated only through [`save`],
/// which replaces all coordinate fields together.
///
/// [`save`]: Config::save
pub struct Config {
    pub repo_owner: String,
    pub repo_name: String,
    pub branch_name: String,
    pub prompts_folder: String,
    credentials: CredentialStore,
    settings: SharedStore,
}

impl Config {
    /// Load configuration from the durable settings store.
    pub fn load(
        settings: SharedStore,
        session: SharedStore,
        prompt: Option<Box<dyn TokenPrompt>>,
    ) -> Self {
        let (repo_owner, repo_name, branch_name, mode) = read_coordinates(&settings);
        let credentials = CredentialStore::new(mode, settings.clone(), session, prompt);
        Self {
            repo_owner,
            repo_name,
            branch_name,
            prompts_folder: PROMPTS_FOLDER.to_string(),
            credentials,
            settings,
        }
    }

    /// Persist repository coordinates and hand the token to the credential
    /// store under the selected mode.
    ///
    /// Owner and repo must be non-empty; so must the token, except under
    /// [`CredentialMode::RepositorySecret`] where no local token is kept.
    /// An empty branch falls back to "main".
    pub fn save(
        &mut self,
        token: &str,
        owner: &str,
        repo: &str,
        branch: &str,
        mode: CredentialMode,
    ) -> Result<()> {
        let owner = owner.trim();
        let repo = repo.trim();
        let token = token.trim();
        let branch = branch.trim();
        let branch = if branch.is_empty() { "main" } else { branch };

        if owner.is_empty() || repo.is_empty() {
            return Err(Error::Validation(
                "Repository owner and name are required".to_string(),
            ));
        }
        if token.is_empty() && mode != CredentialMode::RepositorySecret {
            return Err(Error::Validation("GitHub token is required".to_string()));
        }

        {
            let mut settings = self.settings.lock().unwrap();
            settings.set(KEY_REPO_OWNER, owner);
            settings.set(KEY_REPO_NAME, repo);
            settings.set(KEY_BRANCH_NAME, branch);
            settings.set(KEY_CREDENTIAL_MODE, mode.as_str());
        }
        self.repo_owner = owner.to_string();
        self.repo_name = repo.to_string();
        self.branch_name = branch.to_string();

        self.credentials.set_mode(mode);
        self.credentials.set(token);
        Ok(())
    }

    /// Re-read persisted coordinates, picking up changes made elsewhere.
    pub fn reload(&mut self) {
        let (repo_owner, repo_name, branch_name, mode) = read_coordinates(&self.settings);
        self.repo_owner = repo_owner;
        self.repo_name = repo_name;
        self.branch_name = branch_name;
        self.credentials.set_mode(mode);
    }

    /// Repository coordinates are present (regardless of credential state).
    pub fn has_coordinates(&self) -> bool {
        !self.repo_owner.is_empty() && !self.repo_name.is_empty() && !self.branch_name.is_empty()
    }

    /// Ready for remote operations: coordinates present and, for modes that
    /// keep a local token, a valid token currently retrievable.
    pub fn is_configured(&self) -> bool {
        if !self.has_coordinates() {
            return false;
        }
        match self.credentials.mode() {
            // the token is requested interactively when first needed
            CredentialMode::RepositorySecret => true,
            _ => !self.credentials.get().is_empty(),
        }
    }

    /// Base URL for the configured repository.
    pub fn api_base_url(&self) -> String {
        format!(
            "https://api.github.com/repos/{}/{}",
            self.repo_owner, self.repo_name
        )
    }

    /// Headers for every API call. Reads the credential store at call time so
    /// token rotation is observed by subsequent requests.
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let token = self.credentials.get();
        if let Ok(value) = HeaderValue::from_str(&format!("Bearer {token}")) {
            headers.insert(AUTHORIZATION, value);
        }
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github.v3+json"),
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }
}

fn read_coordinates(settings: &SharedStore) -> (String, String, String, CredentialMode) {
    let settings = settings.lock().unwrap();
    let owner = settings.get(KEY_REPO_OWNER).unwrap_or_default();
    let name = settings.get(KEY_REPO_NAME).unwrap_or_default();
    let branch = settings
        .get(KEY_BRANCH_NAME)
        .filter(|b| !b.is_empty())
        .unwrap_or_else(|| "main".to_string());
    let mode = settings
        .get(KEY_CREDENTIAL_MODE)
        .and_then(|m| CredentialMode::parse(&m))
        .unwrap_or_default();
    (owner, name, branch, mode)
}
