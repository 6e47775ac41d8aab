//! Managed set of prompt category labels.
//!
//! The remote `categories.json` is authoritative once a repository is
//! configured; the local cache covers the unconfigured and fetch-failure
//! cases. Labels are uppercase, at most three words, and always include
//! [`DEFAULT_CATEGORY`], which cannot be removed.

use crate::error::{Error, Result};
use crate::github::GitHubGateway;
use crate::storage::SharedStore;

/// The protected category every prompt falls back to.
pub const DEFAULT_CATEGORY: &str = "DEFAULT";

/// Category names are limited to this many whitespace-separated words.
pub const MAX_CATEGORY_WORDS: usize = 3;

const KEY_CACHED_CATEGORIES: &str = "cached-categories";

/// Built-in category set used before any customization.
pub fn default_categories() -> Vec<String> {
    [
        DEFAULT_CATEGORY,
        "CODING",
        "WRITING",
        "MARKETING",
        "ANALYSIS",
        "CREATIVE",
        "BUSINESS",
        "EDUCATION",
        "RESEARCH",
        "PRODUCTIVITY",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Where the currently loaded category list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategorySource {
    Remote,
    Cache,
    Builtin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RegistryState {
    Unloaded,
    Loaded { source: CategorySource, stale: bool },
}

/// Mutable registry of category labels.
pub struct CategoryRegistry {
    store: SharedStore,
    categories: Vec<String>,
    remote_sha: Option<String>,
    state: RegistryState,
}

impl CategoryRegistry {
    pub fn new(store: SharedStore) -> Self {
        Self {
            store,
            categories: Vec::new(),
            remote_sha: None,
            state: RegistryState::Unloaded,
        }
    }

    /// The current category list, loading remote-then-cache-then-builtin on
    /// first use. Pass the gateway only when the repository is configured.
    pub async fn list(&mut self, gateway: Option<&GitHubGateway>) -> Vec<String> {
        self.ensure_loaded(gateway).await;
        self.categories.clone()
    }

    /// Add a category. The name is trimmed and uppercased before validation;
    /// duplicates are rejected on that normalized form.
    pub async fn add(&mut self, name: &str, gateway: Option<&GitHubGateway>) -> Result<String> {
        self.ensure_loaded(gateway).await;

        let normalized = name.trim().to_uppercase();
        if normalized.is_empty() {
            return Err(Error::Validation("Category name is required".to_string()));
        }
        if normalized.split_whitespace().count() > MAX_CATEGORY_WORDS {
            return Err(Error::Validation(format!(
                "Category names are limited to {MAX_CATEGORY_WORDS} words"
            )));
        }
        if self.categories.contains(&normalized) {
            return Err(Error::Validation(format!(
                "Category \"{normalized}\" already exists"
            )));
        }

        self.categories.push(normalized.clone());
        self.persist(gateway).await;
        Ok(normalized)
    }

    /// Remove a category. [`DEFAULT_CATEGORY`] is protected.
    pub async fn remove(&mut self, name: &str, gateway: Option<&GitHubGateway>) -> Result<()> {
        self.ensure_loaded(gateway).await;

        let normalized = name.trim().to_uppercase();
        if normalized == DEFAULT_CATEGORY {
            return Err(Error::Validation(
                "The DEFAULT category cannot be removed".to_string(),
            ));
        }
        let Some(index) = self.categories.iter().position(|c| *c == normalized) else {
            return Err(Error::Validation(format!(
                "Category \"{normalized}\" not found"
            )));
        };

        self.categories.remove(index);
        self.persist(gateway).await;
        Ok(())
    }

    /// Check that a label names a known category.
    pub async fn validate_member(
        &mut self,
        name: &str,
        gateway: Option<&GitHubGateway>,
    ) -> Result<String> {
        self.ensure_loaded(gateway).await;
        let normalized = name.trim().to_uppercase();
        if self.categories.contains(&normalized) {
            Ok(normalized)
        } else {
            Err(Error::Validation(format!(
                "Unknown category \"{normalized}\""
            )))
        }
    }

    /// Force the next access to reload from its source.
    pub fn reload(&mut self) {
        self.state = RegistryState::Unloaded;
        self.categories.clear();
        self.remote_sha = None;
    }

    /// True when a local mutation could not be persisted remotely.
    pub fn is_stale(&self) -> bool {
        matches!(self.state, RegistryState::Loaded { stale: true, .. })
    }

    pub fn source(&self) -> Option<CategorySource> {
        match self.state {
            RegistryState::Unloaded => None,
            RegistryState::Loaded { source, .. } => Some(source),
        }
    }

    async fn ensure_loaded(&mut self, gateway: Option<&GitHubGateway>) {
        if matches!(self.state, RegistryState::Loaded { .. }) {
            return;
        }

        if let Some(gateway) = gateway {
            match gateway.read_categories().await {
                Ok(Some(remote)) => {
                    self.categories = remote.categories;
                    self.remote_sha = Some(remote.sha);
                    self.write_cache();
                    self.state = RegistryState::Loaded {
                        source: CategorySource::Remote,
                        stale: false,
                    };
                    return;
                }
                Ok(None) => {
                    // no remote file yet; first write will create it
                    self.remote_sha = None;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Falling back to cached categories");
                }
            }
        }

        if let Some(cached) = self.read_cache() {
            self.categories = cached;
            self.state = RegistryState::Loaded {
                source: CategorySource::Cache,
                stale: false,
            };
        } else {
            self.categories = default_categories();
            self.state = RegistryState::Loaded {
                source: CategorySource::Builtin,
                stale: false,
            };
        }
    }

    async fn persist(&mut self, gateway: Option<&GitHubGateway>) {
        self.write_cache();

        let source = self.source().unwrap_or(CategorySource::Cache);
        if let Some(gateway) = gateway {
            match gateway
                .write_categories(&self.categories, self.remote_sha.as_deref())
                .await
            {
                Ok(sha) => {
                    self.remote_sha = Some(sha);
                    self.state = RegistryState::Loaded {
                        source: CategorySource::Remote,
                        stale: false,
                    };
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to persist categories remotely");
                    self.state = RegistryState::Loaded {
                        source,
                        stale: true,
                    };
                }
            }
        }
    }

    fn read_cache(&self) -> Option<Vec<String>> {
        let raw = self.store.lock().unwrap().get(KEY_CACHED_CATEGORIES)?;
        match serde_json::from_str(&raw) {
            Ok(categories) => Some(categories),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unparseable category cache");
                None
            }
        }
    }

    fn write_cache(&self) {
        match serde_json::to_string(&self.categories) {
            Ok(raw) => self.store.lock().unwrap().set(KEY_CACHED_CATEGORIES, &raw),
            Err(e) => tracing::warn!(error = %e, "Failed to serialize category cache"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{shared, MemoryStore};

    fn registry() -> CategoryRegistry {
        CategoryRegistry::new(shared(MemoryStore::new()))
    }

    #[tokio::test]
    async fn lists_builtin_defaults_when_nothing_is_stored() {
        let mut registry = registry();
        let categories = registry.list(None).await;
        assert_eq!(categories.len(), 10);
        assert!(categories.contains(&DEFAULT_CATEGORY.to_string()));
        assert_eq!(registry.source(), Some(CategorySource::Builtin));
    }

    #[tokio::test]
    async fn add_normalizes_and_persists_to_cache() {
        let store = shared(MemoryStore::new());
        let mut registry = CategoryRegistry::new(store.clone());

        let added = registry.add("  prompt testing  ", None).await.expect("add");
        assert_eq!(added, "PROMPT TESTING");

        // a fresh registry over the same store sees the cached set
        let mut reopened = CategoryRegistry::new(store);
        let categories = reopened.list(None).await;
        assert!(categories.contains(&"PROMPT TESTING".to_string()));
        assert_eq!(reopened.source(), Some(CategorySource::Cache));
    }

    #[tokio::test]
    async fn add_rejects_empty_and_too_many_words() {
        let mut registry = registry();
        assert!(registry.add("   ", None).await.is_err());
        assert!(registry.add("ONE TWO THREE FOUR", None).await.is_err());
        assert!(registry.add("ONE TWO THREE", None).await.is_ok());
    }

    #[tokio::test]
    async fn add_rejects_case_insensitive_duplicates() {
        let mut registry = registry();
        // CODING is part of the builtin set
        let err = registry.add("coding", None).await.unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[tokio::test]
    async fn remove_protects_default() {
        let mut registry = registry();
        assert!(registry.remove("DEFAULT", None).await.is_err());
        assert!(registry.remove("default", None).await.is_err());
    }

    #[tokio::test]
    async fn remove_unknown_fails() {
        let mut registry = registry();
        assert!(registry.remove("NOPE", None).await.is_err());
    }

    #[tokio::test]
    async fn remove_existing_succeeds() {
        let mut registry = registry();
        registry.remove("CODING", None).await.expect("remove");
        assert!(!registry.list(None).await.contains(&"CODING".to_string()));
    }

    #[tokio::test]
    async fn validate_member_accepts_known_rejects_unknown() {
        let mut registry = registry();
        assert_eq!(
            registry.validate_member("coding", None).await.expect("known"),
            "CODING"
        );
        assert!(registry.validate_member("MYSTERY", None).await.is_err());
    }

    #[tokio::test]
    async fn reload_forces_a_fresh_load() {
        let mut registry = registry();
        registry.add("EXTRA", None).await.expect("add");
        registry.reload();
        assert_eq!(registry.source(), None);

        // cache was written, so the reloaded set still has the addition
        let categories = registry.list(None).await;
        assert!(categories.contains(&"EXTRA".to_string()));
        assert_eq!(registry.source(), Some(CategorySource::Cache));
    }
}
