//! Access-token storage, obfuscation, and expiry.
//!
//! Three storage policies coexist as one configuration-selected strategy:
//! durable plaintext, session-scoped obfuscated storage with a 2-hour TTL
//! (the default), and a repository-secret mode that keeps no local token at
//! all. The obfuscation is a repeating-key XOR followed by base64 — a
//! deterrent against casual inspection of the session file, NOT cryptography.
//! Callers rely on its round-trip behavior, so it must not be swapped for a
//! real cipher without changing the stored-state contract.

use std::sync::Mutex;

use base64::engine::general_purpose;
use base64::Engine as _;
use chrono::Utc;
use rand::Rng;

use crate::storage::SharedStore;

/// Token lifetime under [`CredentialMode::EncryptedSession`], in milliseconds.
pub const TOKEN_TTL_MS: i64 = 2 * 60 * 60 * 1000;

const KEY_PLAINTEXT_TOKEN: &str = "github-token";
const KEY_ENCRYPTED_TOKEN: &str = "encrypted-token";
const KEY_TOKEN_EXPIRY: &str = "token-expiry";
const KEY_SESSION_KEY: &str = "session-key";

/// Strategy for where and how the access token is kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CredentialMode {
    /// Durable plaintext storage. Simplest, least secure.
    PlaintextPersistent,
    /// Session-scoped storage, XOR-obfuscated, expires two hours after the
    /// last save.
    #[default]
    EncryptedSession,
    /// No local token. GitHub never exposes repository-secret values to API
    /// clients, so the lookup always falls through to an interactive prompt.
    RepositorySecret,
}

impl CredentialMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialMode::PlaintextPersistent => "plaintext",
            CredentialMode::EncryptedSession => "encrypted-session",
            CredentialMode::RepositorySecret => "repository-secret",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "plaintext" => Some(CredentialMode::PlaintextPersistent),
            "encrypted-session" => Some(CredentialMode::EncryptedSession),
            "repository-secret" => Some(CredentialMode::RepositorySecret),
            _ => None,
        }
    }
}

/// Supplies a token interactively when no stored credential is available.
///
/// Used by [`CredentialMode::RepositorySecret`]; returns `None` when the user
/// aborts entry or no interactive channel exists.
pub trait TokenPrompt: Send + Sync {
    fn request_token(&self) -> Option<String>;
}

/// Owns the token's storage medium, obfuscation, and expiry policy.
pub struct CredentialStore {
    mode: CredentialMode,
    durable: SharedStore,
    session: SharedStore,
    prompt: Option<Box<dyn TokenPrompt>>,
    /// Interactively entered tokens live for the process only.
    prompted: Mutex<Option<String>>,
}

impl CredentialStore {
    pub fn new(
        mode: CredentialMode,
        durable: SharedStore,
        session: SharedStore,
        prompt: Option<Box<dyn TokenPrompt>>,
    ) -> Self {
        Self {
            mode,
            durable,
            session,
            prompt,
            prompted: Mutex::new(None),
        }
    }

    pub fn mode(&self) -> CredentialMode {
        self.mode
    }

    /// Switch storage policy, clearing state held under the previous one.
    pub fn set_mode(&mut self, mode: CredentialMode) {
        if self.mode != mode {
            self.clear();
            self.mode = mode;
        }
    }

    /// Return the current valid token, or empty when none is available.
    ///
    /// Under [`CredentialMode::EncryptedSession`] an expired record is evicted
    /// before returning empty; there are no other side effects.
    pub fn get(&self) -> String {
        match self.mode {
            CredentialMode::PlaintextPersistent => self
                .durable
                .lock()
                .unwrap()
                .get(KEY_PLAINTEXT_TOKEN)
                .unwrap_or_default(),
            CredentialMode::EncryptedSession => self.session_token(),
            CredentialMode::RepositorySecret => self.prompted_token(),
        }
    }

    /// Store a token under the active policy. An empty token clears all
    /// credential state instead.
    pub fn set(&self, token: &str) {
        match self.mode {
            CredentialMode::PlaintextPersistent => {
                let mut durable = self.durable.lock().unwrap();
                if token.is_empty() {
                    durable.remove(KEY_PLAINTEXT_TOKEN);
                } else {
                    durable.set(KEY_PLAINTEXT_TOKEN, token);
                }
            }
            CredentialMode::EncryptedSession => {
                let mut session = self.session.lock().unwrap();
                if token.is_empty() {
                    session.remove(KEY_ENCRYPTED_TOKEN);
                    session.remove(KEY_TOKEN_EXPIRY);
                    session.remove(KEY_SESSION_KEY);
                    return;
                }
                let key = match session.get(KEY_SESSION_KEY) {
                    Some(key) => key,
                    None => {
                        let key = generate_session_key();
                        session.set(KEY_SESSION_KEY, &key);
                        key
                    }
                };
                session.set(KEY_ENCRYPTED_TOKEN, &encrypt_token(token, &key));
                let expiry = now_millis() + TOKEN_TTL_MS;
                session.set(KEY_TOKEN_EXPIRY, &expiry.to_string());
            }
            CredentialMode::RepositorySecret => {
                let mut prompted = self.prompted.lock().unwrap();
                *prompted = if token.is_empty() {
                    None
                } else {
                    Some(token.to_string())
                };
            }
        }
    }

    /// True when no expiry is recorded or the recorded expiry has passed.
    pub fn is_expired(&self) -> bool {
        let session = self.session.lock().unwrap();
        match session
            .get(KEY_TOKEN_EXPIRY)
            .and_then(|e| e.parse::<i64>().ok())
        {
            Some(expiry) => now_millis() > expiry,
            None => true,
        }
    }

    /// Remove all credential state: plaintext token, ciphertext, expiry,
    /// session key, and any interactively entered token.
    pub fn clear(&self) {
        self.durable.lock().unwrap().remove(KEY_PLAINTEXT_TOKEN);
        let mut session = self.session.lock().unwrap();
        session.remove(KEY_ENCRYPTED_TOKEN);
        session.remove(KEY_TOKEN_EXPIRY);
        session.remove(KEY_SESSION_KEY);
        drop(session);
        *self.prompted.lock().unwrap() = None;
    }

    fn session_token(&self) -> String {
        let mut session = self.session.lock().unwrap();
        let (Some(ciphertext), Some(expiry)) = (
            session.get(KEY_ENCRYPTED_TOKEN),
            session.get(KEY_TOKEN_EXPIRY),
        ) else {
            return String::new();
        };

        let expired = expiry.parse::<i64>().map_or(true, |e| now_millis() > e);
        if expired {
            session.remove(KEY_ENCRYPTED_TOKEN);
            session.remove(KEY_TOKEN_EXPIRY);
            session.remove(KEY_SESSION_KEY);
            return String::new();
        }

        let key = session.get(KEY_SESSION_KEY).unwrap_or_default();
        decrypt_token(&ciphertext, &key)
    }

    fn prompted_token(&self) -> String {
        if let Some(token) = self.prompted.lock().unwrap().clone() {
            return token;
        }
        if let Some(token) = self.fetch_repository_secret() {
            return token;
        }
        let token = self
            .prompt
            .as_ref()
            .and_then(|p| p.request_token())
            .unwrap_or_default();
        if !token.is_empty() {
            *self.prompted.lock().unwrap() = Some(token.clone());
        }
        token
    }

    /// Repository-secret lookup stub. The secrets API only reports names and
    /// metadata, never values, so this cannot succeed for any client.
    fn fetch_repository_secret(&self) -> Option<String> {
        tracing::debug!("Repository secret values are not readable via the API; prompting instead");
        None
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Generate a per-session encryption key: 16 random bytes, hex-encoded.
fn generate_session_key() -> String {
    let mut bytes = [0u8; 16];
    rand::rng().fill(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// XOR the token byte-for-byte against the repeating key, then base64-encode.
fn encrypt_token(token: &str, key: &str) -> String {
    let key = key.as_bytes();
    if key.is_empty() {
        return String::new();
    }
    let mixed: Vec<u8> = token
        .bytes()
        .enumerate()
        .map(|(i, b)| b ^ key[i % key.len()])
        .collect();
    general_purpose::STANDARD.encode(mixed)
}

/// Reverse of [`encrypt_token`]. Malformed ciphertext or a missing key yields
/// an empty token rather than an error.
fn decrypt_token(ciphertext: &str, key: &str) -> String {
    let key = key.as_bytes();
    if key.is_empty() {
        return String::new();
    }
    let raw = match general_purpose::STANDARD.decode(ciphertext) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to decode stored token");
            return String::new();
        }
    };
    let mixed: Vec<u8> = raw
        .iter()
        .enumerate()
        .map(|(i, b)| b ^ key[i % key.len()])
        .collect();
    match String::from_utf8(mixed) {
        Ok(token) => token,
        Err(e) => {
            tracing::warn!(error = %e, "Stored token does not decrypt with the current session key");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{shared, KeyValueStore, MemoryStore, SharedStore};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CannedPrompt {
        token: Option<String>,
        calls: Arc<AtomicUsize>,
    }

    impl TokenPrompt for CannedPrompt {
        fn request_token(&self) -> Option<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.token.clone()
        }
    }

    fn stores() -> (SharedStore, SharedStore) {
        (shared(MemoryStore::new()), shared(MemoryStore::new()))
    }

    fn session_store(mode: CredentialMode) -> (CredentialStore, SharedStore, SharedStore) {
        let (durable, session) = stores();
        let store = CredentialStore::new(mode, durable.clone(), session.clone(), None);
        (store, durable, session)
    }

    #[test]
    fn encrypt_decrypt_round_trip() {
        let key = generate_session_key();
        let token = "ghp_abc123XYZ-token";
        assert_eq!(decrypt_token(&encrypt_token(token, &key), &key), token);
    }

    #[test]
    fn decrypt_malformed_ciphertext_yields_empty() {
        let key = generate_session_key();
        assert_eq!(decrypt_token("%%% not base64 %%%", &key), "");
    }

    #[test]
    fn decrypt_with_missing_key_yields_empty() {
        let key = generate_session_key();
        let ciphertext = encrypt_token("ghp_secret", &key);
        assert_eq!(decrypt_token(&ciphertext, ""), "");
    }

    #[test]
    fn session_key_is_hex_of_16_bytes() {
        let key = generate_session_key();
        assert_eq!(key.len(), 32);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn encrypted_session_set_then_get() {
        let (store, _, session) = session_store(CredentialMode::EncryptedSession);
        store.set("ghp_secret");

        assert_eq!(store.get(), "ghp_secret");
        assert!(!store.is_expired());

        // token at rest is never the plaintext
        let at_rest = session
            .lock()
            .unwrap()
            .get(KEY_ENCRYPTED_TOKEN)
            .expect("ciphertext stored");
        assert_ne!(at_rest, "ghp_secret");
    }

    #[test]
    fn expiry_is_two_hours_from_set() {
        let (store, _, session) = session_store(CredentialMode::EncryptedSession);
        let before = now_millis();
        store.set("ghp_secret");

        let expiry: i64 = session
            .lock()
            .unwrap()
            .get(KEY_TOKEN_EXPIRY)
            .expect("expiry recorded")
            .parse()
            .expect("numeric expiry");
        assert!(expiry >= before + TOKEN_TTL_MS);
        assert!(expiry <= now_millis() + TOKEN_TTL_MS);
    }

    #[test]
    fn expired_record_is_evicted_on_get() {
        let (store, _, session) = session_store(CredentialMode::EncryptedSession);
        store.set("ghp_secret");

        session
            .lock()
            .unwrap()
            .set(KEY_TOKEN_EXPIRY, &(now_millis() - 1).to_string());

        assert!(store.is_expired());
        assert_eq!(store.get(), "");

        let session = session.lock().unwrap();
        assert_eq!(session.get(KEY_ENCRYPTED_TOKEN), None);
        assert_eq!(session.get(KEY_TOKEN_EXPIRY), None);
        assert_eq!(session.get(KEY_SESSION_KEY), None);
    }

    #[test]
    fn empty_token_clears_session_state() {
        let (store, _, session) = session_store(CredentialMode::EncryptedSession);
        store.set("ghp_secret");
        store.set("");

        let session = session.lock().unwrap();
        assert_eq!(session.get(KEY_ENCRYPTED_TOKEN), None);
        assert_eq!(session.get(KEY_TOKEN_EXPIRY), None);
        assert_eq!(session.get(KEY_SESSION_KEY), None);
    }

    #[test]
    fn session_key_is_reused_within_a_session() {
        let (store, _, session) = session_store(CredentialMode::EncryptedSession);
        store.set("first");
        let key1 = session.lock().unwrap().get(KEY_SESSION_KEY);
        store.set("second");
        let key2 = session.lock().unwrap().get(KEY_SESSION_KEY);
        assert_eq!(key1, key2);
        assert_eq!(store.get(), "second");
    }

    #[test]
    fn destroyed_session_key_invalidates_stored_token() {
        let (store, _, session) = session_store(CredentialMode::EncryptedSession);
        store.set("ghp_secret");
        session.lock().unwrap().remove(KEY_SESSION_KEY);
        assert_eq!(store.get(), "");
    }

    #[test]
    fn plaintext_mode_persists_raw_token() {
        let (store, durable, _) = session_store(CredentialMode::PlaintextPersistent);
        store.set("ghp_secret");

        assert_eq!(store.get(), "ghp_secret");
        assert_eq!(
            durable.lock().unwrap().get(KEY_PLAINTEXT_TOKEN).as_deref(),
            Some("ghp_secret")
        );
    }

    #[test]
    fn repository_secret_mode_falls_through_to_prompt_once() {
        let (durable, session) = stores();
        let calls = Arc::new(AtomicUsize::new(0));
        let prompt = CannedPrompt {
            token: Some("prompted-token".to_string()),
            calls: calls.clone(),
        };
        let store = CredentialStore::new(
            CredentialMode::RepositorySecret,
            durable.clone(),
            session,
            Some(Box::new(prompt)),
        );

        assert_eq!(store.get(), "prompted-token");
        assert_eq!(store.get(), "prompted-token");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // nothing was written to durable storage
        assert_eq!(durable.lock().unwrap().get(KEY_PLAINTEXT_TOKEN), None);
    }

    #[test]
    fn repository_secret_mode_without_prompt_yields_empty() {
        let (store, _, _) = session_store(CredentialMode::RepositorySecret);
        assert_eq!(store.get(), "");
    }

    #[test]
    fn set_mode_clears_previous_state() {
        let (mut store, durable, _) = session_store(CredentialMode::PlaintextPersistent);
        store.set("ghp_secret");
        store.set_mode(CredentialMode::EncryptedSession);

        assert_eq!(durable.lock().unwrap().get(KEY_PLAINTEXT_TOKEN), None);
        assert_eq!(store.get(), "");
    }

    #[test]
    fn clear_removes_everything() {
        let (store, _, session) = session_store(CredentialMode::EncryptedSession);
        store.set("ghp_secret");
        store.clear();

        assert_eq!(store.get(), "");
        assert!(store.is_expired());
        assert_eq!(session.lock().unwrap().get(KEY_SESSION_KEY), None);
    }

    #[test]
    fn mode_strings_round_trip() {
        for mode in [
            CredentialMode::PlaintextPersistent,
            CredentialMode::EncryptedSession,
            CredentialMode::RepositorySecret,
        ] {
            assert_eq!(CredentialMode::parse(mode.as_str()), Some(mode));
        }
        assert_eq!(CredentialMode::parse("keychain"), None);
    }
}
