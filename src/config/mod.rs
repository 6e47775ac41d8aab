//! Configuration and credential lifecycle
//!
//! [`Config`] owns the repository coordinates and composes the
//! [`CredentialStore`]; the gateway receives it by injection rather than
//! reaching for shared globals.

mod credentials;
mod settings;

pub use credentials::{CredentialMode, CredentialStore, TokenPrompt, TOKEN_TTL_MS};
pub use settings::{Config, PROMPTS_FOLDER};
