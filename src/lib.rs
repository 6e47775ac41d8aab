pub mod category;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod github;
pub mod storage;
pub mod util;

pub use category::{default_categories, CategoryRegistry, CategorySource, DEFAULT_CATEGORY};
pub use config::{Config, CredentialMode, CredentialStore, TokenPrompt, PROMPTS_FOLDER};
pub use data::{group_by_category, Attachment, NewPrompt, Prompt, RemotePrompt};
pub use error::{Error, Result};
pub use github::{ConnectionInfo, GitHubGateway, RemoteCategories};
pub use storage::{shared, JsonFileStore, KeyValueStore, MemoryStore, SharedStore};
