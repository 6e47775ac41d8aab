//! Remote content gateway for the GitHub Contents API

mod gateway;
mod types;

pub use gateway::{GitHubGateway, CATEGORIES_FILE};
pub use types::{ConnectionInfo, ContentEntry, RemoteCategories, RepoInfo};
