//! Prompt data models and display grouping

mod models;

pub use models::{group_by_category, Attachment, NewPrompt, Prompt, RemotePrompt};
