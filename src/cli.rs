//! Command-line surface.
//!
//! Each subcommand is thin glue over the library: parse arguments, run the
//! validation that must happen before any network call, then hand off to the
//! gateway or registry and print the outcome.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context as _, Result};
use clap::{Parser, Subcommand};

use crate::category::CategoryRegistry;
use crate::config::{Config, CredentialMode, TokenPrompt};
use crate::data::{group_by_category, NewPrompt, RemotePrompt};
use crate::error::Error;
use crate::github::GitHubGateway;
use crate::storage::{shared, JsonFileStore, SharedStore};
use crate::util;

/// Attachments larger than this are rejected before processing.
pub const MAX_ATTACHMENT_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Parser)]
#[command(name = "promptstash", version, about = "GitHub-backed personal prompt manager")]
pub struct Cli {
    /// Override the data directory (default ~/.promptstash)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Save repository settings, then verify the connection end to end
    Configure {
        /// Repository owner (user or organization)
        #[arg(long)]
        owner: String,
        /// Repository name
        #[arg(long)]
        repo: String,
        /// Branch to commit to
        #[arg(long, default_value = "main")]
        branch: String,
        /// Access token; prompted for interactively when omitted
        #[arg(long)]
        token: Option<String>,
        /// Token storage: plaintext, encrypted-session, or repository-secret
        #[arg(long, default_value = "encrypted-session")]
        mode: String,
    },
    /// Check that the configured repository is reachable
    Test,
    /// List prompts, grouped by category
    List {
        /// Only prompts in this category
        #[arg(long)]
        category: Option<String>,
        /// Only verified prompts
        #[arg(long, conflicts_with = "unverified")]
        verified: bool,
        /// Only unverified prompts
        #[arg(long)]
        unverified: bool,
        /// Only prompts rated at least this many stars
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=5))]
        min_rating: Option<u8>,
    },
    /// Add a new prompt
    Add {
        /// Prompt name
        name: String,
        /// Prompt text
        #[arg(long)]
        text: String,
        /// Category label (must exist in the registry)
        #[arg(long)]
        category: Option<String>,
        /// Star rating
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=5))]
        rating: Option<u8>,
        /// Mark the prompt as verified
        #[arg(long)]
        verified: bool,
        /// File to embed as a base64 attachment (max 10 MB)
        #[arg(long)]
        attachment: Option<PathBuf>,
    },
    /// Edit fields of an existing prompt
    Edit {
        /// Remote filename of the prompt (see `list`)
        filename: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        text: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    /// Set a prompt's star rating
    Rate {
        /// Remote filename of the prompt
        filename: String,
        #[arg(value_parser = clap::value_parser!(u8).range(0..=5))]
        rating: u8,
    },
    /// Mark a prompt as verified (or revoke with --revoke)
    Verify {
        /// Remote filename of the prompt
        filename: String,
        /// Clear the verified flag instead of setting it
        #[arg(long)]
        revoke: bool,
    },
    /// Delete a prompt
    Delete {
        /// Remote filename of the prompt
        filename: String,
    },
    /// Manage category labels
    Categories {
        #[command(subcommand)]
        action: CategoryAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum CategoryAction {
    /// Show all categories
    List,
    /// Add a category (uppercase, at most three words)
    Add { name: String },
    /// Remove a category (DEFAULT is protected)
    Remove { name: String },
}

/// Reads a token from the terminal when no stored credential is available.
pub struct TerminalPrompt;

impl TokenPrompt for TerminalPrompt {
    fn request_token(&self) -> Option<String> {
        dialoguer::Password::new()
            .with_prompt("GitHub token")
            .interact()
            .ok()
            .filter(|token| !token.is_empty())
    }
}

pub async fn run(cli: Cli) -> Result<()> {
    let settings = shared(JsonFileStore::open(util::settings_path()));
    let session = shared(JsonFileStore::open(util::session_path()));
    let config = Config::load(settings.clone(), session, Some(Box::new(TerminalPrompt)));

    match cli.command {
        Commands::Configure {
            owner,
            repo,
            branch,
            token,
            mode,
        } => configure(config, &owner, &repo, &branch, token, &mode).await,
        Commands::Test => {
            let gateway = ready_gateway(config)?;
            let info = gateway.test_connection().await?;
            println!(
                "Connected to {} ({})",
                info.repository,
                if info.private { "private" } else { "public" }
            );
            Ok(())
        }
        Commands::List {
            category,
            verified,
            unverified,
            min_rating,
        } => {
            let gateway = ready_gateway(config)?;
            list(&gateway, category, verified, unverified, min_rating).await
        }
        Commands::Add {
            name,
            text,
            category,
            rating,
            verified,
            attachment,
        } => {
            let gateway = ready_gateway(config)?;
            add(&gateway, settings, name, text, category, rating, verified, attachment).await
        }
        Commands::Edit {
            filename,
            name,
            text,
            category,
        } => {
            let gateway = ready_gateway(config)?;
            let mut record = find_prompt(&gateway, &filename).await?;
            if let Some(name) = name {
                record.prompt.name = name;
            }
            if let Some(text) = text {
                record.prompt.prompt_text = text;
            }
            if let Some(category) = category {
                let mut registry = CategoryRegistry::new(settings);
                record.prompt.category =
                    registry.validate_member(&category, Some(&gateway)).await?;
            }
            let updated = gateway
                .update(&record.filename, &record.sha, record.prompt)
                .await?;
            println!("Updated {}", updated.filename);
            Ok(())
        }
        Commands::Rate { filename, rating } => {
            let gateway = ready_gateway(config)?;
            let mut record = find_prompt(&gateway, &filename).await?;
            record.prompt.rating = Some(rating);
            gateway
                .update(&record.filename, &record.sha, record.prompt)
                .await?;
            println!(
                "Rating updated to {rating} star{}",
                if rating == 1 { "" } else { "s" }
            );
            Ok(())
        }
        Commands::Verify { filename, revoke } => {
            let gateway = ready_gateway(config)?;
            let mut record = find_prompt(&gateway, &filename).await?;
            record.prompt.verified = !revoke;
            gateway
                .update(&record.filename, &record.sha, record.prompt)
                .await?;
            println!(
                "Prompt {}",
                if revoke { "unverified" } else { "verified" }
            );
            Ok(())
        }
        Commands::Delete { filename } => {
            let gateway = ready_gateway(config)?;
            let record = find_prompt(&gateway, &filename).await?;
            gateway.delete(&record.filename, &record.sha).await?;
            println!("Deleted {}", record.filename);
            Ok(())
        }
        Commands::Categories { action } => categories(config, settings, action).await,
    }
}

/// Build a gateway, or explain why the configuration is not ready.
fn ready_gateway(config: Config) -> Result<GitHubGateway> {
    if !config.is_configured() {
        if config.has_coordinates()
            && config.credentials().mode() == CredentialMode::EncryptedSession
            && config.credentials().is_expired()
        {
            bail!("Your GitHub token has expired. Run `promptstash configure` to re-enter it.");
        }
        bail!(Error::ConfigurationMissing);
    }
    Ok(GitHubGateway::new(Arc::new(config)))
}

/// Save settings, then walk the whole flow: connection test, folder
/// provisioning, initial load. Each step awaits the previous one.
async fn configure(
    mut config: Config,
    owner: &str,
    repo: &str,
    branch: &str,
    token: Option<String>,
    mode: &str,
) -> Result<()> {
    let mode = CredentialMode::parse(mode)
        .ok_or_else(|| Error::Validation(format!("Unknown credential mode \"{mode}\"")))?;
    let token = match token {
        Some(token) => token,
        None if mode == CredentialMode::RepositorySecret => String::new(),
        None => TerminalPrompt
            .request_token()
            .context("A token is required to configure promptstash")?,
    };
    config.save(&token, owner, repo, branch, mode)?;

    let gateway = GitHubGateway::new(Arc::new(config));
    let info = gateway.test_connection().await?;
    println!(
        "Connected to {} ({})",
        info.repository,
        if info.private { "private" } else { "public" }
    );
    gateway.ensure_folder_exists().await?;
    let prompts = gateway.fetch_all().await?;
    println!("Configuration saved. {} prompt(s) in the repository.", prompts.len());
    Ok(())
}

async fn list(
    gateway: &GitHubGateway,
    category: Option<String>,
    verified: bool,
    unverified: bool,
    min_rating: Option<u8>,
) -> Result<()> {
    let prompts = gateway.fetch_all().await?;
    let category = category.map(|c| c.trim().to_uppercase());
    let filtered: Vec<RemotePrompt> = prompts
        .into_iter()
        .filter(|p| !verified || p.prompt.verified)
        .filter(|p| !unverified || !p.prompt.verified)
        .filter(|p| category.as_deref().map_or(true, |c| p.prompt.category == c))
        .filter(|p| min_rating.map_or(true, |min| p.prompt.rating.unwrap_or(0) >= min))
        .collect();

    if filtered.is_empty() {
        println!("No prompts found.");
        return Ok(());
    }
    for (category, members) in group_by_category(&filtered) {
        println!("{category} ({})", members.len());
        for member in members {
            let rating = member.prompt.rating.unwrap_or(0) as usize;
            println!(
                "  {:<30} {:<25} {:<5} {}",
                member.filename,
                member.prompt.name,
                "*".repeat(rating),
                if member.prompt.verified { "verified" } else { "" }
            );
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn add(
    gateway: &GitHubGateway,
    settings: SharedStore,
    name: String,
    text: String,
    category: Option<String>,
    rating: Option<u8>,
    verified: bool,
    attachment: Option<PathBuf>,
) -> Result<()> {
    let category = match category {
        Some(category) => {
            let mut registry = CategoryRegistry::new(settings);
            Some(registry.validate_member(&category, Some(gateway)).await?)
        }
        None => None,
    };

    let attachment = match attachment {
        Some(path) => {
            let meta = tokio::fs::metadata(&path)
                .await
                .with_context(|| format!("Cannot read attachment {}", path.display()))?;
            if meta.len() > MAX_ATTACHMENT_BYTES {
                bail!(Error::Validation(
                    "Attachment exceeds the 10 MB limit".to_string()
                ));
            }
            Some(GitHubGateway::process_attachment(&path).await?)
        }
        None => None,
    };

    let record = gateway
        .create(NewPrompt {
            name,
            prompt_text: text,
            category,
            rating,
            verified,
            attachment,
        })
        .await?;
    println!("Saved {}", record.filename);
    Ok(())
}

async fn categories(config: Config, settings: SharedStore, action: CategoryAction) -> Result<()> {
    let gateway = if config.is_configured() {
        Some(GitHubGateway::new(Arc::new(config)))
    } else {
        None
    };
    let mut registry = CategoryRegistry::new(settings);

    match action {
        CategoryAction::List => {
            for category in registry.list(gateway.as_ref()).await {
                println!("{category}");
            }
        }
        CategoryAction::Add { name } => {
            let added = registry.add(&name, gateway.as_ref()).await?;
            println!("Added category {added}");
        }
        CategoryAction::Remove { name } => {
            registry.remove(&name, gateway.as_ref()).await?;
            println!("Removed category {}", name.trim().to_uppercase());
        }
    }
    if registry.is_stale() {
        println!("Warning: the repository copy could not be updated; the change is cached locally.");
    }
    Ok(())
}

async fn find_prompt(gateway: &GitHubGateway, filename: &str) -> Result<RemotePrompt> {
    gateway
        .fetch_all()
        .await?
        .into_iter()
        .find(|p| p.filename == filename)
        .ok_or_else(|| anyhow!("No prompt named {filename} in the repository"))
}
