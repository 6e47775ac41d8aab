//! Data models for prompt records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::category::DEFAULT_CATEGORY;
use crate::error::{Error, Result};
use crate::util::generate_id;

/// File attachment embedded in a prompt document.
///
/// `data` carries the whole file as a base64 data URL, so attachments travel
/// inside the prompt's JSON blob rather than as separate repository files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Original filename
    pub name: String,
    /// MIME type
    #[serde(rename = "type")]
    pub content_type: String,
    /// Size in bytes
    pub size: u64,
    /// `data:{mime};base64,{payload}` URL
    pub data: String,
}

/// A prompt document as stored in the repository, one JSON file per prompt.
///
/// Field names follow the stored wire format (camelCase), so documents written
/// by earlier versions of the store parse unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prompt {
    /// Generated identifier (time + random, base36)
    pub id: String,
    /// Human-readable name; the filename slug is derived from this once
    pub name: String,
    /// The prompt text itself
    pub prompt_text: String,
    /// Category label, validated against the category registry
    #[serde(default = "default_category")]
    pub category: String,
    /// Star rating, 0-5
    #[serde(default)]
    pub rating: Option<u8>,
    /// Whether the prompt has been verified to work
    #[serde(default)]
    pub verified: bool,
    /// Optional embedded attachment
    #[serde(default)]
    pub attachment: Option<Attachment>,
    /// When the prompt was created
    pub created_at: DateTime<Utc>,
    /// Last time the prompt was modified
    pub updated_at: DateTime<Utc>,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

/// Input for creating a prompt, before generated fields are assigned.
#[derive(Debug, Clone, Default)]
pub struct NewPrompt {
    pub name: String,
    pub prompt_text: String,
    pub category: Option<String>,
    pub rating: Option<u8>,
    pub verified: bool,
    pub attachment: Option<Attachment>,
}

impl NewPrompt {
    /// Check required fields. Runs before any network call.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push("Name is required");
        }
        if self.prompt_text.trim().is_empty() {
            errors.push("Prompt text is required");
        }
        if self.rating.is_some_and(|r| r > 5) {
            errors.push("Rating must be between 0 and 5");
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(errors.join(", ")))
        }
    }

    /// Assign id and timestamps, producing the document to be stored.
    pub fn into_prompt(self) -> Prompt {
        let now = Utc::now();
        Prompt {
            id: generate_id(),
            name: self.name,
            prompt_text: self.prompt_text,
            category: self.category.unwrap_or_else(default_category),
            rating: self.rating,
            verified: self.verified,
            attachment: self.attachment,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A prompt together with its remote identity.
///
/// The SHA is GitHub's concurrency token: it changes on every successful write
/// and must be re-fetched before the next update or delete.
#[derive(Debug, Clone, PartialEq)]
pub struct RemotePrompt {
    pub prompt: Prompt,
    /// Remote filename, e.g. `my_test_prompt.json`
    pub filename: String,
    /// Blob SHA at the time of the last read
    pub sha: String,
}

/// Group prompts by category for display.
///
/// Categories are ordered DEFAULT first, then alphabetically; within a
/// category, newest first.
pub fn group_by_category(prompts: &[RemotePrompt]) -> Vec<(String, Vec<RemotePrompt>)> {
    let mut groups: Vec<(String, Vec<RemotePrompt>)> = Vec::new();
    for prompt in prompts {
        let category = prompt.prompt.category.clone();
        match groups.iter_mut().find(|(name, _)| *name == category) {
            Some((_, members)) => members.push(prompt.clone()),
            None => groups.push((category, vec![prompt.clone()])),
        }
    }
    for (_, members) in &mut groups {
        members.sort_by(|a, b| b.prompt.created_at.cmp(&a.prompt.created_at));
    }
    groups.sort_by(|a, b| {
        if a.0 == DEFAULT_CATEGORY {
            std::cmp::Ordering::Less
        } else if b.0 == DEFAULT_CATEGORY {
            std::cmp::Ordering::Greater
        } else {
            a.0.cmp(&b.0)
        }
    });
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn remote(name: &str, category: &str, created_secs: i64) -> RemotePrompt {
        let created = Utc.timestamp_opt(created_secs, 0).unwrap();
        RemotePrompt {
            prompt: Prompt {
                id: format!("id-{name}"),
                name: name.to_string(),
                prompt_text: "text".to_string(),
                category: category.to_string(),
                rating: None,
                verified: false,
                attachment: None,
                created_at: created,
                updated_at: created,
            },
            filename: format!("{name}.json"),
            sha: "abc".to_string(),
        }
    }

    #[test]
    fn validate_rejects_missing_fields() {
        let err = NewPrompt::default().validate().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Name is required"));
        assert!(message.contains("Prompt text is required"));
    }

    #[test]
    fn validate_rejects_out_of_range_rating() {
        let new_prompt = NewPrompt {
            name: "n".to_string(),
            prompt_text: "t".to_string(),
            rating: Some(6),
            ..Default::default()
        };
        assert!(new_prompt.validate().is_err());
    }

    #[test]
    fn into_prompt_fills_generated_fields() {
        let prompt = NewPrompt {
            name: "My Prompt".to_string(),
            prompt_text: "Do the thing".to_string(),
            ..Default::default()
        }
        .into_prompt();
        assert!(!prompt.id.is_empty());
        assert_eq!(prompt.category, DEFAULT_CATEGORY);
        assert_eq!(prompt.created_at, prompt.updated_at);
    }

    #[test]
    fn prompt_parses_stored_wire_format() {
        let json = r#"{
            "id": "abc123",
            "name": "Review helper",
            "promptText": "Review this code",
            "category": "CODING",
            "rating": 4,
            "verified": true,
            "attachment": null,
            "createdAt": "2024-05-01T10:00:00.000Z",
            "updatedAt": "2024-05-02T11:30:00.000Z"
        }"#;
        let prompt: Prompt = serde_json::from_str(json).expect("parse");
        assert_eq!(prompt.prompt_text, "Review this code");
        assert_eq!(prompt.rating, Some(4));
        assert!(prompt.verified);
    }

    #[test]
    fn prompt_defaults_missing_optional_fields() {
        let json = r#"{
            "id": "abc123",
            "name": "Bare",
            "promptText": "text",
            "createdAt": "2024-05-01T10:00:00Z",
            "updatedAt": "2024-05-01T10:00:00Z"
        }"#;
        let prompt: Prompt = serde_json::from_str(json).expect("parse");
        assert_eq!(prompt.category, DEFAULT_CATEGORY);
        assert_eq!(prompt.rating, None);
        assert!(!prompt.verified);
        assert!(prompt.attachment.is_none());
    }

    #[test]
    fn group_by_category_orders_default_first_then_alpha() {
        let prompts = vec![
            remote("w", "WRITING", 100),
            remote("d1", "DEFAULT", 50),
            remote("a", "ANALYSIS", 10),
            remote("d2", "DEFAULT", 200),
        ];
        let groups = group_by_category(&prompts);
        let names: Vec<&str> = groups.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["DEFAULT", "ANALYSIS", "WRITING"]);

        // newest first inside a group
        let default_group = &groups[0].1;
        assert_eq!(default_group[0].prompt.name, "d2");
        assert_eq!(default_group[1].prompt.name, "d1");
    }
}
