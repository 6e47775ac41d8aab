//! Filename and identifier derivation for prompt records

use chrono::Utc;
use rand::Rng;

const BASE36_DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Derive a stable, filesystem-safe slug from a prompt name.
///
/// Lowercases the name, maps every character outside `[a-z0-9_-]` to an
/// underscore, collapses runs of underscores, and trims them from the edges.
/// The slug is computed once at creation time and never changes afterwards,
/// even if the prompt is renamed.
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.to_lowercase().chars() {
        let mapped = match c {
            'a'..='z' | '0'..='9' | '-' | '_' => c,
            _ => '_',
        };
        if mapped == '_' && out.ends_with('_') {
            continue;
        }
        out.push(mapped);
    }
    out.trim_matches('_').to_string()
}

/// Generate a prompt identifier: current time in base36 plus a random suffix.
pub fn generate_id() -> String {
    let millis = Utc::now().timestamp_millis().max(0) as u128;
    let salt: u64 = rand::rng().random();
    format!("{}{}", to_base36(millis), to_base36(salt as u128))
}

fn to_base36(mut n: u128) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(BASE36_DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("My Test! Prompt"), "my_test_prompt");
    }

    #[test]
    fn test_slugify_preserves_hyphens_and_underscores() {
        assert_eq!(slugify("code-review_helper"), "code-review_helper");
    }

    #[test]
    fn test_slugify_collapses_runs() {
        assert_eq!(slugify("a   !!!   b"), "a_b");
    }

    #[test]
    fn test_slugify_trims_edges() {
        assert_eq!(slugify("  padded  "), "padded");
        assert_eq!(slugify("!leading and trailing!"), "leading_and_trailing");
    }

    #[test]
    fn test_slugify_lowercases() {
        assert_eq!(slugify("SHOUTY Name"), "shouty_name");
    }

    #[test]
    fn test_generate_id_unique_and_lowercase() {
        let a = generate_id();
        let b = generate_id();
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_to_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }
}
