//! Storage-safe identifiers derived from report topics.
//!
//! Slugs keep ASCII letters and digits plus CJK unified ideographs, so a topic
//! like “中文標題驗證” stays readable as a storage key instead of being
//! transliterated or dropped. Everything else is filtered out. When nothing
//! survives the filter a short random token is used so two unrelated topics
//! do not collapse onto the same key.

use std::fmt;

use time::Date;
use uuid::Uuid;

const FALLBACK_LEN: usize = 8;

/// Derive a slug from free-form text.
///
/// Whitespace runs become a single `-`, unsupported characters are removed,
/// repeated hyphens collapse, and ASCII letters are lowercased.
pub fn slugify(input: &str) -> String {
    let mut filtered = String::with_capacity(input.len());
    let mut in_whitespace = false;

    for ch in input.trim().chars() {
        if ch.is_whitespace() {
            if !in_whitespace {
                filtered.push('-');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;

        if is_slug_char(ch) {
            filtered.push(ch.to_ascii_lowercase());
        }
    }

    let mut collapsed = String::with_capacity(filtered.len());
    for ch in filtered.chars() {
        if ch == '-' && collapsed.ends_with('-') {
            continue;
        }
        collapsed.push(ch);
    }

    let slug = collapsed.trim_matches('-');
    if slug.is_empty() {
        fallback_slug()
    } else {
        slug.to_string()
    }
}

fn is_slug_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '-' || ('\u{4E00}'..='\u{9FFF}').contains(&ch)
}

fn fallback_slug() -> String {
    let mut token = Uuid::new_v4().simple().to_string();
    token.truncate(FALLBACK_LEN);
    token
}

/// Identifier of a stored report: `{slug}-{YYYYMMDD}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReportId(String);

impl ReportId {
    /// Build the identifier for `topic` published on `date`.
    pub fn for_topic(topic: &str, date: Date) -> Self {
        Self(format!(
            "{}-{:04}{:02}{:02}",
            slugify(topic),
            date.year(),
            u8::from(date.month()),
            date.day()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Prefix shared by every object stored for this report.
    pub fn storage_prefix(&self) -> String {
        format!("reports/{}", self.0)
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
