//! The canonical metadata record (§3) and the invariants it must uphold.

use serde::{Deserialize, Serialize};
use url::Url;

/// A person credited on a piece of content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Person {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: PersonType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PersonType {
    Actor,
    Director,
    Writer,
}

/// The normalized output record for one piece of content.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_date: Option<chrono::NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default)]
    pub studios: Vec<String>,
    #[serde(default)]
    pub series: Vec<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub people: Vec<Person>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backdrop: Option<String>,
    #[serde(default)]
    pub thumbnails: Vec<String>,
    #[serde(default)]
    pub source_urls: Vec<String>,
}

/// Max description length, in characters, enforced by [`Metadata::normalize`].
pub const MAX_DESCRIPTION_CHARS: usize = 4000;

impl Metadata {
    /// Enforces the §3 invariants in place: absolute URLs only, `year` derived
    /// from `release_date`, rating clamped, thumbnails deduplicated and
    /// stripped of anything equal to `primary`/`backdrop`, string sequences
    /// deduplicated and emptied of blank entries.
    pub fn normalize(&mut self) {
        if let Some(desc) = &self.description {
            if desc.chars().count() > MAX_DESCRIPTION_CHARS {
                self.description = Some(truncate_chars(desc, MAX_DESCRIPTION_CHARS));
            }
        }

        if let Some(r) = self.rating {
            self.rating = Some(r.clamp(0.0, 5.0));
        }

        if let Some(date) = self.release_date {
            use chrono::Datelike;
            self.year = Some(date.year());
        }

        self.studios = dedup_non_empty(std::mem::take(&mut self.studios));
        self.series = dedup_non_empty(std::mem::take(&mut self.series));
        self.genres = dedup_non_empty(std::mem::take(&mut self.genres));
        self.tags = dedup_non_empty(std::mem::take(&mut self.tags));

        self.primary = self.primary.take().filter(|u| is_absolute_url(u));
        self.backdrop = self.backdrop.take().filter(|u| is_absolute_url(u));

        let exclude_lower: Vec<String> = [&self.primary, &self.backdrop]
            .into_iter()
            .flatten()
            .map(|u| u.to_lowercase())
            .collect();

        let mut seen = std::collections::HashSet::new();
        self.thumbnails = std::mem::take(&mut self.thumbnails)
            .into_iter()
            .filter(|u| is_absolute_url(u))
            .filter(|u| {
                let lower = u.to_lowercase();
                !exclude_lower.contains(&lower) && seen.insert(lower)
            })
            .collect();

        self.source_urls = dedup_non_empty(std::mem::take(&mut self.source_urls))
            .into_iter()
            .filter(|u| is_absolute_url(u))
            .collect();
    }

    /// Appends `url` to `source_urls` if not already present, keeping the
    /// "originally requested URL is always recorded" rule from §4.1.
    pub fn record_source_url(&mut self, url: &str) {
        if !self.source_urls.iter().any(|u| u == url) {
            self.source_urls.push(url.to_string());
        }
    }
}

fn dedup_non_empty(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .filter(|s| !s.trim().is_empty())
        .filter(|s| seen.insert(s.clone()))
        .collect()
}

/// Mirrors the teacher's `is_valid_url` check, narrowed to "is this a
/// well-formed absolute http(s) URL" since that's the only URL shape
/// the data model allows.
#[must_use]
pub fn is_absolute_url(candidate: &str) -> bool {
    match Url::parse(candidate) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https") && parsed.host().is_some(),
        Err(_) => false,
    }
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        None => s.to_string(),
        Some((byte_idx, _)) => s[..byte_idx].to_string(),
    }
}

/// A hit in a search result list. Never persisted (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub detail_url: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
}
