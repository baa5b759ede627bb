//! Book metadata and page models.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Normalized bibliographic metadata for one book file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookInfo {
    /// Book title. Never empty once returned by a reader.
    pub title: String,

    /// Sub-titles, in document order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subtitle: Vec<String>,

    /// Language codes (e.g., "en", "fr").
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub language: Vec<String>,

    /// Description or summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Series name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,

    /// Position in the series, kept verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_index: Option<String>,

    /// Number of pages (0 when unknown).
    pub pages: u32,

    /// Authors, deduplicated in first-seen order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,

    /// Publisher name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,

    /// Publication date as `YYYY`, `YYYY-MM` or `YYYY-MM-DD`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,

    /// Keywords and subjects, deduplicated in first-seen order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
}

impl BookInfo {
    /// Create a record carrying only the filename-derived title.
    pub fn from_path(path: &Path) -> Self {
        Self {
            title: file_stem(path),
            ..Self::default()
        }
    }

    /// Fill the title from the filename stem when no structured title was found.
    pub fn ensure_title(&mut self, path: &Path) {
        if self.title.trim().is_empty() {
            self.title = file_stem(path);
        }
    }
}

/// The filename minus its extension, or "Unknown" for paths without one.
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "Unknown".to_string())
}

/// One extracted page image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Path relative to the output folder, always `/`-separated.
    pub path: String,

    /// Width in pixels (> 0).
    pub width: u32,

    /// Height in pixels (> 0).
    pub height: u32,
}

/// Outcome of a page extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractReport {
    /// Extracted pages in reading order.
    pub pages: Vec<Page>,

    /// Image entries dropped because their dimensions could not be probed.
    pub dropped: usize,
}

/// Split a comma-delimited field, trimming fragments and dropping empty ones.
pub fn split_comma_delimited(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Remove duplicates while keeping the first occurrence of each value.
pub fn dedup_preserving_order(values: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::with_capacity(values.len());
    values
        .into_iter()
        .filter(|v| seen.insert(v.clone()))
        .collect()
}
