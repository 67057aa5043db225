//! Byline detection: engine author metadata, then textual byline patterns.

use crate::scrapers::specialized::{ArticleEngine, SpecializedFetcher};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, instrument};

/// Returned when neither metadata nor text yields an author.
pub const BYLINE_NOT_FOUND: &str = "not found";

/// Textual byline patterns, tried in order. Group 1 is the candidate name.
pub const BYLINE_PATTERNS: &[&str] = &[
    r"(?m)(?:Oleh|By|Penulis|Reporter|Wartawan)[\s:]+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)",
    r"(?m)([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)\s*[-–—]\s*(?:Reporter|Wartawan|Jurnalis)",
    r"(?m)(?:^|\n)([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)\s*[-–—]\s*[A-Z][a-z]+",
    r"(?m)(?:Ditulis oleh|Written by)\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)",
];

static PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    BYLINE_PATTERNS
        .iter()
        .map(|p| Regex::new(p).expect("valid byline pattern"))
        .collect()
});

#[derive(Debug, Default, Clone, Copy)]
pub struct BylineDetector;

impl BylineDetector {
    pub fn new() -> Self {
        Self
    }

    /// Attribute an author to an article.
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Specialized tier, asked for author metadata first.
    /// * `url` - The article URL.
    /// * `content` - Extracted text, searched when metadata has no author.
    ///
    /// # Returns
    ///
    /// Metadata authors joined with `", "`, else the first textual match, else
    /// [`BYLINE_NOT_FOUND`]. Never fails.
    #[instrument(level = "info", skip_all, fields(%url))]
    pub async fn detect<E: ArticleEngine>(
        &self,
        fetcher: &SpecializedFetcher<E>,
        url: &str,
        content: &str,
    ) -> String {
        match fetcher.authors(url).await {
            Ok(authors) if !authors.is_empty() => return authors.join(", "),
            Ok(_) => debug!("No author metadata"),
            Err(e) => debug!(error = %e, "Author metadata unavailable"),
        }

        self.detect_in_text(content)
            .unwrap_or_else(|| BYLINE_NOT_FOUND.to_string())
    }

    /// First pattern match with at least two name tokens.
    ///
    /// A pattern whose matches are all single words does not stop the search;
    /// later patterns still get a chance.
    pub fn detect_in_text(&self, content: &str) -> Option<String> {
        PATTERNS.iter().find_map(|re| {
            re.captures_iter(content)
                .filter_map(|caps| caps.get(1))
                .map(|m| m.as_str().trim())
                .find(|name| name.split_whitespace().count() >= 2)
                .map(str::to_string)
        })
    }
}
