//! Data models exchanged between the scraping tiers and the batch driver.
//!
//! - [`ExtractionResult`]: what any fetch tier hands back for one URL
//! - [`ExtractionMethod`]: which tier produced it
//! - [`InputRow`]: one URL to process, optionally with a pre-existing snippet
//! - [`AnalysisRecord`]: one output row, carrying extraction fields plus the
//!   optional byline, sentiment and summary columns
//! - [`Sentiment`], [`Summary`]: results of the generative-service analyses

use serde::{Deserialize, Serialize};
use std::fmt;

/// Marker written into the content column when every tier failed.
pub const FAILED_SCRAPING: &str = "failed scraping";

/// The tier that produced an [`ExtractionResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Download+parse through the article engine.
    Specialized,
    /// Generic GET plus the heuristic extractor with boilerplate removal.
    GenericFull,
    /// Generic GET plus the heuristic extractor, no structural removal.
    GenericBasic,
    /// All tiers exhausted.
    Failed,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::Specialized => "specialized",
            ExtractionMethod::GenericFull => "generic_full",
            ExtractionMethod::GenericBasic => "generic_basic",
            ExtractionMethod::Failed => "failed",
        }
    }
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The unit exchanged between all fetch stages.
///
/// `method == Failed` always comes with empty content; use
/// [`ExtractionResult::failed`] to build one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub url: String,
    pub content: String,
    pub title: Option<String>,
    pub publish_date: Option<String>,
    pub authors: Vec<String>,
    pub method: ExtractionMethod,
}

impl ExtractionResult {
    pub fn failed(url: &str) -> Self {
        Self {
            url: url.to_string(),
            content: String::new(),
            title: None,
            publish_date: None,
            authors: Vec::new(),
            method: ExtractionMethod::Failed,
        }
    }

    /// Content length in characters, which is what every threshold counts.
    pub fn content_chars(&self) -> usize {
        self.content.chars().count()
    }
}

/// One row of batch input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputRow {
    pub url: String,
    #[serde(default)]
    pub snippet: Option<String>,
}

impl InputRow {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            snippet: None,
        }
    }
}

/// Context-scoped sentiment classification returned by the model.
///
/// Fields are free text: the category set depends on the user-provided
/// context, and confidence is whatever label the model chose.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Sentiment {
    #[serde(default)]
    pub sentiment: String,
    #[serde(default)]
    pub confidence: String,
    #[serde(default)]
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub summary: String,
    pub word_count: usize,
}

/// One output row per input row, immutable once emitted.
///
/// Optional columns are only present when the corresponding feature was
/// enabled for the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub url: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<ExtractionMethod>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub byline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl AnalysisRecord {
    pub fn new(url: &str, title: String) -> Self {
        Self {
            url: url.to_string(),
            title,
            content: None,
            method: None,
            authors: Vec::new(),
            publish_date: None,
            byline: None,
            sentiment: None,
            summary: None,
        }
    }
}
