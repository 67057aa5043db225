//! The batch driver: one [`AnalysisRecord`] per [`InputRow`], in input order.
//!
//! Rows are processed one at a time. Every enabled feature runs for every row
//! and writes either its result or a status string, so a record never has a
//! missing column because an earlier stage failed.

use crate::analysis::{SentimentAnalyzer, Summarizer, SummaryConfig};
use crate::api::Generate;
use crate::models::{
    AnalysisRecord, ExtractionMethod, ExtractionResult, FAILED_SCRAPING, InputRow, Sentiment,
};
use crate::scrapers::byline::BylineDetector;
use crate::scrapers::orchestrator::Scraper;
use crate::scrapers::specialized::ArticleEngine;
use crate::utils::truncate_for_log;
use futures::stream::{self, StreamExt};
use std::time::Duration;
use tracing::{info, instrument, warn};

pub const BYLINE_NO_CONTENT: &str = "no content to analyze";
pub const SENTIMENT_FAILED: &str = "analysis failed";
pub const SENTIMENT_NO_CONTENT: &str = "article could not be opened";
pub const SUMMARY_FAILED: &str = "failed to summarize";
pub const SUMMARY_TOO_SHORT: &str = "content too short to summarize";

/// Scraped content at or below this many characters is replaced by the
/// row's snippet for analysis.
const MIN_ANALYSIS_CHARS: usize = 10;
const MIN_SENTIMENT_CHARS: usize = 5;
const MIN_SUMMARY_CHARS: usize = 50;

/// Which features run for a batch.
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    /// Record content and method. When off, pages are still fetched in basic
    /// mode to feed the analyses.
    pub scrape: bool,
    pub basic_only: bool,
    pub timeout: Duration,
    pub byline: bool,
    pub sentiment_context: Option<String>,
    pub summary: Option<SummaryConfig>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            scrape: true,
            basic_only: false,
            timeout: Duration::from_secs(30),
            byline: false,
            sentiment_context: None,
            summary: None,
        }
    }
}

impl AnalysisOptions {
    pub fn needs_generator(&self) -> bool {
        self.sentiment_context.is_some() || self.summary.is_some()
    }
}

pub struct Analyzer<E, G> {
    scraper: Scraper<E>,
    byline: BylineDetector,
    generator: Option<G>,
}

impl<E: ArticleEngine, G: Generate> Analyzer<E, G> {
    /// `generator` may be `None` when no sentiment or summary is requested;
    /// those columns then carry their failure status.
    pub fn new(scraper: Scraper<E>, generator: Option<G>) -> Self {
        Self {
            scraper,
            byline: BylineDetector::new(),
            generator,
        }
    }

    /// Process every row sequentially.
    ///
    /// # Arguments
    ///
    /// * `rows` - Input rows; each needs a URL, the snippet is optional.
    /// * `options` - Which features run, shared by every row.
    ///
    /// # Returns
    ///
    /// Exactly `rows.len()` records in input order. A row whose fetch failed
    /// still gets a record, with status strings in the enabled columns.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let analyzer = Analyzer::new(scraper, Some(generator));
    /// let options = AnalysisOptions { byline: true, ..Default::default() };
    /// let records = analyzer.process(&rows, &options).await;
    /// assert_eq!(records.len(), rows.len());
    /// ```
    #[instrument(level = "info", skip_all, fields(rows = rows.len()))]
    pub async fn process(
        &self,
        rows: &[InputRow],
        options: &AnalysisOptions,
    ) -> Vec<AnalysisRecord> {
        let total = rows.len();
        stream::iter(rows.iter().enumerate())
            .then(|(index, row)| self.process_row(index, total, row, options))
            .collect()
            .await
    }

    #[instrument(level = "info", skip_all, fields(row = index + 1, url = %truncate_for_log(&row.url, 60)))]
    async fn process_row(
        &self,
        index: usize,
        total: usize,
        row: &InputRow,
        options: &AnalysisOptions,
    ) -> AnalysisRecord {
        let url = row.url.trim();
        let basic_only = options.basic_only || !options.scrape;
        let scraped = self.scraper.scrape(url, options.timeout, basic_only).await;

        let title = match scraped.as_ref().and_then(|r| r.title.clone()) {
            Some(title) => title,
            None => self.scraper.fetch_title(url, options.timeout).await,
        };
        let extraction = scraped.unwrap_or_else(|| ExtractionResult::failed(url));
        let mut record = AnalysisRecord::new(url, title);

        if options.scrape {
            if extraction.method == ExtractionMethod::Failed {
                record.content = Some(FAILED_SCRAPING.to_string());
                warn!(row = index + 1, total, "Row failed scraping");
            } else {
                record.content = Some(extraction.content.clone());
                record.authors = extraction.authors.clone();
                record.publish_date = extraction.publish_date.clone();
                info!(
                    row = index + 1,
                    total,
                    method = %extraction.method,
                    chars = extraction.content_chars(),
                    "Row scraped"
                );
            }
            record.method = Some(extraction.method);
        }

        let text = analysis_text(&extraction.content, row.snippet.as_deref());

        if options.byline {
            record.byline = Some(if text.is_empty() {
                BYLINE_NO_CONTENT.to_string()
            } else {
                self.byline
                    .detect(self.scraper.specialized(), url, text)
                    .await
            });
        }

        if let Some(context) = &options.sentiment_context {
            record.sentiment = Some(self.sentiment(text, context).await);
        }

        if let Some(config) = &options.summary {
            record.summary = Some(self.summary(text, config).await);
        }

        record
    }

    async fn sentiment(&self, text: &str, context: &str) -> Sentiment {
        if text.trim().chars().count() <= MIN_SENTIMENT_CHARS {
            return status(SENTIMENT_NO_CONTENT, "not enough content for analysis");
        }
        let analyzed = match &self.generator {
            Some(generator) => SentimentAnalyzer::new(generator).analyze(text, context).await,
            None => None,
        };
        analyzed.unwrap_or_else(|| status(SENTIMENT_FAILED, "error in model analysis"))
    }

    async fn summary(&self, text: &str, config: &SummaryConfig) -> String {
        if text.trim().chars().count() <= MIN_SUMMARY_CHARS {
            return SUMMARY_TOO_SHORT.to_string();
        }
        let summarized = match &self.generator {
            Some(generator) => Summarizer::new(generator).summarize(text, config).await,
            None => None,
        };
        summarized
            .map(|s| s.summary)
            .unwrap_or_else(|| SUMMARY_FAILED.to_string())
    }
}

/// Scraped content when it is substantial, else the row's snippet.
fn analysis_text<'a>(content: &'a str, snippet: Option<&'a str>) -> &'a str {
    if content.trim().chars().count() > MIN_ANALYSIS_CHARS {
        content
    } else {
        snippet.unwrap_or("")
    }
}

fn status(label: &str, reasoning: &str) -> Sentiment {
    Sentiment {
        sentiment: label.to_string(),
        confidence: String::new(),
        reasoning: reasoning.to_string(),
    }
}
