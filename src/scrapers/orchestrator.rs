//! The extraction cascade: specialized engine first, heuristic extractor second.
//!
//! ```text
//! START ── pacing delay ──> specialized ──(> 200 chars)──> SUCCESS (specialized)
//!                               │
//!                       short / error
//!                               ▼
//!                       generic GET ──error──> FAILURE (None)
//!                               │
//!                   extractor (basic | full) ──> SUCCESS (generic_basic | generic_full)
//! ```
//!
//! No tier is retried; each failure moves to the next tier. Nothing is kept
//! between calls apart from the identity pool and the HTTP connection pool.

use crate::error::FetchError;
use crate::models::{ExtractionMethod, ExtractionResult};
use crate::scrapers::extractor::{self, ExtractMode, MIN_CANDIDATE_CHARS};
use crate::scrapers::generic::{GenericFetcher, build_client};
use crate::scrapers::identity::{IdentityRotator, PoolStats};
use crate::scrapers::specialized::{ArticleEngine, DomArticleEngine, SpecializedFetcher};
use crate::settings::ScraperSettings;
use crate::utils::truncate_for_log;
use rand::Rng;
use scraper::Html;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Title column value when no tier yields a title.
pub const TITLE_NOT_FOUND: &str = "failed to fetch title";

/// Per-URL extraction entry point.
#[derive(Debug, Clone)]
pub struct Scraper<E> {
    specialized: SpecializedFetcher<E>,
    generic: GenericFetcher,
    rotator: Arc<IdentityRotator>,
    pacing: RangeInclusive<Duration>,
}

impl Scraper<DomArticleEngine> {
    /// Wire up both tiers over one shared HTTP client and identity pool.
    pub fn from_settings(settings: &ScraperSettings) -> Result<Self, FetchError> {
        let client = build_client()?;
        let rotator = Arc::new(settings.rotator());
        let engine = DomArticleEngine::new(client.clone(), settings.engine_timeout());
        Ok(Self::new(
            SpecializedFetcher::new(engine, Arc::clone(&rotator)),
            GenericFetcher::new(client, Arc::clone(&rotator)),
            rotator,
        )
        .with_pacing(settings.pacing()))
    }
}

impl<E: ArticleEngine> Scraper<E> {
    /// Assemble a scraper from its two tiers.
    ///
    /// # Arguments
    ///
    /// * `specialized` - First tier, wrapping an [`ArticleEngine`].
    /// * `generic` - Fallback tier feeding the heuristic extractor.
    /// * `rotator` - The identity pool both tiers draw from; kept here for
    ///   [`pool_stats`](Self::pool_stats).
    ///
    /// Pacing defaults to a random 0.5 to 2 second pause before each URL.
    pub fn new(
        specialized: SpecializedFetcher<E>,
        generic: GenericFetcher,
        rotator: Arc<IdentityRotator>,
    ) -> Self {
        Self {
            specialized,
            generic,
            rotator,
            pacing: Duration::from_millis(500)..=Duration::from_millis(2000),
        }
    }

    /// Replace the pause window taken before each URL.
    ///
    /// An upper bound of zero disables pacing entirely.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let scraper = Scraper::from_settings(&settings)?
    ///     .with_pacing(Duration::ZERO..=Duration::ZERO);
    /// ```
    pub fn with_pacing(mut self, pacing: RangeInclusive<Duration>) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn specialized(&self) -> &SpecializedFetcher<E> {
        &self.specialized
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.rotator.stats()
    }

    /// Extract one URL through the tier cascade.
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute http(s) URL; anything else fails without a request.
    /// * `timeout` - Deadline for the generic GET.
    /// * `basic_only` - Skip boilerplate removal in the generic tier.
    ///
    /// # Returns
    ///
    /// The specialized result when its text exceeds [`MIN_CANDIDATE_CHARS`],
    /// otherwise the generic result, even if its content is empty. `None`
    /// means the URL was invalid or the generic GET failed.
    #[instrument(level = "info", skip_all, fields(url = %truncate_for_log(url, 60), basic_only))]
    pub async fn scrape(
        &self,
        url: &str,
        timeout: Duration,
        basic_only: bool,
    ) -> Option<ExtractionResult> {
        match self.try_scrape(url, timeout, basic_only).await {
            Ok(result) => {
                info!(method = %result.method, chars = result.content_chars(), "Scraped");
                Some(result)
            }
            Err(e) => {
                warn!(error = %e, network = e.is_network(), "All tiers failed");
                None
            }
        }
    }

    async fn try_scrape(
        &self,
        url: &str,
        timeout: Duration,
        basic_only: bool,
    ) -> Result<ExtractionResult, FetchError> {
        validate_url(url)?;
        self.pace().await;

        // The engine's metadata title outranks the manual one even when its
        // text is too short to keep.
        let engine_title = match self.specialized.fetch(url).await {
            Ok(result) if result.content_chars() > MIN_CANDIDATE_CHARS => return Ok(result),
            Ok(result) => {
                debug!(chars = result.content_chars(), "Engine text too short; falling back");
                result.title
            }
            Err(e) => {
                debug!(error = %e, parse = e.is_parse(), "Engine failed; falling back");
                e.into_title()
            }
        };

        let markup = self.generic.fetch(url, timeout).await?;
        let document = Html::parse_document(&markup);

        let (mode, method) = if basic_only {
            (ExtractMode::Basic, ExtractionMethod::GenericBasic)
        } else {
            (ExtractMode::Full, ExtractionMethod::GenericFull)
        };

        Ok(ExtractionResult {
            url: url.to_string(),
            content: extractor::extract_document(&document, mode),
            title: engine_title.or_else(|| extractor::extract_title(&document)),
            publish_date: None,
            authors: Vec::new(),
            method,
        })
    }

    /// Resolve a title: engine metadata first, then the title-selector table
    /// over a generic fetch, then [`TITLE_NOT_FOUND`].
    #[instrument(level = "info", skip_all, fields(url = %truncate_for_log(url, 60)))]
    pub async fn fetch_title(&self, url: &str, timeout: Duration) -> String {
        if validate_url(url).is_err() {
            return TITLE_NOT_FOUND.to_string();
        }

        match self.specialized.title(url).await {
            Ok(Some(title)) => return title,
            Ok(None) => debug!("Engine found no title"),
            Err(e) => debug!(error = %e, "Engine title lookup failed"),
        }

        match self.generic.fetch(url, timeout).await {
            Ok(markup) => {
                let document = Html::parse_document(&markup);
                extractor::extract_title(&document).unwrap_or_else(|| TITLE_NOT_FOUND.to_string())
            }
            Err(e) => {
                warn!(error = %e, "Manual title extraction failed");
                TITLE_NOT_FOUND.to_string()
            }
        }
    }

    async fn pace(&self) {
        let (lo, hi) = (*self.pacing.start(), *self.pacing.end());
        if hi.is_zero() {
            return;
        }
        let delay = if lo >= hi {
            lo
        } else {
            rand::rng().random_range(lo..=hi)
        };
        debug!(?delay, "Pacing");
        sleep(delay).await;
    }
}

fn validate_url(url: &str) -> Result<(), FetchError> {
    let invalid = |reason: String| FetchError::InvalidUrl {
        url: url.to_string(),
        reason,
    };
    let parsed = Url::parse(url.trim()).map_err(|e| invalid(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(invalid(format!("unsupported scheme {other}"))),
    }
}
