//! The specialized tier: one download+parse through an article engine.
//!
//! [`ArticleEngine`] is the boundary to the article-extraction engine. The
//! shipped [`DomArticleEngine`] reads structured metadata (JSON-LD, Open Graph
//! and article meta tags) and takes the body from the element whose direct
//! paragraphs carry the most text. It handles clean article templates well and
//! gives up quietly on heavily templated pages, which is what the heuristic
//! tier is for.

use crate::error::FetchError;
use crate::models::{ExtractionMethod, ExtractionResult};
use crate::scrapers::extractor;
use crate::scrapers::generic::download;
use crate::scrapers::identity::{IdentityRotator, RequestIdentity};
use itertools::Itertools;
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Trimmed engine text must be strictly longer than this.
pub const MIN_SPECIALIZED_CHARS: usize = 100;

/// Schema.org types treated as articles in JSON-LD.
const ARTICLE_TYPES: &[&str] = &[
    "Article",
    "NewsArticle",
    "ReportageNewsArticle",
    "AnalysisNewsArticle",
    "OpinionNewsArticle",
    "BlogPosting",
];

/// What the engine returns for one URL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedArticle {
    pub text: String,
    pub title: Option<String>,
    pub publish_date: Option<String>,
    pub authors: Vec<String>,
}

/// Download+parse boundary of an article-extraction engine.
pub trait ArticleEngine {
    /// Fetch `url` as `identity` and parse it into an article.
    async fn download_and_parse(
        &self,
        url: &str,
        identity: &RequestIdentity,
    ) -> Result<ParsedArticle, FetchError>;
}

#[derive(Debug, Clone)]
pub struct DomArticleEngine {
    client: Client,
    timeout: Duration,
}

impl DomArticleEngine {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

impl ArticleEngine for DomArticleEngine {
    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn download_and_parse(
        &self,
        url: &str,
        identity: &RequestIdentity,
    ) -> Result<ParsedArticle, FetchError> {
        let download = download(&self.client, url, identity, self.timeout).await?;
        if !download.is_html() {
            return Err(FetchError::Parse(format!(
                "unsupported content type {}",
                download.content_type.as_deref().unwrap_or("?")
            )));
        }
        Ok(parse_article(&download.text()))
    }
}

static SELECTORS: Lazy<EngineSelectors> = Lazy::new(|| EngineSelectors {
    json_ld: Selector::parse("script[type=\"application/ld+json\"]").expect("static selector"),
    paragraph: Selector::parse("p").expect("static selector"),
    og_title: Selector::parse("meta[property=\"og:title\"]").expect("static selector"),
    published: Selector::parse(
        "meta[property=\"article:published_time\"], meta[name=\"pubdate\"], \
         meta[name=\"publishdate\"], meta[itemprop=\"datePublished\"]",
    )
    .expect("static selector"),
    time: Selector::parse("time[datetime]").expect("static selector"),
    meta_author: Selector::parse("meta[name=\"author\"], meta[property=\"article:author\"]")
        .expect("static selector"),
    rel_author: Selector::parse("[rel=\"author\"]").expect("static selector"),
});

struct EngineSelectors {
    json_ld: Selector,
    paragraph: Selector,
    og_title: Selector,
    published: Selector,
    time: Selector,
    meta_author: Selector,
    rel_author: Selector,
}

/// Metadata pulled from the first article-typed JSON-LD block.
#[derive(Debug, Default)]
struct JsonLd {
    title: Option<String>,
    published: Option<String>,
    authors: Vec<String>,
}

/// Parse article markup the way the engine does.
pub fn parse_article(markup: &str) -> ParsedArticle {
    let document = Html::parse_document(markup);
    let ld = json_ld(&document);

    let title = ld
        .title
        .or_else(|| meta_content(&document, &SELECTORS.og_title))
        .or_else(|| extractor::extract_title(&document));

    let publish_date = ld
        .published
        .or_else(|| meta_content(&document, &SELECTORS.published))
        .or_else(|| {
            document
                .select(&SELECTORS.time)
                .find_map(|t| t.value().attr("datetime"))
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        });

    let authors = ld
        .authors
        .into_iter()
        .chain(meta_authors(&document))
        .map(|a| collapse(&a))
        .filter(|a| !a.is_empty())
        .unique()
        .collect();

    ParsedArticle {
        text: top_node_text(&document),
        title,
        publish_date,
        authors,
    }
}

fn collapse(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn meta_content(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .filter_map(|m| m.value().attr("content"))
        .map(collapse)
        .find(|s| !s.is_empty())
}

fn meta_authors(document: &Html) -> Vec<String> {
    let from_meta = document
        .select(&SELECTORS.meta_author)
        .filter_map(|m| m.value().attr("content"))
        // article:author is frequently a profile URL
        .filter(|c| !c.starts_with("http"))
        .map(str::to_string);
    let from_rel = document
        .select(&SELECTORS.rel_author)
        .map(|a| a.text().collect::<String>());
    from_meta.chain(from_rel).collect()
}

fn is_article_type(item: &Value) -> bool {
    match item.get("@type") {
        Some(Value::String(t)) => ARTICLE_TYPES.contains(&t.as_str()),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .any(|t| ARTICLE_TYPES.contains(&t)),
        _ => false,
    }
}

fn find_article(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(items) => items.iter().find_map(find_article),
        Value::Object(_) if is_article_type(value) => Some(value),
        Value::Object(_) => value.get("@graph").and_then(find_article),
        _ => None,
    }
}

fn author_names(value: &Value) -> Vec<String> {
    match value {
        Value::String(name) => vec![name.clone()],
        Value::Object(_) => value
            .get("name")
            .and_then(Value::as_str)
            .map(|n| vec![n.to_string()])
            .unwrap_or_default(),
        Value::Array(items) => items.iter().flat_map(author_names).collect(),
        _ => Vec::new(),
    }
}

fn json_ld(document: &Html) -> JsonLd {
    for script in document.select(&SELECTORS.json_ld) {
        let raw = script.text().collect::<String>();
        let raw = raw
            .trim()
            .trim_start_matches("<![CDATA[")
            .trim_end_matches("]]>")
            .trim();
        let Ok(parsed) = serde_json::from_str::<Value>(raw) else {
            debug!("Skipping malformed JSON-LD block");
            continue;
        };
        let Some(article) = find_article(&parsed) else {
            continue;
        };

        let text_field = |key: &str| {
            article
                .get(key)
                .and_then(Value::as_str)
                .map(collapse)
                .filter(|s| !s.is_empty())
        };
        return JsonLd {
            title: text_field("headline").or_else(|| text_field("name")),
            published: text_field("datePublished"),
            authors: article.get("author").map(author_names).unwrap_or_default(),
        };
    }
    JsonLd::default()
}

/// Body text from the element whose direct `<p>` children hold the most text.
///
/// Paragraphs of that element are joined with blank lines. Earlier elements
/// win ties.
fn top_node_text(document: &Html) -> String {
    let mut scores: Vec<(ElementRef, usize)> = Vec::new();
    for p in document.select(&SELECTORS.paragraph) {
        let Some(parent) = p.parent().and_then(ElementRef::wrap) else {
            continue;
        };
        let chars = collapse(&p.text().collect::<String>()).chars().count();
        match scores.iter_mut().find(|(e, _)| e.id() == parent.id()) {
            Some((_, score)) => *score += chars,
            None => scores.push((parent, chars)),
        }
    }

    let mut best: Option<(ElementRef, usize)> = None;
    for (element, score) in scores {
        if best.is_none_or(|(_, s)| score > s) {
            best = Some((element, score));
        }
    }
    let Some((top, _)) = best else {
        return String::new();
    };

    top.children()
        .filter_map(ElementRef::wrap)
        .filter(|c| c.value().name() == "p")
        .map(|p| collapse(&p.text().collect::<String>()))
        .filter(|t| !t.is_empty())
        .join("\n\n")
}

/// First tier of the cascade.
#[derive(Debug, Clone)]
pub struct SpecializedFetcher<E> {
    engine: E,
    rotator: Arc<IdentityRotator>,
}

impl<E: ArticleEngine> SpecializedFetcher<E> {
    pub fn new(engine: E, rotator: Arc<IdentityRotator>) -> Self {
        Self { engine, rotator }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Download and parse `url`, failing unless the text is long enough.
    ///
    /// # Arguments
    ///
    /// * `url` - Article to fetch under a freshly picked identity.
    ///
    /// # Errors
    ///
    /// * [`FetchError::EmptyContent`] when the trimmed text is not longer than
    ///   [`MIN_SPECIALIZED_CHARS`]. The engine's title rides along so the
    ///   next tier can still use it.
    /// * Any engine error, unchanged.
    #[instrument(level = "info", skip_all, fields(%url))]
    pub async fn fetch(&self, url: &str) -> Result<ExtractionResult, FetchError> {
        let article = self.parse(url).await?;
        accept(url, article)
    }

    async fn parse(&self, url: &str) -> Result<ParsedArticle, FetchError> {
        let identity = self.rotator.pick();
        self.engine.download_and_parse(url, &identity).await
    }

    /// Author metadata for `url`, regardless of how much text the page has.
    #[instrument(level = "info", skip_all, fields(%url))]
    pub async fn authors(&self, url: &str) -> Result<Vec<String>, FetchError> {
        Ok(self.parse(url).await?.authors)
    }

    /// Title metadata for `url`, regardless of how much text the page has.
    pub async fn title(&self, url: &str) -> Result<Option<String>, FetchError> {
        Ok(self.parse(url).await?.title.filter(|t| !t.is_empty()))
    }
}

fn accept(url: &str, article: ParsedArticle) -> Result<ExtractionResult, FetchError> {
    let content = article.text.trim();
    let chars = content.chars().count();
    if chars <= MIN_SPECIALIZED_CHARS {
        return Err(FetchError::EmptyContent {
            chars,
            min: MIN_SPECIALIZED_CHARS,
            title: article.title.filter(|t| !t.is_empty()),
        });
    }

    info!(chars, authors = article.authors.len(), "Engine parsed article");
    Ok(ExtractionResult {
        url: url.to_string(),
        content: content.to_string(),
        title: article.title.filter(|t| !t.is_empty()),
        publish_date: Some(article.publish_date.unwrap_or_default()),
        authors: article.authors,
        method: ExtractionMethod::Specialized,
    })
}
