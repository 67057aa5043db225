//! Heuristic content extraction from arbitrary article markup.
//!
//! The extractor never mutates the parsed document. Elements that a
//! boilerplate pass would delete are instead treated as *pruned*: they are
//! skipped when matching candidates and when collecting text. An element is
//! pruned when it, or any ancestor:
//!
//! - matches a boilerplate tag or selector (full mode only), or
//! - matches a nested-noise selector while sitting inside an element that
//!   matches a content selector already visited.
//!
//! Noise is stripped container by container, in selector priority order. A
//! candidate of selector `i` therefore only loses noise that sits inside
//! itself or inside a match of selectors `0..=i`. Noise belonging to a
//! lower-priority container is still intact when the candidate is scored.
//! Paragraph aggregation runs after every selector, so it sees all noise
//! removed.
//!
//! All rules live in the declarative tables below so tests can enumerate them
//! independently of the control flow.
//!
//! # Algorithm
//!
//! 1. Every content selector is evaluated in priority order; for every
//!    unpruned match, visible text is collected and joined with single spaces.
//! 2. The longest candidate wins, provided it exceeds
//!    [`MIN_CANDIDATE_CHARS`]. Ties go to the earlier candidate.
//! 3. Without a winner, paragraph aggregation joins every `<p>` longer than
//!    [`MIN_PARAGRAPH_CHARS`] that carries no marker phrase.
//! 4. The result is cleaned: whitespace collapsed, site artifacts stripped.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

/// A selector candidate must be strictly longer than this to be considered.
pub const MIN_CANDIDATE_CHARS: usize = 200;

/// Paragraphs must be strictly longer than this to survive aggregation.
pub const MIN_PARAGRAPH_CHARS: usize = 30;

/// Titles must be strictly longer than this.
pub const MIN_TITLE_CHARS: usize = 5;

/// Removed by tag name in full mode.
pub const BOILERPLATE_TAGS: &[&str] = &[
    "script",
    "style",
    "nav",
    "header",
    "footer",
    "sidebar",
    "advertisement",
    "ads",
    "menu",
    "noscript",
    "iframe",
    "form",
    "button",
];

/// Removed by class/id in full mode.
pub const BOILERPLATE_SELECTORS: &[&str] = &[
    ".ad",
    ".ads",
    ".advertisement",
    ".social-share",
    ".related-posts",
    ".comments",
    ".comment-section",
    ".sidebar",
    ".navigation",
    ".nav",
    ".menu",
    "#comments",
    "#sidebar",
    "#navigation",
];

/// Content containers, most specific first.
pub const CONTENT_SELECTORS: &[&str] = &[
    "article",
    "[role=\"main\"] article",
    // Indonesian news site patterns
    ".article-content",
    ".post-content",
    ".entry-content",
    ".article-body",
    ".post-body",
    ".content-body",
    ".detail-content",
    ".news-content",
    "[class*=\"article-content\"]",
    "[class*=\"post-content\"]",
    "[class*=\"entry-content\"]",
    "[class*=\"detail-content\"]",
    "[class*=\"news-content\"]",
    // broad
    ".content",
    "[class*=\"content\"]",
    "main article",
    "main .content",
    ".text",
    "main",
    ".container article",
    ".wrapper article",
];

/// Stripped from inside every content candidate, in both modes.
pub const NESTED_NOISE_SELECTORS: &[&str] = &[
    "script",
    "style",
    ".ad",
    ".ads",
    ".advertisement",
    ".social-share",
    ".related-posts",
    ".comments",
    ".comment-section",
    "nav",
    "header",
    "footer",
    ".breadcrumb",
    ".tags",
    ".category",
    ".meta",
    ".share-buttons",
    ".social-buttons",
];

/// Paragraphs containing any of these (case-insensitive) are not content.
pub const PARAGRAPH_MARKERS: &[&str] = &["copyright", "baca juga", "lihat juga", "follow", "subscribe"];

/// Site artifacts removed from the final text, case-insensitive.
pub const ARTIFACT_PATTERNS: &[&str] = &[
    r"baca juga:\W*\b",
    r"lihat juga:\W*\b",
    r"ADVERTISEMENT",
    r"CONTINUE READING BELOW",
    r"Loading...",
    r"Tunggu sebentar...",
];

/// Title sources, in order. Attribute selectors read `content` first.
pub const TITLE_SELECTORS: &[&str] = &[
    "h1",
    "title",
    ".article-title",
    ".post-title",
    ".entry-title",
    "[property=\"og:title\"]",
    "[name=\"twitter:title\"]",
    "[class*=\"title\"]",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractMode {
    /// Candidate search without structural boilerplate removal.
    Basic,
    /// Boilerplate tags and selectors pruned before candidate search.
    Full,
}

/// One selector match and the text it yielded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentCandidate {
    pub selector: &'static str,
    pub text: String,
}

impl ContentCandidate {
    pub fn chars(&self) -> usize {
        self.text.chars().count()
    }
}

fn group(selectors: &[&str]) -> Selector {
    Selector::parse(&selectors.join(", ")).expect("static selector group")
}

struct Rules {
    boilerplate: Selector,
    noise: Selector,
    content: Vec<(&'static str, Selector)>,
    titles: Vec<(&'static str, Selector)>,
    paragraph: Selector,
    whitespace: Regex,
    newlines: Regex,
    artifacts: Vec<Regex>,
}

static RULES: Lazy<Rules> = Lazy::new(|| {
    let boilerplate: Vec<&str> = BOILERPLATE_TAGS
        .iter()
        .chain(BOILERPLATE_SELECTORS)
        .copied()
        .collect();
    Rules {
        boilerplate: group(&boilerplate),
        noise: group(NESTED_NOISE_SELECTORS),
        content: CONTENT_SELECTORS
            .iter()
            .map(|s| (*s, Selector::parse(s).expect("static content selector")))
            .collect(),
        titles: TITLE_SELECTORS
            .iter()
            .map(|s| (*s, Selector::parse(s).expect("static title selector")))
            .collect(),
        paragraph: Selector::parse("p").expect("static selector"),
        whitespace: Regex::new(r"\s+").expect("static regex"),
        newlines: Regex::new(r"\n+").expect("static regex"),
        artifacts: ARTIFACT_PATTERNS
            .iter()
            .map(|p| Regex::new(&format!("(?i){p}")).expect("static artifact regex"))
            .collect(),
    }
});

/// Decides which elements a boilerplate pass would have deleted.
struct Pruner {
    mode: ExtractMode,
    /// Number of content selectors whose nested noise is already stripped.
    visited: usize,
}

impl Pruner {
    /// State while scoring the candidates of content selector `index`.
    fn at_selector(mode: ExtractMode, index: usize) -> Self {
        Self {
            mode,
            visited: index + 1,
        }
    }

    /// State once every content selector has been visited.
    fn after_selectors(mode: ExtractMode) -> Self {
        Self {
            mode,
            visited: CONTENT_SELECTORS.len(),
        }
    }

    fn removes(&self, element: ElementRef) -> bool {
        if self.mode == ExtractMode::Full && RULES.boilerplate.matches(&element) {
            return true;
        }
        RULES.noise.matches(&element)
            && element
                .ancestors()
                .filter_map(ElementRef::wrap)
                .any(|a| self.is_visited_container(a))
    }

    fn is_visited_container(&self, element: ElementRef) -> bool {
        RULES
            .content
            .iter()
            .take(self.visited)
            .any(|(_, compiled)| compiled.matches(&element))
    }

    fn is_pruned(&self, element: ElementRef) -> bool {
        std::iter::once(element)
            .chain(element.ancestors().filter_map(ElementRef::wrap))
            .any(|e| self.removes(e))
    }

    /// Trimmed, non-empty text fragments under `element`, skipping pruned
    /// subtrees.
    fn fragments<'a>(&self, element: ElementRef<'a>, out: &mut Vec<&'a str>) {
        for child in element.children() {
            match child.value() {
                Node::Text(text) => {
                    let t = text.trim();
                    if !t.is_empty() {
                        out.push(t);
                    }
                }
                Node::Element(_) => {
                    if let Some(child) = ElementRef::wrap(child) {
                        if !self.removes(child) {
                            self.fragments(child, out);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn text(&self, element: ElementRef, separator: &str) -> String {
        let mut out = Vec::new();
        self.fragments(element, &mut out);
        out.join(separator)
    }
}

/// Parse `markup` and extract its article text.
///
/// Returns an empty string when nothing survives; never fails.
pub fn extract(markup: &str, mode: ExtractMode) -> String {
    let document = Html::parse_document(markup);
    extract_document(&document, mode)
}

pub fn extract_document(document: &Html, mode: ExtractMode) -> String {
    let candidates = candidates(document, mode);
    let best = match select_best(&candidates) {
        Some(winner) => {
            debug!(
                selector = winner.selector,
                chars = winner.chars(),
                "Selected content candidate"
            );
            winner.text.clone()
        }
        None => {
            let aggregated = aggregate_paragraphs(document, mode);
            debug!(chars = aggregated.chars().count(), "Paragraph aggregation");
            aggregated
        }
    };

    if best.is_empty() {
        return best;
    }
    clean_text(&best)
}

/// Every unpruned match of every content selector, in priority order.
///
/// A match is scored against the noise stripped so far: its own, and that of
/// higher-priority containers (see the module docs).
pub fn candidates(document: &Html, mode: ExtractMode) -> Vec<ContentCandidate> {
    let mut out = Vec::new();
    for (index, (selector, compiled)) in RULES.content.iter().enumerate() {
        let pruner = Pruner::at_selector(mode, index);
        for element in document.select(compiled) {
            if pruner.is_pruned(element) {
                continue;
            }
            out.push(ContentCandidate {
                selector: *selector,
                text: pruner.text(element, " "),
            });
        }
    }
    out
}

/// Longest candidate above the viability threshold; first seen wins ties.
pub fn select_best(candidates: &[ContentCandidate]) -> Option<&ContentCandidate> {
    let mut best: Option<&ContentCandidate> = None;
    for candidate in candidates {
        let chars = candidate.chars();
        if chars <= MIN_CANDIDATE_CHARS {
            continue;
        }
        if best.is_none_or(|b| chars > b.chars()) {
            best = Some(candidate);
        }
    }
    best
}

/// Join the text of every qualifying paragraph with single spaces.
pub fn aggregate_paragraphs(document: &Html, mode: ExtractMode) -> String {
    let pruner = Pruner::after_selectors(mode);
    document
        .select(&RULES.paragraph)
        .filter(|p| !pruner.is_pruned(*p))
        .map(|p| pruner.text(p, ""))
        .filter(|text| is_content_paragraph(text))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn is_content_paragraph(text: &str) -> bool {
    if text.chars().count() <= MIN_PARAGRAPH_CHARS {
        return false;
    }
    let lower = text.to_lowercase();
    !PARAGRAPH_MARKERS.iter().any(|m| lower.contains(m))
}

/// Collapse whitespace and strip artifact phrases until nothing changes.
///
/// Iterating to a fixed point makes the function idempotent even when an
/// artifact removal leaves a double space or exposes a new artifact.
pub fn clean_text(text: &str) -> String {
    let mut current = clean_pass(text);
    loop {
        let next = clean_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn clean_pass(text: &str) -> String {
    let collapsed = RULES.whitespace.replace_all(text, " ");
    let mut out = RULES.newlines.replace_all(&collapsed, "\n").into_owned();
    for artifact in &RULES.artifacts {
        out = artifact.replace_all(&out, "").into_owned();
    }
    out.trim().to_string()
}

/// First title-like text in the document, by [`TITLE_SELECTORS`] order.
pub fn extract_title(document: &Html) -> Option<String> {
    for (selector, compiled) in &RULES.titles {
        let Some(element) = document.select(compiled).next() else {
            continue;
        };
        let raw = if selector.starts_with('[') {
            element
                .value()
                .attr("content")
                .map(str::to_string)
                .unwrap_or_else(|| element.text().collect())
        } else {
            element.text().collect()
        };
        let title = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        if title.chars().count() > MIN_TITLE_CHARS {
            return Some(title);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        // "kata " is 5 chars; trailing space trimmed below
        "kata ".repeat(n).trim_end().to_string()
    }

    #[test]
    fn test_rule_tables_compile() {
        assert_eq!(RULES.content.len(), CONTENT_SELECTORS.len());
        assert_eq!(RULES.artifacts.len(), ARTIFACT_PATTERNS.len());
        assert_eq!(RULES.titles.len(), TITLE_SELECTORS.len());
    }

    #[test]
    fn test_article_wins_verbatim() {
        let body = words(120); // 599 chars
        let html = format!(
            "<html><body><nav>Home News Sport</nav><article>{body}</article></body></html>"
        );
        let document = Html::parse_document(&html);
        let all = candidates(&document, ExtractMode::Full);
        let best = select_best(&all).unwrap();
        assert_eq!(best.selector, "article");
        assert_eq!(extract(&html, ExtractMode::Full), body);
    }

    #[test]
    fn test_longest_candidate_wins() {
        let short = words(50);
        let long = words(80);
        let html = format!(
            "<body><article>{short}</article><div class=\"post-content\">{long}</div></body>"
        );
        assert_eq!(extract(&html, ExtractMode::Full), long);
    }

    #[test]
    fn test_tie_goes_to_earlier_selector() {
        let candidates = vec![
            ContentCandidate { selector: "article", text: "a".repeat(300) },
            ContentCandidate { selector: ".content", text: "b".repeat(300) },
        ];
        assert_eq!(select_best(&candidates).unwrap().selector, "article");
    }

    #[test]
    fn test_candidates_at_threshold_are_ignored() {
        let candidates = vec![ContentCandidate { selector: "main", text: "x".repeat(200) }];
        assert!(select_best(&candidates).is_none());
    }

    #[test]
    fn test_paragraph_fallback_joins_in_document_order() {
        let paragraphs: Vec<String> = (0..5).map(|i| format!("Paragraf nomor {i} berisi teks berita panjang")).collect();
        for p in &paragraphs {
            assert!(p.chars().count() > MIN_PARAGRAPH_CHARS);
        }
        let html = format!(
            "<body>{}</body>",
            paragraphs.iter().map(|p| format!("<p>{p}</p>")).collect::<String>()
        );
        assert_eq!(extract(&html, ExtractMode::Full), paragraphs.join(" "));
    }

    #[test]
    fn test_five_forty_char_paragraphs() {
        let p = "a".repeat(40);
        let html = format!("<body>{}</body>", format!("<p>{p}</p>").repeat(5));
        let out = extract(&html, ExtractMode::Basic);
        assert_eq!(out.chars().count(), 204);
        assert_eq!(out, vec![p; 5].join(" "));
    }

    #[test]
    fn test_paragraph_filters() {
        assert!(!is_content_paragraph("terlalu pendek"));
        assert!(!is_content_paragraph("Copyright 2024 Media Nusantara, all rights reserved"));
        assert!(!is_content_paragraph("BACA JUGA: Harga beras naik lagi minggu ini di pasar"));
        assert!(!is_content_paragraph("Follow us on every social network for more updates"));
        assert!(is_content_paragraph("Presiden meresmikan jembatan baru di Kalimantan Timur"));
    }

    #[test]
    fn test_fallback_used_even_when_total_is_short() {
        let html = "<body><p>Satu paragraf yang cukup panjang untuk lolos.</p></body>";
        assert_eq!(
            extract(html, ExtractMode::Full),
            "Satu paragraf yang cukup panjang untuk lolos."
        );
    }

    #[test]
    fn test_empty_markup_returns_empty_string() {
        assert_eq!(extract("", ExtractMode::Full), "");
        assert_eq!(extract("<html><body><div>hi</div></body></html>", ExtractMode::Basic), "");
    }

    #[test]
    fn test_full_mode_prunes_boilerplate_basic_does_not() {
        let body = words(60);
        let html = format!(
            "<body><footer><article>{body}</article></footer></body>"
        );
        assert_eq!(extract(&html, ExtractMode::Full), "");
        assert_eq!(extract(&html, ExtractMode::Basic), body);
    }

    #[test]
    fn test_nested_noise_is_stripped_in_both_modes() {
        let body = words(60);
        let html = format!(
            "<body><article>{body}<div class=\"share-buttons\">Bagikan ke Facebook</div>\
             <script>var x = 1;</script></article></body>"
        );
        assert_eq!(extract(&html, ExtractMode::Basic), body);
        assert_eq!(extract(&html, ExtractMode::Full), body);
    }

    #[test]
    fn test_noise_outside_content_keeps_paragraphs() {
        // .meta outside any content container is not stripped in basic mode
        let p = "Paragraf di dalam blok meta yang tetap dihitung";
        let html = format!("<body><div class=\"meta\"><p>{p}</p></div></body>");
        assert_eq!(extract(&html, ExtractMode::Basic), p);
    }

    #[test]
    fn test_noise_of_lower_priority_container_does_not_hide_candidate() {
        // .post-content is scored before .content strips its .meta child
        let body = words(60);
        let html = format!(
            "<body><div class=\"content\"><div class=\"meta post-content\">{body}</div>\
             <p>pendek</p></div></body>"
        );
        assert_eq!(extract(&html, ExtractMode::Full), body);
        assert_eq!(extract(&html, ExtractMode::Basic), body);
    }

    #[test]
    fn test_article_inside_category_block_of_content_div() {
        let body = words(60);
        let html = format!(
            "<body><div class=\"content\"><section class=\"category\">\
             <article>{body}</article></section></div></body>"
        );
        let document = Html::parse_document(&html);
        let all = candidates(&document, ExtractMode::Full);
        assert_eq!(all[0].selector, "article");
        assert_eq!(all[0].text, body);
        // .content strips the category block, so it yields nothing
        assert!(all.iter().filter(|c| c.selector == ".content").all(|c| c.text.is_empty()));
        assert_eq!(extract(&html, ExtractMode::Full), body);
    }

    #[test]
    fn test_noise_of_higher_priority_container_hides_candidate() {
        // article strips its .meta block before .post-content is scored
        let body = words(60);
        let html = format!(
            "<body><article><div class=\"meta\"><div class=\"post-content\">{body}</div></div>\
             <p>pendek</p></article></body>"
        );
        let document = Html::parse_document(&html);
        let all = candidates(&document, ExtractMode::Full);
        assert!(all.iter().all(|c| c.selector != ".post-content"));
        assert_eq!(extract(&html, ExtractMode::Full), "");
    }

    #[test]
    fn test_paragraphs_in_any_container_noise_are_skipped() {
        let kept = "Paragraf berita utama yang cukup panjang untuk dihitung";
        let html = format!(
            "<body><main><div class=\"tags\"><p>Label label label label label label label</p></div>\
             <p>{kept}</p></main></body>"
        );
        assert_eq!(extract(&html, ExtractMode::Basic), kept);
    }

    #[test]
    fn test_inline_text_is_space_separated() {
        let body = words(50);
        let html = format!("<body><article><p>{body}</p><p><b>Jakarta</b>, kata <i>dia</i>.</p></article></body>");
        let out = extract(&html, ExtractMode::Full);
        assert!(out.ends_with("Jakarta , kata dia ."));
    }

    #[test]
    fn test_clean_text_strips_artifacts() {
        let raw = "Harga naik.  Baca juga:   Inflasi turun ADVERTISEMENT\n\n lanjut Loading...";
        assert_eq!(clean_text(raw), "Harga naik. Inflasi turun lanjut");
    }

    #[test]
    fn test_clean_text_keeps_trailing_baca_juga_without_words() {
        assert_eq!(clean_text("selesai baca juga: ..."), "selesai baca juga: ...");
    }

    #[test]
    fn test_clean_text_is_idempotent() {
        let samples = [
            "  a  b \t c ",
            "x ADVERTISEMENT y",
            "Baca juga: Baca juga: berita",
            "ADVERTADVERTISEMENTISEMENT tail",
            "Lihat juga:\n\n\nsesuatu Tunggu sebentar... selesai",
        ];
        for s in samples {
            let once = clean_text(s);
            assert_eq!(clean_text(&once), once, "not idempotent for {s:?}");
        }
    }

    #[test]
    fn test_extract_title_order_and_length() {
        let doc = Html::parse_document(
            "<html><head><title>Judul Halaman</title></head><body><h1>Judul</h1></body></html>",
        );
        // h1 is too short, <title> is next
        assert_eq!(extract_title(&doc).as_deref(), Some("Judul Halaman"));

        let doc = Html::parse_document(
            "<html><head><meta property=\"og:title\" content=\"Judul dari OG\"></head><body></body></html>",
        );
        assert_eq!(extract_title(&doc).as_deref(), Some("Judul dari OG"));

        let doc = Html::parse_document("<html><body><p>tanpa judul</p></body></html>");
        assert_eq!(extract_title(&doc), None);
    }
}
