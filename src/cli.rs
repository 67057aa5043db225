//! Command-line interface definitions for News Analyzer.
//!
//! Paths and credentials can also be supplied through environment variables.

use crate::analysis::{SummaryConfig, SummaryLanguage, SummaryStyle};
use crate::pipeline::AnalysisOptions;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Summary style as chosen on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SummaryType {
    Concise,
    Detailed,
    KeyPoints,
    /// Uses `--custom-instruction`
    Custom,
}

/// Extract article text from news URLs and optionally analyze it.
///
/// # Examples
///
/// ```sh
/// # Scrape a list of URLs
/// news_analyzer -i urls.txt -o ./results
///
/// # Scrape one URL, detect the byline and summarize it in English
/// news_analyzer -u https://example.com/berita --byline --summarize --summary-language english
///
/// # Sentiment only, no content columns in the output
/// news_analyzer -i urls.yaml --no-scrape --sentiment-context "kebijakan subsidi BBM"
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Input file: .json, .yaml/.yml, or one URL per line (TAB + snippet optional)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// URL to process; may be repeated
    #[arg(short, long = "url")]
    pub urls: Vec<String>,

    /// Output directory for the JSON and Markdown results
    #[arg(short, long, env = "NEWS_ANALYZER_OUTPUT_DIR", default_value = "./results")]
    pub output_dir: String,

    /// Per-request timeout in seconds for the generic fetch
    #[arg(short, long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(10..=60))]
    pub timeout: u64,

    /// Skip boilerplate removal in the heuristic extractor
    #[arg(long)]
    pub basic_only: bool,

    /// Do not record content or extraction method (pages are still fetched for analysis)
    #[arg(long)]
    pub no_scrape: bool,

    /// Detect the article byline
    #[arg(long)]
    pub byline: bool,

    /// Enable sentiment analysis with respect to this context
    #[arg(long)]
    pub sentiment_context: Option<String>,

    /// Summarize each article
    #[arg(long)]
    pub summarize: bool,

    #[arg(long, value_enum, default_value_t = SummaryType::Concise)]
    pub summary_type: SummaryType,

    /// Approximate summary length in words
    #[arg(long, default_value_t = 150, value_parser = clap::value_parser!(u32).range(50..=500))]
    pub max_words: u32,

    #[arg(long, value_enum, default_value_t = SummaryLanguage::Indonesian)]
    pub summary_language: SummaryLanguage,

    /// Aspect the summary should focus on
    #[arg(long)]
    pub focus: Option<String>,

    /// Instruction used with `--summary-type custom`
    #[arg(long)]
    pub custom_instruction: Option<String>,

    /// Path to the awful_aj config.yaml (defaults to the awful_aj config directory)
    #[arg(long, env = "AWFUL_AJ_CONFIG")]
    pub llm_config: Option<String>,

    /// awful_aj chat template used for analysis prompts
    #[arg(long, default_value = "simple_question")]
    pub template: String,

    /// Scraper settings YAML (user agents, referers, pacing)
    #[arg(long, env = "NEWS_ANALYZER_SETTINGS")]
    pub settings: Option<PathBuf>,
}

impl Cli {
    pub fn summary_config(&self) -> Option<SummaryConfig> {
        if !self.summarize {
            return None;
        }
        let style = match self.summary_type {
            SummaryType::Concise => SummaryStyle::Concise,
            SummaryType::Detailed => SummaryStyle::Detailed,
            SummaryType::KeyPoints => SummaryStyle::KeyPoints,
            SummaryType::Custom => {
                SummaryStyle::Custom(self.custom_instruction.clone().unwrap_or_default())
            }
        };
        Some(SummaryConfig {
            style,
            max_words: self.max_words,
            language: self.summary_language,
            focus: self.focus.clone(),
        })
    }

    pub fn analysis_options(&self) -> AnalysisOptions {
        AnalysisOptions {
            scrape: !self.no_scrape,
            basic_only: self.basic_only,
            timeout: Duration::from_secs(self.timeout),
            byline: self.byline,
            sentiment_context: self
                .sentiment_context
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
            summary: self.summary_config(),
        }
    }

    /// Problems that must be fixed before any fetch starts.
    pub fn validate(&self, row_count: usize) -> Vec<String> {
        let mut warnings = Vec::new();

        let any_feature = !self.no_scrape
            || self.byline
            || self.sentiment_context.is_some()
            || self.summarize;
        if !any_feature {
            warnings.push(
                "enable at least one feature (scraping, --byline, --sentiment-context, --summarize)"
                    .to_string(),
            );
        }

        if self
            .sentiment_context
            .as_deref()
            .is_some_and(|c| c.trim().is_empty())
        {
            warnings.push("sentiment analysis needs a non-empty --sentiment-context".to_string());
        }

        if row_count == 0 {
            warnings.push("provide at least one --url or an --input file".to_string());
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["news_analyzer", "-u", "https://example.com/a"]);

        assert_eq!(cli.urls, vec!["https://example.com/a"]);
        assert_eq!(cli.timeout, 30);
        assert_eq!(cli.max_words, 150);
        assert_eq!(cli.template, "simple_question");
        assert!(cli.summary_config().is_none());

        let options = cli.analysis_options();
        assert!(options.scrape);
        assert_eq!(options.timeout, Duration::from_secs(30));
        assert!(!options.needs_generator());
    }

    #[test]
    fn test_cli_summary_flags() {
        let cli = Cli::parse_from([
            "news_analyzer",
            "-i",
            "urls.txt",
            "--summarize",
            "--summary-type",
            "custom",
            "--custom-instruction",
            "Satu kalimat saja.",
            "--summary-language",
            "same-as-article",
            "--max-words",
            "80",
        ]);

        let config = cli.summary_config().unwrap();
        assert_eq!(config.style, SummaryStyle::Custom("Satu kalimat saja.".to_string()));
        assert_eq!(config.language, SummaryLanguage::SameAsArticle);
        assert_eq!(config.max_words, 80);
    }

    #[test]
    fn test_cli_rejects_out_of_range_values() {
        assert!(Cli::try_parse_from(["news_analyzer", "--timeout", "5"]).is_err());
        assert!(Cli::try_parse_from(["news_analyzer", "--timeout", "61"]).is_err());
        assert!(Cli::try_parse_from(["news_analyzer", "--max-words", "20"]).is_err());
    }

    #[test]
    fn test_validate() {
        let cli = Cli::parse_from(["news_analyzer", "--no-scrape"]);
        let warnings = cli.validate(0);
        assert_eq!(warnings.len(), 2);

        let cli = Cli::parse_from(["news_analyzer", "--sentiment-context", "  "]);
        let warnings = cli.validate(1);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("--sentiment-context"));
        assert!(cli.analysis_options().sentiment_context.is_none());

        let cli = Cli::parse_from(["news_analyzer", "--byline", "--no-scrape"]);
        assert!(cli.validate(3).is_empty());
    }
}
