//! Length- and style-controlled article summaries.

use crate::api::Generate;
use crate::models::Summary;
use crate::utils::{count_words, truncate_chars};
use tracing::{instrument, warn};

/// Characters of article text included in the prompt.
pub const PROMPT_CONTENT_CHARS: usize = 4000;

pub const DEFAULT_MAX_WORDS: u32 = 150;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryStyle {
    Concise,
    Detailed,
    KeyPoints,
    /// Free-form instruction. Empty falls back to a generic length request.
    Custom(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SummaryLanguage {
    Indonesian,
    English,
    SameAsArticle,
}

impl SummaryLanguage {
    fn instruction(self) -> &'static str {
        match self {
            SummaryLanguage::Indonesian => "Respond in Bahasa Indonesia.",
            SummaryLanguage::English => "Respond in English.",
            SummaryLanguage::SameAsArticle => "Use the same language as the original article.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryConfig {
    pub style: SummaryStyle,
    pub max_words: u32,
    pub language: SummaryLanguage,
    pub focus: Option<String>,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            style: SummaryStyle::Concise,
            max_words: DEFAULT_MAX_WORDS,
            language: SummaryLanguage::Indonesian,
            focus: None,
        }
    }
}

impl SummaryConfig {
    fn style_instruction(&self) -> String {
        let n = self.max_words;
        match &self.style {
            SummaryStyle::Concise => format!(
                "Create a concise summary in approximately {n} words that captures the main points."
            ),
            SummaryStyle::Detailed => format!(
                "Create a detailed summary in approximately {n} words that includes important details and context."
            ),
            SummaryStyle::KeyPoints => format!(
                "Create a bullet-point summary with the main points, keeping it under {n} words total."
            ),
            SummaryStyle::Custom(instruction) if !instruction.trim().is_empty() => {
                instruction.trim().to_string()
            }
            SummaryStyle::Custom(_) => format!("Create a summary in approximately {n} words."),
        }
    }
}

pub fn build_prompt(content: &str, config: &SummaryConfig) -> String {
    let focus = config
        .focus
        .as_deref()
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(|f| format!("\nFocus specifically on: {f}"))
        .unwrap_or_default();

    format!(
        "Summarize the following article according to these requirements:\n\
         \n\
         REQUIREMENTS:\n\
         - {style}\n\
         - {language}\n\
         - Maximum {max_words} words\
         {focus}\n\
         \n\
         ARTICLE:\n\
         {article}\n\
         \n\
         Please provide only the summary text without any additional formatting or explanations.",
        style = config.style_instruction(),
        language = config.language.instruction(),
        max_words = config.max_words,
        article = truncate_chars(content, PROMPT_CONTENT_CHARS),
    )
}

#[derive(Debug)]
pub struct Summarizer<'a, G> {
    generator: &'a G,
}

impl<'a, G: Generate> Summarizer<'a, G> {
    pub fn new(generator: &'a G) -> Self {
        Self { generator }
    }

    /// `None` when the service could not be reached.
    #[instrument(level = "info", skip_all, fields(style = ?config.style, max_words = config.max_words))]
    pub async fn summarize(&self, content: &str, config: &SummaryConfig) -> Option<Summary> {
        let prompt = build_prompt(content, config);
        match self.generator.generate(&prompt).await {
            Ok(reply) => {
                let summary = reply.trim().to_string();
                Some(Summary {
                    word_count: count_words(&summary),
                    summary,
                })
            }
            Err(e) => {
                warn!(error = %e, "Summary request failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tests::MockGenerator;

    #[test]
    fn test_prompt_contains_requirements() {
        let config = SummaryConfig {
            style: SummaryStyle::KeyPoints,
            max_words: 80,
            language: SummaryLanguage::English,
            focus: Some("dampak ekonomi".to_string()),
        };
        let prompt = build_prompt("Isi artikel.", &config);
        assert!(prompt.contains("bullet-point summary"));
        assert!(prompt.contains("under 80 words"));
        assert!(prompt.contains("Respond in English."));
        assert!(prompt.contains("Maximum 80 words\nFocus specifically on: dampak ekonomi\n"));
        assert!(prompt.contains("ARTICLE:\nIsi artikel."));
    }

    #[test]
    fn test_prompt_without_focus() {
        let prompt = build_prompt("x", &SummaryConfig::default());
        assert!(prompt.contains("Maximum 150 words\n\nARTICLE:"));
        assert!(prompt.contains("Respond in Bahasa Indonesia."));
        assert!(!prompt.contains("Focus specifically"));
    }

    #[test]
    fn test_custom_instruction_and_fallback() {
        let mut config = SummaryConfig {
            style: SummaryStyle::Custom("Ringkas dalam satu kalimat.".to_string()),
            ..Default::default()
        };
        assert!(build_prompt("x", &config).contains("- Ringkas dalam satu kalimat.\n"));

        config.style = SummaryStyle::Custom("  ".to_string());
        assert!(build_prompt("x", &config).contains("- Create a summary in approximately 150 words.\n"));
    }

    #[test]
    fn test_prompt_limits_content() {
        let content = "é".repeat(PROMPT_CONTENT_CHARS + 10);
        let prompt = build_prompt(&content, &SummaryConfig::default());
        assert_eq!(prompt.matches('é').count(), PROMPT_CONTENT_CHARS);
    }

    #[tokio::test]
    async fn test_summarize_trims_and_counts() {
        let mock = MockGenerator::replying("  Harga beras naik di Jakarta.\n");
        let summary = Summarizer::new(&mock)
            .summarize("Isi artikel panjang.", &SummaryConfig::default())
            .await
            .unwrap();
        assert_eq!(summary.summary, "Harga beras naik di Jakarta.");
        assert_eq!(summary.word_count, 5);
        assert!(mock.last_prompt().unwrap().contains("Isi artikel panjang."));
    }

    #[tokio::test]
    async fn test_summarize_failure_is_none() {
        let mock = MockGenerator::failing();
        let summary = Summarizer::new(&mock)
            .summarize("Isi", &SummaryConfig::default())
            .await;
        assert!(summary.is_none());
    }
}
