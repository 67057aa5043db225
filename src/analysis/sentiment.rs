//! Context-scoped sentiment classification.
//!
//! The model is asked for a JSON object `{sentiment, confidence, reasoning}`.
//! Replies are rarely clean JSON, so the first `{ ... }` span is cut out and
//! parsed on its own. A reply cut off mid-object is asked for once more.

use crate::api::Generate;
use crate::models::Sentiment;
use crate::utils::{looks_truncated, truncate_chars, truncate_for_log};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, instrument, warn};

/// Characters of article text included in the prompt.
pub const PROMPT_CONTENT_CHARS: usize = 3000;

pub const NEUTRAL: &str = "neutral";
pub const LOW_CONFIDENCE: &str = "low";
pub const PARSE_FAILED_REASONING: &str = "Failed to analyze sentiment";

static JSON_SPAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{.*\}").expect("valid JSON span pattern"));

/// Outcome of reading one reply.
#[derive(Debug, Clone, PartialEq)]
struct ParsedReply {
    sentiment: Sentiment,
    truncated: bool,
}

#[derive(Debug)]
pub struct SentimentAnalyzer<'a, G> {
    generator: &'a G,
}

impl<'a, G: Generate> SentimentAnalyzer<'a, G> {
    pub fn new(generator: &'a G) -> Self {
        Self { generator }
    }

    /// Classify `content` with respect to `context`. `None` means the service
    /// could not be reached; an unusable reply still yields a neutral result.
    #[instrument(level = "info", skip_all, fields(context = %truncate_for_log(context, 40)))]
    pub async fn analyze(&self, content: &str, context: &str) -> Option<Sentiment> {
        let prompt = build_prompt(content, context);

        let reply = self.ask(&prompt).await?;
        let parsed = parse_reply(&reply);
        if !parsed.truncated {
            return Some(parsed.sentiment);
        }

        warn!(
            reply_preview = %truncate_for_log(&reply, 200),
            "Truncated JSON reply; re-asking once"
        );
        let reply = self.ask(&prompt).await?;
        Some(parse_reply(&reply).sentiment)
    }

    async fn ask(&self, prompt: &str) -> Option<String> {
        match self.generator.generate(prompt).await {
            Ok(reply) => Some(reply),
            Err(e) => {
                warn!(error = %e, "Sentiment request failed");
                None
            }
        }
    }
}

pub fn build_prompt(content: &str, context: &str) -> String {
    format!(
        "Analyze the following news article with respect to the given context.\n\
         \n\
         CONTEXT: {context}\n\
         \n\
         ARTICLE:\n\
         {article}\n\
         \n\
         Respond with JSON using exactly this structure:\n\
         {{\n  \
           \"sentiment\": \"category that best describes the article with respect to the context\",\n  \
           \"confidence\": \"high/medium/low\",\n  \
           \"reasoning\": \"short explanation of why this sentiment was chosen for the context\"\n\
         }}\n\
         \n\
         Only judge the article against the given context. If the context does not \
         appear in the article, answer with the sentiment \"unrelated\".",
        article = truncate_chars(content, PROMPT_CONTENT_CHARS),
    )
}

/// Parse a model reply, falling back to a neutral result when the reply is
/// not usable JSON.
pub fn parse_sentiment(reply: &str) -> Sentiment {
    parse_reply(reply).sentiment
}

fn parse_reply(reply: &str) -> ParsedReply {
    let Some(span) = JSON_SPAN.find(reply) else {
        // An opening brace with no closing one is a cut-off object
        let truncated = reply.find('{').is_some_and(|start| {
            serde_json::from_str::<Value>(&reply[start..])
                .err()
                .is_some_and(|e| looks_truncated(&e))
        });
        debug!(truncated, "No JSON object in reply");
        return ParsedReply {
            sentiment: neutral(reply),
            truncated,
        };
    };

    match serde_json::from_str::<Value>(span.as_str()) {
        Ok(value) => ParsedReply {
            sentiment: from_value(&value),
            truncated: false,
        },
        Err(e) => {
            debug!(error = %e, "Malformed JSON object in reply");
            ParsedReply {
                sentiment: neutral(PARSE_FAILED_REASONING),
                truncated: looks_truncated(&e),
            }
        }
    }
}

fn neutral(reasoning: &str) -> Sentiment {
    Sentiment {
        sentiment: NEUTRAL.to_string(),
        confidence: LOW_CONFIDENCE.to_string(),
        reasoning: reasoning.to_string(),
    }
}

fn from_value(value: &Value) -> Sentiment {
    let field = |key: &str| match value.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };
    Sentiment {
        sentiment: field("sentiment"),
        confidence: field("confidence"),
        reasoning: field("reasoning"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tests::MockGenerator;

    #[test]
    fn test_parse_reply_inside_prose() {
        let reply = "Berikut hasilnya:\n```json\n{\"sentiment\": \"positive\", \
                     \"confidence\": \"high\", \"reasoning\": \"Harga turun.\"}\n```";
        let s = parse_sentiment(reply);
        assert_eq!(s.sentiment, "positive");
        assert_eq!(s.confidence, "high");
        assert_eq!(s.reasoning, "Harga turun.");
    }

    #[test]
    fn test_parse_reply_without_json_keeps_raw_text() {
        let s = parse_sentiment("The article is mostly positive.");
        assert_eq!(s.sentiment, NEUTRAL);
        assert_eq!(s.confidence, LOW_CONFIDENCE);
        assert_eq!(s.reasoning, "The article is mostly positive.");
    }

    #[test]
    fn test_parse_reply_malformed_json() {
        let s = parse_sentiment("{sentiment: positive}");
        assert_eq!(s, neutral(PARSE_FAILED_REASONING));
        assert!(!parse_reply("{sentiment: positive}").truncated);
    }

    #[test]
    fn test_parse_reply_stringifies_and_defaults_fields() {
        let s = parse_sentiment(r#"{"sentiment": "negative", "confidence": 0.9}"#);
        assert_eq!(s.confidence, "0.9");
        assert_eq!(s.reasoning, "");
    }

    #[test]
    fn test_truncated_reply_detection() {
        assert!(parse_reply(r#"{"sentiment": "posi"#).truncated);
        assert!(parse_reply(r#"{"sentiment": {"label": "x"}"#).truncated);
        assert!(!parse_reply("no braces here").truncated);
    }

    #[test]
    fn test_prompt_limits_content() {
        let content = "a".repeat(PROMPT_CONTENT_CHARS + 500);
        let prompt = build_prompt(&content, "kebijakan subsidi BBM");
        assert!(prompt.contains("CONTEXT: kebijakan subsidi BBM"));
        assert!(prompt.contains(&"a".repeat(PROMPT_CONTENT_CHARS)));
        assert!(!prompt.contains(&"a".repeat(PROMPT_CONTENT_CHARS + 1)));
        assert!(prompt.contains("\"unrelated\""));
    }

    #[tokio::test]
    async fn test_analyze_reasks_once_on_truncation() {
        let mock = MockGenerator::new(vec![
            Ok(r#"{"sentiment": "posi"#),
            Ok(r#"{"sentiment": "positive", "confidence": "medium", "reasoning": "ok"}"#),
        ]);
        let s = SentimentAnalyzer::new(&mock)
            .analyze("Isi artikel", "ekonomi")
            .await
            .unwrap();
        assert_eq!(s.sentiment, "positive");
        assert_eq!(mock.calls(), 2);
    }

    #[tokio::test]
    async fn test_analyze_does_not_reask_twice() {
        let mock = MockGenerator::replying(r#"{"sentiment": "posi"#);
        let s = SentimentAnalyzer::new(&mock)
            .analyze("Isi artikel", "ekonomi")
            .await
            .unwrap();
        assert_eq!(s.sentiment, NEUTRAL);
        assert_eq!(mock.calls(), 2);
    }

    #[tokio::test]
    async fn test_analyze_service_failure_is_none() {
        let mock = MockGenerator::failing();
        let s = SentimentAnalyzer::new(&mock).analyze("Isi", "ekonomi").await;
        assert!(s.is_none());
        assert_eq!(mock.calls(), 1);
    }
}
