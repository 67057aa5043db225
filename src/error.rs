//! Error types shared by every fetch stage.
//!
//! Each tier of the extraction cascade returns `Result<_, FetchError>`. The
//! orchestrator matches on the variant to decide between falling back to the
//! next tier and giving up on the URL; nothing here ever escapes to the batch
//! driver.

use thiserror::Error;

/// Why a single fetch or parse attempt did not produce usable content.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The input string is not an absolute http(s) URL.
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Connection, TLS, timeout or body-read failure.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// The extraction engine could not make sense of the response.
    #[error("parse error: {0}")]
    Parse(String),

    /// Content came back but is below the stage's minimum-viability threshold.
    /// Any title found alongside it is kept for the next tier.
    #[error("content too short: {chars} chars (need more than {min})")]
    EmptyContent {
        chars: usize,
        min: usize,
        title: Option<String>,
    },
}

impl FetchError {
    /// Connection-level failures, including bad status codes and timeouts.
    pub fn is_network(&self) -> bool {
        matches!(self, FetchError::Network(_) | FetchError::Status { .. })
    }

    pub fn is_parse(&self) -> bool {
        matches!(self, FetchError::Parse(_))
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            FetchError::Network(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// The title salvaged from a too-short result, if any.
    pub fn into_title(self) -> Option<String> {
        match self {
            FetchError::EmptyContent { title, .. } => title,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_is_network() {
        let e = FetchError::Status {
            status: 403,
            url: "https://example.com".to_string(),
        };
        assert!(e.is_network());
        assert!(!e.is_parse());
        assert!(!e.is_timeout());
        assert_eq!(e.to_string(), "HTTP 403 from https://example.com");
    }

    #[test]
    fn test_empty_content_message() {
        let e = FetchError::EmptyContent {
            chars: 42,
            min: 100,
            title: Some("Banjir Rob".to_string()),
        };
        assert!(!e.is_network());
        assert!(e.to_string().contains("42 chars"));
        assert_eq!(e.into_title().as_deref(), Some("Banjir Rob"));
        assert_eq!(FetchError::Parse("x".into()).into_title(), None);
    }
}
