//! Plain HTTP GET with rotated identity headers.

use crate::error::FetchError;
use crate::scrapers::identity::{IdentityRotator, RequestIdentity, headers_for};
use crate::utils::truncate_for_log;
use encoding_rs::{Encoding, UTF_8};
use once_cell::sync::Lazy;
use regex::bytes::Regex;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Responses below this size are logged as suspicious but still returned.
pub const SMALL_RESPONSE_BYTES: usize = 1000;

/// How far into the body a `<meta charset>` declaration is looked for.
const META_SNIFF_BYTES: usize = 1024;

static META_CHARSET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i-u)<meta[^>]+charset\s*=\s*["']?\s*([A-Za-z0-9_:.-]+)"#).expect("static regex")
});

/// A successful (2xx) response body.
#[derive(Debug, Clone)]
pub struct Download {
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl Download {
    /// Missing content types are given the benefit of the doubt.
    pub fn is_html(&self) -> bool {
        match &self.content_type {
            None => true,
            Some(ct) => {
                let ct = ct.to_ascii_lowercase();
                ct.contains("html") || ct.contains("xml") || ct.starts_with("text/plain")
            }
        }
    }

    /// Decode the body to UTF-8 text.
    ///
    /// The encoding is taken from the `charset` parameter of the Content-Type
    /// header, then from a `<meta charset>` near the top of the document, and
    /// defaults to UTF-8. A byte-order mark overrides all of them.
    ///
    /// # Returns
    ///
    /// The decoded markup. Undecodable bytes become U+FFFD.
    pub fn text(&self) -> String {
        let encoding = self.declared_encoding().unwrap_or(UTF_8);
        let (text, used, had_errors) = encoding.decode(&self.body);
        if had_errors {
            debug!(encoding = used.name(), "Body had undecodable bytes");
        }
        text.into_owned()
    }

    pub fn declared_encoding(&self) -> Option<&'static Encoding> {
        self.content_type
            .as_deref()
            .and_then(charset_param)
            .or_else(|| meta_charset(&self.body))
    }
}

fn charset_param(content_type: &str) -> Option<&'static Encoding> {
    content_type
        .split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("charset"))
        .and_then(|(_, label)| Encoding::for_label(label.trim().trim_matches('"').as_bytes()))
}

fn meta_charset(body: &[u8]) -> Option<&'static Encoding> {
    let head = &body[..body.len().min(META_SNIFF_BYTES)];
    let label = META_CHARSET.captures(head)?.get(1)?;
    Encoding::for_label(label.as_bytes())
}

/// Build the shared client. Headers are set per request, never on the client.
pub fn build_client() -> Result<Client, FetchError> {
    let client = Client::builder()
        .gzip(true)
        .brotli(true)
        .deflate(true)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()?;
    Ok(client)
}

/// One GET under `identity`.
///
/// # Arguments
///
/// * `client` - Shared client; it carries no default headers.
/// * `url` - Absolute http(s) URL.
/// * `identity` - User agent and optional referer for this request.
/// * `timeout` - Whole-request deadline.
///
/// # Errors
///
/// [`FetchError::Status`] for non-2xx responses, [`FetchError::Network`] for
/// transport failures and timeouts.
pub async fn download(
    client: &Client,
    url: &str,
    identity: &RequestIdentity,
    timeout: Duration,
) -> Result<Download, FetchError> {
    let response = client
        .get(url)
        .headers(headers_for(identity))
        .timeout(timeout)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response.bytes().await?.to_vec();

    if body.len() < SMALL_RESPONSE_BYTES {
        warn!(bytes = body.len(), %url, "Suspiciously small response");
    }

    Ok(Download { content_type, body })
}

#[derive(Debug, Clone)]
pub struct GenericFetcher {
    client: Client,
    rotator: Arc<IdentityRotator>,
}

impl GenericFetcher {
    /// Create a fetcher over a client from [`build_client`] and the identity
    /// pool shared with the specialized tier.
    pub fn new(client: Client, rotator: Arc<IdentityRotator>) -> Self {
        Self { client, rotator }
    }

    /// Fetch markup with a freshly picked identity.
    ///
    /// # Arguments
    ///
    /// * `url` - Page to fetch.
    /// * `timeout` - Per-request deadline.
    ///
    /// # Returns
    ///
    /// The body decoded with its declared charset (see [`Download::text`]).
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let fetcher = GenericFetcher::new(build_client()?, Arc::new(IdentityRotator::default()));
    /// let markup = fetcher.fetch("https://example.com/berita", Duration::from_secs(30)).await?;
    /// ```
    #[instrument(level = "info", skip_all, fields(%url))]
    pub async fn fetch(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        let identity = self.rotator.pick();
        debug!(
            user_agent = %truncate_for_log(&identity.user_agent, 50),
            "Generic fetch"
        );
        let download = download(&self.client, url, &identity, timeout).await?;
        Ok(download.text())
    }
}
