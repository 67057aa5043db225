//! Request-identity rotation.
//!
//! Every fetch attempt gets a freshly picked [`RequestIdentity`]: a user-agent
//! string from a fixed pool, classified as crawler- or browser-flavored, and
//! for browsers sometimes a search-engine referer. The pool is an immutable
//! table handed in at construction; picking is the only randomness and takes
//! the RNG as a parameter so tests can seed it.

use rand::Rng;
use rand::seq::IndexedRandom;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::debug;

/// Substrings that mark a user agent as a crawler, matched case-insensitively.
pub const BOT_MARKERS: &[&str] = &["bot", "crawler", "spider"];

/// Probability that a browser-flavored identity carries a referer.
pub const REFERER_PROBABILITY: f64 = 0.3;

pub const DEFAULT_USER_AGENTS: &[&str] = &[
    // search engines
    "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)",
    "Mozilla/5.0 (Linux; Android 6.0.1; Nexus 5X Build/MMB29P) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/W.X.Y.Z Mobile Safari/537.36 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)",
    "Mozilla/5.0 (compatible; bingbot/2.0; +http://www.bing.com/bingbot.htm)",
    "Mozilla/5.0 (compatible; YandexBot/3.0; +http://yandex.com/bots)",
    "Mozilla/5.0 (compatible; Baiduspider/2.0; +http://www.baidu.com/search/spider.html)",
    "facebookexternalhit/1.1 (+http://www.facebook.com/externalhit_uatext.php)",
    // SEO crawlers
    "Mozilla/5.0 (compatible; MJ12bot/v1.4.8; http://mj12bot.com/)",
    "Mozilla/5.0 (compatible; AhrefsBot/7.0; +http://ahrefs.com/robot/)",
    "Mozilla/5.0 (compatible; SemrushBot/7~bl; +http://www.semrush.com/bot.html)",
    // desktop browsers
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:109.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:109.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (X11; Linux x86_64; rv:109.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0",
    // mobile
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_1 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Linux; Android 13; SM-G991B) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36",
    "Mozilla/5.0 (Linux; Android 13; Pixel 7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36",
];

pub const DEFAULT_REFERERS: &[&str] = &[
    "https://www.google.com/",
    "https://www.google.co.id/",
    "https://www.bing.com/",
    "https://duckduckgo.com/",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    Bot,
    Browser,
}

impl Flavor {
    pub fn classify(user_agent: &str) -> Self {
        let ua = user_agent.to_lowercase();
        if BOT_MARKERS.iter().any(|m| ua.contains(m)) {
            Flavor::Bot
        } else {
            Flavor::Browser
        }
    }
}

/// The client identity used for one fetch attempt. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestIdentity {
    pub user_agent: String,
    pub flavor: Flavor,
    pub referer: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub total: usize,
    pub bots: usize,
    pub browsers: usize,
}

#[derive(Debug, Clone)]
pub struct IdentityRotator {
    user_agents: Vec<String>,
    referers: Vec<String>,
}

impl Default for IdentityRotator {
    fn default() -> Self {
        Self::new(
            DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect(),
            DEFAULT_REFERERS.iter().map(|s| s.to_string()).collect(),
        )
    }
}

impl IdentityRotator {
    /// Build a rotator over the given pool. An empty user-agent list falls
    /// back to the built-in pool so `pick` always has something to return.
    pub fn new(user_agents: Vec<String>, referers: Vec<String>) -> Self {
        let user_agents = if user_agents.is_empty() {
            DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect()
        } else {
            user_agents
        };
        Self {
            user_agents,
            referers,
        }
    }

    /// Pick a fresh identity for one request using the thread-local rng.
    ///
    /// # Returns
    ///
    /// A [`RequestIdentity`] whose user agent is drawn uniformly from the pool.
    /// Browser identities carry a referer with probability
    /// [`REFERER_PROBABILITY`]; crawler identities never do.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let rotator = IdentityRotator::default();
    /// let identity = rotator.pick();
    /// let headers = headers_for(&identity);
    /// assert!(headers.contains_key(USER_AGENT));
    /// ```
    pub fn pick(&self) -> RequestIdentity {
        self.pick_with(&mut rand::rng())
    }

    /// [`pick`](Self::pick) with a caller-supplied rng, for reproducible draws.
    pub fn pick_with<R: Rng + ?Sized>(&self, rng: &mut R) -> RequestIdentity {
        let user_agent = self
            .user_agents
            .choose(rng)
            .cloned()
            .unwrap_or_else(|| DEFAULT_USER_AGENTS[0].to_string());
        let flavor = Flavor::classify(&user_agent);

        let referer = match flavor {
            Flavor::Browser if rng.random_bool(REFERER_PROBABILITY) => {
                self.referers.choose(rng).cloned()
            }
            _ => None,
        };

        debug!(
            user_agent = %crate::utils::truncate_for_log(&user_agent, 60),
            ?flavor,
            has_referer = referer.is_some(),
            "Picked request identity"
        );

        RequestIdentity {
            user_agent,
            flavor,
            referer,
        }
    }

    /// Pool size split by flavor.
    pub fn stats(&self) -> PoolStats {
        let bots = self
            .user_agents
            .iter()
            .filter(|ua| Flavor::classify(ua) == Flavor::Bot)
            .count();
        PoolStats {
            total: self.user_agents.len(),
            bots,
            browsers: self.user_agents.len() - bots,
        }
    }
}

/// Header set matching the identity's flavor.
///
/// Crawlers get a short, plain set; browsers get the full navigation set with
/// `Sec-Fetch-*`, `DNT` and `Upgrade-Insecure-Requests`. Both prioritise
/// Indonesian, then English.
pub fn headers_for(identity: &RequestIdentity) -> HeaderMap {
    let mut pairs: Vec<(&'static str, &str)> = vec![("user-agent", identity.user_agent.as_str())];

    match identity.flavor {
        Flavor::Bot => pairs.extend([
            (
                "accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
            ("accept-language", "id-ID,id;q=0.9,en;q=0.8"),
            ("accept-encoding", "gzip, deflate"),
            ("connection", "keep-alive"),
            ("cache-control", "no-cache"),
        ]),
        Flavor::Browser => pairs.extend([
            (
                "accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7",
            ),
            ("accept-language", "id-ID,id;q=0.9,en-US;q=0.8,en;q=0.7,ms;q=0.6"),
            ("accept-encoding", "gzip, deflate, br"),
            ("connection", "keep-alive"),
            ("cache-control", "no-cache"),
            ("sec-fetch-dest", "document"),
            ("sec-fetch-mode", "navigate"),
            ("sec-fetch-site", "none"),
            ("sec-fetch-user", "?1"),
            ("upgrade-insecure-requests", "1"),
            ("dnt", "1"),
        ]),
    }

    if let Some(referer) = &identity.referer {
        pairs.push(("referer", referer.as_str()));
    }

    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        if let Ok(value) = HeaderValue::from_str(value) {
            headers.insert(HeaderName::from_static(name), value);
        }
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn identity(ua: &str, referer: Option<&str>) -> RequestIdentity {
        RequestIdentity {
            user_agent: ua.to_string(),
            flavor: Flavor::classify(ua),
            referer: referer.map(str::to_string),
        }
    }

    #[test]
    fn test_classify_is_case_insensitive() {
        assert_eq!(Flavor::classify("Mozilla/5.0 (compatible; Googlebot/2.1)"), Flavor::Bot);
        assert_eq!(Flavor::classify("Baiduspider/2.0"), Flavor::Bot);
        assert_eq!(Flavor::classify("SomeCRAWLER 1.0"), Flavor::Bot);
        assert_eq!(
            Flavor::classify("Mozilla/5.0 (X11; Linux x86_64; rv:109.0) Gecko/20100101 Firefox/121.0"),
            Flavor::Browser
        );
    }

    #[test]
    fn test_default_pool_stats() {
        let stats = IdentityRotator::default().stats();
        assert_eq!(stats.total, DEFAULT_USER_AGENTS.len());
        assert_eq!(stats.bots + stats.browsers, stats.total);
        // facebookexternalhit carries no bot marker
        assert_eq!(stats.bots, 8);
        assert_eq!(stats.browsers, 12);
    }

    #[test]
    fn test_bot_identity_never_gets_referer() {
        let rotator = IdentityRotator::new(
            vec!["Mozilla/5.0 (compatible; bingbot/2.0)".to_string()],
            DEFAULT_REFERERS.iter().map(|s| s.to_string()).collect(),
        );
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let id = rotator.pick_with(&mut rng);
            assert_eq!(id.flavor, Flavor::Bot);
            assert!(id.referer.is_none());
        }
    }

    #[test]
    fn test_browser_referer_rate_is_roughly_thirty_percent() {
        let rotator = IdentityRotator::new(
            vec!["Mozilla/5.0 (Windows NT 10.0; Win64; x64) Chrome/120.0.0.0".to_string()],
            DEFAULT_REFERERS.iter().map(|s| s.to_string()).collect(),
        );
        let mut rng = StdRng::seed_from_u64(42);
        let with_referer = (0..2000)
            .filter(|_| rotator.pick_with(&mut rng).referer.is_some())
            .count();
        assert!((450..750).contains(&with_referer), "got {with_referer}");
    }

    #[test]
    fn test_seeded_picks_are_reproducible() {
        let rotator = IdentityRotator::default();
        let a: Vec<_> = {
            let mut rng = StdRng::seed_from_u64(1);
            (0..10).map(|_| rotator.pick_with(&mut rng)).collect()
        };
        let b: Vec<_> = {
            let mut rng = StdRng::seed_from_u64(1);
            (0..10).map(|_| rotator.pick_with(&mut rng)).collect()
        };
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_pool_falls_back_to_defaults() {
        let rotator = IdentityRotator::new(Vec::new(), Vec::new());
        assert_eq!(rotator.stats().total, DEFAULT_USER_AGENTS.len());
    }

    #[test]
    fn test_bot_headers_are_minimal() {
        let headers = headers_for(&identity("Googlebot/2.1", None));
        assert_eq!(headers.len(), 6);
        assert_eq!(headers["accept-language"], "id-ID,id;q=0.9,en;q=0.8");
        assert!(headers.get("sec-fetch-mode").is_none());
        assert!(headers.get("dnt").is_none());
    }

    #[test]
    fn test_browser_headers_are_full() {
        let headers = headers_for(&identity(
            "Mozilla/5.0 (Macintosh) Safari/605.1.15",
            Some("https://duckduckgo.com/"),
        ));
        assert_eq!(headers["user-agent"], "Mozilla/5.0 (Macintosh) Safari/605.1.15");
        assert_eq!(headers["sec-fetch-mode"], "navigate");
        assert_eq!(headers["upgrade-insecure-requests"], "1");
        assert_eq!(headers["dnt"], "1");
        assert_eq!(headers["referer"], "https://duckduckgo.com/");
        assert!(headers["accept-language"].to_str().unwrap().starts_with("id-ID"));
    }
}
