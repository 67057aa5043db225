//! Scraper settings loaded from an optional YAML file.
//!
//! Every field has a default, so a settings file only needs the keys it wants
//! to override:
//!
//! ```yaml
//! user_agents:
//!   - "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)"
//! pacing_min_ms: 1000
//! pacing_max_ms: 3000
//! ```

use crate::scrapers::identity::{DEFAULT_REFERERS, DEFAULT_USER_AGENTS, IdentityRotator};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::ops::RangeInclusive;
use std::time::Duration;
use tracing::{info, instrument};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperSettings {
    /// Identity pool; crawler and browser strings may be mixed freely.
    pub user_agents: Vec<String>,
    /// Referers occasionally attached to browser identities.
    pub referers: Vec<String>,
    /// Lower bound of the courtesy delay before each URL.
    pub pacing_min_ms: u64,
    /// Upper bound of the courtesy delay before each URL.
    pub pacing_max_ms: u64,
    /// Request timeout used by the article engine.
    pub engine_timeout_secs: u64,
}

impl Default for ScraperSettings {
    fn default() -> Self {
        Self {
            user_agents: DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect(),
            referers: DEFAULT_REFERERS.iter().map(|s| s.to_string()).collect(),
            pacing_min_ms: 500,
            pacing_max_ms: 2000,
            engine_timeout_secs: 7,
        }
    }
}

impl ScraperSettings {
    /// Load settings from a YAML file.
    #[instrument(level = "info", skip_all, fields(%path))]
    pub fn load(path: &str) -> Result<Self, Box<dyn Error>> {
        let raw = std::fs::read_to_string(path)?;
        let settings = Self::from_yaml(&raw)?;
        info!(
            user_agents = settings.user_agents.len(),
            referers = settings.referers.len(),
            "Loaded scraper settings"
        );
        Ok(settings)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(raw)
    }

    /// Pacing window, with the bounds swapped if they were given backwards.
    pub fn pacing(&self) -> RangeInclusive<Duration> {
        let lo = self.pacing_min_ms.min(self.pacing_max_ms);
        let hi = self.pacing_min_ms.max(self.pacing_max_ms);
        Duration::from_millis(lo)..=Duration::from_millis(hi)
    }

    pub fn engine_timeout(&self) -> Duration {
        Duration::from_secs(self.engine_timeout_secs)
    }

    pub fn rotator(&self) -> IdentityRotator {
        IdentityRotator::new(self.user_agents.clone(), self.referers.clone())
    }
}
