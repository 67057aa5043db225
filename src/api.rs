//! Generative-service access with exponential backoff retry logic.
//!
//! Sentiment and summary prompts are plain text in, plain text out. The
//! service sits behind the [`Generate`] trait so the analysis code can be
//! driven by a mock in tests:
//!
//! - [`Generate`]: one prompt, one reply
//! - [`AwfulJadeClient`]: talks to an OpenAI-compatible endpoint via `awful_aj`
//! - [`RetryGenerate`]: decorator that retries any [`Generate`] with backoff
//!
//! # Retry Strategy
//!
//! ```text
//! delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..=250ms)
//! ```
//!
//! Five retries by default, starting at one second and capped at 30 seconds.

use awful_aj::api::ask;
use awful_aj::{config, config::AwfulJadeConfig, template, template::ChatTemplate};
use rand::{Rng, rng};
use std::error::Error;
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

/// A text-generation backend.
pub trait Generate {
    /// Send `prompt` and return the raw reply text.
    async fn generate(&self, prompt: &str) -> Result<String, Box<dyn Error>>;
}

/// Adds exponential backoff retries to any [`Generate`] implementation.
pub struct RetryGenerate<T> {
    inner: T,
    max_retries: usize,
    base_delay: StdDuration,
    max_delay: StdDuration,
    max_jitter_ms: u64,
}

impl<T: Generate> RetryGenerate<T> {
    /// Wrap `inner`; `max_retries = 5` and `base_delay = 1s` are what the
    /// binary uses.
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
            max_jitter_ms: 250,
        }
    }

    pub fn with_max_delay(mut self, max_delay: StdDuration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn with_max_jitter_ms(mut self, max_jitter_ms: u64) -> Self {
        self.max_jitter_ms = max_jitter_ms;
        self
    }

    /// Backoff before retry number `attempt` (1-based), without jitter.
    fn backoff(&self, attempt: usize) -> StdDuration {
        let shift = (attempt.saturating_sub(1)).min(31) as u32;
        self.base_delay
            .saturating_mul(1u32 << shift)
            .min(self.max_delay)
    }
}

impl<T> fmt::Debug for RetryGenerate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryGenerate")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T: Generate> Generate for RetryGenerate<T> {
    #[instrument(level = "info", skip_all)]
    async fn generate(&self, prompt: &str) -> Result<String, Box<dyn Error>> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.generate(prompt).await {
                Ok(reply) => return Ok(reply),
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis(),
                            elapsed_ms_total = total_dt.as_millis(),
                            error = %e,
                            "generate() exhausted retries"
                        );
                        return Err(e);
                    }

                    let jitter_ms: u64 = rng().random_range(0..=self.max_jitter_ms);
                    let delay = self.backoff(attempt) + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis(),
                        elapsed_ms_total = total_dt.as_millis(),
                        ?delay,
                        error = %e,
                        "generate() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// [`Generate`] over `awful_aj::api::ask`.
#[derive(Debug)]
pub struct AwfulJadeClient {
    config: AwfulJadeConfig,
    template: ChatTemplate,
}

impl AwfulJadeClient {
    pub fn new(config: AwfulJadeConfig, template: ChatTemplate) -> Self {
        Self { config, template }
    }

    /// Load the endpoint config from `config_path` and the named chat template
    /// from the awful_aj config directory.
    #[instrument(level = "info", skip_all, fields(%config_path, %template_name))]
    pub async fn load(config_path: &str, template_name: &str) -> Result<Self, Box<dyn Error>> {
        let template = template::load_template(template_name).await?;
        info!(template_name, "Loaded template");
        let config = config::load_config(config_path)?;
        info!(config_path, "Loaded configuration");
        Ok(Self::new(config, template))
    }
}

impl Generate for AwfulJadeClient {
    #[instrument(level = "info", skip_all)]
    async fn generate(&self, prompt: &str) -> Result<String, Box<dyn Error>> {
        let t0 = Instant::now();
        let res = ask(&self.config, prompt.to_string(), &self.template, None, None).await;
        let dt = t0.elapsed();

        if let Err(e) = &res {
            warn!(elapsed_ms = dt.as_millis(), error = %e, "API call failed");
        }
        res
    }
}
