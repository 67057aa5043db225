//! Generative analyses run over extracted article text.
//!
//! Both analyzers borrow a [`Generate`](crate::api::Generate) backend, build a
//! prompt, and turn the reply into a model type. Neither ever fails the row:
//! a service error is reported as `None` and the batch driver writes a status
//! string in its place.

pub mod sentiment;
pub mod summary;

pub use sentiment::SentimentAnalyzer;
pub use summary::{SummaryConfig, SummaryLanguage, SummaryStyle, Summarizer};
