//! Article extraction from news sites that resist automated fetching.
//!
//! Every URL goes through the same cascade, driven by [`orchestrator`]:
//!
//! | Tier | Module | Method tag | Notes |
//! |------|--------|------------|-------|
//! | 1 | [`specialized`] | `specialized` | Engine download + DOM-aware parse, metadata included |
//! | 2 | [`generic`] + [`extractor`] | `generic_full` / `generic_basic` | Plain GET, selector heuristics |
//!
//! Each outbound request carries a fresh identity from [`identity`]. The
//! [`byline`] detector reuses tier 1 for author metadata before falling back
//! to textual patterns.
//!
//! Failures never propagate out of this module as panics: every tier returns a
//! [`FetchError`](crate::error::FetchError) and the orchestrator turns a fully
//! failed cascade into `None`.

pub mod byline;
pub mod extractor;
pub mod generic;
pub mod identity;
pub mod orchestrator;
pub mod specialized;
