//! Natural-language temporal enrichment
//!
//! Detects date expressions in Spanish, English, and Portuguese
//! utterances and inlines resolved ISO dates, using surrounding
//! modifiers and verb tense to disambiguate past vs. future.

pub mod lexicon;
pub mod search;
pub mod enricher;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub use enricher::TemporalEnricher;
pub use lexicon::Language;

/// Whether a date expression points backward or forward in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemporalDirection {
    Past,
    Future,
    Unknown,
}

/// One detected and resolved date expression.
#[derive(Debug, Clone, PartialEq)]
pub struct TemporalMatch {
    /// The expression as it appears in the utterance
    pub matched_text: String,
    /// Byte offset of the expression in the utterance
    pub position: usize,
    /// The calendar date the expression resolves to
    pub resolved_date: NaiveDate,
    /// Context-derived direction used for the resolution
    pub direction: TemporalDirection,
}
