//! Temporal enrichment of utterance text
//!
//! For each date expression detected in a caller utterance, injects
//! ` (YYYY-MM-DD)` immediately after the expression (extended past a
//! trailing modifier), resolved against the surrounding sentence
//! context. Enrichment never fails: anything that cannot be handled
//! leaves the text unchanged.

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::config::TemporalConfig;
use crate::temporal::lexicon::{
    future_modifiers_after, future_modifiers_before, future_tense_verbs, past_modifiers_after,
    past_modifiers_before, past_tense_verbs, valid_short_patterns, Language,
};
use crate::temporal::search::{resolve_expression, search_dates};
use crate::temporal::{TemporalDirection, TemporalMatch};

/// Matches shorter than this are false positives unless allow-listed.
const MIN_DATE_MATCH_LENGTH: usize = 4;

/// Chars of immediate context inspected for direct modifiers.
const MODIFIER_WINDOW_CHARS: usize = 20;

/// Chars of sentence context inspected for tensed verbs.
const SENTENCE_WINDOW_CHARS: usize = 50;

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\w]+").expect("valid word pattern"));

/// Detects date phrases and inlines resolved ISO dates.
pub struct TemporalEnricher {
    languages: Vec<Language>,
    timezone: Option<Tz>,
    ambiguous_direction: TemporalDirection,
    reference: Option<NaiveDate>,
}

impl TemporalEnricher {
    pub fn new(config: &TemporalConfig) -> Self {
        let languages: Vec<Language> = config
            .languages
            .iter()
            .filter_map(|code| {
                let language = Language::from_code(code);
                if language.is_none() {
                    warn!("temporal enricher does not support language '{code}', skipping");
                }
                language
            })
            .collect();
        let timezone = config.timezone.as_deref().and_then(|name| {
            let tz = name.parse().ok();
            if tz.is_none() {
                warn!("unknown timezone '{name}' for temporal enricher, using UTC days");
            }
            tz
        });
        Self {
            languages,
            timezone,
            ambiguous_direction: config.ambiguous_direction,
            reference: None,
        }
    }

    /// Pin "today" for deterministic resolution (tests, replays).
    pub fn with_reference(mut self, reference: NaiveDate) -> Self {
        self.reference = Some(reference);
        self
    }

    fn today(&self) -> NaiveDate {
        if let Some(reference) = self.reference {
            return reference;
        }
        match self.timezone {
            Some(tz) => Utc::now().with_timezone(&tz).date_naive(),
            None => Utc::now().date_naive(),
        }
    }

    /// Reject matches that are too short (unless allow-listed) or not
    /// aligned to word boundaries in the original text.
    fn is_valid_match(&self, matched_text: &str, text: &str, position: usize) -> bool {
        let matched_lower = matched_text.trim().to_lowercase();
        let allow_listed = self
            .languages
            .iter()
            .any(|lang| valid_short_patterns(*lang).contains(&matched_lower.as_str()));
        if !allow_listed && matched_lower.chars().count() < MIN_DATE_MATCH_LENGTH {
            return false;
        }

        let before_ok = position == 0
            || text[..position]
                .chars()
                .next_back()
                .map(|c| !c.is_alphanumeric())
                .unwrap_or(true);
        let end = position + matched_text.len();
        let after_ok = end >= text.len()
            || text[end..]
                .chars()
                .next()
                .map(|c| !c.is_alphanumeric())
                .unwrap_or(true);
        before_ok && after_ok
    }

    /// Direction of a date expression from its sentence context.
    ///
    /// Direct modifiers in the 20-char windows win outright; otherwise
    /// tensed verbs in a 50-char window decide, and only a single
    /// polarity counts. Anything else is Unknown.
    fn temporal_direction(&self, text: &str, position: usize, matched_text: &str) -> TemporalDirection {
        let match_end = position + matched_text.len();

        let context_before: String = {
            let before: Vec<char> = text[..position].chars().collect();
            before[before.len().saturating_sub(MODIFIER_WINDOW_CHARS)..]
                .iter()
                .collect::<String>()
                .to_lowercase()
                .trim()
                .to_string()
        };
        let context_after: String = text[match_end..]
            .chars()
            .take(MODIFIER_WINDOW_CHARS)
            .collect::<String>()
            .to_lowercase()
            .trim()
            .to_string();

        for language in &self.languages {
            let language = *language;
            if past_modifiers_after(language)
                .iter()
                .any(|m| context_after.starts_with(m))
                || past_modifiers_before(language)
                    .iter()
                    .any(|m| context_before.ends_with(m))
            {
                return TemporalDirection::Past;
            }
        }
        for language in &self.languages {
            let language = *language;
            if future_modifiers_after(language)
                .iter()
                .any(|m| context_after.starts_with(m))
                || future_modifiers_before(language)
                    .iter()
                    .any(|m| context_before.ends_with(m))
            {
                return TemporalDirection::Future;
            }
        }

        // No direct modifier: fall back to verb tense in the sentence
        let sentence_start: String = {
            let before: Vec<char> = text[..position].chars().collect();
            before[before.len().saturating_sub(SENTENCE_WINDOW_CHARS)..]
                .iter()
                .collect()
        };
        let sentence_end: String = text[match_end..]
            .chars()
            .take(SENTENCE_WINDOW_CHARS)
            .collect();
        let sentence_context =
            format!("{sentence_start}{}{sentence_end}", &text[position..match_end]).to_lowercase();

        let words_in_context: std::collections::HashSet<&str> = WORD
            .find_iter(&sentence_context)
            .map(|m| m.as_str())
            .collect();

        let mut past_found = false;
        let mut future_found = false;
        for language in &self.languages {
            let language = *language;
            past_found |= past_tense_verbs(language).iter().any(|verb| {
                if verb.contains(' ') {
                    sentence_context.contains(verb)
                } else {
                    words_in_context.contains(verb)
                }
            });
            future_found |= future_tense_verbs(language).iter().any(|verb| {
                if verb.contains(' ') {
                    sentence_context.contains(verb)
                } else {
                    words_in_context.contains(verb)
                }
            });
        }

        match (past_found, future_found) {
            (true, false) => TemporalDirection::Past,
            (false, true) => TemporalDirection::Future,
            _ => TemporalDirection::Unknown,
        }
    }

    /// Byte length of a trailing modifier (plus the whitespace before
    /// it) directly following the match, so the injected annotation
    /// lands after the full phrase.
    fn trailing_modifier_length(&self, text: &str, match_end: usize) -> usize {
        let rest = &text[match_end..];
        let whitespace_len = rest.len() - rest.trim_start().len();
        let after_lower = rest.trim_start().to_lowercase();

        let mut longest = 0usize;
        for language in &self.languages {
            let language = *language;
            for modifier in past_modifiers_after(language)
                .iter()
                .chain(future_modifiers_after(language))
            {
                if after_lower.starts_with(modifier) {
                    longest = longest.max(whitespace_len + modifier.len());
                }
            }
        }
        longest
    }

    /// Every valid date expression in the text, resolved.
    pub fn matches(&self, text: &str) -> Vec<TemporalMatch> {
        let today = self.today();
        let mut results = Vec::new();

        for found in search_dates(text, &self.languages) {
            if !self.is_valid_match(&found.text, text, found.position) {
                continue;
            }
            let direction = self.temporal_direction(text, found.position, &found.text);
            let effective = if direction == TemporalDirection::Unknown {
                // Ambiguity bias is domain configuration
                self.ambiguous_direction
            } else {
                direction
            };
            let Some(resolved_date) =
                resolve_expression(&found.text, &self.languages, today, effective)
            else {
                continue;
            };
            results.push(TemporalMatch {
                matched_text: found.text,
                position: found.position,
                resolved_date,
                direction,
            });
        }
        results
    }

    /// Inject ` (YYYY-MM-DD)` after each detected expression. On any
    /// internal failure the input is returned unchanged.
    pub fn inject_parsed_dates(&self, text: &str) -> String {
        let mut matches = self.matches(text);
        if matches.is_empty() {
            return text.to_string();
        }

        // Replace back-to-front so earlier offsets stay valid
        matches.sort_by(|a, b| b.position.cmp(&a.position));

        let mut enriched = text.to_string();
        for found in matches {
            let match_end = found.position + found.matched_text.len();
            let full_end = match_end + self.trailing_modifier_length(text, match_end);
            if full_end > enriched.len() || !enriched.is_char_boundary(full_end) {
                continue;
            }
            let annotation = format!(" ({})", found.resolved_date.format("%Y-%m-%d"));
            enriched.insert_str(full_end, &annotation);
        }

        debug!("temporal enrichment: '{text}' -> '{enriched}'");
        enriched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enricher(languages: &[&str]) -> TemporalEnricher {
        TemporalEnricher::new(&TemporalConfig {
            languages: languages.iter().map(|s| s.to_string()).collect(),
            timezone: None,
            ambiguous_direction: TemporalDirection::Future,
        })
        // Friday
        .with_reference(NaiveDate::from_ymd_opt(2025, 12, 5).unwrap())
    }

    #[test]
    fn test_future_verb_biases_weekday_forward() {
        let enriched = enricher(&["es"]).inject_parsed_dates("voy a pagar el martes");
        assert_eq!(enriched, "voy a pagar el martes (2025-12-09)");
    }

    #[test]
    fn test_trailing_modifier_extends_injection() {
        let enriched = enricher(&["es"]).inject_parsed_dates("el lunes pasado fui");
        assert_eq!(enriched, "el lunes pasado (2025-12-01) fui");
    }

    #[test]
    fn test_bare_weekday_defaults_to_future() {
        let enriched = enricher(&["es"]).inject_parsed_dates("el lunes");
        assert_eq!(enriched, "el lunes (2025-12-08)");
    }

    #[test]
    fn test_past_verb_biases_backward() {
        let matches = enricher(&["es"]).matches("pagué el martes");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].direction, TemporalDirection::Past);
        assert_eq!(
            matches[0].resolved_date,
            NaiveDate::from_ymd_opt(2025, 12, 2).unwrap()
        );
    }

    #[test]
    fn test_leading_past_modifier_wins_over_verb() {
        // "voy" says future but the direct modifier "hace" wins
        let matches = enricher(&["es"]).matches("voy a revisar qué pasó hace dos semanas");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].direction, TemporalDirection::Past);
        assert_eq!(
            matches[0].resolved_date,
            NaiveDate::from_ymd_opt(2025, 11, 21).unwrap()
        );
    }

    #[test]
    fn test_english_next_monday() {
        let matches = enricher(&["en"]).matches("I'll pay next monday");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].direction, TemporalDirection::Future);
        assert_eq!(
            matches[0].resolved_date,
            NaiveDate::from_ymd_opt(2025, 12, 8).unwrap()
        );
    }

    #[test]
    fn test_english_ago_is_past() {
        let matches = enricher(&["en"]).matches("we spoke two weeks ago");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].direction, TemporalDirection::Past);
        assert_eq!(
            matches[0].resolved_date,
            NaiveDate::from_ymd_opt(2025, 11, 21).unwrap()
        );
    }

    #[test]
    fn test_portuguese_past_weekday() {
        let enriched = enricher(&["pt"]).inject_parsed_dates("a segunda passada paguei");
        assert_eq!(enriched, "a segunda passada (2025-12-01) paguei");
    }

    #[test]
    fn test_multiple_matches_keep_offsets_valid() {
        let enriched =
            enricher(&["es"]).inject_parsed_dates("pago el martes o el miércoles si puedo");
        assert_eq!(
            enriched,
            "pago el martes (2025-12-09) o el miércoles (2025-12-10) si puedo"
        );
    }

    #[test]
    fn test_text_without_dates_is_unchanged() {
        let text = "gracias por la información";
        assert_eq!(enricher(&["es"]).inject_parsed_dates(text), text);
    }

    #[test]
    fn test_short_false_positives_are_dropped() {
        // "mes" is allow-listed in the lexicon? It is a valid short
        // pattern, so use a non-listed short token instead: a bare
        // numeric day fragment should not survive the length filter.
        let text = "marca 1/2 en el formulario";
        let matches = enricher(&["es"]).matches(text);
        assert!(matches.is_empty());
    }

    #[test]
    fn test_embedded_word_is_not_a_match() {
        // "lunes" embedded inside a longer token must not match
        let text = "lunesco es una palabra inventada";
        let matches = enricher(&["es"]).matches(text);
        assert!(matches.is_empty());
    }

    #[test]
    fn test_unknown_language_is_skipped() {
        let enriched = enricher(&["de", "es"]).inject_parsed_dates("voy a pagar el martes");
        assert_eq!(enriched, "voy a pagar el martes (2025-12-09)");
    }

    #[test]
    fn test_spelled_date_with_year() {
        let matches = enricher(&["es"]).matches("nací el 5 de marzo de 1990");
        assert_eq!(matches.len(), 1);
        assert_eq!(
            matches[0].resolved_date,
            NaiveDate::from_ymd_opt(1990, 3, 5).unwrap()
        );
    }
}
