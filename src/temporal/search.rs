//! Date-phrase search and direction-aware resolution
//!
//! Finds candidate temporal expressions (weekdays, relative day words,
//! quantity offsets, spelled-out and numeric dates) in free text and
//! resolves each to a calendar date relative to a reference day, biased
//! toward the past or the future as the caller directs.

use chrono::{Datelike, Days, Months, NaiveDate, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::temporal::lexicon::{
    calendar_units, months, quantity_words, relative_days, weekdays, CalendarUnit, Language,
};
use crate::temporal::TemporalDirection;

/// A candidate expression found in the utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateMatch {
    pub text: String,
    /// Byte offset into the original utterance
    pub position: usize,
}

fn alternation(words: impl Iterator<Item = &'static str>) -> String {
    let mut words: Vec<&str> = words.collect();
    // Longest first so "pasado mañana" wins over "mañana"
    words.sort_by_key(|w| std::cmp::Reverse(w.len()));
    words
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|")
}

fn patterns_for(language: Language) -> Vec<Regex> {
    let relative = alternation(relative_days(language).iter().map(|(w, _)| *w));
    let weekday = alternation(weekdays(language).iter().map(|(w, _)| *w));
    let quantity = alternation(quantity_words(language).iter().map(|(w, _)| *w));
    let unit = alternation(calendar_units(language).iter().map(|(w, _)| *w));
    let month = alternation(months(language).iter().map(|(w, _)| *w));

    let mut sources = vec![
        format!(r"(?i)\b(?:{relative})\b"),
        format!(r"(?i)\b(?:{weekday})\b"),
        format!(r"(?i)\b(?:\d{{1,3}}|{quantity})\s+(?:{unit})\b"),
        // ISO and numeric forms
        r"\b\d{4}-\d{2}-\d{2}\b".to_string(),
        r"\b\d{1,2}/\d{1,2}(?:/\d{2,4})?\b".to_string(),
    ];
    match language {
        Language::Spanish | Language::Portuguese => {
            sources.push(format!(
                r"(?i)\b\d{{1,2}}\s+de\s+(?:{month})(?:\s+(?:de|del)\s+\d{{4}})?\b"
            ));
        }
        Language::English => {
            sources.push(format!(
                r"(?i)\b(?:{month})\s+\d{{1,2}}(?:st|nd|rd|th)?(?:,?\s+\d{{4}})?\b"
            ));
            sources.push(format!(
                r"(?i)\b\d{{1,2}}(?:st|nd|rd|th)?\s+(?:of\s+)?(?:{month})(?:\s+\d{{4}})?\b"
            ));
        }
    }

    sources
        .iter()
        .map(|src| Regex::new(src).expect("valid search pattern"))
        .collect()
}

static SPANISH_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| patterns_for(Language::Spanish));
static ENGLISH_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| patterns_for(Language::English));
static PORTUGUESE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| patterns_for(Language::Portuguese));

fn language_patterns(language: Language) -> &'static [Regex] {
    match language {
        Language::Spanish => &SPANISH_PATTERNS,
        Language::English => &ENGLISH_PATTERNS,
        Language::Portuguese => &PORTUGUESE_PATTERNS,
    }
}

/// Find every candidate date expression in the text. Overlapping
/// candidates collapse to the longest one starting earliest.
pub fn search_dates(text: &str, languages: &[Language]) -> Vec<DateMatch> {
    let mut raw: Vec<(usize, usize)> = Vec::new();
    for language in languages {
        for pattern in language_patterns(*language) {
            for found in pattern.find_iter(text) {
                raw.push((found.start(), found.end()));
            }
        }
    }

    raw.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));

    let mut matches: Vec<DateMatch> = Vec::new();
    let mut covered_until = 0usize;
    for (start, end) in raw {
        if start < covered_until {
            continue;
        }
        matches.push(DateMatch {
            text: text[start..end].to_string(),
            position: start,
        });
        covered_until = end;
    }
    matches
}

fn next_weekday(reference: NaiveDate, target: Weekday) -> NaiveDate {
    let today = reference.weekday().num_days_from_monday() as i64;
    let wanted = target.num_days_from_monday() as i64;
    let mut ahead = (wanted - today).rem_euclid(7);
    if ahead == 0 {
        ahead = 7;
    }
    reference + Days::new(ahead as u64)
}

fn previous_weekday(reference: NaiveDate, target: Weekday) -> NaiveDate {
    let today = reference.weekday().num_days_from_monday() as i64;
    let wanted = target.num_days_from_monday() as i64;
    let mut behind = (today - wanted).rem_euclid(7);
    if behind == 0 {
        behind = 7;
    }
    reference - Days::new(behind as u64)
}

fn shift_by_unit(
    reference: NaiveDate,
    quantity: i64,
    unit: CalendarUnit,
    backward: bool,
) -> Option<NaiveDate> {
    let quantity = quantity.unsigned_abs();
    match unit {
        CalendarUnit::Day => {
            let days = Days::new(quantity);
            if backward {
                reference.checked_sub_days(days)
            } else {
                reference.checked_add_days(days)
            }
        }
        CalendarUnit::Week => {
            let days = Days::new(quantity * 7);
            if backward {
                reference.checked_sub_days(days)
            } else {
                reference.checked_add_days(days)
            }
        }
        CalendarUnit::Month => {
            let months = Months::new(quantity as u32);
            if backward {
                reference.checked_sub_months(months)
            } else {
                reference.checked_add_months(months)
            }
        }
        CalendarUnit::Year => {
            let months = Months::new(quantity as u32 * 12);
            if backward {
                reference.checked_sub_months(months)
            } else {
                reference.checked_add_months(months)
            }
        }
    }
}

/// Pin a month/day to a year so it lands on the preferred side of the
/// reference date.
fn resolve_month_day(
    reference: NaiveDate,
    month: u32,
    day: u32,
    explicit_year: Option<i32>,
    prefer: TemporalDirection,
) -> Option<NaiveDate> {
    if let Some(year) = explicit_year {
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    let this_year = NaiveDate::from_ymd_opt(reference.year(), month, day)?;
    match prefer {
        TemporalDirection::Past if this_year > reference => {
            NaiveDate::from_ymd_opt(reference.year() - 1, month, day)
        }
        TemporalDirection::Future | TemporalDirection::Unknown if this_year < reference => {
            NaiveDate::from_ymd_opt(reference.year() + 1, month, day)
        }
        _ => Some(this_year),
    }
}

fn parse_quantity(token: &str, language: Language) -> Option<i64> {
    if let Ok(number) = token.parse::<i64>() {
        return Some(number);
    }
    quantity_words(language)
        .iter()
        .find(|(word, _)| *word == token)
        .map(|(_, value)| *value)
}

/// Resolve one matched expression to a calendar date.
///
/// `prefer` settles everything the expression leaves open: which
/// occurrence of a bare weekday, which year for a bare month/day, and
/// which way a quantity offset points. `Unknown` is treated as future.
pub fn resolve_expression(
    matched_text: &str,
    languages: &[Language],
    reference: NaiveDate,
    prefer: TemporalDirection,
) -> Option<NaiveDate> {
    let normalized = matched_text.trim().to_lowercase();
    let backward = prefer == TemporalDirection::Past;

    // ISO form is language-independent
    if let Ok(date) = NaiveDate::parse_from_str(&normalized, "%Y-%m-%d") {
        return Some(date);
    }

    for language in languages {
        let language = *language;

        if let Some((_, offset)) = relative_days(language)
            .iter()
            .find(|(word, _)| *word == normalized)
        {
            return if *offset >= 0 {
                reference.checked_add_days(Days::new(*offset as u64))
            } else {
                reference.checked_sub_days(Days::new(offset.unsigned_abs()))
            };
        }

        if let Some((_, weekday)) = weekdays(language)
            .iter()
            .find(|(word, _)| *word == normalized)
        {
            return Some(if backward {
                previous_weekday(reference, *weekday)
            } else {
                next_weekday(reference, *weekday)
            });
        }

        // "dos semanas", "3 días", "one week"
        if let Some((quantity_token, unit_token)) = normalized.split_once(char::is_whitespace) {
            let unit = calendar_units(language)
                .iter()
                .find(|(word, _)| *word == unit_token.trim())
                .map(|(_, unit)| *unit);
            if let (Some(quantity), Some(unit)) =
                (parse_quantity(quantity_token.trim(), language), unit)
            {
                return shift_by_unit(reference, quantity, unit, backward);
            }
        }

        // "5 de diciembre [de 2025]" / "december 5[, 2025]" / "5th of december"
        if let Some(date) = parse_spelled_date(&normalized, language, reference, prefer) {
            return Some(date);
        }
    }

    // dd/mm[/yyyy]
    parse_numeric_date(&normalized, reference, prefer)
}

fn parse_spelled_date(
    normalized: &str,
    language: Language,
    reference: NaiveDate,
    prefer: TemporalDirection,
) -> Option<NaiveDate> {
    static DAY_FIRST: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^(\d{1,2})(?:st|nd|rd|th)?\s+(?:de\s+|of\s+)?([\wáéíóúâêôãõç]+)(?:\s+(?:de|del)\s+(\d{4})|,?\s+(\d{4}))?$")
            .expect("valid day-first pattern")
    });
    static MONTH_FIRST: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^([\wáéíóúâêôãõç]+)\s+(\d{1,2})(?:st|nd|rd|th)?(?:,?\s+(\d{4}))?$")
            .expect("valid month-first pattern")
    });

    let month_number = |name: &str| {
        months(language)
            .iter()
            .find(|(word, _)| *word == name)
            .map(|(_, number)| *number)
    };

    if let Some(captures) = DAY_FIRST.captures(normalized) {
        let day: u32 = captures[1].parse().ok()?;
        if let Some(month) = month_number(&captures[2]) {
            let year = captures
                .get(3)
                .or_else(|| captures.get(4))
                .and_then(|y| y.as_str().parse().ok());
            return resolve_month_day(reference, month, day, year, prefer);
        }
    }
    if let Some(captures) = MONTH_FIRST.captures(normalized) {
        if let Some(month) = month_number(&captures[1]) {
            let day: u32 = captures[2].parse().ok()?;
            let year = captures.get(3).and_then(|y| y.as_str().parse().ok());
            return resolve_month_day(reference, month, day, year, prefer);
        }
    }
    None
}

fn parse_numeric_date(
    normalized: &str,
    reference: NaiveDate,
    prefer: TemporalDirection,
) -> Option<NaiveDate> {
    static NUMERIC: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})(?:/(\d{2,4}))?$").expect("valid numeric pattern"));

    let captures = NUMERIC.captures(normalized)?;
    let day: u32 = captures[1].parse().ok()?;
    let month: u32 = captures[2].parse().ok()?;
    let year: Option<i32> = captures.get(3).map(|y| y.as_str()).and_then(|y| {
        let number: i32 = y.parse().ok()?;
        Some(if y.len() == 2 { 2000 + number } else { number })
    });
    resolve_month_day(reference, month, day, year, prefer)
}
