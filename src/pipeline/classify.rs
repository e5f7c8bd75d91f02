//! Status classification.
//!
//! Pure mapping from a strategy's raw result to an [`Availability`]. Every
//! input yields one of the three states; nothing here performs I/O.

use crate::models::{Availability, Strategy};
use crate::services::{ApiLookup, CVS_FULLY_BOOKED, HEB_NO_SLOTS, RawResult, TERMINAL_PHRASES};

/// Classify a raw query result for the given strategy.
pub fn classify(strategy: &Strategy, raw: &RawResult) -> Availability {
    match (strategy, raw) {
        (
            Strategy::PhraseMatch {
                pos_phrase,
                neg_phrase,
                ..
            },
            RawResult::Page { text, .. },
        ) => classify_page(text, pos_phrase, neg_phrase),
        (Strategy::Cvs { .. }, RawResult::Api(lookup)) => classify_lookup(lookup, CVS_FULLY_BOOKED),
        (Strategy::Heb { .. }, RawResult::Api(lookup)) => classify_lookup(lookup, HEB_NO_SLOTS),
        (Strategy::Browser { .. }, RawResult::Browser { text }) => {
            classify_browser(text.as_deref())
        }
        (strategy, raw) => {
            log::warn!(
                "{} strategy produced an unexpected result: {:?}",
                strategy.kind(),
                raw
            );
            Availability::ProbablyNot
        }
    }
}

/// Positive phrase wins, then negative, otherwise unknown.
///
/// An empty positive phrase never matches.
pub fn classify_page(text: &str, pos_phrase: &str, neg_phrase: &str) -> Availability {
    if !pos_phrase.is_empty() && text.contains(pos_phrase) {
        Availability::Probably
    } else if text.contains(neg_phrase) {
        Availability::ProbablyNot
    } else {
        Availability::Maybe
    }
}

/// Sentinel everywhere means booked out; anything else is worth a look.
pub fn classify_lookup(lookup: &ApiLookup, sentinel: &str) -> Availability {
    match lookup {
        ApiLookup::Missing(_) => Availability::ProbablyNot,
        ApiLookup::Found(values) if values.iter().all(|v| v == sentinel) => {
            Availability::ProbablyNot
        }
        ApiLookup::Found(_) => Availability::Maybe,
    }
}

pub fn classify_browser(text: Option<&str>) -> Availability {
    match text {
        Some(text) if TERMINAL_PHRASES.iter().any(|p| text.contains(p)) => {
            Availability::ProbablyNot
        }
        _ => Availability::Maybe,
    }
}
