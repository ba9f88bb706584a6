//! Release-candidate enrichment scoring.
//!
//! Providers rarely echo back catalog identifiers, so listings arrive as
//! free-text titles. This module maps a listing onto a watched release by
//! token overlap: titles and artists are tokenized minus stop words, scored
//! by coverage of the candidate's tokens, and a mapping is accepted only
//! when the best candidate clears a confidence threshold and beats the
//! runner-up by a margin.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Value};
use std::collections::HashSet;

use crate::watch_releases::WatchRelease;

/// Minimum score before a candidate is considered a match at all.
pub const CONFIDENCE_THRESHOLD: f64 = 0.82;
/// Required lead over the second-best candidate.
pub const CONFIDENCE_MARGIN: f64 = 0.10;

const TITLE_WEIGHT: f64 = 0.8;
const ARTIST_WEIGHT: f64 = 0.2;

lazy_static! {
    static ref NON_ALNUM: Regex = Regex::new(r"[^a-z0-9]+").unwrap();
    static ref STOP_WORDS: HashSet<&'static str> = {
        let mut s = HashSet::new();
        for w in [
            "a", "an", "and", "ep", "feat", "featuring", "ft", "lp", "mix", "record",
            "remaster", "stereo", "the", "vinyl",
        ] {
            s.insert(w);
        }
        s
    };
}

/// Lowercase, strip punctuation, collapse whitespace. The canonical form
/// stored alongside each listing and used for keyword filtering.
pub fn normalize_title(title: &str) -> String {
    NON_ALNUM
        .split(&title.to_lowercase())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn tokenize(text: &str) -> HashSet<String> {
    NON_ALNUM
        .split(&text.to_lowercase())
        .filter(|t| !t.is_empty() && !STOP_WORDS.contains(t))
        .map(str::to_string)
        .collect()
}

/// Fraction of `reference` tokens present in `observed`. Empty reference
/// yields zero so a watch with no usable tokens never self-matches.
fn coverage(observed: &HashSet<String>, reference: &HashSet<String>) -> f64 {
    if reference.is_empty() {
        return 0.0;
    }
    let hits = reference.iter().filter(|t| observed.contains(*t)).count();
    hits as f64 / reference.len() as f64
}

#[derive(Debug, Clone)]
pub struct CandidateScore {
    pub watch_release_id: String,
    pub discogs_release_id: i64,
    pub discogs_master_id: Option<i64>,
    pub score: f64,
    pub title_score: f64,
    pub artist_score: f64,
}

/// Score every active watch against a listing's title text and return the
/// accepted candidate, if any.
pub fn best_candidate(
    listing_title: &str,
    candidates: &[WatchRelease],
) -> Option<CandidateScore> {
    let observed = tokenize(listing_title);
    if observed.is_empty() {
        return None;
    }

    let mut scored: Vec<CandidateScore> = candidates
        .iter()
        .map(|watch| {
            let title_score = coverage(&observed, &tokenize(&watch.title));
            let artist_score = watch
                .artist
                .as_deref()
                .map(|a| coverage(&observed, &tokenize(a)))
                .unwrap_or(title_score);
            CandidateScore {
                watch_release_id: watch.id.clone(),
                discogs_release_id: watch.discogs_release_id,
                discogs_master_id: watch.discogs_master_id,
                score: TITLE_WEIGHT * title_score + ARTIST_WEIGHT * artist_score,
                title_score,
                artist_score,
            }
        })
        .collect();

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

    let best = scored.first()?;
    if best.score < CONFIDENCE_THRESHOLD {
        return None;
    }
    if let Some(runner_up) = scored.get(1) {
        if best.score - runner_up.score < CONFIDENCE_MARGIN {
            return None;
        }
    }
    Some(best.clone())
}

/// Record the mapping decision into the listing's raw payload so the
/// provenance of an inferred identity survives later re-ingests.
pub fn mapping_decision(raw: Option<Value>, candidate: &CandidateScore) -> Value {
    let mut doc = match raw {
        Some(Value::Object(map)) => Value::Object(map),
        _ => json!({}),
    };
    doc["matching"] = json!({
        "discogs_mapping": {
            "watch_release_id": candidate.watch_release_id,
            "discogs_release_id": candidate.discogs_release_id,
            "discogs_master_id": candidate.discogs_master_id,
            "score": candidate.score,
            "title_score": candidate.title_score,
            "artist_score": candidate.artist_score,
        }
    });
    doc
}
