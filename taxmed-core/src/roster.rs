//! Household roster and fuzzy name resolution.
//!
//! Source exports spell the same person several ways ("JOHN A SMITH",
//! "SMITH; JOHN", a bare filename token). Every raw spelling is resolved to
//! one canonical roster entry before an item is emitted, so downstream
//! grouping never sees a raw source string.

use thiserror::Error;
use tracing::warn;

/// No roster was configured before parsing began.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("roster is empty: no household members configured")]
pub struct EmptyRosterError;

/// Read-only roster shared by every parser instance.
///
/// Built once before any file is opened, then passed by reference; parsers
/// never mutate it.
#[derive(Debug, Clone)]
pub struct RosterContext {
    people: Vec<String>,
    confidence_floor: f64,
}

impl RosterContext {
    /// Matches scoring below this are flagged as data-quality warnings.
    pub const DEFAULT_CONFIDENCE_FLOOR: f64 = 0.55;

    pub fn new(people: Vec<String>) -> Self {
        Self {
            people,
            confidence_floor: Self::DEFAULT_CONFIDENCE_FLOOR,
        }
    }

    pub fn with_confidence_floor(mut self, floor: f64) -> Self {
        self.confidence_floor = floor;
        self
    }

    pub fn people(&self) -> &[String] {
        &self.people
    }

    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }

    /// Resolve a raw name string to the best-matching roster entry.
    ///
    /// Always returns a match (closed-world roster: every observed input
    /// belongs to someone on it). A weak best match is logged, not
    /// rejected. Ties keep the earliest roster entry.
    pub fn resolve(&self, raw: &str) -> Result<&str, EmptyRosterError> {
        let first = self.people.first().ok_or(EmptyRosterError)?;

        let mut best = first.as_str();
        let mut best_score = similarity(raw, best);
        for person in &self.people[1..] {
            let score = similarity(raw, person);
            if score > best_score {
                best = person.as_str();
                best_score = score;
            }
        }

        if best_score < self.confidence_floor {
            warn!(
                raw_name = raw,
                matched = best,
                score = best_score,
                "low-confidence roster match"
            );
        }

        Ok(best)
    }
}

/// Similarity in [0, 1]: the better of a whole-string edit-distance ratio
/// and a token-by-token ratio, so both transposed-word and partial-name
/// inputs ("SMITH; JOHN", a bare "john") score well.
fn similarity(raw: &str, candidate: &str) -> f64 {
    let a = raw.trim().to_lowercase();
    let b = candidate.trim().to_lowercase();
    ratio(&a, &b).max(token_ratio(&a, &b))
}

fn ratio(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein_distance(a, b) as f64 / longest as f64
}

/// Mean, over the input's tokens, of each token's best ratio against the
/// candidate's tokens.
fn token_ratio(a: &str, b: &str) -> f64 {
    let a_tokens: Vec<&str> = a.split_whitespace().collect();
    let b_tokens: Vec<&str> = b.split_whitespace().collect();
    if a_tokens.is_empty() || b_tokens.is_empty() {
        return 0.0;
    }

    let total: f64 = a_tokens
        .iter()
        .map(|t| {
            b_tokens
                .iter()
                .map(|c| ratio(t, c))
                .fold(0.0_f64, f64::max)
        })
        .sum();
    total / a_tokens.len() as f64
}

/// Minimum number of single-character edits turning one string into the
/// other.
fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let a: Vec<char> = s1.chars().collect();
    let b: Vec<char> = s2.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0usize; b.len() + 1];

    for i in 1..=a.len() {
        cur[0] = i;
        for j in 1..=b.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            cur[j] = (prev[j] + 1).min(cur[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut cur);
    }

    prev[b.len()]
}
