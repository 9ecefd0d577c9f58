use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use rowscribe_core::{Recommendation, TaskRecord};

pub const DEFAULT_TOP_N: usize = 3;
/// Candidates scoring below this are never recommended.
pub const MIN_SIMILARITY: f64 = 1.0;

const MAX_CHARS: usize = 10_000;
const HALF_CHARS: usize = MAX_CHARS / 2;

/// Rank `corpus` by similarity of each task's SQL to `sql_text`.
///
/// Ties keep the most recently created task first, then the lowest task id.
pub fn recommend(sql_text: &str, corpus: &[TaskRecord], top_n: usize) -> Vec<Recommendation> {
    if corpus.is_empty() || top_n == 0 {
        return Vec::new();
    }
    let query = TermVector::from_text(sql_text);

    let mut ranked: Vec<Recommendation> = corpus
        .iter()
        .map(|task| Recommendation {
            similarity: query.score(&TermVector::from_text(&task.sql)),
            task: task.clone(),
        })
        .filter(|candidate| candidate.similarity >= MIN_SIMILARITY)
        .collect();

    ranked.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.task.created_at.cmp(&a.task.created_at))
            .then_with(|| a.task.task_id.cmp(&b.task.task_id))
    });
    ranked.truncate(top_n);

    debug!(
        corpus = corpus.len(),
        returned = ranked.len(),
        best = ranked.first().map(|top| top.similarity).unwrap_or_default(),
        "similarity ranking completed"
    );
    ranked
}

/// Score in `[0, 100]` between two SQL texts, rounded to one decimal.
pub fn similarity(left: &str, right: &str) -> f64 {
    TermVector::from_text(left).score(&TermVector::from_text(right))
}

/// Term frequencies of word tokens and adjacent-token bigrams.
struct TermVector {
    text: String,
    terms: HashMap<String, f64>,
    norm: f64,
}

impl TermVector {
    fn from_text(text: &str) -> Self {
        let text = clip(text);
        let tokens: Vec<String> = token_pattern()
            .map(|pattern| {
                pattern
                    .find_iter(&text)
                    .map(|token| token.as_str().to_lowercase())
                    .collect()
            })
            .unwrap_or_default();

        let mut terms: HashMap<String, f64> = HashMap::new();
        for token in &tokens {
            *terms.entry(token.clone()).or_default() += 1.0;
        }
        for pair in tokens.windows(2) {
            *terms.entry(format!("{} {}", pair[0], pair[1])).or_default() += 1.0;
        }
        let norm = terms.values().map(|count| count * count).sum::<f64>().sqrt();
        Self { text, terms, norm }
    }

    fn score(&self, other: &TermVector) -> f64 {
        if !self.text.trim().is_empty() && self.text == other.text {
            return 100.0;
        }
        if self.norm == 0.0 || other.norm == 0.0 {
            return 0.0;
        }
        let (small, large) = if self.terms.len() <= other.terms.len() {
            (self, other)
        } else {
            (other, self)
        };
        let dot: f64 = small
            .terms
            .iter()
            .filter_map(|(term, count)| large.terms.get(term).map(|other| count * other))
            .sum();
        let cosine = dot / (self.norm * other.norm);
        ((cosine * 100.0).clamp(0.0, 100.0) * 10.0).round() / 10.0
    }
}

fn token_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"\w+").ok())
        .as_ref()
}

// Long scripts keep their head and tail.
fn clip(text: &str) -> String {
    let total = text.chars().count();
    if total <= MAX_CHARS {
        return text.to_string();
    }
    let head: String = text.chars().take(HALF_CHARS).collect();
    let tail: String = text.chars().skip(total - HALF_CHARS).collect();
    format!("{head}\n{tail}")
}
