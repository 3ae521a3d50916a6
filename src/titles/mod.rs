//! Canonical title mapping and the salary estimate that hangs off it.

pub mod salary;

use tracing::{debug, warn};

use crate::reference::ReferenceData;
use salary::{round2, SalarySource, SalaryStats};

/// Token-order-insensitive similarity in [0, 100].
pub trait FuzzyTitleMatcher: Send + Sync {
    fn score(&self, query: &str, choice: &str) -> f64;
}

/// Lower-cases, splits on anything that is not alphanumeric, sorts the words
/// and compares the rejoined strings by normalized edit similarity.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokenSortRatio;

impl TokenSortRatio {
    fn sorted_tokens(text: &str) -> String {
        let lower = text.to_lowercase();
        let mut words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        words.sort_unstable();
        words.join(" ")
    }
}

impl FuzzyTitleMatcher for TokenSortRatio {
    fn score(&self, query: &str, choice: &str) -> f64 {
        let a = Self::sorted_tokens(query);
        let b = Self::sorted_tokens(choice);
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        strsim::normalized_levenshtein(&a, &b) * 100.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TitleMapping {
    pub raw: String,
    pub canonical: String,
    /// Rounded to two decimals.
    pub score: f64,
}

/// Mapping and salary for one title. `salary` is only ever set together with
/// `mapping`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TitleEstimate {
    pub mapping: Option<TitleMapping>,
    pub salary: Option<SalaryStats>,
}

pub struct TitleNormalizer {
    matcher: Box<dyn FuzzyTitleMatcher>,
    salary: Box<dyn SalarySource>,
}

impl TitleNormalizer {
    pub fn new(matcher: Box<dyn FuzzyTitleMatcher>, salary: Box<dyn SalarySource>) -> Self {
        TitleNormalizer { matcher, salary }
    }

    /// Highest scoring canonical title; the earlier title wins a tie.
    pub fn best_match<'t>(&self, raw: &str, titles: &'t [String]) -> Option<(&'t str, f64)> {
        let mut best: Option<(&str, f64)> = None;
        for title in titles {
            let score = self.matcher.score(raw, title);
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((title.as_str(), score));
            }
        }
        best
    }

    pub fn normalize(&self, raw: &str, reference: &ReferenceData) -> TitleEstimate {
        let Some((canonical, score)) = self.best_match(raw, &reference.titles) else {
            return TitleEstimate::default();
        };
        if score < reference.title_threshold {
            debug!(title = raw, best = canonical, score, "title below threshold");
            return TitleEstimate::default();
        }

        let mapping = TitleMapping {
            raw: raw.to_string(),
            canonical: canonical.to_string(),
            score: round2(score),
        };
        let salary = match self.salary.histogram(canonical) {
            Ok(histogram) => SalaryStats::from_histogram(&histogram).map(|s| s.monthly(reference.ppp_factor)),
            Err(e) => {
                warn!(title = canonical, "salary lookup failed: {:#}", e);
                None
            }
        };
        TitleEstimate {
            mapping: Some(mapping),
            salary,
        }
    }
}

// ── Tests ──
