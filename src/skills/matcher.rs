use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use regex::Regex;

use super::{MatchKind, SkillMatch, SkillMatcher};
use crate::reference::Taxonomy;

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z0-9][a-z0-9+#.\-]*[a-z0-9+#]|[a-z0-9]").unwrap());
static PARENTHETICAL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*\([^)]*\)").unwrap());

/// Name as written in postings: "Python (Programming Language)" is "Python".
pub fn surface_form(name: &str) -> String {
    PARENTHETICAL_RE.replace_all(name, "").trim().to_string()
}

fn words(text: &str) -> Vec<String> {
    WORD_RE
        .find_iter(&text.to_lowercase())
        .map(|m| m.as_str().to_string())
        .collect()
}

struct Surface {
    id: String,
    tokens: Vec<String>,
    joined: String,
}

/// Taxonomy matcher over lower-cased word sequences. Exact matches are whole
/// name sequences found in the sentence; scored matches are multi-word sentence
/// windows close to a same-length skill name by normalized edit similarity.
pub struct TaxonomyMatcher {
    exact: HashMap<Vec<String>, Vec<String>>,
    max_len: usize,
    surfaces: Vec<Surface>,
    /// Word → indices into `surfaces` of multi-word names containing it.
    by_word: HashMap<String, Vec<usize>>,
    threshold: f64,
}

impl TaxonomyMatcher {
    pub fn new(taxonomy: &Taxonomy, threshold: f64) -> Self {
        let mut exact: HashMap<Vec<String>, Vec<String>> = HashMap::new();
        let mut surfaces = Vec::new();
        let mut by_word: HashMap<String, Vec<usize>> = HashMap::new();

        for entry in taxonomy.iter() {
            let tokens = words(&surface_form(&entry.name));
            if tokens.is_empty() {
                continue;
            }
            exact.entry(tokens.clone()).or_default().push(entry.id.clone());
            if tokens.len() > 1 {
                let idx = surfaces.len();
                for word in tokens.iter().collect::<BTreeSet<_>>() {
                    by_word.entry(word.clone()).or_default().push(idx);
                }
                surfaces.push(Surface {
                    id: entry.id.clone(),
                    joined: tokens.join(" "),
                    tokens,
                });
            }
        }

        let max_len = exact.keys().map(Vec::len).max().unwrap_or(0);
        TaxonomyMatcher {
            exact,
            max_len,
            surfaces,
            by_word,
            threshold,
        }
    }
}

impl SkillMatcher for TaxonomyMatcher {
    fn annotate(&self, sentence: &str) -> Vec<SkillMatch> {
        let tokens = words(sentence);
        let mut full = BTreeSet::new();
        let mut scored: HashMap<&str, f64> = HashMap::new();

        for start in 0..tokens.len() {
            for len in 1..=self.max_len.min(tokens.len() - start) {
                let window = &tokens[start..start + len];
                if let Some(ids) = self.exact.get(window) {
                    full.extend(ids.iter().map(String::as_str));
                    continue;
                }
                if len < 2 {
                    continue;
                }
                let joined = window.join(" ");
                let candidates: BTreeSet<usize> = window
                    .iter()
                    .filter_map(|w| self.by_word.get(w))
                    .flatten()
                    .copied()
                    .collect();
                for idx in candidates {
                    let surface = &self.surfaces[idx];
                    if surface.tokens.len() != len {
                        continue;
                    }
                    let score = strsim::normalized_levenshtein(&joined, &surface.joined);
                    if score >= self.threshold {
                        let best = scored.entry(surface.id.as_str()).or_insert(score);
                        *best = best.max(score);
                    }
                }
            }
        }

        let mut out: Vec<SkillMatch> = full
            .iter()
            .map(|id| SkillMatch {
                id: id.to_string(),
                kind: MatchKind::Exact,
                score: 1.0,
            })
            .collect();
        let mut scored: Vec<_> = scored
            .into_iter()
            .filter(|(id, _)| !full.contains(id))
            .collect();
        scored.sort_by(|a, b| a.0.cmp(&b.0));
        out.extend(scored.into_iter().map(|(id, score)| SkillMatch {
            id: id.to_string(),
            kind: MatchKind::Scored,
            score,
        }));
        out
    }
}
