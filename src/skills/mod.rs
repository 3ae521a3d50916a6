//! Skill annotation: gate sentences on relevance, match them against the
//! taxonomy, drop noisy names, aggregate by skill type.

pub mod matcher;
pub mod similarity;
pub mod tokenize;

use std::collections::BTreeSet;

use tracing::debug;

use crate::reference::{ReferenceData, SkillType};
pub use matcher::TaxonomyMatcher;
pub use similarity::{LexicalSimilarity, WordVectors};
pub use tokenize::RuleTokenizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pos {
    Verb,
    Noun,
    Pronoun,
    Determiner,
    Adposition,
    Conjunction,
    Number,
    Punct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dep {
    Root,
    Conj,
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub text: String,
    pub pos: Pos,
    pub dep: Dep,
    /// Present-participle verb form ("Developing", "Managing").
    pub gerund: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sentence {
    pub text: String,
    pub tokens: Vec<Token>,
}

pub trait SentenceTokenizer: Send + Sync {
    fn sentences(&self, text: &str) -> Vec<Sentence>;
}

/// Similarity in [0, 1] between a token and a term. `None` when the token has
/// no representation, in which case it never passes the relevance gate.
pub trait SemanticSimilarity: Send + Sync {
    fn similarity(&self, token: &str, term: &str) -> Option<f32>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    Scored,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkillMatch {
    pub id: String,
    pub kind: MatchKind,
    pub score: f64,
}

pub trait SkillMatcher: Send + Sync {
    fn annotate(&self, sentence: &str) -> Vec<SkillMatch>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkillSets {
    pub hard: Vec<String>,
    pub soft: Vec<String>,
}

impl SkillSets {
    pub fn hard_joined(&self) -> String {
        self.hard.join(", ")
    }

    pub fn soft_joined(&self) -> String {
        self.soft.join(", ")
    }
}

pub struct SkillAnnotator {
    tokenizer: Box<dyn SentenceTokenizer>,
    similarity: Box<dyn SemanticSimilarity>,
    matcher: Box<dyn SkillMatcher>,
}

impl SkillAnnotator {
    pub fn new(
        tokenizer: Box<dyn SentenceTokenizer>,
        similarity: Box<dyn SemanticSimilarity>,
        matcher: Box<dyn SkillMatcher>,
    ) -> Self {
        SkillAnnotator {
            tokenizer,
            similarity,
            matcher,
        }
    }

    /// Annotate `text`; `context` is the whole document, used to disambiguate
    /// single-letter language names.
    pub fn annotate(&self, text: &str, context: &str, reference: &ReferenceData) -> SkillSets {
        let context = context.to_lowercase();
        let mut ids = BTreeSet::new();

        for sentence in self.tokenizer.sentences(text) {
            if !(self.has_trigger(&sentence, reference) || is_task_sentence(&sentence)) {
                continue;
            }
            for m in self.matcher.annotate(&sentence.text) {
                let Some(entry) = reference.taxonomy.get(&m.id) else {
                    continue;
                };
                if should_remove(&entry.name, &context, reference) {
                    debug!(skill = %entry.name, "dropped by denylist");
                    continue;
                }
                ids.insert(m.id);
            }
        }

        let mut sets = SkillSets::default();
        for entry in ids.iter().filter_map(|id| reference.taxonomy.get(id)) {
            match entry.kind {
                SkillType::Hard => sets.hard.push(entry.name.clone()),
                SkillType::Soft => sets.soft.push(entry.name.clone()),
                SkillType::Other => {}
            }
        }
        sets
    }

    fn has_trigger(&self, sentence: &Sentence, reference: &ReferenceData) -> bool {
        sentence.tokens.iter().any(|token| {
            reference.triggers.iter().any(|term| {
                self.similarity
                    .similarity(&token.text, term)
                    .is_some_and(|s| s >= reference.similarity_threshold)
            })
        })
    }
}

/// Task/duty phrasing: one of the first two tokens is a root or conjunct verb,
/// or a gerund.
pub fn is_task_sentence(sentence: &Sentence) -> bool {
    sentence.tokens.iter().take(2).any(|t| {
        t.pos == Pos::Verb && (matches!(t.dep, Dep::Root | Dep::Conj) || t.gerund)
    })
}

/// `context` must already be lower-cased. The length and language rules look
/// at the surface form, so "R (Programming Language)" is judged as "r".
pub fn should_remove(name: &str, context: &str, reference: &ReferenceData) -> bool {
    let s = name.trim().to_lowercase();
    let surface = matcher::surface_form(&s);
    if reference.denylist.contains(&s) || reference.denylist.contains(&surface) {
        return true;
    }
    match surface.as_str() {
        "r" => !(context.contains("r programming") || context.contains("rstudio")),
        "c" => !(context.contains("c programming")
            || context.contains("embedded c")
            || context.contains("c++")),
        _ => surface.chars().count() <= 2,
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::{SkillEntry, Taxonomy};
    use crate::settings::Settings;

    fn reference() -> ReferenceData {
        let taxonomy: Taxonomy = [
            ("KS1", "Python", SkillType::Hard),
            ("KS2", "Teamwork", SkillType::Soft),
            ("KS3", "Inquiry", SkillType::Hard),
            ("KS4", "R", SkillType::Hard),
            ("KS5", "SQL", SkillType::Hard),
            ("KS6", "C", SkillType::Hard),
            ("KS7", "AWS Certified Developer", SkillType::Other),
            ("KS8", "Communication", SkillType::Soft),
        ]
        .into_iter()
        .map(|(id, name, kind)| SkillEntry {
            id: id.into(),
            name: name.into(),
            kind,
        })
        .collect();
        ReferenceData::new(taxonomy, vec!["Data Analyst".into()], &Settings::default())
    }

    /// One sentence per line; tokens are whitespace words stripped of
    /// punctuation, and a first word ending in "ing" is a gerund verb.
    struct LineTokenizer;

    impl SentenceTokenizer for LineTokenizer {
        fn sentences(&self, text: &str) -> Vec<Sentence> {
            text.lines()
                .filter(|l| !l.trim().is_empty())
                .map(|l| Sentence {
                    text: l.to_string(),
                    tokens: l
                        .split_whitespace()
                        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
                        .enumerate()
                        .map(|(i, w)| {
                            let gerund = i == 0 && w.ends_with("ing");
                            Token {
                                text: w.to_string(),
                                pos: if gerund { Pos::Verb } else { Pos::Noun },
                                dep: Dep::Other,
                                gerund,
                            }
                        })
                        .collect(),
                })
                .collect()
        }
    }

    /// Exact-word similarity: 1.0 when equal ignoring case, otherwise 0.
    struct ExactSimilarity;

    impl SemanticSimilarity for ExactSimilarity {
        fn similarity(&self, token: &str, term: &str) -> Option<f32> {
            Some(if token.eq_ignore_ascii_case(term) { 1.0 } else { 0.0 })
        }
    }

    /// Returns every taxonomy id whose name appears as a word in the sentence,
    /// both as an exact and a scored match.
    struct WordMatcher(Vec<(String, String)>);

    impl SkillMatcher for WordMatcher {
        fn annotate(&self, sentence: &str) -> Vec<SkillMatch> {
            let words: Vec<String> = sentence
                .split(|c: char| !c.is_alphanumeric())
                .map(str::to_lowercase)
                .collect();
            self.0
                .iter()
                .filter(|(_, name)| words.contains(name))
                .flat_map(|(id, _)| {
                    [
                        SkillMatch { id: id.clone(), kind: MatchKind::Exact, score: 1.0 },
                        SkillMatch { id: id.clone(), kind: MatchKind::Scored, score: 0.9 },
                    ]
                })
                .collect()
        }
    }

    fn annotator(reference: &ReferenceData) -> SkillAnnotator {
        let names = reference
            .taxonomy
            .iter()
            .map(|e| (e.id.clone(), e.name.to_lowercase()))
            .collect();
        SkillAnnotator::new(
            Box::new(LineTokenizer),
            Box::new(ExactSimilarity),
            Box::new(WordMatcher(names)),
        )
    }

    #[test]
    fn only_relevant_sentences_are_matched() {
        let r = reference();
        let text = "Our office has Python stickers everywhere\nExperience with SQL is required\nBuilding reports needs teamwork";
        let sets = annotator(&r).annotate(text, text, &r);
        assert_eq!(sets.hard, vec!["SQL"]);
        assert_eq!(sets.soft, vec!["Teamwork"]);
    }

    #[test]
    fn inquiry_never_survives() {
        let r = reference();
        let text = "Skills: inquiry, Python\nExperience handling every customer inquiry";
        let sets = annotator(&r).annotate(text, text, &r);
        assert_eq!(sets.hard, vec!["Python"]);
    }

    #[test]
    fn single_letter_languages_need_context() {
        let r = reference();
        let a = annotator(&r);
        let text = "Skills: R and C and SQL";
        assert_eq!(a.annotate(text, text, &r).hard, vec!["SQL"]);

        let context = "We use RStudio daily.\nSkills: R and C and SQL";
        assert_eq!(a.annotate(text, context, &r).hard, vec!["R", "SQL"]);

        let context = "Firmware in embedded C and R programming";
        assert_eq!(a.annotate(text, context, &r).hard, vec!["R", "SQL", "C"]);
    }

    #[test]
    fn duplicates_merged_and_other_types_ignored() {
        let r = reference();
        let text = "Skills: python python communication\nRequired: Python and certified communication";
        let sets = annotator(&r).annotate(text, text, &r);
        assert_eq!(sets.hard_joined(), "Python");
        assert_eq!(sets.soft_joined(), "Communication");

        // Annotating the same sentences twice changes nothing.
        let twice = format!("{text}\n{text}");
        assert_eq!(annotator(&r).annotate(&twice, &twice, &r), sets);
    }

    #[test]
    fn denylist_rules() {
        let r = reference();
        assert!(should_remove("Inquiry", "", &r));
        assert!(should_remove("  Workflows ", "", &r));
        assert!(should_remove("Go", "", &r));
        assert!(should_remove("R", "statistics in r", &r));
        assert!(!should_remove("R", "r programming", &r));
        assert!(!should_remove("C", "modern c++ codebase", &r));
        assert!(!should_remove("SQL", "", &r));
        assert!(should_remove("R (Programming Language)", "statistics in r", &r));
        assert!(!should_remove("R (Programming Language)", "we use rstudio", &r));
        assert!(should_remove("C (Programming Language)", "", &r));
        assert!(should_remove("Go (Language)", "", &r));
        assert!(!should_remove("Python (Programming Language)", "", &r));
    }

    #[test]
    fn bundled_taxonomy_letters_need_context() {
        let taxonomy = Taxonomy::load(std::path::Path::new("data/skills.json")).unwrap();
        let r = ReferenceData::new(taxonomy, vec!["Data Analyst".into()], &Settings::default());
        let a = SkillAnnotator::new(
            Box::new(RuleTokenizer),
            Box::new(LexicalSimilarity),
            Box::new(TaxonomyMatcher::new(&r.taxonomy, 0.85)),
        );
        let text = "Required skills: R and C for statistics.";

        assert_eq!(a.annotate(text, text, &r).hard, vec!["Statistics"]);

        let context = "We use RStudio and ship embedded C firmware. Required skills: R and C for statistics.";
        assert_eq!(
            a.annotate(text, context, &r).hard,
            vec!["R (Programming Language)", "C (Programming Language)", "Statistics"]
        );
    }

    #[test]
    fn task_sentence_heuristic() {
        let verb = |dep, gerund| Token { text: "x".into(), pos: Pos::Verb, dep, gerund };
        let noun = Token { text: "y".into(), pos: Pos::Noun, dep: Dep::Other, gerund: false };
        let s = |tokens| Sentence { text: String::new(), tokens };
        assert!(is_task_sentence(&s(vec![verb(Dep::Root, false), noun.clone()])));
        assert!(is_task_sentence(&s(vec![noun.clone(), verb(Dep::Conj, false)])));
        assert!(is_task_sentence(&s(vec![verb(Dep::Other, true)])));
        assert!(!is_task_sentence(&s(vec![noun.clone(), noun.clone(), verb(Dep::Root, false)])));
        assert!(!is_task_sentence(&s(vec![verb(Dep::Other, false)])));
    }
}
