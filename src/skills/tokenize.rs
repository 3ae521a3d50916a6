use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use super::{Dep, Pos, Sentence, SentenceTokenizer, Token};

static BOUNDARY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?;]+\s+|\s*[•·▪●◦]\s*|\s+[-*]\s+|\r?\n+").unwrap());
static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9][A-Za-z0-9+#.'\-]*[A-Za-z0-9+#]|[A-Za-z0-9]|[^\sA-Za-z0-9]").unwrap()
});

const PRONOUNS: &[&str] = &[
    "i", "you", "we", "he", "she", "it", "they", "me", "us", "them", "our", "your", "their",
    "my", "its",
];
const DETERMINERS: &[&str] = &[
    "a", "an", "the", "this", "that", "these", "those", "each", "every", "any", "all", "some",
];
const ADPOSITIONS: &[&str] = &[
    "in", "on", "at", "with", "for", "from", "to", "of", "by", "about", "across", "into", "over",
    "under", "within", "through", "as",
];
const CONJUNCTIONS: &[&str] = &["and", "or", "but", "nor", "&"];

/// Base forms of verbs that open duty and requirement sentences.
const VERBS: &[&str] = &[
    "develop", "build", "design", "manage", "lead", "create", "implement", "maintain",
    "support", "own", "drive", "partner", "deliver", "coordinate", "prepare", "review",
    "monitor", "conduct", "provide", "assist", "handle", "perform", "deploy", "improve",
    "optimize", "optimise", "define", "train", "communicate", "help", "join", "use", "apply",
    "analyze", "analyse", "collaborate", "write", "ensure", "identify", "establish", "execute",
    "oversee", "participate", "contribute", "mentor", "troubleshoot", "track", "automate",
    "integrate", "present", "negotiate", "sell", "serve", "answer", "resolve", "evaluate",
    "assess", "operate", "administer", "configure", "install", "migrate", "forecast", "audit",
    "organize", "organise", "recruit", "hire", "guide", "shape", "ship", "scale", "architect",
    "debug", "refactor", "translate", "produce", "promote", "generate", "gather", "collect",
    "validate", "verify", "run", "turn", "make", "take", "keep", "grow", "meet", "achieve",
    "attend", "become", "be", "have", "do",
];

/// Words ending in "-ing" that are nouns or prepositions, not gerunds.
const NOT_GERUNDS: &[&str] = &[
    "engineering", "marketing", "accounting", "banking", "pricing", "manufacturing",
    "consulting", "clothing", "housing", "learning", "nothing", "something", "anything",
    "everything", "morning", "evening", "during", "string", "thing", "ceiling", "wedding",
    "funding", "hosting", "offering", "meeting", "opening", "understanding", "onboarding",
];

static VERB_SET: LazyLock<HashSet<&'static str>> = LazyLock::new(|| VERBS.iter().copied().collect());

/// Punctuation and bullet sentence splitting with a lexicon and suffix based
/// verb tagger. The first verb of a sentence is its root; a verb right after a
/// conjunction or comma following the root is a conjunct.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleTokenizer;

impl SentenceTokenizer for RuleTokenizer {
    fn sentences(&self, text: &str) -> Vec<Sentence> {
        let mut out = Vec::new();
        let mut start = 0;
        for m in BOUNDARY_RE.find_iter(text) {
            push_sentence(&text[start..m.start()], &mut out);
            start = m.end();
        }
        push_sentence(&text[start..], &mut out);
        out
    }
}

fn push_sentence(raw: &str, out: &mut Vec<Sentence>) {
    let text = raw.trim().trim_end_matches(['.', '!', '?', ';']);
    if text.is_empty() {
        return;
    }
    let tokens = tag(TOKEN_RE.find_iter(text).map(|m| m.as_str()));
    if tokens.iter().all(|t| t.pos == Pos::Punct) {
        return;
    }
    out.push(Sentence {
        text: text.to_string(),
        tokens,
    });
}

fn tag<'a>(words: impl Iterator<Item = &'a str>) -> Vec<Token> {
    let mut tokens: Vec<Token> = Vec::new();
    let mut seen_root = false;

    for word in words {
        let lower = word.to_lowercase();
        let prev = tokens.last().map(|t| (t.pos, t.text.as_str()));
        let after_determiner = matches!(prev, Some((Pos::Determiner, _)));

        let gerund = !after_determiner && is_gerund(&lower);
        let pos = if gerund || (!after_determiner && is_verb(&lower)) {
            Pos::Verb
        } else {
            closed_class(&lower)
        };

        let dep = if pos != Pos::Verb {
            Dep::Other
        } else if !seen_root {
            seen_root = true;
            Dep::Root
        } else if matches!(prev, Some((Pos::Conjunction, _)) | Some((Pos::Punct, ","))) {
            Dep::Conj
        } else {
            Dep::Other
        };

        tokens.push(Token {
            text: word.to_string(),
            pos,
            dep,
            gerund,
        });
    }
    tokens
}

fn closed_class(lower: &str) -> Pos {
    if PRONOUNS.contains(&lower) {
        Pos::Pronoun
    } else if DETERMINERS.contains(&lower) {
        Pos::Determiner
    } else if ADPOSITIONS.contains(&lower) {
        Pos::Adposition
    } else if CONJUNCTIONS.contains(&lower) {
        Pos::Conjunction
    } else if lower.chars().all(|c| c.is_ascii_digit() || c == '+') {
        Pos::Number
    } else if !lower.chars().any(char::is_alphanumeric) {
        Pos::Punct
    } else {
        Pos::Noun
    }
}

fn is_gerund(lower: &str) -> bool {
    lower
        .strip_suffix("ing")
        .is_some_and(|stem| stem.len() >= 3 && stem.chars().all(char::is_alphabetic))
        && !NOT_GERUNDS.contains(&lower)
}

fn is_verb(lower: &str) -> bool {
    if VERB_SET.contains(lower) {
        return true;
    }
    ["es", "s", "ed", "d"]
        .iter()
        .filter_map(|suffix| lower.strip_suffix(suffix))
        .any(|stem| stem.len() >= 2 && VERB_SET.contains(stem))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentences(text: &str) -> Vec<Sentence> {
        RuleTokenizer.sentences(text)
    }

    #[test]
    fn splits_on_punctuation_and_bullets() {
        let s = sentences("We move freight. You will own reports! • Strong SQL • Python; Excel\n- Airflow");
        let texts: Vec<&str> = s.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["We move freight", "You will own reports", "Strong SQL", "Python", "Excel", "Airflow"]
        );
    }

    #[test]
    fn keeps_technical_tokens_whole() {
        let s = sentences("Proficient in C++, C# and Node.js.");
        let words: Vec<&str> = s[0].tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(words, vec!["Proficient", "in", "C++", ",", "C#", "and", "Node.js"]);
    }

    #[test]
    fn gerund_opening_is_tagged() {
        let s = sentences("Developing dashboards in Power BI");
        let first = &s[0].tokens[0];
        assert_eq!(first.pos, Pos::Verb);
        assert!(first.gerund);
        assert_eq!(first.dep, Dep::Root);
    }

    #[test]
    fn imperative_root_and_conjunct() {
        let s = sentences("Build, test and deploy services");
        let t = &s[0].tokens;
        assert_eq!((t[0].pos, t[0].dep), (Pos::Verb, Dep::Root));
        // "test" is not a lexicon verb
        assert_eq!(t[2].pos, Pos::Noun);
        assert_eq!((t[4].pos, t[4].dep), (Pos::Verb, Dep::Conj));

        let s = sentences("We develops and maintained pipelines");
        let t = &s[0].tokens;
        assert_eq!(t[1].dep, Dep::Root);
        assert_eq!(t[3].dep, Dep::Conj);
    }

    #[test]
    fn nouns_after_determiner_and_noun_ings() {
        let s = sentences("The building manages great engineering teams");
        let t = &s[0].tokens;
        assert_eq!(t[1].pos, Pos::Noun);
        assert!(!t[1].gerund);
        assert_eq!(t[2].pos, Pos::Verb);
        assert_eq!(t[4].pos, Pos::Noun);
    }

    #[test]
    fn empty_input() {
        assert!(sentences("").is_empty());
        assert!(sentences(" . • \n ").is_empty());
    }
}
