use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::document::Document;

static LOCATION_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(location|workplace|where)\b").unwrap());
static RECENCY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d+\s*(hour|day|week|month|year)s?\s*ago\b").unwrap());
static WORK_MODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(remote|hybrid|on-?site|work from home|wfh)\b").unwrap());
static ADMIN_AREA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(city|county|state|province|country|region|area|district)\b").unwrap()
});
static CITY_REGION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z\s]+,\s*[A-Za-z\s]{2,}").unwrap());
static COMPANY_INDICATORS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\b(inc|llc|ltd|corp|corporation|company|group|technologies|solutions|systems|services|consulting|holdings|enterprises|international|global|associates|partners)\b",
        r"\b(tech|software|digital|cyber|cloud|data|analytics|ai|ml|fintech|biotech|pharma|healthcare|medical|financial|insurance|banking|retail|logistics|manufacturing)\b",
        r"\b(startup|firm|agency|studio|lab|labs|research|development|innovation|ventures|capital)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});
static TITLE_CASE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][a-z]+ [A-Z][a-z]+( [A-Z][a-z]+)*$").unwrap());
static PHRASE_PATTERNS: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r"(?i)(?:based|located|office)\s+in\s+([A-Za-z\s,]+?)(?:\.|,|\n|$)").unwrap(),
        Regex::new(r"(?i)(?:work\s+from|position\s+in|role\s+in)\s+([A-Za-z\s,]+?)(?:\.|,|\n|$)").unwrap(),
    ]
});

/// Shape checks shared by every location rule.
pub struct LocationShape<'a> {
    pub company: Option<&'a str>,
    /// Lower-cased place names.
    pub known_places: &'a [String],
}

impl LocationShape<'_> {
    pub fn is_company_name(&self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        let lower = text.to_lowercase();
        if let Some(company) = self.company.map(str::trim).filter(|c| !c.is_empty()) {
            if lower.contains(&company.to_lowercase()) {
                return true;
            }
        }
        if COMPANY_INDICATORS.iter().any(|re| re.is_match(&lower)) {
            return true;
        }
        if is_upper(text) && text.chars().count() > 3 {
            return true;
        }
        TITLE_CASE_RE.is_match(text) && !WORK_MODE_RE.is_match(&lower)
    }

    pub fn is_valid_location(&self, text: &str) -> bool {
        if text.chars().count() < 2 {
            return false;
        }
        let lower = text.to_lowercase();
        WORK_MODE_RE.is_match(&lower)
            || ADMIN_AREA_RE.is_match(&lower)
            || self.known_places.iter().any(|p| contains_word(&lower, p))
            || CITY_REGION_RE.is_match(&lower)
    }
}

pub type LocationRule = fn(&Document, Option<&str>, &LocationShape) -> Option<String>;

/// Evaluated in order; the first rule yielding an accepted candidate wins.
pub static LOCATION_RULES: [(&str, LocationRule); 3] = [
    ("criteria", from_criteria),
    ("flavor", from_flavor),
    ("summary", from_phrases),
];

pub fn extract(doc: &Document, summary: Option<&str>, shape: &LocationShape) -> Option<String> {
    LOCATION_RULES.iter().find_map(|(name, rule)| {
        let found = rule(doc, summary, shape)?;
        debug!(rule = *name, location = %found, "location match");
        Some(found)
    })
}

fn from_criteria(doc: &Document, _summary: Option<&str>, shape: &LocationShape) -> Option<String> {
    doc.criteria
        .iter()
        .filter(|c| LOCATION_LABEL_RE.is_match(&c.label.to_lowercase()))
        .map(|c| c.value.trim())
        .find(|v| v.chars().count() > 2 && !shape.is_company_name(v))
        .map(str::to_string)
}

fn from_flavor(doc: &Document, _summary: Option<&str>, shape: &LocationShape) -> Option<String> {
    doc.location_hint
        .iter()
        .chain(doc.flavor.iter())
        .map(|f| f.trim())
        .find(|f| {
            f.chars().count() > 2
                && !shape.is_company_name(f)
                && !RECENCY_RE.is_match(&f.to_lowercase())
                && shape.is_valid_location(f)
        })
        .map(str::to_string)
}

fn from_phrases(_doc: &Document, summary: Option<&str>, shape: &LocationShape) -> Option<String> {
    let summary = summary?;
    PHRASE_PATTERNS.iter().find_map(|re| {
        let candidate = re.captures(summary)?.get(1)?.as_str().trim();
        let len = candidate.chars().count();
        (len > 2 && len < 50 && !shape.is_company_name(candidate) && shape.is_valid_location(candidate))
            .then(|| candidate.to_string())
    })
}

/// `str::is_uppercase` semantics over the whole string: at least one cased
/// char and no lower-case ones.
fn is_upper(text: &str) -> bool {
    text.chars().any(char::is_uppercase) && !text.chars().any(char::is_lowercase)
}

fn contains_word(haystack: &str, word: &str) -> bool {
    if word.is_empty() {
        return false;
    }
    haystack.match_indices(word).any(|(i, _)| {
        let before = haystack[..i].chars().next_back();
        let after = haystack[i + word.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}
