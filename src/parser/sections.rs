use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::blocks::{self, Block};

const HEADING_TRIM: &[char] = &[' ', ':', '\t', '\n', '-', '–', '—'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionLabel {
    Summary,
    Company,
    Required,
    Preferred,
    Unclassified,
}

/// An ordered group of heading patterns. Patterns are tried in declared order
/// and the first one that matches the start of a block defines the heading.
pub struct HeadingRule {
    pub name: &'static str,
    patterns: Vec<Regex>,
}

impl HeadingRule {
    fn new(name: &'static str, patterns: &[&str]) -> Self {
        HeadingRule {
            name,
            patterns: patterns
                .iter()
                .map(|p| Regex::new(&format!("(?i){p}")).unwrap())
                .collect(),
        }
    }

    /// Byte offset where the heading ends, if the block opens with one.
    pub fn match_end(&self, text: &str) -> Option<usize> {
        self.patterns.iter().find_map(|re| re.find(text).map(|m| m.end()))
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.match_end(text).is_some()
    }
}

pub static MAJOR: LazyLock<HeadingRule> = LazyLock::new(|| {
    HeadingRule::new(
        "major",
        &[
            r"^(Job\s+)?(Responsibilities|Qualifications|Requirements|Duties|Skills|Experience|What you.{1,20}do|Key Responsibilities|Primary Duties|Job Requirements|Role Responsibilities)",
            r"^(Essential|Minimum|Required|Basic|Must Have)\s+(Skills|Qualifications|Requirements|Experience)",
            r"^(Preferred|Desired|Nice to Have|Additional|Bonus)\s+(Skills|Qualifications|Requirements|Experience)",
            r"^(About|Company|Organization)\s+(the\s+)?(Role|Position|Job|Company|Organization|Team|Us)",
            r"^(Job\s+)?(Description|Summary|Overview)",
            r"^(Technical|Core|Main)\s+(Skills|Requirements|Responsibilities)",
        ],
    )
});

pub static COMPANY: LazyLock<HeadingRule> = LazyLock::new(|| {
    HeadingRule::new(
        "company",
        &[
            r"^(Company|About|Organization|Who are we|About us|Our company|The company|About the company)\b",
            r"^(Company\s+)?(Overview|Description|Profile|Background|Information)",
            r"^(Who\s+)?(we are|We Are)",
            r"^(Our\s+)?(Mission|Vision|Values|Culture|Story|Background)",
        ],
    )
});

pub static REQUIRED: LazyLock<HeadingRule> = LazyLock::new(|| {
    HeadingRule::new(
        "required",
        &[
            r"^(Required|Essential|Minimum|Must Have|Basic|Mandatory)\s*(Qualifications|Skills|Requirements|Experience)",
            r"^(You\s+)?(must|should|need to)\s+have",
            r"^(Minimum|Required)\s*(Requirements|Qualifications)",
            r"^\s*Requirements\s*:?\s*$",
            r"^\s*Qualifications\s*:?\s*$",
        ],
    )
});

pub static PREFERRED: LazyLock<HeadingRule> = LazyLock::new(|| {
    HeadingRule::new(
        "preferred",
        &[
            r"^(Preferred|Desired|Nice to Have|Bonus|Additional|Plus|Would be great)\s*(Qualifications|Skills|Requirements|Experience)",
            r"^(It would be|Would be)\s+(nice|great|a plus)",
            r"^(Bonus|Plus)\s+(points|if you)",
            r"^(Preferred|Desired)\s*(Requirements|Qualifications)",
        ],
    )
});

fn is_any_heading(text: &str) -> bool {
    [&*MAJOR, &*COMPANY, &*REQUIRED, &*PREFERRED]
        .iter()
        .any(|rule| rule.is_match(text))
}

/// Fallback when no heading yields content: first block (within `scan_limit`)
/// with at least `min_hits` distinct keywords and more than `min_len` chars.
pub struct KeywordRule {
    pub keywords: &'static [&'static str],
    pub min_hits: usize,
    pub min_len: usize,
    pub scan_limit: Option<usize>,
}

impl KeywordRule {
    fn hits(&self, text: &str) -> usize {
        let lower = text.to_lowercase();
        self.keywords.iter().filter(|k| lower.contains(*k)).count()
    }

    fn find<'a>(&self, blocks: &'a [Block]) -> Option<&'a Block> {
        let limit = self.scan_limit.unwrap_or(blocks.len());
        blocks.iter().take(limit).find(|b| {
            b.text.chars().count() > self.min_len && self.hits(&b.text) >= self.min_hits
        })
    }
}

pub struct SectionRule {
    pub label: SectionLabel,
    pub heading: &'static LazyLock<HeadingRule>,
    /// Text after the heading inside the same block counts as content above this length.
    pub inline_min: usize,
    pub max_blocks: usize,
    pub fallback: KeywordRule,
}

pub static SECTION_RULES: [SectionRule; 3] = [
    SectionRule {
        label: SectionLabel::Company,
        heading: &COMPANY,
        inline_min: 20,
        max_blocks: 4,
        fallback: KeywordRule {
            keywords: &[
                "founded", "established", "leading", "industry", "mission", "vision", "values",
                "culture", "team", "employees", "global", "international", "headquarters",
                "based in", "specialize", "focus on", "dedicated to",
            ],
            min_hits: 2,
            min_len: 50,
            scan_limit: Some(10),
        },
    },
    SectionRule {
        label: SectionLabel::Required,
        heading: &REQUIRED,
        inline_min: 15,
        max_blocks: 5,
        fallback: KeywordRule {
            keywords: &[
                "bachelor", "master", "degree", "years of experience", "experience in",
                "proficient", "knowledge of", "familiar with", "understanding of", "ability to",
                "must have", "required", "necessary",
            ],
            min_hits: 2,
            min_len: 30,
            scan_limit: None,
        },
    },
    SectionRule {
        label: SectionLabel::Preferred,
        heading: &PREFERRED,
        inline_min: 15,
        max_blocks: 5,
        fallback: KeywordRule {
            keywords: &[
                "preferred", "desired", "nice to have", "bonus", "plus", "would be great",
                "additional experience", "advantageous",
            ],
            min_hits: 1,
            min_len: 30,
            scan_limit: None,
        },
    },
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sections {
    pub summary: Option<String>,
    pub company: Option<String>,
    pub required: Option<String>,
    pub preferred: Option<String>,
    /// Role of each input block, by block index.
    pub labels: Vec<SectionLabel>,
}

impl Sections {
    fn set(&mut self, label: SectionLabel, text: String) {
        match label {
            SectionLabel::Summary => self.summary = Some(text),
            SectionLabel::Company => self.company = Some(text),
            SectionLabel::Required => self.required = Some(text),
            SectionLabel::Preferred => self.preferred = Some(text),
            SectionLabel::Unclassified => {}
        }
    }

    fn claim(&mut self, range: std::ops::Range<usize>, label: SectionLabel) {
        for slot in &mut self.labels[range] {
            if *slot == SectionLabel::Unclassified {
                *slot = label;
            }
        }
    }
}

pub fn classify(blocks: &[Block]) -> Sections {
    let mut sections = Sections {
        labels: vec![SectionLabel::Unclassified; blocks.len()],
        ..Default::default()
    };

    let intro_end = blocks
        .iter()
        .position(|b| MAJOR.is_match(&b.text))
        .unwrap_or(blocks.len());
    if let Some(summary) = blocks::join(&blocks[..intro_end]) {
        sections.summary = Some(summary);
        sections.claim(0..intro_end, SectionLabel::Summary);
    }

    for rule in &SECTION_RULES {
        if let Some((text, range)) = by_heading(rule, blocks) {
            debug!(section = rule.heading.name, "heading match");
            sections.set(rule.label, text);
            sections.claim(range, rule.label);
        } else if let Some(block) = rule.fallback.find(blocks) {
            debug!(section = rule.heading.name, block = block.index, "keyword fallback");
            sections.set(rule.label, block.text.clone());
            sections.claim(block.index..block.index + 1, rule.label);
        }
    }

    sections
}

/// Content for the first heading of `rule` that yields any: the inline remainder
/// when substantial, else the following blocks up to the next heading or the cap.
fn by_heading(rule: &SectionRule, blocks: &[Block]) -> Option<(String, std::ops::Range<usize>)> {
    for (i, block) in blocks.iter().enumerate() {
        let Some(end) = rule.heading.match_end(&block.text) else {
            continue;
        };
        let rest = block.text[end..].trim_matches(HEADING_TRIM);
        if rest.chars().count() > rule.inline_min {
            return Some((rest.to_string(), i..i + 1));
        }

        let content_end = blocks[i + 1..]
            .iter()
            .take(rule.max_blocks)
            .position(|b| is_any_heading(&b.text))
            .map(|p| i + 1 + p)
            .unwrap_or_else(|| (i + 1 + rule.max_blocks).min(blocks.len()));
        if let Some(text) = blocks::join(&blocks[i + 1..content_end]) {
            return Some((text, i..content_end));
        }
    }
    None
}

static ROLE_HEADING: LazyLock<HeadingRule> = LazyLock::new(|| {
    HeadingRule::new(
        "role",
        &[
            r"^(about the role|job summary|position overview|role overview|what you.{1,30}do|your role|responsibilities include)",
            r"^(key responsibilit|primary responsibilit|main responsibilit|core responsibilit)",
            r"^(in this position|in this role|as our|as a|the successful candidate will)",
            r"^(day.{1,10}to.{1,10}day|daily tasks|primary duties|main duties)",
        ],
    )
});
static REQUIREMENT_LIKE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(required|minimum|must have|bachelor|degree|years? of experience|qualifications|requirements)\b").unwrap()
});
static DUTY_LIKE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(responsible for|will be|you will|your role|position involves|we are looking|join our|opportunity to|work with|collaborate|develop|manage|lead|create|design|implement|team|project|department|company|organization)\b").unwrap()
});

/// Best-effort role description for documents whose intro is empty.
pub fn describe_role(blocks: &[Block]) -> Option<String> {
    for (i, block) in blocks.iter().enumerate() {
        let Some(end) = ROLE_HEADING.match_end(&block.text) else {
            continue;
        };
        let rest = block.text[end..].trim_matches(HEADING_TRIM);
        if rest.chars().count() > 30 {
            return Some(rest.to_string());
        }
        if let Some(next) = blocks.get(i + 1) {
            return Some(next.text.clone());
        }
    }

    for block in blocks {
        let lower = block.text.to_lowercase();
        if REQUIREMENT_LIKE_RE.is_match(&lower) {
            continue;
        }
        if DUTY_LIKE_RE.is_match(&lower) || block.text.chars().count() > 100 {
            return Some(block.text.clone());
        }
    }

    blocks::join(&blocks[..blocks.len().min(2)])
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::blocks::segment;

    fn blocks_of(parts: &[&str]) -> Vec<Block> {
        segment(&parts.join("\n\n"))
    }

    #[test]
    fn summary_stops_at_first_major_heading() {
        let blocks = blocks_of(&[
            "We are hiring a product lead for the payments org",
            "Responsibilities: own the roadmap and ship quarterly",
            "Partner with design on discovery work",
            "Keep stakeholders aligned across regions",
            "Report progress to leadership every month",
        ]);
        let s = classify(&blocks);
        assert_eq!(s.summary.as_deref(), Some("We are hiring a product lead for the payments org"));
        assert_eq!(s.required, None);
        assert_eq!(s.preferred, None);
        assert_eq!(s.labels[0], SectionLabel::Summary);
        assert_eq!(s.labels[1], SectionLabel::Unclassified);
    }

    #[test]
    fn no_heading_means_whole_document_is_summary() {
        let blocks = blocks_of(&[
            "Join a small crew shipping logistics software",
            "You will talk to customers every single week",
            "The stack is boring on purpose and it works",
            "We care about calm, sustainable pace above all",
            "Compensation is competitive and transparent",
        ]);
        let s = classify(&blocks);
        let all = blocks.iter().map(|b| b.text.as_str()).collect::<Vec<_>>().join(" ");
        assert_eq!(s.summary.as_deref(), Some(all.as_str()));
        assert!(s.labels.iter().all(|l| *l == SectionLabel::Summary));
    }

    #[test]
    fn leading_heading_leaves_summary_empty() {
        let blocks = blocks_of(&[
            "Job Description",
            "Build dashboards for the finance team every week",
            "Work with stakeholders to refine metrics daily",
            "Automate the monthly close reports end to end",
            "Present findings to the leadership group monthly",
        ]);
        assert_eq!(classify(&blocks).summary, None);
    }

    #[test]
    fn inline_heading_content() {
        let blocks = blocks_of(&[
            "Great opportunity for an engineer in our Cairo office",
            "Requirements",
            "Nothing here matters for this particular test case",
            "Who we are: a logistics startup founded in 2019 serving 40 cities",
            "Closing remarks that are long enough to keep around",
        ]);
        let s = classify(&blocks);
        assert_eq!(
            s.company.as_deref(),
            Some("a logistics startup founded in 2019 serving 40 cities")
        );
        assert_eq!(s.labels[3], SectionLabel::Company);
    }

    #[test]
    fn heading_collects_following_blocks_until_next_heading() {
        let blocks = blocks_of(&[
            "We are looking for a backend engineer to join us",
            "Requirements:",
            "Three years building production web services",
            "Solid SQL and data modelling fundamentals",
            "Nice to have skills",
            "Hands-on time running Kubernetes in production",
            "Prior exposure to event sourcing patterns",
        ]);
        let s = classify(&blocks);
        assert_eq!(
            s.required.as_deref(),
            Some("Three years building production web services Solid SQL and data modelling fundamentals")
        );
        assert_eq!(
            s.preferred.as_deref(),
            Some("Hands-on time running Kubernetes in production Prior exposure to event sourcing patterns")
        );
        assert_eq!(s.labels[2], SectionLabel::Required);
        assert_eq!(s.labels[5], SectionLabel::Preferred);
    }

    #[test]
    fn collection_is_capped() {
        let mut parts = vec!["An intro paragraph about the role", "Who we are today"];
        let filler = [
            "filler block number one here",
            "filler block number two here",
            "filler block number three here",
            "filler block number four here",
            "filler block number five here",
            "filler block number six here",
        ];
        parts.extend(filler);
        let s = classify(&blocks_of(&parts));
        let company = s.company.unwrap();
        assert!(company.contains("four"));
        assert!(!company.contains("five"));
    }

    #[test]
    fn keyword_fallback_when_no_heading() {
        let blocks = blocks_of(&[
            "Our client is expanding its analytics function this year",
            "Candidates need a bachelor degree and knowledge of SQL and Python",
            "Experience with dbt is a plus for this particular opening",
            "Founded in 2004, the firm is a leading global industry player",
            "Apply through the careers portal before the deadline",
        ]);
        let s = classify(&blocks);
        assert_eq!(
            s.required.as_deref(),
            Some("Candidates need a bachelor degree and knowledge of SQL and Python")
        );
        assert_eq!(
            s.preferred.as_deref(),
            Some("Experience with dbt is a plus for this particular opening")
        );
        assert!(s.company.unwrap().starts_with("Founded in 2004"));
    }

    #[test]
    fn heading_beats_keyword_fallback() {
        let blocks = blocks_of(&[
            "A bachelor degree and years of experience in sales required",
            "Summary of the opening for this year in the region",
            "Qualifications",
            "Fluent English and a valid driving licence",
            "Closing block to pad the document out a bit",
        ]);
        let s = classify(&blocks);
        assert_eq!(
            s.required.as_deref(),
            Some("Fluent English and a valid driving licence Closing block to pad the document out a bit")
        );
    }

    #[test]
    fn heading_groups_tried_in_declared_order() {
        // First declared pattern that matches decides where the heading ends.
        let end = REQUIRED.match_end("Required Skills: Rust and Go").unwrap();
        assert_eq!(&"Required Skills: Rust and Go"[..end], "Required Skills");
        assert!(REQUIRED.is_match("requirements:"));
        assert!(!REQUIRED.is_match("Requirements include five years"));
    }

    #[test]
    fn role_description_fallback() {
        let blocks = blocks_of(&[
            "Job Summary",
            "Own the monthly reporting cycle for the finance team",
            "Bachelor degree required with three years of experience",
            "Benefits include medical cover and a yearly bonus",
            "Apply today through our website or referral",
        ]);
        assert_eq!(
            describe_role(&blocks).as_deref(),
            Some("Own the monthly reporting cycle for the finance team")
        );

        let blocks = blocks_of(&[
            "Bachelor degree required with three years of experience",
            "You will develop internal tools for the warehouse floor",
        ]);
        assert_eq!(
            describe_role(&blocks).as_deref(),
            Some("You will develop internal tools for the warehouse floor")
        );
    }

    #[test]
    fn full_fixture() {
        let text = std::fs::read_to_string("tests/fixtures/posting_full.txt").unwrap();
        let s = classify(&segment(&text));
        assert!(s.summary.unwrap().starts_with("Nile Freight is hiring"));
        assert!(s.company.unwrap().contains("founded in 2012"));
        assert!(s.required.unwrap().contains("3+ years"));
        assert!(s.preferred.unwrap().contains("Airflow"));
    }
}
