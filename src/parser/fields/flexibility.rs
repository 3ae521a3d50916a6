use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flexibility {
    Remote,
    Hybrid,
    OnSite,
    Undefined,
}

impl Flexibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Flexibility::Remote => "Remote",
            Flexibility::Hybrid => "Hybrid",
            Flexibility::OnSite => "On-site",
            Flexibility::Undefined => "Undefined",
        }
    }
}

impl fmt::Display for Flexibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().map(|p| Regex::new(p).unwrap()).collect()
}

static REMOTE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"\bremote\b",
        r"\bwork from home\b",
        r"\bwfh\b",
        r"\bhome office\b",
        r"\bdistributed team\b",
        r"\bfully remote\b",
        r"\b100% remote\b",
        r"\banywhere\b.*\bworld\b",
        r"\blocation independent\b",
        r"\bremote work\b",
        r"\bremote position\b",
        r"\bremote role\b",
        r"\bremote opportunity\b",
        r"\bremotely\b",
        r"\bfrom home\b",
    ])
});

static HYBRID: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"\bhybrid\b",
        r"\bflexible work\b",
        r"\bflex\b.*\bschedule\b",
        r"\bwork from home.*days\b",
        r"\bremote.*days\b",
        r"\boffice.*days\b",
        r"\bmixed\b.*\bremote\b",
        r"\bpart.*remote\b",
        r"\bpartly remote\b",
        r"\bflexible location\b",
        r"\bhybrid model\b",
        r"\bhybrid work\b",
        r"\bremote.*office\b",
        r"\boffice.*remote\b",
        r"\bblended work\b",
    ])
});

static ON_SITE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"\bon-site\b",
        r"\bonsite\b",
        r"\bin-office\b",
        r"\boffice based\b",
        r"\boffice location\b",
        r"\bmust be located\b",
        r"\blocal candidate\b",
        r"\bin person\b",
        r"\bphysical presence\b",
        r"\bcommute\b",
        r"\brelocate\b",
        r"\boffice environment\b",
        r"\bfull.*office\b",
        r"\b100% office\b",
        r"\bfully onsite\b",
    ])
});

/// Number of distinct patterns in the family found anywhere in `text`.
fn score(family: &[Regex], text: &str) -> usize {
    family.iter().filter(|re| re.is_match(text)).count()
}

pub fn detect<'a, I>(parts: I) -> Flexibility
where
    I: IntoIterator<Item = &'a str>,
{
    let text = parts
        .into_iter()
        .filter(|p| !p.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    if text.is_empty() {
        return Flexibility::Undefined;
    }
    decide(score(&REMOTE, &text), score(&HYBRID, &text), score(&ON_SITE, &text))
}

fn decide(remote: usize, hybrid: usize, on_site: usize) -> Flexibility {
    if remote > hybrid && remote > on_site {
        Flexibility::Remote
    } else if hybrid > remote && hybrid > on_site {
        Flexibility::Hybrid
    } else if on_site > remote && on_site > hybrid {
        Flexibility::OnSite
    } else if remote > 0 && hybrid > 0 {
        Flexibility::Hybrid
    } else if remote > 0 {
        Flexibility::Remote
    } else if hybrid > 0 {
        Flexibility::Hybrid
    } else if on_site > 0 {
        Flexibility::OnSite
    } else {
        Flexibility::Undefined
    }
}
