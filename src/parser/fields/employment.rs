use std::sync::LazyLock;

use regex::Regex;

use crate::document::Document;

static EMPLOYMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(full.?time|part.?time|contract|temporary|internship|freelance|remote|hybrid|on.?site)\b")
        .unwrap()
});

/// Structured details first (criteria values, criteria labels, top-card
/// fragments), then the full description text.
pub fn extract(doc: &Document) -> Option<String> {
    let details = doc
        .criteria
        .iter()
        .map(|c| c.value.as_str())
        .chain(doc.criteria.iter().map(|c| c.label.as_str()))
        .chain(doc.flavor.iter().map(String::as_str));

    details
        .chain(std::iter::once(doc.text.as_str()))
        .find_map(|text| {
            let lower = text.to_lowercase();
            EMPLOYMENT_RE.captures(&lower).map(|c| normalize(&c[1]))
        })
}

/// "full time" / "full_time" / "full-time" all become "Full-Time".
fn normalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut word_start = true;
    for ch in raw.chars() {
        if ch.is_alphabetic() {
            if word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.push(ch);
            }
            word_start = false;
        } else {
            out.push('-');
            word_start = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Criterion;

    #[test]
    fn criteria_before_text() {
        let d = Document {
            criteria: vec![
                Criterion { label: "Seniority level".into(), value: "Entry level".into() },
                Criterion { label: "Employment type".into(), value: "Full-time".into() },
            ],
            text: "This is a contract role".into(),
            ..Default::default()
        };
        assert_eq!(extract(&d).as_deref(), Some("Full-Time"));
    }

    #[test]
    fn falls_back_to_text() {
        let d = Document {
            flavor: vec!["Cairo, Egypt".into(), "1 week ago".into()],
            text: "We offer a PART TIME position for students".into(),
            ..Default::default()
        };
        assert_eq!(extract(&d).as_deref(), Some("Part-Time"));
    }

    #[test]
    fn separators_normalized() {
        assert_eq!(normalize("on site"), "On-Site");
        assert_eq!(normalize("full_time"), "Full-Time");
        assert_eq!(normalize("onsite"), "Onsite");
        assert_eq!(normalize("internship"), "Internship");
    }

    #[test]
    fn none_when_absent() {
        let d = Document {
            text: "Join us to build great things".into(),
            ..Default::default()
        };
        assert_eq!(extract(&d), None);
    }
}
