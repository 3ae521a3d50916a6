use std::io::BufRead;

use serde::Deserialize;

use crate::error::DocumentError;

/// A structured label/value pair from the posting's detail panel.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Criterion {
    pub label: String,
    pub value: String,
}

/// One fetched posting: description text plus the field-candidate text the
/// page already yields.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Document {
    pub link: String,
    pub title: Option<String>,
    pub company: Option<String>,
    pub company_url: Option<String>,
    pub location_hint: Option<String>,
    pub text: String,
    pub criteria: Vec<Criterion>,
    /// Short top-card fragments (company, place, posted-ago, applicants...).
    pub flavor: Vec<String>,
}

/// Parse JSON Lines. Bad lines are returned as errors in place so the caller
/// can log and skip them without losing the rest of the batch.
pub fn read_jsonl<R: BufRead>(reader: R, limit: Option<usize>) -> std::io::Result<Vec<Result<Document, DocumentError>>> {
    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        if limit.is_some_and(|n| out.len() >= n) {
            break;
        }
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        out.push(decode_line(idx + 1, &line));
    }
    Ok(out)
}

fn decode_line(line_no: usize, line: &str) -> Result<Document, DocumentError> {
    let doc: Document = serde_json::from_str(line).map_err(|source| DocumentError::Decode {
        line: line_no,
        source,
    })?;
    if doc.link.trim().is_empty() {
        return Err(DocumentError::MissingLink { line: line_no });
    }
    Ok(doc)
}
