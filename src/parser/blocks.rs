use std::sync::LazyLock;

use regex::Regex;

static BLANK_LINES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\r?\n(?:[ \t]*\r?\n)+").unwrap());
static LINE_BREAK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\r?\n").unwrap());
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Blank-line splitting coarser than this means the markup lost its paragraph
/// breaks; fall back to single line breaks.
pub const MIN_PRIMARY_BLOCKS: usize = 5;
/// Blocks at or below this many characters are stray labels and bullets.
pub const MIN_BLOCK_CHARS: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub index: usize,
    /// Byte offset of the trimmed span in the source text.
    pub offset: usize,
    /// Byte length of the trimmed span in the source text.
    pub len: usize,
    /// Span text with whitespace runs collapsed to single spaces.
    pub text: String,
}

pub fn segment(text: &str) -> Vec<Block> {
    let mut spans = split_spans(text, &BLANK_LINES_RE);
    if spans.len() < MIN_PRIMARY_BLOCKS {
        spans = split_spans(text, &LINE_BREAK_RE);
    }

    spans
        .into_iter()
        .filter(|(_, raw)| raw.chars().count() > MIN_BLOCK_CHARS)
        .map(|(offset, raw)| (offset, raw.len(), WHITESPACE_RE.replace_all(raw, " ").into_owned()))
        .enumerate()
        .map(|(index, (offset, len, text))| Block {
            index,
            offset,
            len,
            text,
        })
        .collect()
}

/// Non-empty trimmed pieces between separator matches, with their offsets.
fn split_spans<'a>(text: &'a str, sep: &Regex) -> Vec<(usize, &'a str)> {
    let mut spans = Vec::new();
    let mut start = 0;
    for m in sep.find_iter(text) {
        push_trimmed(text, start, m.start(), &mut spans);
        start = m.end();
    }
    push_trimmed(text, start, text.len(), &mut spans);
    spans
}

fn push_trimmed<'a>(text: &'a str, start: usize, end: usize, spans: &mut Vec<(usize, &'a str)>) {
    let piece = &text[start..end];
    let trimmed = piece.trim();
    if trimmed.is_empty() {
        return;
    }
    let lead = piece.len() - piece.trim_start().len();
    spans.push((start + lead, trimmed));
}

/// Blocks joined with single spaces; `None` when there is nothing to join.
pub fn join(blocks: &[Block]) -> Option<String> {
    let joined = blocks
        .iter()
        .map(|b| b.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let joined = joined.trim();
    (!joined.is_empty()).then(|| joined.to_string())
}
