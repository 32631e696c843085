//! Turning raw generator text into proposed sections
//!
//! Models are asked for `{"planItems": [...]}` but often wrap it in prose or
//! code fences, or ignore the format entirely. Extraction tries the JSON span
//! first and falls back to scanning the text for title lines.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::ProposedItem;

/// `1. Title`, `2.3 Title`, `# Title`, `## Title`
static TITLE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:(?P<num>\d+(?:\.\d+)*)\.?|(?P<hash>#{1,6}))\s+(?P<title>\S.*?)\s*$")
        .expect("title pattern is a valid regex")
});

/// Which strategy produced the sections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionSource {
    Json,
    TextScan,
}

/// Sections recovered from a raw response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub items: Vec<ProposedItem>,
    pub source: ExtractionSource,
}

/// The span from the first `{` to the last `}`, if any
pub fn json_span(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

/// Parse `{"planItems": [...]}` out of the response
///
/// Entries are read one at a time; an untitled or malformed entry is skipped
/// without losing the others.
pub fn parse_json(raw: &str) -> Option<Vec<ProposedItem>> {
    let span = json_span(raw)?;
    let response: Value = match serde_json::from_str(span) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "parse_json: response is not valid JSON");
            return None;
        }
    };
    let Some(entries) = response.get("planItems").and_then(Value::as_array) else {
        warn!("parse_json: no planItems array");
        return Some(Vec::new());
    };

    let mut items = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        match serde_json::from_value::<ProposedItem>(entry.clone()) {
            Ok(mut item) if !item.title.trim().is_empty() => {
                item.title = item.title.trim().to_string();
                items.push(item);
            }
            Ok(_) => debug!(%index, "parse_json: skipped untitled entry"),
            Err(e) => warn!(%index, error = %e, "parse_json: skipped malformed entry"),
        }
    }
    debug!(count = %items.len(), "parse_json: parsed");
    Some(items)
}

/// Scan plain text for title lines; following non-empty lines become that title's comments
pub fn scan_text(raw: &str) -> Vec<ProposedItem> {
    debug!(len = %raw.len(), "scan_text: called");
    let mut items: Vec<ProposedItem> = Vec::new();
    let mut comments: Vec<String> = Vec::new();

    for line in raw.lines() {
        if let Some(caps) = TITLE_LINE.captures(line) {
            let title = caps["title"].trim_matches(|c: char| c == '*' || c == ':' || c.is_whitespace());
            if title.is_empty() {
                continue;
            }
            let level = match (caps.name("num"), caps.name("hash")) {
                (_, Some(hash)) if hash.as_str().len() >= 2 => 2,
                (Some(num), _) if num.as_str().contains('.') => 2,
                _ => 1,
            };
            flush(&mut items, &mut comments);
            items.push(ProposedItem::new(title).with_level(level));
        } else if !items.is_empty() && !line.trim().is_empty() {
            comments.push(line.trim().to_string());
        }
    }
    flush(&mut items, &mut comments);

    debug!(count = %items.len(), "scan_text: done");
    items
}

fn flush(items: &mut [ProposedItem], comments: &mut Vec<String>) {
    if let Some(last) = items.last_mut()
        && !comments.is_empty()
    {
        last.comments = Some(comments.join(" "));
    }
    comments.clear();
}

/// JSON first, then the text scan; `None` when neither finds a section
pub fn extract_sections(raw: &str) -> Option<Extraction> {
    if let Some(items) = parse_json(raw)
        && !items.is_empty()
    {
        return Some(Extraction {
            items,
            source: ExtractionSource::Json,
        });
    }

    let items = scan_text(raw);
    if items.is_empty() {
        warn!("extract_sections: no sections found");
        return None;
    }
    Some(Extraction {
        items,
        source: ExtractionSource::TextScan,
    })
}
