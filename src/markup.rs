//! KML extraction and validation
//!
//! Model output is noisy: fenced code blocks, prose before the document,
//! missing closing tags. `extract` carves out the best-effort document and
//! `validate` decides whether it is actually well-formed.

use crate::error::{RigError, RigResult};
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::warn;

/// Tokens that may legally open a document
const START_TOKENS: &[&str] = &["<?xml", "<kml"];

/// Closing tag that must end the document
const END_TOKEN: &str = "</kml>";

/// A validated geographic markup document
#[derive(Debug, Clone, PartialEq)]
pub struct MarkupDocument {
    pub kml: String,
}

impl MarkupDocument {
    /// Validate `raw` (already extracted) and wrap it
    pub fn new(raw: String) -> RigResult<Self> {
        validate(&raw)?;
        Ok(Self { kml: raw })
    }
}

/// Strip one surrounding fenced code block, if present
fn strip_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop an optional language tag on the opening fence line
    match body.find('\n') {
        Some(pos) => body[pos + 1..].trim(),
        None => body.trim(),
    }
}

/// Carve the candidate document out of raw model text.
///
/// Pure best-effort transform with no failure mode: rejection of garbage is
/// validation's job. Idempotent for any input containing a well-formed
/// embedded document.
pub fn extract(raw: &str) -> String {
    let text = strip_fence(raw);

    let start = START_TOKENS
        .iter()
        .filter_map(|token| text.find(token))
        .min();

    let Some(start) = start else {
        // No document boundary at all; hand everything to validation
        return text.trim().to_string();
    };

    if start > 0 {
        warn!(
            "Discarding {} chars of prose before document start",
            start
        );
    }

    match text.rfind(END_TOKEN) {
        Some(end) if end >= start => text[start..end + END_TOKEN.len()].to_string(),
        // Missing closure: return the open tail, validation will reject it
        _ => text[start..].trim_end().to_string(),
    }
}

/// Check that `document` is a well-formed KML document.
///
/// Requires both the superficial shape (starts with a root declaration,
/// ends with the closing tag) and tree validity via an XML parse with
/// end-name checking. Parser diagnostics become the error detail.
pub fn validate(document: &str) -> RigResult<()> {
    let trimmed = document.trim();

    if !START_TOKENS.iter().any(|t| trimmed.starts_with(t)) {
        return Err(RigError::Validation(
            "document does not start with an XML or KML declaration".into(),
        ));
    }
    if !trimmed.ends_with(END_TOKEN) {
        return Err(RigError::Validation(format!(
            "document does not end with {END_TOKEN}"
        )));
    }

    let mut reader = Reader::from_str(trimmed);
    reader.config_mut().check_end_names = true;

    loop {
        match reader.read_event() {
            Ok(Event::Eof) => return Ok(()),
            Ok(_) => {}
            Err(e) => return Err(RigError::Validation(e.to_string())),
        }
    }
}
