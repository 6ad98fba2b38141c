use crate::error::{Result, SkillsyncError};
use serde_yaml::Mapping;

// ---------------------------------------------------------------------------
// Frontmatter parsing
// ---------------------------------------------------------------------------

/// Parsed frontmatter: a string-keyed YAML mapping.
pub type Frontmatter = Mapping;

const DELIMITER: &str = "---";

/// Split content at `---` delimiters into (raw YAML block, body).
///
/// The raw block is whitespace-trimmed; the body keeps everything after the
/// closing delimiter with leading newlines stripped.
fn split_raw(content: &str) -> Result<(&str, &str)> {
    if !content.starts_with(DELIMITER) {
        return Err(SkillsyncError::MissingFrontmatter);
    }
    let after_open = &content[DELIMITER.len()..];
    let close = after_open
        .find(DELIMITER)
        .ok_or(SkillsyncError::MalformedFrontmatter)?;
    let raw = after_open[..close].trim();
    let body = after_open[close + DELIMITER.len()..].trim_start_matches('\n');
    Ok((raw, body))
}

/// Strict parse: missing or unclosed frontmatter and YAML syntax errors are
/// hard failures. Used at validation/installation time.
pub fn parse_strict(content: &str) -> Result<(Frontmatter, &str)> {
    let (raw, body) = split_raw(content)?;
    if raw.is_empty() {
        return Ok((Mapping::new(), body));
    }
    let mapping: Mapping = serde_yaml::from_str(raw)
        .map_err(|e| SkillsyncError::InvalidFrontmatter(e.to_string()))?;
    Ok((mapping, body))
}

/// Lenient parse: any failure degrades to an empty mapping with the full
/// content as body. Used during discovery, which must skip non-conforming
/// files rather than abort.
pub fn parse_lenient(content: &str) -> (Frontmatter, &str) {
    match parse_strict(content) {
        Ok((mapping, body)) => (mapping, body),
        Err(_) => (Mapping::new(), content),
    }
}

/// Serialize a frontmatter mapping and body back into delimited form:
/// the YAML block wrapped in `---` lines, a blank line, then the body.
/// An empty mapping yields the body alone.
pub fn serialize(frontmatter: &Frontmatter, body: &str) -> String {
    if frontmatter.is_empty() {
        return body.to_string();
    }
    // serde_yaml preserves insertion order and never emits a document marker.
    let yaml = serde_yaml::to_string(frontmatter).unwrap_or_default();
    format!("{DELIMITER}\n{yaml}{DELIMITER}\n\n{body}")
}

/// Look up a string-valued field in a frontmatter mapping.
pub fn get_str<'a>(frontmatter: &'a Frontmatter, key: &str) -> Option<&'a str> {
    frontmatter.get(key).and_then(|v| v.as_str())
}

/// True if the mapping contains the given key, regardless of value shape.
pub fn has_key(frontmatter: &Frontmatter, key: &str) -> bool {
    frontmatter.contains_key(key)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
