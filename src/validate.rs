use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Outcome of the structural rule check over a complete accumulated output.
///
/// `valid` is true iff `errors` is empty. The errors list every violated rule
/// in rule order, not just the first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
}

// Tag-boundary aware: `<html` must be followed by whitespace or `>` so that
// e.g. `<htmlarea>` (hypothetical custom tag) does not trip the rule.
static FORBIDDEN_HTML: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<html[\s>]").unwrap());
static FORBIDDEN_HEAD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<head[\s>]").unwrap());
static FORBIDDEN_BODY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<body[\s>]").unwrap());
static REQUIRED_SECTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<section").unwrap());
static REQUIRED_H2: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<h2").unwrap());
static REQUIRED_H3: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<h3").unwrap());

/// Check a generated HTML snippet for structural conformance.
///
/// Rules, in order:
/// 1-3. no full-document wrapper tags (`<html`, `<head`, `<body>`)
/// 4. no triple-backtick code fences
/// 5. at least one `<section` tag
/// 6. at least one `<h2` or `<h3` heading
///
/// Pure function over the text; calling it twice yields identical results.
pub fn validate_html_output(html: &str) -> ValidationResult {
    let mut errors = Vec::new();

    if FORBIDDEN_HTML.is_match(html) {
        errors.push("Contains forbidden <html> tag".to_string());
    }
    if FORBIDDEN_HEAD.is_match(html) {
        errors.push("Contains forbidden <head> tag".to_string());
    }
    if FORBIDDEN_BODY.is_match(html) {
        errors.push("Contains forbidden <body> tag".to_string());
    }
    if html.contains("```") {
        errors.push("Contains code fence markers (```)".to_string());
    }
    if !REQUIRED_SECTION.is_match(html) {
        errors.push("Missing <section> tags for content blocks".to_string());
    }
    if !REQUIRED_H2.is_match(html) && !REQUIRED_H3.is_match(html) {
        errors.push("Missing heading tags (h2/h3)".to_string());
    }

    ValidationResult {
        valid: errors.is_empty(),
        errors,
    }
}
