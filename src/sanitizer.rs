use regex::Regex;

/// Entities that may legitimately follow an ampersand in the upstream feeds.
const XML_ENTITIES: [&str; 5] = ["amp;", "quot;", "apos;", "lt;", "gt;"];

/// Escapes any `&` that does not already start a recognized entity.
///
/// Idempotent: `&amp;` stays `&amp;` on every pass.
fn escape_stray_ampersands(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for (i, ch) in input.char_indices() {
        if ch == '&' {
            let rest = &input[i + 1..];
            if XML_ENTITIES.iter().any(|entity| rest.starts_with(entity)) {
                out.push('&');
            } else {
                out.push_str("&amp;");
            }
        } else {
            out.push(ch);
        }
    }
    out
}

/// Replaces each run of characters outside the XML-safe ranges (tab, LF, CR,
/// U+0020-U+D7FF, U+E000-U+FFFD) with a single space.
fn strip_invalid_xml_chars(input: &str) -> String {
    let invalid = Regex::new(r"[^\t\n\r\u{0020}-\u{D7FF}\u{E000}-\u{FFFD}]+")
        .expect("invalid-character pattern is constant");
    invalid.replace_all(input, " ").into_owned()
}

/// Cleans non-conformant feed markup so it can be parsed as XML.
///
/// Ampersand escaping runs first; it never introduces characters the range
/// pass would reject, so the combined pass stays idempotent.
pub fn clean(raw_markup: &str) -> String {
    strip_invalid_xml_chars(&escape_stray_ampersands(raw_markup))
}

/// Field-level sanitizer applied to specific output fields after mapping.
///
/// Sanitizers form an ordered chain; every entry always runs.
pub trait Sanitizer: Send + Sync {
    fn sanitize(&self, value: &str) -> String;
}

/// Cleans up application links coming out of the feeds: surrounding
/// whitespace and embedded line breaks occasionally leak into the URL field.
pub struct SanitizeJobPostingLink;

impl Sanitizer for SanitizeJobPostingLink {
    fn sanitize(&self, value: &str) -> String {
        value
            .trim()
            .chars()
            .filter(|c| *c != '\r' && *c != '\n')
            .collect()
    }
}

/// Runs a sanitizer chain over one field value.
pub fn apply_chain(sanitizers: &[Box<dyn Sanitizer>], value: &str) -> String {
    sanitizers
        .iter()
        .fold(value.to_string(), |acc, s| s.sanitize(&acc))
}
