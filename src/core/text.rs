//! Text preparation for rendering assistant output as HTML.

use once_cell::sync::Lazy;
use regex::Regex;

static SPACED_DASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s-\s").expect("valid regex"));

/// Turn model text into display HTML.
///
/// Literal `\n` sequences become newlines, paragraph breaks become
/// `<br/><br/>`, single newlines `<br/>`, and ` - ` starts a new bullet line.
pub fn format_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let text = text
        .replace("\\n", "\n")
        .replace("\n\n", "<br/><br/>")
        .replace('\n', "<br/>");

    SPACED_DASH
        .replace_all(&text, "<br/>- ")
        .trim()
        .to_string()
}

/// Escape the HTML special characters of untrusted text.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
