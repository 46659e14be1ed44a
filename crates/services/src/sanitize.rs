//! Input sanitization for submitted comments.
//!
//! Everything stored is already HTML-escaped, so templates can print it as-is.

use domains::{DomainError, Result};

/// Strips markup from a display name and escapes what is left.
pub fn sanitize_author(raw: &str) -> Result<String> {
    if raw.chars().any(char::is_control) {
        return Err(DomainError::ValidationError(
            "author contains control characters".into(),
        ));
    }
    let stripped = strip_tags(raw);
    let escaped = html_escape::encode_safe(stripped.trim()).into_owned();
    if escaped.is_empty() {
        return Err(DomainError::ValidationError("author is empty".into()));
    }
    Ok(escaped)
}

/// Escapes markup in a comment body. Line breaks and tabs are kept.
pub fn sanitize_content(raw: &str) -> Result<String> {
    if raw
        .chars()
        .any(|c| c.is_control() && !matches!(c, '\n' | '\r' | '\t'))
    {
        return Err(DomainError::ValidationError(
            "content contains control characters".into(),
        ));
    }
    let escaped = html_escape::encode_safe(raw.trim()).into_owned();
    if escaped.is_empty() {
        return Err(DomainError::ValidationError("content is empty".into()));
    }
    Ok(escaped)
}

/// Drops anything between `<` and `>`; an unterminated tag swallows the rest.
fn strip_tags(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_tag = false;
    for c in raw.chars() {
        match (in_tag, c) {
            (false, '<') => in_tag = true,
            (true, '>') => in_tag = false,
            (false, _) => out.push(c),
            (true, _) => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn author_markup_is_stripped() {
        assert_eq!(sanitize_author("<b>alice</b>").unwrap(), "alice");
        assert_eq!(sanitize_author("  bob <script>x").unwrap(), "bob");
        assert_eq!(sanitize_author("tom & \"jerry\"").unwrap(), "tom &amp; &quot;jerry&quot;");
    }

    #[test]
    fn author_that_is_only_markup_is_empty() {
        assert!(matches!(
            sanitize_author("<img src=x>"),
            Err(DomainError::ValidationError(_))
        ));
        assert!(matches!(sanitize_author("   "), Err(DomainError::ValidationError(_))));
    }

    #[test]
    fn author_rejects_line_breaks() {
        assert!(matches!(
            sanitize_author("eve\nip: 1.2.3.4"),
            Err(DomainError::ValidationError(_))
        ));
    }

    #[test]
    fn content_is_escaped_not_stripped() {
        let escaped = sanitize_content("<script>alert('x')</script>").unwrap();
        assert!(escaped.starts_with("&lt;script&gt;alert("));
        assert!(!escaped.contains(['<', '>', '\'']));
    }

    #[test]
    fn content_keeps_line_breaks() {
        assert_eq!(sanitize_content("one\n\ttwo\r\n").unwrap(), "one\n\ttwo");
    }

    #[test]
    fn content_rejects_other_control_characters() {
        assert!(matches!(
            sanitize_content("bell\u{7}"),
            Err(DomainError::ValidationError(_))
        ));
        assert!(matches!(sanitize_content("\n \n"), Err(DomainError::ValidationError(_))));
    }
}
