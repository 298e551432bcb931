//! Cross-site scripting detection.

use super::Detection;
use once_cell::sync::Lazy;
use regex::Regex;

/// Tags that execute or load active content.
static ACTIVE_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<\s*(script|iframe|object|embed|applet|meta|base|form|svg|math)\b")
        .expect("static regex")
});

/// Event-handler attributes inside a tag: `<img onerror=...>`.
static EVENT_HANDLER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<[^>]+\bon[a-z]{3,30}\s*=").expect("static regex")
});

/// Script-scheme URLs, tolerating embedded whitespace.
static SCRIPT_SCHEME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(j\s*a\s*v\s*a\s*s\s*c\s*r\s*i\s*p\s*t|vbscript|livescript)\s*:")
        .expect("static regex")
});

/// Other executable sinks.
static SINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(expression\s*\(|srcdoc\s*=|data\s*:\s*text/html|@import\b|document\s*\.\s*cookie)"#)
        .expect("static regex")
});

/// Evaluate a value for XSS shapes.
pub fn detect(value: &str) -> Detection {
    if value.len() < 4 {
        return Detection::clean();
    }

    if ACTIVE_TAG.is_match(value) {
        return Detection::detected("tag");
    }
    if EVENT_HANDLER.is_match(value) {
        return Detection::detected("handler");
    }
    if SCRIPT_SCHEME.is_match(value) {
        return Detection::detected("scheme");
    }
    if SINK.is_match(value) {
        return Detection::detected("sink");
    }

    Detection::clean()
}

/// Convenience predicate over [`detect`].
pub fn is_xss(value: &str) -> bool {
    detect(value).is_injection
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_tag() {
        assert!(is_xss("<script>alert(1)</script>"));
        assert!(is_xss("< SCRIPT src=//evil>"));
    }

    #[test]
    fn test_event_handlers() {
        assert!(is_xss("<img src=x onerror=alert(1)>"));
        assert!(is_xss("<body onload=alert(1)>"));
        assert!(is_xss("<div onmouseover=\"steal()\">"));
    }

    #[test]
    fn test_script_schemes() {
        assert!(is_xss("javascript:alert(1)"));
        assert!(is_xss("java\tscript:alert(1)"));
        assert!(is_xss("vbscript:msgbox(1)"));
    }

    #[test]
    fn test_sinks() {
        assert!(is_xss("width:expression(alert(1))"));
        assert!(is_xss("<iframe srcdoc='<b>x</b>'>"));
        assert!(is_xss("data:text/html;base64,PHNjcmlwdD4="));
    }

    #[test]
    fn test_benign_markup() {
        assert!(!is_xss("hello world"));
        assert!(!is_xss("<p>Normal paragraph</p>"));
        assert!(!is_xss("<a href=\"https://example.com\">link</a>"));
        assert!(!is_xss("5 > 3 and 2 < 4"));
    }
}
