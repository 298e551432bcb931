//! SQL injection detection.

use super::Detection;
use once_cell::sync::Lazy;
use regex::Regex;

/// Statement keywords that only appear in query context.
static STATEMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(union\s+(all\s+)?select|select\s.+\bfrom\b|insert\s+into|drop\s+(table|database)|delete\s+from|update\s+\w+\s+set|truncate\s+table|load_file\s*\(|into\s+(out|dump)file)\b",
    )
    .expect("static regex")
});

/// Time-based and stacked-query probes.
static PROBE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(sleep|benchmark|pg_sleep|extractvalue|updatexml)\s*\(|\bwaitfor\s+delay\b")
        .expect("static regex")
});

/// Boolean operator immediately after a closing quote: `' or`, `" and`.
static QUOTE_BOOL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)['"]\s*(or|and|\|\||&&)\b"#).expect("static regex"));

/// Candidate comparison for tautology checking.
static COMPARISON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(['"]?\w+['"]?)\s*=\s*(['"]?\w+['"]?)"#).expect("static regex")
});

/// Evaluate a value for SQL injection shapes.
pub fn detect(value: &str) -> Detection {
    if value.len() < 3 {
        return Detection::clean();
    }

    if STATEMENT.is_match(value) {
        return Detection::detected("stmt");
    }
    if PROBE.is_match(value) {
        return Detection::detected("probe");
    }
    if QUOTE_BOOL.is_match(value) {
        return Detection::detected("qbool");
    }
    if has_quote_comment(value) {
        return Detection::detected("qcomment");
    }
    // A tautology only counts when quoting is involved, otherwise ordinary
    // "key=value" text would trip it.
    if value.contains('\'') && has_tautology(value) {
        return Detection::detected("taut");
    }

    Detection::clean()
}

/// Convenience predicate over [`detect`].
pub fn is_sqli(value: &str) -> bool {
    detect(value).is_injection
}

/// Quote-then-comment termination: `admin'--`, `x"); #`.
fn has_quote_comment(value: &str) -> bool {
    let Some(quote_pos) = value.find(['\'', '"']) else {
        return false;
    };
    let tail = &value[quote_pos..];
    tail.contains("--") || tail.contains("/*") || tail.contains('#')
}

/// `X = X` with identical operands once quotes are stripped.
fn has_tautology(value: &str) -> bool {
    COMPARISON.captures_iter(value).any(|caps| {
        let strip = |s: &str| s.trim_matches(['\'', '"']).to_ascii_lowercase();
        let left = strip(caps.get(1).map_or("", |m| m.as_str()));
        let right = strip(caps.get(2).map_or("", |m| m.as_str()));
        !left.is_empty() && left == right
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_select() {
        assert!(is_sqli("1 UNION SELECT username, password FROM users"));
        assert!(is_sqli("1 union all select null,null--"));
    }

    #[test]
    fn test_tautology_requires_quote() {
        assert!(is_sqli("' OR '1'='1"));
        assert!(is_sqli("x' AND '1'='1"));
        assert!(!is_sqli("page=1"));
        assert!(!is_sqli("a=a"));
    }

    #[test]
    fn test_stacked_drop() {
        assert!(is_sqli("1; DROP TABLE users--"));
    }

    #[test]
    fn test_comment_termination() {
        assert!(is_sqli("admin'--"));
        assert!(is_sqli("admin'/*"));
    }

    #[test]
    fn test_time_probe() {
        assert!(is_sqli("1 AND SLEEP(5)"));
        assert!(is_sqli("1;waitfor delay '0:0:5'"));
    }

    #[test]
    fn test_benign_text() {
        assert!(!is_sqli("select a nice color"));
        assert!(!is_sqli("the union of two sets"));
        assert!(!is_sqli("drop me a line"));
        assert!(!is_sqli("it's a nice day"));
    }

    #[test]
    fn test_fingerprints() {
        assert_eq!(detect("1 UNION SELECT * FROM t").fingerprint, Some("stmt"));
        assert_eq!(detect("' or 1=1").fingerprint, Some("qbool"));
        assert_eq!(detect("'1'='1").fingerprint, Some("taut"));
    }
}
