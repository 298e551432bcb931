//! Normalization transformations.

use super::Transformation;
use std::borrow::Cow;

/// `t:lowercase`.
pub struct Lowercase;

impl Transformation for Lowercase {
    fn transform<'a>(&self, input: &'a str) -> Cow<'a, str> {
        if input.chars().any(|c| c.is_uppercase()) {
            Cow::Owned(input.to_lowercase())
        } else {
            Cow::Borrowed(input)
        }
    }

    fn name(&self) -> &'static str {
        "lowercase"
    }
}

/// `t:uppercase`.
pub struct Uppercase;

impl Transformation for Uppercase {
    fn transform<'a>(&self, input: &'a str) -> Cow<'a, str> {
        if input.chars().any(|c| c.is_lowercase()) {
            Cow::Owned(input.to_uppercase())
        } else {
            Cow::Borrowed(input)
        }
    }

    fn name(&self) -> &'static str {
        "uppercase"
    }
}

/// `t:trim`.
pub struct Trim;

impl Transformation for Trim {
    fn transform<'a>(&self, input: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(input.trim())
    }

    fn name(&self) -> &'static str {
        "trim"
    }
}

/// `t:trimLeft`.
pub struct TrimLeft;

impl Transformation for TrimLeft {
    fn transform<'a>(&self, input: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(input.trim_start())
    }

    fn name(&self) -> &'static str {
        "trimLeft"
    }
}

/// `t:trimRight`.
pub struct TrimRight;

impl Transformation for TrimRight {
    fn transform<'a>(&self, input: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(input.trim_end())
    }

    fn name(&self) -> &'static str {
        "trimRight"
    }
}

/// `t:compressWhitespace`: runs of whitespace become one space.
pub struct CompressWhitespace;

impl Transformation for CompressWhitespace {
    fn transform<'a>(&self, input: &'a str) -> Cow<'a, str> {
        if !input
            .chars()
            .any(|c| c.is_whitespace() && c != ' ')
            && !input.contains("  ")
        {
            return Cow::Borrowed(input);
        }

        let mut out = String::with_capacity(input.len());
        let mut in_space = false;
        for c in input.chars() {
            if c.is_whitespace() {
                if !in_space {
                    out.push(' ');
                }
                in_space = true;
            } else {
                out.push(c);
                in_space = false;
            }
        }
        Cow::Owned(out)
    }

    fn name(&self) -> &'static str {
        "compressWhitespace"
    }
}

/// `t:removeWhitespace`.
pub struct RemoveWhitespace;

impl Transformation for RemoveWhitespace {
    fn transform<'a>(&self, input: &'a str) -> Cow<'a, str> {
        if !input.chars().any(char::is_whitespace) {
            return Cow::Borrowed(input);
        }
        Cow::Owned(input.chars().filter(|c| !c.is_whitespace()).collect())
    }

    fn name(&self) -> &'static str {
        "removeWhitespace"
    }
}

/// `t:removeNulls`.
pub struct RemoveNulls;

impl Transformation for RemoveNulls {
    fn transform<'a>(&self, input: &'a str) -> Cow<'a, str> {
        if !input.contains('\0') {
            return Cow::Borrowed(input);
        }
        Cow::Owned(input.replace('\0', ""))
    }

    fn name(&self) -> &'static str {
        "removeNulls"
    }
}

/// `t:replaceNulls`: NUL bytes become spaces.
pub struct ReplaceNulls;

impl Transformation for ReplaceNulls {
    fn transform<'a>(&self, input: &'a str) -> Cow<'a, str> {
        if !input.contains('\0') {
            return Cow::Borrowed(input);
        }
        Cow::Owned(input.replace('\0', " "))
    }

    fn name(&self) -> &'static str {
        "replaceNulls"
    }
}

/// `t:normalizePath`: collapse slashes, resolve `.` and `..` segments.
pub struct NormalizePath;

impl Transformation for NormalizePath {
    fn transform<'a>(&self, input: &'a str) -> Cow<'a, str> {
        let unified = input.replace('\\', "/");
        let absolute = unified.starts_with('/');
        let trailing_slash = unified.len() > 1 && unified.ends_with('/');

        let mut segments: Vec<&str> = Vec::new();
        for segment in unified.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                other => segments.push(other),
            }
        }

        let mut normalized = String::with_capacity(input.len());
        if absolute {
            normalized.push('/');
        }
        normalized.push_str(&segments.join("/"));
        if trailing_slash && !normalized.ends_with('/') {
            normalized.push('/');
        }

        if normalized == input {
            Cow::Borrowed(input)
        } else {
            Cow::Owned(normalized)
        }
    }

    fn name(&self) -> &'static str {
        "normalizePath"
    }
}

/// `t:normalizePathWin`: like normalizePath, backslash output.
pub struct NormalizePathWin;

impl Transformation for NormalizePathWin {
    fn transform<'a>(&self, input: &'a str) -> Cow<'a, str> {
        match NormalizePath.transform(input) {
            Cow::Borrowed(s) if !s.contains('/') => Cow::Borrowed(s),
            normalized => Cow::Owned(normalized.replace('/', "\\")),
        }
    }

    fn name(&self) -> &'static str {
        "normalizePathWin"
    }
}

/// `t:removeComments`: strip `/* ... */` spans.
pub struct RemoveComments;

impl Transformation for RemoveComments {
    fn transform<'a>(&self, input: &'a str) -> Cow<'a, str> {
        if !input.contains("/*") {
            return Cow::Borrowed(input);
        }

        let mut out = String::with_capacity(input.len());
        let mut rest = input;
        loop {
            match rest.find("/*") {
                Some(open) => {
                    out.push_str(&rest[..open]);
                    match rest[open + 2..].find("*/") {
                        Some(close) => rest = &rest[open + 2 + close + 2..],
                        // Unterminated comment swallows the remainder.
                        None => break,
                    }
                }
                None => {
                    out.push_str(rest);
                    break;
                }
            }
        }
        Cow::Owned(out)
    }

    fn name(&self) -> &'static str {
        "removeComments"
    }
}

/// `t:cmdLine`: shell-evasion normalization.
///
/// Drops `^` and `"` and `'` and `\` escapes, turns `,` and `;` into
/// spaces, lowercases, compresses whitespace and removes space before
/// `/` and `(`.
pub struct CmdLine;

impl Transformation for CmdLine {
    fn transform<'a>(&self, input: &'a str) -> Cow<'a, str> {
        let mut out = String::with_capacity(input.len());
        let mut in_space = false;

        for c in input.chars() {
            let c = match c {
                '"' | '\'' | '\\' | '^' => continue,
                ',' | ';' => ' ',
                c => c.to_ascii_lowercase(),
            };

            if c.is_whitespace() {
                in_space = true;
                continue;
            }
            if in_space {
                if c != '/' && c != '(' && !out.is_empty() {
                    out.push(' ');
                }
                in_space = false;
            }
            out.push(c);
        }

        if out == input {
            Cow::Borrowed(input)
        } else {
            Cow::Owned(out)
        }
    }

    fn name(&self) -> &'static str {
        "cmdLine"
    }
}
