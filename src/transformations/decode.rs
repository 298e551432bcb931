//! Decoding transformations.

use super::Transformation;
use std::borrow::Cow;

/// `t:urlDecode`: percent-decoding, `+` untouched.
pub struct UrlDecode;

impl Transformation for UrlDecode {
    fn transform<'a>(&self, input: &'a str) -> Cow<'a, str> {
        match percent_encoding::percent_decode_str(input).decode_utf8() {
            Ok(decoded) if decoded != input => Cow::Owned(decoded.into_owned()),
            _ => Cow::Borrowed(input),
        }
    }

    fn name(&self) -> &'static str {
        "urlDecode"
    }
}

/// `t:urlDecodeUni`: percent-decoding plus IIS-style `%uHHHH` escapes.
pub struct UrlDecodeUni;

impl Transformation for UrlDecodeUni {
    fn transform<'a>(&self, input: &'a str) -> Cow<'a, str> {
        if !input.contains('%') {
            return Cow::Borrowed(input);
        }

        let bytes = input.as_bytes();
        let mut out = String::with_capacity(input.len());
        let mut i = 0;

        while i < bytes.len() {
            if bytes[i] == b'%' && matches!(bytes.get(i + 1), Some(b'u') | Some(b'U')) {
                if let Some(hex) = input.get(i + 2..i + 6) {
                    if let Ok(code) = u32::from_str_radix(hex, 16) {
                        if let Some(c) = char::from_u32(code) {
                            out.push(c);
                            i += 6;
                            continue;
                        }
                    }
                }
                out.push('%');
                i += 1;
            } else if bytes[i] == b'%' {
                if let Some(hex) = input.get(i + 1..i + 3) {
                    if let Ok(byte) = u8::from_str_radix(hex, 16) {
                        out.push(byte as char);
                        i += 3;
                        continue;
                    }
                }
                out.push('%');
                i += 1;
            } else {
                out.push(bytes[i] as char);
                i += 1;
            }
        }

        Cow::Owned(out)
    }

    fn name(&self) -> &'static str {
        "urlDecodeUni"
    }
}

/// `t:base64Decode`: strict standard alphabet.
pub struct Base64Decode;

impl Transformation for Base64Decode {
    fn transform<'a>(&self, input: &'a str) -> Cow<'a, str> {
        use base64::Engine;
        match base64::engine::general_purpose::STANDARD.decode(input) {
            Ok(bytes) => Cow::Owned(String::from_utf8_lossy(&bytes).into_owned()),
            Err(_) => Cow::Borrowed(input),
        }
    }

    fn name(&self) -> &'static str {
        "base64Decode"
    }
}

/// `t:base64DecodeExt`: forgiving variant that ignores foreign characters.
pub struct Base64DecodeExt;

impl Transformation for Base64DecodeExt {
    fn transform<'a>(&self, input: &'a str) -> Cow<'a, str> {
        use base64::Engine;

        let cleaned: String = input
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '-' | '_'))
            .map(|c| match c {
                '-' => '+',
                '_' => '/',
                c => c,
            })
            .collect();

        let engine = base64::engine::general_purpose::STANDARD_NO_PAD;
        match engine.decode(cleaned.trim_end_matches('=')) {
            Ok(bytes) => Cow::Owned(String::from_utf8_lossy(&bytes).into_owned()),
            Err(_) => Cow::Borrowed(input),
        }
    }

    fn name(&self) -> &'static str {
        "base64DecodeExt"
    }
}

/// `t:hexDecode`: pairs of hex digits to bytes.
pub struct HexDecode;

impl Transformation for HexDecode {
    fn transform<'a>(&self, input: &'a str) -> Cow<'a, str> {
        if input.len() % 2 != 0 || input.is_empty() {
            return Cow::Borrowed(input);
        }

        let mut bytes = Vec::with_capacity(input.len() / 2);
        for chunk in input.as_bytes().chunks_exact(2) {
            let hex = std::str::from_utf8(chunk).unwrap_or("");
            match u8::from_str_radix(hex, 16) {
                Ok(b) => bytes.push(b),
                Err(_) => return Cow::Borrowed(input),
            }
        }

        Cow::Owned(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn name(&self) -> &'static str {
        "hexDecode"
    }
}

/// `t:htmlEntityDecode`: named and numeric HTML entities.
pub struct HtmlEntityDecode;

impl Transformation for HtmlEntityDecode {
    fn transform<'a>(&self, input: &'a str) -> Cow<'a, str> {
        let decoded = html_escape::decode_html_entities(input);
        if decoded == input {
            Cow::Borrowed(input)
        } else {
            Cow::Owned(decoded.into_owned())
        }
    }

    fn name(&self) -> &'static str {
        "htmlEntityDecode"
    }
}

/// `t:jsDecode`: JavaScript string escapes (`\xHH`, `\uHHHH`, `\n`, ...).
pub struct JsDecode;

impl Transformation for JsDecode {
    fn transform<'a>(&self, input: &'a str) -> Cow<'a, str> {
        if !input.contains('\\') {
            return Cow::Borrowed(input);
        }

        let mut out = String::with_capacity(input.len());
        let mut chars = input.chars();

        while let Some(c) = chars.next() {
            if c != '\\' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('t') => out.push('\t'),
                Some('v') => out.push('\u{b}'),
                Some('f') => out.push('\u{c}'),
                Some('\\') => out.push('\\'),
                Some('"') => out.push('"'),
                Some('\'') => out.push('\''),
                Some('x') => decode_fixed_hex(&mut chars, &mut out, 2, "\\x"),
                Some('u') => decode_fixed_hex(&mut chars, &mut out, 4, "\\u"),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        }

        Cow::Owned(out)
    }

    fn name(&self) -> &'static str {
        "jsDecode"
    }
}

fn decode_fixed_hex(chars: &mut std::str::Chars, out: &mut String, width: usize, prefix: &str) {
    let mut hex = String::with_capacity(width);
    for _ in 0..width {
        match chars.next() {
            Some(h) => hex.push(h),
            None => break,
        }
    }

    let decoded = if hex.len() == width {
        u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32)
    } else {
        None
    };

    match decoded {
        Some(c) => out.push(c),
        None => {
            out.push_str(prefix);
            out.push_str(&hex);
        }
    }
}

/// `t:cssDecode`: CSS `\HH..` escapes, up to six digits plus optional space.
pub struct CssDecode;

impl Transformation for CssDecode {
    fn transform<'a>(&self, input: &'a str) -> Cow<'a, str> {
        if !input.contains('\\') {
            return Cow::Borrowed(input);
        }

        let mut out = String::with_capacity(input.len());
        let mut chars = input.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '\\' {
                out.push(c);
                continue;
            }

            let mut hex = String::new();
            while hex.len() < 6 {
                match chars.peek() {
                    Some(h) if h.is_ascii_hexdigit() => {
                        hex.push(*h);
                        chars.next();
                    }
                    _ => break,
                }
            }

            if hex.is_empty() {
                // Escaped literal character.
                if let Some(next) = chars.next() {
                    out.push(next);
                } else {
                    out.push('\\');
                }
                continue;
            }

            // A single whitespace terminates the escape and is consumed.
            if matches!(chars.peek(), Some(' ') | Some('\t') | Some('\n')) {
                chars.next();
            }

            match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                Some(decoded) => out.push(decoded),
                None => {
                    out.push('\\');
                    out.push_str(&hex);
                }
            }
        }

        Cow::Owned(out)
    }

    fn name(&self) -> &'static str {
        "cssDecode"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_decode() {
        assert_eq!(UrlDecode.transform("hello%20world"), "hello world");
        assert_eq!(UrlDecode.transform("plain"), "plain");
    }

    #[test]
    fn test_url_decode_uni() {
        assert_eq!(UrlDecodeUni.transform("%u0041%42"), "AB");
        assert_eq!(UrlDecodeUni.transform("%zz"), "%zz");
    }

    #[test]
    fn test_base64_decode_strict_vs_ext() {
        assert_eq!(Base64Decode.transform("aGVsbG8="), "hello");
        assert_eq!(Base64Decode.transform("not base64!"), "not base64!");
        // Ext ignores whitespace and handles the URL-safe alphabet.
        assert_eq!(Base64DecodeExt.transform("aGVs bG8="), "hello");
        assert_eq!(Base64DecodeExt.transform("PHNjcmlwdD4"), "<script>");
    }

    #[test]
    fn test_hex_decode() {
        assert_eq!(HexDecode.transform("414243"), "ABC");
        assert_eq!(HexDecode.transform("41424"), "41424");
        assert_eq!(HexDecode.transform("zz"), "zz");
    }

    #[test]
    fn test_html_entity_decode() {
        assert_eq!(HtmlEntityDecode.transform("&lt;script&gt;"), "<script>");
        assert_eq!(HtmlEntityDecode.transform("&#x3c;"), "<");
    }

    #[test]
    fn test_js_decode() {
        assert_eq!(JsDecode.transform(r"\x3cscript\x3e"), "<script>");
        assert_eq!(JsDecode.transform(r"\u003c"), "<");
        assert_eq!(JsDecode.transform(r"a\qb"), "aqb");
    }

    #[test]
    fn test_css_decode() {
        assert_eq!(CssDecode.transform(r"\3c script\3e "), "<script>");
        assert_eq!(CssDecode.transform(r"ex\70 ression"), "expression");
    }
}
