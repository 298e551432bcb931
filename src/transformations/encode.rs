//! Encoding and hashing transformations.

use super::Transformation;
use std::borrow::Cow;

/// `t:base64Encode`.
pub struct Base64Encode;

impl Transformation for Base64Encode {
    fn transform<'a>(&self, input: &'a str) -> Cow<'a, str> {
        use base64::Engine;
        Cow::Owned(base64::engine::general_purpose::STANDARD.encode(input))
    }

    fn name(&self) -> &'static str {
        "base64Encode"
    }
}

/// `t:hexEncode`: lowercase hex digits per byte.
pub struct HexEncode;

impl Transformation for HexEncode {
    fn transform<'a>(&self, input: &'a str) -> Cow<'a, str> {
        let mut out = String::with_capacity(input.len() * 2);
        for b in input.bytes() {
            use std::fmt::Write;
            let _ = write!(out, "{b:02x}");
        }
        Cow::Owned(out)
    }

    fn name(&self) -> &'static str {
        "hexEncode"
    }
}

/// `t:urlEncode`: percent-encode everything but unreserved characters.
pub struct UrlEncode;

impl Transformation for UrlEncode {
    fn transform<'a>(&self, input: &'a str) -> Cow<'a, str> {
        use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
        let encoded = utf8_percent_encode(input, NON_ALPHANUMERIC).to_string();
        if encoded == input {
            Cow::Borrowed(input)
        } else {
            Cow::Owned(encoded)
        }
    }

    fn name(&self) -> &'static str {
        "urlEncode"
    }
}

/// `t:utf8toUnicode`: non-ASCII code points become `%uHHHH` escapes.
pub struct Utf8ToUnicode;

impl Transformation for Utf8ToUnicode {
    fn transform<'a>(&self, input: &'a str) -> Cow<'a, str> {
        if input.is_ascii() {
            return Cow::Borrowed(input);
        }

        let mut out = String::with_capacity(input.len());
        for c in input.chars() {
            if c.is_ascii() {
                out.push(c);
            } else {
                use std::fmt::Write;
                let _ = write!(out, "%u{:04x}", c as u32);
            }
        }
        Cow::Owned(out)
    }

    fn name(&self) -> &'static str {
        "utf8toUnicode"
    }
}

/// `t:md5`: hex digest of the MD5 hash.
pub struct Md5;

impl Transformation for Md5 {
    fn transform<'a>(&self, input: &'a str) -> Cow<'a, str> {
        use md5::{Digest, Md5 as Md5Hasher};
        let digest = Md5Hasher::digest(input.as_bytes());
        Cow::Owned(format!("{digest:x}"))
    }

    fn name(&self) -> &'static str {
        "md5"
    }
}

/// `t:sha1`: hex digest of the SHA-1 hash.
pub struct Sha1;

impl Transformation for Sha1 {
    fn transform<'a>(&self, input: &'a str) -> Cow<'a, str> {
        use sha1::{Digest, Sha1 as Sha1Hasher};
        let digest = Sha1Hasher::digest(input.as_bytes());
        Cow::Owned(format!("{digest:x}"))
    }

    fn name(&self) -> &'static str {
        "sha1"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_encode() {
        assert_eq!(Base64Encode.transform("hello"), "aGVsbG8=");
    }

    #[test]
    fn test_hex_encode() {
        assert_eq!(HexEncode.transform("AB"), "4142");
    }

    #[test]
    fn test_url_encode() {
        assert_eq!(UrlEncode.transform("a b/c"), "a%20b%2Fc");
        assert_eq!(UrlEncode.transform("abc"), "abc");
    }

    #[test]
    fn test_utf8_to_unicode() {
        assert_eq!(Utf8ToUnicode.transform("caf\u{e9}"), "caf%u00e9");
        assert_eq!(Utf8ToUnicode.transform("plain"), "plain");
    }

    #[test]
    fn test_md5() {
        assert_eq!(Md5.transform("hello"), "5d41402abc4b2a76b9719d911017c592");
    }

    #[test]
    fn test_sha1() {
        assert_eq!(
            Sha1.transform("hello"),
            "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d"
        );
    }
}
