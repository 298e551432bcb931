//! Transformation functions applied to values before operator evaluation.
//!
//! Transformations are pure `str -> str` functions and never fail: malformed
//! input passes through unchanged. `t:none` resets the pipeline built so far.

mod decode;
mod encode;
mod normalize;
mod pipeline;

pub use decode::*;
pub use encode::*;
pub use normalize::*;
pub use pipeline::TransformationPipeline;

use crate::error::{Error, Result};
use std::borrow::Cow;
use std::sync::Arc;

/// A named, pure string transformation.
pub trait Transformation: Send + Sync {
    /// Apply the transformation.
    fn transform<'a>(&self, input: &'a str) -> Cow<'a, str>;

    /// The canonical transformation name.
    fn name(&self) -> &'static str;
}

/// Look up a transformation by name, case-insensitively.
pub fn create_transformation(name: &str) -> Result<Arc<dyn Transformation>> {
    let t: Arc<dyn Transformation> = match name.to_ascii_lowercase().as_str() {
        // Decoding
        "urldecode" => Arc::new(UrlDecode),
        "urldecodeuni" => Arc::new(UrlDecodeUni),
        "base64decode" => Arc::new(Base64Decode),
        "base64decodeext" => Arc::new(Base64DecodeExt),
        "hexdecode" => Arc::new(HexDecode),
        "htmlentitydecode" => Arc::new(HtmlEntityDecode),
        "jsdecode" => Arc::new(JsDecode),
        "cssdecode" => Arc::new(CssDecode),

        // Encoding
        "base64encode" => Arc::new(Base64Encode),
        "hexencode" => Arc::new(HexEncode),
        "urlencode" => Arc::new(UrlEncode),
        "utf8tounicode" => Arc::new(Utf8ToUnicode),

        // Normalization
        "lowercase" => Arc::new(Lowercase),
        "uppercase" => Arc::new(Uppercase),
        "trim" => Arc::new(Trim),
        "trimleft" => Arc::new(TrimLeft),
        "trimright" => Arc::new(TrimRight),
        "compresswhitespace" => Arc::new(CompressWhitespace),
        "removewhitespace" => Arc::new(RemoveWhitespace),
        "removenulls" => Arc::new(RemoveNulls),
        "replacenulls" => Arc::new(ReplaceNulls),
        "normalizepath" | "normalisepath" => Arc::new(NormalizePath),
        "normalizepathwin" | "normalisepathwin" => Arc::new(NormalizePathWin),
        "removecomments" => Arc::new(RemoveComments),
        "cmdline" => Arc::new(CmdLine),

        // Hashing
        "md5" => Arc::new(Md5),
        "sha1" => Arc::new(Sha1),

        // Special
        "length" => Arc::new(Length),
        "none" => Arc::new(NoneTransform),

        _ => {
            return Err(Error::UnknownTransformation {
                name: name.to_string(),
            })
        }
    };
    Ok(t)
}

/// Identity transformation; `t:none` additionally clears the pipeline.
pub struct NoneTransform;

impl Transformation for NoneTransform {
    fn transform<'a>(&self, input: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(input)
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

/// Replaces the value with its byte length as a decimal string.
pub struct Length;

impl Transformation for Length {
    fn transform<'a>(&self, input: &'a str) -> Cow<'a, str> {
        Cow::Owned(input.len().to_string())
    }

    fn name(&self) -> &'static str {
        "length"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_covers_required_set() {
        for name in [
            "none",
            "lowercase",
            "uppercase",
            "trim",
            "trimLeft",
            "trimRight",
            "compressWhitespace",
            "removeWhitespace",
            "replaceNulls",
            "removeNulls",
            "urlDecode",
            "urlDecodeUni",
            "htmlEntityDecode",
            "base64Decode",
            "base64DecodeExt",
            "base64Encode",
            "sha1",
            "md5",
            "cssDecode",
            "jsDecode",
            "cmdLine",
            "removeComments",
            "utf8toUnicode",
            "length",
            "normalizePath",
            "normalizePathWin",
            "hexEncode",
            "hexDecode",
        ] {
            assert!(create_transformation(name).is_ok(), "missing {name}");
        }
    }

    #[test]
    fn test_unknown_name_rejected() {
        assert!(create_transformation("rot13").is_err());
    }

    #[test]
    fn test_length() {
        assert_eq!(Length.transform("hello"), "5");
        assert_eq!(Length.transform(""), "0");
    }
}
