//! Engine configuration, assembled from configuration directives and
//! validated before the WAF starts.

use crate::error::{Error, Result};
use crate::parser::AuditMode;

const GIB: u64 = 1 << 30;

/// Immutable per-WAF configuration snapshot.
///
/// Transactions hold this snapshot for their whole life; reconfiguration
/// means building a fresh WAF and swapping it atomically.
#[derive(Debug, Clone)]
pub struct WafConfig {
    /// Whether phase 2 may read the request body.
    pub request_body_access: bool,
    /// Total request body bytes retained.
    pub request_body_limit: u64,
    /// Request body bytes held in memory; the rest spills to disk.
    pub request_body_in_memory_limit: u64,
    /// Whether phase 4 may read the response body.
    pub response_body_access: bool,
    /// Total response body bytes retained.
    pub response_body_limit: u64,
    /// Response MIME types inspected in phase 4.
    pub response_body_mime_types: Vec<String>,
    /// Audit engine mode.
    pub audit_mode: AuditMode,
    /// Audit record parts (A..K, Z).
    pub audit_parts: String,
    /// Audit log path ("" keeps the discard writer).
    pub audit_log_path: String,
    /// Debug log path ("", /dev/stdout, /dev/stderr, or a file).
    pub debug_log_path: String,
}

impl Default for WafConfig {
    fn default() -> Self {
        Self {
            request_body_access: false,
            request_body_limit: 13_107_200,
            request_body_in_memory_limit: 131_072,
            response_body_access: false,
            response_body_limit: 524_288,
            response_body_mime_types: vec![
                "text/html".to_string(),
                "text/plain".to_string(),
                "application/json".to_string(),
                "application/xml".to_string(),
            ],
            audit_mode: AuditMode::Off,
            audit_parts: "ABIJDEFHZ".to_string(),
            audit_log_path: String::new(),
            debug_log_path: String::new(),
        }
    }
}

impl WafConfig {
    /// Validate limit and audit-part invariants.
    pub fn validate(&self) -> Result<()> {
        validate_limit("SecRequestBodyLimit", self.request_body_limit)?;
        validate_limit(
            "SecRequestBodyInMemoryLimit",
            self.request_body_in_memory_limit,
        )?;
        validate_limit("SecResponseBodyLimit", self.response_body_limit)?;

        if self.request_body_in_memory_limit > self.request_body_limit {
            return Err(Error::config(format!(
                "SecRequestBodyInMemoryLimit ({}) exceeds SecRequestBodyLimit ({})",
                self.request_body_in_memory_limit, self.request_body_limit
            )));
        }

        for c in self.audit_parts.chars() {
            if !matches!(c, 'A'..='K' | 'Z') {
                return Err(Error::config(format!("invalid audit log part '{c}'")));
            }
        }

        Ok(())
    }

    /// Whether a response MIME type is on the inspection allow-list.
    pub fn inspects_response_mime(&self, mime: &str) -> bool {
        self.response_body_mime_types
            .iter()
            .any(|m| m.eq_ignore_ascii_case(mime))
    }
}

fn validate_limit(name: &str, value: u64) -> Result<()> {
    if value == 0 {
        return Err(Error::config(format!("{name} must be positive")));
    }
    if value > GIB {
        return Err(Error::config(format!("{name} exceeds 1 GiB")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(WafConfig::default().validate().is_ok());
    }

    #[test]
    fn test_limit_invariants() {
        let mut config = WafConfig {
            request_body_limit: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.request_body_limit = 2 * GIB;
        assert!(config.validate().is_err());

        config.request_body_limit = 1024;
        config.request_body_in_memory_limit = 2048;
        assert!(config.validate().is_err());

        config.request_body_in_memory_limit = 512;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_audit_parts_validation() {
        let config = WafConfig {
            audit_parts: "ABQZ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_mime_allow_list() {
        let config = WafConfig::default();
        assert!(config.inspects_response_mime("text/html"));
        assert!(config.inspects_response_mime("TEXT/HTML"));
        assert!(!config.inspects_response_mime("image/png"));
    }
}
