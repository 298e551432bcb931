//! Response-side data.

use super::collection::Collection;

/// Response data populated by the lifecycle entry points.
#[derive(Debug, Clone, Default)]
pub struct ResponseData {
    /// HTTP status code.
    pub status: u16,
    /// HTTP protocol version string.
    pub protocol: String,
    /// Response headers.
    pub headers: Collection,
    /// Content type header value.
    pub content_type: String,
    /// Declared Content-Length, if any.
    pub content_length: Option<u64>,
    /// Response body (up to the configured limit), lossily decoded.
    pub body: String,
    /// Response body hit the configured limit.
    pub outbound_data_error: bool,
}

impl ResponseData {
    /// Create empty response data.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the status line.
    pub fn set_status(&mut self, status: u16, protocol: &str) {
        self.status = status;
        self.protocol = protocol.to_string();
    }

    /// Record a response header.
    pub fn add_header(&mut self, name: &str, value: &str) {
        self.headers.add(name, value);

        if name.eq_ignore_ascii_case("content-type") {
            self.content_type = value.to_string();
        } else if name.eq_ignore_ascii_case("content-length") {
            self.content_length = value.trim().parse().ok();
        }
    }

    /// The status line, e.g. `HTTP/1.1 403`.
    pub fn status_line(&self) -> String {
        format!("{} {}", self.protocol, self.status)
    }

    /// The bare MIME type, parameters stripped.
    pub fn mime_type(&self) -> String {
        self.content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_and_headers() {
        let mut resp = ResponseData::new();
        resp.set_status(200, "HTTP/1.1");
        resp.add_header("Content-Type", "text/html; charset=utf-8");
        resp.add_header("Content-Length", "1234");

        assert_eq!(resp.status_line(), "HTTP/1.1 200");
        assert_eq!(resp.mime_type(), "text/html");
        assert_eq!(resp.content_length, Some(1234));
        assert_eq!(resp.headers.first("content-type"), Some("text/html; charset=utf-8"));
    }
}
