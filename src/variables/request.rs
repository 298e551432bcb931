//! Request-side data and body processors.

use super::collection::Collection;
use percent_encoding::percent_decode_str;

/// Which parser consumes the request body in phase 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyProcessor {
    /// application/x-www-form-urlencoded
    Urlencoded,
    /// multipart/form-data
    Multipart,
    /// application/json
    Json,
    /// text/xml, application/xml
    Xml,
    /// Anything else: the body is exposed raw, nothing is extracted.
    #[default]
    Raw,
}

impl BodyProcessor {
    /// Select a processor from a Content-Type header value.
    pub fn from_content_type(content_type: &str) -> Self {
        let ct = content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        match ct.as_str() {
            "application/x-www-form-urlencoded" => Self::Urlencoded,
            "multipart/form-data" => Self::Multipart,
            "application/json" => Self::Json,
            "text/xml" | "application/xml" | "application/soap+xml" => Self::Xml,
            _ => Self::Raw,
        }
    }

    /// Parse an explicit processor name (`ctl:requestBodyProcessor=`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "URLENCODED" => Some(Self::Urlencoded),
            "MULTIPART" => Some(Self::Multipart),
            "JSON" => Some(Self::Json),
            "XML" => Some(Self::Xml),
            _ => None,
        }
    }

    /// Name as exposed through REQBODY_PROCESSOR.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Urlencoded => "URLENCODED",
            Self::Multipart => "MULTIPART",
            Self::Json => "JSON",
            Self::Xml => "XML",
            Self::Raw => "",
        }
    }
}

/// Multipart parser observations, exposed as MULTIPART_* flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct MultipartFlags {
    /// The boundary parameter was quoted.
    pub boundary_quoted: bool,
    /// Content found after the terminating boundary.
    pub data_after: bool,
    /// A part header was folded across lines.
    pub header_folding: bool,
    /// A part without a usable Content-Disposition.
    pub invalid_part: bool,
    /// Badly quoted disposition parameter.
    pub invalid_quoting: bool,
    /// The terminating boundary never arrived.
    pub strict_error: bool,
    /// The declared boundary never matched.
    pub unmatched_boundary: bool,
}

/// Request data populated by the lifecycle entry points.
#[derive(Debug, Clone, Default)]
pub struct RequestData {
    /// HTTP method.
    pub method: String,
    /// Request URI with query string.
    pub uri: String,
    /// URI exactly as received.
    pub uri_raw: String,
    /// Path portion of the URI.
    pub path: String,
    /// Path info (the path, absent any server-side script mapping).
    pub path_info: String,
    /// Query string without the leading `?`.
    pub query_string: String,
    /// HTTP protocol version string.
    pub protocol: String,
    /// Request headers.
    pub headers: Collection,
    /// Request cookies.
    pub cookies: Collection,
    /// GET arguments.
    pub args_get: Collection,
    /// POST arguments.
    pub args_post: Collection,
    /// Uploaded files: name -> filename.
    pub files: Collection,
    /// Uploaded file sizes: name -> size.
    pub files_sizes: Collection,
    /// Request body (up to the configured limit), lossily decoded.
    pub body: String,
    /// Content-Type boundary, captured for multipart parsing.
    pub content_type: String,
    /// Declared Content-Length, if any.
    pub content_length: Option<u64>,
    /// Selected body processor.
    pub body_processor: BodyProcessor,
    /// XML text content extracted by the XML processor.
    pub xml_values: Vec<String>,
    /// Soft error raised by the body processor.
    pub reqbody_error: bool,
    /// Description of the body processor error.
    pub reqbody_error_msg: String,
    /// Request body hit the configured limit.
    pub inbound_data_error: bool,
    /// Multipart parser observations.
    pub multipart: MultipartFlags,
    /// Client address.
    pub client_ip: String,
    /// Client port.
    pub client_port: u16,
    /// Server address.
    pub server_ip: String,
    /// Server port.
    pub server_port: u16,
    /// Server name from the Host header.
    pub server_name: String,
}

impl RequestData {
    /// Create empty request data.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the request line and split out query arguments.
    pub fn set_uri(&mut self, uri: &str, method: &str, protocol: &str) {
        self.uri = uri.to_string();
        self.uri_raw = uri.to_string();
        self.method = method.to_string();
        self.protocol = protocol.to_string();

        match uri.split_once('?') {
            Some((path, query)) => {
                self.path = path.to_string();
                self.query_string = query.to_string();
            }
            None => {
                self.path = uri.to_string();
                self.query_string.clear();
            }
        }
        self.path_info = self.path.clone();

        let query = self.query_string.clone();
        parse_urlencoded(&query, &mut self.args_get);
    }

    /// Record a request header, recognizing the ones the engine consumes.
    pub fn add_header(&mut self, name: &str, value: &str) {
        self.headers.add(name, value);

        if name.eq_ignore_ascii_case("content-type") {
            self.content_type = value.to_string();
            self.body_processor = BodyProcessor::from_content_type(value);
        } else if name.eq_ignore_ascii_case("content-length") {
            self.content_length = value.trim().parse().ok();
        } else if name.eq_ignore_ascii_case("cookie") {
            for pair in value.split(';') {
                match pair.split_once('=') {
                    Some((k, v)) => self.cookies.add(k.trim(), v.trim()),
                    None if !pair.trim().is_empty() => self.cookies.add(pair.trim(), ""),
                    None => {}
                }
            }
        } else if name.eq_ignore_ascii_case("host") {
            self.server_name = value.split(':').next().unwrap_or("").to_string();
        }
    }

    /// Run the selected body processor over the buffered body.
    pub fn process_body(&mut self, raw: &[u8]) {
        self.body = String::from_utf8_lossy(raw).into_owned();

        match self.body_processor {
            BodyProcessor::Urlencoded => {
                let body = self.body.clone();
                parse_urlencoded(&body, &mut self.args_post);
            }
            BodyProcessor::Multipart => self.process_multipart(raw),
            BodyProcessor::Json => self.process_json(),
            BodyProcessor::Xml => self.process_xml(),
            BodyProcessor::Raw => {}
        }
    }

    /// The request line, e.g. `GET /index.html HTTP/1.1`.
    pub fn request_line(&self) -> String {
        format!("{} {} {}", self.method, self.uri, self.protocol)
    }

    /// Final path segment of the request filename.
    pub fn basename(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or("")
    }

    /// Distinct argument keys across GET and POST.
    pub fn args_key_count(&self) -> usize {
        let mut keys: std::collections::HashSet<String> = std::collections::HashSet::new();
        for k in self.args_get.keys().chain(self.args_post.keys()) {
            keys.insert(k.to_ascii_lowercase());
        }
        keys.len()
    }

    fn process_json(&mut self) {
        match serde_json::from_str::<serde_json::Value>(&self.body) {
            Ok(value) => flatten_json("json", &value, &mut self.args_post),
            Err(e) => {
                self.reqbody_error = true;
                self.reqbody_error_msg = format!("JSON parsing error: {e}");
            }
        }
    }

    /// Minimal XML handling: captures text content and checks tag balance.
    /// Structural problems raise REQBODY_ERROR rather than failing phase 2.
    fn process_xml(&mut self) {
        let mut depth: i32 = 0;
        let mut text = String::new();
        let mut rest = self.body.as_str();

        loop {
            match rest.find('<') {
                Some(open) => {
                    let fragment = rest[..open].trim();
                    if !fragment.is_empty() {
                        text.push_str(fragment);
                        text.push(' ');
                    }
                    let Some(close) = rest[open..].find('>') else {
                        self.reqbody_error = true;
                        self.reqbody_error_msg = "XML parsing error: unclosed tag".to_string();
                        return;
                    };
                    let tag = &rest[open + 1..open + close];
                    if tag.starts_with('/') {
                        depth -= 1;
                    } else if !tag.ends_with('/') && !tag.starts_with('?') && !tag.starts_with('!')
                    {
                        depth += 1;
                    }
                    rest = &rest[open + close + 1..];
                }
                None => {
                    let fragment = rest.trim();
                    if !fragment.is_empty() {
                        text.push_str(fragment);
                    }
                    break;
                }
            }
        }

        if depth != 0 {
            self.reqbody_error = true;
            self.reqbody_error_msg = "XML parsing error: unbalanced tags".to_string();
        }
        let text = text.trim().to_string();
        if !text.is_empty() {
            self.xml_values.push(text);
        }
    }

    fn process_multipart(&mut self, raw: &[u8]) {
        let Some(boundary) = multipart_boundary(&self.content_type, &mut self.multipart) else {
            self.reqbody_error = true;
            self.reqbody_error_msg = "multipart boundary missing".to_string();
            return;
        };

        let body = String::from_utf8_lossy(raw);
        let delimiter = format!("--{boundary}");

        let Some(first) = body.find(&delimiter) else {
            self.multipart.unmatched_boundary = true;
            self.reqbody_error = true;
            self.reqbody_error_msg = "multipart boundary not found in body".to_string();
            return;
        };

        let mut saw_terminator = false;
        let mut rest = &body[first + delimiter.len()..];

        loop {
            if let Some(after) = rest.strip_prefix("--") {
                saw_terminator = true;
                if !after.trim().is_empty() {
                    self.multipart.data_after = true;
                }
                break;
            }
            rest = rest.trim_start_matches(['\r', '\n']);

            let Some(end) = rest.find(&delimiter) else {
                self.multipart.unmatched_boundary = true;
                break;
            };
            let part = &rest[..end];
            rest = &rest[end + delimiter.len()..];

            self.parse_multipart_part(part);
        }

        if !saw_terminator {
            self.multipart.strict_error = true;
        }
    }

    fn parse_multipart_part(&mut self, part: &str) {
        let (head, data) = match part.split_once("\r\n\r\n").or_else(|| part.split_once("\n\n")) {
            Some(split) => split,
            None => {
                self.multipart.invalid_part = true;
                return;
            }
        };

        if head.lines().any(|l| l.starts_with(' ') || l.starts_with('\t')) {
            self.multipart.header_folding = true;
        }

        let mut field_name = None;
        let mut file_name = None;
        for line in head.lines() {
            let Some((header, value)) = line.split_once(':') else {
                continue;
            };
            if !header.eq_ignore_ascii_case("content-disposition") {
                continue;
            }
            for param in value.split(';') {
                let Some((k, v)) = param.split_once('=') else {
                    continue;
                };
                let v = v.trim();
                let quoted = v.starts_with('"') && v.ends_with('"') && v.len() >= 2;
                if !quoted && v.contains('"') {
                    self.multipart.invalid_quoting = true;
                }
                let v = if quoted { &v[1..v.len() - 1] } else { v };
                match k.trim().to_ascii_lowercase().as_str() {
                    "name" => field_name = Some(v.to_string()),
                    "filename" => file_name = Some(v.to_string()),
                    _ => {}
                }
            }
        }

        let data = data.trim_end_matches(['\r', '\n']);
        match (field_name, file_name) {
            (Some(name), Some(filename)) => {
                self.files.add(name.clone(), filename);
                self.files_sizes.add(name, data.len().to_string());
            }
            (Some(name), None) => {
                self.args_post.add(name, data);
            }
            (None, _) => {
                self.multipart.invalid_part = true;
            }
        }
    }
}

/// Parse `k=v&k2=v2` pairs with percent-decoding; `+` means space.
fn parse_urlencoded(input: &str, into: &mut Collection) {
    for pair in input.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = match pair.split_once('=') {
            Some((k, v)) => (k, v),
            None => (pair, ""),
        };
        into.add(url_decode(key), url_decode(value));
    }
}

fn url_decode(s: &str) -> String {
    let plus_decoded = s.replace('+', " ");
    percent_decode_str(&plus_decoded)
        .decode_utf8_lossy()
        .into_owned()
}

/// Extract the boundary parameter from a multipart Content-Type.
fn multipart_boundary(content_type: &str, flags: &mut MultipartFlags) -> Option<String> {
    for param in content_type.split(';').skip(1) {
        let Some((k, v)) = param.split_once('=') else {
            continue;
        };
        if !k.trim().eq_ignore_ascii_case("boundary") {
            continue;
        }
        let v = v.trim();
        if v.starts_with('"') && v.ends_with('"') && v.len() >= 2 {
            flags.boundary_quoted = true;
            return Some(v[1..v.len() - 1].to_string());
        }
        return Some(v.to_string());
    }
    None
}


/// Flatten a JSON document into dotted argument keys.
fn flatten_json(prefix: &str, value: &serde_json::Value, into: &mut Collection) {
    use serde_json::Value;
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                flatten_json(&format!("{prefix}.{k}"), v, into);
            }
        }
        Value::Array(items) => {
            for (i, v) in items.iter().enumerate() {
                flatten_json(&format!("{prefix}.{i}"), v, into);
            }
        }
        Value::String(s) => into.add(prefix, s.clone()),
        Value::Number(n) => into.add(prefix, n.to_string()),
        Value::Bool(b) => into.add(prefix, b.to_string()),
        Value::Null => into.add(prefix, ""),
    }
}
