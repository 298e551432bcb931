//! Rule target parsing: variables, key selectors, count and exclusion modes.

use crate::error::{Error, Result};

/// One target in a rule's variable list.
///
/// `&ARGS:foo` parses to count mode with a key selector; `!ARGS:password`
/// parses to an exclusion that removes pairs from the targets before it.
#[derive(Debug, Clone)]
pub struct TargetSpec {
    /// The variable kind.
    pub variable: Variable,
    /// Optional key selector.
    pub selector: Option<Selector>,
    /// Count mode (`&` prefix): emit the number of matching keys.
    pub count: bool,
    /// Exclusion mode (`!` prefix): remove what this target selects.
    pub exclude: bool,
}

/// Key selector for collection targets.
#[derive(Debug, Clone)]
pub enum Selector {
    /// Literal key (`ARGS:foo`), matched case-insensitively.
    Key(String),
    /// Regex over keys (`ARGS:/^user/`).
    Regex(String),
}

/// The closed set of variable kinds rules may reference.
///
/// Unknown names are a parse-time error; the resolver in
/// `variables::resolver` covers every kind, so adding a variant without a
/// resolution arm fails to compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variable {
    /// All arguments, GET and POST merged.
    Args,
    /// Query string arguments.
    ArgsGet,
    /// Body arguments.
    ArgsPost,
    /// Argument names, GET and POST.
    ArgsNames,
    /// Query string argument names.
    ArgsGetNames,
    /// Body argument names.
    ArgsPostNames,
    /// Combined byte size of all argument keys and values.
    ArgsCombinedSize,

    /// Request URI with query string.
    RequestUri,
    /// Request URI exactly as received.
    RequestUriRaw,
    /// Path portion of the URI.
    RequestFilename,
    /// Final path segment.
    RequestBasename,
    /// Full request line.
    RequestLine,
    /// HTTP method.
    RequestMethod,
    /// HTTP protocol version.
    RequestProtocol,
    /// Query string without the `?`.
    QueryString,
    /// Path info.
    PathInfo,

    /// Request headers.
    RequestHeaders,
    /// Request header names.
    RequestHeadersNames,
    /// Request cookies.
    RequestCookies,
    /// Request cookie names.
    RequestCookiesNames,

    /// Buffered request body.
    RequestBody,
    /// Request body length in bytes.
    RequestBodyLength,
    /// Selected body processor name.
    ReqbodyProcessor,
    /// Body processor soft-error flag.
    ReqbodyError,
    /// Body processor error description.
    ReqbodyErrorMsg,
    /// Request body truncation flag.
    InboundDataError,

    /// Uploaded files: field name to filename.
    Files,
    /// Uploaded file field names.
    FilesNames,
    /// Uploaded file sizes.
    FilesSizes,
    /// Uploaded file temporary names (unused).
    FilesTmpnames,
    /// Combined size of uploaded files.
    FilesCombinedSize,

    /// Multipart boundary was quoted.
    MultipartBoundaryQuoted,
    /// Data found after the final boundary.
    MultipartDataAfter,
    /// Folded part headers seen.
    MultipartHeaderFolding,
    /// A part could not be parsed.
    MultipartInvalidPart,
    /// Invalid quoting in a part header.
    MultipartInvalidQuoting,
    /// Any strict-parsing violation.
    MultipartStrictError,
    /// Boundary never matched in the body.
    MultipartUnmatchedBoundary,

    /// Text content extracted by the XML processor.
    Xml,

    /// Response status code.
    ResponseStatus,
    /// Response protocol version.
    ResponseProtocol,
    /// Response headers.
    ResponseHeaders,
    /// Response header names.
    ResponseHeadersNames,
    /// Buffered response body.
    ResponseBody,
    /// Response content type.
    ResponseContentType,
    /// Declared response content length.
    ResponseContentLength,
    /// Response body truncation flag.
    OutboundDataError,
    /// Response status line.
    StatusLine,

    /// Client address.
    RemoteAddr,
    /// Client port.
    RemotePort,
    /// Server address.
    ServerAddr,
    /// Server port.
    ServerPort,
    /// Server name from the Host header.
    ServerName,

    /// Per-transaction writable collection; TX:0-TX:9 hold captures.
    Tx,
    /// Persistent collection keyed by client address.
    Ip,
    /// Persistent collection bound by setsid.
    Session,
    /// Persistent collection bound by setuid.
    User,
    /// Persistent collection shared by all transactions.
    Global,
    /// Persistent collection keyed by request path.
    Resource,
    /// Variables exported by setenv.
    Env,
    /// Geo lookup results.
    Geo,

    /// Value of the most recent match.
    MatchedVar,
    /// Name of the most recent match.
    MatchedVarName,
    /// Values of all matches of the current rule.
    MatchedVars,
    /// Names of all matches of the current rule.
    MatchedVarsNames,

    /// Unique transaction id.
    UniqueId,
    /// Milliseconds since the transaction started.
    Duration,
    /// Most severe matched severity (255 when none).
    HighestSeverity,
    /// Request line, headers and body reassembled.
    FullRequest,
    /// Byte length of the full request.
    FullRequestLength,
}

impl Variable {
    /// Parse a variable name, case-insensitively.
    pub fn from_name(s: &str) -> Option<Self> {
        let upper = s.to_ascii_uppercase();
        let var = match upper.as_str() {
            "ARGS" => Self::Args,
            "ARGS_GET" => Self::ArgsGet,
            "ARGS_POST" => Self::ArgsPost,
            "ARGS_NAMES" => Self::ArgsNames,
            "ARGS_GET_NAMES" => Self::ArgsGetNames,
            "ARGS_POST_NAMES" => Self::ArgsPostNames,
            "ARGS_COMBINED_SIZE" => Self::ArgsCombinedSize,
            "REQUEST_URI" => Self::RequestUri,
            "REQUEST_URI_RAW" => Self::RequestUriRaw,
            "REQUEST_FILENAME" => Self::RequestFilename,
            "REQUEST_BASENAME" => Self::RequestBasename,
            "REQUEST_LINE" => Self::RequestLine,
            "REQUEST_METHOD" => Self::RequestMethod,
            "REQUEST_PROTOCOL" => Self::RequestProtocol,
            "QUERY_STRING" => Self::QueryString,
            "PATH_INFO" => Self::PathInfo,
            "REQUEST_HEADERS" => Self::RequestHeaders,
            "REQUEST_HEADERS_NAMES" => Self::RequestHeadersNames,
            "REQUEST_COOKIES" => Self::RequestCookies,
            "REQUEST_COOKIES_NAMES" => Self::RequestCookiesNames,
            "REQUEST_BODY" => Self::RequestBody,
            "REQUEST_BODY_LENGTH" => Self::RequestBodyLength,
            "REQBODY_PROCESSOR" => Self::ReqbodyProcessor,
            "REQBODY_ERROR" => Self::ReqbodyError,
            "REQBODY_ERROR_MSG" => Self::ReqbodyErrorMsg,
            "INBOUND_DATA_ERROR" => Self::InboundDataError,
            "FILES" => Self::Files,
            "FILES_NAMES" => Self::FilesNames,
            "FILES_SIZES" => Self::FilesSizes,
            "FILES_TMPNAMES" => Self::FilesTmpnames,
            "FILES_COMBINED_SIZE" => Self::FilesCombinedSize,
            "MULTIPART_BOUNDARY_QUOTED" => Self::MultipartBoundaryQuoted,
            "MULTIPART_DATA_AFTER" => Self::MultipartDataAfter,
            "MULTIPART_HEADER_FOLDING" => Self::MultipartHeaderFolding,
            "MULTIPART_INVALID_PART" => Self::MultipartInvalidPart,
            "MULTIPART_INVALID_QUOTING" => Self::MultipartInvalidQuoting,
            "MULTIPART_STRICT_ERROR" => Self::MultipartStrictError,
            "MULTIPART_UNMATCHED_BOUNDARY" => Self::MultipartUnmatchedBoundary,
            "XML" => Self::Xml,
            "RESPONSE_STATUS" => Self::ResponseStatus,
            "RESPONSE_PROTOCOL" => Self::ResponseProtocol,
            "RESPONSE_HEADERS" => Self::ResponseHeaders,
            "RESPONSE_HEADERS_NAMES" => Self::ResponseHeadersNames,
            "RESPONSE_BODY" => Self::ResponseBody,
            "RESPONSE_CONTENT_TYPE" => Self::ResponseContentType,
            "RESPONSE_CONTENT_LENGTH" => Self::ResponseContentLength,
            "OUTBOUND_DATA_ERROR" => Self::OutboundDataError,
            "STATUS_LINE" => Self::StatusLine,
            "REMOTE_ADDR" => Self::RemoteAddr,
            "REMOTE_PORT" => Self::RemotePort,
            "SERVER_ADDR" => Self::ServerAddr,
            "SERVER_PORT" => Self::ServerPort,
            "SERVER_NAME" => Self::ServerName,
            "TX" => Self::Tx,
            "IP" => Self::Ip,
            "SESSION" => Self::Session,
            "USER" => Self::User,
            "GLOBAL" => Self::Global,
            "RESOURCE" => Self::Resource,
            "ENV" => Self::Env,
            "GEO" => Self::Geo,
            "MATCHED_VAR" => Self::MatchedVar,
            "MATCHED_VAR_NAME" => Self::MatchedVarName,
            "MATCHED_VARS" => Self::MatchedVars,
            "MATCHED_VARS_NAMES" => Self::MatchedVarsNames,
            "UNIQUE_ID" => Self::UniqueId,
            "DURATION" => Self::Duration,
            "HIGHEST_SEVERITY" => Self::HighestSeverity,
            "FULL_REQUEST" => Self::FullRequest,
            "FULL_REQUEST_LENGTH" => Self::FullRequestLength,
            _ => return None,
        };
        Some(var)
    }

    /// Canonical upper-case name, as reported in matched-variable records.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Args => "ARGS",
            Self::ArgsGet => "ARGS_GET",
            Self::ArgsPost => "ARGS_POST",
            Self::ArgsNames => "ARGS_NAMES",
            Self::ArgsGetNames => "ARGS_GET_NAMES",
            Self::ArgsPostNames => "ARGS_POST_NAMES",
            Self::ArgsCombinedSize => "ARGS_COMBINED_SIZE",
            Self::RequestUri => "REQUEST_URI",
            Self::RequestUriRaw => "REQUEST_URI_RAW",
            Self::RequestFilename => "REQUEST_FILENAME",
            Self::RequestBasename => "REQUEST_BASENAME",
            Self::RequestLine => "REQUEST_LINE",
            Self::RequestMethod => "REQUEST_METHOD",
            Self::RequestProtocol => "REQUEST_PROTOCOL",
            Self::QueryString => "QUERY_STRING",
            Self::PathInfo => "PATH_INFO",
            Self::RequestHeaders => "REQUEST_HEADERS",
            Self::RequestHeadersNames => "REQUEST_HEADERS_NAMES",
            Self::RequestCookies => "REQUEST_COOKIES",
            Self::RequestCookiesNames => "REQUEST_COOKIES_NAMES",
            Self::RequestBody => "REQUEST_BODY",
            Self::RequestBodyLength => "REQUEST_BODY_LENGTH",
            Self::ReqbodyProcessor => "REQBODY_PROCESSOR",
            Self::ReqbodyError => "REQBODY_ERROR",
            Self::ReqbodyErrorMsg => "REQBODY_ERROR_MSG",
            Self::InboundDataError => "INBOUND_DATA_ERROR",
            Self::Files => "FILES",
            Self::FilesNames => "FILES_NAMES",
            Self::FilesSizes => "FILES_SIZES",
            Self::FilesTmpnames => "FILES_TMPNAMES",
            Self::FilesCombinedSize => "FILES_COMBINED_SIZE",
            Self::MultipartBoundaryQuoted => "MULTIPART_BOUNDARY_QUOTED",
            Self::MultipartDataAfter => "MULTIPART_DATA_AFTER",
            Self::MultipartHeaderFolding => "MULTIPART_HEADER_FOLDING",
            Self::MultipartInvalidPart => "MULTIPART_INVALID_PART",
            Self::MultipartInvalidQuoting => "MULTIPART_INVALID_QUOTING",
            Self::MultipartStrictError => "MULTIPART_STRICT_ERROR",
            Self::MultipartUnmatchedBoundary => "MULTIPART_UNMATCHED_BOUNDARY",
            Self::Xml => "XML",
            Self::ResponseStatus => "RESPONSE_STATUS",
            Self::ResponseProtocol => "RESPONSE_PROTOCOL",
            Self::ResponseHeaders => "RESPONSE_HEADERS",
            Self::ResponseHeadersNames => "RESPONSE_HEADERS_NAMES",
            Self::ResponseBody => "RESPONSE_BODY",
            Self::ResponseContentType => "RESPONSE_CONTENT_TYPE",
            Self::ResponseContentLength => "RESPONSE_CONTENT_LENGTH",
            Self::OutboundDataError => "OUTBOUND_DATA_ERROR",
            Self::StatusLine => "STATUS_LINE",
            Self::RemoteAddr => "REMOTE_ADDR",
            Self::RemotePort => "REMOTE_PORT",
            Self::ServerAddr => "SERVER_ADDR",
            Self::ServerPort => "SERVER_PORT",
            Self::ServerName => "SERVER_NAME",
            Self::Tx => "TX",
            Self::Ip => "IP",
            Self::Session => "SESSION",
            Self::User => "USER",
            Self::Global => "GLOBAL",
            Self::Resource => "RESOURCE",
            Self::Env => "ENV",
            Self::Geo => "GEO",
            Self::MatchedVar => "MATCHED_VAR",
            Self::MatchedVarName => "MATCHED_VAR_NAME",
            Self::MatchedVars => "MATCHED_VARS",
            Self::MatchedVarsNames => "MATCHED_VARS_NAMES",
            Self::UniqueId => "UNIQUE_ID",
            Self::Duration => "DURATION",
            Self::HighestSeverity => "HIGHEST_SEVERITY",
            Self::FullRequest => "FULL_REQUEST",
            Self::FullRequestLength => "FULL_REQUEST_LENGTH",
        }
    }
}

/// Parse a `|`-separated target list.
pub fn parse_targets(input: &str) -> Result<Vec<TargetSpec>> {
    let mut targets = Vec::new();

    for part in input.split('|') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        targets.push(parse_single_target(part)?);
    }

    Ok(targets)
}

fn parse_single_target(input: &str) -> Result<TargetSpec> {
    let (exclude, rest) = match input.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, input),
    };
    let (count, rest) = match rest.strip_prefix('&') {
        Some(rest) => (true, rest),
        None => (false, rest),
    };

    let (name_str, selector) = if let Some(pos) = rest.find(':') {
        let sel_str = &rest[pos + 1..];
        let selector = if sel_str.len() >= 2 && sel_str.starts_with('/') && sel_str.ends_with('/') {
            Selector::Regex(sel_str[1..sel_str.len() - 1].to_string())
        } else {
            Selector::Key(sel_str.to_string())
        };
        (&rest[..pos], Some(selector))
    } else {
        (rest, None)
    };

    let variable = Variable::from_name(name_str).ok_or_else(|| Error::UnknownVariable {
        name: name_str.to_string(),
    })?;

    Ok(TargetSpec {
        variable,
        selector,
        count,
        exclude,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_variable() {
        let targets = parse_targets("REQUEST_URI").unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].variable, Variable::RequestUri);
        assert!(targets[0].selector.is_none());
        assert!(!targets[0].count);
        assert!(!targets[0].exclude);
    }

    #[test]
    fn test_parse_key_selector() {
        let targets = parse_targets("ARGS:username").unwrap();
        assert!(matches!(&targets[0].selector, Some(Selector::Key(k)) if k == "username"));
    }

    #[test]
    fn test_parse_regex_selector() {
        let targets = parse_targets("ARGS:/^user/").unwrap();
        assert!(matches!(&targets[0].selector, Some(Selector::Regex(r)) if r == "^user"));
    }

    #[test]
    fn test_parse_count_and_exclusion() {
        let targets = parse_targets("&ARGS|!ARGS:password").unwrap();
        assert!(targets[0].count);
        assert!(targets[1].exclude);
        assert!(matches!(&targets[1].selector, Some(Selector::Key(k)) if k == "password"));
    }

    #[test]
    fn test_unknown_variable_is_parse_error() {
        assert!(matches!(
            parse_targets("NO_SUCH_VAR"),
            Err(Error::UnknownVariable { .. })
        ));
    }

    #[test]
    fn test_every_name_round_trips() {
        for name in [
            "ARGS",
            "REQUEST_HEADERS",
            "REQBODY_PROCESSOR",
            "MULTIPART_STRICT_ERROR",
            "MATCHED_VARS_NAMES",
            "FILES_COMBINED_SIZE",
        ] {
            let var = Variable::from_name(name).unwrap();
            assert_eq!(var.name(), name);
        }
    }
}
