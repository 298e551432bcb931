//! Per-kind variable resolution.
//!
//! Every [`Variable`] maps to a pure resolver over the transaction. The
//! closed enum plus the exhaustive match below means a new variable kind
//! without a resolution arm is a compile error, not a runtime surprise.

use super::collection::Collection;
use crate::engine::Transaction;
use crate::error::{Error, Result};
use crate::parser::{Selector, TargetSpec, Variable};
use regex::Regex;

/// A target with its key selector compiled.
#[derive(Debug, Clone)]
pub struct CompiledTarget {
    /// The variable kind.
    pub variable: Variable,
    /// Compiled key selector.
    pub selector: Option<CompiledSelector>,
    /// Count mode.
    pub count: bool,
    /// Exclusion mode.
    pub exclude: bool,
}

/// A compiled key selector.
#[derive(Debug, Clone)]
pub enum CompiledSelector {
    /// Literal key, matched case-insensitively.
    Key(String),
    /// Regex over keys.
    Regex(Regex),
}

/// Compile a parsed target, validating regex selectors up front.
pub fn compile_target(spec: &TargetSpec) -> Result<CompiledTarget> {
    let selector = match &spec.selector {
        Some(Selector::Key(k)) => Some(CompiledSelector::Key(k.clone())),
        Some(Selector::Regex(pattern)) => {
            let regex = Regex::new(&format!("(?i){pattern}")).map_err(|e| Error::RegexCompile {
                pattern: pattern.clone(),
                source: e,
            })?;
            Some(CompiledSelector::Regex(regex))
        }
        None => None,
    };
    Ok(CompiledTarget {
        variable: spec.variable,
        selector,
        count: spec.count,
        exclude: spec.exclude,
    })
}

/// Resolve a target to `(key, value)` pairs in emission order.
///
/// Count targets emit exactly one pair whose value is the number of
/// matching keys as a decimal string.
pub fn resolve_target(tx: &Transaction, target: &CompiledTarget) -> Vec<(String, String)> {
    if target.count {
        let count = count_matches(tx, target);
        let key = match &target.selector {
            Some(CompiledSelector::Key(k)) => k.clone(),
            _ => String::new(),
        };
        return vec![(key, count.to_string())];
    }
    emit_pairs(tx, target)
}

/// First value of a variable, for macro expansion.
pub fn first_value(tx: &Transaction, variable: Variable, key: Option<&str>) -> Option<String> {
    let target = CompiledTarget {
        variable,
        selector: key.map(|k| CompiledSelector::Key(k.to_string())),
        count: false,
        exclude: false,
    };
    emit_pairs(tx, &target).into_iter().next().map(|(_, v)| v)
}

fn count_matches(tx: &Transaction, target: &CompiledTarget) -> usize {
    match kind_of(tx, target.variable) {
        Resolution::Scalar(v) => match &target.selector {
            None => usize::from(v.is_some()),
            Some(_) => 0,
        },
        Resolution::Multi(pairs) => distinct_keys(&filter_pairs(pairs, &target.selector)),
        Resolution::Merged(collections) => {
            let mut pairs = Vec::new();
            for c in collections {
                pairs.extend(collection_pairs(c, &target.selector));
            }
            distinct_keys(&pairs)
        }
    }
}

fn emit_pairs(tx: &Transaction, target: &CompiledTarget) -> Vec<(String, String)> {
    match kind_of(tx, target.variable) {
        Resolution::Scalar(v) => match (&target.selector, v) {
            (None, Some(value)) => vec![(String::new(), value)],
            _ => Vec::new(),
        },
        Resolution::Multi(pairs) => filter_pairs(pairs, &target.selector),
        Resolution::Merged(collections) => {
            let mut out = Vec::new();
            for c in collections {
                out.extend(collection_pairs(c, &target.selector));
            }
            out
        }
    }
}

fn distinct_keys(pairs: &[(String, String)]) -> usize {
    let mut keys: Vec<String> = pairs.iter().map(|(k, _)| k.to_ascii_lowercase()).collect();
    keys.sort();
    keys.dedup();
    keys.len()
}

fn filter_pairs(
    pairs: Vec<(String, String)>,
    selector: &Option<CompiledSelector>,
) -> Vec<(String, String)> {
    match selector {
        None => pairs,
        Some(CompiledSelector::Key(key)) => pairs
            .into_iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(key))
            .collect(),
        Some(CompiledSelector::Regex(re)) => pairs
            .into_iter()
            .filter(|(k, _)| re.is_match(k))
            .collect(),
    }
}

fn collection_pairs(
    collection: &Collection,
    selector: &Option<CompiledSelector>,
) -> Vec<(String, String)> {
    match selector {
        None => collection
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        Some(CompiledSelector::Key(key)) => collection
            .get(key)
            .map(|values| {
                values
                    .into_iter()
                    .map(|v| (key.clone(), v.to_string()))
                    .collect()
            })
            .unwrap_or_default(),
        Some(CompiledSelector::Regex(re)) => collection
            .iter_regex(re)
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    }
}

fn keys_as_pairs(collection: &Collection) -> Vec<(String, String)> {
    collection
        .keys()
        .map(|k| (k.to_string(), k.to_string()))
        .collect()
}

/// How one variable kind resolves.
enum Resolution<'a> {
    /// A single optional value (empty-key slot).
    Scalar(Option<String>),
    /// Owned (key, value) pairs.
    Multi(Vec<(String, String)>),
    /// One or more live collections, filtered lazily.
    Merged(Vec<&'a Collection>),
}

fn kind_of(tx: &Transaction, variable: Variable) -> Resolution<'_> {
    use Resolution::{Merged, Multi, Scalar};

    let req = tx.request();
    let resp = tx.response();

    let flag = |b: bool| {
        if b {
            Scalar(Some("1".to_string()))
        } else {
            Scalar(None)
        }
    };

    match variable {
        Variable::Args => Merged(vec![&req.args_get, &req.args_post]),
        Variable::ArgsGet => Merged(vec![&req.args_get]),
        Variable::ArgsPost => Merged(vec![&req.args_post]),
        Variable::ArgsNames => {
            let mut pairs = keys_as_pairs(&req.args_get);
            pairs.extend(keys_as_pairs(&req.args_post));
            Multi(pairs)
        }
        Variable::ArgsGetNames => Multi(keys_as_pairs(&req.args_get)),
        Variable::ArgsPostNames => Multi(keys_as_pairs(&req.args_post)),
        Variable::ArgsCombinedSize => Scalar(Some(
            (req.args_get.combined_size() + req.args_post.combined_size()).to_string(),
        )),

        Variable::RequestUri => Scalar(Some(req.uri.clone())),
        Variable::RequestUriRaw => Scalar(Some(req.uri_raw.clone())),
        Variable::RequestFilename => Scalar(Some(req.path.clone())),
        Variable::RequestBasename => Scalar(Some(req.basename().to_string())),
        Variable::RequestLine => Scalar(Some(req.request_line())),
        Variable::RequestMethod => Scalar(Some(req.method.clone())),
        Variable::RequestProtocol => Scalar(Some(req.protocol.clone())),
        Variable::QueryString => Scalar(Some(req.query_string.clone())),
        Variable::PathInfo => Scalar(Some(req.path_info.clone())),

        Variable::RequestHeaders => Merged(vec![&req.headers]),
        Variable::RequestHeadersNames => Multi(keys_as_pairs(&req.headers)),
        Variable::RequestCookies => Merged(vec![&req.cookies]),
        Variable::RequestCookiesNames => Multi(keys_as_pairs(&req.cookies)),

        Variable::RequestBody => Scalar(Some(req.body.clone())),
        Variable::RequestBodyLength => Scalar(Some(req.body.len().to_string())),
        Variable::ReqbodyProcessor => Scalar(Some(req.body_processor.name().to_string())),
        Variable::ReqbodyError => flag(req.reqbody_error),
        Variable::ReqbodyErrorMsg => {
            Scalar((!req.reqbody_error_msg.is_empty()).then(|| req.reqbody_error_msg.clone()))
        }
        Variable::InboundDataError => flag(req.inbound_data_error),

        Variable::Files => Merged(vec![&req.files]),
        Variable::FilesNames => Multi(keys_as_pairs(&req.files)),
        Variable::FilesSizes => Merged(vec![&req.files_sizes]),
        Variable::FilesTmpnames => Multi(Vec::new()),
        Variable::FilesCombinedSize => Scalar(Some(
            req.files_sizes
                .iter()
                .filter_map(|(_, v)| v.parse::<u64>().ok())
                .sum::<u64>()
                .to_string(),
        )),

        Variable::MultipartBoundaryQuoted => flag(req.multipart.boundary_quoted),
        Variable::MultipartDataAfter => flag(req.multipart.data_after),
        Variable::MultipartHeaderFolding => flag(req.multipart.header_folding),
        Variable::MultipartInvalidPart => flag(req.multipart.invalid_part),
        Variable::MultipartInvalidQuoting => flag(req.multipart.invalid_quoting),
        Variable::MultipartStrictError => flag(req.multipart.strict_error),
        Variable::MultipartUnmatchedBoundary => flag(req.multipart.unmatched_boundary),

        Variable::Xml => Multi(
            req.xml_values
                .iter()
                .map(|v| ("xml".to_string(), v.clone()))
                .collect(),
        ),

        Variable::ResponseStatus => {
            Scalar((resp.status != 0).then(|| resp.status.to_string()))
        }
        Variable::ResponseProtocol => Scalar(Some(resp.protocol.clone())),
        Variable::ResponseHeaders => Merged(vec![&resp.headers]),
        Variable::ResponseHeadersNames => Multi(keys_as_pairs(&resp.headers)),
        Variable::ResponseBody => Scalar(Some(resp.body.clone())),
        Variable::ResponseContentType => Scalar(Some(resp.content_type.clone())),
        Variable::ResponseContentLength => {
            Scalar(resp.content_length.map(|l| l.to_string()))
        }
        Variable::OutboundDataError => flag(resp.outbound_data_error),
        Variable::StatusLine => Scalar((resp.status != 0).then(|| resp.status_line())),

        Variable::RemoteAddr => Scalar(Some(req.client_ip.clone())),
        Variable::RemotePort => Scalar(Some(req.client_port.to_string())),
        Variable::ServerAddr => Scalar(Some(req.server_ip.clone())),
        Variable::ServerPort => Scalar(Some(req.server_port.to_string())),
        Variable::ServerName => Scalar(Some(req.server_name.clone())),

        Variable::Tx => Merged(vec![tx.tx_data()]),
        Variable::Ip => Multi(tx.persistent_all("ip")),
        Variable::Session => Multi(tx.persistent_all("session")),
        Variable::User => Multi(tx.persistent_all("user")),
        Variable::Global => Multi(tx.persistent_all("global")),
        Variable::Resource => Multi(tx.persistent_all("resource")),
        Variable::Geo => Merged(vec![tx.geo_data()]),

        // ENV holds only what setenv wrote; the process environment is
        // never dumped into rules.
        Variable::Env => Merged(vec![tx.env_data()]),

        Variable::MatchedVar => Scalar(tx.matched_var().map(|(_, v)| v.clone())),
        Variable::MatchedVarName => Scalar(tx.matched_var().map(|(n, _)| n.clone())),
        Variable::MatchedVars => Multi(tx.matched_vars().to_vec()),
        Variable::MatchedVarsNames => Multi(
            tx.matched_vars()
                .iter()
                .map(|(n, _)| (n.clone(), n.clone()))
                .collect(),
        ),

        Variable::UniqueId => Scalar(Some(tx.id().to_string())),
        Variable::Duration => Scalar(Some(tx.duration_millis().to_string())),
        Variable::HighestSeverity => Scalar(Some(tx.highest_severity().to_string())),
        Variable::FullRequest => Scalar(Some(full_request(tx))),
        Variable::FullRequestLength => Scalar(Some(full_request(tx).len().to_string())),
    }
}

fn full_request(tx: &Transaction) -> String {
    let req = tx.request();
    let mut out = req.request_line();
    out.push_str("\r\n");
    for (name, value) in req.headers.iter() {
        out.push_str(name);
        out.push_str(": ");
        out.push_str(value);
        out.push_str("\r\n");
    }
    out.push_str("\r\n");
    out.push_str(&req.body);
    out
}
