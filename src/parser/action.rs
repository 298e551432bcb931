//! Action parsing for SecRule and SecAction.
//!
//! Every action carries an explicit kind (metadata, non-disruptive,
//! disruptive, flow, data) so the engine can partition them at compile time
//! and apply them in the required order without inspecting names again.

use crate::error::{Error, Result};

/// An action in a rule's action list.
#[derive(Debug, Clone)]
pub enum Action {
    /// Static rule description; no runtime effect.
    Metadata(MetadataAction),
    /// Mutates the transaction or rule flags; never interrupts.
    NonDisruptive(NonDisruptiveAction),
    /// Ends transaction processing with an interruption.
    Disruptive(DisruptiveAction),
    /// Adjusts the scheduler (chain, skip, skipAfter).
    Flow(FlowAction),
    /// Carries operands for disruptive actions.
    Data(DataAction),
    /// Transformation step (`t:name`); order-significant.
    Transformation(String),
}

/// Metadata actions, stored on the rule at compile time.
#[derive(Debug, Clone)]
pub enum MetadataAction {
    /// Rule ID.
    Id(u64),
    /// Processing phase.
    Phase(u8),
    /// Message template (may contain macros).
    Msg(String),
    /// Log data template (may contain macros).
    LogData(String),
    /// Severity level (0-7).
    Severity(u8),
    /// Tag; a rule may carry several.
    Tag(String),
    /// Revision.
    Rev(String),
    /// Version.
    Ver(String),
    /// Maturity level.
    Maturity(u8),
    /// Accuracy level.
    Accuracy(u8),
}

/// Non-disruptive actions.
#[derive(Debug, Clone)]
pub enum NonDisruptiveAction {
    /// Log the match to the error log.
    Log,
    /// Do not log the match.
    NoLog,
    /// Mark the match for audit logging.
    AuditLog,
    /// Exclude the match from audit logging.
    NoAuditLog,
    /// Copy regex capture groups into TX:0..TX:9.
    Capture,
    /// Test every transformed intermediate, not only the final form.
    MultiMatch,
    /// Variable assignment/arithmetic.
    SetVar(SetVarSpec),
    /// Bind the USER persistent collection to an id.
    SetUid(String),
    /// Bind the SESSION persistent collection to an id.
    SetSid(String),
    /// Initialize a persistent collection with an explicit key.
    InitCol {
        /// Collection name (ip, session, user, global, resource).
        collection: String,
        /// Key expression (may contain macros).
        key: String,
    },
    /// Set a time-to-live on a persistent variable.
    ExpireVar {
        /// Collection name.
        collection: String,
        /// Variable key.
        key: String,
        /// TTL in seconds.
        seconds: u64,
    },
    /// External script hook; recorded but never executed.
    Exec(String),
    /// Per-transaction engine override.
    Ctl(CtlSpec),
    /// Mask an argument value in audit output.
    SanitiseArg(String),
    /// Mask the matched value in audit output.
    SanitiseMatched,
    /// Append content to the response body.
    Append(String),
    /// Prepend content to the response body.
    Prepend(String),
}

/// Disruptive actions.
#[derive(Debug, Clone)]
pub enum DisruptiveAction {
    /// Deny with an HTTP status.
    Deny,
    /// Close the connection without a response.
    Drop,
    /// Redirect to a URL.
    Redirect(String),
    /// Continue processing; the match is still recorded.
    Pass,
    /// Stop evaluating rules and let the request through.
    Allow,
    /// Apply the phase's SecDefaultAction disruptive behavior.
    Block,
}

/// Flow control actions.
#[derive(Debug, Clone)]
pub enum FlowAction {
    /// The next rule must also match for this one to fire.
    Chain,
    /// Skip the next N top-level rules in this phase.
    Skip(u32),
    /// Skip ahead to a SecMarker (or rule id) in this phase.
    SkipAfter(String),
}

/// Data actions, operands for disruptive actions.
#[derive(Debug, Clone)]
pub enum DataAction {
    /// HTTP status used by deny/redirect.
    Status(u16),
    /// Environment variable export.
    SetEnv {
        /// Variable name.
        name: String,
        /// Value (may contain macros).
        value: String,
    },
}

/// A setvar specification, value kept as source text for later macro
/// compilation.
#[derive(Debug, Clone)]
pub struct SetVarSpec {
    /// Collection name, lowercased (tx, ip, session, user, global, resource).
    pub collection: String,
    /// Variable key.
    pub key: String,
    /// Operation to perform.
    pub value: SetVarValue,
}

/// SetVar operations.
#[derive(Debug, Clone)]
pub enum SetVarValue {
    /// Assign the expanded value.
    Assign(String),
    /// Add the expanded value, parsed as an integer.
    Increment(String),
    /// Subtract the expanded value, parsed as an integer.
    Decrement(String),
    /// Remove the variable.
    Delete,
}

/// A `ctl:` per-transaction override.
#[derive(Debug, Clone)]
pub struct CtlSpec {
    /// Which engine knob to turn.
    pub option: CtlOption,
    /// The value, uninterpreted until execution.
    pub value: String,
}

/// Engine knobs reachable from `ctl:`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtlOption {
    /// ctl:ruleEngine=On|Off|DetectionOnly
    RuleEngine,
    /// ctl:requestBodyProcessor=URLENCODED|MULTIPART|JSON|XML
    RequestBodyProcessor,
    /// ctl:requestBodyAccess=On|Off
    RequestBodyAccess,
    /// ctl:responseBodyAccess=On|Off
    ResponseBodyAccess,
    /// ctl:auditEngine=On|Off|RelevantOnly
    AuditEngine,
}

/// Parse a comma-separated action list.
///
/// Commas inside quotes and parentheses do not split, so
/// `msg:'a, b',setvar:tx.s=+1` parses as two actions.
pub fn parse_actions(input: &str) -> Result<Vec<Action>> {
    let mut actions = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut quote_char = '"';
    let mut paren_depth: u32 = 0;

    for c in input.chars() {
        match c {
            '"' | '\'' if !in_quotes => {
                in_quotes = true;
                quote_char = c;
                current.push(c);
            }
            c if in_quotes && c == quote_char => {
                in_quotes = false;
                current.push(c);
            }
            '(' if !in_quotes => {
                paren_depth += 1;
                current.push(c);
            }
            ')' if !in_quotes => {
                paren_depth = paren_depth.saturating_sub(1);
                current.push(c);
            }
            ',' if !in_quotes && paren_depth == 0 => {
                if !current.trim().is_empty() {
                    if let Some(action) = parse_single_action(current.trim())? {
                        actions.push(action);
                    }
                }
                current.clear();
            }
            _ => current.push(c),
        }
    }

    if !current.trim().is_empty() {
        if let Some(action) = parse_single_action(current.trim())? {
            actions.push(action);
        }
    }

    Ok(actions)
}

fn parse_single_action(input: &str) -> Result<Option<Action>> {
    if let Some(name) = input.strip_prefix("t:") {
        return Ok(Some(Action::Transformation(name.to_string())));
    }

    let (name, argument) = match input.find(':') {
        Some(pos) => (
            input[..pos].to_ascii_lowercase(),
            Some(unquote(&input[pos + 1..])),
        ),
        None => (input.to_ascii_lowercase(), None),
    };

    let action = match name.as_str() {
        // Disruptive
        "deny" => Action::Disruptive(DisruptiveAction::Deny),
        "drop" => Action::Disruptive(DisruptiveAction::Drop),
        "block" => Action::Disruptive(DisruptiveAction::Block),
        "pass" => Action::Disruptive(DisruptiveAction::Pass),
        "allow" => Action::Disruptive(DisruptiveAction::Allow),
        "redirect" => {
            let url = required(&name, argument)?;
            Action::Disruptive(DisruptiveAction::Redirect(url))
        }

        // Flow
        "chain" => Action::Flow(FlowAction::Chain),
        "skip" => {
            let count = parse_number(&name, argument)?;
            Action::Flow(FlowAction::Skip(count))
        }
        "skipafter" => {
            let marker = required(&name, argument)?;
            Action::Flow(FlowAction::SkipAfter(marker))
        }

        // Metadata
        "id" => Action::Metadata(MetadataAction::Id(parse_number(&name, argument)?)),
        "phase" => Action::Metadata(MetadataAction::Phase(parse_number(&name, argument)?)),
        "msg" => Action::Metadata(MetadataAction::Msg(argument.unwrap_or_default())),
        "logdata" => Action::Metadata(MetadataAction::LogData(argument.unwrap_or_default())),
        "tag" => Action::Metadata(MetadataAction::Tag(argument.unwrap_or_default())),
        "rev" => Action::Metadata(MetadataAction::Rev(argument.unwrap_or_default())),
        "ver" => Action::Metadata(MetadataAction::Ver(argument.unwrap_or_default())),
        "maturity" => Action::Metadata(MetadataAction::Maturity(parse_number(&name, argument)?)),
        "accuracy" => Action::Metadata(MetadataAction::Accuracy(parse_number(&name, argument)?)),
        "severity" => {
            let arg = required(&name, argument)?;
            let severity =
                parse_severity(&arg).ok_or_else(|| Error::InvalidActionArgument {
                    action: name.clone(),
                    message: format!("invalid severity '{arg}'"),
                })?;
            Action::Metadata(MetadataAction::Severity(severity))
        }

        // Data
        "status" => Action::Data(DataAction::Status(parse_number(&name, argument)?)),
        "setenv" => {
            let spec = required(&name, argument)?;
            let (env_name, value) = match spec.split_once('=') {
                Some((n, v)) => (n.to_string(), v.to_string()),
                None => (spec, String::new()),
            };
            Action::Data(DataAction::SetEnv {
                name: env_name,
                value,
            })
        }

        // Non-disruptive
        "log" => Action::NonDisruptive(NonDisruptiveAction::Log),
        "nolog" => Action::NonDisruptive(NonDisruptiveAction::NoLog),
        "auditlog" => Action::NonDisruptive(NonDisruptiveAction::AuditLog),
        "noauditlog" => Action::NonDisruptive(NonDisruptiveAction::NoAuditLog),
        "capture" => Action::NonDisruptive(NonDisruptiveAction::Capture),
        "multimatch" => Action::NonDisruptive(NonDisruptiveAction::MultiMatch),
        "setvar" => {
            let spec = required(&name, argument)?;
            Action::NonDisruptive(NonDisruptiveAction::SetVar(parse_setvar(&spec)?))
        }
        "setuid" => Action::NonDisruptive(NonDisruptiveAction::SetUid(required(&name, argument)?)),
        "setsid" => Action::NonDisruptive(NonDisruptiveAction::SetSid(required(&name, argument)?)),
        "initcol" => {
            let spec = required(&name, argument)?;
            let (collection, key) =
                spec.split_once('=')
                    .ok_or_else(|| Error::InvalidActionArgument {
                        action: name.clone(),
                        message: "expected collection=key".to_string(),
                    })?;
            Action::NonDisruptive(NonDisruptiveAction::InitCol {
                collection: collection.to_ascii_lowercase(),
                key: key.to_string(),
            })
        }
        "expirevar" => {
            let spec = required(&name, argument)?;
            let (var, ttl) = spec
                .split_once('=')
                .ok_or_else(|| Error::InvalidActionArgument {
                    action: name.clone(),
                    message: "expected var=seconds".to_string(),
                })?;
            let (collection, key) = split_collection_key(var);
            let seconds = ttl.parse().map_err(|_| Error::InvalidActionArgument {
                action: name.clone(),
                message: format!("invalid TTL '{ttl}'"),
            })?;
            Action::NonDisruptive(NonDisruptiveAction::ExpireVar {
                collection,
                key,
                seconds,
            })
        }
        "exec" => Action::NonDisruptive(NonDisruptiveAction::Exec(required(&name, argument)?)),
        "ctl" => {
            let spec = required(&name, argument)?;
            match parse_ctl(&spec) {
                Some(ctl) => Action::NonDisruptive(NonDisruptiveAction::Ctl(ctl)),
                None => {
                    tracing::warn!(ctl = %spec, "unsupported ctl option, ignoring");
                    return Ok(None);
                }
            }
        }
        "sanitisearg" | "sanitizearg" => {
            Action::NonDisruptive(NonDisruptiveAction::SanitiseArg(required(&name, argument)?))
        }
        "sanitisematched" | "sanitizematched" => {
            Action::NonDisruptive(NonDisruptiveAction::SanitiseMatched)
        }
        "append" => Action::NonDisruptive(NonDisruptiveAction::Append(argument.unwrap_or_default())),
        "prepend" => {
            Action::NonDisruptive(NonDisruptiveAction::Prepend(argument.unwrap_or_default()))
        }

        _ => {
            return Err(Error::UnknownAction { name });
        }
    };

    Ok(Some(action))
}

fn unquote(s: &str) -> String {
    let s = s.trim();
    if s.len() >= 2
        && ((s.starts_with('\'') && s.ends_with('\'')) || (s.starts_with('"') && s.ends_with('"')))
    {
        s[1..s.len() - 1].to_string()
    } else {
        s.to_string()
    }
}

fn required(action: &str, argument: Option<String>) -> Result<String> {
    argument
        .filter(|a| !a.is_empty())
        .ok_or_else(|| Error::InvalidActionArgument {
            action: action.to_string(),
            message: "missing argument".to_string(),
        })
}

fn parse_number<T: std::str::FromStr>(action: &str, argument: Option<String>) -> Result<T> {
    let arg = required(action, argument)?;
    arg.parse().map_err(|_| Error::InvalidActionArgument {
        action: action.to_string(),
        message: format!("invalid number '{arg}'"),
    })
}

/// Parse `collection.key=value`, `collection.key=+n`, `!collection.key`.
fn parse_setvar(input: &str) -> Result<SetVarSpec> {
    let input = input.trim();

    if let Some(var) = input.strip_prefix('!') {
        let (collection, key) = split_collection_key(var);
        return Ok(SetVarSpec {
            collection,
            key,
            value: SetVarValue::Delete,
        });
    }

    let (var, value_str) = match input.split_once('=') {
        Some((v, val)) => (v, Some(val)),
        None => (input, None),
    };

    let (collection, key) = split_collection_key(var);

    let value = match value_str {
        Some(val) => {
            if let Some(rest) = val.strip_prefix('+') {
                SetVarValue::Increment(rest.to_string())
            } else if let Some(rest) = val.strip_prefix('-') {
                SetVarValue::Decrement(rest.to_string())
            } else {
                SetVarValue::Assign(val.to_string())
            }
        }
        // Bare `setvar:tx.flag` initializes to 1.
        None => SetVarValue::Assign("1".to_string()),
    };

    Ok(SetVarSpec {
        collection,
        key,
        value,
    })
}

fn split_collection_key(var: &str) -> (String, String) {
    match var.split_once('.') {
        Some((collection, key)) => (collection.to_ascii_lowercase(), key.to_string()),
        None => ("tx".to_string(), var.to_string()),
    }
}

fn parse_ctl(spec: &str) -> Option<CtlSpec> {
    let (option_str, value) = match spec.split_once('=') {
        Some((o, v)) => (o, v.to_string()),
        None => (spec, String::new()),
    };
    let option = match option_str.to_ascii_lowercase().as_str() {
        "ruleengine" => CtlOption::RuleEngine,
        "requestbodyprocessor" => CtlOption::RequestBodyProcessor,
        "requestbodyaccess" => CtlOption::RequestBodyAccess,
        "responsebodyaccess" => CtlOption::ResponseBodyAccess,
        "auditengine" => CtlOption::AuditEngine,
        _ => return None,
    };
    Some(CtlSpec { option, value })
}

fn parse_severity(s: &str) -> Option<u8> {
    if let Ok(n) = s.parse::<u8>() {
        return (n <= 7).then_some(n);
    }
    match s.to_ascii_lowercase().as_str() {
        "emergency" => Some(0),
        "alert" => Some(1),
        "critical" => Some(2),
        "error" => Some(3),
        "warning" => Some(4),
        "notice" => Some(5),
        "info" => Some(6),
        "debug" => Some(7),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_list() {
        let actions = parse_actions("id:1,phase:1,log,deny,status:500").unwrap();
        assert_eq!(actions.len(), 5);
        assert!(matches!(
            actions[3],
            Action::Disruptive(DisruptiveAction::Deny)
        ));
        assert!(matches!(
            actions[4],
            Action::Data(DataAction::Status(500))
        ));
    }

    #[test]
    fn test_quoted_msg_keeps_commas() {
        let actions = parse_actions("id:1,msg:'a, quoted, msg',pass").unwrap();
        assert_eq!(actions.len(), 3);
        assert!(
            matches!(&actions[1], Action::Metadata(MetadataAction::Msg(m)) if m == "a, quoted, msg")
        );
    }

    #[test]
    fn test_parse_setvar_forms() {
        let actions =
            parse_actions("setvar:tx.score=+5,setvar:tx.flag,setvar:!tx.old,setvar:ip.hits=-1")
                .unwrap();
        let specs: Vec<_> = actions
            .iter()
            .map(|a| match a {
                Action::NonDisruptive(NonDisruptiveAction::SetVar(s)) => s,
                _ => panic!("expected setvar"),
            })
            .collect();
        assert!(matches!(&specs[0].value, SetVarValue::Increment(v) if v == "5"));
        assert!(matches!(&specs[1].value, SetVarValue::Assign(v) if v == "1"));
        assert!(matches!(specs[2].value, SetVarValue::Delete));
        assert_eq!(specs[3].collection, "ip");
        assert!(matches!(&specs[3].value, SetVarValue::Decrement(v) if v == "1"));
    }

    #[test]
    fn test_parse_severity_names_and_numbers() {
        assert!(matches!(
            parse_actions("severity:'CRITICAL'").unwrap()[0],
            Action::Metadata(MetadataAction::Severity(2))
        ));
        assert!(matches!(
            parse_actions("severity:4").unwrap()[0],
            Action::Metadata(MetadataAction::Severity(4))
        ));
        assert!(parse_actions("severity:9").is_err());
    }

    #[test]
    fn test_parse_ctl_known_and_unknown() {
        let actions = parse_actions("ctl:ruleEngine=Off,ctl:ruleRemoveById=1234").unwrap();
        // The unsupported option is dropped with a warning.
        assert_eq!(actions.len(), 1);
        assert!(matches!(
            &actions[0],
            Action::NonDisruptive(NonDisruptiveAction::Ctl(c)) if c.option == CtlOption::RuleEngine && c.value == "Off"
        ));
    }

    #[test]
    fn test_parse_flow_actions() {
        let actions = parse_actions("chain,skip:2,skipAfter:END_HOST_CHECK").unwrap();
        assert!(matches!(actions[0], Action::Flow(FlowAction::Chain)));
        assert!(matches!(actions[1], Action::Flow(FlowAction::Skip(2))));
        assert!(
            matches!(&actions[2], Action::Flow(FlowAction::SkipAfter(m)) if m == "END_HOST_CHECK")
        );
    }

    #[test]
    fn test_parse_expirevar() {
        let actions = parse_actions("expirevar:ip.block=600").unwrap();
        assert!(matches!(
            &actions[0],
            Action::NonDisruptive(NonDisruptiveAction::ExpireVar { collection, key, seconds })
                if collection == "ip" && key == "block" && *seconds == 600
        ));
    }

    #[test]
    fn test_unknown_action_is_error() {
        assert!(matches!(
            parse_actions("id:1,frobnicate"),
            Err(Error::UnknownAction { .. })
        ));
    }
}
