//! SecLang directive parser.
//!
//! Turns configuration text into [`Directive`] values:
//!
//! ```text
//! SecRule TARGETS "OPERATOR" "ACTIONS"
//! ```
//!
//! The parser knows nothing about evaluation; `engine::ruleset` compiles
//! directives into executable rules.

mod action;
mod directive;
mod lexer;
mod operator;
mod variable;

pub use action::{
    parse_actions, Action, CtlOption, CtlSpec, DataAction, DisruptiveAction, FlowAction,
    MetadataAction, NonDisruptiveAction, SetVarSpec, SetVarValue,
};
pub use directive::{AuditMode, Directive, EngineMode, SecAction, SecMarker, SecRule};
pub use lexer::{Lexer, Token, TokenKind};
pub use operator::{parse_operator, OperatorName, OperatorSpec};
pub use variable::{parse_targets, Selector, TargetSpec, Variable};

use crate::error::{Error, Result, SourceLocation};
use std::path::Path;

/// Parser for SecLang configuration files.
pub struct Parser {
    directives: Vec<Directive>,
    location: SourceLocation,
}

impl Parser {
    /// Create a new parser.
    pub fn new() -> Self {
        Self {
            directives: Vec::new(),
            location: SourceLocation::default(),
        }
    }

    /// Parse a configuration string.
    pub fn parse(&mut self, input: &str) -> Result<()> {
        self.parse_with_location(input, None)
    }

    /// Parse a configuration string attributed to a file.
    pub fn parse_with_location(&mut self, input: &str, file: Option<&Path>) -> Result<()> {
        self.location.file = file.map(|p| p.to_path_buf());
        self.location.line = 1;
        self.location.column = 1;

        let mut lexer = Lexer::new(input);

        while let Some(token) = lexer.next_token() {
            self.location.line = token.line;
            self.location.column = token.column;

            match token.kind {
                TokenKind::Directive(name) => {
                    let directive = self.parse_directive(&name, &mut lexer)?;
                    self.directives.push(directive);
                }
                TokenKind::Comment | TokenKind::Newline => {}
                other => {
                    return Err(Error::parse(
                        format!("unexpected token: {other:?}"),
                        self.location.to_string(),
                    ));
                }
            }
        }

        Ok(())
    }

    /// Parse a configuration file.
    pub fn parse_file(&mut self, path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileLoad {
            path: path.to_path_buf(),
            source: e,
        })?;
        self.parse_with_location(&content, Some(path))
    }

    /// Parse all files matching a glob pattern.
    pub fn parse_glob(&mut self, pattern: &str) -> Result<()> {
        let paths = glob::glob(pattern)
            .map_err(|e| Error::parse(format!("invalid glob pattern: {e}"), pattern))?;

        for entry in paths {
            match entry {
                Ok(path) if path.is_file() => self.parse_file(&path)?,
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "error reading glob entry");
                }
            }
        }

        Ok(())
    }

    /// Consume the parser, yielding the directives in source order.
    pub fn into_directives(self) -> Vec<Directive> {
        self.directives
    }

    /// Borrow the parsed directives.
    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    fn parse_directive(&mut self, name: &str, lexer: &mut Lexer) -> Result<Directive> {
        match name.to_ascii_lowercase().as_str() {
            "secrule" => self.parse_secrule(lexer),
            "secaction" => {
                let actions = parse_actions(&self.expect_quoted(lexer, "SecAction")?)?;
                Ok(Directive::SecAction(SecAction {
                    actions,
                    location: self.location.clone(),
                }))
            }
            "secmarker" => {
                let marker = self.expect_argument(lexer, "SecMarker name")?;
                Ok(Directive::SecMarker(SecMarker { name: marker }))
            }
            "secruleengine" => {
                let mode_str = self.expect_argument(lexer, "SecRuleEngine mode")?;
                let mode = EngineMode::from_name(&mode_str).ok_or_else(|| {
                    Error::parse(
                        format!("invalid SecRuleEngine mode: {mode_str}"),
                        self.location.to_string(),
                    )
                })?;
                Ok(Directive::SecRuleEngine(mode))
            }
            "secdefaultaction" => {
                let actions = parse_actions(&self.expect_quoted(lexer, "SecDefaultAction")?)?;
                Ok(Directive::SecDefaultAction(actions))
            }
            "secruleremovebyid" => {
                let ids_str = self.expect_argument(lexer, "SecRuleRemoveById")?;
                let ids = ids_str
                    .split_whitespace()
                    .filter_map(|s| s.parse().ok())
                    .collect();
                Ok(Directive::SecRuleRemoveById(ids))
            }
            "secrequestbodyaccess" => {
                Ok(Directive::SecRequestBodyAccess(self.expect_on_off(lexer)?))
            }
            "secresponsebodyaccess" => {
                Ok(Directive::SecResponseBodyAccess(self.expect_on_off(lexer)?))
            }
            "secrequestbodylimit" => {
                Ok(Directive::SecRequestBodyLimit(self.expect_bytes(lexer)?))
            }
            "secrequestbodyinmemorylimit" => Ok(Directive::SecRequestBodyInMemoryLimit(
                self.expect_bytes(lexer)?,
            )),
            "secresponsebodylimit" => {
                Ok(Directive::SecResponseBodyLimit(self.expect_bytes(lexer)?))
            }
            "secresponsebodymimetype" => {
                let types = self.expect_argument(lexer, "SecResponseBodyMimeType")?;
                Ok(Directive::SecResponseBodyMimeType(
                    types.split_whitespace().map(str::to_string).collect(),
                ))
            }
            "secauditengine" => {
                let mode_str = self.expect_argument(lexer, "SecAuditEngine mode")?;
                let mode = AuditMode::from_name(&mode_str).ok_or_else(|| {
                    Error::parse(
                        format!("invalid SecAuditEngine mode: {mode_str}"),
                        self.location.to_string(),
                    )
                })?;
                Ok(Directive::SecAuditEngine(mode))
            }
            "secauditlog" => Ok(Directive::SecAuditLog(
                self.expect_argument(lexer, "SecAuditLog path")?,
            )),
            "secauditlogparts" => Ok(Directive::SecAuditLogParts(
                self.expect_argument(lexer, "SecAuditLogParts")?,
            )),
            "secdebuglog" => Ok(Directive::SecDebugLog(
                self.expect_argument(lexer, "SecDebugLog path")?,
            )),
            "include" => self.parse_include(lexer),
            _ => {
                tracing::warn!(
                    directive = name,
                    location = %self.location,
                    "unknown directive, skipping"
                );
                self.skip_line(lexer);
                Ok(Directive::Unknown(name.to_string()))
            }
        }
    }

    fn parse_secrule(&mut self, lexer: &mut Lexer) -> Result<Directive> {
        let targets_str = self.expect_argument(lexer, "SecRule targets")?;
        let targets = parse_targets(&targets_str)?;

        let operator_str = self.expect_quoted(lexer, "SecRule operator")?;
        let operator = parse_operator(&operator_str)?;

        let actions = if self.peek_quoted(lexer) {
            parse_actions(&self.expect_quoted(lexer, "SecRule actions")?)?
        } else {
            Vec::new()
        };

        Ok(Directive::SecRule(SecRule {
            targets,
            operator,
            actions,
            location: self.location.clone(),
        }))
    }

    fn parse_include(&mut self, lexer: &mut Lexer) -> Result<Directive> {
        let path = self.expect_argument(lexer, "Include path")?;

        // Resolve relative to the including file when possible.
        let resolved = match self.location.file.as_ref().and_then(|f| f.parent()) {
            Some(parent) => {
                let joined = parent.join(&path);
                if joined.exists() {
                    joined.to_string_lossy().into_owned()
                } else {
                    path
                }
            }
            None => path,
        };

        self.parse_glob(&resolved)?;
        Ok(Directive::Include(resolved.into()))
    }

    fn expect_argument(&mut self, lexer: &mut Lexer, context: &str) -> Result<String> {
        lexer.skip_whitespace();
        match lexer.next_token() {
            Some(token) => match token.kind {
                TokenKind::Word(s) | TokenKind::QuotedString(s) => Ok(s),
                other => Err(Error::parse(
                    format!("expected {context} but got {other:?}"),
                    self.location.to_string(),
                )),
            },
            None => Err(Error::parse(
                format!("expected {context} but got end of input"),
                self.location.to_string(),
            )),
        }
    }

    fn expect_quoted(&mut self, lexer: &mut Lexer, context: &str) -> Result<String> {
        lexer.skip_whitespace();
        match lexer.next_token() {
            Some(token) => match token.kind {
                TokenKind::QuotedString(s) => Ok(s),
                other => Err(Error::parse(
                    format!("expected quoted {context} but got {other:?}"),
                    self.location.to_string(),
                )),
            },
            None => Err(Error::parse(
                format!("expected quoted {context} but got end of input"),
                self.location.to_string(),
            )),
        }
    }

    fn expect_on_off(&mut self, lexer: &mut Lexer) -> Result<bool> {
        let value = self.expect_argument(lexer, "On|Off")?;
        match value.to_ascii_lowercase().as_str() {
            "on" => Ok(true),
            "off" => Ok(false),
            _ => Err(Error::parse(
                format!("expected On or Off, got {value}"),
                self.location.to_string(),
            )),
        }
    }

    fn expect_bytes(&mut self, lexer: &mut Lexer) -> Result<u64> {
        let value = self.expect_argument(lexer, "byte count")?;
        value.parse().map_err(|_| {
            Error::parse(
                format!("expected byte count, got {value}"),
                self.location.to_string(),
            )
        })
    }

    fn peek_quoted(&self, lexer: &mut Lexer) -> bool {
        lexer.skip_whitespace();
        matches!(lexer.peek(), Some('"') | Some('\''))
    }

    fn skip_line(&self, lexer: &mut Lexer) {
        while let Some(token) = lexer.next_token() {
            if matches!(token.kind, TokenKind::Newline) {
                break;
            }
        }
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Vec<Directive> {
        let mut parser = Parser::new();
        parser.parse(input).unwrap();
        parser.into_directives()
    }

    #[test]
    fn test_parse_secrule() {
        let directives = parse(r#"SecRule REQUEST_URI "@contains /admin" "id:1,phase:1,deny""#);
        assert_eq!(directives.len(), 1);
        match &directives[0] {
            Directive::SecRule(rule) => {
                assert_eq!(rule.targets.len(), 1);
                assert_eq!(rule.targets[0].variable, Variable::RequestUri);
                assert_eq!(rule.operator.name, OperatorName::Contains);
                assert_eq!(rule.actions.len(), 3);
            }
            other => panic!("expected SecRule, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_secrule_without_actions() {
        let directives = parse(r#"SecRule REQUEST_URI "@contains x""#);
        match &directives[0] {
            Directive::SecRule(rule) => assert!(rule.actions.is_empty()),
            other => panic!("expected SecRule, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_engine_and_limits() {
        let directives = parse(
            "SecRuleEngine DetectionOnly\n\
             SecRequestBodyAccess On\n\
             SecRequestBodyLimit 13107200\n\
             SecRequestBodyInMemoryLimit 131072",
        );
        assert!(matches!(
            directives[0],
            Directive::SecRuleEngine(EngineMode::DetectionOnly)
        ));
        assert!(matches!(directives[1], Directive::SecRequestBodyAccess(true)));
        assert!(matches!(
            directives[2],
            Directive::SecRequestBodyLimit(13107200)
        ));
        assert!(matches!(
            directives[3],
            Directive::SecRequestBodyInMemoryLimit(131072)
        ));
    }

    #[test]
    fn test_parse_audit_directives() {
        let directives = parse(
            "SecAuditEngine RelevantOnly\nSecAuditLogParts ABIJDEFHZ\nSecAuditLog /var/log/audit.log",
        );
        assert!(matches!(
            directives[0],
            Directive::SecAuditEngine(AuditMode::RelevantOnly)
        ));
        assert!(matches!(&directives[1], Directive::SecAuditLogParts(p) if p == "ABIJDEFHZ"));
        assert!(matches!(&directives[2], Directive::SecAuditLog(p) if p == "/var/log/audit.log"));
    }

    #[test]
    fn test_parse_marker_and_default_action() {
        let directives = parse(
            "SecDefaultAction \"phase:2,deny,status:403,log\"\nSecMarker END_CHECKS",
        );
        assert!(matches!(&directives[0], Directive::SecDefaultAction(a) if a.len() == 4));
        assert!(matches!(&directives[1], Directive::SecMarker(m) if m.name == "END_CHECKS"));
    }

    #[test]
    fn test_unknown_directive_skipped() {
        let directives = parse("SecFrobnicate On\nSecMarker X");
        assert!(matches!(&directives[0], Directive::Unknown(n) if n == "SecFrobnicate"));
        assert!(matches!(&directives[1], Directive::SecMarker(_)));
    }

    #[test]
    fn test_multiline_rule() {
        let directives = parse(
            "SecRule ARGS|REQUEST_HEADERS:User-Agent \\\n    \"@rx select.+from\" \\\n    \"id:9,phase:2,deny\"",
        );
        match &directives[0] {
            Directive::SecRule(rule) => assert_eq!(rule.targets.len(), 2),
            other => panic!("expected SecRule, got {other:?}"),
        }
    }
}
