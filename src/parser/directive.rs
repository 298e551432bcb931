//! Parsed SecLang directives.

use super::{Action, OperatorSpec, TargetSpec};
use crate::error::SourceLocation;
use std::path::PathBuf;

/// A parsed configuration directive.
#[derive(Debug, Clone)]
pub enum Directive {
    /// The main rule directive.
    SecRule(SecRule),
    /// An unconditional rule: actions without an operator test.
    SecAction(SecAction),
    /// A named marker, the target of skipAfter.
    SecMarker(SecMarker),
    /// Engine mode switch.
    SecRuleEngine(EngineMode),
    /// Default actions inherited by later rules of the same phase.
    SecDefaultAction(Vec<Action>),
    /// Remove previously loaded rules by ID.
    SecRuleRemoveById(Vec<u64>),
    /// Enable/disable request body inspection.
    SecRequestBodyAccess(bool),
    /// Enable/disable response body inspection.
    SecResponseBodyAccess(bool),
    /// Total request body limit in bytes.
    SecRequestBodyLimit(u64),
    /// In-memory request body limit in bytes; the rest spills to disk.
    SecRequestBodyInMemoryLimit(u64),
    /// Total response body limit in bytes.
    SecResponseBodyLimit(u64),
    /// Response MIME types whose bodies are inspected in phase 4.
    SecResponseBodyMimeType(Vec<String>),
    /// Audit engine mode.
    SecAuditEngine(AuditMode),
    /// Audit log output path.
    SecAuditLog(String),
    /// Audit log parts (A..K, Z).
    SecAuditLogParts(String),
    /// Debug log output path.
    SecDebugLog(String),
    /// Include another configuration file (glob allowed).
    Include(PathBuf),
    /// Unknown directive, logged and skipped.
    Unknown(String),
}

/// A SecRule directive.
#[derive(Debug, Clone)]
pub struct SecRule {
    /// Targets to inspect.
    pub targets: Vec<TargetSpec>,
    /// Operator to apply.
    pub operator: OperatorSpec,
    /// Actions to execute on match.
    pub actions: Vec<Action>,
    /// Source location for error reporting.
    pub location: SourceLocation,
}

/// A SecAction directive.
#[derive(Debug, Clone)]
pub struct SecAction {
    /// Actions to execute unconditionally.
    pub actions: Vec<Action>,
    /// Source location for error reporting.
    pub location: SourceLocation,
}

/// A SecMarker directive.
#[derive(Debug, Clone)]
pub struct SecMarker {
    /// Marker name.
    pub name: String,
}

/// Rule engine operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineMode {
    /// Rules evaluate and disruptive actions interrupt.
    #[default]
    On,
    /// Rules evaluate, matches are recorded, interruptions suppressed.
    DetectionOnly,
    /// No rules evaluate.
    Off,
}

impl EngineMode {
    /// Parse an engine mode keyword.
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "on" => Some(Self::On),
            "off" => Some(Self::Off),
            "detectiononly" => Some(Self::DetectionOnly),
            _ => None,
        }
    }
}

/// Audit engine operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuditMode {
    /// Log every transaction.
    On,
    /// Log nothing.
    #[default]
    Off,
    /// Log transactions with at least one loggable match or interruption.
    RelevantOnly,
}

impl AuditMode {
    /// Parse an audit mode keyword.
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "on" => Some(Self::On),
            "off" => Some(Self::Off),
            "relevantonly" => Some(Self::RelevantOnly),
            _ => None,
        }
    }
}
