//! Rule compilation: directives in, executable per-phase rule lists out.

use super::phase::Phase;
use crate::actions::{
    DisruptivePlan, ExpireVarOp, InitColOp, SetEnvOp, SetVarOp, SetVarOperation, Severity,
};
use crate::config::WafConfig;
use crate::error::{Error, Result};
use crate::macros::Macro;
use crate::operators::{compile_operator, Operator, UnconditionalMatchOperator};
use crate::parser::{
    Action, CtlSpec, DataAction, Directive, DisruptiveAction, EngineMode, FlowAction,
    MetadataAction, NonDisruptiveAction, Parser, SetVarValue,
};
use crate::transformations::TransformationPipeline;
use crate::variables::{compile_target, CompiledTarget};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// An executable rule. Chain children hang off `chain`; they carry no
/// default actions and inherit the parent's phase.
#[derive(Clone)]
pub struct CompiledRule {
    /// Rule ID; 0 on chain children without their own id.
    pub id: u64,
    /// Execution phase.
    pub phase: Phase,
    /// Targets with compiled selectors.
    pub targets: Vec<CompiledTarget>,
    /// Compiled operator.
    pub operator: Arc<dyn Operator>,
    /// Operator negation.
    pub negated: bool,
    /// Transformation pipeline.
    pub transformations: TransformationPipeline,
    /// Test every transformation intermediate.
    pub multi_match: bool,
    /// Populate TX:0..TX:9 from operator captures.
    pub capture: bool,
    /// Whether the match is written to the error log.
    pub log: bool,
    /// Whether the match participates in audit logging.
    pub audit_log: bool,
    /// Message template.
    pub msg: Option<Macro>,
    /// Log data template.
    pub logdata: Option<Macro>,
    /// Severity.
    pub severity: Option<Severity>,
    /// Tags.
    pub tags: Vec<String>,
    /// Revision string.
    pub rev: Option<String>,
    /// Version string.
    pub ver: Option<String>,
    /// Disruptive behavior, `block` already resolved.
    pub disruptive: DisruptivePlan,
    /// Status operand for deny/redirect.
    pub status: Option<u16>,
    /// Variable writes.
    pub setvars: Vec<SetVarOp>,
    /// Environment exports.
    pub setenvs: Vec<SetEnvOp>,
    /// Persistent collection bindings.
    pub initcols: Vec<InitColOp>,
    /// Persistent variable TTLs.
    pub expirevars: Vec<ExpireVarOp>,
    /// USER collection binding.
    pub setuid: Option<Macro>,
    /// SESSION collection binding.
    pub setsid: Option<Macro>,
    /// Recorded exec script (never executed).
    pub exec: Option<String>,
    /// Per-transaction engine overrides.
    pub ctls: Vec<CtlSpec>,
    /// Skip the next N top-level rules on match.
    pub skip: u32,
    /// Skip to this marker on match.
    pub skip_after: Option<String>,
    /// Next link of the chain.
    pub chain: Option<Box<CompiledRule>>,
}

impl std::fmt::Debug for CompiledRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledRule")
            .field("id", &self.id)
            .field("phase", &self.phase)
            .field("targets", &self.targets.len())
            .field("operator", &self.operator.name())
            .field("negated", &self.negated)
            .field("chained", &self.chain.is_some())
            .finish()
    }
}

impl CompiledRule {
    /// Number of links in this chain, including self.
    pub fn chain_len(&self) -> usize {
        1 + self.chain.as_ref().map_or(0, |c| c.chain_len())
    }
}

/// A compiled, immutable ruleset shared across transactions.
pub struct CompiledRuleset {
    by_phase: HashMap<Phase, Vec<CompiledRule>>,
    markers: HashMap<String, HashMap<Phase, usize>>,
    engine_mode: EngineMode,
}

impl CompiledRuleset {
    /// Rules registered for a phase, in declaration order.
    pub fn rules_for_phase(&self, phase: Phase) -> &[CompiledRule] {
        self.by_phase.get(&phase).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total top-level rule count.
    pub fn rule_count(&self) -> usize {
        self.by_phase.values().map(Vec::len).sum()
    }

    /// Engine mode configured by SecRuleEngine.
    pub fn engine_mode(&self) -> EngineMode {
        self.engine_mode
    }

    /// The rule index a skipAfter marker points at within a phase.
    ///
    /// Falls back to scanning rule ids so `skipAfter:950000` also works
    /// when the marker names a rule instead of a SecMarker.
    pub fn marker_index(&self, phase: Phase, marker: &str) -> Option<usize> {
        if let Some(index) = self.markers.get(marker).and_then(|m| m.get(&phase)) {
            return Some(*index);
        }
        let id: u64 = marker.parse().ok()?;
        self.rules_for_phase(phase)
            .iter()
            .position(|r| r.id == id)
            .map(|i| i + 1)
    }
}

/// Compile parsed directives into a ruleset and its configuration.
pub fn compile(directives: Vec<Directive>) -> Result<(CompiledRuleset, WafConfig)> {
    let mut compiler = Compiler::default();
    for directive in directives {
        compiler.add(directive)?;
    }
    compiler.finish()
}

/// Convenience: parse and compile a directive string.
pub fn compile_str(input: &str) -> Result<(CompiledRuleset, WafConfig)> {
    let mut parser = Parser::new();
    parser.parse(input)?;
    compile(parser.into_directives())
}

#[derive(Default)]
struct Compiler {
    by_phase: HashMap<Phase, Vec<CompiledRule>>,
    markers: HashMap<String, HashMap<Phase, usize>>,
    engine_mode: EngineMode,
    defaults_by_phase: HashMap<Phase, Vec<Action>>,
    chain_buf: Vec<CompiledRule>,
    seen_ids: HashSet<u64>,
    remove_ids: HashSet<u64>,
    config: WafConfig,
}

impl Compiler {
    fn add(&mut self, directive: Directive) -> Result<()> {
        match directive {
            Directive::SecRule(rule) => {
                let operator = compile_operator(&rule.operator)?;
                self.add_rule(rule.targets, operator, rule.operator.negated, rule.actions)
            }
            Directive::SecAction(action) => {
                self.add_rule(Vec::new(), Arc::new(UnconditionalMatchOperator), false, action.actions)
            }
            Directive::SecMarker(marker) => {
                if !self.chain_buf.is_empty() {
                    return Err(Error::IncompleteChain);
                }
                let positions = Phase::all()
                    .iter()
                    .map(|p| (*p, self.by_phase.get(p).map_or(0, Vec::len)))
                    .collect();
                self.markers.insert(marker.name, positions);
                Ok(())
            }
            Directive::SecRuleEngine(mode) => {
                self.engine_mode = mode;
                Ok(())
            }
            Directive::SecDefaultAction(actions) => {
                if actions
                    .iter()
                    .any(|a| matches!(a, Action::Flow(FlowAction::Chain)))
                {
                    return Err(Error::config("SecDefaultAction cannot chain"));
                }
                let phase = explicit_phase(&actions)?.unwrap_or(Phase::RequestBody);
                self.defaults_by_phase.insert(phase, actions);
                Ok(())
            }
            Directive::SecRuleRemoveById(ids) => {
                self.remove_ids.extend(ids);
                Ok(())
            }
            Directive::SecRequestBodyAccess(on) => {
                self.config.request_body_access = on;
                Ok(())
            }
            Directive::SecResponseBodyAccess(on) => {
                self.config.response_body_access = on;
                Ok(())
            }
            Directive::SecRequestBodyLimit(limit) => {
                self.config.request_body_limit = limit;
                Ok(())
            }
            Directive::SecRequestBodyInMemoryLimit(limit) => {
                self.config.request_body_in_memory_limit = limit;
                Ok(())
            }
            Directive::SecResponseBodyLimit(limit) => {
                self.config.response_body_limit = limit;
                Ok(())
            }
            Directive::SecResponseBodyMimeType(types) => {
                self.config.response_body_mime_types = types;
                Ok(())
            }
            Directive::SecAuditEngine(mode) => {
                self.config.audit_mode = mode;
                Ok(())
            }
            Directive::SecAuditLog(path) => {
                self.config.audit_log_path = path;
                Ok(())
            }
            Directive::SecAuditLogParts(parts) => {
                self.config.audit_parts = parts;
                Ok(())
            }
            Directive::SecDebugLog(path) => {
                self.config.debug_log_path = path;
                Ok(())
            }
            Directive::Include(_) | Directive::Unknown(_) => Ok(()),
        }
    }

    fn add_rule(
        &mut self,
        targets: Vec<crate::parser::TargetSpec>,
        operator: Arc<dyn Operator>,
        negated: bool,
        actions: Vec<Action>,
    ) -> Result<()> {
        let in_chain = !self.chain_buf.is_empty();

        let phase = match explicit_phase(&actions)? {
            Some(phase) => phase,
            None if in_chain => self.chain_buf[0].phase,
            None => Phase::RequestBody,
        };

        let defaults = if in_chain {
            &[][..]
        } else {
            self.defaults_by_phase
                .get(&phase)
                .map(Vec::as_slice)
                .unwrap_or(&[])
        };

        let mut builder = RuleBuilder::new(phase);
        builder.apply(defaults, true)?;
        builder.apply(&actions, false)?;

        let compiled_targets = targets
            .iter()
            .map(compile_target)
            .collect::<Result<Vec<_>>>()?;

        let has_chain = actions
            .iter()
            .any(|a| matches!(a, Action::Flow(FlowAction::Chain)));

        let rule = builder.build(compiled_targets, operator, negated, defaults)?;

        if !in_chain {
            if rule.id == 0 {
                return Err(Error::MissingRuleId);
            }
            if !self.seen_ids.insert(rule.id) {
                return Err(Error::DuplicateRuleId { id: rule.id });
            }
        }

        if has_chain {
            self.chain_buf.push(rule);
        } else if in_chain {
            // Terminal link: fold the buffered parents around it.
            let mut folded = rule;
            for mut parent in self.chain_buf.drain(..).rev() {
                parent.chain = Some(Box::new(folded));
                folded = parent;
            }
            self.by_phase.entry(folded.phase).or_default().push(folded);
        } else {
            self.by_phase.entry(rule.phase).or_default().push(rule);
        }

        Ok(())
    }

    fn finish(mut self) -> Result<(CompiledRuleset, WafConfig)> {
        if !self.chain_buf.is_empty() {
            return Err(Error::IncompleteChain);
        }

        if !self.remove_ids.is_empty() {
            for rules in self.by_phase.values_mut() {
                rules.retain(|r| !self.remove_ids.contains(&r.id));
            }
        }

        self.config.validate()?;

        Ok((
            CompiledRuleset {
                by_phase: self.by_phase,
                markers: self.markers,
                engine_mode: self.engine_mode,
            },
            self.config,
        ))
    }
}

fn explicit_phase(actions: &[Action]) -> Result<Option<Phase>> {
    for action in actions {
        if let Action::Metadata(MetadataAction::Phase(n)) = action {
            return Phase::from_number(*n)
                .map(Some)
                .ok_or_else(|| Error::config(format!("invalid phase {n}")));
        }
    }
    Ok(None)
}

/// Accumulates action effects; defaults first, then the rule's own actions.
struct RuleBuilder {
    phase: Phase,
    id: u64,
    log: bool,
    audit_log: bool,
    multi_match: bool,
    capture: bool,
    msg: Option<Macro>,
    logdata: Option<Macro>,
    severity: Option<Severity>,
    tags: Vec<String>,
    rev: Option<String>,
    ver: Option<String>,
    raw_disruptive: Option<DisruptiveAction>,
    status: Option<u16>,
    transform_names: Vec<String>,
    setvars: Vec<SetVarOp>,
    setenvs: Vec<SetEnvOp>,
    initcols: Vec<InitColOp>,
    expirevars: Vec<ExpireVarOp>,
    setuid: Option<Macro>,
    setsid: Option<Macro>,
    exec: Option<String>,
    ctls: Vec<CtlSpec>,
    skip: u32,
    skip_after: Option<String>,
}

impl RuleBuilder {
    fn new(phase: Phase) -> Self {
        Self {
            phase,
            id: 0,
            log: true,
            audit_log: true,
            multi_match: false,
            capture: false,
            msg: None,
            logdata: None,
            severity: None,
            tags: Vec::new(),
            rev: None,
            ver: None,
            raw_disruptive: None,
            status: None,
            transform_names: Vec::new(),
            setvars: Vec::new(),
            setenvs: Vec::new(),
            initcols: Vec::new(),
            expirevars: Vec::new(),
            setuid: None,
            setsid: None,
            exec: None,
            ctls: Vec::new(),
            skip: 0,
            skip_after: None,
        }
    }

    fn apply(&mut self, actions: &[Action], from_defaults: bool) -> Result<()> {
        for action in actions {
            match action {
                Action::Metadata(meta) => self.apply_metadata(meta, from_defaults)?,
                Action::NonDisruptive(nd) => self.apply_non_disruptive(nd)?,
                Action::Disruptive(d) => self.raw_disruptive = Some(d.clone()),
                Action::Data(DataAction::Status(status)) => self.status = Some(*status),
                Action::Data(DataAction::SetEnv { name, value }) => {
                    self.setenvs.push(SetEnvOp {
                        name: name.clone(),
                        value: Macro::compile(value)?,
                    });
                }
                Action::Flow(FlowAction::Chain) => {}
                Action::Flow(FlowAction::Skip(n)) => self.skip = *n,
                Action::Flow(FlowAction::SkipAfter(marker)) => {
                    self.skip_after = Some(marker.clone())
                }
                Action::Transformation(name) => self.transform_names.push(name.clone()),
            }
        }
        Ok(())
    }

    fn apply_metadata(&mut self, meta: &MetadataAction, from_defaults: bool) -> Result<()> {
        match meta {
            // Identity never comes from defaults.
            MetadataAction::Id(id) if !from_defaults => self.id = *id,
            MetadataAction::Id(_) => {}
            MetadataAction::Phase(_) => {}
            MetadataAction::Msg(m) => self.msg = Some(Macro::compile(m)?),
            MetadataAction::LogData(d) => self.logdata = Some(Macro::compile(d)?),
            MetadataAction::Severity(s) => self.severity = Some(Severity::from(*s)),
            MetadataAction::Tag(t) => self.tags.push(t.clone()),
            MetadataAction::Rev(r) => self.rev = Some(r.clone()),
            MetadataAction::Ver(v) => self.ver = Some(v.clone()),
            MetadataAction::Maturity(_) | MetadataAction::Accuracy(_) => {}
        }
        Ok(())
    }

    fn apply_non_disruptive(&mut self, action: &NonDisruptiveAction) -> Result<()> {
        match action {
            NonDisruptiveAction::Log => self.log = true,
            NonDisruptiveAction::NoLog => {
                self.log = false;
                self.audit_log = false;
            }
            NonDisruptiveAction::AuditLog => self.audit_log = true,
            NonDisruptiveAction::NoAuditLog => self.audit_log = false,
            NonDisruptiveAction::Capture => self.capture = true,
            NonDisruptiveAction::MultiMatch => self.multi_match = true,
            NonDisruptiveAction::SetVar(spec) => {
                let operation = match &spec.value {
                    SetVarValue::Assign(v) => SetVarOperation::Assign(Macro::compile(v)?),
                    SetVarValue::Increment(v) => SetVarOperation::Increment(Macro::compile(v)?),
                    SetVarValue::Decrement(v) => SetVarOperation::Decrement(Macro::compile(v)?),
                    SetVarValue::Delete => SetVarOperation::Delete,
                };
                self.setvars.push(SetVarOp {
                    collection: spec.collection.clone(),
                    key: spec.key.clone(),
                    operation,
                });
            }
            NonDisruptiveAction::SetUid(id) => self.setuid = Some(Macro::compile(id)?),
            NonDisruptiveAction::SetSid(id) => self.setsid = Some(Macro::compile(id)?),
            NonDisruptiveAction::InitCol { collection, key } => {
                self.initcols.push(InitColOp {
                    collection: collection.clone(),
                    key: Macro::compile(key)?,
                });
            }
            NonDisruptiveAction::ExpireVar {
                collection,
                key,
                seconds,
            } => {
                self.expirevars.push(ExpireVarOp {
                    collection: collection.clone(),
                    key: key.clone(),
                    seconds: *seconds,
                });
            }
            NonDisruptiveAction::Exec(script) => self.exec = Some(script.clone()),
            NonDisruptiveAction::Ctl(ctl) => self.ctls.push(ctl.clone()),
            // Audit sanitisation and body injection are accepted but not
            // applied; the audit writer masks nothing yet.
            NonDisruptiveAction::SanitiseArg(_)
            | NonDisruptiveAction::SanitiseMatched
            | NonDisruptiveAction::Append(_)
            | NonDisruptiveAction::Prepend(_) => {}
        }
        Ok(())
    }

    fn build(
        self,
        targets: Vec<CompiledTarget>,
        operator: Arc<dyn Operator>,
        negated: bool,
        defaults: &[Action],
    ) -> Result<CompiledRule> {
        let disruptive = match &self.raw_disruptive {
            None => DisruptivePlan::None,
            Some(action) => lower_disruptive(action, defaults)?,
        };

        Ok(CompiledRule {
            id: self.id,
            phase: self.phase,
            targets,
            operator,
            negated,
            transformations: TransformationPipeline::from_names(&self.transform_names)?,
            multi_match: self.multi_match,
            capture: self.capture,
            log: self.log,
            audit_log: self.audit_log,
            msg: self.msg,
            logdata: self.logdata,
            severity: self.severity,
            tags: self.tags,
            rev: self.rev,
            ver: self.ver,
            disruptive,
            status: self.status,
            setvars: self.setvars,
            setenvs: self.setenvs,
            initcols: self.initcols,
            expirevars: self.expirevars,
            setuid: self.setuid,
            setsid: self.setsid,
            exec: self.exec,
            ctls: self.ctls,
            skip: self.skip,
            skip_after: self.skip_after,
            chain: None,
        })
    }
}

/// Lower a raw disruptive action, resolving `block` against the phase's
/// default action. A `block` without a default behaves as deny/403.
fn lower_disruptive(action: &DisruptiveAction, defaults: &[Action]) -> Result<DisruptivePlan> {
    let plan = match action {
        DisruptiveAction::Deny => DisruptivePlan::Deny,
        DisruptiveAction::Drop => DisruptivePlan::Drop,
        DisruptiveAction::Redirect(url) => DisruptivePlan::Redirect(Macro::compile(url)?),
        DisruptiveAction::Pass => DisruptivePlan::Pass,
        DisruptiveAction::Allow => DisruptivePlan::Allow,
        DisruptiveAction::Block => {
            let fallback = defaults.iter().find_map(|a| match a {
                Action::Disruptive(d) if !matches!(d, DisruptiveAction::Block) => Some(d),
                _ => None,
            });
            match fallback {
                Some(d) => lower_disruptive(d, &[])?,
                None => DisruptivePlan::Deny,
            }
        }
    };
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_simple_rule() {
        let (ruleset, _) =
            compile_str(r#"SecRule REQUEST_URI "@contains /admin" "id:1,phase:1,deny""#).unwrap();
        assert_eq!(ruleset.rule_count(), 1);

        let rules = ruleset.rules_for_phase(Phase::RequestHeaders);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].id, 1);
        assert!(matches!(rules[0].disruptive, DisruptivePlan::Deny));
    }

    #[test]
    fn test_phase_defaults_to_request_body() {
        let (ruleset, _) = compile_str(r#"SecRule ARGS "@rx x" "id:9,pass""#).unwrap();
        assert_eq!(ruleset.rules_for_phase(Phase::RequestBody).len(), 1);
    }

    #[test]
    fn test_missing_id_rejected() {
        assert!(matches!(
            compile_str(r#"SecRule REQUEST_URI "@rx x" "phase:1,deny""#),
            Err(Error::MissingRuleId)
        ));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let rules = r#"
            SecRule REQUEST_URI "@rx a" "id:5,phase:1,pass"
            SecRule REQUEST_URI "@rx b" "id:5,phase:1,pass"
        "#;
        assert!(matches!(
            compile_str(rules),
            Err(Error::DuplicateRuleId { id: 5 })
        ));
    }

    #[test]
    fn test_chain_folding() {
        let rules = r#"
            SecRule REQUEST_URI "@beginsWith /user" "id:10,phase:1,deny,chain"
            SecRule REQUEST_METHOD "@streq POST" "chain"
            SecRule REQUEST_HEADERS:Content-Type "@contains json" ""
        "#;
        let (ruleset, _) = compile_str(rules).unwrap();
        let rules = ruleset.rules_for_phase(Phase::RequestHeaders);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].chain_len(), 3);
        // Children inherit the parent phase.
        assert_eq!(rules[0].chain.as_ref().unwrap().phase, Phase::RequestHeaders);
    }

    #[test]
    fn test_incomplete_chain_rejected() {
        assert!(matches!(
            compile_str(r#"SecRule REQUEST_URI "@rx x" "id:1,phase:1,chain""#),
            Err(Error::IncompleteChain)
        ));
    }

    #[test]
    fn test_block_resolves_to_phase_default() {
        let rules = r#"
            SecDefaultAction "phase:2,deny,status:501,log"
            SecRule REQUEST_URI "@contains /default/block" "id:103,block"
        "#;
        let (ruleset, _) = compile_str(rules).unwrap();
        let rule = &ruleset.rules_for_phase(Phase::RequestBody)[0];
        assert!(matches!(rule.disruptive, DisruptivePlan::Deny));
        assert_eq!(rule.status, Some(501));
    }

    #[test]
    fn test_block_without_default_is_deny() {
        let (ruleset, _) =
            compile_str(r#"SecRule REQUEST_URI "@rx x" "id:1,phase:1,block""#).unwrap();
        let rule = &ruleset.rules_for_phase(Phase::RequestHeaders)[0];
        assert!(matches!(rule.disruptive, DisruptivePlan::Deny));
        assert_eq!(rule.status, None);
    }

    #[test]
    fn test_defaults_apply_only_to_matching_phase() {
        let rules = r#"
            SecDefaultAction "phase:2,deny,status:501,log"
            SecRule REQUEST_URI "@rx a" "id:1,phase:1,block"
        "#;
        let (ruleset, _) = compile_str(rules).unwrap();
        let rule = &ruleset.rules_for_phase(Phase::RequestHeaders)[0];
        // Phase 1 has no default: block degrades to deny/403.
        assert_eq!(rule.status, None);
    }

    #[test]
    fn test_rule_remove_by_id() {
        let rules = r#"
            SecRule REQUEST_URI "@rx a" "id:1,phase:1,pass"
            SecRule REQUEST_URI "@rx b" "id:2,phase:1,pass"
            SecRuleRemoveById 1
        "#;
        let (ruleset, _) = compile_str(rules).unwrap();
        let remaining = ruleset.rules_for_phase(Phase::RequestHeaders);
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, 2);
    }

    #[test]
    fn test_marker_positions_per_phase() {
        let rules = r#"
            SecRule REQUEST_URI "@rx a" "id:1,phase:1,pass"
            SecMarker AFTER_FIRST
            SecRule REQUEST_URI "@rx b" "id:2,phase:1,pass"
        "#;
        let (ruleset, _) = compile_str(rules).unwrap();
        assert_eq!(
            ruleset.marker_index(Phase::RequestHeaders, "AFTER_FIRST"),
            Some(1)
        );
        assert_eq!(ruleset.marker_index(Phase::RequestBody, "AFTER_FIRST"), Some(0));
        assert_eq!(ruleset.marker_index(Phase::RequestHeaders, "MISSING"), None);
    }

    #[test]
    fn test_marker_by_rule_id() {
        let rules = r#"
            SecRule REQUEST_URI "@rx a" "id:100,phase:1,pass"
            SecRule REQUEST_URI "@rx b" "id:200,phase:1,pass"
        "#;
        let (ruleset, _) = compile_str(rules).unwrap();
        // Skipping after rule 100 lands on index 1.
        assert_eq!(ruleset.marker_index(Phase::RequestHeaders, "100"), Some(1));
    }

    #[test]
    fn test_config_directives_flow_through() {
        let rules = r#"
            SecRequestBodyAccess On
            SecRequestBodyLimit 1048576
            SecRequestBodyInMemoryLimit 65536
            SecAuditEngine RelevantOnly
        "#;
        let (_, config) = compile_str(rules).unwrap();
        assert!(config.request_body_access);
        assert_eq!(config.request_body_limit, 1_048_576);
        assert_eq!(config.request_body_in_memory_limit, 65_536);
    }

    #[test]
    fn test_invalid_limits_rejected() {
        assert!(compile_str("SecRequestBodyLimit 0").is_err());
    }

    #[test]
    fn test_sec_action_compiles_unconditional() {
        let (ruleset, _) =
            compile_str(r#"SecAction "id:900,phase:1,nolog,pass,setvar:tx.level=2""#).unwrap();
        let rule = &ruleset.rules_for_phase(Phase::RequestHeaders)[0];
        assert!(rule.targets.is_empty());
        assert_eq!(rule.setvars.len(), 1);
        assert!(!rule.log);
    }
}
