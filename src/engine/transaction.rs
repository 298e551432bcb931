//! Per-transaction state and the phase scheduler.

use super::audit::{build_record, DebugSink, LogWriter};
use super::body::BodyBuffer;
use super::interruption::Interruption;
use super::phase::Phase;
use super::ruleset::{CompiledRule, CompiledRuleset};
use crate::actions::{DisruptivePlan, SetVarOperation, Severity};
use crate::config::WafConfig;
use crate::error::Result;
use crate::parser::{AuditMode, CtlOption, EngineMode, Variable};
use crate::variables::{
    first_value, resolve_target, BodyProcessor, Collection, CompiledSelector, PersistentStore,
    RequestData, ResponseData,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Severity reported by HIGHEST_SEVERITY before any rule matched.
const NO_SEVERITY: u8 = 255;

static TX_COUNTER: AtomicU64 = AtomicU64::new(0);

fn generate_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let n = TX_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{millis:x}{:04x}", n & 0xffff)
}

/// Record of one rule (or chain) firing.
#[derive(Debug, Clone)]
pub struct MatchedRule {
    /// Top-level rule id.
    pub rule_id: u64,
    /// Phase the match occurred in.
    pub phase: Phase,
    /// Expanded `msg`.
    pub message: String,
    /// Expanded `logdata`.
    pub logdata: String,
    /// Full variable name (e.g. `ARGS:q`).
    pub variable: String,
    /// Collection key of the matched value.
    pub key: String,
    /// The (transformed) value that matched.
    pub value: String,
    /// Whether the rule's action plan interrupts the transaction.
    pub disruptive: bool,
    /// Rule severity.
    pub severity: Option<Severity>,
    /// Rule tags.
    pub tags: Vec<String>,
    /// Error-log flag.
    pub log: bool,
    /// Audit-log flag.
    pub audit_log: bool,
    /// Client address.
    pub client: String,
    /// Server address.
    pub server: String,
}

/// One value that satisfied a rule's operator.
#[derive(Debug, Clone, Default)]
struct LinkMatch {
    variable: String,
    key: String,
    value: String,
}

/// A transaction: the complete record of one request/response inspection.
///
/// Single-owner: exactly one logical caller advances it through the phase
/// entry points, in order. The engine spawns nothing per transaction.
pub struct Transaction {
    ruleset: Arc<CompiledRuleset>,
    config: Arc<WafConfig>,
    store: Arc<dyn PersistentStore>,
    audit_writer: Arc<dyn LogWriter>,
    debug: Arc<DebugSink>,

    id: String,
    started: Instant,
    phase: Phase,
    request: RequestData,
    response: ResponseData,
    tx_data: Collection,
    env_data: Collection,
    geo_data: Collection,
    request_body: BodyBuffer,
    response_body: BodyBuffer,
    matched_rules: Vec<MatchedRule>,
    interruption: Option<Interruption>,
    matched_var: Option<(String, String)>,
    matched_vars: Vec<(String, String)>,
    highest_severity: Option<Severity>,
    collection_keys: HashMap<String, String>,

    engine_override: Option<EngineMode>,
    audit_override: Option<AuditMode>,
    request_body_access_override: Option<bool>,
    response_body_access_override: Option<bool>,

    skip_remaining: u32,
    skip_after: Option<String>,
    terminal: bool,
    logged: bool,
}

impl Transaction {
    pub(super) fn new(
        ruleset: Arc<CompiledRuleset>,
        config: Arc<WafConfig>,
        store: Arc<dyn PersistentStore>,
        audit_writer: Arc<dyn LogWriter>,
        debug: Arc<DebugSink>,
    ) -> Self {
        let request_body = BodyBuffer::new(
            config.request_body_in_memory_limit,
            config.request_body_limit,
        );
        let response_body =
            BodyBuffer::new(config.response_body_limit, config.response_body_limit);
        Self {
            ruleset,
            config,
            store,
            audit_writer,
            debug,
            id: generate_id(),
            started: Instant::now(),
            phase: Phase::RequestHeaders,
            request: RequestData::new(),
            response: ResponseData::new(),
            tx_data: Collection::new(),
            env_data: Collection::new(),
            geo_data: Collection::new(),
            request_body,
            response_body,
            matched_rules: Vec::new(),
            interruption: None,
            matched_var: None,
            matched_vars: Vec::new(),
            highest_severity: None,
            collection_keys: HashMap::new(),
            engine_override: None,
            audit_override: None,
            request_body_access_override: None,
            response_body_access_override: None,
            skip_remaining: 0,
            skip_after: None,
            terminal: false,
            logged: false,
        }
    }

    // ---- lifecycle entry points -------------------------------------------

    /// Record connection endpoints. Must precede all other entry points.
    pub fn process_connection(
        &mut self,
        client_ip: &str,
        client_port: u16,
        server_ip: &str,
        server_port: u16,
    ) -> Result<()> {
        self.request.client_ip = client_ip.to_string();
        self.request.client_port = client_port;
        self.request.server_ip = server_ip.to_string();
        self.request.server_port = server_port;
        Ok(())
    }

    /// Record the request line; parses query arguments.
    pub fn process_uri(&mut self, uri: &str, method: &str, protocol: &str) -> Result<()> {
        self.request.set_uri(uri, method, protocol);
        Ok(())
    }

    /// Record one request header.
    pub fn add_request_header(&mut self, name: &str, value: &str) -> Result<()> {
        self.request.add_header(name, value);
        Ok(())
    }

    /// Run phase 1 rules.
    pub fn process_request_headers(&mut self) -> Result<()> {
        self.phase = Phase::RequestHeaders;
        self.run_phase(Phase::RequestHeaders);
        Ok(())
    }

    /// Buffer a request body chunk, honoring access flag and limits.
    pub fn append_request_body(&mut self, data: &[u8]) -> Result<()> {
        if self.interruption.is_some() || !self.request_body_access() {
            return Ok(());
        }
        match self.request_body.write(data) {
            Ok(_) => {
                if self.request_body.is_truncated() {
                    self.request.inbound_data_error = true;
                }
                Ok(())
            }
            Err(e) => {
                self.terminal = true;
                Err(e)
            }
        }
    }

    /// Run the body processor and phase 2 rules.
    pub fn process_request_body(&mut self) -> Result<()> {
        if self.interruption.is_some() {
            return Ok(());
        }
        self.phase = Phase::RequestBody;
        if self.request_body_access() && !self.request_body.is_empty() {
            let raw = match self.request_body.read_all() {
                Ok(raw) => raw,
                Err(e) => {
                    self.terminal = true;
                    return Err(e);
                }
            };
            self.request.process_body(&raw);
        }
        self.run_phase(Phase::RequestBody);
        Ok(())
    }

    /// Record one response header.
    pub fn add_response_header(&mut self, name: &str, value: &str) -> Result<()> {
        self.response.add_header(name, value);
        Ok(())
    }

    /// Record the status line and run phase 3 rules.
    pub fn process_response_headers(&mut self, status: u16, protocol: &str) -> Result<()> {
        if self.interruption.is_some() {
            return Ok(());
        }
        self.phase = Phase::ResponseHeaders;
        self.response.set_status(status, protocol);
        self.run_phase(Phase::ResponseHeaders);
        Ok(())
    }

    /// Buffer a response body chunk when the MIME type is inspected.
    pub fn append_response_body(&mut self, data: &[u8]) -> Result<()> {
        if self.interruption.is_some() || !self.inspects_response_body() {
            return Ok(());
        }
        match self.response_body.write(data) {
            Ok(_) => {
                if self.response_body.is_truncated() {
                    self.response.outbound_data_error = true;
                }
                Ok(())
            }
            Err(e) => {
                self.terminal = true;
                Err(e)
            }
        }
    }

    /// Run phase 4 rules over the buffered response body.
    pub fn process_response_body(&mut self) -> Result<()> {
        if self.interruption.is_some() || !self.inspects_response_body() {
            return Ok(());
        }
        self.phase = Phase::ResponseBody;
        let raw = match self.response_body.read_all() {
            Ok(raw) => raw,
            Err(e) => {
                self.terminal = true;
                return Err(e);
            }
        };
        self.response.body = String::from_utf8_lossy(&raw).into_owned();
        self.run_phase(Phase::ResponseBody);
        Ok(())
    }

    /// Run phase 5 rules and emit the audit record. Always runs, even after
    /// an interruption or a hard error; releases nothing the caller sees.
    pub fn process_logging(&mut self) -> Result<()> {
        if self.logged {
            return Ok(());
        }
        self.logged = true;
        self.phase = Phase::Logging;
        self.run_phase(Phase::Logging);

        let mode = self.audit_override.unwrap_or(self.config.audit_mode);
        let relevant = match mode {
            AuditMode::Off => false,
            AuditMode::On => true,
            AuditMode::RelevantOnly => {
                self.interruption.is_some()
                    || self.matched_rules.iter().any(|m| m.audit_log && m.log)
            }
        };
        if relevant {
            let record = build_record(self, &self.config.audit_parts);
            self.audit_writer.write(&record);
        }
        Ok(())
    }

    // ---- accessors --------------------------------------------------------

    /// Unique transaction id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Current interruption, if any.
    pub fn interruption(&self) -> Option<&Interruption> {
        self.interruption.as_ref()
    }

    /// Whether an interruption has been recorded.
    pub fn interrupted(&self) -> bool {
        self.interruption.is_some()
    }

    /// All recorded matches in chronological order.
    pub fn matched_rules(&self) -> &[MatchedRule] {
        &self.matched_rules
    }

    /// Whether a hard error marked the transaction terminal.
    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    /// Request-side data.
    pub fn request(&self) -> &RequestData {
        &self.request
    }

    /// Response-side data.
    pub fn response(&self) -> &ResponseData {
        &self.response
    }

    /// The TX collection.
    pub fn tx_data(&self) -> &Collection {
        &self.tx_data
    }

    /// Mutable TX collection, for embedders seeding variables.
    pub fn tx_data_mut(&mut self) -> &mut Collection {
        &mut self.tx_data
    }

    /// The ENV collection (setenv results).
    pub fn env_data(&self) -> &Collection {
        &self.env_data
    }

    /// The GEO collection.
    pub fn geo_data(&self) -> &Collection {
        &self.geo_data
    }

    /// Last matched (name, value).
    pub fn matched_var(&self) -> Option<&(String, String)> {
        self.matched_var.as_ref()
    }

    /// All (name, value) matches of the current rule.
    pub fn matched_vars(&self) -> &[(String, String)] {
        &self.matched_vars
    }

    /// Milliseconds since the transaction was created.
    pub fn duration_millis(&self) -> u128 {
        self.started.elapsed().as_millis()
    }

    /// Numeric value of the most severe match so far (255 when none).
    pub fn highest_severity(&self) -> u8 {
        self.highest_severity.map(|s| s as u8).unwrap_or(NO_SEVERITY)
    }

    /// First value of a variable, for macro expansion.
    pub fn first_value(&self, variable: Variable, key: Option<&str>) -> Option<String> {
        first_value(self, variable, key)
    }

    /// Snapshot of a persistent collection bound to this transaction.
    pub fn persistent_all(&self, collection: &str) -> Vec<(String, String)> {
        match self.persistent_key(collection) {
            Some(key) => self.store.all(collection, &key),
            None => Vec::new(),
        }
    }

    /// Return this transaction to its zero state for pooling.
    pub fn reset(&mut self) {
        self.id = generate_id();
        self.started = Instant::now();
        self.phase = Phase::RequestHeaders;
        self.request = RequestData::new();
        self.response = ResponseData::new();
        self.tx_data.clear();
        self.env_data.clear();
        self.geo_data.clear();
        self.request_body.reset();
        self.request_body.set_limits(
            self.config.request_body_in_memory_limit,
            self.config.request_body_limit,
        );
        self.response_body.reset();
        self.response_body
            .set_limits(self.config.response_body_limit, self.config.response_body_limit);
        self.matched_rules.clear();
        self.interruption = None;
        self.matched_var = None;
        self.matched_vars.clear();
        self.highest_severity = None;
        self.collection_keys.clear();
        self.engine_override = None;
        self.audit_override = None;
        self.request_body_access_override = None;
        self.response_body_access_override = None;
        self.skip_remaining = 0;
        self.skip_after = None;
        self.terminal = false;
        self.logged = false;
    }

    // ---- internals --------------------------------------------------------

    fn request_body_access(&self) -> bool {
        self.request_body_access_override
            .unwrap_or(self.config.request_body_access)
    }

    fn inspects_response_body(&self) -> bool {
        let access = self
            .response_body_access_override
            .unwrap_or(self.config.response_body_access);
        access
            && (self.response.content_type.is_empty()
                || self.config.inspects_response_mime(&self.response.mime_type()))
    }

    fn persistent_key(&self, collection: &str) -> Option<String> {
        if let Some(key) = self.collection_keys.get(collection) {
            return Some(key.clone());
        }
        match collection {
            "ip" if !self.request.client_ip.is_empty() => Some(self.request.client_ip.clone()),
            "global" => Some("global".to_string()),
            "resource" if !self.request.path.is_empty() => Some(self.request.path.clone()),
            _ => None,
        }
    }

    fn effective_mode(&self) -> EngineMode {
        self.engine_override.unwrap_or(self.ruleset.engine_mode())
    }

    fn run_phase(&mut self, phase: Phase) {
        if phase != Phase::Logging && self.interruption.is_some() {
            return;
        }
        if self.effective_mode() == EngineMode::Off {
            return;
        }

        let ruleset = Arc::clone(&self.ruleset);
        let rules = ruleset.rules_for_phase(phase);
        self.skip_remaining = 0;
        self.skip_after = None;

        let mut idx = 0;
        while idx < rules.len() {
            if phase != Phase::Logging && self.interruption.is_some() {
                break;
            }
            // A ctl:ruleEngine=Off takes effect mid-phase.
            if self.effective_mode() == EngineMode::Off {
                break;
            }
            if self.skip_remaining > 0 {
                self.skip_remaining -= 1;
                idx += 1;
                continue;
            }
            if let Some(marker) = self.skip_after.take() {
                match ruleset.marker_index(phase, &marker) {
                    Some(target) if target > idx => {
                        idx = target;
                        continue;
                    }
                    // Marker missing or behind us: the rest of the phase is
                    // skipped, matching the reference behavior.
                    _ => break,
                }
            }

            let rule = &rules[idx];
            self.clear_captures();
            self.matched_vars.clear();

            if let Some(chain_matches) = self.evaluate_chain(rule) {
                self.fire_rule(rule, phase, chain_matches);
            }

            idx += 1;
        }
    }

    /// Evaluate a whole chain; Some iff every link matched.
    fn evaluate_chain(&mut self, rule: &CompiledRule) -> Option<Vec<Vec<LinkMatch>>> {
        let mut out = Vec::with_capacity(rule.chain_len());
        let mut link = Some(rule);
        while let Some(r) = link {
            let matches = self.evaluate_rule(r);
            if matches.is_empty() {
                return None;
            }
            out.push(matches);
            link = r.chain.as_deref();
        }
        Some(out)
    }

    /// Evaluate one rule; returns every value match (one unless multiMatch).
    fn evaluate_rule(&mut self, rule: &CompiledRule) -> Vec<LinkMatch> {
        // SecAction-style rules have no targets and match unconditionally.
        if rule.targets.is_empty() {
            let result = rule.operator.evaluate(self, "");
            let matched = rule.negated ^ result.matched;
            return if matched {
                vec![LinkMatch::default()]
            } else {
                Vec::new()
            };
        }

        let mut pairs: Vec<(Variable, String, String)> = Vec::new();
        for target in rule.targets.iter().filter(|t| !t.exclude) {
            for (key, value) in resolve_target(self, target) {
                pairs.push((target.variable, key, value));
            }
        }
        for exclusion in rule.targets.iter().filter(|t| t.exclude) {
            pairs.retain(|(variable, key, _)| {
                *variable != exclusion.variable || !selector_matches(&exclusion.selector, key)
            });
        }

        let mut out = Vec::new();
        for (variable, key, value) in pairs {
            let name = if key.is_empty() {
                variable.name().to_string()
            } else {
                format!("{}:{}", variable.name(), key)
            };

            let candidates: Vec<String> = if rule.multi_match {
                let mut c = vec![value.clone()];
                c.extend(rule.transformations.apply_stepwise(&value));
                c
            } else {
                vec![rule.transformations.apply(&value).into_owned()]
            };

            for candidate in candidates {
                let result = rule.operator.evaluate(self, &candidate);
                let matched = rule.negated ^ result.matched;
                if !matched {
                    continue;
                }

                if rule.capture && !result.captures.is_empty() {
                    self.apply_captures(&result.captures);
                }
                self.matched_var = Some((name.clone(), candidate.clone()));
                self.matched_vars.push((name.clone(), candidate.clone()));
                out.push(LinkMatch {
                    variable: name.clone(),
                    key: key.clone(),
                    value: candidate,
                });

                if !rule.multi_match {
                    return out;
                }
            }
        }
        out
    }

    /// Apply a matched chain's effects in the required order: every link's
    /// non-disruptive and data actions first, then one disruptive action,
    /// then flow actions.
    fn fire_rule(&mut self, rule: &CompiledRule, phase: Phase, chain_matches: Vec<Vec<LinkMatch>>) {
        let mut links: Vec<&CompiledRule> = Vec::with_capacity(chain_matches.len());
        let mut cursor = Some(rule);
        while let Some(r) = cursor {
            links.push(r);
            cursor = r.chain.as_deref();
        }

        for (link, matches) in links.iter().copied().zip(&chain_matches) {
            // Every non-disruptive action fires once per recorded match,
            // so multiMatch repeats setvar, initcol, ctl and the rest.
            for _ in matches {
                self.apply_setvars(link);
                self.apply_bindings(link);
            }
        }

        if let Some(severity) = rule.severity {
            if self.highest_severity.map_or(true, |s| severity < s) {
                self.highest_severity = Some(severity);
            }
        }

        // One chain-match record for chains; one record per match otherwise.
        let effective = effective_plan(&links);
        let disruptive = effective.map_or(false, |(_, plan)| plan.interrupts());
        let records: Vec<&LinkMatch> = if links.len() > 1 {
            vec![&chain_matches[0][0]]
        } else {
            chain_matches[0].iter().collect()
        };
        for m in records {
            let matched = MatchedRule {
                rule_id: rule.id,
                phase,
                message: rule.msg.as_ref().map(|m| m.expand(self)).unwrap_or_default(),
                logdata: rule
                    .logdata
                    .as_ref()
                    .map(|m| m.expand(self))
                    .unwrap_or_default(),
                variable: m.variable.clone(),
                key: m.key.clone(),
                value: m.value.clone(),
                disruptive,
                severity: rule.severity,
                tags: rule.tags.clone(),
                log: rule.log,
                audit_log: rule.audit_log,
                client: self.request.client_ip.clone(),
                server: self.request.server_ip.clone(),
            };
            if matched.log {
                self.debug.log(&format!("[{}] {}", self.id, matched.format_log()));
                tracing::info!(
                    rule_id = matched.rule_id,
                    phase = phase.number(),
                    variable = %matched.variable,
                    "rule matched"
                );
            }
            self.matched_rules.push(matched);
        }

        // Disruptive action: at most one, from the deepest link declaring
        // one; suppressed outside blocking mode and in phase 5.
        if let Some((link, plan)) = effective {
            if phase == Phase::Logging {
                if plan.interrupts() {
                    tracing::warn!(rule_id = rule.id, "disruptive action ignored in phase 5");
                }
            } else if self.effective_mode() == EngineMode::On {
                self.interruption = match plan {
                    DisruptivePlan::Deny => {
                        Some(Interruption::deny(link.status.unwrap_or(403), rule.id))
                    }
                    DisruptivePlan::Drop => Some(Interruption::drop(rule.id)),
                    DisruptivePlan::Redirect(url) => Some(Interruption::redirect(
                        link.status.unwrap_or(302),
                        url.expand(self),
                        rule.id,
                    )),
                    DisruptivePlan::Allow => Some(Interruption::allow(rule.id)),
                    DisruptivePlan::None | DisruptivePlan::Pass => None,
                };
            }
        }

        // Flow actions adjust the scheduler for subsequent rules.
        for link in &links {
            if link.skip > 0 {
                self.skip_remaining = link.skip;
            }
            if let Some(marker) = &link.skip_after {
                self.skip_after = Some(marker.clone());
            }
        }
    }

    fn apply_setvars(&mut self, rule: &CompiledRule) {
        for op in &rule.setvars {
            let delta = |m: &crate::macros::Macro, tx: &Transaction| -> i64 {
                m.expand(tx).trim().parse().unwrap_or(0)
            };
            match (&op.collection[..], &op.operation) {
                ("tx", SetVarOperation::Assign(value)) => {
                    let value = value.expand(self);
                    self.tx_data.set(op.key.clone(), value);
                }
                ("tx", SetVarOperation::Increment(value)) => {
                    let d = delta(value, self);
                    self.tx_data.increment(&op.key, d);
                }
                ("tx", SetVarOperation::Decrement(value)) => {
                    let d = delta(value, self);
                    self.tx_data.increment(&op.key, -d);
                }
                ("tx", SetVarOperation::Delete) => self.tx_data.remove(&op.key),
                (collection, operation) => {
                    let Some(key) = self.persistent_key(collection) else {
                        tracing::debug!(collection, "setvar on unbound persistent collection");
                        continue;
                    };
                    match operation {
                        SetVarOperation::Assign(value) => {
                            let value = value.expand(self);
                            self.store.set(collection, &key, &op.key, &value);
                        }
                        SetVarOperation::Increment(value) => {
                            let d = delta(value, self);
                            self.store.inc(collection, &key, &op.key, d);
                        }
                        SetVarOperation::Decrement(value) => {
                            let d = delta(value, self);
                            self.store.inc(collection, &key, &op.key, -d);
                        }
                        SetVarOperation::Delete => self.store.remove(collection, &key, &op.key),
                    }
                }
            }
        }

        for setenv in &rule.setenvs {
            let value = setenv.value.expand(self);
            self.env_data.set(setenv.name.clone(), value);
        }
    }

    fn apply_bindings(&mut self, rule: &CompiledRule) {
        for initcol in &rule.initcols {
            let key = initcol.key.expand(self);
            self.collection_keys.insert(initcol.collection.clone(), key);
        }
        if let Some(sid) = &rule.setsid {
            let key = sid.expand(self);
            self.collection_keys.insert("session".to_string(), key);
        }
        if let Some(uid) = &rule.setuid {
            let key = uid.expand(self);
            self.collection_keys.insert("user".to_string(), key);
        }
        for expire in &rule.expirevars {
            if let Some(key) = self.persistent_key(&expire.collection) {
                self.store.expire(
                    &expire.collection,
                    &key,
                    &expire.key,
                    Duration::from_secs(expire.seconds),
                );
            }
        }
        if let Some(script) = &rule.exec {
            tracing::warn!(rule_id = rule.id, script = %script, "exec action is not implemented");
        }
        for ctl in &rule.ctls {
            self.apply_ctl(ctl.option, &ctl.value);
        }
    }

    fn apply_ctl(&mut self, option: CtlOption, value: &str) {
        match option {
            CtlOption::RuleEngine => {
                if let Some(mode) = EngineMode::from_name(value) {
                    self.engine_override = Some(mode);
                }
            }
            CtlOption::AuditEngine => {
                if let Some(mode) = AuditMode::from_name(value) {
                    self.audit_override = Some(mode);
                }
            }
            CtlOption::RequestBodyProcessor => {
                if let Some(processor) = BodyProcessor::from_name(value) {
                    self.request.body_processor = processor;
                }
            }
            CtlOption::RequestBodyAccess => {
                self.request_body_access_override = Some(value.eq_ignore_ascii_case("on"));
            }
            CtlOption::ResponseBodyAccess => {
                self.response_body_access_override = Some(value.eq_ignore_ascii_case("on"));
            }
        }
    }

    fn apply_captures(&mut self, captures: &[String]) {
        for (i, value) in captures.iter().take(10).enumerate() {
            self.tx_data.set(i.to_string(), value.clone());
        }
    }

    fn clear_captures(&mut self) {
        for i in 0..10 {
            self.tx_data.remove(&i.to_string());
        }
    }
}

fn selector_matches(selector: &Option<CompiledSelector>, key: &str) -> bool {
    match selector {
        None => true,
        Some(CompiledSelector::Key(k)) => k.eq_ignore_ascii_case(key),
        Some(CompiledSelector::Regex(re)) => re.is_match(key),
    }
}

/// The deepest chain link declaring a disruptive plan wins.
fn effective_plan<'a>(
    links: &[&'a CompiledRule],
) -> Option<(&'a CompiledRule, &'a DisruptivePlan)> {
    links
        .iter()
        .rev()
        .find(|l| !matches!(l.disruptive, DisruptivePlan::None))
        .map(|l| (*l, &l.disruptive))
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("phase", &self.phase)
            .field("interrupted", &self.interruption.is_some())
            .field("matched_rules", &self.matched_rules.len())
            .finish()
    }
}
