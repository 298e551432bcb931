//! The WAF engine: configuration snapshot, compiled rules, transactions.

pub mod audit;
pub mod body;
pub mod interruption;
pub mod phase;
pub mod ruleset;
pub mod transaction;

pub use audit::{AuditRecord, DebugSink, DiscardWriter, LogWriter, MemoryWriter, SerialFileWriter};
pub use body::BodyBuffer;
pub use interruption::{Interruption, InterruptionAction};
pub use phase::Phase;
pub use ruleset::{CompiledRule, CompiledRuleset};
pub use transaction::{MatchedRule, Transaction};

use crate::config::WafConfig;
use crate::error::Result;
use crate::parser::Parser;
use crate::variables::{MemoryStore, PersistentStore};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// An immutable, shareable WAF instance.
///
/// Everything in here is read-only after construction; reconfiguration
/// means building a new `Waf` and swapping the handle atomically.
pub struct Waf {
    config: Arc<WafConfig>,
    ruleset: Arc<CompiledRuleset>,
    store: Arc<dyn PersistentStore>,
    audit_writer: Arc<dyn LogWriter>,
    debug: Arc<DebugSink>,
}

impl Waf {
    /// Build from a directive string.
    pub fn from_directives(directives: &str) -> Result<Self> {
        let (ruleset, config) = ruleset::compile_str(directives)?;
        Self::assemble(ruleset, config)
    }

    /// Build from a rules file (Include directives resolve relative to it).
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut parser = Parser::new();
        parser.parse_file(path)?;
        let (ruleset, config) = ruleset::compile(parser.into_directives())?;
        Self::assemble(ruleset, config)
    }

    fn assemble(ruleset: CompiledRuleset, config: WafConfig) -> Result<Self> {
        let audit_writer: Arc<dyn LogWriter> = if config.audit_log_path.is_empty() {
            Arc::new(DiscardWriter)
        } else {
            Arc::new(SerialFileWriter::open(Path::new(&config.audit_log_path))?)
        };
        let debug = Arc::new(DebugSink::open(&config.debug_log_path)?);

        Ok(Self {
            config: Arc::new(config),
            ruleset: Arc::new(ruleset),
            store: Arc::new(MemoryStore::new()),
            audit_writer,
            debug,
        })
    }

    /// Replace the audit writer (embedders, tests).
    pub fn set_audit_writer(&mut self, writer: Arc<dyn LogWriter>) {
        self.audit_writer = writer;
    }

    /// Replace the persistent-collection store.
    pub fn set_persistent_store(&mut self, store: Arc<dyn PersistentStore>) {
        self.store = store;
    }

    /// Create a transaction for one request.
    pub fn new_transaction(&self) -> Transaction {
        Transaction::new(
            Arc::clone(&self.ruleset),
            Arc::clone(&self.config),
            Arc::clone(&self.store),
            Arc::clone(&self.audit_writer),
            Arc::clone(&self.debug),
        )
    }

    /// The compiled ruleset.
    pub fn ruleset(&self) -> &CompiledRuleset {
        &self.ruleset
    }

    /// The configuration snapshot.
    pub fn config(&self) -> &WafConfig {
        &self.config
    }

    /// Total top-level rule count.
    pub fn rule_count(&self) -> usize {
        self.ruleset.rule_count()
    }
}

impl std::fmt::Debug for Waf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Waf")
            .field("rule_count", &self.ruleset.rule_count())
            .field("engine_mode", &format_args!("{:?}", self.ruleset.engine_mode()))
            .finish()
    }
}

/// A pool recycling transactions to avoid per-request allocation churn.
///
/// Returned transactions are reset to their zero state; a pooled
/// transaction is indistinguishable from a fresh one.
#[derive(Default)]
pub struct TransactionPool {
    idle: Mutex<Vec<Transaction>>,
}

impl TransactionPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a transaction, reusing an idle one when available.
    pub fn get(&self, waf: &Waf) -> Transaction {
        let recycled = self.idle.lock().expect("pool lock").pop();
        match recycled {
            Some(mut tx) => {
                tx.reset();
                tx
            }
            None => waf.new_transaction(),
        }
    }

    /// Return a finished transaction to the pool.
    pub fn put(&self, mut tx: Transaction) {
        tx.reset();
        self.idle.lock().expect("pool lock").push(tx);
    }

    /// Number of idle transactions.
    pub fn idle_count(&self) -> usize {
        self.idle.lock().expect("pool lock").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_waf_from_directives() {
        let waf = Waf::from_directives(
            r#"SecRule REQUEST_URI "@contains /admin" "id:1,phase:1,deny""#,
        )
        .unwrap();
        assert_eq!(waf.rule_count(), 1);
    }

    #[test]
    fn test_bad_config_refuses_to_build() {
        assert!(Waf::from_directives("SecRequestBodyLimit 0").is_err());
        assert!(Waf::from_directives(r#"SecRule NOPE "@rx x" "id:1,pass""#).is_err());
        assert!(Waf::from_directives(r#"SecRule ARGS "@rx (" "id:1,pass""#).is_err());
    }

    #[test]
    fn test_pool_recycles() {
        let waf = Waf::from_directives("").unwrap();
        let pool = TransactionPool::new();

        let mut tx = pool.get(&waf);
        tx.process_uri("/x?a=1", "GET", "HTTP/1.1").unwrap();
        pool.put(tx);
        assert_eq!(pool.idle_count(), 1);

        let tx = pool.get(&waf);
        assert!(tx.request().uri.is_empty());
        assert_eq!(pool.idle_count(), 0);
    }

    #[test]
    fn test_audit_relevant_only_writes_on_interruption() {
        let rules = r#"
            SecAuditEngine RelevantOnly
            SecDefaultAction "phase:2,deny,status:501,log,logdata:'WOOOP_BLOCKED_BY_CORAZA_TEST'"
            SecRule REQUEST_URI "/default/block" "id:103,block"
        "#;
        let mut waf = Waf::from_directives(rules).unwrap();
        let writer = Arc::new(MemoryWriter::new());
        waf.set_audit_writer(writer.clone());

        let mut tx = waf.new_transaction();
        tx.process_uri("/default/block", "GET", "HTTP/1.1").unwrap();
        tx.process_request_headers().unwrap();
        tx.process_request_body().unwrap();

        let interruption = tx.interruption().expect("interrupted");
        assert_eq!(interruption.action, InterruptionAction::Deny);
        assert_eq!(interruption.status, 501);
        assert_eq!(interruption.rule_id, 103);

        tx.process_logging().unwrap();
        let records = writer.records();
        assert_eq!(records.len(), 1);
        assert!(records[0].contains("WOOOP_BLOCKED_BY_CORAZA_TEST"));
    }

    #[test]
    fn test_audit_relevant_only_skips_clean_transactions() {
        let rules = r#"
            SecAuditEngine RelevantOnly
            SecRule REQUEST_URI "@contains /bad" "id:1,phase:1,log,deny"
        "#;
        let mut waf = Waf::from_directives(rules).unwrap();
        let writer = Arc::new(MemoryWriter::new());
        waf.set_audit_writer(writer.clone());

        let mut tx = waf.new_transaction();
        tx.process_uri("/fine", "GET", "HTTP/1.1").unwrap();
        tx.process_request_headers().unwrap();
        tx.process_logging().unwrap();

        assert!(writer.records().is_empty());
    }
}
