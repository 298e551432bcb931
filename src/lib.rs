//! # rampart
//!
//! SecLang-compatible web application firewall engine in pure Rust.
//!
//! rampart inspects HTTP transactions against a ModSecurity-style ruleset
//! and either passes them or raises an interruption (deny, drop, redirect,
//! allow) for the embedding server to enforce. No C dependencies, no
//! per-transaction threads: one transaction, one caller, five phases.
//!
//! ## Quick start
//!
//! ```
//! use rampart::Waf;
//!
//! let waf = Waf::from_directives(r#"
//!     SecRule REQUEST_URI "@contains /admin" "id:100,phase:1,log,deny,status:403"
//! "#).unwrap();
//!
//! let mut tx = waf.new_transaction();
//! tx.process_connection("203.0.113.9", 55810, "10.0.0.1", 443).unwrap();
//! tx.process_uri("/admin/panel", "GET", "HTTP/1.1").unwrap();
//! tx.process_request_headers().unwrap();
//!
//! let interruption = tx.interruption().expect("blocked");
//! assert_eq!(interruption.status, 403);
//! tx.process_logging().unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod actions;
pub mod config;
pub mod engine;
pub mod error;
pub mod injection;
pub mod macros;
pub mod operators;
pub mod parser;
pub mod transformations;
pub mod variables;

pub use config::WafConfig;
pub use engine::{
    Interruption, InterruptionAction, MatchedRule, Phase, Transaction, TransactionPool, Waf,
};
pub use error::{Error, Result};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
