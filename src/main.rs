//! rampart CLI: check rule files, test requests, dump compiled rules.

use clap::{Parser, Subcommand};
use rampart::engine::Phase;
use rampart::{Result, Transaction, Waf};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "rampart")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that a rules file parses and compiles
    Check {
        /// Path to the rules file
        #[arg(short, long)]
        rules: PathBuf,
    },

    /// Run a request (and optionally a response) through the rules
    Test {
        /// Path to the rules file
        #[arg(short, long)]
        rules: PathBuf,

        /// Request URI
        #[arg(short, long)]
        uri: String,

        /// Request method
        #[arg(short, long, default_value = "GET")]
        method: String,

        /// Request headers ("Name: Value", repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        /// Request body
        #[arg(short, long)]
        body: Option<String>,

        /// Client address for REMOTE_ADDR
        #[arg(long, default_value = "127.0.0.1")]
        remote_addr: String,

        /// Response status; enables phases 3-4
        #[arg(long)]
        response_status: Option<u16>,

        /// Response headers ("Name: Value", repeatable)
        #[arg(long = "response-header")]
        response_headers: Vec<String>,

        /// Response body
        #[arg(long)]
        response_body: Option<String>,
    },

    /// Print the compiled rules by phase
    Dump {
        /// Path to the rules file
        #[arg(short, long)]
        rules: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Check { rules } => check_rules(&rules),
        Commands::Test {
            rules,
            uri,
            method,
            headers,
            body,
            remote_addr,
            response_status,
            response_headers,
            response_body,
        } => test_request(
            &rules,
            &uri,
            &method,
            &headers,
            body.as_deref(),
            &remote_addr,
            response_status,
            &response_headers,
            response_body.as_deref(),
        ),
        Commands::Dump { rules } => dump_rules(&rules),
    }
}

fn check_rules(path: &PathBuf) -> Result<()> {
    let waf = Waf::from_file(path)?;
    println!("Successfully compiled {} rules", waf.rule_count());
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn test_request(
    rules_path: &PathBuf,
    uri: &str,
    method: &str,
    headers: &[String],
    body: Option<&str>,
    remote_addr: &str,
    response_status: Option<u16>,
    response_headers: &[String],
    response_body: Option<&str>,
) -> Result<()> {
    info!(rules = %rules_path.display(), "loading rules");
    let waf = Waf::from_file(rules_path)?;
    let mut tx = waf.new_transaction();

    tx.process_connection(remote_addr, 0, "127.0.0.1", 80)?;
    tx.process_uri(uri, method, "HTTP/1.1")?;
    for header in headers {
        if let Some((name, value)) = header.split_once(':') {
            tx.add_request_header(name.trim(), value.trim())?;
        }
    }

    tx.process_request_headers()?;
    if report_interruption(&tx, 1) {
        return finish(&mut tx);
    }

    if let Some(body) = body {
        tx.append_request_body(body.as_bytes())?;
    }
    tx.process_request_body()?;
    if report_interruption(&tx, 2) {
        return finish(&mut tx);
    }

    if let Some(status) = response_status {
        for header in response_headers {
            if let Some((name, value)) = header.split_once(':') {
                tx.add_response_header(name.trim(), value.trim())?;
            }
        }
        tx.process_response_headers(status, "HTTP/1.1")?;
        if report_interruption(&tx, 3) {
            return finish(&mut tx);
        }

        if let Some(body) = response_body {
            tx.append_response_body(body.as_bytes())?;
        }
        tx.process_response_body()?;
        if report_interruption(&tx, 4) {
            return finish(&mut tx);
        }
    }

    println!("ALLOWED");
    println!("  Matched rules: {}", format_matches(&tx));
    finish(&mut tx)
}

fn report_interruption(tx: &Transaction, phase: u8) -> bool {
    match tx.interruption() {
        Some(interruption) => {
            println!("BLOCKED (phase {phase})");
            println!("  Action: {}", interruption.action.name());
            println!("  Status: {}", interruption.status);
            println!("  Rule:   {}", interruption.rule_id);
            if !interruption.data.is_empty() {
                println!("  Data:   {}", interruption.data);
            }
            true
        }
        None => false,
    }
}

fn format_matches(tx: &Transaction) -> String {
    if tx.matched_rules().is_empty() {
        return "none".to_string();
    }
    tx.matched_rules()
        .iter()
        .map(|m| m.rule_id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn finish(tx: &mut Transaction) -> Result<()> {
    tx.process_logging()?;
    Ok(())
}

fn dump_rules(path: &PathBuf) -> Result<()> {
    let waf = Waf::from_file(path)?;
    println!("Total rules: {}", waf.rule_count());

    for phase in Phase::all() {
        let rules = waf.ruleset().rules_for_phase(*phase);
        if rules.is_empty() {
            continue;
        }
        println!("\nPhase {} ({}):", phase.number(), phase.name());
        for rule in rules {
            let chain = if rule.chain_len() > 1 {
                format!(" (chain of {})", rule.chain_len())
            } else {
                String::new()
            };
            println!("  - {} @{}{}", rule.id, rule.operator.name(), chain);
        }
    }

    Ok(())
}
