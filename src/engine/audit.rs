//! Audit records (parts A-K, Z), log writers, and the debug sink.

use super::transaction::{MatchedRule, Transaction};
use crate::error::{Error, Result};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// A structured audit record: one labeled text block per configured part.
#[derive(Debug, Clone)]
pub struct AuditRecord {
    /// Transaction unique id.
    pub transaction_id: String,
    /// Part letters and their content, in configured order.
    pub parts: Vec<(char, String)>,
}

impl AuditRecord {
    /// Serialize in the native multi-part framing.
    pub fn format_native(&self) -> String {
        let boundary = &self.transaction_id;
        let mut out = String::new();
        for (letter, content) in &self.parts {
            out.push_str(&format!("--{boundary}-{letter}--\n"));
            if !content.is_empty() {
                out.push_str(content);
                if !content.ends_with('\n') {
                    out.push('\n');
                }
            }
        }
        out.push_str(&format!("--{boundary}-Z--\n"));
        out
    }
}

/// Assemble a record from a finished transaction.
///
/// Parts not in `parts` are omitted; `Z` is always emitted by the
/// serializer as the terminator.
pub fn build_record(tx: &Transaction, parts: &str) -> AuditRecord {
    let mut out = Vec::new();
    for letter in parts.chars() {
        let content = match letter {
            'A' => part_header(tx),
            'B' => part_request_headers(tx),
            'C' => tx.request().body.clone(),
            'E' => tx.response().body.clone(),
            'F' => part_response_headers(tx),
            'H' => part_trailer(tx),
            'J' => part_uploaded_files(tx),
            'K' => part_matched_rules(tx),
            // D, G and I are reserved or unimplemented in this engine.
            _ => continue,
        };
        out.push((letter, content));
    }
    AuditRecord {
        transaction_id: tx.id().to_string(),
        parts: out,
    }
}

fn epoch_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn part_header(tx: &Transaction) -> String {
    let req = tx.request();
    format!(
        "[{}] {} {} {} {} {}",
        epoch_seconds(),
        tx.id(),
        req.client_ip,
        req.client_port,
        req.server_ip,
        req.server_port
    )
}

fn part_request_headers(tx: &Transaction) -> String {
    let req = tx.request();
    let mut out = req.request_line();
    out.push('\n');
    for (name, value) in req.headers.iter() {
        out.push_str(&format!("{name}: {value}\n"));
    }
    out
}

fn part_response_headers(tx: &Transaction) -> String {
    let resp = tx.response();
    if resp.status == 0 {
        return String::new();
    }
    let mut out = resp.status_line();
    out.push('\n');
    for (name, value) in resp.headers.iter() {
        out.push_str(&format!("{name}: {value}\n"));
    }
    out
}

fn part_trailer(tx: &Transaction) -> String {
    let mut out = String::new();
    for matched in tx.matched_rules().iter().filter(|m| m.audit_log) {
        out.push_str(&format!("Message: {}\n", matched.format_log()));
    }
    match tx.interruption() {
        Some(i) => out.push_str(&format!("Action: Intercepted ({})\n", i)),
        None => out.push_str("Action: Passed\n"),
    }
    out
}

fn part_uploaded_files(tx: &Transaction) -> String {
    let req = tx.request();
    let mut out = String::new();
    for (field, filename) in req.files.iter() {
        let size = req.files_sizes.first(field).unwrap_or("0");
        out.push_str(&format!("{field}: {filename} ({size} bytes)\n"));
    }
    out
}

fn part_matched_rules(tx: &Transaction) -> String {
    let mut out = String::new();
    for matched in tx.matched_rules() {
        out.push_str(&format!(
            "{} phase:{} {}:{}\n",
            matched.rule_id,
            matched.phase.number(),
            matched.variable,
            matched.value
        ));
    }
    out
}

impl MatchedRule {
    /// ModSecurity-style bracketed log line for this match.
    pub fn format_log(&self) -> String {
        let mut parts = vec![format!("[id \"{}\"]", self.rule_id)];
        if !self.message.is_empty() {
            parts.push(format!("[msg \"{}\"]", self.message));
        }
        if !self.logdata.is_empty() {
            parts.push(format!("[data \"{}\"]", self.logdata));
        }
        if let Some(severity) = self.severity {
            parts.push(format!("[severity \"{}\"]", severity.name()));
        }
        for tag in &self.tags {
            parts.push(format!("[tag \"{}\"]", tag));
        }
        parts.push(format!(
            "[matched_var \"{}\"] [value \"{}\"]",
            self.variable, self.value
        ));
        parts.join(" ")
    }
}

/// An opaque audit record sink.
pub trait LogWriter: Send + Sync {
    /// Persist one record. Failures are best-effort: log and move on.
    fn write(&self, record: &AuditRecord);
}

/// Writer that drops every record.
pub struct DiscardWriter;

impl LogWriter for DiscardWriter {
    fn write(&self, _record: &AuditRecord) {}
}

/// Serial (mutex-guarded) single-file writer.
pub struct SerialFileWriter {
    file: Mutex<File>,
}

impl SerialFileWriter {
    /// Open (append) the audit log file.
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| Error::FileLoad {
                path: path.to_path_buf(),
                source: e,
            })?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl LogWriter for SerialFileWriter {
    fn write(&self, record: &AuditRecord) {
        let mut file = match self.file.lock() {
            Ok(f) => f,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = file
            .write_all(record.format_native().as_bytes())
            .and_then(|_| file.write_all(b"\n"))
        {
            tracing::warn!(error = %e, "audit log write failed");
        }
    }
}

/// In-memory writer for tests and embedding.
#[derive(Default)]
pub struct MemoryWriter {
    records: Mutex<Vec<String>>,
}

impl MemoryWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the formatted records written so far.
    pub fn records(&self) -> Vec<String> {
        self.records.lock().expect("writer lock").clone()
    }
}

impl LogWriter for MemoryWriter {
    fn write(&self, record: &AuditRecord) {
        self.records
            .lock()
            .expect("writer lock")
            .push(record.format_native());
    }
}

/// Debug log sink, resolved from the configured path.
pub enum DebugSink {
    /// "" discards everything.
    Discard,
    /// `/dev/stdout`
    Stdout,
    /// `/dev/stderr`
    Stderr,
    /// Any other path: an owned file, closed on drop.
    File(Mutex<File>),
}

impl DebugSink {
    /// Resolve a debug log path.
    pub fn open(path: &str) -> Result<Self> {
        match path {
            "" => Ok(Self::Discard),
            "/dev/stdout" => Ok(Self::Stdout),
            "/dev/stderr" => Ok(Self::Stderr),
            other => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(other)
                    .map_err(|e| Error::FileLoad {
                        path: other.into(),
                        source: e,
                    })?;
                Ok(Self::File(Mutex::new(file)))
            }
        }
    }

    /// Write one line, best-effort.
    pub fn log(&self, line: &str) {
        match self {
            Self::Discard => {}
            Self::Stdout => {
                let _ = writeln!(std::io::stdout(), "{line}");
            }
            Self::Stderr => {
                let _ = writeln!(std::io::stderr(), "{line}");
            }
            Self::File(file) => {
                let mut file = match file.lock() {
                    Ok(f) => f,
                    Err(poisoned) => poisoned.into_inner(),
                };
                let _ = writeln!(file, "{line}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Waf;

    #[test]
    fn test_record_framing() {
        let record = AuditRecord {
            transaction_id: "abc123".to_string(),
            parts: vec![('A', "header".to_string()), ('H', "trailer".to_string())],
        };
        let text = record.format_native();
        assert!(text.starts_with("--abc123-A--\nheader\n"));
        assert!(text.contains("--abc123-H--\ntrailer\n"));
        assert!(text.ends_with("--abc123-Z--\n"));
    }

    #[test]
    fn test_build_record_parts() {
        let mut tx = Waf::from_directives("").unwrap().new_transaction();
        tx.process_connection("10.0.0.1", 1234, "10.0.0.2", 80).unwrap();
        tx.process_uri("/x", "GET", "HTTP/1.1").unwrap();
        tx.add_request_header("Host", "example.com").unwrap();

        let record = build_record(&tx, "ABH");
        assert_eq!(record.parts.len(), 3);
        assert_eq!(record.parts[0].0, 'A');
        assert!(record.parts[0].1.contains("10.0.0.1"));
        assert!(record.parts[1].1.starts_with("GET /x HTTP/1.1"));
        assert!(record.parts[2].1.contains("Action: Passed"));
    }

    #[test]
    fn test_memory_writer() {
        let writer = MemoryWriter::new();
        writer.write(&AuditRecord {
            transaction_id: "t1".to_string(),
            parts: vec![('A', "x".to_string())],
        });
        assert_eq!(writer.records().len(), 1);
    }

    #[test]
    fn test_debug_sink_resolution() {
        assert!(matches!(DebugSink::open("").unwrap(), DebugSink::Discard));
        assert!(matches!(
            DebugSink::open("/dev/stdout").unwrap(),
            DebugSink::Stdout
        ));
        assert!(matches!(
            DebugSink::open("/dev/stderr").unwrap(),
            DebugSink::Stderr
        ));

        let dir = std::env::temp_dir().join("rampart-debug-test.log");
        let sink = DebugSink::open(dir.to_str().unwrap()).unwrap();
        sink.log("hello");
        assert!(matches!(sink, DebugSink::File(_)));
        let _ = std::fs::remove_file(dir);
    }
}
