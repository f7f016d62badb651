//! Foreign-call trace.
//!
//! Every dispatch is appended here in dispatch order, linked or not. For an
//! unlinked module the trace is the whole story: the record plus the opaque
//! token returned to the program are the only effects the call has.

use std::fmt;
use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::runtime::value::Value;

/// One dispatched call. Arguments are rendered at dispatch time so the
/// record stays meaningful after the values are gone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceRecord {
    pub module: String,
    pub symbol: String,
    pub args: Vec<String>,
    /// Token of the opaque reference handed back, for unlinked modules.
    pub token: Option<u64>,
}

impl TraceRecord {
    pub fn new(module: &str, symbol: &str, args: &[Value], token: Option<u64>) -> Self {
        TraceRecord {
            module: module.to_string(),
            symbol: symbol.to_string(),
            args: args.iter().map(|arg| arg.to_string()).collect(),
            token,
        }
    }
}

impl fmt::Display for TraceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CALL {}.{}({})",
            self.module,
            self.symbol,
            self.args.join(", ")
        )
    }
}

/// Shared append-only log. Cloning shares the underlying records; the
/// bridge writes, everyone else snapshots.
#[derive(Debug, Clone, Default)]
pub struct TraceLog {
    records: Arc<Mutex<Vec<TraceRecord>>>,
}

impl TraceLog {
    pub fn new() -> Self {
        TraceLog::default()
    }

    pub fn record(&self, record: TraceRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record);
        }
    }

    pub fn snapshot(&self) -> Vec<TraceRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_display() {
        let record = TraceRecord::new(
            "trace",
            "print",
            &[Value::str("hello"), Value::Int(2)],
            Some(0),
        );
        assert_eq!(record.to_string(), "CALL trace.print(\"hello\", 2)");
    }

    #[test]
    fn test_log_snapshot_preserves_order() {
        let log = TraceLog::new();
        log.record(TraceRecord::new("a", "x", &[], None));
        log.record(TraceRecord::new("b", "y", &[Value::Int(1)], Some(3)));

        let records = log.snapshot();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].module, "a");
        assert_eq!(records[1].token, Some(3));
    }

    #[test]
    fn test_record_serializes_to_json() {
        let record = TraceRecord::new("calc", "add", &[Value::Int(1), Value::Int(2)], None);
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"module\":\"calc\""));
        assert!(json.contains("\"args\":[\"1\",\"2\"]"));
    }
}
