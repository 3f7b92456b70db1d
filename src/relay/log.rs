//! Delivery audit log.
//!
//! Every relay send attempt is recorded, successes included. The sink
//! is pluggable so applications can persist records wherever they keep
//! their mail logs.

use chrono::{DateTime, Utc};
use std::sync::Mutex;

/// Record text used for successful deliveries
pub const SUCCESS_MESSAGE: &str = "Mail sent successfully";

/// One send attempt.
#[derive(Debug, Clone)]
pub struct SendLogRecord {
    pub recipient: String,
    pub subject: String,
    pub account_id: u32,
    /// Web services credential the attempt was made with
    pub service_credential: String,
    /// [`SUCCESS_MESSAGE`] or the delivery error
    pub error_message: String,
    pub timestamp: DateTime<Utc>,
}

/// Sink for send attempt records.
pub trait SendLog: Send + Sync {
    fn record(&self, record: SendLogRecord);
}

/// In-memory sink, mainly for tests and short-lived tools.
#[derive(Debug, Default)]
pub struct MemorySendLog {
    records: Mutex<Vec<SendLogRecord>>,
}

impl MemorySendLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<SendLogRecord> {
        self.records.lock().unwrap().clone()
    }
}

impl SendLog for MemorySendLog {
    fn record(&self, record: SendLogRecord) {
        self.records.lock().unwrap().push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_are_kept_in_order() {
        let log = MemorySendLog::new();
        for subject in ["first", "second"] {
            log.record(SendLogRecord {
                recipient: "jdoe".to_string(),
                subject: subject.to_string(),
                account_id: 0,
                service_credential: "secret".to_string(),
                error_message: SUCCESS_MESSAGE.to_string(),
                timestamp: Utc::now(),
            });
        }
        let records = log.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].subject, "first");
        assert_eq!(records[1].subject, "second");
    }
}
