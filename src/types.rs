//! Messages pushed to viewers.

use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::Value;

/// Wall-clock format used in every envelope.
const TIMESTAMP_FMT: &str = "%H:%M:%S";

/// Monotonic id handed to each viewer connection.
pub type ViewerId = u64;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Envelope {
    /// One tagged log line scraped from the bundler.
    StructuredLog {
        timestamp: String,
        payload: Value,
        #[serde(rename = "logType")]
        log_type: String,
    },
    /// Bridge-side notice (e.g. the greeting a viewer gets on connect).
    Status { timestamp: String, message: String },
}

impl Envelope {
    pub fn structured_log(at: DateTime<Local>, payload: Value, log_type: &str) -> Self {
        Envelope::StructuredLog {
            timestamp: at.format(TIMESTAMP_FMT).to_string(),
            payload,
            log_type: log_type.to_uppercase(),
        }
    }

    pub fn status(message: impl Into<String>) -> Self {
        Envelope::Status {
            timestamp: Local::now().format(TIMESTAMP_FMT).to_string(),
            message: message.into(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
