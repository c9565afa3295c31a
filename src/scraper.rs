//! Extract tagged JSON log lines from bundler output.
//!
//! The app prints `###RN_DEBUG_START###{"type":"warn","payload":...}###RN_DEBUG_END###`;
//! anything else on the stream is plain bundler chatter.

use std::sync::OnceLock;

use chrono::Local;
use regex::Regex;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::types::Envelope;

const DEFAULT_LOG_TYPE: &str = "log";

fn tagged_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"###RN_DEBUG_START###(.*)###RN_DEBUG_END###").expect("static pattern compiles")
    })
}

/// Decoded body of a tagged line.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedLog {
    pub payload: Value,
    pub log_type: String,
}

impl TaggedLog {
    pub fn into_envelope(self) -> Envelope {
        Envelope::structured_log(Local::now(), self.payload, &self.log_type)
    }
}

#[derive(Debug, PartialEq)]
pub enum LineKind {
    /// No markers on the line.
    Plain,
    /// Markers present but the body is not a JSON object with `payload`.
    Malformed,
    Tagged(TaggedLog),
}

pub fn classify_line(line: &str) -> LineKind {
    let Some(caps) = tagged_pattern().captures(line) else {
        return LineKind::Plain;
    };
    let Ok(Value::Object(mut body)) = serde_json::from_str::<Value>(&caps[1]) else {
        return LineKind::Malformed;
    };
    let Some(payload) = body.remove("payload") else {
        return LineKind::Malformed;
    };
    // A non-string type is treated as absent.
    let log_type = body
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_LOG_TYPE)
        .to_string();
    LineKind::Tagged(TaggedLog { payload, log_type })
}

/// Per-stream counters, logged when the stream ends.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScrapeStats {
    pub lines: u64,
    pub forwarded: u64,
    pub dropped: u64,
}

/// Read `reader` line by line and forward every tagged log as an envelope.
///
/// Returns when the stream ends or the hub side of `tx` is gone.
pub async fn forward_lines<R>(
    mut reader: R,
    stream: &'static str,
    tx: mpsc::Sender<Envelope>,
) -> ScrapeStats
where
    R: AsyncBufRead + Unpin,
{
    let mut stats = ScrapeStats::default();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                debug!(target: "bundler", stream, "read error: {e}");
                break;
            }
        }
        // Metro output is not guaranteed to be UTF-8; bad bytes must not end the stream.
        let decoded = String::from_utf8_lossy(&buf);
        let line = decoded.trim();
        if line.is_empty() {
            continue;
        }
        stats.lines += 1;

        match classify_line(line) {
            LineKind::Plain => debug!(target: "bundler", stream, "{line}"),
            LineKind::Malformed => {
                stats.dropped += 1;
                debug!(stream, "dropped malformed tagged line: {line}");
            }
            LineKind::Tagged(log) => {
                if tx.send(log.into_envelope()).await.is_err() {
                    break;
                }
                stats.forwarded += 1;
            }
        }
    }

    info!(
        "Bundler {} closed: {} line(s), {} forwarded, {} malformed",
        stream, stats.lines, stats.forwarded, stats.dropped
    );
    stats
}
