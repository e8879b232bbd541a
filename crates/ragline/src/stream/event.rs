use serde::Deserialize;
use serde_json::Value;

use crate::message::Citation;

/// A parsed unit of the streaming wire format.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// A fragment of answer text to append.
    TextDelta { text: String },
    /// Terminal success: the answer is complete and carries its citations
    /// and run bookkeeping.
    Completion {
        citations: Vec<Citation>,
        run_id: String,
        started_at_ms: Option<i64>,
        ended_at_ms: Option<i64>,
        debug: Option<Value>,
    },
    /// Terminal failure reported in-band by a working stream.
    Error { message: String },
    /// A frame with an unknown or missing discriminator. Ignored for control
    /// purposes; kept around so text-like payloads can still be surfaced.
    Unrecognized { raw: Value },
}

/// Wire grammar of a data frame, dispatched on the `type` discriminator.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireFrame {
    Text {
        #[serde(default)]
        content: String,
    },
    Done {
        #[serde(default)]
        sources: Vec<Citation>,
        #[serde(default)]
        run_id: String,
        #[serde(default)]
        started_at_ms: Option<i64>,
        #[serde(default)]
        ended_at_ms: Option<i64>,
        #[serde(default)]
        debug: Option<Value>,
    },
    Error {
        #[serde(default)]
        message: String,
    },
}

/// Sentinel terminator line sent after the last data frame.
const STREAM_TERMINATOR: &str = "[DONE]";

/// Parses one text frame into a stream event.
///
/// Returns `None` for lines that carry no event: blanks, a framing prefix
/// without payload, the sentinel terminator, and malformed JSON. A malformed
/// frame is logged and skipped rather than failing the session; one corrupt
/// frame should not sink an otherwise-good stream.
pub fn parse_frame(line: &str) -> Option<StreamEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let payload = match line.strip_prefix("data:") {
        Some(rest) => rest.trim_start(),
        None => line,
    };
    if payload.is_empty() || payload == STREAM_TERMINATOR {
        return None;
    }

    let value: Value = match serde_json::from_str(payload) {
        Ok(value) => value,
        Err(e) => {
            log::warn!("skipping malformed stream frame: {}", e);
            return None;
        }
    };

    match serde_json::from_value::<WireFrame>(value.clone()) {
        Ok(WireFrame::Text { content }) => Some(StreamEvent::TextDelta { text: content }),
        Ok(WireFrame::Done {
            sources,
            run_id,
            started_at_ms,
            ended_at_ms,
            debug,
        }) => Some(StreamEvent::Completion {
            citations: sources,
            run_id,
            started_at_ms,
            ended_at_ms,
            debug,
        }),
        Ok(WireFrame::Error { message }) => Some(StreamEvent::Error { message }),
        // The upstream protocol may grow new frame types; keep the raw value
        // so text-like payloads can still be rendered.
        Err(_) => Some(StreamEvent::Unrecognized { raw: value }),
    }
}
