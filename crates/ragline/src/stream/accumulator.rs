use serde_json::Value;

use crate::message::{error_text, Message, RunMetadata};
use crate::stream::event::StreamEvent;

/// How the accumulation phase ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    /// A `done` frame arrived; the answer is complete.
    Completed,
    /// An in-band error frame arrived. The stream itself worked, so this is
    /// a reported failure, not a transport one.
    Errored,
}

/// Folds the event sequence of one exchange into the pending assistant
/// message.
///
/// The fold is strictly left-to-right and each event is applied exactly once
/// by the session's read loop; nothing here relies on replay safety.
#[derive(Debug)]
pub struct Accumulator {
    message: Message,
    saw_output: bool,
    terminal: Option<Terminal>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self {
            message: Message::assistant().build(),
            saw_output: false,
            terminal: None,
        }
    }

    /// Applies one event to the pending message.
    pub fn apply(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::TextDelta { text } => {
                // Exact concatenation, no trimming.
                self.message.content.push_str(&text);
                self.saw_output = true;
            }
            StreamEvent::Completion {
                citations,
                run_id,
                started_at_ms,
                ended_at_ms,
                debug,
            } => {
                self.message.citations = citations;
                self.message.run = Some(RunMetadata {
                    run_id,
                    started_at_ms,
                    ended_at_ms,
                    debug,
                });
                self.terminal = Some(Terminal::Completed);
            }
            StreamEvent::Error { message } => {
                // A visible error takes priority over partial content.
                self.message.content = error_text(&message);
                self.terminal = Some(Terminal::Errored);
            }
            StreamEvent::Unrecognized { raw } => {
                // Backward compatibility: a new frame type that still carries
                // a text content field is rendered as text.
                if let Some(text) = raw.get("content").and_then(Value::as_str) {
                    self.message.content.push_str(text);
                    self.saw_output = true;
                }
            }
        }
    }

    /// True once a terminal event has been folded.
    pub fn is_terminal(&self) -> bool {
        self.terminal.is_some()
    }

    pub fn terminal(&self) -> Option<Terminal> {
        self.terminal
    }

    /// True once any answer text has been applied.
    pub fn saw_output(&self) -> bool {
        self.saw_output
    }

    /// The current pending message state.
    pub fn snapshot(&self) -> &Message {
        &self.message
    }

    /// Consumes the fold, freezing the message.
    pub fn into_message(self) -> Message {
        self.message
    }
}

impl Default for Accumulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;

    #[test]
    fn folds_deltas_then_completion() {
        let mut acc = Accumulator::new();
        acc.apply(StreamEvent::TextDelta {
            text: "Hello, ".into(),
        });
        acc.apply(StreamEvent::TextDelta {
            text: "world".into(),
        });
        assert!(acc.saw_output());
        assert!(!acc.is_terminal());

        acc.apply(StreamEvent::Completion {
            citations: vec![],
            run_id: "r1".into(),
            started_at_ms: None,
            ended_at_ms: None,
            debug: None,
        });
        assert_eq!(acc.terminal(), Some(Terminal::Completed));

        let message = acc.into_message();
        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.content, "Hello, world");
        assert!(message.citations.is_empty());
        assert_eq!(message.run.as_ref().unwrap().run_id, "r1");
    }

    #[test]
    fn in_band_error_replaces_partial_content() {
        let mut acc = Accumulator::new();
        acc.apply(StreamEvent::TextDelta {
            text: "partial".into(),
        });
        acc.apply(StreamEvent::Error {
            message: "backend overloaded".into(),
        });
        assert_eq!(acc.terminal(), Some(Terminal::Errored));
        assert_eq!(
            acc.into_message().content,
            "Request failed: backend overloaded"
        );
    }

    #[test]
    fn unrecognized_frame_with_content_counts_as_text() {
        let mut acc = Accumulator::new();
        acc.apply(StreamEvent::Unrecognized {
            raw: serde_json::json!({"type": "v2_text", "content": "ok"}),
        });
        assert!(acc.saw_output());
        assert_eq!(acc.snapshot().content, "ok");
    }

    #[test]
    fn unrecognized_frame_without_content_is_inert() {
        let mut acc = Accumulator::new();
        acc.apply(StreamEvent::Unrecognized {
            raw: serde_json::json!({"type": "ping"}),
        });
        assert!(!acc.saw_output());
        assert!(acc.snapshot().content.is_empty());
    }
}
