//! Orchestration of one request/response exchange: transport selection,
//! streaming consumption, fallback, and history bookkeeping.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;

use crate::config::SurfaceConfig;
use crate::history::{History, HistoryStore};
use crate::message::{error_text, Message, RunMetadata};
use crate::stream::{parse_frame, Accumulator, FrameDecoder, RenderScheduler, StreamEvent, Terminal};
use crate::transport::{ChatRequest, ChatTransport};

const RUN_NOTICE_BUFFER: usize = 64;

/// Lifecycle of one in-flight exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Sending,
    StreamingActive,
    Finalizing,
    /// The streaming transport failed before any output was shown; the
    /// exchange is being re-issued through the non-streaming path.
    FailedFallback,
    Done,
}

/// Broadcast to external observers each time a session reaches `Done` with
/// run bookkeeping attached. Fire and forget.
#[derive(Debug, Clone, Serialize)]
pub struct RunNotice {
    pub run_id: String,
    pub started_at_ms: Option<i64>,
    pub ended_at_ms: Option<i64>,
}

enum StreamOutcome {
    /// A terminal event was folded, or a mid-stream failure froze the
    /// partial content as the final message.
    Finished(Message),
    /// The stream failed before any output was shown; retry through the
    /// non-streaming transport. The flag reports whether an (empty)
    /// placeholder was already appended to history and must be discarded.
    FallbackNeeded { pending_in_history: bool },
    Cancelled { pending_in_history: bool },
}

/// The chat surface's session controller.
///
/// Owns the conversation history and drives one exchange at a time; sending
/// requires `&mut self`, so there is never a concurrent-session race to
/// arbitrate. All history mutations go through this controller (or an
/// explicit [`clear`](Self::clear)).
pub struct ChatSurface {
    transport: Arc<dyn ChatTransport>,
    store: Arc<dyn HistoryStore>,
    config: SurfaceConfig,
    history: History,
    scheduler: RenderScheduler,
    runs: broadcast::Sender<RunNotice>,
    cancel: CancellationToken,
    state: SessionState,
    /// Sticky capability flag: once streaming fails for any reason, later
    /// sends in this surface's lifetime skip straight to non-streaming.
    streaming_available: bool,
    conversation_id: Option<String>,
}

impl ChatSurface {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        store: Arc<dyn HistoryStore>,
        config: SurfaceConfig,
    ) -> Self {
        let (scheduler, _) = RenderScheduler::new(Duration::from_millis(config.render_interval_ms));
        let (runs, _) = broadcast::channel(RUN_NOTICE_BUFFER);
        let history = History::new(config.history_capacity);
        let conversation_id = config.conversation_id.clone();
        Self {
            transport,
            store,
            config,
            history,
            scheduler,
            runs,
            cancel: CancellationToken::new(),
            state: SessionState::Idle,
            streaming_available: true,
            conversation_id,
        }
    }

    /// Like [`new`](Self::new), but restores persisted history first,
    /// clamped to the configured capacity.
    pub async fn resume(
        transport: Arc<dyn ChatTransport>,
        store: Arc<dyn HistoryStore>,
        config: SurfaceConfig,
    ) -> Result<Self, crate::history::HistoryStoreError> {
        let messages = store.load().await?;
        let mut surface = Self::new(transport, store, config);
        surface.history = History::from_messages(messages, surface.config.history_capacity);
        Ok(surface)
    }

    /// Sends one user message and drives the exchange to completion.
    ///
    /// Never fails from the caller's perspective: transport failures end in
    /// a fallback attempt or a visible assistant error message. Returns the
    /// final assistant message, or `None` if the exchange was cancelled.
    pub async fn send(&mut self, text: &str) -> Option<Message> {
        self.set_state(SessionState::Sending);
        self.history.append(Message::user().content(text).build());
        self.persist().await;

        let request = ChatRequest::new(&self.config, self.conversation_id.clone(), text);
        let use_streaming = self.streaming_available && !self.config.fast_mode;

        let final_message = if use_streaming {
            match self.stream_exchange(&request).await {
                StreamOutcome::Finished(message) => message,
                StreamOutcome::FallbackNeeded { pending_in_history } => {
                    // Inert frames may have published an empty placeholder;
                    // drop it so the fallback appends the only assistant turn.
                    if pending_in_history {
                        self.history.pop_last();
                    }
                    self.streaming_available = false;
                    self.set_state(SessionState::FailedFallback);
                    self.single_shot_exchange(request).await
                }
                StreamOutcome::Cancelled { pending_in_history } => {
                    if pending_in_history {
                        self.history.pop_last();
                    }
                    self.scheduler.reset();
                    self.cancel = CancellationToken::new();
                    self.set_state(SessionState::Idle);
                    return None;
                }
            }
        } else {
            self.single_shot_exchange(request).await
        };

        self.persist().await;
        if let Some(run) = &final_message.run {
            let _ = self.runs.send(RunNotice {
                run_id: run.run_id.clone(),
                started_at_ms: run.started_at_ms,
                ended_at_ms: run.ended_at_ms,
            });
        }
        self.set_state(SessionState::Done);
        Some(final_message)
    }

    /// Cancels any in-flight exchange, wipes the history, and persists the
    /// empty record.
    pub async fn clear(&mut self) {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
        self.history.clear();
        self.persist().await;
        self.scheduler.reset();
        self.set_state(SessionState::Idle);
    }

    /// A token observers can trigger to abort the consumer side of the
    /// active read loop. The network reader itself is dropped best-effort.
    pub fn cancel_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Coalesced snapshots of the in-progress assistant message.
    pub fn subscribe_snapshots(&self) -> watch::Receiver<Option<Message>> {
        self.scheduler.subscribe()
    }

    /// Run notices emitted each time a session reaches `Done`.
    pub fn subscribe_runs(&self) -> broadcast::Receiver<RunNotice> {
        self.runs.subscribe()
    }

    pub fn history(&self) -> &[Message] {
        self.history.messages()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    async fn stream_exchange(&mut self, request: &ChatRequest) -> StreamOutcome {
        let mut stream = match self.transport.open_stream(request).await {
            Ok(stream) => stream,
            Err(e) => {
                log::debug!("streaming transport unavailable: {}", e);
                return StreamOutcome::FallbackNeeded {
                    pending_in_history: false,
                };
            }
        };
        self.set_state(SessionState::StreamingActive);

        let mut decoder = FrameDecoder::new();
        let mut acc = Accumulator::new();
        let mut pending_in_history = false;
        let cancel = self.cancel.clone();

        'read: loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => {
                    return StreamOutcome::Cancelled { pending_in_history };
                }
                next = stream.next() => next,
            };
            match next {
                Some(Ok(chunk)) => {
                    let lines = match decoder.push(&chunk) {
                        Ok(lines) => lines,
                        Err(e) => {
                            // Raw bytes cannot be safely recovered; fold a
                            // generic in-band error if output is already on
                            // screen, otherwise retry via fallback.
                            log::warn!("stream decode failed: {}", e);
                            if !acc.saw_output() {
                                return StreamOutcome::FallbackNeeded { pending_in_history };
                            }
                            self.streaming_available = false;
                            acc.apply(StreamEvent::Error {
                                message: "response stream could not be decoded".into(),
                            });
                            break 'read;
                        }
                    };
                    for line in lines {
                        if let Some(event) = parse_frame(&line) {
                            acc.apply(event);
                            if acc.is_terminal() {
                                break 'read;
                            }
                            self.publish_pending(&mut pending_in_history, &acc);
                        }
                    }
                }
                Some(Err(e)) => {
                    log::warn!("streaming transport failed: {}", e);
                    if !acc.saw_output() {
                        return StreamOutcome::FallbackNeeded { pending_in_history };
                    }
                    // Mid-stream failure: some output has been shown, so a
                    // fallback would duplicate or conflict with it. The
                    // partial content becomes the final, visibly incomplete
                    // answer, and later sends skip straight to non-streaming.
                    self.streaming_available = false;
                    break 'read;
                }
                None => {
                    match decoder.finish() {
                        Ok(Some(tail)) => {
                            if let Some(event) = parse_frame(&tail) {
                                acc.apply(event);
                            }
                        }
                        Ok(None) => {}
                        Err(e) => log::warn!("stream tail decode failed: {}", e),
                    }
                    if !acc.is_terminal() {
                        if !acc.saw_output() {
                            return StreamOutcome::FallbackNeeded { pending_in_history };
                        }
                        // Stream ended without a terminal frame.
                        self.streaming_available = false;
                    }
                    break 'read;
                }
            }
        }

        self.set_state(SessionState::Finalizing);
        if acc.terminal() == Some(Terminal::Errored) {
            log::warn!("backend reported an in-band error: {}", acc.snapshot().content);
        }
        let message = acc.into_message();
        self.scheduler.finalize(&message);
        if pending_in_history {
            self.history.replace_last(message.clone());
        } else {
            self.history.append(message.clone());
        }
        StreamOutcome::Finished(message)
    }

    /// Single JSON request/response exchange, normalized into the same
    /// message shape the streaming path produces.
    async fn single_shot_exchange(&mut self, request: ChatRequest) -> Message {
        let request = request.non_streaming();
        let message = match self.transport.complete(&request).await {
            Ok(body) => {
                if body.conversation_id.is_some() {
                    self.conversation_id = body.conversation_id;
                }
                let mut message = Message::assistant().content(body.message.content).build();
                message.citations = body.sources;
                message.run = body.run_id.map(|run_id| RunMetadata {
                    run_id,
                    started_at_ms: body.started_at_ms,
                    ended_at_ms: body.ended_at_ms,
                    debug: body.debug,
                });
                message
            }
            Err(e) => {
                log::warn!("non-streaming transport failed: {}", e);
                Message::assistant().content(error_text(&e.to_string())).build()
            }
        };
        self.scheduler.finalize(&message);
        self.history.append(message.clone());
        message
    }

    /// Applies a coalesced snapshot of the pending message to history. The
    /// placeholder is appended on the first publish and rewritten in place
    /// afterwards; nothing is persisted until finalization.
    fn publish_pending(&mut self, pending_in_history: &mut bool, acc: &Accumulator) {
        let snapshot = acc.snapshot();
        if self.scheduler.update(snapshot) {
            if *pending_in_history {
                self.history.replace_last(snapshot.clone());
            } else {
                self.history.append(snapshot.clone());
                *pending_in_history = true;
            }
        }
    }

    async fn persist(&self) {
        if let Err(e) = self.store.save(self.history.messages()).await {
            log::error!("failed to persist chat history: {}", e);
        }
    }

    fn set_state(&mut self, next: SessionState) {
        if self.state != next {
            log::debug!("session state: {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }
}
