//! `ragline` is the message lifecycle engine behind a retrieval-augmented
//! chat surface.
//!
//! # Overview
//! The crate drives one chat exchange end to end:
//!
//! - send a user message over a streaming or single-shot transport
//! - incrementally reconstruct the answer from a live, newline-delimited
//!   byte stream
//! - fall back transparently to the single-shot path when streaming fails
//!   before any output was shown
//! - maintain a bounded, persisted conversation history across both paths
//!
//! # Architecture
//! Bytes flow through [`stream::FrameDecoder`] → [`stream::parse_frame`] →
//! [`stream::Accumulator`] → [`stream::RenderScheduler`], orchestrated by
//! [`session::ChatSurface`], which owns the [`history::History`] and
//! persists it through a [`history::HistoryStore`] backend.

/// Surface configuration, resolved once at construction
pub mod config;

/// Error types and handling
pub mod error;

/// Bounded conversation history and durable storage backends
pub mod history;

/// Chat turn representations
pub mod message;

/// The session controller: one exchange at a time, fallback included
pub mod session;

/// The streaming pipeline: frames, events, accumulation, publishing
pub mod stream;

/// Transport seam between the controller and the retrieval backend
pub mod transport;

pub use config::SurfaceConfig;
pub use error::ChatError;
pub use history::{History, HistoryStore, HistoryStoreError, InMemoryStore, JsonFileStore};
pub use message::{Citation, Message, MessageBuilder, Role, RunMetadata};
pub use session::{ChatSurface, RunNotice, SessionState};
pub use stream::{Accumulator, FrameDecoder, RenderScheduler, StreamEvent, Terminal};
pub use transport::{
    ByteStream, ChatRequest, ChatResponseBody, ChatTransport, HttpChatTransport,
};
