//! The streaming pipeline: bytes → frames → events → pending message →
//! published snapshots.
//!
//! Each stage is a strict sequential fold over its input; events from one
//! stream are processed in arrival order with no reordering.

pub mod accumulator;
pub mod decoder;
pub mod event;
pub mod scheduler;

pub use accumulator::{Accumulator, Terminal};
pub use decoder::FrameDecoder;
pub use event::{parse_frame, StreamEvent};
pub use scheduler::RenderScheduler;
