use std::time::{Duration, Instant};

use tokio::sync::watch;

use crate::message::Message;

/// Throttles how often the evolving answer is published to observers.
///
/// Event arrival rate is unbounded (a fast backend can emit hundreds of
/// deltas per frame); publishing each one would drown the render side. The
/// scheduler publishes at most once per refresh interval and coalesces the
/// updates in between: each publish carries the latest snapshot, not every
/// intermediate state. Terminal snapshots bypass the throttle so the final
/// state is never dropped.
#[derive(Debug)]
pub struct RenderScheduler {
    interval: Duration,
    last_publish: Option<Instant>,
    publishes: u64,
    tx: watch::Sender<Option<Message>>,
}

impl RenderScheduler {
    pub fn new(interval: Duration) -> (Self, watch::Receiver<Option<Message>>) {
        let (tx, rx) = watch::channel(None);
        (
            Self {
                interval,
                last_publish: None,
                publishes: 0,
                tx,
            },
            rx,
        )
    }

    /// Offers the latest snapshot; publishes it only if the refresh interval
    /// has elapsed since the last publish. Returns whether a publish
    /// happened.
    pub fn update(&mut self, snapshot: &Message) -> bool {
        let due = self
            .last_publish
            .is_none_or(|at| at.elapsed() >= self.interval);
        if due {
            self.publish(snapshot);
        }
        due
    }

    /// Publishes unconditionally. Used for terminal snapshots.
    pub fn finalize(&mut self, snapshot: &Message) {
        self.publish(snapshot);
    }

    /// Clears the published snapshot between sessions.
    pub fn reset(&mut self) {
        self.last_publish = None;
        self.tx.send_replace(None);
    }

    pub fn publish_count(&self) -> u64 {
        self.publishes
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Message>> {
        self.tx.subscribe()
    }

    // send_replace keeps the latest snapshot available to observers that
    // subscribe after the publish.
    fn publish(&mut self, snapshot: &Message) {
        self.last_publish = Some(Instant::now());
        self.publishes += 1;
        self.tx.send_replace(Some(snapshot.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::accumulator::Accumulator;
    use crate::stream::event::StreamEvent;

    #[tokio::test]
    async fn burst_of_updates_is_coalesced() {
        let (mut scheduler, rx) = RenderScheduler::new(Duration::from_millis(33));
        let mut acc = Accumulator::new();

        for i in 0..1000 {
            acc.apply(StreamEvent::TextDelta {
                text: format!("{} ", i),
            });
            scheduler.update(acc.snapshot());
        }
        acc.apply(StreamEvent::Completion {
            citations: vec![],
            run_id: "r1".into(),
            started_at_ms: None,
            ended_at_ms: None,
            debug: None,
        });
        scheduler.finalize(acc.snapshot());

        assert!(scheduler.publish_count() < 1000);
        // The last published snapshot equals the fully folded state.
        let published = rx.borrow().clone().unwrap();
        assert_eq!(published.content, acc.snapshot().content);
        assert_eq!(published.run, acc.snapshot().run);
    }

    #[tokio::test]
    async fn first_update_publishes_immediately() {
        let (mut scheduler, rx) = RenderScheduler::new(Duration::from_secs(10));
        let msg = crate::message::Message::assistant().content("x").build();
        assert!(scheduler.update(&msg));
        assert_eq!(rx.borrow().as_ref().unwrap().content, "x");
    }

    #[tokio::test]
    async fn finalize_bypasses_the_throttle() {
        let (mut scheduler, rx) = RenderScheduler::new(Duration::from_secs(10));
        let first = crate::message::Message::assistant().content("a").build();
        let last = crate::message::Message::assistant().content("ab").build();
        assert!(scheduler.update(&first));
        assert!(!scheduler.update(&last));
        scheduler.finalize(&last);
        assert_eq!(rx.borrow().as_ref().unwrap().content, "ab");
        assert_eq!(scheduler.publish_count(), 2);
    }

    #[tokio::test]
    async fn reset_clears_the_channel() {
        let (mut scheduler, rx) = RenderScheduler::new(Duration::from_millis(1));
        let msg = crate::message::Message::assistant().content("x").build();
        scheduler.update(&msg);
        scheduler.reset();
        assert!(rx.borrow().is_none());
    }
}
