//! Bounded, order-preserving conversation history and its durable backends.

mod in_memory;
mod json_file;
mod store;

pub use in_memory::InMemoryStore;
pub use json_file::JsonFileStore;
pub use store::{HistoryStore, HistoryStoreError};

use crate::message::Message;

/// An order-preserving log of exchanged messages, bounded by a configured
/// capacity.
///
/// Eviction removes from the head (oldest) whenever an append pushes the
/// log past capacity. `replace_last` only rewrites content and never
/// triggers eviction; the bound is on message count, not content size.
#[derive(Debug)]
pub struct History {
    messages: Vec<Message>,
    capacity: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            messages: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Restores a history from persisted messages, clamping to capacity the
    /// same way appends do.
    pub fn from_messages(messages: Vec<Message>, capacity: usize) -> Self {
        let mut history = Self::new(capacity);
        history.messages = messages;
        history.evict();
        history
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
        self.evict();
    }

    /// Rewrites the newest entry in place; appends if the log is empty.
    pub fn replace_last(&mut self, message: Message) {
        match self.messages.last_mut() {
            Some(last) => *last = message,
            None => self.messages.push(message),
        }
    }

    /// Removes and returns the newest entry. Used to discard a pending
    /// placeholder when its exchange is abandoned.
    pub fn pop_last(&mut self) -> Option<Message> {
        self.messages.pop()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn evict(&mut self) {
        while self.messages.len() > self.capacity {
            self.messages.remove(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(text: &str) -> Message {
        Message::user().content(text).build()
    }

    #[test]
    fn append_respects_capacity() {
        let mut history = History::new(3);
        for i in 0..10 {
            history.append(user(&i.to_string()));
            assert!(history.len() <= 3);
        }
        let contents: Vec<_> = history.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["7", "8", "9"]);
    }

    #[test]
    fn replace_last_never_evicts() {
        let mut history = History::new(2);
        history.append(user("a"));
        history.append(user("b"));
        let big = Message::assistant().content("x".repeat(1 << 16)).build();
        history.replace_last(big);
        assert_eq!(history.len(), 2);
        assert_eq!(history.messages()[0].content, "a");
    }

    #[test]
    fn replace_last_on_empty_appends() {
        let mut history = History::new(2);
        history.replace_last(user("only"));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn from_messages_clamps_from_the_head() {
        let messages: Vec<_> = (0..5).map(|i| user(&i.to_string())).collect();
        let history = History::from_messages(messages, 2);
        let contents: Vec<_> = history.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["3", "4"]);
    }

    #[test]
    fn zero_capacity_is_clamped_to_one() {
        let mut history = History::new(0);
        history.append(user("a"));
        assert_eq!(history.len(), 1);
    }
}
