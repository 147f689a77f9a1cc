use crate::events::{
    Event,
    EventKey,
};
use std::collections::VecDeque;

/// Bounded recency window of observed events, newest first.
///
/// Only guarantees "no duplicate among the last `capacity` events"; older
/// events fall off the tail and would be admitted again.
#[derive(Debug, Clone)]
pub struct EventWindow {
    events: VecDeque<Event>,
    capacity: usize,
}

impl EventWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Returns `true` if the event was new and is now at the head.
    pub fn admit(&mut self, event: Event) -> bool {
        if self.contains(&event.key()) {
            tracing::trace!(
                category = %event.category,
                block = event.block_height,
                "duplicate event rejected"
            );
            return false;
        }
        self.events.push_front(event);
        self.events.truncate(self.capacity);
        true
    }

    pub fn contains(&self, key: &EventKey) -> bool {
        self.events.iter().any(|existing| existing.key() == *key)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Newest first.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    pub fn to_vec(&self) -> Vec<Event> {
        self.events.iter().cloned().collect()
    }
}
