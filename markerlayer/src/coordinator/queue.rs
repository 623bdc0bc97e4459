//! Pending-event queue.
//!
//! Ordering discipline:
//!
//! 1. Preempted events are reinserted at the **front** so they resume before
//!    anything submitted later.
//! 2. Normal submissions append at the tail.
//! 3. When the coordinator picks the next event it first applies a stable
//!    partition that moves `High`-or-better entries ahead of the rest
//!    without disturbing relative order within either group.

use std::collections::VecDeque;

use super::event::{Event, Priority};

/// FIFO-within-tier queue of pending events.
#[derive(Debug, Default)]
pub struct EventQueue {
    items: VecDeque<Event>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event at the tail (normal submission path).
    pub fn push_back(&mut self, event: Event) {
        self.items.push_back(event);
    }

    /// Inserts an event at the front (preemption/resumption path).
    pub fn push_front(&mut self, event: Event) {
        self.items.push_front(event);
    }

    /// Removes and returns the front event.
    pub fn pop_front(&mut self) -> Option<Event> {
        self.items.pop_front()
    }

    /// Stably moves all `High`-or-better entries ahead of the rest.
    ///
    /// Relative order within each group is preserved, so two `Normal`
    /// events never reorder against each other.
    pub fn promote_high(&mut self) {
        if self.items.len() < 2 {
            return;
        }
        let (high, rest): (Vec<Event>, Vec<Event>) = self
            .items
            .drain(..)
            .partition(|event| event.priority >= Priority::High);
        self.items.extend(high);
        self.items.extend(rest);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Iterates pending events in queue order.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.items.iter()
    }

    /// Number of pending events at each priority.
    pub fn priority_counts(&self) -> std::collections::HashMap<Priority, usize> {
        let mut counts = std::collections::HashMap::new();
        for event in &self.items {
            *counts.entry(event.priority).or_insert(0) += 1;
        }
        counts
    }
}
