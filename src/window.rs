//! Bounded per-user event window
//!
//! Events are held in insertion order and evicted once the window exceeds
//! its count bound or its age bound. Age is measured against the newest
//! event in the window, never against the wall clock, so a window is a pure
//! value: the same inserts always produce the same contents.

use crate::types::InteractionEvent;
use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;

/// Default maximum number of events retained per user
pub const DEFAULT_MAX_EVENTS: usize = 50;

/// Default maximum event age relative to the newest event, in minutes
pub const DEFAULT_MAX_AGE_MIN: i64 = 10;

/// Ordered, bounded sequence of interaction events for one user.
#[derive(Debug, Clone)]
pub struct EventWindow {
    events: VecDeque<InteractionEvent>,
    max_events: usize,
    max_age: Duration,
}

impl Default for EventWindow {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_EVENTS, DEFAULT_MAX_AGE_MIN)
    }
}

impl EventWindow {
    /// Create a window bounded by event count and age in minutes.
    pub fn new(max_events: usize, max_age_min: i64) -> Self {
        Self {
            events: VecDeque::with_capacity(max_events.min(64)),
            max_events: max_events.max(1),
            max_age: Duration::minutes(max_age_min.max(1)),
        }
    }

    /// Insert one event, keeping timestamp order and evicting past bounds.
    pub fn push(&mut self, event: InteractionEvent) {
        // Insertion sort from the back; batches arrive near-ordered.
        let mut idx = self.events.len();
        while idx > 0 && self.events[idx - 1].timestamp > event.timestamp {
            idx -= 1;
        }
        self.events.insert(idx, event);
        self.evict();
    }

    /// Insert a batch of events.
    pub fn extend<I: IntoIterator<Item = InteractionEvent>>(&mut self, events: I) {
        for event in events {
            self.push(event);
        }
    }

    fn evict(&mut self) {
        while self.events.len() > self.max_events {
            self.events.pop_front();
        }
        if let Some(newest) = self.events.back().map(|e| e.timestamp) {
            let horizon = newest - self.max_age;
            while self
                .events
                .front()
                .is_some_and(|e| e.timestamp < horizon)
            {
                self.events.pop_front();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &InteractionEvent> {
        self.events.iter()
    }

    /// Timestamp of the newest event, if any.
    pub fn newest_timestamp(&self) -> Option<DateTime<Utc>> {
        self.events.back().map(|e| e.timestamp)
    }

    /// The last `n` action names, oldest first.
    pub fn recent_actions(&self, n: usize) -> Vec<&str> {
        let skip = self.events.len().saturating_sub(n);
        self.events.iter().skip(skip).map(|e| e.action.as_str()).collect()
    }

    /// The last `n` target names, oldest first.
    pub fn recent_targets(&self, n: usize) -> Vec<&str> {
        let skip = self.events.len().saturating_sub(n);
        self.events.iter().skip(skip).map(|e| e.target.as_str()).collect()
    }

    /// All action names in window order.
    pub fn actions(&self) -> Vec<&str> {
        self.events.iter().map(|e| e.action.as_str()).collect()
    }

    /// Events belonging to one session, in window order.
    pub fn session_events(&self, session_id: &str) -> Vec<&InteractionEvent> {
        self.events
            .iter()
            .filter(|e| e.session_id == session_id)
            .collect()
    }

    /// Number of events within `seconds` of the newest event, counted over
    /// the last `limit` events.
    pub fn recent_event_count(&self, seconds: i64, limit: usize) -> usize {
        let Some(newest) = self.newest_timestamp() else {
            return 0;
        };
        let horizon = newest - Duration::seconds(seconds);
        let skip = self.events.len().saturating_sub(limit);
        self.events
            .iter()
            .skip(skip)
            .filter(|e| e.timestamp >= horizon)
            .count()
    }
}
