//! Sample-indexed queue of timeline events.

use alloc::vec::Vec;
use scc_ir::{EventPayload, Timeline};

/// A timeline event resolved to the sample it fires on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QueuedEvent {
    /// Output sample index
    pub at: u64,
    /// MIDI channel, 0-15
    pub channel: u8,
    pub payload: EventPayload,
}

/// Events sorted by sample index.
///
/// During rendering, events are consumed via a cursor that advances forward
/// without removing elements, so draining never allocates.
#[derive(Clone, Debug, Default)]
pub struct EventQueue {
    events: Vec<QueuedEvent>,
    /// Next event index to process.
    cursor: usize,
}

impl EventQueue {
    /// Create a new empty event queue.
    pub fn new() -> Self {
        Self { events: Vec::new(), cursor: 0 }
    }

    /// Replace the contents with `timeline` at `sample_rate`. Events that
    /// land on the same sample keep their timeline order.
    pub fn load(&mut self, timeline: &Timeline, sample_rate: u32) {
        self.events.clear();
        self.events.reserve(timeline.events.len());
        self.events.extend(timeline.events.iter().map(|e| QueuedEvent {
            at: e.sample_index(sample_rate),
            channel: e.channel.min(15),
            payload: e.payload,
        }));
        self.events.sort_by_key(|e| e.at);
        self.cursor = 0;
    }

    /// Return the index range of events at or before `sample`.
    ///
    /// Advances the internal cursor past all consumed events. The returned
    /// range can be used with `get`.
    pub fn drain_until(&mut self, sample: u64) -> core::ops::Range<usize> {
        let start = self.cursor;
        while self.cursor < self.events.len() {
            if self.events[self.cursor].at <= sample {
                self.cursor += 1;
            } else {
                break;
            }
        }
        start..self.cursor
    }

    /// Get an event by index (for use with `drain_until` ranges).
    pub fn get(&self, index: usize) -> Option<&QueuedEvent> {
        self.events.get(index)
    }

    /// Reset cursor to the beginning.
    pub fn reset_cursor(&mut self) {
        self.cursor = 0;
    }

    /// Number of loaded events.
    pub fn event_count(&self) -> usize {
        self.events.len()
    }
}
