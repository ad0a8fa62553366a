//! Absolute-time events produced by the timeline builder.

use alloc::vec::Vec;

/// A scheduled event in the performance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimelineEvent {
    /// When the event should fire, in seconds from the start
    pub time: f64,
    /// MIDI channel, 0-15
    pub channel: u8,
    /// What the event does
    pub payload: EventPayload,
}

impl TimelineEvent {
    pub fn new(time: f64, channel: u8, payload: EventPayload) -> Self {
        Self { time, channel, payload }
    }

    /// Sample index at which the event fires.
    pub fn sample_index(&self, sample_rate: u32) -> u64 {
        let pos = self.time * sample_rate as f64;
        if pos.is_finite() && pos > 0.0 { libm::floor(pos) as u64 } else { 0 }
    }
}

/// What an event does.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EventPayload {
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8 },
    Control { controller: u8, value: u8 },
    Program(u8),
    /// Signed bend, -8192..=8191
    PitchBend(i16),
    /// End of the performance: release everything, pedal or not
    Finish,
}

/// Time-ordered events plus the sizes the renderer needs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Timeline {
    pub events: Vec<TimelineEvent>,
    /// Nominal performance length in seconds
    pub duration: f64,
    /// Release margin appended after `duration`, in seconds
    pub tail: f64,
}

impl Timeline {
    /// Total rendered length in seconds.
    pub fn total_seconds(&self) -> f64 {
        self.duration + self.tail
    }

    /// Number of output samples at `sample_rate`.
    pub fn total_samples(&self, sample_rate: u32) -> usize {
        let samples = libm::ceil(self.total_seconds() * sample_rate as f64);
        if samples.is_finite() && samples > 0.0 { samples as usize } else { 0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_index_floors() {
        let ev = TimelineEvent::new(0.5, 0, EventPayload::Program(1));
        assert_eq!(ev.sample_index(44100), 22050);
        let ev = TimelineEvent::new(0.00001, 0, EventPayload::Program(1));
        assert_eq!(ev.sample_index(44100), 0);
    }

    #[test]
    fn total_samples_rounds_up() {
        let tl = Timeline { events: Vec::new(), duration: 1.0, tail: 0.00001 };
        assert_eq!(tl.total_samples(44100), 44101);
        let empty = Timeline::default();
        assert_eq!(empty.total_samples(44100), 0);
    }
}
