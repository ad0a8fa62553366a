//! VoicePool: fixed voice slots, allocation and stealing.

use scc_ir::WavetableBank;

use crate::channel::VoiceSet;
use crate::frame::Frame;
use crate::voice::Voice;

/// Identifier for a voice slot in the pool.
pub type VoiceId = usize;

/// Maximum number of simultaneous voices.
pub const MAX_VOICES: usize = 5;

/// Base pan of each slot, spreading the voices across the stereo field.
pub const SLOT_PANS: [f32; MAX_VOICES] = [-0.25, 0.25, 0.0, -0.12, 0.12];

/// Weight of a voice's current gain in its steal score.
const STEAL_GAIN_WEIGHT: f32 = 1.2;

/// Result of an allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Allocation {
    pub id: VoiceId,
    /// Channel the slot was taken from, if it was stolen.
    pub stolen_from: Option<u8>,
}

/// The voice slots. Slots are created once and reused.
#[derive(Clone, Debug)]
pub struct VoicePool {
    voices: [Voice; MAX_VOICES],
}

impl Default for VoicePool {
    fn default() -> Self {
        Self::new()
    }
}

impl VoicePool {
    /// Create a pool with every slot idle.
    pub fn new() -> Self {
        Self { voices: SLOT_PANS.map(Voice::new) }
    }

    /// Return every slot to idle.
    pub fn reset(&mut self) {
        for (voice, &pan) in self.voices.iter_mut().zip(SLOT_PANS.iter()) {
            *voice = Voice::new(pan);
        }
    }

    /// Get a reference to a voice.
    pub fn get(&self, id: VoiceId) -> Option<&Voice> {
        self.voices.get(id)
    }

    /// Get a mutable reference to a voice.
    pub fn get_mut(&mut self, id: VoiceId) -> Option<&mut Voice> {
        self.voices.get_mut(id)
    }

    pub fn voices(&self) -> &[Voice; MAX_VOICES] {
        &self.voices
    }

    /// Count of sounding voices.
    pub fn active_count(&self) -> usize {
        self.voices.iter().filter(|v| v.active).count()
    }

    /// Lowest-numbered idle slot.
    pub fn free_slot(&self) -> Option<VoiceId> {
        self.voices.iter().position(|v| !v.active)
    }

    /// Loudness part of the steal ranking. Lower scores are stolen first.
    pub fn steal_score(voice: &Voice) -> f32 {
        voice.current_gain() * STEAL_GAIN_WEIGHT
    }

    /// Voice to steal at sample `now`: the lowest steal score, then the one
    /// that has sounded longest, then the earliest slot.
    pub fn find_steal_candidate(&self, now: u64) -> VoiceId {
        self.voices
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                Self::steal_score(a)
                    .total_cmp(&Self::steal_score(b))
                    .then_with(|| b.age(now).cmp(&a.age(now)))
            })
            .map_or(0, |(id, _)| id)
    }

    /// Pick a slot for a note starting at sample `now`. A full pool kills
    /// its steal candidate.
    pub fn allocate(&mut self, now: u64) -> Allocation {
        if let Some(id) = self.free_slot() {
            return Allocation { id, stolen_from: None };
        }
        let id = self.find_steal_candidate(now);
        let voice = &mut self.voices[id];
        log::trace!("stealing voice {} (channel {}, note {})", id, voice.channel, voice.note);
        voice.kill();
        Allocation { id, stolen_from: Some(voice.channel) }
    }

    /// Most recently started live voice in `candidates` playing a note other
    /// than `note`.
    pub fn legato_candidate(&self, candidates: VoiceSet, note: u8) -> Option<VoiceId> {
        candidates
            .iter()
            .filter(|&id| {
                let v = &self.voices[id];
                v.active && v.note != note
            })
            .max_by_key(|&id| self.voices[id].started_at)
    }

    /// Kill a voice immediately.
    pub fn kill(&mut self, id: VoiceId) {
        if let Some(voice) = self.voices.get_mut(id) {
            voice.kill();
        }
    }

    /// Start the release of a voice.
    pub fn release(&mut self, id: VoiceId) {
        if let Some(voice) = self.voices.get_mut(id) {
            voice.release();
        }
    }

    /// Render one frame from every voice. Also returns the voices that went
    /// idle during this frame.
    pub fn render_all(&mut self, bank: &WavetableBank) -> (Frame, VoiceSet) {
        let mut mix = Frame::silence();
        let mut finished = VoiceSet::empty();
        for (id, voice) in self.voices.iter_mut().enumerate() {
            if !voice.active {
                continue;
            }
            match bank.get(voice.wavetable) {
                Some(table) => mix.mix(voice.render(table)),
                None => voice.kill(),
            }
            if !voice.active {
                finished.insert(id);
            }
        }
        (mix, finished)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::{ChannelMix, NoteStart};
    use scc_ir::{EnvelopeDef, Instrument, WavetableKey};

    const SR: u32 = 44100;

    fn setup() -> (WavetableBank, Instrument) {
        let bank = WavetableBank::with_builtins();
        let key = bank.key_of("pulse50").unwrap();
        (bank, Instrument::new(key, EnvelopeDef::new(0.0, 0.0, 15, 20.0)))
    }

    fn start(pool: &mut VoicePool, inst: &Instrument, channel: u8, note: u8, at: u64) -> Allocation {
        let alloc = pool.allocate(at);
        let start = NoteStart { channel, note, velocity: 100, at, pitch_ratio: 1.0, sample_rate: SR };
        pool.get_mut(alloc.id).unwrap().start(inst, start, ChannelMix::default());
        alloc
    }

    // === Allocation tests ===

    #[test]
    fn pool_new_is_idle() {
        let pool = VoicePool::new();
        assert_eq!(pool.active_count(), 0);
        assert_eq!(pool.free_slot(), Some(0));
    }

    #[test]
    fn slots_carry_their_base_pan() {
        let pool = VoicePool::new();
        assert!(pool.get(0).unwrap().pan_gains().left > pool.get(0).unwrap().pan_gains().right);
        assert!(pool.get(1).unwrap().pan_gains().right > pool.get(1).unwrap().pan_gains().left);
    }

    #[test]
    fn allocate_uses_lowest_free_slot() {
        let (_, inst) = setup();
        let mut pool = VoicePool::new();
        assert_eq!(start(&mut pool, &inst, 0, 60, 0).id, 0);
        assert_eq!(start(&mut pool, &inst, 0, 62, 0).id, 1);
        pool.kill(0);
        assert_eq!(start(&mut pool, &inst, 0, 64, 0).id, 0);
        assert_eq!(pool.active_count(), 2);
    }

    #[test]
    fn never_more_than_max_voices() {
        let (_, inst) = setup();
        let mut pool = VoicePool::new();
        for i in 0..(MAX_VOICES as u8 * 3) {
            start(&mut pool, &inst, 0, 40 + i, i as u64);
            assert!(pool.active_count() <= MAX_VOICES);
        }
        assert_eq!(pool.active_count(), MAX_VOICES);
    }

    // === Stealing tests ===

    #[test]
    fn steal_prefers_quietest_voice() {
        let (bank, inst) = setup();
        let mut pool = VoicePool::new();
        for i in 0..MAX_VOICES {
            start(&mut pool, &inst, 0, 60 + i as u8, 0);
        }
        // Bring every envelope to full level
        pool.render_all(&bank);
        pool.get_mut(3).unwrap().set_channel_gain(0.1);

        let alloc = start(&mut pool, &inst, 1, 80, 10);
        assert_eq!(alloc.id, 3);
        assert_eq!(alloc.stolen_from, Some(0));
        assert_eq!(pool.get(3).unwrap().note, 80);
    }

    #[test]
    fn steal_prefers_oldest_when_equally_loud() {
        let (bank, inst) = setup();
        let mut pool = VoicePool::new();
        for (i, at) in [500u64, 400, 100, 300, 200].into_iter().enumerate() {
            start(&mut pool, &inst, 0, 60 + i as u8, at);
        }
        pool.render_all(&bank);
        assert_eq!(pool.find_steal_candidate(600), 2);
    }

    #[test]
    fn steal_score_weighs_gain() {
        let (bank, inst) = setup();
        let mut pool = VoicePool::new();
        start(&mut pool, &inst, 0, 60, 1000);
        pool.render_all(&bank);
        let v = pool.get(0).unwrap();
        assert!((VoicePool::steal_score(v) - v.current_gain() * 1.2).abs() < 1e-6);
        assert_eq!(v.age(1500), 500);
        assert_eq!(v.age(10), 0);
    }

    #[test]
    fn loud_old_voice_outlives_quiet_recent_one() {
        let (bank, inst) = setup();
        let mut pool = VoicePool::new();
        // One voice from the start, the rest seconds later
        start(&mut pool, &inst, 0, 60, 0);
        for i in 1..MAX_VOICES {
            start(&mut pool, &inst, 0, 60 + i as u8, 3 * SR as u64 + i as u64);
        }
        pool.render_all(&bank);
        pool.get_mut(2).unwrap().set_channel_gain(0.01);

        let now = 10 * SR as u64;
        assert_eq!(pool.find_steal_candidate(now), 2);
        let alloc = start(&mut pool, &inst, 0, 80, now);
        assert_eq!(alloc.id, 2);
        assert_eq!(pool.get(0).unwrap().note, 60);
    }

    // === Legato tests ===

    #[test]
    fn legato_candidate_is_most_recent_other_note() {
        let (_, inst) = setup();
        let mut pool = VoicePool::new();
        let a = start(&mut pool, &inst, 0, 60, 10).id;
        let b = start(&mut pool, &inst, 0, 62, 20).id;
        let c = start(&mut pool, &inst, 0, 64, 30).id;
        let mut set = VoiceSet::empty();
        set.insert(a);
        set.insert(b);
        set.insert(c);
        assert_eq!(pool.legato_candidate(set, 67), Some(c));
        // Same note is never a candidate
        assert_eq!(pool.legato_candidate(set, 64), Some(b));
    }

    #[test]
    fn legato_candidate_ignores_idle_voices() {
        let (_, inst) = setup();
        let mut pool = VoicePool::new();
        let a = start(&mut pool, &inst, 0, 60, 10).id;
        pool.kill(a);
        let mut set = VoiceSet::empty();
        set.insert(a);
        assert_eq!(pool.legato_candidate(set, 64), None);
    }

    // === Render tests ===

    #[test]
    fn render_silent_when_idle() {
        let bank = WavetableBank::with_builtins();
        let mut pool = VoicePool::new();
        let (frame, finished) = pool.render_all(&bank);
        assert_eq!(frame, Frame::silence());
        assert!(finished.is_empty());
    }

    #[test]
    fn render_reports_finished_voices() {
        let (bank, inst) = setup();
        let mut pool = VoicePool::new();
        let id = start(&mut pool, &inst, 0, 60, 0).id;
        pool.render_all(&bank);
        pool.release(id);
        let mut done = VoiceSet::empty();
        for _ in 0..2000 {
            let (_, finished) = pool.render_all(&bank);
            if !finished.is_empty() {
                done = finished;
                break;
            }
        }
        assert!(done.contains(id));
        assert_eq!(pool.active_count(), 0);
    }

    #[test]
    fn render_kills_voice_with_missing_table() {
        let (bank, mut inst) = setup();
        inst.wavetable = WavetableKey::default();
        let mut pool = VoicePool::new();
        let id = start(&mut pool, &inst, 0, 60, 0).id;
        let (_, finished) = pool.render_all(&bank);
        assert!(finished.contains(id));
        assert!(!pool.get(id).unwrap().active);
    }

    #[test]
    fn reset_silences_everything() {
        let (_, inst) = setup();
        let mut pool = VoicePool::new();
        start(&mut pool, &inst, 0, 60, 0);
        start(&mut pool, &inst, 0, 61, 0);
        pool.reset();
        assert_eq!(pool.active_count(), 0);
    }
}
