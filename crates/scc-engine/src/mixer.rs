//! Main rendering engine.

use alloc::vec;
use scc_ir::{EventPayload, InstrumentMap, MidiSequence, RenderOptions, RenderResult, Timeline};

use crate::channel::{cc, ChannelState, VoiceSet, NUM_CHANNELS};
use crate::config::EngineConfig;
use crate::event_queue::{EventQueue, QueuedEvent};
use crate::machines::MasteringChain;
use crate::scheduler::schedule_sequence;
use crate::voice::NoteStart;
use crate::voice_pool::{VoiceId, VoicePool};

/// Renders MIDI performances through the voice pool and mastering chain.
///
/// The engine owns every piece of mutable render state; each render starts
/// from a full reset.
pub struct Engine {
    map: InstrumentMap,
    config: EngineConfig,
    channels: [ChannelState; NUM_CHANNELS],
    pool: VoicePool,
    event_queue: EventQueue,
    mastering: MasteringChain,
    /// Melodic pitch multiplier for the current render
    pitch_ratio: f32,
    /// Samples rendered since the last reset
    position: u64,
    /// Samples the current render will produce
    total_samples: u64,
}

impl Engine {
    /// Create an engine for `map` with `config`.
    pub fn new(map: InstrumentMap, config: EngineConfig) -> Self {
        let mut engine = Self {
            map,
            config,
            channels: [ChannelState::with_bend_range(config.bend_range_semitones); NUM_CHANNELS],
            pool: VoicePool::new(),
            event_queue: EventQueue::new(),
            mastering: MasteringChain::new(&config),
            pitch_ratio: 1.0,
            position: 0,
            total_samples: 0,
        };
        engine.reset();
        engine
    }

    pub fn map(&self) -> &InstrumentMap {
        &self.map
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    /// Current render position in samples.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn total_samples(&self) -> u64 {
        self.total_samples
    }

    /// Has the current render produced all its samples?
    pub fn is_finished(&self) -> bool {
        self.position >= self.total_samples
    }

    pub fn pool(&self) -> &VoicePool {
        &self.pool
    }

    /// Controller state of a channel (clamped to 0-15).
    pub fn channel(&self, channel: u8) -> &ChannelState {
        &self.channels[(channel as usize).min(NUM_CHANNELS - 1)]
    }

    /// Return channels, voices, position and effect state to their
    /// initial values. Scheduled events are kept and replay from the start.
    pub fn reset(&mut self) {
        self.channels = [ChannelState::with_bend_range(self.config.bend_range_semitones); NUM_CHANNELS];
        self.pool.reset();
        self.event_queue.reset_cursor();
        self.mastering.stop();
        self.position = 0;
    }

    /// Schedule `sequence` and prepare a render of it.
    pub fn prepare(&mut self, sequence: &MidiSequence, options: &RenderOptions) -> Timeline {
        let timeline = schedule_sequence(sequence, options.speed, &self.map);
        self.load_timeline(&timeline, options);
        timeline
    }

    /// Prepare a render of an already scheduled timeline.
    pub fn load_timeline(&mut self, timeline: &Timeline, options: &RenderOptions) {
        let sr = self.config.sample_rate;
        self.event_queue.load(timeline, sr);
        self.reset();
        self.pitch_ratio = options.pitch_ratio();

        let wanted = timeline.total_samples(sr) as u64;
        let limit = max_samples(self.config.max_duration_secs, sr);
        if wanted > limit {
            log::warn!(
                "performance is {:.1}s, truncating to {:.1}s",
                timeline.total_seconds(),
                self.config.max_duration_secs
            );
        }
        self.total_samples = wanted.min(limit);
        log::debug!(
            "rendering {} samples ({} events) at {} Hz",
            self.total_samples,
            self.event_queue.event_count(),
            sr
        );
    }

    /// Render a whole performance: schedule, synthesize, then master.
    pub fn render(&mut self, sequence: &MidiSequence, options: &RenderOptions) -> RenderResult {
        self.prepare(sequence, options);
        self.render_prepared()
    }

    /// Render the prepared performance from the start.
    pub fn render_prepared(&mut self) -> RenderResult {
        self.reset();
        let frames = self.total_samples as usize;
        let mut left = vec![0.0f32; frames];
        let mut right = vec![0.0f32; frames];

        let written = self.render_block(&mut left, &mut right);
        left.truncate(written);
        right.truncate(written);
        self.mastering.process(&mut left, &mut right);

        let sample_rate = self.config.sample_rate;
        RenderResult {
            left,
            right,
            sample_rate,
            duration: written as f64 / sample_rate.max(1) as f64,
        }
    }

    /// Synthesize the next samples of the prepared render into the buffers,
    /// before mastering. Returns the number of frames written; 0 once the
    /// render is finished. Never allocates.
    pub fn render_block(&mut self, left: &mut [f32], right: &mut [f32]) -> usize {
        #[cfg(feature = "alloc_check")]
        {
            assert_no_alloc::assert_no_alloc(|| self.render_block_inner(left, right))
        }
        #[cfg(not(feature = "alloc_check"))]
        {
            self.render_block_inner(left, right)
        }
    }

    fn render_block_inner(&mut self, left: &mut [f32], right: &mut [f32]) -> usize {
        let remaining = self.total_samples.saturating_sub(self.position);
        let frames = left.len().min(right.len()).min(remaining as usize);
        let gain = self.config.master_gain;

        for i in 0..frames {
            // 1. Events due at or before this sample
            for idx in self.event_queue.drain_until(self.position) {
                let event = self.event_queue.get(idx).copied();
                if let Some(event) = event {
                    self.dispatch(event);
                }
            }

            // 2. Every voice advances once
            let (frame, finished) = self.pool.render_all(self.map.bank());
            for id in finished.iter() {
                self.forget_voice(id);
            }

            left[i] = frame.left * gain;
            right[i] = frame.right * gain;
            self.position += 1;
        }
        frames
    }

    /// Apply one event to channel state and voices.
    pub fn dispatch(&mut self, event: QueuedEvent) {
        let ch = (event.channel as usize).min(NUM_CHANNELS - 1);
        match event.payload {
            EventPayload::NoteOn { note, velocity: 0 } => self.note_off(ch, note),
            EventPayload::NoteOn { note, velocity } => self.note_on(ch, note, velocity),
            EventPayload::NoteOff { note } => self.note_off(ch, note),
            EventPayload::Control { controller, value } => self.control(ch, controller, value),
            EventPayload::Program(program) => self.channels[ch].program = program.min(127),
            EventPayload::PitchBend(value) => {
                self.channels[ch].bend = value.clamp(-8192, 8191);
                let ratio = self.channels[ch].bend_ratio();
                self.for_channel_voices(ch, |v| v.set_bend_ratio(ratio));
            }
            EventPayload::Finish => self.release_everything(),
        }
    }

    fn note_on(&mut self, ch: usize, note: u8, velocity: u8) {
        let note = note.min(127);
        self.retire_note(ch, note);

        let channel = &self.channels[ch];
        let instrument = self.map.resolve(ch as u8, channel.program, note);
        let mix = channel.mix();

        // Legato hand-off source, captured before the pool can reuse it
        let legato = if instrument.portamento && !instrument.is_drum() {
            self.pool
                .legato_candidate(channel.active.union(channel.sustained), note)
                .and_then(|id| self.pool.get(id).map(|v| (id, v.increment(), v.phase(), v.envelope)))
        } else {
            None
        };

        let alloc = self.pool.allocate(self.position);
        if let Some(owner) = alloc.stolen_from {
            self.channels[(owner as usize).min(NUM_CHANNELS - 1)].forget(alloc.id);
        }

        let start = NoteStart {
            channel: ch as u8,
            note,
            velocity,
            at: self.position,
            pitch_ratio: self.pitch_ratio,
            sample_rate: self.config.sample_rate,
        };
        if let Some(voice) = self.pool.get_mut(alloc.id) {
            voice.start(instrument, start, mix);
            if let Some((_, increment, phase, envelope)) = legato {
                voice.glide_from(increment, phase, &envelope);
            }
        }

        if let Some((from, ..)) = legato {
            if from != alloc.id {
                self.pool.kill(from);
                self.channels[ch].forget(from);
            }
        }
        self.channels[ch].active.insert(alloc.id);
    }

    /// Release any voice on `ch` already playing `note`.
    fn retire_note(&mut self, ch: usize, note: u8) {
        let channel = &mut self.channels[ch];
        for id in channel.active.union(channel.sustained).iter() {
            if let Some(voice) = self.pool.get_mut(id) {
                if voice.note == note {
                    voice.release();
                    channel.forget(id);
                }
            }
        }
    }

    fn note_off(&mut self, ch: usize, note: u8) {
        let channel = &mut self.channels[ch];
        for id in channel.active.iter() {
            let Some(voice) = self.pool.get_mut(id) else { continue };
            if voice.note != note {
                continue;
            }
            channel.active.remove(id);
            if channel.sustain_pedal {
                voice.sustain();
                channel.sustained.insert(id);
            } else {
                voice.release();
            }
        }
    }

    fn control(&mut self, ch: usize, controller: u8, value: u8) {
        match controller {
            cc::VOLUME => {
                self.channels[ch].volume = ChannelState::controller_gain(value);
                self.apply_channel_gain(ch);
            }
            cc::EXPRESSION => {
                self.channels[ch].expression = ChannelState::controller_gain(value);
                self.apply_channel_gain(ch);
            }
            cc::PAN => {
                let pan = ChannelState::controller_pan(value);
                self.channels[ch].pan = pan;
                self.for_channel_voices(ch, |v| v.set_channel_pan(pan));
            }
            cc::SUSTAIN => {
                let down = value >= 64;
                self.channels[ch].sustain_pedal = down;
                if !down {
                    self.flush_sustained(ch);
                }
            }
            cc::ALL_SOUND_OFF => {
                self.for_channel_voices(ch, |v| v.kill());
                let channel = &mut self.channels[ch];
                channel.active.clear();
                channel.sustained.clear();
            }
            cc::RESET_CONTROLLERS => {
                self.channels[ch].reset_controllers();
                self.flush_sustained(ch);
                let mix = self.channels[ch].mix();
                self.for_channel_voices(ch, |v| {
                    v.set_channel_gain(mix.gain);
                    v.set_channel_pan(mix.pan);
                    v.set_bend_ratio(mix.bend_ratio);
                });
            }
            cc::ALL_NOTES_OFF => {
                let channel = &mut self.channels[ch];
                for id in channel.active.iter() {
                    if let Some(voice) = self.pool.get_mut(id) {
                        if channel.sustain_pedal {
                            voice.sustain();
                            channel.sustained.insert(id);
                        } else {
                            voice.release();
                        }
                    }
                }
                channel.active.clear();
            }
            _ => {}
        }
    }

    /// Release every pedal-held voice on `ch`.
    fn flush_sustained(&mut self, ch: usize) {
        let channel = &mut self.channels[ch];
        for id in channel.sustained.iter() {
            self.pool.release(id);
        }
        channel.sustained.clear();
    }

    fn apply_channel_gain(&mut self, ch: usize) {
        let gain = self.channels[ch].gain();
        self.for_channel_voices(ch, |v| v.set_channel_gain(gain));
    }

    /// Run `f` on every sounding voice owned by `ch`.
    fn for_channel_voices(&mut self, ch: usize, mut f: impl FnMut(&mut crate::voice::Voice)) {
        for id in 0..crate::voice_pool::MAX_VOICES {
            if let Some(voice) = self.pool.get_mut(id) {
                if voice.active && voice.channel as usize == ch {
                    f(voice);
                }
            }
        }
    }

    /// End of performance: release all voices, pedal or not.
    fn release_everything(&mut self) {
        for id in 0..crate::voice_pool::MAX_VOICES {
            if self.pool.get(id).is_some_and(|v| v.active) {
                self.pool.release(id);
            }
        }
        for channel in &mut self.channels {
            channel.active = VoiceSet::empty();
            channel.sustained = VoiceSet::empty();
            channel.sustain_pedal = false;
        }
    }

    fn forget_voice(&mut self, id: VoiceId) {
        if let Some(voice) = self.pool.get(id) {
            let ch = (voice.channel as usize).min(NUM_CHANNELS - 1);
            self.channels[ch].forget(id);
        }
    }
}

/// Sample budget for `max_secs`; non-finite or negative limits disable it.
fn max_samples(max_secs: f64, sample_rate: u32) -> u64 {
    if !max_secs.is_finite() || max_secs < 0.0 {
        return u64::MAX;
    }
    libm::floor(max_secs * sample_rate as f64) as u64
}
