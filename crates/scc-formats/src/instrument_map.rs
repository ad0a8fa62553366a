//! JSON instrument map loader.
//!
//! ```json
//! {
//!   "wavetables": { "buzz": [0, 255, ...] },
//!   "envelopes": { "pluck": { "attack": 2, "decay": 90, "sustain": 6, "release": 120 } },
//!   "programs": { "0": { "wavetable": "pulse25", "envelope": "pluck", "vibrato": true } },
//!   "drums": { "36": { "drumType": "kick" }, "default": { "drumType": "snare" } },
//!   "defaults": { "wavetable": "pulse50", "envelope": { "attack": 5, "decay": 120, "sustain": 10, "release": 150 } }
//! }
//! ```
//!
//! Program and drum entries only override what they name; everything else
//! comes from `defaults`. Unknown wavetable or envelope names fall back with
//! a warning rather than failing the load.

use std::collections::BTreeMap;

use log::{debug, warn};
use scc_ir::{
    DrumType, EnvelopeDef, Instrument, InstrumentMap, Vibrato, Wavetable, WavetableBank,
    WavetableKey, FALLBACK_TABLE, MAX_TABLE_NAME_LEN, NOISE_TABLE, TABLE_LEN,
};
use serde::Deserialize;
use serde_json::Value;

use crate::FormatError;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MapDoc {
    wavetables: BTreeMap<String, Vec<f64>>,
    envelopes: BTreeMap<String, EnvelopeDoc>,
    programs: BTreeMap<String, EntryDoc>,
    drums: BTreeMap<String, EntryDoc>,
    defaults: EntryDoc,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct EntryDoc {
    wavetable: Option<String>,
    envelope: Option<EnvelopeRef>,
    vibrato: Option<bool>,
    vibrato_rate: Option<f32>,
    vibrato_depth: Option<f32>,
    vibrato_fade_ms: Option<f32>,
    portamento: Option<bool>,
    gain: Option<f32>,
    pan: Option<f32>,
    drum_type: Option<String>,
}

/// An envelope given by name or inline.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
enum EnvelopeRef {
    Named(String),
    Inline(EnvelopeDoc),
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
struct EnvelopeDoc {
    attack: f32,
    decay: f32,
    sustain: f64,
    release: f32,
}

impl Default for EnvelopeDoc {
    fn default() -> Self {
        let def = EnvelopeDef::default();
        Self {
            attack: def.attack_ms,
            decay: def.decay_ms,
            sustain: def.sustain_level as f64,
            release: def.release_ms,
        }
    }
}

impl From<EnvelopeDoc> for EnvelopeDef {
    fn from(doc: EnvelopeDoc) -> Self {
        let sustain = if doc.sustain.is_finite() { doc.sustain.round() as i32 } else { 0 };
        EnvelopeDef::new(doc.attack, doc.decay, sustain, doc.release)
    }
}

/// Parse an instrument map from JSON text.
pub fn parse_instrument_map(text: &str) -> Result<InstrumentMap, FormatError> {
    let value: Value = serde_json::from_str(text)?;
    instrument_map_from_value(&value)
}

/// Build an instrument map from an already-parsed JSON value.
pub fn instrument_map_from_value(value: &Value) -> Result<InstrumentMap, FormatError> {
    if !value.is_object() {
        return Err(FormatError::InvalidInstrumentMap("expected a JSON object".into()));
    }
    let doc = MapDoc::deserialize(value)
        .map_err(|e| FormatError::InvalidInstrumentMap(e.to_string()))?;
    Ok(Resolver::new(&doc)?.build(&doc))
}

/// Resolves names against the bank and envelope table while building.
struct Resolver {
    bank: WavetableBank,
    envelopes: BTreeMap<String, EnvelopeDef>,
    fallback_table: WavetableKey,
}

impl Resolver {
    fn new(doc: &MapDoc) -> Result<Self, FormatError> {
        let mut bank = WavetableBank::with_builtins();
        for (name, values) in &doc.wavetables {
            if name.len() > MAX_TABLE_NAME_LEN {
                return Err(FormatError::InvalidInstrumentMap(format!(
                    "wavetable name {name:?} is longer than {MAX_TABLE_NAME_LEN} bytes"
                )));
            }
            match table_bytes(values) {
                Some(bytes) => {
                    bank.insert(Wavetable::from_bytes(name, &bytes));
                }
                None => warn!(
                    "wavetable {name:?} has {} entries, expected {TABLE_LEN}; skipped",
                    values.len()
                ),
            }
        }
        let fallback_table = bank.key_of(FALLBACK_TABLE).unwrap_or_default();
        let envelopes = doc
            .envelopes
            .iter()
            .map(|(name, env)| (name.clone(), EnvelopeDef::from(*env)))
            .collect();
        Ok(Self { bank, envelopes, fallback_table })
    }

    fn build(self, doc: &MapDoc) -> InstrumentMap {
        let base = Instrument::new(self.fallback_table, EnvelopeDef::default());
        let defaults = self.apply(&base, &doc.defaults);

        let noise = self.bank.key_of(NOISE_TABLE).unwrap_or(self.fallback_table);
        let mut drum_base = Instrument::new(noise, EnvelopeDef::percussive());
        drum_base.gain = defaults.gain;
        drum_base.drum = Some(DrumType::Default);

        let mut programs = Vec::new();
        for (key, entry) in &doc.programs {
            match parse_midi_number(key) {
                Some(program) => programs.push((program, self.apply(&defaults, entry))),
                None => warn!("ignoring program entry {key:?}: not a MIDI program number"),
            }
        }

        let mut drums = Vec::new();
        let mut drum_default = None;
        for (key, entry) in &doc.drums {
            let drum = self.apply_drum(&drum_base, &defaults, entry);
            if key == "default" {
                drum_default = Some(drum);
            } else if let Some(note) = parse_midi_number(key) {
                drums.push((note, drum));
            } else {
                warn!("ignoring drum entry {key:?}: not a MIDI note number");
            }
        }

        let mut map = InstrumentMap::new(self.bank, defaults);
        for (program, inst) in programs {
            map.set_program(program, inst);
        }
        for (note, inst) in drums {
            map.set_drum(note, inst);
        }
        if let Some(inst) = drum_default {
            map.set_drum_default(inst);
        }
        debug!(
            "loaded instrument map: {} programs, {} drums, {} wavetables",
            map.program_count(),
            map.drum_count(),
            map.bank().len()
        );
        map
    }

    /// Overlay a melodic entry on `base`.
    fn apply(&self, base: &Instrument, entry: &EntryDoc) -> Instrument {
        let mut inst = base.clone();
        if let Some(name) = &entry.wavetable {
            inst.wavetable = self.wavetable(name, base.wavetable);
        }
        if let Some(env) = &entry.envelope {
            inst.envelope = self.envelope(env, base.envelope);
        }
        inst.vibrato = vibrato_for(base.vibrato, entry);
        if let Some(portamento) = entry.portamento {
            inst.portamento = portamento;
        }
        if let Some(gain) = entry.gain.filter(|g| g.is_finite()) {
            inst.gain = gain.max(0.0);
        }
        if let Some(pan) = entry.pan.filter(|p| p.is_finite()) {
            inst.pan_offset = pan.clamp(-1.0, 1.0);
        }
        inst
    }

    /// Overlay a drum entry on the drum base. Envelopes fall back to the
    /// percussive default, or to the map defaults when a name is unknown.
    fn apply_drum(&self, base: &Instrument, defaults: &Instrument, entry: &EntryDoc) -> Instrument {
        let mut inst = base.clone();
        if let Some(name) = &entry.wavetable {
            inst.wavetable = self.wavetable(name, base.wavetable);
        }
        if let Some(env) = &entry.envelope {
            inst.envelope = self.envelope(env, defaults.envelope);
        }
        if let Some(gain) = entry.gain.filter(|g| g.is_finite()) {
            inst.gain = gain.max(0.0);
        }
        if let Some(pan) = entry.pan.filter(|p| p.is_finite()) {
            inst.pan_offset = pan.clamp(-1.0, 1.0);
        }
        inst.drum = Some(entry.drum_type.as_deref().map_or(DrumType::Default, DrumType::from_name));
        inst
    }

    fn wavetable(&self, name: &str, fallback: WavetableKey) -> WavetableKey {
        self.bank.key_of(name).unwrap_or_else(|| {
            warn!("unknown wavetable {name:?}, using fallback");
            fallback
        })
    }

    fn envelope(&self, env: &EnvelopeRef, fallback: EnvelopeDef) -> EnvelopeDef {
        match env {
            EnvelopeRef::Inline(doc) => EnvelopeDef::from(*doc),
            EnvelopeRef::Named(name) => self.envelopes.get(name).copied().unwrap_or_else(|| {
                warn!("unknown envelope {name:?}, using fallback");
                fallback
            }),
        }
    }
}

fn vibrato_for(base: Option<Vibrato>, entry: &EntryDoc) -> Option<Vibrato> {
    let enabled = entry.vibrato.unwrap_or(base.is_some());
    if !enabled {
        return None;
    }
    let mut vib = base.unwrap_or_default();
    if let Some(rate) = entry.vibrato_rate.filter(|r| r.is_finite()) {
        vib.rate_hz = rate.max(0.0);
    }
    if let Some(depth) = entry.vibrato_depth.filter(|d| d.is_finite()) {
        vib.depth_cents = depth;
    }
    if let Some(fade) = entry.vibrato_fade_ms.filter(|f| f.is_finite()) {
        vib.fade_ms = fade.max(0.0);
    }
    Some(vib)
}

fn table_bytes(values: &[f64]) -> Option<[u8; TABLE_LEN]> {
    if values.len() != TABLE_LEN {
        return None;
    }
    let mut bytes = [0u8; TABLE_LEN];
    for (dst, &v) in bytes.iter_mut().zip(values) {
        *dst = if v.is_finite() { v.round().clamp(0.0, 255.0) as u8 } else { 128 };
    }
    Some(bytes)
}

fn parse_midi_number(key: &str) -> Option<u8> {
    key.trim().parse::<u8>().ok().filter(|n| *n <= 127)
}
