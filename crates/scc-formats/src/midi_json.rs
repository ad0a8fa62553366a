//! JSON MIDI sequence loader.
//!
//! Accepts the decoder hand-off shape:
//! `{ "division": 96, "events": [{ "ticks": 0, "type": "noteOn", "channel": 0, "note": 60, "velocity": 100 }] }`.
//! Event data is clamped into MIDI range; events of unknown type are skipped.

use log::{debug, warn};
use scc_ir::{MidiEventKind, MidiSequence};
use serde::Deserialize;
use serde_json::Value;

use crate::FormatError;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct EventDoc {
    ticks: f64,
    #[serde(rename = "type")]
    kind: String,
    channel: Option<f64>,
    note: Option<f64>,
    velocity: Option<f64>,
    controller: Option<f64>,
    value: Option<f64>,
    program: Option<f64>,
    microseconds_per_beat: Option<f64>,
}

/// Parse a MIDI sequence from JSON text.
pub fn parse_midi_json(text: &str) -> Result<MidiSequence, FormatError> {
    let value: Value = serde_json::from_str(text)?;
    midi_from_value(&value)
}

/// Build a MIDI sequence from an already-parsed JSON value.
pub fn midi_from_value(value: &Value) -> Result<MidiSequence, FormatError> {
    let obj = value
        .as_object()
        .ok_or_else(|| invalid("expected a JSON object"))?;

    let division = obj
        .get("division")
        .and_then(Value::as_f64)
        .ok_or_else(|| invalid("missing numeric division"))?;
    if !(1.0..=u16::MAX as f64).contains(&division) {
        return Err(invalid(format!("division {division} out of range")));
    }

    let events = obj
        .get("events")
        .and_then(Value::as_array)
        .ok_or_else(|| invalid("missing events array"))?;

    let mut seq = MidiSequence::new(division as u16);
    let mut skipped = 0usize;
    for (i, raw) in events.iter().enumerate() {
        let doc = EventDoc::deserialize(raw)
            .map_err(|e| invalid(format!("event {i}: {e}")))?;
        match event_kind(&doc) {
            Some(kind) => seq.push(ticks(doc.ticks), kind),
            None => {
                warn!("skipping event {i} of type {:?}", doc.kind);
                skipped += 1;
            }
        }
    }
    debug!(
        "loaded MIDI sequence: division {}, {} events ({skipped} skipped)",
        seq.division,
        seq.events.len()
    );
    Ok(seq)
}

fn invalid(msg: impl Into<String>) -> FormatError {
    FormatError::InvalidMidiInput(msg.into())
}

fn event_kind(doc: &EventDoc) -> Option<MidiEventKind> {
    let channel = doc.channel.map_or(0, |c| clamp_u8(c, 15));
    let kind = match doc.kind.as_str() {
        "tempo" => MidiEventKind::Tempo {
            microseconds_per_beat: doc
                .microseconds_per_beat
                .filter(|v| v.is_finite())
                .map_or(0, |v| v.round().clamp(0.0, u32::MAX as f64) as u32),
        },
        "programChange" => MidiEventKind::ProgramChange {
            channel,
            program: clamp_u8(doc.program.or(doc.value)?, 127),
        },
        "control" => MidiEventKind::Control {
            channel,
            controller: clamp_u8(doc.controller?, 127),
            value: clamp_u8(doc.value?, 127),
        },
        "pitchBend" => MidiEventKind::PitchBend {
            channel,
            value: doc.value.filter(|v| v.is_finite())?.round().clamp(-8192.0, 8191.0) as i16,
        },
        "noteOn" => MidiEventKind::NoteOn {
            channel,
            note: clamp_u8(doc.note?, 127),
            velocity: doc.velocity.map_or(100, |v| clamp_u8(v, 127)),
        },
        "noteOff" => MidiEventKind::NoteOff { channel, note: clamp_u8(doc.note?, 127) },
        _ => return None,
    };
    Some(kind)
}

fn clamp_u8(v: f64, max: u8) -> u8 {
    if v.is_finite() { v.round().clamp(0.0, max as f64) as u8 } else { 0 }
}

fn ticks(v: f64) -> u64 {
    if v.is_finite() && v > 0.0 { v.floor() as u64 } else { 0 }
}
