//! Boundary formats for the SCC engine.
//!
//! Parses the JSON instrument map and JSON MIDI sequences into the IR, and
//! encodes rendered audio as dithered 16-bit WAV.

mod instrument_map;
mod midi_json;
mod wav_format;

pub use instrument_map::{instrument_map_from_value, parse_instrument_map};
pub use midi_json::{midi_from_value, parse_midi_json};
pub use wav_format::{
    export_wav, frames_to_wav, quantize, read_pcm16_stereo, read_wav_header, to_pcm16, write_wav,
    Dither, ExportOptions, PcmFrame, WavHeader, WAV_HEADER_LEN,
};

use thiserror::Error;

/// Error type for format parsing and encoding.
#[derive(Debug, Error)]
pub enum FormatError {
    /// Input is not well-formed JSON
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// Instrument map has the wrong shape
    #[error("invalid instrument map: {0}")]
    InvalidInstrumentMap(String),
    /// MIDI sequence has the wrong shape
    #[error("invalid MIDI input: {0}")]
    InvalidMidiInput(String),
    /// WAV data could not be read back
    #[error("invalid WAV data: {0}")]
    InvalidWav(&'static str),
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
