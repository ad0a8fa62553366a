//! Dithered 16-bit PCM conversion and WAV encoding.

use crate::FormatError;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use scc_ir::RenderResult;
use std::io::Write;

/// Size of the canonical RIFF/WAVE/fmt/data header.
pub const WAV_HEADER_LEN: usize = 44;

/// One interleaved stereo sample pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PcmFrame {
    pub left: i16,
    pub right: i16,
}

/// How `export_wav` quantizes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExportOptions {
    /// Add triangular dither before rounding
    pub dither: bool,
    /// Fixed dither seed; `None` draws one from entropy
    pub seed: Option<u64>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self { dither: true, seed: None }
    }
}

impl ExportOptions {
    /// Dithered with a fixed seed, for bit-exact exports.
    pub fn seeded(seed: u64) -> Self {
        Self { dither: true, seed: Some(seed) }
    }

    /// Plain rounding.
    pub fn undithered() -> Self {
        Self { dither: false, seed: None }
    }
}

/// Triangular (TPDF) dither source.
pub struct Dither {
    rng: Option<Pcg32>,
}

impl Dither {
    pub fn seeded(seed: u64) -> Self {
        Self { rng: Some(Pcg32::seed_from_u64(seed)) }
    }

    pub fn off() -> Self {
        Self { rng: None }
    }

    pub fn from_options(options: &ExportOptions) -> Self {
        if !options.dither {
            return Self::off();
        }
        let seed = options.seed.unwrap_or_else(|| {
            let seed = rand::random::<u64>();
            log::debug!("dither seed {seed:#018x}");
            seed
        });
        Self::seeded(seed)
    }

    /// Next offset, `(r1 - r2) / 32768` with `r1`, `r2` uniform in [0, 1).
    pub fn next_offset(&mut self) -> f32 {
        match self.rng.as_mut() {
            Some(rng) => {
                let a: f32 = rng.gen();
                let b: f32 = rng.gen();
                (a - b) / 32768.0
            }
            None => 0.0,
        }
    }
}

/// Quantize one float sample. Out-of-range input clamps to full scale.
pub fn to_pcm16(sample: f32, dither: f32) -> i16 {
    let x = if sample.is_finite() { sample + dither } else { 0.0 };
    (x.clamp(-1.0, 1.0) * 32767.0).round() as i16
}

/// Quantize a render, drawing dither independently for each channel.
pub fn quantize(result: &RenderResult, dither: &mut Dither) -> Vec<PcmFrame> {
    result
        .left
        .iter()
        .zip(result.right.iter())
        .map(|(&l, &r)| {
            let left = to_pcm16(l, dither.next_offset());
            let right = to_pcm16(r, dither.next_offset());
            PcmFrame { left, right }
        })
        .collect()
}

/// Encode a render as a 16-bit stereo WAV file.
pub fn export_wav(
    result: &RenderResult,
    options: &ExportOptions,
) -> Result<Vec<u8>, FormatError> {
    let mut dither = Dither::from_options(options);
    let frames = quantize(result, &mut dither);
    frames_to_wav(&frames, result.sample_rate)
}

// --- Writing ---

pub fn write_wav(w: &mut impl Write, frames: &[PcmFrame], sample_rate: u32) -> std::io::Result<()> {
    let num_channels: u16 = 2;
    let bits_per_sample: u16 = 16;
    let block_align = num_channels * (bits_per_sample / 8);
    let data_size = data_chunk_size(frames.len(), block_align)?;

    write_riff_header(w, data_size)?;
    write_fmt_chunk(w, num_channels, sample_rate, block_align, bits_per_sample)?;
    write_data_chunk(w, frames, data_size)
}

pub fn frames_to_wav(frames: &[PcmFrame], sample_rate: u32) -> Result<Vec<u8>, FormatError> {
    let mut buf = Vec::with_capacity(WAV_HEADER_LEN + frames.len() * 4);
    write_wav(&mut buf, frames, sample_rate)?;
    Ok(buf)
}

/// Byte size of the data chunk; the RIFF size field must still fit in 32 bits.
fn data_chunk_size(frames: usize, block_align: u16) -> std::io::Result<u32> {
    frames
        .checked_mul(block_align as usize)
        .and_then(|size| u32::try_from(size).ok())
        .filter(|&size| size <= u32::MAX - 36)
        .ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{frames} frames do not fit in a WAV file"),
            )
        })
}

fn write_riff_header(w: &mut impl Write, data_size: u32) -> std::io::Result<()> {
    w.write_all(b"RIFF")?;
    w.write_all(&(36 + data_size).to_le_bytes())?;
    w.write_all(b"WAVE")
}

fn write_fmt_chunk(
    w: &mut impl Write,
    num_channels: u16,
    sample_rate: u32,
    block_align: u16,
    bits_per_sample: u16,
) -> std::io::Result<()> {
    w.write_all(b"fmt ")?;
    w.write_all(&16u32.to_le_bytes())?;
    w.write_all(&1u16.to_le_bytes())?;
    w.write_all(&num_channels.to_le_bytes())?;
    w.write_all(&sample_rate.to_le_bytes())?;
    w.write_all(&(sample_rate * block_align as u32).to_le_bytes())?;
    w.write_all(&block_align.to_le_bytes())?;
    w.write_all(&bits_per_sample.to_le_bytes())
}

fn write_data_chunk(w: &mut impl Write, frames: &[PcmFrame], data_size: u32) -> std::io::Result<()> {
    w.write_all(b"data")?;
    w.write_all(&data_size.to_le_bytes())?;
    for frame in frames {
        w.write_all(&frame.left.to_le_bytes())?;
        w.write_all(&frame.right.to_le_bytes())?;
    }
    Ok(())
}

// --- Reading ---

/// Parsed fmt and data chunk positions of a PCM WAV file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WavHeader {
    pub num_channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub data_offset: usize,
    pub data_size: usize,
}

impl WavHeader {
    /// Number of sample frames in the data chunk.
    pub fn frames(&self) -> usize {
        let block = self.num_channels as usize * (self.bits_per_sample as usize / 8);
        if block == 0 { 0 } else { self.data_size / block }
    }
}

/// Locate the fmt and data chunks of an uncompressed PCM WAV file.
pub fn read_wav_header(data: &[u8]) -> Result<WavHeader, FormatError> {
    if data.len() < WAV_HEADER_LEN {
        return Err(FormatError::InvalidWav("file shorter than a WAV header"));
    }
    if &data[0..4] != b"RIFF" || &data[8..12] != b"WAVE" {
        return Err(FormatError::InvalidWav("missing RIFF/WAVE signature"));
    }

    let mut pos = 12;
    let mut fmt: Option<(u16, u32, u16)> = None;
    let mut data_chunk: Option<(usize, usize)> = None;

    while pos + 8 <= data.len() {
        let chunk_id = &data[pos..pos + 4];
        let chunk_size = read_u32_le(data, pos + 4) as usize;

        if chunk_id == b"fmt " && chunk_size >= 16 && pos + 24 <= data.len() {
            if read_u16_le(data, pos + 8) != 1 {
                return Err(FormatError::InvalidWav("not integer PCM"));
            }
            let channels = read_u16_le(data, pos + 10);
            let rate = read_u32_le(data, pos + 12);
            let bits = read_u16_le(data, pos + 22);
            fmt = Some((channels, rate, bits));
        } else if chunk_id == b"data" {
            data_chunk = Some((pos + 8, chunk_size));
        }

        pos += 8 + chunk_size;
        if pos % 2 != 0 { pos += 1; }
    }

    let (num_channels, sample_rate, bits_per_sample) =
        fmt.ok_or(FormatError::InvalidWav("missing fmt chunk"))?;
    let (data_offset, data_size) = data_chunk.ok_or(FormatError::InvalidWav("missing data chunk"))?;

    Ok(WavHeader { num_channels, sample_rate, bits_per_sample, data_offset, data_size })
}

/// Read back the frames of a 16-bit stereo WAV file.
pub fn read_pcm16_stereo(data: &[u8]) -> Result<Vec<PcmFrame>, FormatError> {
    let header = read_wav_header(data)?;
    if header.bits_per_sample != 16 || header.num_channels != 2 {
        return Err(FormatError::InvalidWav("expected 16-bit stereo"));
    }
    let end = (header.data_offset + header.data_size).min(data.len());
    Ok(data[header.data_offset..end]
        .chunks_exact(4)
        .map(|c| PcmFrame {
            left: i16::from_le_bytes([c[0], c[1]]),
            right: i16::from_le_bytes([c[2], c[3]]),
        })
        .collect())
}

fn read_u16_le(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

fn read_u32_le(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
}
