//! Wavetable data types.

use alloc::collections::BTreeMap;
use alloc::string::String;
use arrayvec::ArrayString;
use core::f32::consts::TAU;
use slotmap::SlotMap;

/// Number of entries in one wavetable cycle.
pub const TABLE_LEN: usize = 32;

/// Name of the table drum voices use when their entry names none.
pub const NOISE_TABLE: &str = "noise";

/// Name of the table used when neither an entry nor the defaults name one.
pub const FALLBACK_TABLE: &str = "pulse50";

/// Longest table name in bytes. Longer names are cut at a char boundary.
pub const MAX_TABLE_NAME_LEN: usize = 24;

type TableName = ArrayString<MAX_TABLE_NAME_LEN>;

slotmap::new_key_type! {
    /// Key for referencing wavetables in a `WavetableBank`.
    pub struct WavetableKey;
}

/// One waveform cycle of 32 normalized amplitudes.
#[derive(Clone, Debug, PartialEq)]
pub struct Wavetable {
    /// Table name
    pub name: TableName,
    samples: [f32; TABLE_LEN],
}

impl Wavetable {
    /// Build a table from unsigned 8-bit entries (128 is the zero line).
    pub fn from_bytes(name: &str, bytes: &[u8; TABLE_LEN]) -> Self {
        let mut samples = [0.0; TABLE_LEN];
        for (dst, &b) in samples.iter_mut().zip(bytes.iter()) {
            *dst = (b as f32 / 127.5 - 1.0).clamp(-1.0, 1.0);
        }
        Self { name: table_name(name), samples }
    }

    /// Raw normalized entries.
    pub fn samples(&self) -> &[f32; TABLE_LEN] {
        &self.samples
    }

    /// Read the table at a fractional phase, wrapping modulo 32 and
    /// interpolating linearly between the two nearest entries.
    pub fn sample(&self, phase: f32) -> f32 {
        let wrapped = wrap_phase(phase);
        let idx = wrapped as usize % TABLE_LEN;
        let frac = wrapped - libm::floorf(wrapped);
        let a = self.samples[idx];
        let b = self.samples[(idx + 1) % TABLE_LEN];
        a + (b - a) * frac
    }
}

fn table_name(name: &str) -> TableName {
    let mut out = TableName::new();
    for c in name.chars() {
        if out.try_push(c).is_err() {
            break;
        }
    }
    out
}

/// Wrap a phase into `[0, 32)`.
pub fn wrap_phase(phase: f32) -> f32 {
    let len = TABLE_LEN as f32;
    let wrapped = phase - len * libm::floorf(phase / len);
    if wrapped >= len { 0.0 } else { wrapped }
}

/// Owns every wavetable; voices refer to tables by key.
#[derive(Clone, Debug, Default)]
pub struct WavetableBank {
    tables: SlotMap<WavetableKey, Wavetable>,
    names: BTreeMap<String, WavetableKey>,
}

impl WavetableBank {
    /// Create an empty bank.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a bank holding the built-in chip waveforms.
    pub fn with_builtins() -> Self {
        let mut bank = Self::new();
        bank.insert(Wavetable::from_bytes("pulse12", &pulse_bytes(4)));
        bank.insert(Wavetable::from_bytes("pulse25", &pulse_bytes(8)));
        bank.insert(Wavetable::from_bytes("pulse50", &pulse_bytes(16)));
        bank.insert(Wavetable::from_bytes("triangle", &triangle_bytes()));
        bank.insert(Wavetable::from_bytes("saw", &saw_bytes()));
        bank.insert(Wavetable::from_bytes("sine", &sine_bytes()));
        bank.insert(Wavetable::from_bytes(NOISE_TABLE, &noise_bytes(0xACE1)));
        bank
    }

    /// Insert a table, replacing any table with the same name.
    pub fn insert(&mut self, table: Wavetable) -> WavetableKey {
        let name = String::from(table.name.as_str());
        if let Some(&key) = self.names.get(&name) {
            if let Some(slot) = self.tables.get_mut(key) {
                *slot = table;
                return key;
            }
        }
        let key = self.tables.insert(table);
        self.names.insert(name, key);
        key
    }

    /// Look up a table by key.
    pub fn get(&self, key: WavetableKey) -> Option<&Wavetable> {
        self.tables.get(key)
    }

    /// Find the key registered under `name`, shortened the way stored names
    /// are.
    pub fn key_of(&self, name: &str) -> Option<WavetableKey> {
        self.names.get(table_name(name).as_str()).copied()
    }

    /// Number of tables in the bank.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

fn pulse_bytes(high: usize) -> [u8; TABLE_LEN] {
    let mut t = [0u8; TABLE_LEN];
    for (i, v) in t.iter_mut().enumerate() {
        *v = if i < high { 255 } else { 0 };
    }
    t
}

fn triangle_bytes() -> [u8; TABLE_LEN] {
    let mut t = [0u8; TABLE_LEN];
    for (i, v) in t.iter_mut().enumerate() {
        let up = if i < 16 { i } else { 31 - i };
        *v = (up * 255 / 15) as u8;
    }
    t
}

fn saw_bytes() -> [u8; TABLE_LEN] {
    let mut t = [0u8; TABLE_LEN];
    for (i, v) in t.iter_mut().enumerate() {
        *v = (i * 255 / 31) as u8;
    }
    t
}

fn sine_bytes() -> [u8; TABLE_LEN] {
    let mut t = [0u8; TABLE_LEN];
    for (i, v) in t.iter_mut().enumerate() {
        let s = libm::sinf(TAU * i as f32 / TABLE_LEN as f32);
        *v = libm::roundf(127.5 + 127.5 * s).clamp(0.0, 255.0) as u8;
    }
    t
}

/// 16-bit Galois LFSR, taps 0xB400.
fn noise_bytes(seed: u16) -> [u8; TABLE_LEN] {
    let mut state = if seed == 0 { 1 } else { seed };
    let mut t = [0u8; TABLE_LEN];
    for v in t.iter_mut() {
        let mut byte = 0u8;
        for _ in 0..8 {
            let bit = state & 1;
            state >>= 1;
            if bit != 0 {
                state ^= 0xB400;
            }
            byte = (byte << 1) | bit as u8;
        }
        *v = byte;
    }
    t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_normalize_to_unit_range() {
        let t = Wavetable::from_bytes("edge", &[0; TABLE_LEN]);
        assert_eq!(t.samples()[0], -1.0);
        let t = Wavetable::from_bytes("edge", &[255; TABLE_LEN]);
        assert_eq!(t.samples()[0], 1.0);
    }

    #[test]
    fn sample_interpolates_between_entries() {
        let mut bytes = [0u8; TABLE_LEN];
        bytes[1] = 255;
        let t = Wavetable::from_bytes("ramp", &bytes);
        assert!((t.sample(0.5) - 0.0).abs() < 1e-6);
        assert!((t.sample(1.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn sample_wraps_last_entry_to_first() {
        let mut bytes = [0u8; TABLE_LEN];
        bytes[0] = 255;
        let t = Wavetable::from_bytes("wrap", &bytes);
        // Halfway between entry 31 (-1) and entry 0 (+1)
        assert!(t.sample(31.5).abs() < 1e-6);
        assert_eq!(t.sample(32.0), t.sample(0.0));
        assert_eq!(t.sample(-1.0), t.sample(31.0));
    }

    #[test]
    fn wrap_phase_stays_in_range() {
        for p in [-100.25f32, -32.0, 0.0, 31.999, 32.0, 1000.5] {
            let w = wrap_phase(p);
            assert!((0.0..32.0).contains(&w), "{} wrapped to {}", p, w);
        }
    }

    #[test]
    fn builtins_are_registered_by_name() {
        let bank = WavetableBank::with_builtins();
        for name in ["pulse12", "pulse25", "pulse50", "triangle", "saw", "sine", "noise"] {
            let key = bank.key_of(name).unwrap();
            assert_eq!(bank.get(key).unwrap().name.as_str(), name);
        }
        assert!(bank.key_of("organ").is_none());
    }

    #[test]
    fn all_builtin_entries_within_unit_range() {
        let bank = WavetableBank::with_builtins();
        for name in ["pulse12", "triangle", "saw", "sine", "noise"] {
            let t = bank.get(bank.key_of(name).unwrap()).unwrap();
            assert!(t.samples().iter().all(|s| (-1.0..=1.0).contains(s)));
        }
    }

    #[test]
    fn insert_replaces_same_name() {
        let mut bank = WavetableBank::with_builtins();
        let before = bank.len();
        let k1 = bank.key_of("saw").unwrap();
        let k2 = bank.insert(Wavetable::from_bytes("saw", &[200; TABLE_LEN]));
        assert_eq!(k1, k2);
        assert_eq!(bank.len(), before);
        assert!(bank.get(k1).unwrap().samples()[3] > 0.5);
    }

    #[test]
    fn long_names_are_found_by_their_full_name() {
        let mut bank = WavetableBank::new();
        let name = "a_very_long_custom_wavetable_name";
        let key = bank.insert(Wavetable::from_bytes(name, &[128; TABLE_LEN]));
        assert_eq!(bank.get(key).unwrap().name.len(), MAX_TABLE_NAME_LEN);
        assert_eq!(bank.key_of(name), Some(key));
        // Multi-byte chars are never split
        let t = Wavetable::from_bytes("ééééééééééééé", &[128; TABLE_LEN]);
        assert_eq!(t.name.as_str(), "éééééééééééé");
    }

    #[test]
    fn noise_is_not_constant() {
        let bytes = noise_bytes(0xACE1);
        assert!(bytes.iter().any(|&b| b != bytes[0]));
    }
}
