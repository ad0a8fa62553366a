//! RBJ cookbook biquads: low-pass and high-shelf.
//!
//! Each channel runs its own direct-form I state.

use core::f32::consts::PI;

use crate::machine::{Machine, MachineInfo};

static LOWPASS_INFO: MachineInfo = MachineInfo { short_name: "LPF" };

static SHELF_INFO: MachineInfo = MachineInfo { short_name: "Shelf" };

/// Normalized biquad coefficients (`a0 = 1`).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BiquadCoeffs {
    pub b0: f32,
    pub b1: f32,
    pub b2: f32,
    pub a1: f32,
    pub a2: f32,
}

impl BiquadCoeffs {
    /// Pass-through.
    pub const IDENTITY: Self = Self { b0: 1.0, b1: 0.0, b2: 0.0, a1: 0.0, a2: 0.0 };

    pub fn lowpass(cutoff: f32, q: f32, sample_rate: u32) -> Self {
        let q = q.max(0.1);
        let omega = omega(cutoff, sample_rate);
        let cos_omega = libm::cosf(omega);
        let alpha = libm::sinf(omega) / (2.0 * q);

        let b1 = 1.0 - cos_omega;
        let b0 = b1 / 2.0;
        let a0 = 1.0 + alpha;
        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b0 / a0,
            a1: -2.0 * cos_omega / a0,
            a2: (1.0 - alpha) / a0,
        }
    }

    /// Shelf slope S = 1.
    pub fn high_shelf(frequency: f32, gain_db: f32, sample_rate: u32) -> Self {
        let a = libm::powf(10.0, gain_db / 40.0);
        let omega = omega(frequency, sample_rate);
        let cos_omega = libm::cosf(omega);
        let alpha = libm::sinf(omega) / 2.0 * core::f32::consts::SQRT_2;
        let two_sqrt_a_alpha = 2.0 * libm::sqrtf(a) * alpha;

        let a0 = (a + 1.0) - (a - 1.0) * cos_omega + two_sqrt_a_alpha;
        Self {
            b0: a * ((a + 1.0) + (a - 1.0) * cos_omega + two_sqrt_a_alpha) / a0,
            b1: -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_omega) / a0,
            b2: a * ((a + 1.0) + (a - 1.0) * cos_omega - two_sqrt_a_alpha) / a0,
            a1: 2.0 * ((a - 1.0) - (a + 1.0) * cos_omega) / a0,
            a2: ((a + 1.0) - (a - 1.0) * cos_omega - two_sqrt_a_alpha) / a0,
        }
    }
}

/// Angular frequency, kept below Nyquist.
fn omega(frequency: f32, sample_rate: u32) -> f32 {
    let sr = sample_rate.max(1) as f32;
    2.0 * PI * frequency.clamp(1.0, sr * 0.49) / sr
}

/// One channel of filter memory.
#[derive(Clone, Copy, Debug, Default)]
struct BiquadState {
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl BiquadState {
    #[inline]
    fn process(&mut self, c: &BiquadCoeffs, x: f32) -> f32 {
        let y = c.b0 * x + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Shape {
    LowPass { cutoff: f32, q: f32 },
    HighShelf { frequency: f32, gain_db: f32 },
}

/// A stereo biquad effect.
pub struct Biquad {
    shape: Shape,
    coeffs: BiquadCoeffs,
    left: BiquadState,
    right: BiquadState,
    sample_rate: u32,
}

impl Biquad {
    pub fn lowpass(cutoff: f32, q: f32) -> Self {
        Self::with_shape(Shape::LowPass { cutoff, q })
    }

    pub fn high_shelf(frequency: f32, gain_db: f32) -> Self {
        Self::with_shape(Shape::HighShelf { frequency, gain_db })
    }

    fn with_shape(shape: Shape) -> Self {
        let mut filter = Self {
            shape,
            coeffs: BiquadCoeffs::IDENTITY,
            left: BiquadState::default(),
            right: BiquadState::default(),
            sample_rate: 44100,
        };
        filter.recompute();
        filter
    }

    pub fn coeffs(&self) -> &BiquadCoeffs {
        &self.coeffs
    }

    fn recompute(&mut self) {
        self.coeffs = match self.shape {
            Shape::LowPass { cutoff, q } => BiquadCoeffs::lowpass(cutoff, q, self.sample_rate),
            Shape::HighShelf { frequency, gain_db } => {
                BiquadCoeffs::high_shelf(frequency, gain_db, self.sample_rate)
            }
        };
    }
}

impl Machine for Biquad {
    fn info(&self) -> &MachineInfo {
        match self.shape {
            Shape::LowPass { .. } => &LOWPASS_INFO,
            Shape::HighShelf { .. } => &SHELF_INFO,
        }
    }

    fn init(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate;
        self.recompute();
    }

    fn work(&mut self, left: &mut [f32], right: &mut [f32]) {
        let c = self.coeffs;
        for s in left.iter_mut() {
            *s = self.left.process(&c, *s);
        }
        for s in right.iter_mut() {
            *s = self.right.process(&c, *s);
        }
    }

    fn stop(&mut self) {
        self.left = BiquadState::default();
        self.right = BiquadState::default();
    }
}
