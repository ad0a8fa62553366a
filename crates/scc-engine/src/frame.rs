//! Audio frame type.

/// A stereo audio frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Frame {
    pub left: f32,
    pub right: f32,
}

impl Frame {
    /// Create a silent frame.
    pub const fn silence() -> Self {
        Self { left: 0.0, right: 0.0 }
    }

    /// Place a mono value with a left/right gain pair.
    pub fn panned(value: f32, gains: PanGains) -> Self {
        Self { left: value * gains.left, right: value * gains.right }
    }

    /// Mix another frame into this one.
    pub fn mix(&mut self, other: Frame) {
        self.left += other.left;
        self.right += other.right;
    }
}

/// Constant-power stereo gains for a pan position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PanGains {
    pub left: f32,
    pub right: f32,
}

impl PanGains {
    /// Gains for `pan` in [-1, 1] (clamped): `left = cos θ`, `right = sin θ`,
    /// `θ = (pan + 1)·π/4`.
    pub fn from_pan(pan: f32) -> Self {
        let theta = (pan.clamp(-1.0, 1.0) + 1.0) * core::f32::consts::FRAC_PI_4;
        Self { left: libm::cosf(theta), right: libm::sinf(theta) }
    }
}

impl Default for PanGains {
    fn default() -> Self {
        Self::from_pan(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mix_sums_channels() {
        let mut a = Frame { left: 0.25, right: -0.5 };
        a.mix(Frame::panned(0.25, PanGains { left: 1.0, right: 1.0 }));
        assert_eq!(a, Frame { left: 0.5, right: -0.25 });
    }

    #[test]
    fn pan_law_is_constant_power() {
        for i in 0..=40 {
            let pan = -1.0 + i as f32 * 0.05;
            let g = PanGains::from_pan(pan);
            let power = g.left * g.left + g.right * g.right;
            assert!((power - 1.0).abs() < 1e-5, "pan {} power {}", pan, power);
        }
    }

    #[test]
    fn pan_extremes() {
        let hard_left = PanGains::from_pan(-1.0);
        assert!((hard_left.left - 1.0).abs() < 1e-6);
        assert!(hard_left.right.abs() < 1e-6);
        let hard_right = PanGains::from_pan(1.0);
        assert!(hard_right.left.abs() < 1e-6);
        let center = PanGains::default();
        assert!((center.left - center.right).abs() < 1e-6);
    }

    #[test]
    fn pan_out_of_range_clamps() {
        assert_eq!(PanGains::from_pan(5.0), PanGains::from_pan(1.0));
    }
}
