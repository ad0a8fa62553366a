//! Normalized tanh soft clipper: `tanh(drive·x) / tanh(drive)`.

use crate::machine::{Machine, MachineInfo};

static INFO: MachineInfo = MachineInfo { short_name: "Clip" };

pub struct SoftClip {
    drive: f32,
    norm: f32,
}

impl SoftClip {
    pub fn new(drive: f32) -> Self {
        let drive = if drive.is_finite() { drive.max(0.01) } else { 1.0 };
        Self { drive, norm: 1.0 / libm::tanhf(drive) }
    }

    #[inline]
    pub fn apply(&self, x: f32) -> f32 {
        libm::tanhf(self.drive * x) * self.norm
    }
}

impl Machine for SoftClip {
    fn info(&self) -> &MachineInfo {
        &INFO
    }

    fn init(&mut self, _sample_rate: u32) {}

    fn work(&mut self, left: &mut [f32], right: &mut [f32]) {
        for s in left.iter_mut().chain(right.iter_mut()) {
            *s = self.apply(*s);
        }
    }

    fn stop(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unity_maps_to_unity() {
        let clip = SoftClip::new(1.5);
        assert!((clip.apply(1.0) - 1.0).abs() < 1e-6);
        assert!((clip.apply(-1.0) + 1.0).abs() < 1e-6);
        assert_eq!(clip.apply(0.0), 0.0);
    }

    #[test]
    fn peaks_are_bounded() {
        let clip = SoftClip::new(1.5);
        let limit = 1.0 / libm::tanhf(1.5);
        for x in [2.0f32, 5.0, 100.0] {
            let y = clip.apply(x);
            assert!(y <= limit + 1e-6);
            assert!(y > 1.0);
        }
    }

    #[test]
    fn monotonic() {
        let clip = SoftClip::new(3.0);
        let mut prev = clip.apply(-4.0);
        for i in -39..=40 {
            let y = clip.apply(i as f32 / 10.0);
            assert!(y >= prev);
            prev = y;
        }
    }

    #[test]
    fn work_processes_both_channels() {
        let mut clip = SoftClip::new(1.5);
        let mut l = [3.0f32];
        let mut r = [-3.0f32];
        clip.work(&mut l, &mut r);
        assert!(l[0] < 3.0);
        assert_eq!(l[0], -r[0]);
    }

    #[test]
    fn bad_drive_falls_back() {
        assert_eq!(SoftClip::new(f32::NAN).drive, 1.0);
        assert_eq!(SoftClip::new(0.0).drive, 0.01);
    }
}
