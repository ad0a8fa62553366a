//! Machine trait for mastering effects.

/// Static metadata about a machine.
pub struct MachineInfo {
    pub short_name: &'static str,
}

/// Core trait for effects applied to planar stereo buffers.
pub trait Machine: Send {
    fn info(&self) -> &MachineInfo;
    /// Prepare for `sample_rate`. May allocate.
    fn init(&mut self, sample_rate: u32);
    /// Process both channels in place. Must not allocate.
    fn work(&mut self, left: &mut [f32], right: &mut [f32]);
    /// Clear all running state.
    fn stop(&mut self);
}
