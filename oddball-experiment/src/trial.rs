/// Phase lengths in scanner pulses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialDurations {
    /// White screen after the launching pulse.
    pub flash: u32,
    pub iti: u32,
    /// Fixation cross before the tone.
    pub pre_tone: u32,
    /// Response window after the tone.
    pub post_tone: u32,
}

impl TrialDurations {
    pub fn per_trial(&self) -> u64 {
        u64::from(self.iti) + u64::from(self.pre_tone) + u64::from(self.post_tone)
    }
}
