use serde::{Deserialize, Serialize};

/// What happened in one trial, kept for the end-of-session summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialOutcome {
    pub trial: usize,
    pub oddball: bool,
    pub responses: usize,
    /// Session-clock seconds from tone onset (or silence) to the first press.
    pub first_response_secs: Option<f64>,
}

impl TrialOutcome {
    pub fn new(trial: usize, oddball: bool) -> Self {
        Self {
            trial,
            oddball,
            responses: 0,
            first_response_secs: None,
        }
    }

    pub fn record_response(&mut self, latency_secs: f64) {
        if self.first_response_secs.is_none() {
            self.first_response_secs = Some(latency_secs);
        }
        self.responses += 1;
    }

    pub fn is_hit(&self) -> bool {
        self.oddball && self.responses > 0
    }

    pub fn is_false_alarm(&self) -> bool {
        !self.oddball && self.responses > 0
    }
}
