use std::fs::File;
use std::path::Path;

use oddball_core::TrialOutcome;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::TaskResult;

/// End-of-session digest, saved as JSON next to the event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub subject_id: String,
    pub seed: u64,
    pub n_trials: usize,
    pub oddballs: usize,
    pub responses: usize,
    pub hits: usize,
    pub misses: usize,
    pub false_alarms: usize,
    pub mean_hit_latency_secs: Option<f64>,
    pub total_pulses: u64,
    pub duration_secs: f64,
    pub trials: Vec<TrialOutcome>,
}

impl SessionSummary {
    pub fn from_outcomes(
        subject_id: &str,
        seed: u64,
        trials: Vec<TrialOutcome>,
        total_pulses: u64,
        duration_secs: f64,
    ) -> Self {
        let oddballs = trials.iter().filter(|t| t.oddball).count();
        let hits = trials.iter().filter(|t| t.is_hit()).count();
        let latencies: Vec<f64> = trials
            .iter()
            .filter(|t| t.is_hit())
            .filter_map(|t| t.first_response_secs)
            .collect();
        let mean_hit_latency_secs = if latencies.is_empty() {
            None
        } else {
            Some(latencies.iter().sum::<f64>() / latencies.len() as f64)
        };

        Self {
            subject_id: subject_id.to_string(),
            seed,
            n_trials: trials.len(),
            oddballs,
            responses: trials.iter().map(|t| t.responses).sum(),
            hits,
            misses: oddballs - hits,
            false_alarms: trials.iter().filter(|t| t.is_false_alarm()).count(),
            mean_hit_latency_secs,
            total_pulses,
            duration_secs,
            trials,
        }
    }

    pub fn hit_rate(&self) -> Option<f64> {
        (self.oddballs > 0).then(|| self.hits as f64 / self.oddballs as f64)
    }

    pub fn log(&self) {
        info!(
            trials = self.n_trials,
            oddballs = self.oddballs,
            hits = self.hits,
            misses = self.misses,
            false_alarms = self.false_alarms,
            hit_rate = self.hit_rate(),
            pulses = self.total_pulses,
            duration_secs = self.duration_secs,
            "session summary"
        );
        if let Some(latency) = self.mean_hit_latency_secs {
            info!(mean_hit_latency_ms = latency * 1e3, "response latency");
        }
    }

    pub fn write_json(&self, path: &Path) -> TaskResult<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        info!(path = %path.display(), "summary saved");
        Ok(())
    }
}
