use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of labels written to the event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventLabel {
    ExperimentStart,
    Flash,
    #[serde(rename = "ITI")]
    Iti,
    CrossOn,
    CrossRotate,
    Oddball,
    Silence,
    ResponseMade,
    ExperimentEnd,
}

impl EventLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventLabel::ExperimentStart => "ExperimentStart",
            EventLabel::Flash => "Flash",
            EventLabel::Iti => "ITI",
            EventLabel::CrossOn => "CrossOn",
            EventLabel::CrossRotate => "CrossRotate",
            EventLabel::Oddball => "Oddball",
            EventLabel::Silence => "Silence",
            EventLabel::ResponseMade => "ResponseMade",
            EventLabel::ExperimentEnd => "ExperimentEnd",
        }
    }
}

impl fmt::Display for EventLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the session log. Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(rename = "SubjectID")]
    pub subject_id: String,
    #[serde(rename = "Age")]
    pub age: String,
    #[serde(rename = "Sex")]
    pub sex: String,
    #[serde(rename = "Hand")]
    pub hand: String,
    #[serde(rename = "Trial")]
    pub trial: usize,
    #[serde(rename = "Event")]
    pub event: EventLabel,
    /// Seconds on the session clock.
    #[serde(rename = "TimeFromStart")]
    pub time_from_start: f64,
    /// Pulse counter value.
    #[serde(rename = "Ts")]
    pub ts: u64,
}

pub const LOG_HEADER: [&str; 8] = [
    "SubjectID",
    "Age",
    "Sex",
    "Hand",
    "Trial",
    "Event",
    "TimeFromStart",
    "Ts",
];
