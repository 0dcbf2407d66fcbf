use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Session aborted by quit key")]
    Aborted,

    #[error("Scanner stalled: no pulse for {waited:?} ({pulses_seen}/{expected} pulses in this wait)")]
    Stalled {
        waited: Duration,
        pulses_seen: u32,
        expected: u32,
    },

    #[error("Input device closed")]
    InputClosed,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Display error: {0}")]
    Display(String),

    #[error("Audio error: {0}")]
    Audio(String),
}

pub type TaskResult<T> = Result<T, TaskError>;
