use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{TaskError, TaskResult};
use crate::trial::TrialDurations;

/// Placeholder written for every subject field in test mode.
pub const PLACEHOLDER: &str = "TEST";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    pub n_trials: usize,
    pub p_oddball: f64,
    /// Scanner repetition time in seconds.
    pub tr_secs: f64,
    pub flash_secs: f64,
    pub iti_secs: f64,
    pub pre_tone_secs: f64,
    pub post_tone_secs: f64,
    /// Sequence seed; drawn from OS entropy when unset.
    pub seed: Option<u64>,
    /// Give up when no pulse arrives for this long. Unset waits forever.
    pub stall_timeout_secs: Option<f64>,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            n_trials: 150,
            p_oddball: 0.25,
            tr_secs: 0.5,
            flash_secs: 2.0,
            iti_secs: 2.0,
            pre_tone_secs: 2.0,
            post_tone_secs: 2.0,
            seed: None,
            stall_timeout_secs: None,
        }
    }
}

impl TaskConfig {
    pub fn from_json_file(path: &Path) -> TaskResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn validate(&self) -> TaskResult<()> {
        if self.n_trials == 0 {
            return Err(TaskError::InvalidConfig("trial count must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.p_oddball) {
            return Err(TaskError::InvalidConfig(format!(
                "oddball probability {} is outside [0, 1]",
                self.p_oddball
            )));
        }
        if !self.tr_secs.is_finite()
            || self.tr_secs <= 0.0
            || Duration::try_from_secs_f64(self.tr_secs).is_err()
        {
            return Err(TaskError::InvalidConfig(format!(
                "TR must be a positive, representable number of seconds, got {}",
                self.tr_secs
            )));
        }
        for (name, secs) in [
            ("flash", self.flash_secs),
            ("iti", self.iti_secs),
            ("pre-tone", self.pre_tone_secs),
            ("post-tone", self.post_tone_secs),
        ] {
            if !secs.is_finite() || secs < 0.0 {
                return Err(TaskError::InvalidConfig(format!(
                    "{name} duration must be a non-negative number of seconds, got {secs}"
                )));
            }
        }
        if let Some(t) = self.stall_timeout_secs {
            if !t.is_finite() || t <= 0.0 || Duration::try_from_secs_f64(t).is_err() {
                return Err(TaskError::InvalidConfig(format!(
                    "stall timeout must be a positive, representable number of seconds, got {t}"
                )));
            }
        }
        Ok(())
    }

    /// Converts seconds into a whole number of pulses, rounding up.
    pub fn to_pulses(&self, secs: f64) -> u32 {
        // Absorb float noise such as 1.1 / 0.1 = 11.000000000000002.
        let tr = secs / self.tr_secs;
        (tr - 1e-9).ceil().max(0.0) as u32
    }

    pub fn durations(&self) -> TrialDurations {
        TrialDurations {
            flash: self.to_pulses(self.flash_secs),
            iti: self.to_pulses(self.iti_secs),
            pre_tone: self.to_pulses(self.pre_tone_secs),
            post_tone: self.to_pulses(self.post_tone_secs),
        }
    }

    /// Pulses consumed by a complete session, excluding the launching pulse.
    pub fn total_pulses(&self) -> u64 {
        let d = self.durations();
        u64::from(d.flash) + d.per_trial() * self.n_trials as u64
    }

    pub fn task_duration_secs(&self) -> f64 {
        self.total_pulses() as f64 * self.tr_secs
    }

    pub fn stall_timeout(&self) -> Option<Duration> {
        self.stall_timeout_secs
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    Male,
    Female,
    Other,
    Unrecorded,
}

impl Sex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Male => "M",
            Sex::Female => "F",
            Sex::Other => "O",
            Sex::Unrecorded => PLACEHOLDER,
        }
    }
}

impl FromStr for Sex {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "M" => Ok(Sex::Male),
            "F" => Ok(Sex::Female),
            "O" => Ok(Sex::Other),
            other => Err(TaskError::InvalidConfig(format!(
                "sex must be one of M, F, O; got {other:?}"
            ))),
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hand used for button presses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Hand {
    Right,
    Left,
    Unrecorded,
}

impl Hand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Hand::Right => "R",
            Hand::Left => "L",
            Hand::Unrecorded => PLACEHOLDER,
        }
    }
}

impl FromStr for Hand {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "R" => Ok(Hand::Right),
            "L" => Ok(Hand::Left),
            other => Err(TaskError::InvalidConfig(format!(
                "handedness must be R or L; got {other:?}"
            ))),
        }
    }
}

impl fmt::Display for Hand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectInfo {
    pub id: String,
    /// Stored verbatim.
    pub age: String,
    pub sex: Sex,
    pub hand: Hand,
}

impl SubjectInfo {
    pub fn new(id: impl Into<String>, age: impl Into<String>, sex: Sex, hand: Hand) -> Self {
        Self {
            id: id.into(),
            age: age.into(),
            sex,
            hand,
        }
    }

    pub fn placeholder() -> Self {
        Self::new(PLACEHOLDER, PLACEHOLDER, Sex::Unrecorded, Hand::Unrecorded)
    }

    /// The id ends up in the log file name, so it must be a plain file-name fragment.
    pub fn validate(&self) -> TaskResult<()> {
        let id = self.id.trim();
        if id.is_empty() {
            return Err(TaskError::InvalidConfig("subject id is empty".into()));
        }
        if id.contains(&['/', '\\'][..]) || id == "." || id == ".." {
            return Err(TaskError::InvalidConfig(format!(
                "subject id {id:?} is not usable in a file name"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_phases_are_four_pulses_at_half_second_tr() {
        let d = TaskConfig::default().durations();
        assert_eq!(
            d,
            TrialDurations {
                flash: 4,
                iti: 4,
                pre_tone: 4,
                post_tone: 4,
            }
        );
    }

    #[test]
    fn pulses_round_up_without_float_noise() {
        let cfg = TaskConfig {
            tr_secs: 0.1,
            ..TaskConfig::default()
        };
        assert_eq!(cfg.to_pulses(1.1), 11);
        assert_eq!(cfg.to_pulses(0.7), 7);
        assert_eq!(cfg.to_pulses(0.0), 0);

        let slow = TaskConfig {
            tr_secs: 2.0,
            ..TaskConfig::default()
        };
        assert_eq!(slow.to_pulses(3.0), 2);
        assert_eq!(slow.to_pulses(2.0), 1);
    }

    #[test]
    fn total_pulses_and_task_time() {
        let cfg = TaskConfig {
            n_trials: 10,
            ..TaskConfig::default()
        };
        assert_eq!(cfg.total_pulses(), 4 + 12 * 10);
        assert!((cfg.task_duration_secs() - 62.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_bad_values() {
        let bad = [
            TaskConfig {
                n_trials: 0,
                ..TaskConfig::default()
            },
            TaskConfig {
                p_oddball: 1.5,
                ..TaskConfig::default()
            },
            TaskConfig {
                tr_secs: 0.0,
                ..TaskConfig::default()
            },
            TaskConfig {
                iti_secs: f64::NAN,
                ..TaskConfig::default()
            },
            TaskConfig {
                stall_timeout_secs: Some(-1.0),
                ..TaskConfig::default()
            },
            TaskConfig {
                stall_timeout_secs: Some(1e20),
                ..TaskConfig::default()
            },
            TaskConfig {
                tr_secs: 1e20,
                ..TaskConfig::default()
            },
        ];
        for cfg in bad {
            assert!(matches!(cfg.validate(), Err(TaskError::InvalidConfig(_))), "{cfg:?}");
        }
        assert!(TaskConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: TaskConfig = serde_json::from_str(r#"{"n_trials": 20, "tr_secs": 2.0}"#).unwrap();
        assert_eq!(cfg.n_trials, 20);
        assert_eq!(cfg.p_oddball, 0.25);
        assert_eq!(cfg.durations().iti, 1);
    }

    #[test]
    fn demographics_parse_case_insensitively() {
        assert_eq!("m".parse::<Sex>().unwrap(), Sex::Male);
        assert_eq!(" O ".parse::<Sex>().unwrap(), Sex::Other);
        assert_eq!("l".parse::<Hand>().unwrap(), Hand::Left);
        assert!("X".parse::<Sex>().is_err());
        assert!("both".parse::<Hand>().is_err());
    }

    #[test]
    fn placeholder_subject_writes_test_everywhere() {
        let s = SubjectInfo::placeholder();
        assert_eq!(s.id, "TEST");
        assert_eq!(s.sex.to_string(), "TEST");
        assert_eq!(s.hand.to_string(), "TEST");
        assert!(s.validate().is_ok());
    }

    #[test]
    fn subject_id_must_be_file_name_safe() {
        let s = SubjectInfo::new("../x", "30", Sex::Female, Hand::Right);
        assert!(s.validate().is_err());
        let s = SubjectInfo::new("  ", "30", Sex::Female, Hand::Right);
        assert!(s.validate().is_err());
    }
}
