use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use oddball_experiment::{Hand, Sex, SubjectInfo, TaskConfig};

/// Auditory oddball task paced by scanner pulses.
///
/// Keys: `t` scanner pulse, `b` response, `q`/Esc quit.
#[derive(Parser, Debug)]
#[command(name = "oddball", author, version, about)]
pub struct Cli {
    /// Subject identifier, used in the log file name.
    #[arg(long, required_unless_present = "test_mode")]
    pub subject: Option<String>,

    /// Age as entered by the operator.
    #[arg(long, required_unless_present = "test_mode")]
    pub age: Option<String>,

    /// Sex (M, F, O).
    #[arg(long, required_unless_present = "test_mode")]
    pub sex: Option<Sex>,

    /// Handedness (R or L).
    #[arg(long, required_unless_present = "test_mode")]
    pub hand: Option<Hand>,

    /// Fill subject fields with TEST and run windowed at 800x800 on screen 0.
    #[arg(long)]
    pub test_mode: bool,

    /// JSON file with task settings; flags below override it.
    #[arg(short, long, env = "ODDBALL_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub trials: Option<usize>,

    /// Probability that a trial plays the tone.
    #[arg(long)]
    pub p_oddball: Option<f64>,

    /// Scanner repetition time in seconds.
    #[arg(long)]
    pub tr: Option<f64>,

    #[arg(long)]
    pub flash_secs: Option<f64>,

    #[arg(long)]
    pub iti_secs: Option<f64>,

    #[arg(long)]
    pub pre_tone_secs: Option<f64>,

    #[arg(long)]
    pub post_tone_secs: Option<f64>,

    /// Seed for the trial sequence.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Abort when no pulse arrives for this many seconds.
    #[arg(long)]
    pub stall_timeout: Option<f64>,

    /// Directory for the event log and session summary.
    #[arg(long, default_value = "data", env = "ODDBALL_DATA_DIR")]
    pub data_dir: PathBuf,

    /// Tone file; a 1 kHz sine is synthesised when absent.
    #[arg(long)]
    pub tone: Option<PathBuf>,

    /// Skip the audio device and only log tone onsets.
    #[arg(long)]
    pub mute: bool,

    /// TrueType/OpenType font for on-screen text.
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// Monitor index; falls back to the primary monitor.
    #[arg(long)]
    pub screen: Option<usize>,

    /// Use a window instead of borderless fullscreen.
    #[arg(long)]
    pub windowed: bool,

    /// Read keys from stdin and log frames instead of opening a window.
    #[arg(long)]
    pub headless: bool,

    /// Generate scanner pulses internally, one per TR.
    #[arg(long)]
    pub simulate_scanner: bool,

    /// Increase verbosity (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Window placement derived from the flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub screen: usize,
    pub fullscreen: bool,
    /// Inner size when windowed.
    pub size: (u32, u32),
}

impl Cli {
    /// Config file (or defaults) with any explicit flags applied on top.
    pub fn task_config(&self) -> Result<TaskConfig> {
        let mut config = match &self.config {
            Some(path) => TaskConfig::from_json_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => TaskConfig::default(),
        };

        if let Some(n) = self.trials {
            config.n_trials = n;
        }
        if let Some(p) = self.p_oddball {
            config.p_oddball = p;
        }
        if let Some(tr) = self.tr {
            config.tr_secs = tr;
        }
        if let Some(s) = self.flash_secs {
            config.flash_secs = s;
        }
        if let Some(s) = self.iti_secs {
            config.iti_secs = s;
        }
        if let Some(s) = self.pre_tone_secs {
            config.pre_tone_secs = s;
        }
        if let Some(s) = self.post_tone_secs {
            config.post_tone_secs = s;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if self.stall_timeout.is_some() {
            config.stall_timeout_secs = self.stall_timeout;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn subject(&self) -> Result<SubjectInfo> {
        let subject = if self.test_mode {
            SubjectInfo::placeholder()
        } else {
            match (&self.subject, &self.age, self.sex, self.hand) {
                (Some(id), Some(age), Some(sex), Some(hand)) => {
                    SubjectInfo::new(id.trim(), age.trim(), sex, hand)
                }
                _ => anyhow::bail!("--subject, --age, --sex and --hand are required"),
            }
        };
        subject.validate()?;
        Ok(subject)
    }

    pub fn placement(&self) -> Placement {
        if self.test_mode {
            return Placement {
                screen: self.screen.unwrap_or(0),
                fullscreen: false,
                size: (800, 800),
            };
        }
        Placement {
            screen: self.screen.unwrap_or(1),
            fullscreen: !self.windowed,
            size: (1280, 1024),
        }
    }
}
