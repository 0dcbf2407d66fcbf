use super::config::{SubjectInfo, TaskConfig};
use super::devices::Devices;
use super::error::{TaskError, TaskResult};
use super::pulse::{self, PulseCounter};
use super::sequence::TrialSequence;
use super::sink::{EventLog, EventSink};
use super::summary::SessionSummary;
use super::trial::TrialDurations;
use oddball_core::{Color, EventLabel, Phase, Stimulus, TaskPhase, TrialOutcome};
use oddball_timing::Timer;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const CLOSING_MESSAGE: &str =
    "The experiment is complete.\n\nThank you for your time!\n\nPress any key to quit";

/// Everything one scanning session touches: created at start, consumed by
/// [`Session::run`], which closes the event log on every exit path.
pub struct Session<S, T>
where
    S: EventSink,
    T: Timer,
{
    pub phase: TaskPhase,
    config: TaskConfig,
    durations: TrialDurations,
    stall_timeout: Option<Duration>,
    sequence: TrialSequence,
    seed: u64,
    counter: PulseCounter,
    clock: T,
    log: EventLog<S>,
    devices: Devices,
    /// 1-based once the first ITI starts.
    trial: usize,
    outcomes: Vec<TrialOutcome>,
    tone_onset_secs: f64,
}

impl<S, T> Session<S, T>
where
    S: EventSink,
    T: Timer,
{
    /// Validates the configuration and draws the trial sequence.
    pub fn new(
        config: TaskConfig,
        subject: SubjectInfo,
        devices: Devices,
        sink: S,
        clock: T,
    ) -> TaskResult<Self> {
        config.validate()?;
        let seed = config.seed.unwrap_or_else(|| rand::rng().random());
        let mut rng = Pcg64Mcg::seed_from_u64(seed);
        let sequence = TrialSequence::generate(config.n_trials, config.p_oddball, &mut rng);
        Self::with_sequence(config, subject, sequence, seed, devices, sink, clock)
    }

    /// Runs a prepared sequence, e.g. one replayed from an earlier session.
    pub fn with_sequence(
        config: TaskConfig,
        subject: SubjectInfo,
        sequence: TrialSequence,
        seed: u64,
        devices: Devices,
        sink: S,
        clock: T,
    ) -> TaskResult<Self> {
        config.validate()?;
        subject.validate()?;
        if sequence.is_empty() || sequence.len() != config.n_trials {
            return Err(TaskError::InvalidConfig(format!(
                "sequence has {} trials but {} are configured",
                sequence.len(),
                config.n_trials
            )));
        }
        let adjacent = sequence.adjacent_oddballs();
        if !adjacent.is_empty() {
            warn!(?adjacent, "trial sequence keeps back-to-back oddballs");
        }
        info!(
            seed,
            trials = sequence.len(),
            oddballs = sequence.oddball_count(),
            "trial sequence ready"
        );

        Ok(Self {
            phase: TaskPhase::default(),
            durations: config.durations(),
            stall_timeout: config.stall_timeout(),
            config,
            sequence,
            seed,
            counter: PulseCounter::default(),
            clock,
            log: EventLog::new(sink, subject),
            devices,
            trial: 0,
            outcomes: Vec::new(),
            tone_onset_secs: 0.0,
        })
    }

    pub fn sequence(&self) -> &TrialSequence {
        &self.sequence
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn pulses(&self) -> u64 {
        self.counter.value()
    }

    /// Drives every phase to the end. A quit key surfaces as
    /// [`TaskError::Aborted`] after the log has been closed.
    pub fn run(mut self) -> TaskResult<SessionSummary> {
        info!(
            subject = %self.log.subject().id,
            trials = self.config.n_trials,
            pulses = self.config.total_pulses(),
            "waiting for the scanner"
        );
        let outcome = self.run_phases();
        let closed = self.log.close();
        match outcome {
            Ok(()) => {
                closed?;
                let summary = SessionSummary::from_outcomes(
                    &self.log.subject().id,
                    self.seed,
                    std::mem::take(&mut self.outcomes),
                    self.counter.value(),
                    self.clock.seconds(),
                );
                info!(events = self.log.written(), "session complete");
                Ok(summary)
            }
            Err(err) => {
                if let Err(close_err) = closed {
                    warn!(%close_err, "event log did not close cleanly");
                }
                warn!(
                    %err,
                    phase = ?self.phase,
                    trial = self.trial,
                    ts = self.counter.value(),
                    "session ended early"
                );
                Err(err)
            }
        }
    }

    fn run_phases(&mut self) -> TaskResult<()> {
        loop {
            debug!(phase = ?self.phase, trial = self.trial, ts = self.counter.value(), "phase");
            self.execute_phase()?;
            match self.next_phase() {
                Some(next) => self.phase = next,
                None => return Ok(()),
            }
        }
    }

    fn next_phase(&self) -> Option<TaskPhase> {
        match self.phase {
            TaskPhase::ResponsePeriod if self.trial >= self.sequence.len() => Some(TaskPhase::End),
            phase => phase.next(),
        }
    }

    fn execute_phase(&mut self) -> TaskResult<()> {
        match self.phase {
            TaskPhase::BlackScreen => {
                self.devices.display.present(&Stimulus::blank(Color::BLACK))?;
            }
            TaskPhase::WaitFirstPulse => {
                pulse::wait_for_trigger(&mut self.devices.input)?;
                self.clock.restart();
                info!("first pulse received, session clock started");
                self.emit(0, EventLabel::ExperimentStart)?;
            }
            TaskPhase::Flash => {
                self.devices.display.present(&Stimulus::blank(Color::WHITE))?;
                self.emit(0, EventLabel::Flash)?;
                self.wait_pulses(self.durations.flash)?;
                self.devices.display.present(&Stimulus::blank(Color::GREY))?;
            }
            TaskPhase::Iti => {
                self.trial += 1;
                self.devices.display.present(&Stimulus::blank(Color::GREY))?;
                self.emit(self.trial, EventLabel::Iti)?;
                self.wait_pulses(self.durations.iti)?;
            }
            TaskPhase::CrossOn => {
                self.devices.display.present(&Stimulus::cross(0.0))?;
                self.emit(self.trial, EventLabel::CrossOn)?;
                self.wait_pulses(self.durations.pre_tone)?;
            }
            TaskPhase::CrossRotate => {
                self.devices.display.present(&Stimulus::cross(45.0))?;
                self.emit(self.trial, EventLabel::CrossRotate)?;
            }
            TaskPhase::Tone => {
                let oddball = self
                    .sequence
                    .is_oddball(self.trial - 1)
                    .ok_or_else(|| {
                        TaskError::InvalidConfig(format!("no sequence entry for trial {}", self.trial))
                    })?;
                self.outcomes.push(TrialOutcome::new(self.trial, oddball));
                self.tone_onset_secs = self.clock.seconds();
                if oddball {
                    self.emit(self.trial, EventLabel::Oddball)?;
                    self.devices.audio.play_tone()?;
                } else {
                    self.emit(self.trial, EventLabel::Silence)?;
                }
            }
            TaskPhase::ResponsePeriod => {
                self.response_period()?;
                self.devices.display.present(&Stimulus::blank(Color::GREY))?;
            }
            TaskPhase::End => {
                self.emit(self.trial, EventLabel::ExperimentEnd)?;
                self.devices.display.present(&Stimulus::message(CLOSING_MESSAGE))?;
                match pulse::wait_for_keypress(&mut self.devices.input) {
                    Ok(key) => debug!(?key, "closing screen dismissed"),
                    Err(TaskError::InputClosed) => debug!("input closed on the closing screen"),
                    Err(err) => return Err(err),
                }
                self.devices.display.present(&Stimulus::blank(Color::GREY))?;
            }
        }
        Ok(())
    }

    /// Post-tone window: pulses advance the counter, each response key is logged.
    fn response_period(&mut self) -> TaskResult<()> {
        debug_assert!(self.phase.accepts_response());
        let trial = self.trial;
        let onset = self.tone_onset_secs;
        let log = &mut self.log;
        let clock = &self.clock;
        let mut outcome = self.outcomes.last_mut();
        pulse::wait_for_pulses(
            &mut self.devices.input,
            &mut self.counter,
            self.durations.post_tone,
            self.stall_timeout,
            |ts| {
                let now = clock.seconds();
                log.emit(trial, EventLabel::ResponseMade, now, ts)?;
                if let Some(o) = outcome.as_deref_mut() {
                    o.record_response(now - onset);
                }
                Ok(())
            },
        )?;
        Ok(())
    }

    fn wait_pulses(&mut self, n: u32) -> TaskResult<u32> {
        debug_assert!(self.phase.is_pulse_paced());
        pulse::wait_for_pulses(
            &mut self.devices.input,
            &mut self.counter,
            n,
            self.stall_timeout,
            |_| Ok(()),
        )
    }

    fn emit(&mut self, trial: usize, event: EventLabel) -> TaskResult<()> {
        let secs = self.clock.seconds();
        self.log.emit(trial, event, secs, self.counter.value())
    }
}
