#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use oddball_core::{EventLabel, EventRecord, Stimulus};
use oddball_experiment::{
    Audio, Devices, Display, EventSink, InputSource, Key, TaskConfig, TaskError, TaskResult,
};

/// Replays keys in order; reports the device closed once exhausted.
pub struct ScriptedInput(VecDeque<Key>);

impl ScriptedInput {
    pub fn new(keys: Vec<Key>) -> Self {
        Self(keys.into())
    }
}

impl InputSource for ScriptedInput {
    fn next_key(&mut self, _timeout: Option<Duration>) -> TaskResult<Option<Key>> {
        self.0.pop_front().map(Some).ok_or(TaskError::InputClosed)
    }
}

#[derive(Clone, Default)]
pub struct RecordingDisplay {
    pending: Rc<RefCell<Option<Stimulus>>>,
    pub frames: Rc<RefCell<Vec<Stimulus>>>,
}

impl Display for RecordingDisplay {
    fn draw(&mut self, stimulus: &Stimulus) {
        *self.pending.borrow_mut() = Some(stimulus.clone());
    }

    fn flip(&mut self) -> TaskResult<()> {
        if let Some(s) = self.pending.borrow_mut().take() {
            self.frames.borrow_mut().push(s);
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct CountingAudio {
    pub played: Rc<Cell<usize>>,
}

impl Audio for CountingAudio {
    fn play_tone(&mut self) -> TaskResult<()> {
        self.played.set(self.played.get() + 1);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MemorySink {
    pub records: Rc<RefCell<Vec<EventRecord>>>,
    pub closed: Rc<Cell<bool>>,
}

impl MemorySink {
    pub fn labels(&self) -> Vec<EventLabel> {
        self.records.borrow().iter().map(|r| r.event).collect()
    }
}

impl EventSink for MemorySink {
    fn record(&mut self, record: &EventRecord) -> TaskResult<()> {
        assert!(!self.closed.get(), "record written after close");
        self.records.borrow_mut().push(record.clone());
        Ok(())
    }

    fn close(&mut self) -> TaskResult<()> {
        self.closed.set(true);
        Ok(())
    }
}

pub struct Rig {
    pub display: RecordingDisplay,
    pub audio: CountingAudio,
    pub sink: MemorySink,
}

impl Rig {
    pub fn new() -> Self {
        Self {
            display: RecordingDisplay::default(),
            audio: CountingAudio::default(),
            sink: MemorySink::default(),
        }
    }

    pub fn devices(&self, input: impl InputSource + 'static) -> Devices {
        Devices::new(self.display.clone(), self.audio.clone(), input)
    }
}

pub fn config(n_trials: usize, p_oddball: f64) -> TaskConfig {
    TaskConfig {
        n_trials,
        p_oddball,
        seed: Some(17),
        ..TaskConfig::default()
    }
}

pub fn pulses(n: usize) -> Vec<Key> {
    vec![Key::Pulse; n]
}

/// Trigger, flash, `n_trials` silent-response trials, then a key on the closing screen.
pub fn full_script(n_trials: usize) -> Vec<Key> {
    let mut keys = vec![Key::Pulse];
    keys.extend(pulses(4));
    for _ in 0..n_trials {
        keys.extend(pulses(12));
    }
    keys.push(Key::Other);
    keys
}
