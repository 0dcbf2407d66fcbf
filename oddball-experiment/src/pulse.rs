use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use tracing::{trace, warn};

use crate::error::{TaskError, TaskResult};

/// Input events the task reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Scanner trigger ("t").
    Pulse,
    /// Participant button ("b").
    Response,
    /// Operator quit ("q" or Escape).
    Quit,
    Other,
}

impl Key {
    pub fn from_char(c: char) -> Self {
        match c.to_ascii_lowercase() {
            't' => Key::Pulse,
            'b' => Key::Response,
            'q' => Key::Quit,
            _ => Key::Other,
        }
    }
}

pub trait InputSource {
    /// Blocks for the next key. With a timeout, `Ok(None)` means nothing arrived in time.
    fn next_key(&mut self, timeout: Option<Duration>) -> TaskResult<Option<Key>>;
}

impl<I: InputSource + ?Sized> InputSource for Box<I> {
    fn next_key(&mut self, timeout: Option<Duration>) -> TaskResult<Option<Key>> {
        (**self).next_key(timeout)
    }
}

/// Receiving end of the key channel fed by the window, stdin or the scanner simulator.
pub struct ChannelInput {
    rx: Receiver<Key>,
}

impl ChannelInput {
    pub fn new(rx: Receiver<Key>) -> Self {
        Self { rx }
    }

    pub fn channel() -> (Sender<Key>, Self) {
        let (tx, rx) = mpsc::channel();
        (tx, Self::new(rx))
    }
}

impl InputSource for ChannelInput {
    fn next_key(&mut self, timeout: Option<Duration>) -> TaskResult<Option<Key>> {
        match timeout {
            None => self.rx.recv().map(Some).map_err(|_| TaskError::InputClosed),
            Some(t) => match self.rx.recv_timeout(t) {
                Ok(key) => Ok(Some(key)),
                Err(RecvTimeoutError::Timeout) => Ok(None),
                Err(RecvTimeoutError::Disconnected) => Err(TaskError::InputClosed),
            },
        }
    }
}

/// Scanner pulses consumed since the session started.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PulseCounter(u64);

impl PulseCounter {
    pub fn value(&self) -> u64 {
        self.0
    }

    fn tick(&mut self) {
        self.0 += 1;
    }
}

/// Blocks until `n` pulses have been consumed, adding each one to `counter`.
///
/// Response keys go to `on_response` with the counter value at that moment;
/// the pulse target is unaffected by them. A quit key aborts. With a
/// `stall_timeout`, going that long without a pulse is an error.
pub fn wait_for_pulses<I, F>(
    input: &mut I,
    counter: &mut PulseCounter,
    n: u32,
    stall_timeout: Option<Duration>,
    mut on_response: F,
) -> TaskResult<u32>
where
    I: InputSource + ?Sized,
    F: FnMut(u64) -> TaskResult<()>,
{
    let mut seen = 0;
    let mut last_pulse = Instant::now();
    while seen < n {
        let remaining = match stall_timeout {
            Some(limit) => match limit.checked_sub(last_pulse.elapsed()) {
                Some(left) => Some(left),
                None => return Err(stalled(limit, seen, n)),
            },
            None => None,
        };
        match input.next_key(remaining)? {
            None => return Err(stalled(stall_timeout.unwrap_or_default(), seen, n)),
            Some(Key::Pulse) => {
                seen += 1;
                counter.tick();
                last_pulse = Instant::now();
                trace!(seen, target = n, ts = counter.value(), "pulse");
            }
            Some(Key::Response) => on_response(counter.value())?,
            Some(Key::Quit) => {
                warn!(ts = counter.value(), "quit key pressed");
                return Err(TaskError::Aborted);
            }
            Some(Key::Other) => {}
        }
    }
    Ok(seen)
}

/// Blocks for the pulse that launches the session. The pulse is not counted.
pub fn wait_for_trigger<I: InputSource + ?Sized>(input: &mut I) -> TaskResult<()> {
    loop {
        match input.next_key(None)? {
            Some(Key::Pulse) => return Ok(()),
            Some(Key::Quit) => {
                warn!("quit key pressed before the first pulse");
                return Err(TaskError::Aborted);
            }
            _ => {}
        }
    }
}

/// Blocks for any operator or participant key. Scanner pulses are skipped.
pub fn wait_for_keypress<I: InputSource + ?Sized>(input: &mut I) -> TaskResult<Key> {
    loop {
        match input.next_key(None)? {
            Some(Key::Pulse) | None => {}
            Some(key) => return Ok(key),
        }
    }
}

fn stalled(waited: Duration, pulses_seen: u32, expected: u32) -> TaskError {
    warn!(?waited, pulses_seen, expected, "scanner pulses stopped");
    TaskError::Stalled {
        waited,
        pulses_seen,
        expected,
    }
}
