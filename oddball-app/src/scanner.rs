use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use oddball_experiment::Key;
use oddball_timing::{HighPrecisionTimer, Timer};
use tracing::{debug, trace};

/// Sends one pulse per `tr` until the receiving side goes away.
///
/// Deadlines are absolute, so sleep overshoot does not accumulate.
pub fn spawn(tx: Sender<Key>, tr: Duration) -> std::io::Result<JoinHandle<u64>> {
    thread::Builder::new()
        .name("scanner-sim".into())
        .spawn(move || {
            let timer = HighPrecisionTimer::new();
            let start = timer.now();
            let mut sent = 0u64;
            loop {
                let deadline = tr * (sent as u32 + 1);
                let elapsed = timer.elapsed(start);
                if deadline > elapsed {
                    timer.sleep(deadline - elapsed);
                }
                if tx.send(Key::Pulse).is_err() {
                    break;
                }
                sent += 1;
                trace!(sent, "simulated pulse");
            }
            debug!(sent, "scanner simulator stopped");
            sent
        })
}
