//! Devices for running without a window: keys from stdin, frames to the log.

use std::io::{self, BufRead};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

use oddball_core::Stimulus;
use oddball_experiment::{Display, Key, TaskResult};
use tracing::{debug, info};

/// Maps every character of a line to a key; an empty line counts as `Other`.
pub fn keys_in_line(line: &str) -> Vec<Key> {
    let keys: Vec<Key> = line
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(Key::from_char)
        .collect();
    if keys.is_empty() { vec![Key::Other] } else { keys }
}

/// Forwards stdin keys until the session stops listening. EOF counts as a
/// quit, since a simulated scanner would otherwise keep the session alive.
pub fn spawn_stdin(tx: Sender<Key>) -> io::Result<JoinHandle<()>> {
    thread::Builder::new().name("stdin-keys".into()).spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            for key in keys_in_line(&line) {
                if tx.send(key).is_err() {
                    return;
                }
            }
        }
        debug!("stdin closed");
        let _ = tx.send(Key::Quit);
    })
}

/// Logs each committed frame.
#[derive(Debug, Default)]
pub struct LogDisplay {
    pending: Option<Stimulus>,
    pub flips: usize,
}

impl Display for LogDisplay {
    fn draw(&mut self, stimulus: &Stimulus) {
        self.pending = Some(stimulus.clone());
    }

    fn flip(&mut self) -> TaskResult<()> {
        if let Some(stimulus) = self.pending.take() {
            self.flips += 1;
            match &stimulus {
                Stimulus::Text { content, .. } => info!("{content}"),
                other => debug!(frame = self.flips, stimulus = ?other, "flip"),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oddball_core::Color;

    #[test]
    fn line_maps_to_keys() {
        assert_eq!(keys_in_line("t"), vec![Key::Pulse]);
        assert_eq!(keys_in_line("tb q"), vec![Key::Pulse, Key::Response, Key::Quit]);
        assert_eq!(keys_in_line("  "), vec![Key::Other]);
        assert_eq!(keys_in_line("x"), vec![Key::Other]);
    }

    #[test]
    fn flip_without_draw_commits_nothing() {
        let mut d = LogDisplay::default();
        d.flip().unwrap();
        assert_eq!(d.flips, 0);
        d.present(&Stimulus::blank(Color::GREY)).unwrap();
        d.flip().unwrap();
        assert_eq!(d.flips, 1);
    }
}
