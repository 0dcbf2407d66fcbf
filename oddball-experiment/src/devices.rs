use oddball_core::Stimulus;

use crate::error::TaskResult;
use crate::pulse::InputSource;

/// Screen the task draws on. `flip` commits whatever was drawn since the
/// previous flip.
pub trait Display {
    fn draw(&mut self, stimulus: &Stimulus);
    fn flip(&mut self) -> TaskResult<()>;

    fn present(&mut self, stimulus: &Stimulus) -> TaskResult<()> {
        self.draw(stimulus);
        self.flip()
    }
}

/// Plays the oddball tone, loaded once up front.
pub trait Audio {
    fn play_tone(&mut self) -> TaskResult<()>;
}

/// The external collaborators a session drives.
pub struct Devices {
    pub display: Box<dyn Display>,
    pub audio: Box<dyn Audio>,
    pub input: Box<dyn InputSource>,
}

impl Devices {
    pub fn new(
        display: impl Display + 'static,
        audio: impl Audio + 'static,
        input: impl InputSource + 'static,
    ) -> Self {
        Self {
            display: Box::new(display),
            audio: Box::new(audio),
            input: Box::new(input),
        }
    }
}
