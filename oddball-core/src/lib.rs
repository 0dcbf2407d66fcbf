pub mod event;
pub mod phase;
pub mod stimulus;
pub mod trial;

pub use event::{EventLabel, EventRecord, LOG_HEADER};
pub use phase::{Phase, TaskPhase};
pub use stimulus::{Color, Stimulus};
pub use trial::TrialOutcome;
