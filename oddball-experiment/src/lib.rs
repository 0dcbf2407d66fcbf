pub mod config;
pub mod devices;
pub mod error;
pub mod pulse;
pub mod sequence;
pub mod sink;
pub mod state;
pub mod summary;
pub mod trial;

pub use config::{Hand, Sex, SubjectInfo, TaskConfig};
pub use devices::{Audio, Devices, Display};
pub use error::{TaskError, TaskResult};
pub use pulse::{ChannelInput, InputSource, Key, PulseCounter};
pub use sequence::TrialSequence;
pub use sink::{CsvSink, EventLog, EventSink};
pub use state::Session;
pub use summary::SessionSummary;
pub use trial::TrialDurations;
