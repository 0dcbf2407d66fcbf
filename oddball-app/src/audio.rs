use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use oddball_experiment::{Audio, TaskError, TaskResult};
use rodio::buffer::SamplesBuffer;
use rodio::source::{SineWave, Source};
use rodio::{Decoder, OutputStream, OutputStreamHandle};
use tracing::{debug, info};

/// Frequency and length of the synthesised fallback tone.
const TONE_HZ: f32 = 1000.0;
const TONE_LENGTH: Duration = Duration::from_millis(200);

/// Decoded tone kept in memory so onset latency does not include file IO.
#[derive(Debug, Clone, PartialEq)]
pub struct ToneClip {
    pub channels: u16,
    pub sample_rate: u32,
    pub samples: Vec<f32>,
}

impl ToneClip {
    pub fn load(path: &Path) -> TaskResult<Self> {
        let file = File::open(path)?;
        let decoder = Decoder::new(BufReader::new(file))
            .map_err(|e| TaskError::Audio(format!("{}: {e}", path.display())))?;
        Ok(Self::from_source(decoder.convert_samples()))
    }

    pub fn sine(freq: f32, length: Duration) -> Self {
        Self::from_source(SineWave::new(freq).take_duration(length).amplify(0.5))
    }

    fn from_source<S: Source<Item = f32>>(source: S) -> Self {
        let channels = source.channels();
        let sample_rate = source.sample_rate();
        Self {
            channels,
            sample_rate,
            samples: source.collect(),
        }
    }

    pub fn duration(&self) -> Duration {
        let frames = self.samples.len() as f64 / f64::from(self.channels.max(1));
        Duration::from_secs_f64(frames / f64::from(self.sample_rate.max(1)))
    }

    fn buffer(&self) -> SamplesBuffer<f32> {
        SamplesBuffer::new(self.channels, self.sample_rate, self.samples.clone())
    }
}

/// Plays the clip on the default output device. Not `Send`: build it on
/// the thread that runs the session.
pub struct RodioTone {
    _stream: OutputStream,
    handle: OutputStreamHandle,
    clip: ToneClip,
}

impl RodioTone {
    pub fn open(tone: Option<&Path>) -> TaskResult<Self> {
        let clip = match tone {
            Some(path) => ToneClip::load(path)?,
            None => ToneClip::sine(TONE_HZ, TONE_LENGTH),
        };
        let (stream, handle) =
            OutputStream::try_default().map_err(|e| TaskError::Audio(e.to_string()))?;
        info!(
            source = tone.map(|p| p.display().to_string()).unwrap_or_else(|| "sine".into()),
            length_ms = clip.duration().as_millis() as u64,
            "tone loaded"
        );
        Ok(Self {
            _stream: stream,
            handle,
            clip,
        })
    }
}

impl Audio for RodioTone {
    fn play_tone(&mut self) -> TaskResult<()> {
        self.handle
            .play_raw(self.clip.buffer())
            .map_err(|e| TaskError::Audio(e.to_string()))
    }
}

/// Stand-in for rigs without an output device.
#[derive(Debug, Default)]
pub struct MutedAudio {
    pub onsets: usize,
}

impl Audio for MutedAudio {
    fn play_tone(&mut self) -> TaskResult<()> {
        self.onsets += 1;
        debug!(onsets = self.onsets, "tone (muted)");
        Ok(())
    }
}
