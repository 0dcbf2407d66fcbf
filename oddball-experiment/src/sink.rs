use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};
use oddball_core::{EventLabel, EventRecord, LOG_HEADER};
use tracing::{debug, info};

use crate::config::SubjectInfo;
use crate::error::{TaskError, TaskResult};

/// Append-only destination for event records.
pub trait EventSink {
    fn record(&mut self, record: &EventRecord) -> TaskResult<()>;
    /// Flushes and releases the destination. Later records are rejected.
    fn close(&mut self) -> TaskResult<()>;
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn record(&mut self, record: &EventRecord) -> TaskResult<()> {
        (**self).record(record)
    }
    fn close(&mut self) -> TaskResult<()> {
        (**self).close()
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn record(&mut self, record: &EventRecord) -> TaskResult<()> {
        (**self).record(record)
    }
    fn close(&mut self) -> TaskResult<()> {
        (**self).close()
    }
}

/// `<data_dir>/<subject>_fmri_ToneTask_stim_<Mon_Jan_06_14-03-59_2025>.csv`
pub fn log_file_path<Tz>(data_dir: &Path, subject_id: &str, when: &DateTime<Tz>) -> PathBuf
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let stamp = when.format("%a_%b_%d_%H-%M-%S_%Y");
    data_dir.join(format!("{subject_id}_fmri_ToneTask_stim_{stamp}.csv"))
}

/// Summary file written next to the event log.
pub fn summary_path(log_path: &Path) -> PathBuf {
    let stem = log_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "session".to_string());
    log_path.with_file_name(format!("{stem}_summary.json"))
}

/// CSV log, flushed after every record.
pub struct CsvSink<W: Write> {
    writer: Option<csv::Writer<W>>,
    path: Option<PathBuf>,
    rows: usize,
}

impl CsvSink<File> {
    pub fn create(path: &Path) -> TaskResult<Self> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        let file = File::create(path)?;
        let mut sink = Self::from_writer(file)?;
        sink.path = Some(path.to_path_buf());
        info!(path = %path.display(), "event log opened");
        Ok(sink)
    }
}

impl<W: Write> CsvSink<W> {
    pub fn from_writer(inner: W) -> TaskResult<Self> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(inner);
        writer.write_record(LOG_HEADER)?;
        writer.flush()?;
        Ok(Self {
            writer: Some(writer),
            path: None,
            rows: 0,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn is_closed(&self) -> bool {
        self.writer.is_none()
    }

    /// Closes the sink and hands back the underlying writer.
    pub fn into_inner(mut self) -> TaskResult<W> {
        let writer = self.writer.take().ok_or_else(closed_error)?;
        let mut inner = writer.into_inner().map_err(|e| e.into_error())?;
        inner.flush()?;
        Ok(inner)
    }
}

impl<W: Write> EventSink for CsvSink<W> {
    fn record(&mut self, record: &EventRecord) -> TaskResult<()> {
        let writer = self.writer.as_mut().ok_or_else(closed_error)?;
        writer.serialize(record)?;
        writer.flush()?;
        self.rows += 1;
        Ok(())
    }

    fn close(&mut self) -> TaskResult<()> {
        if let Some(writer) = self.writer.take() {
            let mut inner = writer.into_inner().map_err(|e| e.into_error())?;
            inner.flush()?;
            debug!(rows = self.rows, path = ?self.path(), "event log closed");
        }
        Ok(())
    }
}

fn closed_error() -> TaskError {
    TaskError::Io(io::Error::new(io::ErrorKind::BrokenPipe, "event log is closed"))
}

/// Stamps subject columns onto each event before it reaches the sink.
pub struct EventLog<S: EventSink> {
    sink: S,
    subject: SubjectInfo,
    written: usize,
}

impl<S: EventSink> EventLog<S> {
    pub fn new(sink: S, subject: SubjectInfo) -> Self {
        Self {
            sink,
            subject,
            written: 0,
        }
    }

    pub fn emit(&mut self, trial: usize, event: EventLabel, secs: f64, ts: u64) -> TaskResult<()> {
        let record = EventRecord {
            subject_id: self.subject.id.clone(),
            age: self.subject.age.clone(),
            sex: self.subject.sex.to_string(),
            hand: self.subject.hand.to_string(),
            trial,
            event,
            time_from_start: secs,
            ts,
        };
        self.sink.record(&record)?;
        self.written += 1;
        debug!(trial, %event, time = secs, ts, "event");
        Ok(())
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn subject(&self) -> &SubjectInfo {
        &self.subject
    }

    pub fn close(&mut self) -> TaskResult<()> {
        self.sink.close()
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Hand, Sex};
    use chrono::Utc;

    fn subject() -> SubjectInfo {
        SubjectInfo::new("S01", "27", Sex::Female, Hand::Right)
    }

    #[test]
    fn writes_header_then_one_row_per_event() {
        let mut log = EventLog::new(CsvSink::from_writer(Vec::new()).unwrap(), subject());
        log.emit(0, EventLabel::ExperimentStart, 0.0, 0).unwrap();
        log.emit(1, EventLabel::Iti, 2.5, 4).unwrap();
        let bytes = log.into_sink().into_inner().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "SubjectID,Age,Sex,Hand,Trial,Event,TimeFromStart,Ts");
        assert_eq!(lines[1], "S01,27,F,R,0,ExperimentStart,0.0,0");
        assert_eq!(lines[2], "S01,27,F,R,1,ITI,2.5,4");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn every_record_is_on_disk_before_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("log.csv");
        let mut sink = CsvSink::create(&path).unwrap();
        let mut log = EventLog::new(&mut sink, subject());
        log.emit(0, EventLabel::Flash, 0.01, 0).unwrap();

        let on_disk = fs::read_to_string(&path).unwrap();
        assert!(on_disk.contains("Flash"));
        assert_eq!(sink.rows(), 1);
        sink.close().unwrap();
        assert!(sink.is_closed());
    }

    #[test]
    fn closed_sink_rejects_records() {
        let mut sink = CsvSink::from_writer(Vec::new()).unwrap();
        sink.close().unwrap();
        sink.close().unwrap();
        let mut log = EventLog::new(sink, subject());
        assert!(matches!(
            log.emit(1, EventLabel::Iti, 0.0, 0),
            Err(TaskError::Io(_))
        ));
    }

    #[test]
    fn subject_ids_with_commas_are_quoted() {
        let s = SubjectInfo::new("a,b", "30", Sex::Other, Hand::Left);
        let mut log = EventLog::new(CsvSink::from_writer(Vec::new()).unwrap(), s);
        log.emit(2, EventLabel::ResponseMade, 1.25, 9).unwrap();
        let text = String::from_utf8(log.into_sink().into_inner().unwrap()).unwrap();
        assert!(text.lines().nth(1).unwrap().starts_with("\"a,b\",30,O,L,2,ResponseMade"));
    }

    #[test]
    fn file_names_embed_subject_and_time() {
        let when = Utc.with_ymd_and_hms(2025, 1, 6, 14, 3, 59).unwrap();
        let path = log_file_path(Path::new("data"), "S01", &when);
        assert_eq!(
            path,
            Path::new("data").join("S01_fmri_ToneTask_stim_Mon_Jan_06_14-03-59_2025.csv")
        );
        assert_eq!(
            summary_path(&path),
            Path::new("data").join("S01_fmri_ToneTask_stim_Mon_Jan_06_14-03-59_2025_summary.json")
        );
    }
}
