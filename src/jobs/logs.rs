//! Log Extraction Module
//!
//! Producer that gathers one day of application log lines, and the service
//! that runs it through a job registry.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use flate2::read::GzDecoder;
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::jobs::{Artifact, AsyncJobRegistry, Interrupt, JobStatus, ProducerError};

/// Lines containing this marker are request-tracing noise and never exported.
pub const EXCLUDED_MARKER: &str = "INFO - Input to the controller method";

const DATE_FORMAT: &str = "%Y-%m-%d";

// == Log Source ==
/// Location of the active log file; archives are `<path>.<date>.0.gz`.
#[derive(Debug, Clone)]
pub struct LogSource {
    current_path: PathBuf,
    extract_delay: Duration,
}

impl LogSource {
    pub fn new(current_path: impl Into<PathBuf>) -> Self {
        Self {
            current_path: current_path.into(),
            extract_delay: Duration::ZERO,
        }
    }

    /// Adds an artificial delay before every extraction.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.extract_delay = delay;
        self
    }

    pub fn current_path(&self) -> &Path {
        &self.current_path
    }

    pub fn archive_path(&self, date: NaiveDate) -> PathBuf {
        let mut name = self.current_path.as_os_str().to_owned();
        name.push(format!(".{}.0.gz", date.format(DATE_FORMAT)));
        PathBuf::from(name)
    }

    // == Extract ==
    /// Collects the lines logged on `date`.
    ///
    /// The archive is always read; the active file only when `date` is
    /// `today`. Missing files mean no data. Returns `Ok(None)` when no line
    /// survives filtering.
    pub fn extract(
        &self,
        date: NaiveDate,
        today: NaiveDate,
        interrupt: &Interrupt,
    ) -> std::result::Result<Option<Artifact>, ProducerError> {
        interrupt.sleep(self.extract_delay)?;

        let mut lines = Vec::new();
        if let Some(file) = open_if_exists(&self.archive_path(date))? {
            lines.extend(read_lines(GzDecoder::new(file))?);
        }
        interrupt.check()?;

        if date == today {
            if let Some(file) = open_if_exists(&self.current_path)? {
                lines.extend(read_lines(file)?);
            }
        }
        interrupt.check()?;

        let day = date.format(DATE_FORMAT).to_string();
        let kept: Vec<String> = lines
            .into_iter()
            .filter(|line| line.starts_with(&day) && !line.contains(EXCLUDED_MARKER))
            .collect();

        debug!(date = %day, lines = kept.len(), "Extracted log lines");
        if kept.is_empty() {
            return Ok(None);
        }
        Ok(Some(Artifact::new(
            format!("logs_{}.log", day),
            kept.join("\n"),
        )))
    }
}

fn open_if_exists(path: &Path) -> io::Result<Option<File>> {
    match File::open(path) {
        Ok(file) => Ok(Some(file)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Splits `reader` into lines; bytes that are not valid UTF-8 become U+FFFD.
fn read_lines(reader: impl Read) -> io::Result<Vec<String>> {
    let mut reader = BufReader::new(reader);
    let mut lines = Vec::new();
    let mut buf = Vec::new();

    while reader.read_until(b'\n', &mut buf)? > 0 {
        if buf.ends_with(b"\n") {
            buf.pop();
            if buf.ends_with(b"\r") {
                buf.pop();
            }
        }
        lines.push(String::from_utf8_lossy(&buf).into_owned());
        buf.clear();
    }
    Ok(lines)
}

/// Parses a strict `YYYY-MM-DD` date.
pub fn parse_log_date(raw: &str) -> Result<NaiveDate> {
    let well_formed = raw.len() == 10
        && raw
            .char_indices()
            .all(|(i, c)| if i == 4 || i == 7 { c == '-' } else { c.is_ascii_digit() });

    well_formed
        .then(|| NaiveDate::parse_from_str(raw, DATE_FORMAT).ok())
        .flatten()
        .ok_or_else(|| {
            StoreError::InvalidArgument(format!("Date must be in format yyyy-MM-dd: {}", raw))
        })
}

// == Log Jobs ==
/// Runs log extractions in the background and serves their files.
#[derive(Clone)]
pub struct LogJobs {
    registry: AsyncJobRegistry<Artifact>,
    source: Arc<LogSource>,
}

impl LogJobs {
    pub fn new(registry: AsyncJobRegistry<Artifact>, source: LogSource) -> Self {
        Self {
            registry,
            source: Arc::new(source),
        }
    }

    /// Starts extracting the logs of `date` and returns the job id.
    pub fn request_logs(&self, date: &str) -> Result<String> {
        let date = parse_log_date(date)?;
        let source = Arc::clone(&self.source);

        self.registry.submit(move |interrupt| {
            let today = Local::now().date_naive();
            source.extract(date, today, &interrupt)
        })
    }

    /// Extracts the logs of `date` on the blocking pool and waits for them.
    ///
    /// Fails with `NoLogs` when no line matched.
    pub async fn extract_now(&self, date: &str) -> Result<Artifact> {
        let day = parse_log_date(date)?;
        let source = Arc::clone(&self.source);

        let joined = tokio::task::spawn_blocking(move || {
            let today = Local::now().date_naive();
            source.extract(day, today, &Interrupt::never())
        })
        .await;

        let failed = |source: ProducerError| StoreError::LogExtraction {
            date: date.to_string(),
            source: Arc::new(source),
        };
        match joined {
            Ok(Ok(Some(artifact))) => Ok(artifact),
            Ok(Ok(None)) => Err(StoreError::NoLogs(date.to_string())),
            Ok(Err(error)) => Err(failed(error)),
            Err(join_error) => Err(failed(ProducerError::Panicked(join_error.to_string()))),
        }
    }

    pub fn status(&self, job_id: &str) -> Result<JobStatus> {
        self.registry.status(job_id)
    }

    pub fn file(&self, job_id: &str) -> Result<Artifact> {
        self.registry.result(job_id)
    }

    pub fn registry(&self) -> &AsyncJobRegistry<Artifact> {
        &self.registry
    }
}
