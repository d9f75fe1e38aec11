//! Jobs Module
//!
//! Runs long producers off the caller's path and exposes their outcome for
//! polling until it expires.

mod artifact;
mod interrupt;
mod logs;
mod registry;

use thiserror::Error;

pub use artifact::Artifact;
pub use interrupt::Interrupt;
pub use logs::{parse_log_date, LogJobs, LogSource, EXCLUDED_MARKER};
pub use registry::{AsyncJobRegistry, ExpiresIn, JobStatus};

// == Producer Error ==
/// Failure raised by a producer while it runs.
///
/// Recorded on the job and surfaced to callers only as the cause of
/// [`StoreError::ProducerFailure`](crate::error::StoreError::ProducerFailure).
#[derive(Error, Debug)]
pub enum ProducerError {
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("Producer was interrupted")]
    Interrupted,

    #[error("Producer panicked: {0}")]
    Panicked(String),
}
