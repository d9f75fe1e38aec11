//! Interrupt Module
//!
//! Lets a running producer notice that its registry is shutting down.

use std::time::{Duration, Instant};

use tokio::sync::watch;

use crate::jobs::ProducerError;

/// Granularity of [`Interrupt::sleep`].
const POLL_SLICE: Duration = Duration::from_millis(50);

// == Interrupt ==
/// Read side of a registry's shutdown signal, handed to every producer.
///
/// All methods are synchronous so they can be used from blocking producers.
#[derive(Debug, Clone)]
pub struct Interrupt {
    signal: watch::Receiver<bool>,
}

impl Interrupt {
    pub(crate) fn new(signal: watch::Receiver<bool>) -> Self {
        Self { signal }
    }

    /// An interrupt that never fires, for running a producer by hand.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self::new(rx)
    }

    pub fn is_interrupted(&self) -> bool {
        *self.signal.borrow()
    }

    /// Fails with [`ProducerError::Interrupted`] once interrupted.
    pub fn check(&self) -> Result<(), ProducerError> {
        if self.is_interrupted() {
            Err(ProducerError::Interrupted)
        } else {
            Ok(())
        }
    }

    /// Blocks the current thread for `duration`, returning early with
    /// [`ProducerError::Interrupted`] if interrupted meanwhile.
    pub fn sleep(&self, duration: Duration) -> Result<(), ProducerError> {
        let deadline = Instant::now() + duration;
        loop {
            self.check()?;
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                return Ok(());
            }
            std::thread::sleep(left.min(POLL_SLICE));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_is_not_interrupted() {
        let interrupt = Interrupt::never();

        assert!(!interrupt.is_interrupted());
        assert!(interrupt.check().is_ok());
        assert!(interrupt.sleep(Duration::from_millis(5)).is_ok());
    }

    #[test]
    fn test_signal_interrupts_sleep() {
        let (tx, rx) = watch::channel(false);
        let interrupt = Interrupt::new(rx);

        let waker = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            tx.send(true).unwrap();
        });

        let started = Instant::now();
        let result = interrupt.sleep(Duration::from_secs(30));
        waker.join().unwrap();

        assert!(matches!(result, Err(ProducerError::Interrupted)));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(interrupt.is_interrupted());
    }
}
