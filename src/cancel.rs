//! Run cancellation
//!
//! A `Cancellation` is shared across pipeline stages and checked between
//! units of work: directory entries during the scan, files in the parser
//! pool, SQL statements in the writer, and rules in the governance
//! runner. It can be triggered externally or by an elapsed deadline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};

#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Cancellation {
    /// A cancellation that never fires on its own.
    pub fn new() -> Self {
        Self::default()
    }

    /// A cancellation that fires once `timeout` has elapsed.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Trigger cancellation from another thread.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        if self.flag.load(Ordering::Relaxed) {
            return true;
        }
        matches!(self.deadline, Some(d) if Instant::now() >= d)
    }

    /// Error out if cancellation has fired.
    pub fn check(&self) -> Result<()> {
        if self.flag.load(Ordering::Relaxed) {
            bail!("run cancelled");
        }
        if matches!(self.deadline, Some(d) if Instant::now() >= d) {
            bail!("run deadline exceeded");
        }
        Ok(())
    }
}
