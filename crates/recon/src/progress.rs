//! Run counters and the periodic progress reporter.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use serde::Serialize;

use crate::decide::SkipReason;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    Total,
    NotSerial,
    NotNewspaper,
    Newspapers,
    NoControlNumber,
    Microform,
    Electronic,
    Infrequent,
    NoPlace,
    Matched,
    Updated,
    Unchanged,
    Created,
    Written,
    Archived,
}

const COUNTERS: usize = 15;

impl From<SkipReason> for Counter {
    fn from(reason: SkipReason) -> Self {
        match reason {
            SkipReason::NoControlNumber => Self::NoControlNumber,
            SkipReason::Microform => Self::Microform,
            SkipReason::Electronic => Self::Electronic,
            SkipReason::Infrequent => Self::Infrequent,
            SkipReason::NoPlace => Self::NoPlace,
        }
    }
}

/// Counters shared with the reporter thread.
#[derive(Debug, Default)]
pub struct RunStats {
    counters: [AtomicU64; COUNTERS],
}

impl RunStats {
    pub fn incr(&self, counter: Counter) {
        self.counters[counter as usize].fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self, counter: Counter) -> u64 {
        self.counters[counter as usize].load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total: self.get(Counter::Total),
            not_serial: self.get(Counter::NotSerial),
            not_newspaper: self.get(Counter::NotNewspaper),
            newspapers: self.get(Counter::Newspapers),
            no_control_number: self.get(Counter::NoControlNumber),
            microform: self.get(Counter::Microform),
            electronic: self.get(Counter::Electronic),
            infrequent: self.get(Counter::Infrequent),
            no_place: self.get(Counter::NoPlace),
            matched: self.get(Counter::Matched),
            updated: self.get(Counter::Updated),
            unchanged: self.get(Counter::Unchanged),
            created: self.get(Counter::Created),
            written: self.get(Counter::Written),
            archived: self.get(Counter::Archived),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub total: u64,
    pub not_serial: u64,
    pub not_newspaper: u64,
    pub newspapers: u64,
    pub no_control_number: u64,
    pub microform: u64,
    pub electronic: u64,
    pub infrequent: u64,
    pub no_place: u64,
    /// Entries whose control number resolved to an existing record.
    pub matched: u64,
    pub updated: u64,
    pub unchanged: u64,
    pub created: u64,
    /// Store writes actually issued (zero for dry runs).
    pub written: u64,
    pub archived: u64,
}

impl StatsSnapshot {
    pub fn skipped(&self) -> u64 {
        self.no_control_number + self.microform + self.electronic + self.infrequent + self.no_place
    }

    pub fn log(&self, label: &str) {
        tracing::info!(
            total = self.total,
            newspapers = self.newspapers,
            skipped = self.skipped(),
            matched = self.matched,
            updated = self.updated,
            created = self.created,
            written = self.written,
            "{label}"
        );
    }
}

/// Logs a snapshot every `interval` until stopped or dropped.
pub struct ProgressReporter {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ProgressReporter {
    pub fn start(stats: Arc<RunStats>, interval: Duration) -> Self {
        let (stop, stopped) = mpsc::channel::<()>();
        let handle = std::thread::spawn(move || loop {
            match stopped.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => stats.snapshot().log("progress"),
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        });
        Self {
            stop: Some(stop),
            handle: Some(handle),
        }
    }

    /// Stop the timer thread and wait for it to exit.
    pub fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            join_reporter(handle);
        }
    }
}

/// Wait for the timer thread. Returns false if it panicked.
fn join_reporter(handle: JoinHandle<()>) -> bool {
    match handle.join() {
        Ok(()) => true,
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::warn!(%message, "progress reporter thread panicked");
            false
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.stop();
    }
}
