//! Byte sources for exercising blocking and failure paths.

use std::{
    ops::Range,
    sync::{Condvar, Mutex, PoisonError},
    time::Duration,
};

use largetext_io::{Bytes, ReadAt};

#[derive(Default)]
struct Gate {
    open: bool,
    reads_started: usize,
}

/// In-memory source whose reads block until [`GatedReader::release`] is called.
pub struct GatedReader {
    content: Bytes,
    /// Reads ending at or before this offset are not gated.
    gated_from: u64,
    gate: Mutex<Gate>,
    changed: Condvar,
}

impl GatedReader {
    pub fn new(content: impl Into<Vec<u8>>) -> GatedReader {
        GatedReader::gated_from(content, 0)
    }

    /// Source blocking only the reads that reach past `offset`.
    pub fn gated_from(content: impl Into<Vec<u8>>, offset: u64) -> GatedReader {
        GatedReader {
            content: Bytes::from(content.into()),
            gated_from: offset,
            gate: Mutex::new(Gate::default()),
            changed: Condvar::new(),
        }
    }

    /// Lets every pending and future read through.
    pub fn release(&self) {
        let mut gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        gate.open = true;
        self.changed.notify_all();
    }

    /// Waits until at least one gated read started.
    ///
    /// Returns `false` on timeout.
    pub fn wait_for_read(&self, timeout: Duration) -> bool {
        let gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        let (gate, _) = self
            .changed
            .wait_timeout_while(gate, timeout, |gate| gate.reads_started == 0)
            .unwrap_or_else(PoisonError::into_inner);
        gate.reads_started > 0
    }
}

impl ReadAt for GatedReader {
    fn size(&self) -> std::io::Result<u64> {
        self.content.size()
    }

    fn read_at(&self, range: Range<u64>) -> std::io::Result<Bytes> {
        if range.end <= self.gated_from {
            return self.content.read_at(range);
        }
        let mut gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        gate.reads_started += 1;
        self.changed.notify_all();
        let gate = self
            .changed
            .wait_while(gate, |gate| !gate.open)
            .unwrap_or_else(PoisonError::into_inner);
        drop(gate);
        self.content.read_at(range)
    }
}

/// In-memory source failing every read that reaches past `fail_from`.
pub struct FailingReader {
    content: Bytes,
    fail_from: u64,
}

impl FailingReader {
    pub fn new(content: impl Into<Vec<u8>>, fail_from: u64) -> FailingReader {
        FailingReader {
            content: Bytes::from(content.into()),
            fail_from,
        }
    }
}

impl ReadAt for FailingReader {
    fn size(&self) -> std::io::Result<u64> {
        self.content.size()
    }

    fn read_at(&self, range: Range<u64>) -> std::io::Result<Bytes> {
        if range.end > self.fail_from {
            return Err(std::io::Error::other(format!(
                "injected failure reading {range:?}"
            )));
        }
        self.content.read_at(range)
    }
}
