//! Append-only decoded unit storage shared between one producer thread and
//! the control thread.
//!
//! The producer is the only writer; readers coordinate through the
//! atomically published length. A reader that observes `len() == n` may
//! safely read any index below `n`.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::PlayerError;

/// Outcome of a random-access read.
#[derive(Debug, Clone)]
pub enum ReadOutcome {
    /// Read-only view of the decoded unit at the requested index.
    Unit(Arc<[u8]>),
    /// The producer has not appended this index yet; retry on a later tick.
    NotYetAvailable,
    /// The buffer is sealed and will never contain this index.
    OutOfRange,
}

pub struct StreamBuffer {
    units: Mutex<Vec<Arc<[u8]>>>,
    len: AtomicUsize,
    sealed: AtomicBool,
    failed: AtomicBool,
    discarded: AtomicUsize,
}

impl StreamBuffer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            units: Mutex::new(Vec::new()),
            len: AtomicUsize::new(0),
            sealed: AtomicBool::new(false),
            failed: AtomicBool::new(false),
            discarded: AtomicUsize::new(0),
        })
    }

    /// Appends a unit at the next index. Only the owning producer calls this;
    /// appending after `seal` is a programming error.
    pub fn append(&self, unit: Arc<[u8]>) -> Result<usize, PlayerError> {
        if self.sealed.load(Ordering::Acquire) {
            return Err(PlayerError::SealedBufferAppend);
        }
        let mut units = self.units.lock().unwrap();
        units.push(unit);
        let index = units.len() - 1;
        self.len.store(units.len(), Ordering::Release);
        Ok(index)
    }

    pub fn read(&self, index: usize) -> ReadOutcome {
        if index < self.len.load(Ordering::Acquire) {
            let units = self.units.lock().unwrap();
            return ReadOutcome::Unit(units[index].clone());
        }
        if self.sealed.load(Ordering::Acquire) {
            // The final append may have landed between the two loads.
            if index < self.len.load(Ordering::Acquire) {
                let units = self.units.lock().unwrap();
                return ReadOutcome::Unit(units[index].clone());
            }
            ReadOutcome::OutOfRange
        } else {
            ReadOutcome::NotYetAvailable
        }
    }

    /// Current unit count; monotonically non-decreasing.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Marks the end of the stream; no further appends are accepted.
    pub fn seal(&self) {
        self.sealed.store(true, Ordering::Release);
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    /// Seals the buffer and flags that the producer ended abnormally.
    /// Units appended before the failure stay readable.
    pub fn mark_failed(&self) {
        self.seal();
        self.failed.store(true, Ordering::Release);
    }

    pub fn has_failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    /// Counts a unit dropped because of a short read. Returns the new total.
    pub fn record_discard(&self) -> usize {
        self.discarded.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Units discarded by the producer due to short reads.
    pub fn discarded(&self) -> usize {
        self.discarded.load(Ordering::SeqCst)
    }
}
