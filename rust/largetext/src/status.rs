//! Decoding progress ledger and the blocking waiter protocol.
//!
//! The decoder engine is the only writer of a [`DecodingStatus`]; any number of
//! reader threads ask it to be woken once enough characters are decoded. A reader
//! only parks when its request is ahead of the current progress, so sequential
//! readers trailing the decoder never touch a waiter at all.
//!
//! The status has three phases: in progress, finished and failed. The last two
//! are terminal: the state is frozen and every pending waiter is released.

use std::{
    cmp::{Ordering, Reverse},
    collections::BinaryHeap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use largetext_common::{DecodeError, Error, Result};
use once_cell::sync::OnceCell;

/// A one-shot blocking handle for "at least `required` characters decoded".
#[derive(Debug)]
pub struct Waiter {
    required: usize,
    resolution: OnceCell<std::result::Result<usize, DecodeError>>,
}

impl Waiter {
    fn new(required: usize) -> Arc<Waiter> {
        Arc::new(Waiter {
            required,
            resolution: OnceCell::new(),
        })
    }

    pub fn required(&self) -> usize {
        self.required
    }

    pub fn is_resolved(&self) -> bool {
        self.resolution.get().is_some()
    }

    /// Blocks until the waiter is resolved and returns the number of characters
    /// decoded at that point.
    ///
    /// A waiter released by the end of the file before its threshold was reached
    /// fails with `IndexOutOfBounds`.
    pub fn wait(&self) -> Result<usize> {
        match self.resolution.wait() {
            Ok(available) if *available >= self.required => Ok(*available),
            Ok(available) => Err(Error::out_of_bounds(self.required, *available)),
            Err(e) => Err(e.clone().into()),
        }
    }

    /// Returns `false` if the waiter had already been resolved.
    fn resolve(&self, result: std::result::Result<usize, DecodeError>) -> bool {
        self.resolution.set(result).is_ok()
    }
}

/// Outcome of [`DecodingStatus::add_waiter`].
#[derive(Debug)]
pub enum Admission {
    /// Enough characters are already decoded; carries the current count.
    Satisfied(usize),
    /// The caller has to block on the returned waiter.
    Queued(Arc<Waiter>),
}

impl Admission {
    /// Blocks if needed and returns the decoded character count.
    pub fn wait(self) -> Result<usize> {
        match self {
            Admission::Satisfied(available) => Ok(available),
            Admission::Queued(waiter) => waiter.wait(),
        }
    }
}

struct Pending(Arc<Waiter>);

impl PartialEq for Pending {
    fn eq(&self, other: &Pending) -> bool {
        self.0.required == other.0.required
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Pending) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    fn cmp(&self, other: &Pending) -> Ordering {
        self.0.required.cmp(&other.0.required)
    }
}

#[derive(Default)]
struct State {
    /// `None` until the first progress notification.
    chars_available: Option<usize>,
    finished: bool,
    error: Option<DecodeError>,
    /// Min-heap on `required`.
    waiters: BinaryHeap<Reverse<Pending>>,
}

impl State {
    fn is_terminal(&self) -> bool {
        self.finished || self.error.is_some()
    }

    fn drain_all(&mut self) -> Vec<Arc<Waiter>> {
        let mut released = Vec::with_capacity(self.waiters.len());
        while let Some(Reverse(Pending(waiter))) = self.waiters.pop() {
            released.push(waiter);
        }
        released
    }
}

/// Shared progress of a decoding process.
#[derive(Default)]
pub struct DecodingStatus {
    state: Mutex<State>,
    total: OnceCell<std::result::Result<usize, DecodeError>>,
}

impl DecodingStatus {
    pub fn new() -> DecodingStatus {
        Default::default()
    }

    /// Registers interest in `required` decoded characters.
    ///
    /// Fails right away with the terminal decode error once decoding failed, or
    /// with `IndexOutOfBounds` when decoding finished with fewer characters.
    pub fn add_waiter(&self, required: usize) -> Result<Admission> {
        let mut state = self.lock();
        if let Some(e) = &state.error {
            return Err(e.clone().into());
        }
        let available = state.chars_available;
        if let Some(available) = available.filter(|&available| available >= required) {
            return Ok(Admission::Satisfied(available));
        }
        if state.finished {
            return Err(Error::out_of_bounds(required, available.unwrap_or(0)));
        }
        let waiter = Waiter::new(required);
        state.waiters.push(Reverse(Pending(waiter.clone())));
        Ok(Admission::Queued(waiter))
    }

    /// Blocks until `required` characters are decoded and returns the count
    /// decoded at that time.
    pub fn wait_for(&self, required: usize) -> Result<usize> {
        self.add_waiter(required)?.wait()
    }

    /// Publishes a new decoded character count and wakes, lowest threshold first,
    /// every waiter it satisfies.
    ///
    /// Ignored once the status is terminal or if `chars_available` would
    /// decrease.
    pub fn notify_progress(&self, chars_available: usize) {
        let released = {
            let mut state = self.lock();
            if state.is_terminal() || state.chars_available.is_some_and(|n| n > chars_available)
            {
                return;
            }
            state.chars_available = Some(chars_available);
            let mut released = Vec::new();
            while state
                .waiters
                .peek()
                .is_some_and(|Reverse(Pending(w))| w.required <= chars_available)
            {
                if let Some(Reverse(Pending(waiter))) = state.waiters.pop() {
                    released.push(waiter);
                }
            }
            released
        };
        for waiter in released {
            waiter.resolve(Ok(chars_available));
        }
    }

    /// Marks the decoding as complete with `total_chars` characters and releases
    /// every pending waiter.
    ///
    /// Returns `false` if the status was already terminal.
    pub fn notify_finished(&self, total_chars: usize) -> bool {
        let released = {
            let mut state = self.lock();
            if state.is_terminal() {
                return false;
            }
            state.finished = true;
            state.chars_available = Some(total_chars);
            state.drain_all()
        };
        for waiter in released {
            waiter.resolve(Ok(total_chars));
        }
        let _ = self.total.set(Ok(total_chars));
        true
    }

    /// Records the terminal decode error and fails every pending waiter with it.
    ///
    /// Returns `false` if the status was already terminal.
    pub fn notify_failed(&self, error: DecodeError) -> bool {
        let released = {
            let mut state = self.lock();
            if state.is_terminal() {
                return false;
            }
            state.error = Some(error.clone());
            state.drain_all()
        };
        for waiter in released {
            waiter.resolve(Err(error.clone()));
        }
        let _ = self.total.set(Err(error));
        true
    }

    /// Blocks until decoding ends and returns the total character count.
    pub fn total_chars(&self) -> Result<usize> {
        match self.total.wait() {
            Ok(total) => Ok(*total),
            Err(e) => Err(e.clone().into()),
        }
    }

    /// Decoded character count, `None` before the first progress report.
    pub fn chars_available(&self) -> Option<usize> {
        self.lock().chars_available
    }

    pub fn is_finished(&self) -> bool {
        self.lock().finished
    }

    pub fn error(&self) -> Option<DecodeError> {
        self.lock().error.clone()
    }

    pub fn is_terminal(&self) -> bool {
        self.lock().is_terminal()
    }

    pub fn pending_waiters(&self) -> usize {
        self.lock().waiters.len()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread, time::Duration};

    use largetext_common::DecodeError;

    use super::{Admission, DecodingStatus};

    fn queued(status: &DecodingStatus, required: usize) -> Arc<super::Waiter> {
        match status.add_waiter(required).unwrap() {
            Admission::Queued(waiter) => waiter,
            Admission::Satisfied(n) => panic!("unexpectedly satisfied with {n}"),
        }
    }

    #[test]
    fn test_zero_waiter_is_queued_on_new_status() {
        let status = DecodingStatus::new();
        let waiter = queued(&status, 0);
        assert!(!waiter.is_resolved());
        status.notify_progress(0);
        assert_eq!(waiter.wait().unwrap(), 0);
        assert!(matches!(status.add_waiter(0).unwrap(), Admission::Satisfied(0)));
    }

    #[test]
    fn test_waiter_is_not_woken_below_threshold() {
        let status = DecodingStatus::new();
        let low = queued(&status, 5);
        let high = queued(&status, 10);
        status.notify_progress(7);
        assert!(low.is_resolved());
        assert!(!high.is_resolved());
        assert_eq!(status.pending_waiters(), 1);
        status.notify_progress(10);
        assert_eq!(high.wait().unwrap(), 10);
        assert_eq!(status.pending_waiters(), 0);
    }

    #[test]
    fn test_finish_releases_all_waiters() {
        let status = DecodingStatus::new();
        let within = queued(&status, 3);
        let beyond = queued(&status, 30);
        assert!(status.notify_finished(12));
        assert_eq!(within.wait().unwrap(), 12);
        assert!(beyond.wait().unwrap_err().is_out_of_bounds());
        assert!(status.add_waiter(13).unwrap_err().is_out_of_bounds());
        assert_eq!(status.total_chars().unwrap(), 12);
    }

    #[test]
    fn test_failure_is_terminal_and_shared() {
        let status = DecodingStatus::new();
        status.notify_progress(4);
        let waiter = queued(&status, 8);
        let error = DecodeError::Malformed {
            offset: 4,
            length: 1,
        };
        assert!(status.notify_failed(error));
        assert!(waiter.wait().unwrap_err().is_decode());
        assert!(status.add_waiter(1).unwrap_err().is_decode());
        assert!(status.total_chars().unwrap_err().is_decode());

        // Frozen after the terminal transition.
        assert!(!status.notify_finished(10));
        status.notify_progress(10);
        assert_eq!(status.chars_available(), Some(4));
    }

    #[test]
    fn test_progress_never_decreases() {
        let status = DecodingStatus::new();
        status.notify_progress(10);
        status.notify_progress(3);
        assert_eq!(status.chars_available(), Some(10));
    }

    #[test]
    fn test_blocked_thread_is_woken() {
        let status = Arc::new(DecodingStatus::new());
        let handles = (1..=8)
            .map(|required| {
                let status = status.clone();
                thread::spawn(move || status.wait_for(required * 100))
            })
            .collect::<Vec<_>>();
        thread::sleep(Duration::from_millis(20));
        for n in (0..=1000).step_by(50) {
            status.notify_progress(n);
        }
        for (i, handle) in handles.into_iter().enumerate() {
            let n = handle.join().unwrap().unwrap();
            assert!(n >= (i + 1) * 100);
        }
    }
}
