//! Bounded sample storage between the backend callback and the blocking read.
//!
//! [`RingBuffer`] is a fixed-capacity FIFO that overwrites its oldest data when
//! full.  [`SampleQueue`] wraps one in a mutex + condvar so the cpal callback
//! thread can push while the render tick blocks in [`SampleQueue::read`].
//!
//! # Example
//!
//! ```rust
//! use loopback_scope::audio::RingBuffer;
//!
//! let mut buf = RingBuffer::new(4);
//! let overwritten = buf.push_slice(&[1i16, 2, 3, 4, 5]); // capacity 4 → oldest dropped
//! assert_eq!(overwritten, 1);
//! assert_eq!(buf.take_front(2), vec![2, 3]);
//! ```

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::audio::capture::{CaptureError, ReadStatus};

// ---------------------------------------------------------------------------
// RingBuffer
// ---------------------------------------------------------------------------

/// A fixed-capacity circular buffer.
///
/// ## Overflow behaviour
///
/// When [`push_slice`](Self::push_slice) would exceed `capacity`, the oldest
/// samples are overwritten and the number lost is returned.  The buffer never
/// allocates beyond its initial capacity.
pub struct RingBuffer<T> {
    buf: Vec<T>,
    capacity: usize,
    /// Index of the *next* write position (wraps around `capacity`).
    write_pos: usize,
    /// Number of valid samples currently stored (≤ `capacity`).
    len: usize,
}

impl<T: Copy + Default> RingBuffer<T> {
    /// Create a new ring buffer with the given `capacity`.
    ///
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "RingBuffer capacity must be > 0");
        Self {
            buf: vec![T::default(); capacity],
            capacity,
            write_pos: 0,
            len: 0,
        }
    }

    /// Append `data`, returning how many unread samples were overwritten.
    pub fn push_slice(&mut self, data: &[T]) -> usize {
        let mut overwritten = 0;
        for &item in data {
            self.buf[self.write_pos] = item;
            self.write_pos = (self.write_pos + 1) % self.capacity;
            if self.len < self.capacity {
                self.len += 1;
            } else {
                overwritten += 1;
            }
        }
        overwritten
    }

    /// Remove and return the oldest `count` samples (or all, if fewer are
    /// stored), in chronological order.
    pub fn take_front(&mut self, count: usize) -> Vec<T> {
        let count = count.min(self.len);
        let read_pos = (self.write_pos + self.capacity - self.len) % self.capacity;

        let result = (0..count)
            .map(|i| self.buf[(read_pos + i) % self.capacity])
            .collect();
        self.len -= count;
        result
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

// ---------------------------------------------------------------------------
// SampleQueue
// ---------------------------------------------------------------------------

/// Result of one [`SampleQueue::read`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueRead {
    pub samples: Vec<i16>,
    pub status: ReadStatus,
}

struct QueueState {
    samples: RingBuffer<i16>,
    /// Set when a push overwrote unread samples; cleared by the next read.
    overflowed: bool,
    /// First stream error reported by the backend, surfaced on the next read.
    fault: Option<String>,
}

/// Thread-safe sample queue filled by the backend callback.
pub struct SampleQueue {
    state: Mutex<QueueState>,
    ready: Condvar,
}

impl SampleQueue {
    /// `capacity` is in interleaved samples and should be a whole number of
    /// frames.
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(QueueState {
                samples: RingBuffer::new(capacity),
                overflowed: false,
                fault: None,
            }),
            ready: Condvar::new(),
        }
    }

    /// Append samples from the backend, overwriting the oldest on overrun.
    pub fn push(&self, data: &[i16]) {
        let mut state = self.lock();
        if state.samples.push_slice(data) > 0 && !state.overflowed {
            log::trace!("sample queue overrun");
            state.overflowed = true;
        }
        drop(state);
        self.ready.notify_one();
    }

    /// Record a backend stream error; the next [`read`](Self::read) fails.
    pub fn fail(&self, message: impl Into<String>) {
        let mut state = self.lock();
        if state.fault.is_none() {
            state.fault = Some(message.into());
        }
        drop(state);
        self.ready.notify_one();
    }

    /// Block until `wanted` samples are queued, then take them.
    ///
    /// If `timeout` expires first, returns whatever whole frames (multiples of
    /// `align` samples) are queued, marked [`ReadStatus::Truncated`].
    pub fn read(
        &self,
        wanted: usize,
        align: usize,
        timeout: Duration,
    ) -> Result<QueueRead, CaptureError> {
        let align = align.max(1);
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();

        loop {
            if let Some(message) = state.fault.take() {
                return Err(CaptureError::Stream(message));
            }

            if state.samples.len() >= wanted {
                let status = if std::mem::take(&mut state.overflowed) {
                    ReadStatus::Overflowed
                } else {
                    ReadStatus::Complete
                };
                return Ok(QueueRead {
                    samples: state.samples.take_front(wanted),
                    status,
                });
            }

            let now = Instant::now();
            if now >= deadline {
                let available = state.samples.len() - state.samples.len() % align;
                state.overflowed = false;
                return Ok(QueueRead {
                    samples: state.samples.take_front(available),
                    status: ReadStatus::Truncated,
                });
            }

            let (guard, _) = self
                .ready
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;
        }
    }

    // A panicking callback must not take the render loop down with it.
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    // ---- RingBuffer ---------------------------------------------------------

    #[test]
    fn push_and_take_within_capacity() {
        let mut buf = RingBuffer::new(8);
        assert_eq!(buf.push_slice(&[1i16, 2, 3]), 0);
        assert_eq!(buf.len(), 3);

        assert_eq!(buf.take_front(2), vec![1, 2]);
        assert_eq!(buf.len(), 1);
        assert_eq!(buf.take_front(8), vec![3]);
        assert!(buf.is_empty());
    }

    #[test]
    fn overflow_drops_oldest_and_reports_count() {
        let mut buf = RingBuffer::new(4);
        let lost = buf.push_slice(&[1i16, 2, 3, 4, 5, 6]);
        assert_eq!(lost, 2);
        assert_eq!(buf.len(), 4);
        assert_eq!(buf.take_front(4), vec![3, 4, 5, 6]);
    }

    #[test]
    fn take_front_after_wraparound_preserves_order() {
        let mut buf = RingBuffer::new(4);
        buf.push_slice(&[1i16, 2, 3]);
        assert_eq!(buf.take_front(2), vec![1, 2]);
        buf.push_slice(&[4, 5, 6]); // wraps past the end of storage
        assert_eq!(buf.take_front(10), vec![3, 4, 5, 6]);
    }

    #[test]
    fn full_buffer_keeps_overwriting_in_order() {
        let mut buf = RingBuffer::new(4);
        buf.push_slice(&[1i16, 2, 3, 4]);
        assert_eq!(buf.push_slice(&[5]), 1);
        assert_eq!(buf.push_slice(&[6, 7]), 2);
        assert_eq!(buf.take_front(4), vec![4, 5, 6, 7]);
    }

    #[test]
    #[should_panic(expected = "RingBuffer capacity must be > 0")]
    fn zero_capacity_panics() {
        let _buf: RingBuffer<i16> = RingBuffer::new(0);
    }

    // ---- SampleQueue --------------------------------------------------------

    #[test]
    fn read_returns_complete_chunk_when_data_is_queued() {
        let queue = SampleQueue::new(16);
        queue.push(&[1, 2, 3, 4, 5, 6]);

        let read = queue.read(4, 2, Duration::from_millis(10)).unwrap();
        assert_eq!(read.samples, vec![1, 2, 3, 4]);
        assert_eq!(read.status, ReadStatus::Complete);

        let rest = queue.read(2, 2, Duration::from_millis(10)).unwrap();
        assert_eq!(rest.samples, vec![5, 6]);
        assert_eq!(rest.status, ReadStatus::Complete);
    }

    #[test]
    fn read_blocks_until_producer_delivers() {
        let queue = Arc::new(SampleQueue::new(64));
        let producer = Arc::clone(&queue);

        let handle = thread::spawn(move || {
            for block in [[1i16, 1, 1, 1], [2, 2, 2, 2]] {
                thread::sleep(Duration::from_millis(20));
                producer.push(&block);
            }
        });

        let read = queue.read(8, 2, Duration::from_secs(5)).unwrap();
        handle.join().unwrap();

        assert_eq!(read.status, ReadStatus::Complete);
        assert_eq!(read.samples, vec![1, 1, 1, 1, 2, 2, 2, 2]);
    }

    #[test]
    fn overflow_is_reported_once_and_data_still_flows() {
        let queue = SampleQueue::new(4);
        queue.push(&[1, 2, 3, 4, 5, 6]);

        let first = queue.read(4, 2, Duration::from_millis(10)).unwrap();
        assert_eq!(first.status, ReadStatus::Overflowed);
        assert_eq!(first.samples, vec![3, 4, 5, 6]);

        queue.push(&[7, 8, 9, 10]);
        let second = queue.read(4, 2, Duration::from_millis(10)).unwrap();
        assert_eq!(second.status, ReadStatus::Complete);
    }

    #[test]
    fn stall_returns_whole_frames_only() {
        let queue = SampleQueue::new(16);
        queue.push(&[1, 2, 3]); // one and a half stereo frames

        let read = queue.read(8, 2, Duration::from_millis(5)).unwrap();
        assert_eq!(read.status, ReadStatus::Truncated);
        assert_eq!(read.samples, vec![1, 2]);
    }

    #[test]
    fn stall_with_nothing_queued_returns_empty_chunk() {
        let queue = SampleQueue::new(16);
        let read = queue.read(8, 2, Duration::from_millis(5)).unwrap();
        assert_eq!(read.status, ReadStatus::Truncated);
        assert!(read.samples.is_empty());
    }

    #[test]
    fn backend_fault_fails_next_read() {
        let queue = SampleQueue::new(16);
        queue.fail("device unplugged");
        queue.fail("second error is ignored");

        let err = queue.read(4, 2, Duration::from_millis(5)).unwrap_err();
        assert!(err.to_string().contains("device unplugged"), "{err}");
    }
}
