//! Render driver: one blocking chunk read per fixed-interval tick.
//!
//! The driver owns the [`CaptureSession`].  Each [`tick`](RenderDriver::tick)
//! reads a chunk (blocking the caller), reduces it to mono and stores the
//! result as the frame the surface draws next.  Frames are always exactly
//! `chunk_size` long: truncated reads are zero-padded.
//!
//! The driver never decides to stop.  The window owning it calls
//! [`shutdown`](RenderDriver::shutdown) on close; dropping the driver does the
//! same.

use std::time::{Duration, Instant};

use thiserror::Error;

use crate::audio::{
    reduce, AmplitudeFrame, CaptureError, CaptureSession, ReadStatus, ReduceError, SelectedDevice,
    StreamFormat,
};

/// Default tick period.
pub const TICK_INTERVAL: Duration = Duration::from_millis(30);

#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Reduce(#[from] ReduceError),

    #[error("capture session already closed")]
    Closed,
}

/// Counters kept across the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverStats {
    pub ticks: u64,
    pub overflowed: u64,
    pub truncated: u64,
}

pub struct RenderDriver {
    session: Option<CaptureSession>,
    device: SelectedDevice,
    format: StreamFormat,
    interval: Duration,
    frame: AmplitudeFrame,
    last_tick: Option<Instant>,
    stats: DriverStats,
}

impl RenderDriver {
    pub fn new(session: CaptureSession, interval: Duration) -> Self {
        let format = session.format();
        Self {
            device: session.device(),
            session: Some(session),
            format,
            interval,
            frame: AmplitudeFrame::silent(format.chunk_frames),
            last_tick: None,
            stats: DriverStats::default(),
        }
    }

    /// `true` when a tick is owed at `now`.
    pub fn is_due(&self, now: Instant) -> bool {
        self.is_running() && self.until_next(now).is_zero()
    }

    /// Time left before the next tick is due.
    pub fn until_next(&self, now: Instant) -> Duration {
        match self.last_tick {
            Some(last) => (last + self.interval).saturating_duration_since(now),
            None => Duration::ZERO,
        }
    }

    /// Read, reduce and store one frame.
    pub fn tick(&mut self) -> Result<&AmplitudeFrame, DriverError> {
        self.tick_at(Instant::now())
    }

    /// [`tick`](Self::tick) with an explicit start time, used for scheduling.
    pub fn tick_at(&mut self, now: Instant) -> Result<&AmplitudeFrame, DriverError> {
        let session = self.session.as_mut().ok_or(DriverError::Closed)?;
        self.last_tick = Some(now);

        let chunk = session.read_chunk()?;
        match chunk.status {
            ReadStatus::Complete => {}
            ReadStatus::Overflowed => self.stats.overflowed += 1,
            ReadStatus::Truncated => self.stats.truncated += 1,
        }

        self.frame = reduce(&chunk.samples, chunk.channels)?.fit(self.format.chunk_frames);
        self.stats.ticks += 1;
        Ok(&self.frame)
    }

    /// The most recent frame (silence before the first tick).
    pub fn frame(&self) -> &AmplitudeFrame {
        &self.frame
    }

    pub fn chunk_size(&self) -> usize {
        self.format.chunk_frames
    }

    pub fn format(&self) -> StreamFormat {
        self.format
    }

    pub fn device(&self) -> SelectedDevice {
        self.device
    }

    pub fn stats(&self) -> DriverStats {
        self.stats
    }

    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }

    /// Close the capture session.  Safe to call more than once; only the first
    /// call does anything.
    pub fn shutdown(&mut self) -> Result<(), CaptureError> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };
        log::info!(
            "render loop stopped after {} ticks ({} overflowed, {} truncated)",
            self.stats.ticks,
            self.stats.overflowed,
            self.stats.truncated
        );
        session.close()
    }
}

impl Drop for RenderDriver {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            log::warn!("error while stopping capture: {e}");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
