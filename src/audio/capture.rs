//! Capture session: one bound input stream, read one chunk at a time.
//!
//! [`CaptureSession::open`] binds an input stream to the selected device.
//! [`CaptureSession::read_chunk`] blocks until a full chunk is available (or
//! the read is cut short, see [`ReadStatus`]).  [`CaptureSession::close`]
//! stops the stream and releases the device; dropping an unclosed session
//! does the same, so the device is released on every exit path.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::audio::device::{AudioHost, SelectedDevice};

/// Capture sample rate in Hz.
pub const SAMPLE_RATE: u32 = 48_000;
/// Frames per chunk for the standard view.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;
/// Frames per chunk for the wide view.
pub const LARGE_CHUNK_SIZE: usize = 4096;

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Errors raised by the audio subsystem or a running capture stream.
///
/// Buffer overflow never appears here: overrun is reported through
/// [`ReadStatus::Overflowed`] and never fails a read.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("audio subsystem unavailable: {0}")]
    SubsystemUnavailable(String),

    #[error("no audio device at index {0}")]
    DeviceNotFound(usize),

    #[error("device {index} cannot capture {format}: {reason}")]
    StreamOpen {
        index: usize,
        format: StreamFormat,
        reason: String,
    },

    #[error("{0}-channel capture is not supported (mono or stereo only)")]
    UnsupportedChannelCount(u16),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("audio stream error: {0}")]
    Stream(String),
}

// ---------------------------------------------------------------------------
// StreamFormat / CaptureOptions
// ---------------------------------------------------------------------------

/// The format a session asks the backend to bind.  Samples reach the
/// pipeline as signed 16-bit whatever the device produces natively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    pub sample_rate: u32,
    pub chunk_frames: usize,
    pub channels: u16,
}

impl StreamFormat {
    /// Interleaved samples in one full chunk.
    pub fn chunk_samples(&self) -> usize {
        self.chunk_frames * self.channels as usize
    }
}

impl fmt::Display for StreamFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "16-bit {} Hz, {} ch, {} frames/chunk",
            self.sample_rate, self.channels, self.chunk_frames
        )
    }
}

/// Session parameters, fixed from open to close.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureOptions {
    pub sample_rate: u32,
    /// Frames per chunk.
    pub chunk_size: usize,
    /// Capacity of the backend-side queue, in chunks.
    pub buffer_chunks: usize,
    /// Longest a read waits before returning a truncated chunk.
    pub read_timeout: Duration,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            buffer_chunks: 4,
            read_timeout: Duration::from_millis(500),
        }
    }
}

impl CaptureOptions {
    pub fn format(&self, channels: u16) -> StreamFormat {
        StreamFormat {
            sample_rate: self.sample_rate,
            chunk_frames: self.chunk_size,
            channels,
        }
    }
}

// ---------------------------------------------------------------------------
// RawChunk
// ---------------------------------------------------------------------------

/// How a chunk read finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// A full chunk arrived in time.
    Complete,
    /// The backend overwrote unread samples since the previous read.  The
    /// chunk is full but not contiguous with the last one.
    Overflowed,
    /// The device stalled; the chunk holds only what arrived before the
    /// read timeout.
    Truncated,
}

/// Interleaved 16-bit samples from one read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChunk {
    pub samples: Vec<i16>,
    pub channels: u16,
    pub status: ReadStatus,
}

impl RawChunk {
    /// Number of whole frames in the chunk.
    pub fn frames(&self) -> usize {
        match self.channels {
            0 => 0,
            n => self.samples.len() / n as usize,
        }
    }
}

// ---------------------------------------------------------------------------
// ChunkSource
// ---------------------------------------------------------------------------

/// A started input stream that hands out chunks on demand.
///
/// # Blocking contract
///
/// [`read_frames`](Self::read_frames) runs on the caller's thread and blocks
/// it until `frames` frames are available, the stream reports an error, or
/// the source's stall timeout expires.  The render tick calls it directly;
/// moving reads to a separate thread needs its own queueing and back-pressure
/// design.
pub trait ChunkSource {
    /// Read exactly `frames` frames, or fewer when [`ReadStatus::Truncated`].
    fn read_frames(&mut self, frames: usize) -> Result<RawChunk, CaptureError>;

    /// Stop delivering audio.  The device is released when the source is
    /// dropped.
    fn stop(&mut self) -> Result<(), CaptureError>;
}

// ---------------------------------------------------------------------------
// CaptureSession
// ---------------------------------------------------------------------------

/// An open capture stream bound to one device.
pub struct CaptureSession {
    device: SelectedDevice,
    format: StreamFormat,
    source: Option<Box<dyn ChunkSource>>,
}

impl fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureSession")
            .field("device", &self.device)
            .field("format", &self.format)
            .field("open", &self.source.is_some())
            .finish()
    }
}

impl CaptureSession {
    /// Open and start a stream on `device`.
    ///
    /// # Errors
    ///
    /// - [`CaptureError::UnsupportedChannelCount`] for devices with more than
    ///   two input channels.
    /// - [`CaptureError::StreamOpen`] when the device cannot bind the format.
    pub fn open<H: AudioHost + ?Sized>(
        host: &H,
        device: SelectedDevice,
        options: &CaptureOptions,
    ) -> Result<Self, CaptureError> {
        if !(1..=2).contains(&device.channel_count) {
            return Err(CaptureError::UnsupportedChannelCount(device.channel_count));
        }

        let format = options.format(device.channel_count);
        let source = host.open_stream(device, options)?;
        log::info!("capture session opened on device {} ({format})", device.index);

        Ok(Self {
            device,
            format,
            source: Some(source),
        })
    }

    /// Read the next chunk, blocking the caller until it is ready.
    ///
    /// Overflow is not an error: the chunk comes back marked
    /// [`ReadStatus::Overflowed`].
    pub fn read_chunk(&mut self) -> Result<RawChunk, CaptureError> {
        let frames = self.format.chunk_frames;
        let source = self
            .source
            .as_mut()
            .ok_or_else(|| CaptureError::Stream("capture session is closed".into()))?;

        let chunk = source.read_frames(frames)?;
        match chunk.status {
            ReadStatus::Complete => {}
            ReadStatus::Overflowed => log::debug!("input overflow; continuing with buffered audio"),
            ReadStatus::Truncated => log::warn!(
                "device stalled: got {} of {frames} frames before timeout",
                chunk.frames()
            ),
        }
        Ok(chunk)
    }

    pub fn device(&self) -> SelectedDevice {
        self.device
    }

    pub fn format(&self) -> StreamFormat {
        self.format
    }

    /// Stop the stream, then release the device.
    pub fn close(mut self) -> Result<(), CaptureError> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<(), CaptureError> {
        let Some(mut source) = self.source.take() else {
            return Ok(());
        };
        let stopped = source.stop();
        drop(source);
        log::info!("capture session on device {} closed", self.device.index);
        stopped
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            log::warn!("error while closing capture session: {e}");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
