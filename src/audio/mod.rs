//! Audio pipeline: loopback device → blocking chunk reads → mono reduction.
//!
//! # Pipeline
//!
//! ```text
//! AudioHost::devices → DeviceSelector → SelectedDevice
//!     → CaptureSession::open → read_chunk (blocking) → RawChunk
//!     → reduce → AmplitudeFrame → WaveformView
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use loopback_scope::audio::{reduce, CaptureOptions, CaptureSession, CpalHost, SelectedDevice};
//!
//! let host = CpalHost::new();
//! let device = SelectedDevice { index: 1, channel_count: 2 };
//! let mut session = CaptureSession::open(&host, device, &CaptureOptions::default()).unwrap();
//!
//! let chunk = session.read_chunk().unwrap(); // blocks until 1024 frames arrive
//! let frame = reduce(&chunk.samples, chunk.channels).unwrap();
//! println!("{} mono samples, peak {}", frame.len(), frame.peak());
//!
//! session.close().unwrap();
//! ```

pub mod buffer;
pub mod capture;
pub mod device;
pub mod host;
pub mod reduce;
pub mod waveform;

#[cfg(test)]
pub mod fake;

pub use buffer::{QueueRead, RingBuffer, SampleQueue};
pub use capture::{
    CaptureError, CaptureOptions, CaptureSession, ChunkSource, RawChunk, ReadStatus, StreamFormat,
    DEFAULT_CHUNK_SIZE, LARGE_CHUNK_SIZE, SAMPLE_RATE,
};
pub use device::{list_input_devices, AudioHost, DeviceDescriptor, SelectedDevice};
pub use host::CpalHost;
pub use reduce::{reduce, AmplitudeFrame, ReduceError};
pub use waveform::{WaveformView, Y_MAX, Y_MIN};
