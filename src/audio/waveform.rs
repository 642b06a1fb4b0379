//! Plot geometry for the live waveform.
//!
//! The surface's axes never move: x spans `[0, chunk_size)` and y spans the
//! full signed 16-bit range.  [`WaveformView::normalized`] maps an
//! [`AmplitudeFrame`] onto the unit square so the egui painter only has to
//! scale to its rect.  A sample at full scale touches the top or bottom edge;
//! nothing is auto-scaled.
//!
//! # Example
//!
//! ```rust
//! use loopback_scope::audio::{AmplitudeFrame, WaveformView};
//!
//! let view = WaveformView::new(4);
//! let frame = AmplitudeFrame { samples: vec![i16::MIN, 0, i16::MAX, 0] };
//! let points = view.normalized(&frame);
//!
//! assert_eq!(points.len(), 4);
//! assert_eq!(points[0], (0.0, 0.0)); // bottom-left
//! assert_eq!(points[2].1, 1.0);      // top
//! ```

use crate::audio::reduce::AmplitudeFrame;

/// Bottom of the fixed y range.
pub const Y_MIN: f32 = -32768.0;
/// Top of the fixed y range.
pub const Y_MAX: f32 = 32767.0;

/// Fixed plot domain for one capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveformView {
    chunk_size: usize,
}

impl WaveformView {
    pub fn new(chunk_size: usize) -> Self {
        Self { chunk_size }
    }

    /// Width of the x domain in samples.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Map sample index to `[0, 1)`.
    pub fn x(&self, index: usize) -> f32 {
        if self.chunk_size == 0 {
            return 0.0;
        }
        index as f32 / self.chunk_size as f32
    }

    /// Map a sample value to `[0, 1]`, bottom to top.
    pub fn y(sample: i16) -> f32 {
        (sample as f32 - Y_MIN) / (Y_MAX - Y_MIN)
    }

    /// `(x, y)` pairs in the unit square, one per sample inside the domain.
    /// Samples past `chunk_size` are not drawn.
    pub fn normalized(&self, frame: &AmplitudeFrame) -> Vec<(f32, f32)> {
        frame
            .samples
            .iter()
            .take(self.chunk_size)
            .enumerate()
            .map(|(i, &s)| (self.x(i), Self::y(s)))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
