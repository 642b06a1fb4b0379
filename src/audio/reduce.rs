//! Channel reduction: interleaved capture samples to one mono amplitude frame.
//!
//! Stereo is reduced by keeping the left channel only (even indices).  There
//! is no averaging: a hard-panned right-channel signal does not show up.

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ReduceError {
    #[error("cannot reduce {0}-channel audio to mono (mono or stereo only)")]
    UnsupportedChannelCount(u16),
}

// ---------------------------------------------------------------------------
// AmplitudeFrame
// ---------------------------------------------------------------------------

/// One tick's worth of mono samples for the waveform.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AmplitudeFrame {
    pub samples: Vec<i16>,
}

impl AmplitudeFrame {
    /// A frame of `len` zero samples.
    pub fn silent(len: usize) -> Self {
        Self {
            samples: vec![0; len],
        }
    }

    /// Force the frame to exactly `len` samples: short frames are zero-padded
    /// at the end, long ones truncated.
    pub fn fit(mut self, len: usize) -> Self {
        self.samples.resize(len, 0);
        self
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Largest absolute sample value.
    pub fn peak(&self) -> u16 {
        self.samples
            .iter()
            .map(|s| s.unsigned_abs())
            .max()
            .unwrap_or(0)
    }

    /// `true` when any sample sits at either rail of the 16-bit range.
    pub fn is_clipping(&self) -> bool {
        self.samples
            .iter()
            .any(|&s| s == i16::MAX || s == i16::MIN)
    }
}

// ---------------------------------------------------------------------------
// reduce
// ---------------------------------------------------------------------------

/// Reduce interleaved `samples` with `channel_count` channels to mono.
///
/// * `1`: copied unchanged.
/// * `2`: every even-indexed sample (the left channel).  A trailing half
///   frame is dropped.
///
/// # Errors
///
/// [`ReduceError::UnsupportedChannelCount`] for any other channel count.
///
/// # Example
///
/// ```rust
/// use loopback_scope::audio::reduce;
///
/// let stereo = [10i16, -10, 20, -20]; // L R L R
/// let mono = reduce(&stereo, 2).unwrap();
/// assert_eq!(mono.samples, vec![10, 20]);
/// ```
pub fn reduce(samples: &[i16], channel_count: u16) -> Result<AmplitudeFrame, ReduceError> {
    let samples = match channel_count {
        1 => samples.to_vec(),
        2 => samples.chunks_exact(2).map(|frame| frame[0]).collect(),
        n => return Err(ReduceError::UnsupportedChannelCount(n)),
    };
    Ok(AmplitudeFrame { samples })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
