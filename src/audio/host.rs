//! Production [`AudioHost`] backed by `cpal`.
//!
//! cpal delivers audio through a callback on its own thread.  The callback
//! converts whatever the device produces to `i16` and pushes it into a
//! bounded [`SampleQueue`]; the blocking read the rest of the pipeline
//! expects is implemented on top of that queue by [`CpalSource`].
//!
//! Loopback devices rarely run natively at 16 bits (WASAPI shared mode and
//! CoreAudio both report `f32`), so any of `i16`, `f32`, `i32` or `u16` is
//! accepted at the requested rate and channel count, with `i16` preferred.

use std::sync::Arc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample, SupportedStreamConfigRange};

use crate::audio::buffer::SampleQueue;
use crate::audio::capture::{CaptureError, CaptureOptions, ChunkSource, RawChunk, StreamFormat};
use crate::audio::device::{AudioHost, DeviceDescriptor, SelectedDevice};

// ---------------------------------------------------------------------------
// CpalHost
// ---------------------------------------------------------------------------

/// The platform's default cpal host (WASAPI, CoreAudio, ALSA, …).
pub struct CpalHost {
    host: cpal::Host,
}

impl CpalHost {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    /// Backend identifier, for logging.
    pub fn id(&self) -> cpal::HostId {
        self.host.id()
    }

    fn nth_device(&self, index: usize) -> Result<cpal::Device, CaptureError> {
        self.host
            .devices()
            .map_err(|e| CaptureError::SubsystemUnavailable(e.to_string()))?
            .nth(index)
            .ok_or(CaptureError::DeviceNotFound(index))
    }
}

impl Default for CpalHost {
    fn default() -> Self {
        Self::new()
    }
}

fn describe(index: usize, device: &cpal::Device) -> DeviceDescriptor {
    let name = device
        .name()
        .unwrap_or_else(|_| "Unknown Device".to_string());

    // Output-only devices either fail the query or report no configs.
    let max_input_channels = device
        .supported_input_configs()
        .map(max_channels)
        .unwrap_or(0);

    DeviceDescriptor::new(index, name, max_input_channels)
}

/// Largest channel count across `ranges`, 0 when there are none.
fn max_channels<I>(ranges: I) -> u16
where
    I: IntoIterator<Item = SupportedStreamConfigRange>,
{
    ranges.into_iter().map(|c| c.channels()).max().unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Format negotiation
// ---------------------------------------------------------------------------

/// Preference order for device sample formats; `None` for formats the
/// callback cannot convert.
fn format_rank(format: SampleFormat) -> Option<u8> {
    match format {
        SampleFormat::I16 => Some(0),
        SampleFormat::F32 => Some(1),
        SampleFormat::I32 => Some(2),
        SampleFormat::U16 => Some(3),
        _ => None,
    }
}

/// Choose the config to bind for `format` on device `index`.
///
/// A range qualifies when its channel count matches, its rate range contains
/// the requested rate, and its sample format is convertible.  Among those,
/// the best-ranked format wins; ties go to the first range listed.
fn choose_input_config<I>(
    index: usize,
    ranges: I,
    format: &StreamFormat,
) -> Result<cpal::SupportedStreamConfig, CaptureError>
where
    I: IntoIterator<Item = SupportedStreamConfigRange>,
{
    let rate = cpal::SampleRate(format.sample_rate);

    ranges
        .into_iter()
        .filter(|c| c.channels() == format.channels)
        .filter(|c| c.min_sample_rate() <= rate && rate <= c.max_sample_rate())
        .filter_map(|c| format_rank(c.sample_format()).map(|rank| (rank, c)))
        .min_by_key(|(rank, _)| *rank)
        .map(|(_, c)| c.with_sample_rate(rate))
        .ok_or_else(|| CaptureError::StreamOpen {
            index,
            format: *format,
            reason: "no matching input configuration (check the device's default format)"
                .into(),
        })
}

/// Convert device samples to `i16`, reusing `out`'s allocation.
fn convert_into<T>(data: &[T], out: &mut Vec<i16>)
where
    T: Sample,
    i16: FromSample<T>,
{
    out.clear();
    out.extend(data.iter().map(|&s| i16::from_sample(s)));
}

/// Build an input stream of native sample type `T` that feeds `queue`.
fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    queue: &Arc<SampleQueue>,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample,
    i16: FromSample<T>,
{
    let writer = Arc::clone(queue);
    let faults = Arc::clone(queue);
    let mut scratch: Vec<i16> = Vec::new();

    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            convert_into(data, &mut scratch);
            writer.push(&scratch);
        },
        move |err: cpal::StreamError| {
            log::error!("cpal stream error: {err}");
            faults.fail(err.to_string());
        },
        None, // no timeout
    )
}

impl AudioHost for CpalHost {
    fn devices(&self) -> Result<Vec<DeviceDescriptor>, CaptureError> {
        let devices = self
            .host
            .devices()
            .map_err(|e| CaptureError::SubsystemUnavailable(e.to_string()))?;

        Ok(devices
            .enumerate()
            .map(|(index, device)| describe(index, &device))
            .collect())
    }

    fn device(&self, index: usize) -> Result<DeviceDescriptor, CaptureError> {
        let device = self.nth_device(index)?;
        Ok(describe(index, &device))
    }

    fn open_stream(
        &self,
        device: SelectedDevice,
        options: &CaptureOptions,
    ) -> Result<Box<dyn ChunkSource>, CaptureError> {
        let cpal_device = self.nth_device(device.index)?;
        let format = options.format(device.channel_count);
        let open_error = |reason: String| CaptureError::StreamOpen {
            index: device.index,
            format,
            reason,
        };

        let ranges = cpal_device
            .supported_input_configs()
            .map_err(|e| open_error(e.to_string()))?;
        let supported = choose_input_config(device.index, ranges, &format)?;
        let native = supported.sample_format();
        let config = supported.config();
        log::debug!("binding device {} as {native:?} ({format})", device.index);

        let queue = Arc::new(SampleQueue::new(
            format.chunk_samples() * options.buffer_chunks.max(1),
        ));

        let stream = match native {
            SampleFormat::I16 => build_stream::<i16>(&cpal_device, &config, &queue),
            SampleFormat::F32 => build_stream::<f32>(&cpal_device, &config, &queue),
            SampleFormat::I32 => build_stream::<i32>(&cpal_device, &config, &queue),
            SampleFormat::U16 => build_stream::<u16>(&cpal_device, &config, &queue),
            other => return Err(open_error(format!("unsupported sample format {other:?}"))),
        }
        .map_err(|e| open_error(e.to_string()))?;

        stream.play()?;

        Ok(Box::new(CpalSource {
            stream,
            queue,
            channels: format.channels,
            read_timeout: options.read_timeout,
        }))
    }
}

// ---------------------------------------------------------------------------
// CpalSource
// ---------------------------------------------------------------------------

/// A playing cpal input stream plus the queue its callback fills.
///
/// Dropping it drops the `cpal::Stream`, which releases the device.
pub struct CpalSource {
    stream: cpal::Stream,
    queue: Arc<SampleQueue>,
    channels: u16,
    read_timeout: Duration,
}

impl ChunkSource for CpalSource {
    fn read_frames(&mut self, frames: usize) -> Result<RawChunk, CaptureError> {
        let channels = self.channels as usize;
        let read = self
            .queue
            .read(frames * channels, channels, self.read_timeout)?;

        Ok(RawChunk {
            samples: read.samples,
            channels: self.channels,
            status: read.status,
        })
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        self.stream
            .pause()
            .map_err(|e| CaptureError::Stream(format!("failed to stop stream: {e}")))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
