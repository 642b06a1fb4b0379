//! Device catalog types and the audio host seam.
//!
//! [`AudioHost`] is the one object that talks to the audio subsystem.  It is
//! created once at startup, passed by reference to the catalog, the selector
//! and [`CaptureSession::open`](crate::audio::CaptureSession::open), and
//! dropped only after the capture session has been closed.

use std::fmt;

use crate::audio::capture::{CaptureError, CaptureOptions, ChunkSource};

// ---------------------------------------------------------------------------
// DeviceDescriptor
// ---------------------------------------------------------------------------

/// One device as reported by a single enumeration pass.
///
/// Output-only devices are included with `max_input_channels == 0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// Position in the host's enumeration order.
    pub index: usize,
    /// Human-readable device name.
    pub name: String,
    /// Largest input channel count the device supports (0 = output only).
    pub max_input_channels: u16,
}

impl DeviceDescriptor {
    pub fn new(index: usize, name: impl Into<String>, max_input_channels: u16) -> Self {
        Self {
            index,
            name: name.into(),
            max_input_channels,
        }
    }

    /// Returns `true` when the device can be captured from.
    pub fn is_input(&self) -> bool {
        self.max_input_channels > 0
    }
}

impl fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} (Input Channels: {})",
            self.index, self.name, self.max_input_channels
        )
    }
}

// ---------------------------------------------------------------------------
// SelectedDevice
// ---------------------------------------------------------------------------

/// The device chosen for capture, fixed for the lifetime of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectedDevice {
    pub index: usize,
    /// Always `>= 1`.
    pub channel_count: u16,
}

impl SelectedDevice {
    /// Build a selection from a descriptor, or `None` for output-only devices.
    pub fn from_descriptor(descriptor: &DeviceDescriptor) -> Option<Self> {
        descriptor.is_input().then_some(Self {
            index: descriptor.index,
            channel_count: descriptor.max_input_channels,
        })
    }
}

// ---------------------------------------------------------------------------
// AudioHost
// ---------------------------------------------------------------------------

/// Handle to the audio subsystem.
///
/// Implemented by [`CpalHost`](crate::audio::CpalHost) in production and by an
/// in-memory fake in tests.
pub trait AudioHost {
    /// Enumerate every device the subsystem knows about, input and output.
    ///
    /// # Errors
    ///
    /// [`CaptureError::SubsystemUnavailable`] when the backend cannot be
    /// queried at all.
    fn devices(&self) -> Result<Vec<DeviceDescriptor>, CaptureError>;

    /// Look up a single device by enumeration index.
    ///
    /// # Errors
    ///
    /// [`CaptureError::DeviceNotFound`] when `index` is out of range.
    fn device(&self, index: usize) -> Result<DeviceDescriptor, CaptureError> {
        self.devices()?
            .into_iter()
            .find(|d| d.index == index)
            .ok_or(CaptureError::DeviceNotFound(index))
    }

    /// Bind an input stream to `device`, delivering 16-bit samples, and start it.
    fn open_stream(
        &self,
        device: SelectedDevice,
        options: &CaptureOptions,
    ) -> Result<Box<dyn ChunkSource>, CaptureError>;
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Enumerate all devices on `host`, unfiltered, in enumeration order.
///
/// Filtering (input-capable only, platform name rules) is the caller's job.
pub fn list_input_devices<H: AudioHost + ?Sized>(
    host: &H,
) -> Result<Vec<DeviceDescriptor>, CaptureError> {
    let devices = host.devices()?;
    log::debug!(
        "enumerated {} devices ({} with input channels)",
        devices.len(),
        devices.iter().filter(|d| d.is_input()).count()
    );
    for device in &devices {
        log::trace!("{device}");
    }
    Ok(devices)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
