//! In-memory [`AudioHost`] for tests.
//!
//! [`FakeHost`] serves a fixed device list and hands out a
//! [`ScriptedSource`] that replays pre-built chunks.  Everything the session
//! does to the source (reads, stop, release) is recorded on the host so tests
//! can assert on call counts and ordering.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::audio::capture::{CaptureError, CaptureOptions, ChunkSource, RawChunk, ReadStatus};
use crate::audio::device::{AudioHost, DeviceDescriptor, SelectedDevice};

#[derive(Debug, Default)]
struct Record {
    open_calls: usize,
    requested_frames: Vec<usize>,
    events: Vec<&'static str>,
}

pub struct FakeHost {
    devices: Vec<DeviceDescriptor>,
    unavailable: bool,
    chunks: RefCell<VecDeque<RawChunk>>,
    record: Rc<RefCell<Record>>,
}

impl FakeHost {
    /// Devices are indexed by their position in `devices`.
    pub fn new(devices: &[(&str, u16)]) -> Self {
        Self {
            devices: devices
                .iter()
                .enumerate()
                .map(|(i, (name, channels))| DeviceDescriptor::new(i, *name, *channels))
                .collect(),
            unavailable: false,
            chunks: RefCell::new(VecDeque::new()),
            record: Rc::default(),
        }
    }

    /// A host whose backend cannot be queried.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::new(&[])
        }
    }

    /// Chunks returned, in order, by the source opened from this host.
    pub fn with_chunks(self, chunks: Vec<RawChunk>) -> Self {
        self.chunks.replace(chunks.into());
        self
    }

    /// A complete chunk of `frames` frames where every sample is `value`.
    pub fn full_chunk(frames: usize, channels: u16, value: i16) -> RawChunk {
        RawChunk {
            samples: vec![value; frames * channels as usize],
            channels,
            status: ReadStatus::Complete,
        }
    }

    pub fn open_calls(&self) -> usize {
        self.record.borrow().open_calls
    }

    pub fn requested_frames(&self) -> Vec<usize> {
        self.record.borrow().requested_frames.clone()
    }

    pub fn stops(&self) -> usize {
        self.count("stop")
    }

    pub fn releases(&self) -> usize {
        self.count("release")
    }

    pub fn events(&self) -> Vec<&'static str> {
        self.record.borrow().events.clone()
    }

    fn count(&self, event: &str) -> usize {
        self.record
            .borrow()
            .events
            .iter()
            .filter(|e| **e == event)
            .count()
    }
}

impl AudioHost for FakeHost {
    fn devices(&self) -> Result<Vec<DeviceDescriptor>, CaptureError> {
        if self.unavailable {
            return Err(CaptureError::SubsystemUnavailable(
                "fake backend offline".into(),
            ));
        }
        Ok(self.devices.clone())
    }

    fn open_stream(
        &self,
        _device: SelectedDevice,
        _options: &CaptureOptions,
    ) -> Result<Box<dyn ChunkSource>, CaptureError> {
        self.record.borrow_mut().open_calls += 1;
        Ok(Box::new(ScriptedSource {
            chunks: self.chunks.take(),
            record: Rc::clone(&self.record),
        }))
    }
}

pub struct ScriptedSource {
    chunks: VecDeque<RawChunk>,
    record: Rc<RefCell<Record>>,
}

impl ChunkSource for ScriptedSource {
    fn read_frames(&mut self, frames: usize) -> Result<RawChunk, CaptureError> {
        self.record.borrow_mut().requested_frames.push(frames);
        self.chunks
            .pop_front()
            .ok_or_else(|| CaptureError::Stream("script exhausted".into()))
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        self.record.borrow_mut().events.push("stop");
        Ok(())
    }
}

impl Drop for ScriptedSource {
    fn drop(&mut self) {
        self.record.borrow_mut().events.push("release");
    }
}
