//! Capture pipeline wiring: startup selection and the render tick.
//!
//! # Architecture
//!
//! ```text
//! start_capture(host, rule, console)
//!        │
//!        ├─ DeviceSelector::select  → Selection::Abort → exit, no stream
//!        │
//!        └─ CaptureSession::open
//!              │
//!              ▼
//! RenderDriver::tick()  ← every 30 ms from the egui update loop
//!        ├─ read_chunk (blocking)
//!        ├─ reduce → fit(chunk_size)
//!        └─ frame() → WaveformView → painter
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use loopback_scope::audio::{CaptureOptions, CpalHost};
//! use loopback_scope::pipeline::{start_capture, RenderDriver, Startup, TICK_INTERVAL};
//! use loopback_scope::select::{Console, PlatformFamily};
//!
//! let host = CpalHost::new();
//! let rule = PlatformFamily::detect().rule();
//! let mut console = Console::stdio();
//!
//! match start_capture(&host, rule.as_ref(), &mut console, None, &CaptureOptions::default()) {
//!     Ok(Startup::Ready(session)) => {
//!         let mut driver = RenderDriver::new(session, TICK_INTERVAL);
//!         let frame = driver.tick().unwrap();
//!         println!("peak {}", frame.peak());
//!         driver.shutdown().unwrap();
//!     }
//!     Ok(Startup::Aborted(reason)) => eprintln!("{reason}"),
//!     Err(e) => eprintln!("{e}"),
//! }
//! ```

pub mod driver;
pub mod startup;

pub use driver::{DriverError, DriverStats, RenderDriver, TICK_INTERVAL};
pub use startup::{start_capture, Startup, StartupError};
