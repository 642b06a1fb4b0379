//! Capture device selection.
//!
//! # Architecture
//!
//! ```text
//! PlatformFamily::detect() ──▶ LoopbackRule (StereoMix / BlackHole / none)
//!                                   │
//! AudioHost ──▶ DeviceSelector::select(console)
//!                   ├─ automatic match  → Selection::Device
//!                   ├─ remediation text + "select manually?"
//!                   └─ manual index     → Selection::Device | Selection::Abort
//! ```

pub mod console;
pub mod platform;
pub mod selector;

pub use console::Console;
pub use platform::{BlackHoleRule, LoopbackRule, NoAutomaticRule, PlatformFamily, StereoMixRule};
pub use selector::{AbortReason, DeviceSelector, Selection, SelectorError};
