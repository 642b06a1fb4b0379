//! Configuration module.
//!
//! Provides `AppConfig` (top-level settings), the capture and UI sections,
//! `AppPaths` for the cross-platform config directory, and TOML persistence
//! via `AppConfig::load` / `AppConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{AppConfig, CaptureConfig, PlatformSetting, UiConfig};
