//! Application settings structs, defaults and TOML persistence.
//!
//! Every section is `#[serde(default)]`, so a settings file only needs the
//! keys it changes.

use std::path::Path;
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::audio::{CaptureOptions, DEFAULT_CHUNK_SIZE, LARGE_CHUNK_SIZE, SAMPLE_RATE};
use crate::select::PlatformFamily;

// ---------------------------------------------------------------------------
// PlatformSetting
// ---------------------------------------------------------------------------

/// Which loopback naming rule to apply.
///
/// | Value     | Rule |
/// |-----------|------|
/// | `auto`    | detect from the running OS |
/// | `windows` | "Stereo Mix" prefix |
/// | `macos`   | "BlackHole" substring |
/// | `other`   | no automatic match |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformSetting {
    Auto,
    Windows,
    Macos,
    Other,
}

impl Default for PlatformSetting {
    fn default() -> Self {
        Self::Auto
    }
}

impl PlatformSetting {
    pub fn resolve(self) -> PlatformFamily {
        match self {
            Self::Auto => PlatformFamily::detect(),
            Self::Windows => PlatformFamily::Windows,
            Self::Macos => PlatformFamily::MacOs,
            Self::Other => PlatformFamily::Other,
        }
    }
}

// ---------------------------------------------------------------------------
// CaptureConfig
// ---------------------------------------------------------------------------

/// Settings for the capture session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Capture sample rate in Hz.
    pub sample_rate: u32,
    /// Frames per chunk: `1024` or `4096`.
    pub chunk_size: usize,
    /// Backend queue capacity in chunks; older audio is overwritten past this.
    pub buffer_chunks: usize,
    /// Longest a chunk read may block before returning a short chunk.
    pub read_timeout_ms: u64,
    /// Loopback naming rule.
    pub platform: PlatformSetting,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            buffer_chunks: 4,
            read_timeout_ms: 500,
            platform: PlatformSetting::default(),
        }
    }
}

impl CaptureConfig {
    pub fn options(&self) -> CaptureOptions {
        CaptureOptions {
            sample_rate: self.sample_rate,
            chunk_size: self.chunk_size,
            buffer_chunks: self.buffer_chunks,
            read_timeout: Duration::from_millis(self.read_timeout_ms),
        }
    }
}

// ---------------------------------------------------------------------------
// UiConfig
// ---------------------------------------------------------------------------

/// Window and drawing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Render tick period in milliseconds.
    pub tick_interval_ms: u64,
    /// Initial inner window size `(width, height)` in points.
    pub window_size: (f32, f32),
    pub always_on_top: bool,
    /// Waveform stroke width in points.
    pub line_width: f32,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 30,
            window_size: (900.0, 360.0),
            always_on_top: false,
            line_width: 1.5,
        }
    }
}

impl UiConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level configuration, serialised as `settings.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub capture: CaptureConfig,
    pub ui: UiConfig,
}

impl AppConfig {
    /// Load from the platform `settings.toml`; defaults when it is missing.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path.  A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Self =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Save to the platform `settings.toml`, creating parent directories.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// `true` when no `settings.toml` exists yet.
    pub fn is_first_run() -> bool {
        !AppPaths::new().settings_file.exists()
    }

    /// Reject settings the capture session cannot run with.
    pub fn validate(&self) -> Result<()> {
        let capture = &self.capture;
        ensure!(
            capture.sample_rate == SAMPLE_RATE,
            "capture.sample_rate must be {SAMPLE_RATE}, got {}",
            capture.sample_rate
        );
        ensure!(
            capture.chunk_size == DEFAULT_CHUNK_SIZE || capture.chunk_size == LARGE_CHUNK_SIZE,
            "capture.chunk_size must be {DEFAULT_CHUNK_SIZE} or {LARGE_CHUNK_SIZE}, got {}",
            capture.chunk_size
        );
        ensure!(capture.buffer_chunks > 0, "capture.buffer_chunks must be > 0");
        // A timeout shorter than one chunk of audio truncates every read.
        let chunk_ms = capture.chunk_size as u64 * 1000 / u64::from(capture.sample_rate);
        ensure!(
            capture.read_timeout_ms > chunk_ms,
            "capture.read_timeout_ms must exceed one chunk ({chunk_ms} ms), got {}",
            capture.read_timeout_ms
        );
        ensure!(self.ui.tick_interval_ms > 0, "ui.tick_interval_ms must be > 0");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
