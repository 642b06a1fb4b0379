//! Command-line interface.
//!
//! Handles argument parsing and logging configuration.

use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;

use crate::config::AppConfig;

/// Live waveform of the system's audio output, captured from a loopback device
#[derive(Parser, Debug)]
#[command(name = "loopback-scope")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Increase logging verbosity (default warn)
    /// -v = info, -vv = debug, -vvv = trace, -vvvv = trace for dependencies too
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Print every audio device with its input channel count and exit
    #[arg(long)]
    pub list_devices: bool,

    /// Capture from this device index instead of auto-detecting
    #[arg(short, long, value_name = "INDEX")]
    pub device: Option<usize>,

    /// Frames per chunk (1024 or 4096)
    #[arg(long, value_name = "FRAMES")]
    pub chunk_size: Option<usize>,

    /// Read settings from this file instead of the default location
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl Args {
    /// Get the log level filter based on verbosity flags
    pub fn log_level(&self) -> LevelFilter {
        if self.quiet {
            LevelFilter::Error
        } else {
            match self.verbose {
                0 => LevelFilter::Warn,
                1 => LevelFilter::Info,
                2 => LevelFilter::Debug,
                _ => LevelFilter::Trace,
            }
        }
    }

    /// Apply command-line overrides on top of the loaded settings.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(chunk_size) = self.chunk_size {
            config.capture.chunk_size = chunk_size;
        }
    }
}

/// Initialize the logging system based on CLI arguments.
///
/// `RUST_LOG`, when set, takes precedence over the flags.
pub fn init_logging(args: &Args) {
    if std::env::var_os("RUST_LOG").is_some() {
        env_logger::Builder::from_env(env_logger::Env::default())
            .format_timestamp_millis()
            .init();
        return;
    }

    let mut builder = env_logger::Builder::new();

    // Keep dependencies (cpal, eframe, winit, wgpu) quiet unless asked
    if args.verbose >= 4 {
        builder.filter_level(args.log_level());
    } else {
        builder.filter_level(LevelFilter::Warn);
    }
    builder.filter_module("loopback_scope", args.log_level());

    builder.format_timestamp_millis().init();
}
