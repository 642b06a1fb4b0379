//! Live loopback waveform: capture the system's audio output through a
//! loopback input device and draw each chunk as a fixed-range waveform.
//!
//! | Module | Role |
//! |--------|------|
//! | [`audio`] | device catalog, capture session, channel reduction, plot mapping |
//! | [`select`] | loopback naming rules and the interactive device selector |
//! | [`pipeline`] | startup sequence and the fixed-interval render driver |
//! | [`config`] | `settings.toml` persistence |
//! | [`cli`] | command-line flags and logging setup |
//! | [`app`] | the eframe window |

pub mod app;
pub mod audio;
pub mod cli;
pub mod config;
pub mod pipeline;
pub mod select;
