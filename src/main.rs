//! Application entry point: Live Loopback Waveform.
//!
//! # Startup sequence
//!
//! 1. Parse flags and initialise logging.
//! 2. Load [`AppConfig`] (defaults on first run), apply flag overrides and
//!    validate.
//! 3. Open the cpal host.  `--list-devices` prints the catalog and exits.
//! 4. Pick a device (flag, loopback rule or operator prompt) and open the
//!    capture session.
//! 5. Run [`eframe::run_native`], which blocks the main thread until the window
//!    is closed, which also closes the session.
//!
//! Exit status is `0` after a normal close and `1` when startup is aborted or
//! the capture fails.

use std::process::ExitCode;
use std::rc::Rc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use eframe::egui;

use loopback_scope::{
    app::{FaultSlot, ScopeApp, WINDOW_TITLE},
    audio::{list_input_devices, CpalHost},
    cli::{init_logging, Args},
    config::{AppConfig, AppPaths},
    pipeline::{start_capture, RenderDriver, Startup},
    select::Console,
};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => AppConfig::load_from(path)?,
        None => {
            let config = AppConfig::load().unwrap_or_else(|e| {
                log::warn!("Failed to load settings ({e:#}); using defaults");
                AppConfig::default()
            });
            if AppConfig::is_first_run() {
                match config.save() {
                    Ok(()) => log::info!(
                        "Wrote default settings to {}",
                        AppPaths::new().settings_file.display()
                    ),
                    Err(e) => log::debug!("Could not write default settings: {e:#}"),
                }
            }
            config
        }
    };

    args.apply(&mut config);
    config.validate().context("invalid settings")?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// Native options builder
// ---------------------------------------------------------------------------

fn native_options(config: &AppConfig) -> eframe::NativeOptions {
    let (width, height) = config.ui.window_size;
    let mut vp = egui::ViewportBuilder::default()
        .with_title(WINDOW_TITLE)
        .with_inner_size([width, height])
        .with_min_inner_size([320.0, 160.0]);

    if config.ui.always_on_top {
        vp = vp.with_always_on_top();
    }

    eframe::NativeOptions {
        viewport: vp,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

fn run(args: &Args) -> Result<ExitCode> {
    let config = load_config(args)?;
    let host = CpalHost::new();
    log::info!("Audio host: {:?}", host.id());

    if args.list_devices {
        for device in list_input_devices(&host)? {
            println!("{device}");
        }
        return Ok(ExitCode::SUCCESS);
    }

    let family = config.capture.platform.resolve();
    log::debug!("Loopback rule for {family:?}");
    let rule = family.rule();
    let options = config.capture.options();

    let startup = {
        let mut console = Console::stdio();
        start_capture(&host, rule.as_ref(), &mut console, args.device, &options)?
    };
    let session = match startup {
        Startup::Ready(session) => session,
        Startup::Aborted(reason) => {
            log::error!("No capture device: {reason}");
            return Ok(ExitCode::FAILURE);
        }
    };

    let driver = RenderDriver::new(session, config.ui.tick_interval());
    let fault = FaultSlot::default();
    let app = ScopeApp::new(driver, &config.ui, Rc::clone(&fault));

    eframe::run_native(
        WINDOW_TITLE,
        native_options(&config),
        Box::new(move |_cc| Ok(Box::new(app))),
    )
    .map_err(|e| anyhow!("window failed: {e}"))?;

    let fault = fault.borrow_mut().take();
    match fault {
        Some(message) => {
            log::error!("Capture stopped: {message}");
            Ok(ExitCode::FAILURE)
        }
        None => {
            log::info!("Window closed");
            Ok(ExitCode::SUCCESS)
        }
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args);
    log::info!("Live Loopback Waveform starting up");

    match run(&args) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
