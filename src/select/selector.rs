//! Startup device selection.
//!
//! [`DeviceSelector::select`] runs once:
//!
//! 1. Print the full catalog and take the first input-capable device the
//!    platform's [`LoopbackRule`] accepts.  Enumeration order decides ties.
//! 2. Otherwise print the rule's remediation text and ask whether to pick a
//!    device by hand.
//! 3. If yes, list input-capable devices, read one index and validate it with
//!    a direct lookup.  Bad input aborts; there is no retry loop.

use std::fmt;
use std::io::{self, BufRead, Write};

use thiserror::Error;

use crate::audio::{list_input_devices, AudioHost, CaptureError, DeviceDescriptor, SelectedDevice};
use crate::select::console::Console;
use crate::select::platform::LoopbackRule;

const MANUAL_PROMPT: &str = "Would you like to select an input device manually? (y/n): ";
const INDEX_PROMPT: &str = "Enter the index of the device to capture from: ";

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// Why startup stops without opening a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    /// No automatic match and the operator declined manual selection.
    Declined,
    /// Manual selection was requested but no device can capture.
    NoInputDevices,
    /// The manual entry was not a number or named no usable input device.
    InvalidSelection(String),
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Declined => write!(f, "no loopback device found and manual selection declined"),
            Self::NoInputDevices => write!(f, "no input-capable devices are available"),
            Self::InvalidSelection(input) => write!(f, "invalid device selection {input:?}"),
        }
    }
}

/// Outcome of device selection.  `Abort` is expected operator-facing
/// behaviour, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Device(SelectedDevice),
    Abort(AbortReason),
}

#[derive(Debug, Error)]
pub enum SelectorError {
    #[error("device enumeration failed: {0}")]
    Catalog(#[from] CaptureError),

    #[error("console I/O failed: {0}")]
    Console(#[from] io::Error),
}

// ---------------------------------------------------------------------------
// DeviceSelector
// ---------------------------------------------------------------------------

pub struct DeviceSelector<'a, H: ?Sized> {
    host: &'a H,
    rule: &'a dyn LoopbackRule,
}

impl<'a, H: AudioHost + ?Sized> DeviceSelector<'a, H> {
    pub fn new(host: &'a H, rule: &'a dyn LoopbackRule) -> Self {
        Self { host, rule }
    }

    /// Run the full automatic → remediation → manual procedure.
    pub fn select<R: BufRead, W: Write>(
        &self,
        console: &mut Console<R, W>,
    ) -> Result<Selection, SelectorError> {
        let catalog = list_input_devices(self.host)?;
        for device in &catalog {
            console.say(device.to_string())?;
        }

        if let Some((device, name)) = self.automatic_match(&catalog) {
            log::info!("loopback device '{name}' found at index {}", device.index);
            console.say(format!(
                "Successfully located audio input through '{name}' (index {})",
                device.index
            ))?;
            return Ok(Selection::Device(device));
        }

        log::warn!("no device matched the platform loopback rule");
        console.say(self.rule.remediation())?;

        if !console.confirm(MANUAL_PROMPT)? {
            return Ok(Selection::Abort(AbortReason::Declined));
        }
        self.select_manually(console)
    }

    /// First input-capable device in `catalog` accepted by the rule.
    pub fn automatic_match<'c>(
        &self,
        catalog: &'c [DeviceDescriptor],
    ) -> Option<(SelectedDevice, &'c str)> {
        catalog
            .iter()
            .filter(|d| d.is_input())
            .find(|d| self.rule.matches_platform_default(d))
            .and_then(|d| SelectedDevice::from_descriptor(d).map(|sel| (sel, d.name.as_str())))
    }

    /// List input-capable devices and read one index from the operator.
    pub fn select_manually<R: BufRead, W: Write>(
        &self,
        console: &mut Console<R, W>,
    ) -> Result<Selection, SelectorError> {
        let inputs: Vec<_> = list_input_devices(self.host)?
            .into_iter()
            .filter(DeviceDescriptor::is_input)
            .collect();

        if inputs.is_empty() {
            console.say("No input devices are available.")?;
            return Ok(Selection::Abort(AbortReason::NoInputDevices));
        }

        console.say("\nAvailable input devices:")?;
        for device in &inputs {
            console.say(format!("  {device}"))?;
        }

        match console.ask(INDEX_PROMPT)? {
            Some(answer) => self.resolve_index(&answer, console),
            None => {
                console.say("")?;
                self.reject(String::new(), "no index entered", console)
            }
        }
    }

    /// Validate an operator-entered index by direct lookup.
    pub fn resolve_index<R: BufRead, W: Write>(
        &self,
        input: &str,
        console: &mut Console<R, W>,
    ) -> Result<Selection, SelectorError> {
        let Ok(index) = input.trim().parse::<usize>() else {
            return self.reject(input.to_string(), "not a number", console);
        };

        let descriptor = match self.host.device(index) {
            Ok(d) => d,
            Err(CaptureError::DeviceNotFound(_)) => {
                return self.reject(input.to_string(), "no such device", console);
            }
            Err(e) => return Err(e.into()),
        };

        match SelectedDevice::from_descriptor(&descriptor) {
            Some(device) => {
                log::info!("manually selected '{}' (index {index})", descriptor.name);
                console.say(format!("Using '{}' (index {index})", descriptor.name))?;
                Ok(Selection::Device(device))
            }
            None => self.reject(input.to_string(), "device has no input channels", console),
        }
    }

    fn reject<R: BufRead, W: Write>(
        &self,
        input: String,
        why: &str,
        console: &mut Console<R, W>,
    ) -> Result<Selection, SelectorError> {
        log::warn!("rejected device index {input:?}: {why}");
        console.say(format!("Invalid device index {input:?}: {why}."))?;
        Ok(Selection::Abort(AbortReason::InvalidSelection(input)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::fake::FakeHost;
    use crate::select::platform::PlatformFamily;
    use std::io::Cursor;

    type TestConsole = Console<Cursor<Vec<u8>>, Vec<u8>>;

    fn console(input: &str) -> TestConsole {
        Console::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    fn run(
        devices: &[(&str, u16)],
        platform: PlatformFamily,
        input: &str,
    ) -> (Selection, String) {
        let host = FakeHost::new(devices);
        let rule = platform.rule();
        let mut console = console(input);
        let selection = DeviceSelector::new(&host, rule.as_ref())
            .select(&mut console)
            .unwrap();
        (selection, String::from_utf8(console.into_output()).unwrap())
    }

    fn device(index: usize, channel_count: u16) -> Selection {
        Selection::Device(SelectedDevice {
            index,
            channel_count,
        })
    }

    // ---- Automatic match ----------------------------------------------------

    #[test]
    fn windows_catalog_picks_stereo_mix() {
        let (sel, out) = run(
            &[("Speakers", 0), ("Stereo Mix", 2), ("Microphone", 1)],
            PlatformFamily::Windows,
            "",
        );
        assert_eq!(sel, device(1, 2));
        assert!(out.contains("0: Speakers (Input Channels: 0)"));
        assert!(out.contains("Successfully located audio input through 'Stereo Mix' (index 1)"));
    }

    #[test]
    fn first_match_wins_over_later_matches() {
        let (sel, _) = run(
            &[
                ("Microphone", 1),
                ("Stereo Mix (Realtek)", 2),
                ("Stereo Mix (USB)", 1),
            ],
            PlatformFamily::Windows,
            "",
        );
        assert_eq!(sel, device(1, 2));
    }

    #[test]
    fn matching_name_without_input_channels_is_skipped() {
        let (sel, _) = run(
            &[("Stereo Mix (output)", 0), ("Stereo Mix", 2)],
            PlatformFamily::Windows,
            "",
        );
        assert_eq!(sel, device(1, 2));
    }

    #[test]
    fn mac_catalog_picks_blackhole() {
        let (sel, _) = run(
            &[("MacBook Pro Microphone", 1), ("BlackHole 2ch", 2)],
            PlatformFamily::MacOs,
            "",
        );
        assert_eq!(sel, device(1, 2));
    }

    #[test]
    fn other_platform_goes_straight_to_fallback() {
        let (sel, out) = run(
            &[("Monitor of Built-in Audio", 2)],
            PlatformFamily::Other,
            "n\n",
        );
        assert_eq!(sel, Selection::Abort(AbortReason::Declined));
        assert!(out.contains("No loopback device can be detected automatically"));
    }

    // ---- Fallback / abort ---------------------------------------------------

    #[test]
    fn mac_without_blackhole_and_declined_aborts() {
        let (sel, out) = run(&[("Built-in Mic", 1)], PlatformFamily::MacOs, "n\n");
        assert_eq!(sel, Selection::Abort(AbortReason::Declined));
        assert!(out.contains("Install BlackHole"));
        assert!(out.contains(MANUAL_PROMPT));
    }

    #[test]
    fn no_input_devices_aborts_when_declined() {
        let (sel, _) = run(&[("Speakers", 0)], PlatformFamily::Windows, "n\n");
        assert_eq!(sel, Selection::Abort(AbortReason::Declined));
    }

    #[test]
    fn no_input_devices_aborts_when_accepted() {
        let (sel, _) = run(&[("Speakers", 0), ("HDMI", 0)], PlatformFamily::Windows, "y\n");
        assert_eq!(sel, Selection::Abort(AbortReason::NoInputDevices));
    }

    #[test]
    fn empty_input_is_declined() {
        let (sel, _) = run(&[("Built-in Mic", 1)], PlatformFamily::MacOs, "");
        assert_eq!(sel, Selection::Abort(AbortReason::Declined));
    }

    // ---- Manual selection ---------------------------------------------------

    #[test]
    fn manual_selection_lists_only_input_devices() {
        let (sel, out) = run(
            &[("Speakers", 0), ("Microphone", 1), ("Line In", 2)],
            PlatformFamily::Windows,
            "Y\n2\n",
        );
        assert_eq!(sel, device(2, 2));

        let manual = out.split("Available input devices:").nth(1).unwrap();
        assert!(!manual.contains("Speakers"));
        assert!(manual.contains("1: Microphone (Input Channels: 1)"));
        assert!(manual.contains("2: Line In (Input Channels: 2)"));
    }

    #[test]
    fn manual_selection_rejects_non_numeric_entry() {
        let (sel, out) = run(&[("Microphone", 1)], PlatformFamily::Windows, "y\nabc\n");
        assert_eq!(
            sel,
            Selection::Abort(AbortReason::InvalidSelection("abc".into()))
        );
        assert!(out.contains("Invalid device index"));
    }

    #[test]
    fn manual_selection_rejects_out_of_range_index() {
        let (sel, _) = run(&[("Microphone", 1)], PlatformFamily::Windows, "y\n9\n");
        assert_eq!(
            sel,
            Selection::Abort(AbortReason::InvalidSelection("9".into()))
        );
    }

    #[test]
    fn manual_selection_rejects_negative_index() {
        let (sel, _) = run(&[("Microphone", 1)], PlatformFamily::Windows, "y\n-1\n");
        assert!(matches!(
            sel,
            Selection::Abort(AbortReason::InvalidSelection(_))
        ));
    }

    #[test]
    fn manual_selection_rejects_output_only_device() {
        let (sel, _) = run(
            &[("Speakers", 0), ("Microphone", 1)],
            PlatformFamily::Windows,
            "y\n0\n",
        );
        assert_eq!(
            sel,
            Selection::Abort(AbortReason::InvalidSelection("0".into()))
        );
    }

    #[test]
    fn manual_selection_at_end_of_input_aborts() {
        let (sel, _) = run(&[("Microphone", 1)], PlatformFamily::Windows, "y\n");
        assert!(matches!(
            sel,
            Selection::Abort(AbortReason::InvalidSelection(_))
        ));
    }

    // ---- Errors -------------------------------------------------------------

    #[test]
    fn unavailable_subsystem_is_an_error_not_an_abort() {
        let host = FakeHost::unavailable();
        let rule = PlatformFamily::Windows.rule();
        let err = DeviceSelector::new(&host, rule.as_ref())
            .select(&mut console(""))
            .unwrap_err();
        assert!(matches!(err, SelectorError::Catalog(_)), "{err}");
    }
}
