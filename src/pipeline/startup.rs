//! Startup sequence: select a device, then open exactly one capture session.
//!
//! An aborted selection returns before [`CaptureSession::open`] is ever
//! called, so no stream is bound on that path.

use std::io::{BufRead, Write};

use thiserror::Error;

use crate::audio::{AudioHost, CaptureError, CaptureOptions, CaptureSession};
use crate::select::{AbortReason, Console, DeviceSelector, LoopbackRule, Selection, SelectorError};

#[derive(Debug)]
pub enum Startup {
    Ready(CaptureSession),
    Aborted(AbortReason),
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Select(#[from] SelectorError),

    #[error("failed to open capture stream: {0}")]
    Capture(#[from] CaptureError),
}

/// Pick a device (automatically, or `preselected` by index) and open it.
pub fn start_capture<H, R, W>(
    host: &H,
    rule: &dyn LoopbackRule,
    console: &mut Console<R, W>,
    preselected: Option<usize>,
    options: &CaptureOptions,
) -> Result<Startup, StartupError>
where
    H: AudioHost + ?Sized,
    R: BufRead,
    W: Write,
{
    let selector = DeviceSelector::new(host, rule);
    let selection = match preselected {
        Some(index) => selector.resolve_index(&index.to_string(), console)?,
        None => selector.select(console)?,
    };

    let device = match selection {
        Selection::Device(device) => device,
        Selection::Abort(reason) => return Ok(Startup::Aborted(reason)),
    };

    let session = CaptureSession::open(host, device, options)?;
    Ok(Startup::Ready(session))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::fake::FakeHost;
    use crate::audio::SelectedDevice;
    use crate::select::PlatformFamily;
    use std::io::Cursor;

    fn console(input: &str) -> Console<Cursor<Vec<u8>>, Vec<u8>> {
        Console::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn windows_stereo_mix_opens_one_session() {
        let host = FakeHost::new(&[("Speakers", 0), ("Stereo Mix", 2), ("Microphone", 1)]);
        let rule = PlatformFamily::Windows.rule();

        let startup = start_capture(
            &host,
            rule.as_ref(),
            &mut console(""),
            None,
            &CaptureOptions::default(),
        )
        .unwrap();

        let Startup::Ready(session) = startup else {
            panic!("expected a session");
        };
        assert_eq!(
            session.device(),
            SelectedDevice {
                index: 1,
                channel_count: 2
            }
        );
        assert_eq!(host.open_calls(), 1);
        session.close().unwrap();
    }

    #[test]
    fn declined_mac_selection_never_opens_a_stream() {
        let host = FakeHost::new(&[("Built-in Mic", 1)]);
        let rule = PlatformFamily::MacOs.rule();

        let startup = start_capture(
            &host,
            rule.as_ref(),
            &mut console("n\n"),
            None,
            &CaptureOptions::default(),
        )
        .unwrap();

        assert!(matches!(startup, Startup::Aborted(AbortReason::Declined)));
        assert_eq!(host.open_calls(), 0);
        assert!(host.events().is_empty());
    }

    #[test]
    fn invalid_preselected_index_aborts_before_open() {
        let host = FakeHost::new(&[("Microphone", 1)]);
        let rule = PlatformFamily::Windows.rule();

        let startup = start_capture(
            &host,
            rule.as_ref(),
            &mut console(""),
            Some(5),
            &CaptureOptions::default(),
        )
        .unwrap();

        assert!(matches!(
            startup,
            Startup::Aborted(AbortReason::InvalidSelection(_))
        ));
        assert_eq!(host.open_calls(), 0);
    }

    #[test]
    fn preselected_index_skips_automatic_match() {
        let host = FakeHost::new(&[("Stereo Mix", 2), ("Microphone", 1)]);
        let rule = PlatformFamily::Windows.rule();

        let startup = start_capture(
            &host,
            rule.as_ref(),
            &mut console(""),
            Some(1),
            &CaptureOptions::default(),
        )
        .unwrap();

        let Startup::Ready(session) = startup else {
            panic!("expected a session");
        };
        assert_eq!(session.device().index, 1);
        assert_eq!(session.device().channel_count, 1);
    }

    #[test]
    fn multichannel_device_fails_at_open() {
        let host = FakeHost::new(&[("Stereo Mix", 6)]);
        let rule = PlatformFamily::Windows.rule();

        let err = start_capture(
            &host,
            rule.as_ref(),
            &mut console(""),
            None,
            &CaptureOptions::default(),
        )
        .unwrap_err();

        assert!(matches!(
            err,
            StartupError::Capture(CaptureError::UnsupportedChannelCount(6))
        ));
    }
}
