//! Platform detection and loopback-device naming rules.
//!
//! | Platform | Automatic rule | Typical device |
//! |----------|----------------|----------------|
//! | Windows  | name starts with `stereo mix` | "Stereo Mix (Realtek(R) Audio)" |
//! | macOS    | name contains `blackhole`     | "BlackHole 2ch" |
//! | other    | none (manual selection only)  | "Monitor of Built-in Audio" |

use crate::audio::DeviceDescriptor;

// ---------------------------------------------------------------------------
// PlatformFamily
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformFamily {
    Windows,
    MacOs,
    Other,
}

impl PlatformFamily {
    /// The family of the platform this binary runs on.
    pub fn detect() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    /// Map a `std::env::consts::OS` value to a family.
    pub fn from_os(os: &str) -> Self {
        match os {
            "windows" => Self::Windows,
            "macos" => Self::MacOs,
            _ => Self::Other,
        }
    }

    /// The loopback rule for this family.
    pub fn rule(self) -> Box<dyn LoopbackRule> {
        match self {
            Self::Windows => Box::new(StereoMixRule),
            Self::MacOs => Box::new(BlackHoleRule),
            Self::Other => Box::new(NoAutomaticRule),
        }
    }
}

// ---------------------------------------------------------------------------
// LoopbackRule
// ---------------------------------------------------------------------------

/// How a platform recognises its loopback capture device.
pub trait LoopbackRule {
    /// `true` if `device`'s name marks it as the platform's loopback device.
    /// Input-channel filtering is done by the selector, not here.
    fn matches_platform_default(&self, device: &DeviceDescriptor) -> bool;

    /// Operator guidance printed when no device matched.
    fn remediation(&self) -> &'static str;
}

/// Windows: the Realtek-style "Stereo Mix" recording device.
#[derive(Debug, Clone, Copy, Default)]
pub struct StereoMixRule;

impl LoopbackRule for StereoMixRule {
    fn matches_platform_default(&self, device: &DeviceDescriptor) -> bool {
        device.name.to_lowercase().starts_with("stereo mix")
    }

    fn remediation(&self) -> &'static str {
        "\nProper audio recording device not found.\n\
         Please enable 'Stereo Mix' by going to:\n\
         Settings → Sound → More Sound Settings → Recording tab\n\
         then right-click 'Stereo Mix' and select 'Enable'.\n\
         Also ensure that the 16 bit, 48,000 Hz option is selected."
    }
}

/// macOS: the BlackHole virtual loopback driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlackHoleRule;

impl LoopbackRule for BlackHoleRule {
    fn matches_platform_default(&self, device: &DeviceDescriptor) -> bool {
        device.name.to_lowercase().contains("blackhole")
    }

    fn remediation(&self) -> &'static str {
        "\nProper audio recording device not found.\n\
         macOS has no built-in loopback device. Install BlackHole\n\
         (https://existential.audio/blackhole/), then open Audio MIDI Setup,\n\
         create a Multi-Output Device containing your speakers and BlackHole,\n\
         and select it as the system output.\n\
         Set BlackHole to 48,000 Hz in Audio MIDI Setup."
    }
}

/// Any other platform: no name convention to rely on.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAutomaticRule;

impl LoopbackRule for NoAutomaticRule {
    fn matches_platform_default(&self, _device: &DeviceDescriptor) -> bool {
        false
    }

    fn remediation(&self) -> &'static str {
        "\nNo loopback device can be detected automatically on this platform.\n\
         On Linux, PulseAudio and PipeWire expose 'Monitor of …' sources that\n\
         capture system output; choose one from the list below.\n\
         The device must support 16 bit, 48,000 Hz capture."
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> DeviceDescriptor {
        DeviceDescriptor::new(0, name, 2)
    }

    #[test]
    fn os_strings_map_to_families() {
        assert_eq!(PlatformFamily::from_os("windows"), PlatformFamily::Windows);
        assert_eq!(PlatformFamily::from_os("macos"), PlatformFamily::MacOs);
        assert_eq!(PlatformFamily::from_os("linux"), PlatformFamily::Other);
        assert_eq!(PlatformFamily::from_os("freebsd"), PlatformFamily::Other);
    }

    #[test]
    fn stereo_mix_is_prefix_and_case_insensitive() {
        let rule = StereoMixRule;
        assert!(rule.matches_platform_default(&named("Stereo Mix (Realtek(R) Audio)")));
        assert!(rule.matches_platform_default(&named("STEREO MIX")));
        assert!(!rule.matches_platform_default(&named("Realtek Stereo Mix")));
        assert!(!rule.matches_platform_default(&named("Microphone")));
    }

    #[test]
    fn blackhole_is_substring_and_case_insensitive() {
        let rule = BlackHoleRule;
        assert!(rule.matches_platform_default(&named("BlackHole 2ch")));
        assert!(rule.matches_platform_default(&named("Existential blackhole 16ch")));
        assert!(!rule.matches_platform_default(&named("Built-in Microphone")));
    }

    #[test]
    fn other_platforms_never_match() {
        let rule = PlatformFamily::Other.rule();
        assert!(!rule.matches_platform_default(&named("Stereo Mix")));
        assert!(!rule.matches_platform_default(&named("BlackHole 2ch")));
    }

    #[test]
    fn remediation_text_differs_per_family() {
        let windows = PlatformFamily::Windows.rule().remediation();
        let mac = PlatformFamily::MacOs.rule().remediation();
        let other = PlatformFamily::Other.rule().remediation();

        assert!(windows.contains("Stereo Mix"));
        assert!(mac.contains("BlackHole"));
        assert_ne!(windows, mac);
        assert_ne!(mac, other);
        assert_ne!(windows, other);
    }
}
