//! Desktop runtime description.

use bridge_traits::platform::{PlatformFamily, PlatformInfo};

/// [`PlatformInfo`] derived from the compilation target.
///
/// Hardware decoder enumeration is not attempted; an explicit list can be
/// supplied by hosts that query the GPU themselves.
#[derive(Debug, Clone, Default)]
pub struct DesktopPlatform {
    hardware_decoders: Vec<String>,
}

impl DesktopPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hardware_decoders<I, S>(mut self, decoders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hardware_decoders = decoders.into_iter().map(Into::into).collect();
        self
    }

    fn current_family() -> PlatformFamily {
        if cfg!(target_os = "macos") {
            PlatformFamily::MacOs
        } else if cfg!(target_os = "windows") {
            PlatformFamily::Windows
        } else {
            PlatformFamily::Linux
        }
    }
}

impl PlatformInfo for DesktopPlatform {
    fn family(&self) -> PlatformFamily {
        Self::current_family()
    }

    fn os_version(&self) -> Option<String> {
        Some(std::env::consts::OS.to_string())
    }

    fn hardware_decoders(&self) -> Vec<String> {
        self.hardware_decoders.clone()
    }
}
