//! `hyprpaper_core`: the wallpaper service protocol.
//!
//! ```text
//! manager
//!   get_wallpaper_object(new_id)          -> wallpaper
//! wallpaper
//!   path(string) fit_mode(uint) monitor_name(string) apply()
//!   <- success()  <- failed(uint reason)
//! ```

use super::ProtocolDescriptor;

pub const PROTOCOL: ProtocolDescriptor = ProtocolDescriptor {
    name: "hyprpaper_core",
    version: 1,
};

/// Manager requests.
pub mod manager {
    pub const GET_WALLPAPER_OBJECT: u16 = 0;
}

/// Wallpaper object requests and events.
pub mod wallpaper_object {
    pub const PATH: u16 = 0;
    pub const FIT_MODE: u16 = 1;
    pub const MONITOR_NAME: u16 = 2;
    pub const APPLY: u16 = 3;

    pub const EVENT_SUCCESS: u16 = 0;
    pub const EVENT_FAILED: u16 = 1;
}

/// How the image is fitted to the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum FitMode {
    #[default]
    Cover = 0,
    Contain = 1,
    Stretch = 2,
    Tile = 3,
}

impl FitMode {
    /// Value sent in the `fit_mode` request.
    pub fn wire_value(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for FitMode {
    type Error = ();

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(FitMode::Cover),
            1 => Ok(FitMode::Contain),
            2 => Ok(FitMode::Stretch),
            3 => Ok(FitMode::Tile),
            _ => Err(()),
        }
    }
}
