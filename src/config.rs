//! Player configuration
//!
//! Everything in the scene is fixed at startup. Defaults reproduce the Big
//! Buck Bunny stereo demo; a handful of environment variables override them.

use std::path::PathBuf;

use log::info;

use crate::video::VideoSource;

pub const ENV_VIDEO_PATH: &str = "STEREO_VIDEO_PATH";
pub const ENV_CAPTION: &str = "STEREO_VIDEO_CAPTION";
pub const ENV_IMMERSIVE: &str = "STEREO_VIDEO_IMMERSIVE";

/// Startup parameters for the player
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerConfig {
    pub caption_text: String,
    pub caption_font_px: f32,
    /// 0xRRGGBB clear colour
    pub background: u32,
    pub video: VideoSource,
    /// Whether the session control may enter side-by-side presentation
    pub immersive_supported: bool,
    /// Inter-pupillary distance in metres (average human IPD is ~63mm)
    pub ipd: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            caption_text: "Big Buck Bunny, Licensed under CC-BY 3.0.".to_string(),
            caption_font_px: 40.0,
            background: 0x404040,
            video: VideoSource::TestPattern,
            immersive_supported: true,
            ipd: 0.063,
        }
    }
}

impl PlayerConfig {
    /// Defaults overridden by the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden through an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = lookup(ENV_VIDEO_PATH).filter(|p| !p.trim().is_empty()) {
            info!("Config: video file {}", path);
            config.video = VideoSource::File(PathBuf::from(path));
        }
        if let Some(caption) = lookup(ENV_CAPTION) {
            config.caption_text = caption;
        }
        if let Some(flag) = lookup(ENV_IMMERSIVE) {
            config.immersive_supported = !matches!(flag.trim().to_ascii_lowercase().as_str(), "0" | "false" | "off" | "no");
            info!("Config: immersive presentation supported = {}", config.immersive_supported);
        }

        config
    }
}

/// 0xRRGGBB to normalized sRGB components
pub fn hex_to_rgb(hex: u32) -> [f32; 3] {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    ]
}
