/*!
 # Hardware control frame encoding

 The keyboard firmware accepts a single fixed-length 33-byte command frame
 over the vendor control channel. The byte layout is a hard compatibility
 contract: any deviation is silently rejected by the device or produces
 undefined lighting.
*/

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::{color, Result};

/// Length of every control frame, for every effect including off
pub const FRAME_LEN: usize = 33;

/// Magic bytes opening every frame
const MAGIC: [u8; 2] = [204, 22];

/// Lighting effect selector.
///
/// The first five are implemented by the keyboard firmware; the rest are
/// synthesized in software by the animation scheduler and always transmit
/// as `Static` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum EffectMode {
    #[serde(rename = "static")]
    Static,
    #[serde(rename = "breath")]
    Breath,
    #[serde(rename = "wave")]
    Wave,
    #[serde(rename = "hue")]
    Hue,
    #[serde(rename = "off")]
    Off,
    Police,
    Scanner,
    Heartbeat,
    Fire,
    Battery,
    #[serde(rename = "Soft Wave")]
    SoftWave,
}

impl EffectMode {
    /// Whether this effect is synthesized by the software animation scheduler
    pub fn is_software(self) -> bool {
        matches!(
            self,
            Self::Police | Self::Scanner | Self::Heartbeat | Self::Fire | Self::Battery | Self::SoftWave
        )
    }

    /// The effect actually transmitted to the firmware (software variants map to Static)
    pub fn hardware(self) -> Self {
        if self.is_software() {
            Self::Static
        } else {
            self
        }
    }

    /// Firmware effect code for byte 2 of the frame
    pub fn hardware_code(self) -> u8 {
        match self.hardware() {
            Self::Static | Self::Off => 1,
            Self::Breath => 3,
            Self::Wave => 4,
            Self::Hue => 6,
            _ => unreachable!("hardware() returns a hardware variant"),
        }
    }
}

impl std::fmt::Display for EffectMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EffectMode::Static => write!(f, "static"),
            EffectMode::Breath => write!(f, "breath"),
            EffectMode::Wave => write!(f, "wave"),
            EffectMode::Hue => write!(f, "hue"),
            EffectMode::Off => write!(f, "off"),
            EffectMode::Police => write!(f, "Police"),
            EffectMode::Scanner => write!(f, "Scanner"),
            EffectMode::Heartbeat => write!(f, "Heartbeat"),
            EffectMode::Fire => write!(f, "Fire"),
            EffectMode::Battery => write!(f, "Battery"),
            EffectMode::SoftWave => write!(f, "Soft Wave"),
        }
    }
}

impl std::str::FromStr for EffectMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "static" => Ok(Self::Static),
            "breath" => Ok(Self::Breath),
            "wave" => Ok(Self::Wave),
            "hue" => Ok(Self::Hue),
            "off" => Ok(Self::Off),
            "police" => Ok(Self::Police),
            "scanner" => Ok(Self::Scanner),
            "heartbeat" => Ok(Self::Heartbeat),
            "fire" => Ok(Self::Fire),
            "battery" => Ok(Self::Battery),
            "soft wave" | "soft-wave" | "soft_wave" | "softwave" => Ok(Self::SoftWave),
            other => Err(format!("unknown effect: {other}")),
        }
    }
}

/// Backlight brightness level; `Off` suppresses all transmission upstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum Brightness {
    #[serde(rename = "Off")]
    Off,
    #[serde(rename = "Low")]
    Low,
    #[serde(rename = "High")]
    High,
}

impl Brightness {
    /// Raw level for byte 4 of the frame (1 = low, 2 = high).
    ///
    /// `Off` never reaches the encoder under normal operation (the blender
    /// short-circuits), but maps to the low level so encoding stays total.
    pub fn wire_level(self) -> u8 {
        match self {
            Self::High => 2,
            Self::Low | Self::Off => 1,
        }
    }
}

/// Direction of the hardware wave effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum WaveDirection {
    #[serde(rename = "LTR")]
    Ltr,
    #[serde(rename = "RTL")]
    Rtl,
}

impl std::fmt::Display for WaveDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WaveDirection::Ltr => write!(f, "LTR"),
            WaveDirection::Rtl => write!(f, "RTL"),
        }
    }
}

impl std::str::FromStr for WaveDirection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "LTR" => Ok(Self::Ltr),
            "RTL" => Ok(Self::Rtl),
            other => Err(format!("unknown wave direction: {other}")),
        }
    }
}

/// Builds the 33-byte control frame for the given settings.
///
/// Layout (0-indexed): `[0,1]` magic, `[2]` effect code, `[3]` speed,
/// `[4]` brightness level, `[5..17)` four 3-byte zone colors (static/breath
/// only, zeros otherwise), `[17]` separator, `[18,19]` wave direction
/// marker, `[20..33)` padding. For `Off` everything after the effect code
/// is zero.
///
/// Zone colors follow the carry-forward rule: a blank or missing token
/// reuses the previous zone's resolved color, with zone 0 inheriting an
/// implicit black seed. A malformed token aborts the whole frame build.
pub fn encode(
    effect: EffectMode,
    colors: &[String],
    speed: u8,
    brightness: Brightness,
    wave_direction: Option<WaveDirection>,
) -> Result<[u8; FRAME_LEN]> {
    let mut frame = [0u8; FRAME_LEN];
    frame[0] = MAGIC[0];
    frame[1] = MAGIC[1];
    frame[2] = effect.hardware_code();

    if effect == EffectMode::Off {
        return Ok(frame);
    }

    frame[3] = speed;
    frame[4] = brightness.wire_level();

    if matches!(effect.hardware(), EffectMode::Static | EffectMode::Breath) {
        let mut chunk = (0u8, 0u8, 0u8);
        for zone in 0..4 {
            let token = colors.get(zone).map(String::as_str).unwrap_or("");
            if let Some(rgb) = color::parse(token)? {
                chunk = rgb;
            }
            frame[5 + zone * 3] = chunk.0;
            frame[6 + zone * 3] = chunk.1;
            frame[7 + zone * 3] = chunk.2;
        }
    }

    match wave_direction {
        Some(WaveDirection::Rtl) => {
            frame[18] = 1;
            frame[19] = 0;
        }
        Some(WaveDirection::Ltr) => {
            frame[18] = 0;
            frame[19] = 1;
        }
        None => {}
    }

    Ok(frame)
}
