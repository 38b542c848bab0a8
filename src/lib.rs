/*!
 # Legion 4-Zone Keyboard Backlight Controller Library

 A Rust library for controlling the 4-zone RGB keyboard backlight found on
 Lenovo Legion laptops over the vendor USB control channel.

 ## Features

 * Hardware effects: static, breath, wave, hue (plus an explicit off state)
 * Software-animated effects: Police, Scanner, Heartbeat, Fire, Battery, Soft Wave
 * Per-zone color control with selection feedback (blink pulse) and solo focus mode
 * Named profiles with JSON persistence and import/export
 * Headless operation when no keyboard is attached (encode/blend still run)

 ## Example

 ```rust,no_run
 use legion_led_controller::*;

 #[tokio::main]
 async fn main() -> Result<()> {
     // Initialize tracing for logs
     tracing_subscriber::fmt::init();

     // Load persisted settings and open the keyboard (headless if absent)
     let doc = SettingsDocument::load(&SettingsDocument::default_path());
     let transport = UsbTransport::open();
     let mut engine = LightingEngine::new(doc, transport, Box::new(SysfsBattery::new()));

     // Basic operations
     engine.set_effect(EffectMode::Static);
     engine.set_zone_color(0, "ff0000")?; // Zone 1 to red
     engine.finish_initialization();
     engine.apply()?;

     Ok(())
 }
 ```
*/

use thiserror::Error;

/// Custom error types for the Legion LED controller library
#[derive(Error, Debug)]
pub enum Error {
    /// Color token is neither a 6-digit hex string nor a decimal triple
    #[error("Invalid color model: {0}")]
    InvalidColorModel(String),

    /// Color token looked like a decimal triple but did not parse
    #[error("Invalid RGB format: {0}")]
    InvalidColorFormat(String),

    /// USB communication error
    #[error("USB transport error: {0}")]
    Usb(#[from] rusb::Error),

    /// The built-in "Default" profile cannot be deleted
    #[error("The Default profile cannot be deleted")]
    DefaultProfileProtected,

    /// Filesystem error while persisting or loading settings
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Malformed settings or profile document
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

// Import needed for Result type extension
pub type Result<T> = std::result::Result<T, Error>;

// Re-export modules
pub mod animation;
pub mod battery;
pub mod color;
pub mod device;
pub mod engine;
pub mod frame;
pub mod profile;
pub mod settings;
pub mod state;

// Re-export key types
pub use animation::AnimationScheduler;
pub use battery::{BatteryProbe, BatterySnapshot, BatteryStatus, SysfsBattery};
pub use device::{MockTransport, Transport, UsbTransport};
pub use engine::{LightingEngine, ResolveTrigger};
pub use frame::{encode, Brightness, EffectMode, WaveDirection, FRAME_LEN};
pub use profile::{Profile, ProfileStore};
pub use settings::SettingsDocument;
pub use state::{LightingState, ZONE_COUNT};
