/*!
 # Software animation scheduler

 Synthesizes per-zone color frames for the effects the keyboard firmware
 does not implement. One cooperative ticker drives it: each tick computes
 the next frame from the wrapping step counter, and the next delay comes
 from a per-effect, per-speed lookup table. The scheduler keeps no state
 between effects beyond the counter, so switching effects needs no
 cancellation handshake.
*/

use std::time::Duration;

use rand::Rng;
use tracing::trace;

use crate::battery::{BatteryProbe, BatteryStatus};
use crate::color;
use crate::frame::EffectMode;
use crate::state::{LightingState, ZONE_COUNT};

/// Battery-effect thresholds, user configurable (percent)
#[derive(Debug, Clone, Copy)]
pub struct BatteryThresholds {
    /// At or below this the warning pattern takes over
    pub low: u8,
    /// At or above this the indicator turns green
    pub green: u8,
    /// At or above this all four zones light
    pub full: u8,
}

impl Default for BatteryThresholds {
    fn default() -> Self {
        Self {
            low: 15,
            green: 75,
            full: 95,
        }
    }
}

/// Zone bounce order for the Scanner effect
const SCANNER_PATH: [usize; 6] = [0, 1, 2, 3, 2, 1];

/// Cooperative ticker producing frames for software effects
#[derive(Debug, Default)]
pub struct AnimationScheduler {
    /// Wrapping step counter; all effect math is modulo-indexed
    step: u64,
}

impl AnimationScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> u64 {
        self.step
    }

    /// Moves to the next animation step
    pub fn advance(&mut self) {
        self.step = self.step.wrapping_add(1);
    }

    /// Computes the frame for the current step, or `None` when the active
    /// effect is not software-animated (the scheduler idles but stays ready)
    pub fn frame(
        &self,
        state: &LightingState,
        battery: &dyn BatteryProbe,
        thresholds: BatteryThresholds,
    ) -> Option<[String; ZONE_COUNT]> {
        let step = self.step;
        let colors = match state.effect() {
            EffectMode::Police => {
                // Alternate flashing red and blue in zone pairs
                if step % 2 == 0 {
                    ["ff0000", "ff0000", "0000ff", "0000ff"].map(String::from)
                } else {
                    ["0000ff", "0000ff", "ff0000", "ff0000"].map(String::from)
                }
            }
            EffectMode::Scanner => {
                // A single lit zone bounces across the board, themed on zone 1
                let active = SCANNER_PATH[(step % 6) as usize];
                let mut frame: [String; ZONE_COUNT] = std::array::from_fn(|_| "000000".to_string());
                frame[active] = state.colors()[0].clone();
                frame
            }
            EffectMode::Heartbeat => {
                // Double-thump pulse
                if step % 4 == 0 || step % 4 == 2 {
                    state.colors().clone()
                } else {
                    std::array::from_fn(|_| "000000".to_string())
                }
            }
            EffectMode::Fire => {
                let mut rng = rand::thread_rng();
                std::array::from_fn(|_| {
                    let r: u8 = rng.gen_range(180..=255);
                    let g: u8 = rng.gen_range(0..=80);
                    format!("{r:02x}{g:02x}00")
                })
            }
            EffectMode::Battery => Self::battery_frame(step, battery, thresholds),
            EffectMode::SoftWave => {
                // Rotate the configured zone colors cyclically
                std::array::from_fn(|i| state.colors()[(step as usize + i) % ZONE_COUNT].clone())
            }
            _ => return None,
        };

        trace!("Animation step {} -> {:?}", step, colors);
        Some(colors)
    }

    /// Renders the battery charge level onto the zones
    fn battery_frame(
        step: u64,
        battery: &dyn BatteryProbe,
        thresholds: BatteryThresholds,
    ) -> [String; ZONE_COUNT] {
        let snapshot = battery.snapshot();
        let percent = snapshot.percent;

        if percent <= thresholds.low {
            if snapshot.status != BatteryStatus::Charging {
                // Critically low and draining: blink all zones red in sync
                let hex = if step % 2 == 0 { "ff0000" } else { "000000" };
                return std::array::from_fn(|_| hex.to_string());
            }
            // Charger plugged in: solid zone 1 red as acknowledgement
            let mut frame: [String; ZONE_COUNT] = std::array::from_fn(|_| "000000".to_string());
            frame[0] = "ff0000".to_string();
            return frame;
        }

        // Charge level as a progress bar across the zones
        let lit_count = if percent >= thresholds.full {
            4
        } else if percent >= 50 {
            3
        } else if percent >= 25 {
            2
        } else {
            1
        };

        // Green (full) -> yellow -> orange -> red (low)
        let base = if percent >= thresholds.green {
            (0, 255, 0)
        } else if percent >= 45 {
            (200, 200, 0)
        } else if percent >= 20 {
            (255, 120, 0)
        } else {
            (255, 0, 0)
        };

        // Subtle pulsing brightness on top of the base color
        let pulse = 0.7 + 0.3 * (step as f32 * 0.2).sin().abs();
        let hex = color::to_hex(color::dim(base, pulse));

        std::array::from_fn(|i| {
            if i < lit_count {
                hex.clone()
            } else {
                "000000".to_string()
            }
        })
    }

    /// Delay until the next tick for the given effect and speed.
    ///
    /// Heartbeat timing is irregular and ignores the speed setting: the
    /// delay pairs with the sub-step just displayed, giving the
    /// thump-pause rhythm. Non-software effects tick on the generic table
    /// so the scheduler stays ready for an effect change.
    pub fn delay(&self, effect: EffectMode, speed: u8) -> Duration {
        let idx = (speed.clamp(1, 4) - 1) as usize;
        let ms = match effect {
            EffectMode::Fire => [250, 150, 80, 40][idx],
            EffectMode::Scanner => [400, 250, 120, 60][idx],
            EffectMode::Police => [600, 350, 180, 90][idx],
            EffectMode::Heartbeat => match self.step % 4 {
                0 | 2 => 120,
                1 => 180,
                _ => 1200, // Pause between beats
            },
            _ => [800, 400, 200, 100][idx],
        };
        Duration::from_millis(ms)
    }
}
