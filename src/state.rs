/*!
 # Authoritative lighting state

 Owns the per-zone colors, the active effect and its parameters, the zone
 selection, per-zone restore colors for the power toggle, and the bounded
 history of recently used colors. Every mutator reports whether the change
 needs to be persisted, leaving the flush decision to the caller.
*/

use crate::color;
use crate::frame::{Brightness, EffectMode, WaveDirection};
use crate::profile::Profile;
use crate::Result;

/// Number of independently addressable backlight zones
pub const ZONE_COUNT: usize = 4;

/// Factory color applied to all zones (and used as power-toggle fallback)
pub const DEFAULT_COLOR: &str = "39c5bb";

/// Number of entries kept in the color history
const HISTORY_CAPACITY: usize = 12;

/// Neutral swatch filler; never stored as a real history entry
const HISTORY_PLACEHOLDER: &str = "#333333";

/// Ordered most-recent-first list of colors the user has applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorHistory {
    entries: Vec<String>,
}

impl Default for ColorHistory {
    fn default() -> Self {
        Self {
            entries: vec![HISTORY_PLACEHOLDER.to_string(); HISTORY_CAPACITY],
        }
    }
}

impl ColorHistory {
    /// Wraps previously persisted entries, truncated to capacity
    pub fn from_entries(mut entries: Vec<String>) -> Self {
        entries.truncate(HISTORY_CAPACITY);
        Self { entries }
    }

    /// Records a color at the front, deduplicating and dropping the oldest
    /// entry past capacity. Black and the neutral placeholder are ignored.
    /// Returns whether the history changed.
    pub fn record(&mut self, hex: &str) -> bool {
        let entry = format!("#{}", hex.trim_start_matches('#').to_lowercase());
        if entry == "#000000" || entry == HISTORY_PLACEHOLDER {
            return false;
        }

        self.entries.retain(|e| e != &entry);
        self.entries.insert(0, entry);
        self.entries.truncate(HISTORY_CAPACITY);
        true
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}

/// The engine's authoritative per-zone color and effect state
#[derive(Debug, Clone)]
pub struct LightingState {
    /// Current zone colors as 6-digit lowercase hex, zone 0 leftmost
    colors: [String; ZONE_COUNT],
    /// Active effect
    effect: EffectMode,
    /// Backlight brightness
    brightness: Brightness,
    /// Animation speed, 1 (slow) to 4 (fast)
    speed: u8,
    /// Direction of the hardware wave effect
    wave_direction: WaveDirection,
    /// Zone currently focused for editing, if any
    selected_zone: Option<usize>,
    /// Last non-black color per zone, for the power toggle restore
    last_on_colors: [String; ZONE_COUNT],
    /// Recently used colors
    pub history: ColorHistory,
}

impl Default for LightingState {
    fn default() -> Self {
        Self {
            colors: std::array::from_fn(|_| DEFAULT_COLOR.to_string()),
            effect: EffectMode::Static,
            brightness: Brightness::Low,
            speed: 2,
            wave_direction: WaveDirection::Ltr,
            selected_zone: None,
            last_on_colors: std::array::from_fn(|_| DEFAULT_COLOR.to_string()),
            history: ColorHistory::default(),
        }
    }
}

impl LightingState {
    pub fn colors(&self) -> &[String; ZONE_COUNT] {
        &self.colors
    }

    pub fn effect(&self) -> EffectMode {
        self.effect
    }

    pub fn brightness(&self) -> Brightness {
        self.brightness
    }

    pub fn speed(&self) -> u8 {
        self.speed
    }

    pub fn wave_direction(&self) -> WaveDirection {
        self.wave_direction
    }

    pub fn selected_zone(&self) -> Option<usize> {
        self.selected_zone
    }

    /// Switches the active effect. Returns whether persistence is needed.
    pub fn set_effect(&mut self, effect: EffectMode) -> bool {
        self.effect = effect;
        true
    }

    pub fn set_brightness(&mut self, brightness: Brightness) -> bool {
        self.brightness = brightness;
        true
    }

    /// Sets the animation speed, clamped to the valid 1-4 range
    pub fn set_speed(&mut self, speed: u8) -> bool {
        self.speed = speed.clamp(1, 4);
        true
    }

    pub fn set_wave_direction(&mut self, direction: WaveDirection) -> bool {
        self.wave_direction = direction;
        true
    }

    /// Sets one zone's color from a user token (hex or decimal triple).
    ///
    /// The token is validated and canonicalized to lowercase hex; a blank
    /// token is rejected here (carry-forward only applies on the wire).
    pub fn set_zone_color(&mut self, zone: usize, token: &str) -> Result<bool> {
        match color::parse(token)? {
            Some(rgb) => {
                self.colors[zone] = color::to_hex(rgb);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Focuses a zone for editing (None clears the selection).
    /// Selection is transient and never persisted.
    pub fn select_zone(&mut self, zone: Option<usize>) -> bool {
        self.selected_zone = zone;
        false
    }

    /// Toggles a zone between its color and black, remembering the color so
    /// the next toggle restores it (falling back to the factory color when
    /// nothing was remembered).
    pub fn toggle_zone_power(&mut self, zone: usize) -> bool {
        if self.colors[zone] != "000000" {
            self.last_on_colors[zone] = self.colors[zone].clone();
            self.colors[zone] = "000000".to_string();
        } else {
            let mut restore = self.last_on_colors[zone].clone();
            if restore == "000000" {
                restore = DEFAULT_COLOR.to_string();
            }
            self.colors[zone] = restore;
        }
        true
    }

    /// Fills zones 1 and 2 with a linear gradient from zone 0 to zone 3
    pub fn generate_gradient(&mut self) -> Result<bool> {
        let c1 = color::parse(&self.colors[0])?.unwrap_or((0, 0, 0));
        let c4 = color::parse(&self.colors[3])?.unwrap_or((0, 0, 0));
        self.colors[1] = color::to_hex(color::interpolate(c1, c4, 1.0 / 3.0));
        self.colors[2] = color::to_hex(color::interpolate(c1, c4, 2.0 / 3.0));
        Ok(true)
    }

    /// Captures the persistable part of the state as a profile snapshot
    pub fn snapshot(&self) -> Profile {
        Profile {
            effect: self.effect,
            brightness: self.brightness,
            speed: self.speed,
            wave_direction: self.wave_direction,
            colors: self.colors.to_vec(),
        }
    }

    /// Restores the state from a profile snapshot
    pub fn apply_profile(&mut self, profile: &Profile) {
        self.effect = profile.effect;
        self.brightness = profile.brightness;
        self.speed = profile.speed.clamp(1, 4);
        self.wave_direction = profile.wave_direction;
        for (i, c) in profile.colors.iter().take(ZONE_COUNT).enumerate() {
            self.colors[i] = c.trim_start_matches('#').to_lowercase();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_power_toggle_restores_last_color() {
        let mut state = LightingState::default();
        state.set_zone_color(2, "ff8800").unwrap();

        assert!(state.toggle_zone_power(2));
        assert_eq!(state.colors()[2], "000000");

        assert!(state.toggle_zone_power(2));
        assert_eq!(state.colors()[2], "ff8800");
    }

    #[test]
    fn test_zone_power_toggle_fallback() {
        let mut state = LightingState::default();
        // Zone was never lit before being toggled off and on again
        state.colors[0] = "000000".to_string();
        state.last_on_colors[0] = "000000".to_string();

        state.toggle_zone_power(0);
        assert_eq!(state.colors()[0], DEFAULT_COLOR);
    }

    #[test]
    fn test_gradient_endpoints_preserved() {
        let mut state = LightingState::default();
        state.set_zone_color(0, "000000").unwrap();
        state.set_zone_color(3, "0000ff").unwrap();

        state.generate_gradient().unwrap();
        assert_eq!(state.colors()[0], "000000");
        assert_eq!(state.colors()[1], "000055");
        assert_eq!(state.colors()[2], "0000aa");
        assert_eq!(state.colors()[3], "0000ff");
    }

    #[test]
    fn test_speed_clamped() {
        let mut state = LightingState::default();
        state.set_speed(9);
        assert_eq!(state.speed(), 4);
        state.set_speed(0);
        assert_eq!(state.speed(), 1);
    }

    #[test]
    fn test_selection_not_persisted() {
        let mut state = LightingState::default();
        assert!(!state.select_zone(Some(1)));
        assert_eq!(state.selected_zone(), Some(1));
        assert!(!state.select_zone(None));
        assert_eq!(state.selected_zone(), None);
    }

    #[test]
    fn test_history_dedupe_and_capacity() {
        let mut history = ColorHistory::default();
        assert!(history.record("ff0000"));
        assert!(history.record("#00ff00"));
        // Re-recording moves to the front instead of duplicating
        assert!(history.record("FF0000"));
        assert_eq!(history.entries()[0], "#ff0000");
        assert_eq!(history.entries()[1], "#00ff00");
        assert_eq!(history.entries().len(), 12);

        for i in 0..20 {
            history.record(&format!("{:06x}", i + 1));
        }
        assert_eq!(history.entries().len(), 12);
    }

    #[test]
    fn test_history_ignores_black_and_placeholder() {
        let mut history = ColorHistory::default();
        assert!(!history.record("000000"));
        assert!(!history.record("#333333"));
        assert!(history.entries().iter().all(|e| e == "#333333"));
    }

    #[test]
    fn test_profile_snapshot_round_trip() {
        let mut state = LightingState::default();
        state.set_effect(EffectMode::Breath);
        state.set_brightness(Brightness::High);
        state.set_speed(3);
        state.set_zone_color(1, "123456").unwrap();

        let snapshot = state.snapshot();
        let mut restored = LightingState::default();
        restored.apply_profile(&snapshot);

        assert_eq!(restored.effect(), EffectMode::Breath);
        assert_eq!(restored.brightness(), Brightness::High);
        assert_eq!(restored.speed(), 3);
        assert_eq!(restored.colors()[1], "123456");
    }
}
