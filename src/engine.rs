/*!
 # Lighting engine and settings blender

 The single authority deciding what actually reaches the wire. User edits,
 animation ticks and the blink ticker all converge on [`LightingEngine::resolve`],
 which blends the lighting state, the scheduler's latest frame, the blink
 selection feedback and the solo focus mode into the four colors handed to
 the frame encoder. One cooperative task drives both tickers, so a resolve
 in flight always completes before the next one begins.
*/

use std::path::PathBuf;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::animation::{AnimationScheduler, BatteryThresholds};
use crate::battery::BatteryProbe;
use crate::color;
use crate::device::Transport;
use crate::frame::{self, Brightness, EffectMode, WaveDirection};
use crate::profile::{ProfileStore, DEFAULT_PROFILE};
use crate::settings::SettingsDocument;
use crate::state::{ColorHistory, LightingState, ZONE_COUNT};
use crate::Result;

/// Interval of the selection-feedback blink ticker
const BLINK_INTERVAL: Duration = Duration::from_millis(600);

/// Dim factor applied to the selected zone during the blink off phase
const BLINK_DIM: f32 = 0.3;

/// What caused a resolve cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveTrigger {
    /// A user-driven edit or an explicit apply
    Manual,
    /// The fixed-interval blink ticker
    Blink,
    /// The software animation ticker
    Animation,
}

/// Owns all lighting state and drives the device
pub struct LightingEngine<T: Transport> {
    state: LightingState,
    store: ProfileStore,
    scheduler: AnimationScheduler,
    transport: T,
    battery: Box<dyn BatteryProbe + Send>,

    // Persisted alongside the profiles
    theme: String,
    live_preview: bool,
    current_profile: String,
    blink_opposite: bool,
    solo_mode: bool,
    thresholds: BatteryThresholds,

    /// Latest frame produced by the animation scheduler
    sw_colors: [String; ZONE_COUNT],
    /// Blink phase; the off phase is where the selected zone gets dimmed
    blink_on: bool,
    /// Set until `finish_initialization`; suppresses persistence while the
    /// initially loaded profile is still being applied
    loading: bool,
    config_path: PathBuf,
}

impl<T: Transport> LightingEngine<T> {
    /// Builds the engine from a loaded settings document, applying its
    /// current profile. The engine starts in the loading state: no mutation
    /// persists anything until [`finish_initialization`](Self::finish_initialization).
    pub fn new(doc: SettingsDocument, transport: T, battery: Box<dyn BatteryProbe + Send>) -> Self {
        let store = ProfileStore::from_map(doc.profiles);
        let mut state = LightingState::default();
        state.history = ColorHistory::from_entries(doc.color_history);

        let current_profile = if store.contains(&doc.current_profile) {
            doc.current_profile
        } else {
            DEFAULT_PROFILE.to_string()
        };
        state.apply_profile(&store.load(&current_profile));

        Self {
            state,
            store,
            scheduler: AnimationScheduler::new(),
            transport,
            battery,
            theme: doc.theme,
            live_preview: doc.live_preview,
            current_profile,
            blink_opposite: doc.pref_blink_opposite,
            solo_mode: doc.pref_solo_mode,
            thresholds: BatteryThresholds {
                low: doc.pref_batt_low,
                green: doc.pref_batt_green,
                full: doc.pref_batt_full,
            },
            sw_colors: std::array::from_fn(|_| "000000".to_string()),
            blink_on: true,
            loading: true,
            config_path: SettingsDocument::default_path(),
        }
    }

    /// Overrides where the settings document is persisted
    pub fn with_config_path(mut self, path: PathBuf) -> Self {
        self.config_path = path;
        self
    }

    /// Ends the startup loading phase; mutations from here on persist
    pub fn finish_initialization(&mut self) {
        self.loading = false;
    }

    pub fn state(&self) -> &LightingState {
        &self.state
    }

    pub fn live_preview(&self) -> bool {
        self.live_preview
    }

    pub fn current_profile(&self) -> &str {
        &self.current_profile
    }

    // --- User-driven mutations ---

    pub fn set_effect(&mut self, effect: EffectMode) {
        self.state.set_effect(effect);
    }

    pub fn set_brightness(&mut self, brightness: Brightness) {
        self.state.set_brightness(brightness);
    }

    pub fn set_speed(&mut self, speed: u8) {
        self.state.set_speed(speed);
    }

    pub fn set_wave_direction(&mut self, direction: WaveDirection) {
        self.state.set_wave_direction(direction);
    }

    /// Sets a zone color from a user token and records it in the history
    pub fn set_zone_color(&mut self, zone: usize, token: &str) -> Result<()> {
        if self.state.set_zone_color(zone, token)? {
            let hex = self.state.colors()[zone].clone();
            self.state.history.record(&hex);
        }
        Ok(())
    }

    pub fn select_zone(&mut self, zone: Option<usize>) {
        self.state.select_zone(zone);
    }

    pub fn toggle_zone_power(&mut self, zone: usize) {
        self.state.toggle_zone_power(zone);
    }

    pub fn generate_gradient(&mut self) -> Result<()> {
        self.state.generate_gradient()?;
        Ok(())
    }

    pub fn set_live_preview(&mut self, enabled: bool) {
        self.live_preview = enabled;
    }

    pub fn set_solo_mode(&mut self, enabled: bool) {
        self.solo_mode = enabled;
    }

    pub fn set_blink_opposite(&mut self, enabled: bool) {
        self.blink_opposite = enabled;
    }

    pub fn set_battery_thresholds(&mut self, thresholds: BatteryThresholds) {
        self.thresholds = thresholds;
    }

    // --- Profiles ---

    /// Snapshots the current state under the given name and makes it current
    pub fn save_profile(&mut self, name: &str) -> Result<()> {
        self.store.save(name, self.state.snapshot());
        self.current_profile = name.to_string();
        self.persist_if_unlocked()
    }

    /// Loads a profile into the live state, falling back to "Default"
    pub fn load_profile(&mut self, name: &str) {
        let resolved = if self.store.contains(name) {
            name
        } else {
            DEFAULT_PROFILE
        };
        let profile = self.store.load(resolved);
        self.state.apply_profile(&profile);
        self.current_profile = resolved.to_string();
        info!("Loaded profile '{}'", resolved);
    }

    /// Deletes a profile (never "Default"); if it was current, falls back
    pub fn delete_profile(&mut self, name: &str) -> Result<()> {
        self.store.delete(name)?;
        if self.current_profile == name {
            self.load_profile(DEFAULT_PROFILE);
        }
        self.persist_if_unlocked()
    }

    pub fn list_profiles(&self) -> Vec<&str> {
        self.store.list()
    }

    /// Merges profiles imported from an interchange document
    pub fn import_profiles(
        &mut self,
        imported: std::collections::BTreeMap<String, crate::profile::Profile>,
    ) -> Result<()> {
        self.store.merge(imported);
        self.persist_if_unlocked()
    }

    pub fn profile_snapshot(&self, name: &str) -> crate::profile::Profile {
        self.store.load(name)
    }

    // --- Resolution ---

    /// Blends state, animation output, blink feedback and solo mode into the
    /// effective per-zone colors for one resolve cycle
    pub fn resolved_colors(&self, trigger: ResolveTrigger) -> [String; ZONE_COUNT] {
        let effect = self.state.effect();
        let selected = self.state.selected_zone();

        std::array::from_fn(|i| {
            let base = if effect.is_software() {
                self.sw_colors[i].clone()
            } else {
                self.state.colors()[i].clone()
            };

            if trigger == ResolveTrigger::Blink && !self.blink_on && selected == Some(i) {
                match color::parse(&base) {
                    Ok(Some(rgb)) if self.blink_opposite => color::to_hex(color::invert(rgb)),
                    Ok(Some(rgb)) => color::to_hex(color::dim(rgb, BLINK_DIM)),
                    _ => base,
                }
            } else if self.solo_mode
                && selected.is_some()
                && selected != Some(i)
                && trigger != ResolveTrigger::Animation
            {
                // Solo mode darkens the other zones during manual edits and
                // blink feedback, never while an animation is running
                "000000".to_string()
            } else {
                base
            }
        })
    }

    /// Resolves the effective settings and transmits one frame.
    ///
    /// Encode and transport failures skip the cycle and leave the state
    /// untouched; neither is fatal to the tickers. Manual resolves persist
    /// the settings document once initialization has finished.
    #[instrument(skip(self))]
    pub fn resolve(&mut self, trigger: ResolveTrigger) -> Result<()> {
        let effect = self.state.effect();

        // Blink pulses only apply to the static and breath effects
        if trigger == ResolveTrigger::Blink
            && !matches!(effect, EffectMode::Static | EffectMode::Breath)
        {
            return Ok(());
        }
        if self.state.brightness() == Brightness::Off {
            debug!("Brightness is off, not transmitting");
            return Ok(());
        }

        let colors = self.resolved_colors(trigger);
        let hw_effect = effect.hardware();
        let wave_direction = if hw_effect == EffectMode::Wave {
            Some(self.state.wave_direction())
        } else {
            None
        };

        let frame = match frame::encode(
            hw_effect,
            &colors,
            self.state.speed(),
            self.state.brightness(),
            wave_direction,
        ) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Frame build failed, skipping cycle: {}", e);
                return Ok(());
            }
        };
        if let Err(e) = self.transport.send(&frame) {
            warn!("Transmission failed, skipping cycle: {}", e);
            return Ok(());
        }

        if trigger == ResolveTrigger::Manual {
            self.persist_if_unlocked()?;
        }
        Ok(())
    }

    /// Manual apply: resolve and persist (the library's "APPLY SETTINGS")
    pub fn apply(&mut self) -> Result<()> {
        self.resolve(ResolveTrigger::Manual)
    }

    // --- Tickers ---

    /// One blink ticker firing: toggle the phase and, when live preview is
    /// enabled, pulse the hardware
    pub fn tick_blink(&mut self) {
        self.blink_on = !self.blink_on;
        if self.live_preview {
            if let Err(e) = self.resolve(ResolveTrigger::Blink) {
                warn!("Blink resolve failed: {}", e);
            }
        }
    }

    /// One animation ticker firing: compute the next frame for a software
    /// effect (or stay idle), transmit it, and return the delay until the
    /// next tick
    pub fn tick_animation(&mut self) -> Duration {
        let effect = self.state.effect();
        if let Some(colors) = self
            .scheduler
            .frame(&self.state, self.battery.as_ref(), self.thresholds)
        {
            self.sw_colors = colors;
            if let Err(e) = self.resolve(ResolveTrigger::Animation) {
                warn!("Animation resolve failed: {}", e);
            }
            let delay = self.scheduler.delay(effect, self.state.speed());
            self.scheduler.advance();
            delay
        } else {
            self.scheduler.delay(effect, self.state.speed())
        }
    }

    /// Runs the animation and blink tickers until ctrl-c.
    ///
    /// Both tickers live on this one task: a resolve in flight (including
    /// its hardware send) always completes before the next tick fires.
    pub async fn run(&mut self) -> Result<()> {
        info!("Engine running (animation + blink tickers)");
        let mut blink = tokio::time::interval(BLINK_INTERVAL);
        blink.tick().await; // First tick completes immediately

        let sleep = tokio::time::sleep(Duration::ZERO);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                () = &mut sleep => {
                    let delay = self.tick_animation();
                    sleep.as_mut().reset(Instant::now() + delay);
                }
                _ = blink.tick() => {
                    self.tick_blink();
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted, stopping tickers");
                    break;
                }
            }
        }
        Ok(())
    }

    // --- Persistence ---

    /// Rebuilds the settings document from the live state
    pub fn to_document(&self) -> SettingsDocument {
        let mut profiles = self.store.as_map().clone();
        profiles.insert(self.current_profile.clone(), self.state.snapshot());

        SettingsDocument {
            theme: self.theme.clone(),
            live_preview: self.live_preview,
            current_profile: self.current_profile.clone(),
            color_history: self.state.history.entries().to_vec(),
            pref_blink_opposite: self.blink_opposite,
            pref_solo_mode: self.solo_mode,
            pref_batt_low: self.thresholds.low,
            pref_batt_green: self.thresholds.green,
            pref_batt_full: self.thresholds.full,
            profiles,
        }
    }

    fn persist_if_unlocked(&mut self) -> Result<()> {
        if self.loading {
            debug!("Still loading, skipping persistence");
            return Ok(());
        }
        // Fold the live state into the current profile before writing
        self.store.save(&self.current_profile, self.state.snapshot());
        self.to_document().save(&self.config_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battery::{BatterySnapshot, BatteryStatus, FixedBattery};
    use crate::device::MockTransport;

    fn test_engine(tag: &str) -> LightingEngine<MockTransport> {
        let battery = FixedBattery(BatterySnapshot {
            percent: 100,
            status: BatteryStatus::Unknown,
        });
        let path = std::env::temp_dir().join(format!(
            "legion-engine-{tag}-{}.json",
            std::process::id()
        ));
        let mut engine = LightingEngine::new(
            SettingsDocument::default(),
            MockTransport::new(),
            Box::new(battery),
        )
        .with_config_path(path);
        engine.finish_initialization();
        engine
    }

    #[test]
    fn test_solo_mode_masks_unselected_zones() {
        let mut engine = test_engine("solo_mode_masks_unselected_zones");
        engine.set_effect(EffectMode::Static);
        engine.set_zone_color(1, "aabbcc").unwrap();
        engine.set_solo_mode(true);
        engine.select_zone(Some(1));

        let colors = engine.resolved_colors(ResolveTrigger::Manual);
        assert_eq!(colors[0], "000000");
        assert_eq!(colors[1], "aabbcc");
        assert_eq!(colors[2], "000000");
        assert_eq!(colors[3], "000000");
    }

    #[test]
    fn test_solo_mode_inactive_without_selection() {
        let mut engine = test_engine("solo_mode_inactive_without_selection");
        engine.set_solo_mode(true);
        engine.select_zone(None);

        let colors = engine.resolved_colors(ResolveTrigger::Manual);
        assert!(colors.iter().all(|c| c != "000000"));
    }

    #[test]
    fn test_solo_mode_never_masks_animation_resolves() {
        let mut engine = test_engine("solo_mode_never_masks_animation_resolves");
        engine.set_effect(EffectMode::Police);
        engine.set_solo_mode(true);
        engine.select_zone(Some(1));
        engine.sw_colors = ["ff0000", "ff0000", "0000ff", "0000ff"].map(String::from);

        let colors = engine.resolved_colors(ResolveTrigger::Animation);
        assert_eq!(colors, engine.sw_colors);
    }

    #[test]
    fn test_blink_off_phase_dims_selected_zone() {
        let mut engine = test_engine("blink_off_phase_dims_selected_zone");
        engine.set_zone_color(2, "64ff03").unwrap();
        engine.select_zone(Some(2));
        engine.blink_on = false;

        let colors = engine.resolved_colors(ResolveTrigger::Blink);
        // (100, 255, 3) scaled by 0.3 with integer truncation
        assert_eq!(colors[2], "1e4c00");
        // Other zones are unaffected by the blink phase
        assert_eq!(colors[0], engine.state.colors()[0]);
        assert_eq!(colors[1], engine.state.colors()[1]);
        assert_eq!(colors[3], engine.state.colors()[3]);
    }

    #[test]
    fn test_blink_opposite_pulse_inverts() {
        let mut engine = test_engine("blink_opposite_pulse_inverts");
        engine.set_zone_color(0, "ff0000").unwrap();
        engine.select_zone(Some(0));
        engine.set_blink_opposite(true);
        engine.blink_on = false;

        let colors = engine.resolved_colors(ResolveTrigger::Blink);
        assert_eq!(colors[0], "00ffff");
    }

    #[test]
    fn test_blink_on_phase_leaves_colors_alone() {
        let mut engine = test_engine("blink_on_phase_leaves_colors_alone");
        engine.set_zone_color(2, "64ff03").unwrap();
        engine.select_zone(Some(2));
        engine.blink_on = true;

        let colors = engine.resolved_colors(ResolveTrigger::Blink);
        assert_eq!(colors[2], "64ff03");
    }

    #[test]
    fn test_software_effect_transmits_as_static() {
        let mut engine = test_engine("software_effect_transmits_as_static");
        engine.set_effect(EffectMode::Police);

        let delay = engine.tick_animation();
        assert_eq!(delay, Duration::from_millis(350)); // Police at default speed 2

        let frame = engine.transport.frames.last().unwrap();
        assert_eq!(frame[2], 1); // Static on the wire
        assert_eq!(&frame[5..11], &[0xff, 0, 0, 0xff, 0, 0]);
        assert_eq!(&frame[11..17], &[0, 0, 0xff, 0, 0, 0xff]);
    }

    #[test]
    fn test_idle_animation_tick_transmits_nothing() {
        let mut engine = test_engine("idle_animation_tick_transmits_nothing");
        engine.set_effect(EffectMode::Breath);

        let delay = engine.tick_animation();
        assert_eq!(delay, Duration::from_millis(400)); // Generic table, speed 2
        assert!(engine.transport.frames.is_empty());
    }

    #[test]
    fn test_brightness_off_suppresses_transmission() {
        let mut engine = test_engine("brightness_off_suppresses_transmission");
        engine.set_brightness(Brightness::Off);
        engine.apply().unwrap();
        assert!(engine.transport.frames.is_empty());
    }

    #[test]
    fn test_blink_resolve_skipped_for_non_static_effects() {
        let mut engine = test_engine("blink_resolve_skipped_for_non_static_effects");
        engine.set_effect(EffectMode::Wave);
        engine.select_zone(Some(0));
        engine.blink_on = false;

        engine.resolve(ResolveTrigger::Blink).unwrap();
        assert!(engine.transport.frames.is_empty());
    }

    #[test]
    fn test_wave_direction_only_sent_for_wave() {
        let mut engine = test_engine("wave_direction_only_sent_for_wave");
        engine.set_effect(EffectMode::Wave);
        engine.set_wave_direction(WaveDirection::Rtl);
        engine.apply().unwrap();
        assert_eq!(&engine.transport.frames.last().unwrap()[18..20], &[1, 0]);

        engine.set_effect(EffectMode::Static);
        engine.apply().unwrap();
        assert_eq!(&engine.transport.frames.last().unwrap()[18..20], &[0, 0]);
    }

    #[test]
    fn test_persistence_locked_until_initialization_finishes() {
        let battery = FixedBattery(BatterySnapshot {
            percent: 50,
            status: BatteryStatus::Discharging,
        });
        let path = std::env::temp_dir().join(format!(
            "legion-engine-guard-{}.json",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);

        let mut engine = LightingEngine::new(
            SettingsDocument::default(),
            MockTransport::new(),
            Box::new(battery),
        )
        .with_config_path(path.clone());

        // Startup apply: frame goes out, nothing persisted
        engine.apply().unwrap();
        assert!(!path.exists());

        engine.finish_initialization();
        engine.set_speed(4);
        engine.apply().unwrap();
        assert!(path.exists());

        let doc = SettingsDocument::load(&path);
        assert_eq!(doc.profiles["Default"].speed, 4);
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_delete_current_profile_falls_back_to_default() {
        let mut engine = test_engine("delete_current_profile_falls_back_to_default");
        engine.set_speed(4);
        engine.save_profile("Gaming").unwrap();
        assert_eq!(engine.current_profile(), "Gaming");

        engine.delete_profile("Gaming").unwrap();
        assert_eq!(engine.current_profile(), "Default");
        assert!(!engine.list_profiles().contains(&"Gaming"));

        let _ = std::fs::remove_file(&engine.config_path);
    }

    #[test]
    fn test_document_round_trip_preserves_preferences() {
        let mut engine = test_engine("document_round_trip_preserves_preferences");
        engine.set_solo_mode(true);
        engine.set_battery_thresholds(BatteryThresholds {
            low: 10,
            green: 80,
            full: 90,
        });

        let doc = engine.to_document();
        assert!(doc.pref_solo_mode);
        assert_eq!(doc.pref_batt_low, 10);
        assert_eq!(doc.pref_batt_green, 80);
        assert_eq!(doc.pref_batt_full, 90);
        assert!(doc.profiles.contains_key("Default"));
    }
}
