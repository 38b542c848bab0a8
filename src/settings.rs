/*!
 # Settings persistence

 The on-disk settings document: active theme, live-preview flag, current
 profile name, color history, selection-feedback preferences, battery
 thresholds and the full profile map, serialized as JSON under the user's
 config directory. Missing or corrupt files fall back to defaults; nothing
 here is fatal.
*/

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::profile::Profile;
use crate::Result;

/// Persisted application settings, field-compatible with the original
/// config.json written by earlier releases
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsDocument {
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default)]
    pub live_preview: bool,
    #[serde(default = "default_profile_name")]
    pub current_profile: String,
    #[serde(default = "default_history")]
    pub color_history: Vec<String>,
    #[serde(default)]
    pub pref_blink_opposite: bool,
    #[serde(default)]
    pub pref_solo_mode: bool,
    #[serde(default = "default_batt_low")]
    pub pref_batt_low: u8,
    #[serde(default = "default_batt_green")]
    pub pref_batt_green: u8,
    #[serde(default = "default_batt_full")]
    pub pref_batt_full: u8,
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

fn default_theme() -> String {
    "Miku".to_string()
}

fn default_profile_name() -> String {
    "Default".to_string()
}

fn default_history() -> Vec<String> {
    vec!["#333333".to_string(); 12]
}

fn default_batt_low() -> u8 {
    15
}

fn default_batt_green() -> u8 {
    75
}

fn default_batt_full() -> u8 {
    95
}

impl Default for SettingsDocument {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            live_preview: false,
            current_profile: default_profile_name(),
            color_history: default_history(),
            pref_blink_opposite: false,
            pref_solo_mode: false,
            pref_batt_low: default_batt_low(),
            pref_batt_green: default_batt_green(),
            pref_batt_full: default_batt_full(),
            profiles: BTreeMap::new(),
        }
    }
}

impl SettingsDocument {
    /// Default on-disk location of the settings document.
    ///
    /// When running via sudo, the real user's home is used so settings stay
    /// with the desktop session rather than root.
    pub fn default_path() -> PathBuf {
        let home = std::env::var("SUDO_USER")
            .ok()
            .map(|u| format!("/home/{u}"))
            .or_else(|| std::env::var("HOME").ok())
            .unwrap_or_else(|| "/tmp".into());
        PathBuf::from(home)
            .join(".config")
            .join("legion-led-controller")
            .join("config.json")
    }

    /// Loads the document, falling back to defaults when the file is
    /// missing or unreadable
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                warn!("Settings file {} is malformed: {}", path.display(), e);
                Self::default()
            }),
            Err(_) => {
                debug!("No settings at {}, using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Writes the document as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        debug!("Settings saved to {}", path.display());
        Ok(())
    }
}

/// Writes a single profile as `{name: profile}` for interchange
pub fn export_profile(path: &Path, name: &str, profile: &Profile) -> Result<()> {
    let mut map = BTreeMap::new();
    map.insert(name.to_string(), profile.clone());
    let json = serde_json::to_string_pretty(&map)?;
    fs::write(path, json)?;
    Ok(())
}

/// Reads an interchange file; profiles are keyed by the JSON object's own
/// names, not the file name
pub fn import_profiles(path: &Path) -> Result<BTreeMap<String, Profile>> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Brightness, EffectMode, WaveDirection};

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("legion-led-{tag}-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_defaults_match_original_document() {
        let doc = SettingsDocument::default();
        assert_eq!(doc.theme, "Miku");
        assert!(!doc.live_preview);
        assert_eq!(doc.current_profile, "Default");
        assert_eq!(doc.color_history, vec!["#333333"; 12]);
        assert!(!doc.pref_blink_opposite);
        assert!(!doc.pref_solo_mode);
        assert_eq!(doc.pref_batt_low, 15);
        assert_eq!(doc.pref_batt_green, 75);
        assert_eq!(doc.pref_batt_full, 95);
    }

    #[test]
    fn test_load_missing_file_yields_defaults() {
        let doc = SettingsDocument::load(Path::new("/nonexistent/legion/config.json"));
        assert_eq!(doc.theme, "Miku");
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = scratch_dir("roundtrip");
        let path = dir.join("config.json");

        let mut doc = SettingsDocument::default();
        doc.live_preview = true;
        doc.pref_batt_low = 20;
        doc.profiles.insert("Night".to_string(), Profile::default());
        doc.save(&path).unwrap();

        let loaded = SettingsDocument::load(&path);
        assert!(loaded.live_preview);
        assert_eq!(loaded.pref_batt_low, 20);
        assert!(loaded.profiles.contains_key("Night"));

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_partial_document_fills_defaults() {
        let doc: SettingsDocument = serde_json::from_str(r#"{"theme": "Teto"}"#).unwrap();
        assert_eq!(doc.theme, "Teto");
        assert_eq!(doc.pref_batt_green, 75);
        assert_eq!(doc.color_history.len(), 12);
    }

    #[test]
    fn test_profile_interchange_keyed_by_document_names() {
        let dir = scratch_dir("interchange");
        let path = dir.join("gaming.json");

        let profile = Profile {
            effect: EffectMode::Police,
            brightness: Brightness::High,
            speed: 4,
            wave_direction: WaveDirection::Ltr,
            colors: vec!["ff0000".into(); 4],
        };
        export_profile(&path, "Racing", &profile).unwrap();

        // Import is keyed by the object's own name, not the file name
        let imported = import_profiles(&path).unwrap();
        assert_eq!(imported.len(), 1);
        assert_eq!(imported["Racing"], profile);

        fs::remove_dir_all(dir).unwrap();
    }
}
