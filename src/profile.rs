/*!
 # Named lighting profiles

 A profile is an immutable snapshot of the persistable lighting settings.
 The store keeps a name-to-profile map with a protected "Default" entry
 that always exists and can never be deleted. Persistence is the caller's
 concern; the store itself is pure in-memory state.
*/

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::frame::{Brightness, EffectMode, WaveDirection};
use crate::state::DEFAULT_COLOR;
use crate::{Error, Result};

/// Name of the protected built-in profile
pub const DEFAULT_PROFILE: &str = "Default";

/// Snapshot of the persistable lighting settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub effect: EffectMode,
    pub brightness: Brightness,
    pub speed: u8,
    pub wave_direction: WaveDirection,
    /// Zone colors as 6-digit hex, zone 0 first
    pub colors: Vec<String>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            effect: EffectMode::Static,
            brightness: Brightness::Low,
            speed: 2,
            wave_direction: WaveDirection::Ltr,
            colors: vec![DEFAULT_COLOR.to_string(); 4],
        }
    }
}

/// In-memory mapping of profile names to snapshots
#[derive(Debug, Clone, Default)]
pub struct ProfileStore {
    profiles: BTreeMap<String, Profile>,
}

impl ProfileStore {
    /// Builds a store from persisted entries, guaranteeing "Default" exists
    pub fn from_map(profiles: BTreeMap<String, Profile>) -> Self {
        let mut store = Self { profiles };
        store.ensure_default();
        store
    }

    /// Inserts the "Default" profile if it is missing
    pub fn ensure_default(&mut self) {
        self.profiles
            .entry(DEFAULT_PROFILE.to_string())
            .or_default();
    }

    /// Saves a snapshot under the given name, replacing any previous one
    pub fn save(&mut self, name: &str, profile: Profile) {
        debug!("Saving profile '{}'", name);
        self.profiles.insert(name.to_string(), profile);
    }

    /// Loads a profile by name, falling back to "Default", then to a fresh
    /// default snapshot if even that is missing
    pub fn load(&self, name: &str) -> Profile {
        if let Some(profile) = self.profiles.get(name) {
            return profile.clone();
        }
        debug!("Profile '{}' not found, falling back to Default", name);
        self.profiles
            .get(DEFAULT_PROFILE)
            .cloned()
            .unwrap_or_default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.profiles.contains_key(name)
    }

    /// Deletes a profile. Refuses to delete "Default".
    pub fn delete(&mut self, name: &str) -> Result<()> {
        if name == DEFAULT_PROFILE {
            return Err(Error::DefaultProfileProtected);
        }
        self.profiles.remove(name);
        Ok(())
    }

    /// Profile names in stable (sorted) order
    pub fn list(&self) -> Vec<&str> {
        self.profiles.keys().map(String::as_str).collect()
    }

    /// Merges imported profiles into the store, keyed by their own names
    pub fn merge(&mut self, imported: BTreeMap<String, Profile>) {
        for (name, profile) in imported {
            debug!("Importing profile '{}'", name);
            self.profiles.insert(name, profile);
        }
    }

    pub fn as_map(&self) -> &BTreeMap<String, Profile> {
        &self.profiles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_load_round_trip() {
        let mut store = ProfileStore::from_map(BTreeMap::new());
        let profile = Profile {
            effect: EffectMode::Wave,
            brightness: Brightness::High,
            speed: 4,
            wave_direction: WaveDirection::Rtl,
            colors: vec!["ff0000".into(), "00ff00".into(), "0000ff".into(), "ffffff".into()],
        };
        store.save("Gaming", profile.clone());
        assert_eq!(store.load("Gaming"), profile);
    }

    #[test]
    fn test_unknown_load_falls_back_to_default() {
        let mut store = ProfileStore::from_map(BTreeMap::new());
        let mut default = Profile::default();
        default.speed = 3;
        store.save(DEFAULT_PROFILE, default.clone());

        assert_eq!(store.load("does-not-exist"), default);
    }

    #[test]
    fn test_delete_default_refused() {
        let mut store = ProfileStore::from_map(BTreeMap::new());
        assert!(matches!(
            store.delete(DEFAULT_PROFILE),
            Err(Error::DefaultProfileProtected)
        ));
        assert!(store.contains(DEFAULT_PROFILE));
    }

    #[test]
    fn test_delete_removes_profile() {
        let mut store = ProfileStore::from_map(BTreeMap::new());
        store.save("Temp", Profile::default());
        store.delete("Temp").unwrap();
        assert!(!store.contains("Temp"));
    }

    #[test]
    fn test_merge_keyed_by_imported_names() {
        let mut store = ProfileStore::from_map(BTreeMap::new());
        let mut imported = BTreeMap::new();
        imported.insert("Movie".to_string(), Profile::default());
        imported.insert("Work".to_string(), Profile::default());
        store.merge(imported);

        assert_eq!(store.list(), vec!["Default", "Movie", "Work"]);
    }

    #[test]
    fn test_profile_serde_names_match_original_document() {
        let profile = Profile {
            effect: EffectMode::SoftWave,
            brightness: Brightness::Low,
            speed: 2,
            wave_direction: WaveDirection::Ltr,
            colors: vec!["39c5bb".into(); 4],
        };
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["effect"], "Soft Wave");
        assert_eq!(json["brightness"], "Low");
        assert_eq!(json["wave_direction"], "LTR");

        let hardware: Profile = serde_json::from_value(serde_json::json!({
            "effect": "static",
            "brightness": "High",
            "speed": 1,
            "wave_direction": "RTL",
            "colors": ["ff0000", "00ff00", "0000ff", "ffffff"],
        }))
        .unwrap();
        assert_eq!(hardware.effect, EffectMode::Static);
        assert_eq!(hardware.wave_direction, WaveDirection::Rtl);
    }
}
