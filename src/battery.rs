/*!
 # Battery snapshot collaborator

 The Battery software effect renders the charge level onto the zones; this
 module supplies the snapshot it pulls on demand. The sysfs reader is
 deliberately forgiving: a laptop without the expected nodes just reports
 an unknown, empty battery.
*/

use std::fs;
use std::path::PathBuf;

/// Charging state as reported by the kernel power_supply class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatteryStatus {
    Charging,
    Discharging,
    Unknown,
}

impl BatteryStatus {
    fn from_sysfs(value: &str) -> Self {
        match value {
            "Charging" => Self::Charging,
            "Discharging" => Self::Discharging,
            _ => Self::Unknown,
        }
    }
}

/// Point-in-time battery reading
#[derive(Debug, Clone, Copy)]
pub struct BatterySnapshot {
    /// Charge percentage, 0-100
    pub percent: u8,
    pub status: BatteryStatus,
}

impl Default for BatterySnapshot {
    fn default() -> Self {
        Self {
            percent: 0,
            status: BatteryStatus::Unknown,
        }
    }
}

/// Source of battery snapshots (sysfs on real systems, fixed in tests)
pub trait BatteryProbe {
    fn snapshot(&self) -> BatterySnapshot;
}

/// Reads `capacity` and `status` from the kernel power_supply directory
pub struct SysfsBattery {
    base: PathBuf,
}

impl SysfsBattery {
    /// Probe for the primary battery at `/sys/class/power_supply/BAT0`
    pub fn new() -> Self {
        Self::at("/sys/class/power_supply/BAT0")
    }

    /// Probe rooted at an arbitrary directory
    pub fn at(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    fn read(&self, name: &str) -> Option<String> {
        fs::read_to_string(self.base.join(name))
            .ok()
            .map(|s| s.trim().to_string())
    }
}

impl Default for SysfsBattery {
    fn default() -> Self {
        Self::new()
    }
}

impl BatteryProbe for SysfsBattery {
    fn snapshot(&self) -> BatterySnapshot {
        let percent = self
            .read("capacity")
            .and_then(|s| s.parse::<u8>().ok())
            .map(|p| p.min(100))
            .unwrap_or(0);
        let status = self
            .read("status")
            .map(|s| BatteryStatus::from_sysfs(&s))
            .unwrap_or(BatteryStatus::Unknown);

        BatterySnapshot { percent, status }
    }
}

/// Probe returning a fixed snapshot, for tests and previews
#[derive(Debug, Clone, Copy)]
pub struct FixedBattery(pub BatterySnapshot);

impl BatteryProbe for FixedBattery {
    fn snapshot(&self) -> BatterySnapshot {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("legion-bat-{tag}-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_sysfs_snapshot() {
        let dir = scratch_dir("read");
        fs::write(dir.join("capacity"), "87\n").unwrap();
        fs::write(dir.join("status"), "Charging\n").unwrap();

        let probe = SysfsBattery::at(&dir);
        let snapshot = probe.snapshot();
        assert_eq!(snapshot.percent, 87);
        assert_eq!(snapshot.status, BatteryStatus::Charging);

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_missing_nodes_report_unknown() {
        let probe = SysfsBattery::at("/nonexistent/power_supply/BAT9");
        let snapshot = probe.snapshot();
        assert_eq!(snapshot.percent, 0);
        assert_eq!(snapshot.status, BatteryStatus::Unknown);
    }

    #[test]
    fn test_capacity_clamped_to_100() {
        let dir = scratch_dir("clamp");
        fs::write(dir.join("capacity"), "120").unwrap();
        fs::write(dir.join("status"), "Full").unwrap();

        let probe = SysfsBattery::at(&dir);
        let snapshot = probe.snapshot();
        assert_eq!(snapshot.percent, 100);
        assert_eq!(snapshot.status, BatteryStatus::Unknown);

        fs::remove_dir_all(dir).unwrap();
    }
}
