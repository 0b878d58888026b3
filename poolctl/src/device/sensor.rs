/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Temperature sensors.
//!
//! DS18B20 probes on the 1-Wire bus expose a `w1_slave` file per device:
//!
//! ```text
//! 72 01 4b 46 7f ff 0e 10 57 : crc=57 YES
//! 72 01 4b 46 7f ff 0e 10 57 t=23125
//! ```
//!
//! The first line must end in `YES` (CRC ok); `t=` carries millidegrees.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Latest reading per probe.  `None` means absent or unreadable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Temperatures {
    pub water: Option<f32>,
    pub cabin: Option<f32>,
    pub barrel: Option<f32>,
}

pub trait SensorSource: Send {
    fn poll_temperatures(&mut self) -> Temperatures;
}

/// Used when no 1-Wire bus is present.
#[derive(Debug, Default)]
pub struct NoSensors;

impl SensorSource for NoSensors {
    fn poll_temperatures(&mut self) -> Temperatures {
        Temperatures::default()
    }
}

/// Configured 1-Wire device ids; an empty string means "discover".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensorIds {
    pub water: String,
    pub cabin: String,
    pub barrel: String,
}

pub struct OneWireSensors {
    root: PathBuf,
    water: Option<String>,
    cabin: Option<String>,
    barrel: Option<String>,
}

impl OneWireSensors {
    /// Resolve probe ids under `root`.
    ///
    /// Ids left empty are filled from the DS18B20 devices (`28-*`) found on
    /// the bus, in sorted order: water, barrel, cabin.
    pub fn new(root: &Path, ids: &SensorIds) -> Self {
        let mut discovered = discover(root).into_iter();
        let mut pick = |configured: &str| {
            if configured.is_empty() {
                discovered.next()
            } else {
                Some(configured.to_string())
            }
        };
        let water = pick(ids.water.as_str());
        let barrel = pick(ids.barrel.as_str());
        let cabin = pick(ids.cabin.as_str());

        debug!(?water, ?cabin, ?barrel, "1-Wire probes resolved");
        Self {
            root: root.to_path_buf(),
            water,
            cabin,
            barrel,
        }
    }

    fn read_probe(&self, id: Option<&str>) -> Option<f32> {
        let id = id?;
        let path = self.root.join(id).join("w1_slave");
        match fs::read_to_string(&path) {
            Ok(raw) => {
                let celsius = parse_w1_slave(&raw);
                if celsius.is_none() {
                    warn!(probe = id, "Unusable 1-Wire reading");
                }
                celsius
            }
            Err(e) => {
                warn!(probe = id, "Failed to read {}: {e}", path.display());
                None
            }
        }
    }
}

impl SensorSource for OneWireSensors {
    fn poll_temperatures(&mut self) -> Temperatures {
        Temperatures {
            water: self.read_probe(self.water.as_deref()),
            cabin: self.read_probe(self.cabin.as_deref()),
            barrel: self.read_probe(self.barrel.as_deref()),
        }
    }
}

fn discover(root: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(root) else {
        return Vec::new();
    };
    let mut ids: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().into_string().ok())
        .filter(|name| name.starts_with("28-"))
        .collect();
    ids.sort();
    ids
}

/// Parse DS18B20 `w1_slave` contents into degrees Celsius.
pub fn parse_w1_slave(raw: &str) -> Option<f32> {
    let mut lines = raw.lines();
    if !lines.next()?.trim_end().ends_with("YES") {
        return None;
    }
    let (_, milli) = lines.next()?.split_once("t=")?;
    let milli: i32 = milli.trim().parse().ok()?;
    Some(milli as f32 / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const GOOD: &str = "72 01 4b 46 7f ff 0e 10 57 : crc=57 YES\n\
                        72 01 4b 46 7f ff 0e 10 57 t=23125\n";

    fn probe(root: &Path, id: &str, contents: &str) {
        fs::create_dir_all(root.join(id)).unwrap();
        fs::write(root.join(id).join("w1_slave"), contents).unwrap();
    }

    #[test]
    fn parse_good_reading() {
        assert_eq!(parse_w1_slave(GOOD), Some(23.125));
    }

    #[test]
    fn parse_crc_failure() {
        let raw = "72 01 4b 46 7f ff 0e 10 57 : crc=57 NO\n72 01 t=23125\n";
        assert_eq!(parse_w1_slave(raw), None);
    }

    #[test]
    fn parse_negative() {
        let raw = "aa : crc=aa YES\naa t=-1500\n";
        assert_eq!(parse_w1_slave(raw), Some(-1.5));
    }

    #[test]
    fn discovered_probes_assigned_in_order() {
        let dir = TempDir::new().unwrap();
        probe(dir.path(), "28-000000000001", GOOD);
        probe(dir.path(), "28-000000000002", "x : crc=00 YES\nx t=30000\n");
        fs::create_dir(dir.path().join("w1_bus_master1")).unwrap();

        let mut sensors = OneWireSensors::new(dir.path(), &SensorIds::default());
        let t = sensors.poll_temperatures();
        assert_eq!(t.water, Some(23.125));
        assert_eq!(t.barrel, Some(30.0));
        assert_eq!(t.cabin, None);
    }

    #[test]
    fn configured_id_wins() {
        let dir = TempDir::new().unwrap();
        probe(dir.path(), "28-aaaa", GOOD);
        let ids = SensorIds {
            cabin: "28-aaaa".into(),
            ..SensorIds::default()
        };
        let mut sensors = OneWireSensors::new(dir.path(), &ids);
        let t = sensors.poll_temperatures();
        assert_eq!(t.cabin, Some(23.125));
        // water was discovered too and points at the same probe
        assert_eq!(t.water, Some(23.125));
    }

    #[test]
    fn no_sensors_reads_nothing() {
        assert_eq!(NoSensors.poll_temperatures(), Temperatures::default());
    }
}
