use std::path::PathBuf;

use anyhow::Context as _;

pub const THERMAL_ZONE_PATH: &str = "/sys/class/thermal/thermal_zone0/temp";

/// A Linux thermal zone, e.g. the SoC temperature of a Raspberry Pi.
#[derive(Debug)]
pub struct ThermalZone {
    path: PathBuf,
}

impl ThermalZone {
    pub fn new(path: impl Into<PathBuf>) -> ThermalZone {
        ThermalZone { path: path.into() }
    }

    /// Temperature in degrees Celsius.
    pub fn read_celsius(&self) -> Result<f32, anyhow::Error> {
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;

        parse_millidegrees(&raw)
    }
}

impl Default for ThermalZone {
    fn default() -> Self {
        ThermalZone::new(THERMAL_ZONE_PATH)
    }
}

pub fn parse_millidegrees(raw: &str) -> Result<f32, anyhow::Error> {
    let millidegrees: i32 = raw
        .trim()
        .parse()
        .with_context(|| format!("Invalid thermal zone value: {raw:?}"))?;

    Ok(millidegrees as f32 / 1000.0)
}
