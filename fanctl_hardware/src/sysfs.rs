use crate::error::{HwError, Result};
use crate::millicelsius_to_raw;
use fanctl_traits::{HwResult, TemperatureSensor};
use std::path::{Path, PathBuf};

/// Default thermal zone on most single-board Linux systems.
pub const DEFAULT_ZONE: &str = "/sys/class/thermal/thermal_zone0/temp";

/// Temperature sensor backed by a Linux thermal-zone file.
///
/// The kernel reports millidegrees Celsius as a decimal integer; every
/// `read` re-reads the file, which is the single-shot conversion.
#[derive(Debug, Clone)]
pub struct SysfsThermalSensor {
    path: PathBuf,
}

impl SysfsThermalSensor {
    /// Opens `path` once to make sure it is readable and well formed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let sensor = Self {
            path: path.as_ref().to_path_buf(),
        };
        let raw = sensor.read_raw()?;
        tracing::debug!(path = %sensor.path.display(), raw, "thermal zone opened");
        Ok(sensor)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_raw(&self) -> Result<u16> {
        let text = std::fs::read_to_string(&self.path)?;
        let milli: i64 = text
            .trim()
            .parse()
            .map_err(|_| HwError::Parse(format!("{}: {:?}", self.path.display(), text.trim())))?;
        Ok(millicelsius_to_raw(milli))
    }
}

impl TemperatureSensor for SysfsThermalSensor {
    fn read(&mut self) -> HwResult<u16> {
        let raw = self.read_raw()?;
        tracing::trace!(raw, "thermal zone sample");
        Ok(raw)
    }
}
