//! Where the worker reads battery, thermal and network state from.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::debug;

use edgeloop_core::{DeviceTelemetry, ThermalLevel};

/// Live device readings. Implementations must be cheap; the worker calls
/// `current()` on every tick.
pub trait TelemetrySource: Send + Sync {
    fn current(&self) -> DeviceTelemetry;
}

/// Telemetry set from outside, e.g. by a host app or a test.
#[derive(Debug, Default)]
pub struct StaticTelemetry {
    reading: RwLock<DeviceTelemetry>,
}

impl StaticTelemetry {
    pub fn new(reading: DeviceTelemetry) -> Self {
        Self {
            reading: RwLock::new(reading),
        }
    }

    pub fn set(&self, reading: DeviceTelemetry) {
        *self.reading.write().unwrap_or_else(|e| e.into_inner()) = reading;
    }

    pub fn update(&self, f: impl FnOnce(&mut DeviceTelemetry)) {
        let mut reading = self.reading.write().unwrap_or_else(|e| e.into_inner());
        f(&mut *reading);
    }
}

impl TelemetrySource for StaticTelemetry {
    fn current(&self) -> DeviceTelemetry {
        *self.reading.read().unwrap_or_else(|e| e.into_inner())
    }
}

/// Linux sysfs reader.
///
/// Battery comes from the first `power_supply/*/capacity` whose `type` is
/// `Battery`; temperature from `thermal/thermal_zone0/temp` (millidegrees).
/// Total memory for the capability descriptor comes from `MemTotal` in
/// `/proc/meminfo`.
/// Missing files mean "unknown battery" and "nominal" respectively. Network
/// reachability is not visible here and always reads as up; coordinator
/// failures surface through the worker's own connection status.
#[derive(Debug, Clone)]
pub struct SysfsTelemetry {
    power_supply_dir: PathBuf,
    thermal_zone: PathBuf,
    meminfo: PathBuf,
}

impl Default for SysfsTelemetry {
    fn default() -> Self {
        Self::with_root("/sys/class")
    }
}

impl SysfsTelemetry {
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            power_supply_dir: root.join("power_supply"),
            thermal_zone: root.join("thermal").join("thermal_zone0"),
            meminfo: PathBuf::from("/proc/meminfo"),
        }
    }

    pub fn with_meminfo(mut self, path: impl Into<PathBuf>) -> Self {
        self.meminfo = path.into();
        self
    }

    /// Physical memory in MiB, `None` when meminfo is unreadable.
    pub fn total_memory_mb(&self) -> Option<u64> {
        let data = std::fs::read_to_string(&self.meminfo).ok()?;
        data.lines()
            .find_map(|line| line.strip_prefix("MemTotal:"))
            .and_then(|rest| rest.split_whitespace().next())
            .and_then(|kib| kib.parse::<u64>().ok())
            .map(|kib| kib / 1024)
    }

    fn battery_fraction(&self) -> Option<f64> {
        let entries = std::fs::read_dir(&self.power_supply_dir).ok()?;
        for entry in entries.flatten() {
            let dir = entry.path();
            let kind = read_trimmed(&dir.join("type"));
            if kind.as_deref() != Some("Battery") {
                continue;
            }
            if let Some(percent) = read_trimmed(&dir.join("capacity")).and_then(|s| s.parse::<f64>().ok()) {
                return Some((percent / 100.0).clamp(0.0, 1.0));
            }
        }
        None
    }

    fn thermal_level(&self) -> ThermalLevel {
        read_trimmed(&self.thermal_zone.join("temp"))
            .and_then(|s| s.parse::<f64>().ok())
            .map(|millis| ThermalLevel::from_celsius(millis / 1000.0))
            .unwrap_or(ThermalLevel::Nominal)
    }
}

impl TelemetrySource for SysfsTelemetry {
    fn current(&self) -> DeviceTelemetry {
        let reading = DeviceTelemetry {
            battery_fraction: self.battery_fraction(),
            thermal: self.thermal_level(),
            network_reachable: true,
        };
        debug!(battery = ?reading.battery_fraction, thermal = %reading.thermal, "sysfs telemetry");
        reading
    }
}

fn read_trimmed(path: &Path) -> Option<String> {
    std::fs::read_to_string(path).ok().map(|s| s.trim().to_string())
}
