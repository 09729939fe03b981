use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseThermalLevelError;

/// Device thermal pressure, ordered from coolest to hottest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThermalLevel {
    Nominal,
    Fair,
    Serious,
    Critical,
}

impl ThermalLevel {
    pub const ALL: [ThermalLevel; 4] = [
        ThermalLevel::Nominal,
        ThermalLevel::Fair,
        ThermalLevel::Serious,
        ThermalLevel::Critical,
    ];

    /// Map a die/zone temperature onto a thermal level.
    pub fn from_celsius(celsius: f64) -> Self {
        if celsius < 60.0 {
            ThermalLevel::Nominal
        } else if celsius < 75.0 {
            ThermalLevel::Fair
        } else if celsius < 90.0 {
            ThermalLevel::Serious
        } else {
            ThermalLevel::Critical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ThermalLevel::Nominal => "nominal",
            ThermalLevel::Fair => "fair",
            ThermalLevel::Serious => "serious",
            ThermalLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for ThermalLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThermalLevel {
    type Err = ParseThermalLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        ThermalLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == normalized)
            .ok_or_else(|| ParseThermalLevelError(s.to_string()))
    }
}

/// Worker connectivity to the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// The last registration attempt failed.
    Error,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Point-in-time reading of the host device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceTelemetry {
    /// Battery charge in 0.0..=1.0, `None` when unknown (or no battery).
    pub battery_fraction: Option<f64>,
    pub thermal: ThermalLevel,
    /// Whether the OS reports a usable network path.
    pub network_reachable: bool,
}

impl DeviceTelemetry {
    /// Unknown battery, nominal thermals, network up.
    pub fn nominal() -> Self {
        Self {
            battery_fraction: None,
            thermal: ThermalLevel::Nominal,
            network_reachable: true,
        }
    }

    pub fn with_battery(mut self, fraction: f64) -> Self {
        self.battery_fraction = Some(fraction);
        self
    }

    pub fn with_thermal(mut self, thermal: ThermalLevel) -> Self {
        self.thermal = thermal;
        self
    }

    pub fn with_network(mut self, reachable: bool) -> Self {
        self.network_reachable = reachable;
        self
    }
}

impl Default for DeviceTelemetry {
    fn default() -> Self {
        Self::nominal()
    }
}
