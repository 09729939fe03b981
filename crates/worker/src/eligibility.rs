//! Resource gate deciding whether the device may start new work.

use std::fmt;

use edgeloop_core::{ConnectionStatus, ThermalLevel, WorkerConfig};

/// Everything the gate looks at, captured at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EligibilityInput {
    /// `None` when the battery level is unknown. Non-finite readings are
    /// treated as unknown too.
    pub battery_fraction: Option<f64>,
    pub thermal: ThermalLevel,
    pub connection: ConnectionStatus,
    /// Jobs currently claimed or executing (including reserved slots).
    pub in_flight: usize,
}

/// Why the gate said no. Not an error: the tick is simply skipped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Ineligibility {
    LowBattery { fraction: f64, minimum: f64 },
    TooHot { level: ThermalLevel, ceiling: ThermalLevel },
    NotConnected(ConnectionStatus),
    AtCapacity { in_flight: usize, max: usize },
}

impl fmt::Display for Ineligibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ineligibility::LowBattery { fraction, minimum } => {
                write!(f, "battery {:.0}% below {:.0}%", fraction * 100.0, minimum * 100.0)
            }
            Ineligibility::TooHot { level, ceiling } => {
                write!(f, "thermal level {level} at or above {ceiling}")
            }
            Ineligibility::NotConnected(status) => write!(f, "coordinator {status}"),
            Ineligibility::AtCapacity { in_flight, max } => {
                write!(f, "{in_flight} of {max} job slots in use")
            }
        }
    }
}

/// Pure predicate over [`EligibilityInput`]. All four conditions must hold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceEligibilityGate {
    pub minimum_battery_fraction: f64,
    /// Work is accepted only strictly below this level.
    pub thermal_ceiling: ThermalLevel,
    pub max_concurrent_jobs: usize,
}

impl Default for ResourceEligibilityGate {
    fn default() -> Self {
        Self::from_config(&WorkerConfig::default())
    }
}

impl ResourceEligibilityGate {
    pub fn from_config(config: &WorkerConfig) -> Self {
        Self {
            minimum_battery_fraction: config.minimum_battery_fraction,
            thermal_ceiling: config.maximum_thermal_level,
            max_concurrent_jobs: config.max_concurrent_jobs,
        }
    }

    pub fn check(&self, input: &EligibilityInput) -> Result<(), Ineligibility> {
        if let Some(fraction) = input.battery_fraction.filter(|f| f.is_finite()) {
            if fraction < self.minimum_battery_fraction {
                return Err(Ineligibility::LowBattery {
                    fraction,
                    minimum: self.minimum_battery_fraction,
                });
            }
        }
        if input.thermal >= self.thermal_ceiling {
            return Err(Ineligibility::TooHot {
                level: input.thermal,
                ceiling: self.thermal_ceiling,
            });
        }
        if input.connection != ConnectionStatus::Connected {
            return Err(Ineligibility::NotConnected(input.connection));
        }
        if input.in_flight >= self.max_concurrent_jobs {
            return Err(Ineligibility::AtCapacity {
                in_flight: input.in_flight,
                max: self.max_concurrent_jobs,
            });
        }
        Ok(())
    }

    pub fn is_eligible(&self, input: &EligibilityInput) -> bool {
        self.check(input).is_ok()
    }
}
