//! Device configuration snapshot and supervisor tuning.

use core::fmt;

use crate::backoff::{DEFAULT_CONNECT_RETRIES, MAX_CONNECT_RETRIES};

/// Sources the device may skip when sampling location data.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct NoDataFlags {
    pub gnss: bool,
    pub neighbor_cell: bool,
}

/// Last known device configuration.
///
/// The supervisor only caches and forwards this value; field meaning belongs
/// to the application and the cloud codec.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DeviceConfig {
    pub active_mode: bool,
    pub location_timeout: u32,
    pub active_wait_timeout: u32,
    pub movement_resolution: u32,
    pub movement_timeout: u32,
    pub accelerometer_threshold: u32,
    pub no_data: NoDataFlags,
}

impl DeviceConfig {
    /// Configuration used before anything has been received.
    pub const fn new() -> Self {
        Self {
            active_mode: true,
            location_timeout: 60,
            active_wait_timeout: 120,
            movement_resolution: 120,
            movement_timeout: 3_600,
            accelerometer_threshold: 10,
            no_data: NoDataFlags {
                gnss: false,
                neighbor_cell: false,
            },
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Runtime tuning for the supervisor.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SupervisorConfig {
    /// Connect attempts allowed before the cloud is reported unreachable.
    pub connect_retries: u8,
    /// Route received assistance data through the A-GPS processor.
    pub agps: bool,
    /// Route received assistance data through the P-GPS processor and run the
    /// predictive service.
    pub pgps: bool,
}

impl SupervisorConfig {
    pub const fn new() -> Self {
        Self {
            connect_retries: DEFAULT_CONNECT_RETRIES,
            agps: true,
            pgps: true,
        }
    }

    /// Overrides the retry ceiling.
    #[must_use]
    pub const fn with_connect_retries(mut self, connect_retries: u8) -> Self {
        self.connect_retries = connect_retries;
        self
    }

    /// Enables or disables the assistance processors.
    #[must_use]
    pub const fn with_assistance(mut self, agps: bool, pgps: bool) -> Self {
        self.agps = agps;
        self.pgps = pgps;
        self
    }

    /// Checks the configuration against the backoff table.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connect_retries > MAX_CONNECT_RETRIES {
            return Err(ConfigError::RetryCeilingTooLarge {
                requested: self.connect_retries,
                max: MAX_CONNECT_RETRIES,
            });
        }
        Ok(())
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Rejected supervisor configuration.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConfigError {
    RetryCeilingTooLarge { requested: u8, max: u8 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::RetryCeilingTooLarge { requested, max } => {
                write!(f, "connect retries {requested} exceeds backoff table (max {max})")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(SupervisorConfig::default().validate(), Ok(()));
    }

    #[test]
    fn oversized_ceiling_is_rejected() {
        let config = SupervisorConfig::new().with_connect_retries(14);
        assert_eq!(
            config.validate(),
            Err(ConfigError::RetryCeilingTooLarge {
                requested: 14,
                max: 13
            })
        );
        assert!(SupervisorConfig::new().with_connect_retries(13).validate().is_ok());
    }
}
