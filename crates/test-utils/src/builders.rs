#![allow(dead_code)]

use calcdag::config::{ConfigFile, RawConfigFile};
use calcdag::engine::DispatchSettings;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_bind(mut self, addr: &str) -> Self {
        self.config.orchestrator.bind = addr.to_string();
        self
    }

    pub fn with_lease_duration(mut self, duration: &str) -> Self {
        self.config.orchestrator.lease_duration = duration.to_string();
        self
    }

    pub fn with_lease_multiplier(mut self, multiplier: u32) -> Self {
        self.config.orchestrator.lease_multiplier = multiplier;
        self
    }

    pub fn with_sweep_interval(mut self, interval: &str) -> Self {
        self.config.orchestrator.sweep_interval = interval.to_string();
        self
    }

    /// Same simulated cost for every operator.
    pub fn with_operation_time(mut self, duration: &str) -> Self {
        let ops = &mut self.config.operations;
        ops.addition = duration.to_string();
        ops.subtraction = duration.to_string();
        ops.multiplication = duration.to_string();
        ops.division = duration.to_string();
        self
    }

    pub fn with_computing_power(mut self, workers: usize) -> Self {
        self.config.agent.computing_power = workers;
        self
    }

    pub fn with_poll_interval(mut self, interval: &str) -> Self {
        self.config.agent.poll_interval = interval.to_string();
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }

    /// Shorthand for `DispatchSettings::from_config(&self.build())`.
    pub fn dispatch_settings(self) -> DispatchSettings {
        DispatchSettings::from_config(&self.build())
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
