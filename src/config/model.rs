// src/config/model.rs

use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;

use crate::compiler::Operator;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [orchestrator]
/// bind = "127.0.0.1:8080"
/// lease_duration = "5s"
/// lease_multiplier = 3
/// sweep_interval = "500ms"
///
/// [operations]
/// addition = "1s"
/// division = "2s"
///
/// [agent]
/// orchestrator_url = "http://127.0.0.1:8080"
/// computing_power = 4
/// poll_interval = "1s"
/// ```
///
/// All sections are optional and have reasonable defaults. Durations are
/// strings with a unit suffix (`ms`, `s`, `m`, `h`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub orchestrator: RawOrchestratorSection,

    #[serde(default)]
    pub operations: RawOperationsSection,

    #[serde(default)]
    pub agent: RawAgentSection,
}

/// `[orchestrator]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RawOrchestratorSection {
    /// Address the HTTP API listens on.
    pub bind: String,

    /// Minimum lease granted to a worker for one task.
    pub lease_duration: String,

    /// A lease lasts at least `operation_time * lease_multiplier`, to absorb
    /// scheduling jitter on the worker side.
    pub lease_multiplier: u32,

    /// Period of the background loop that re-queues expired leases.
    pub sweep_interval: String,
}

impl Default for RawOrchestratorSection {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            lease_duration: "5s".to_string(),
            lease_multiplier: 3,
            sweep_interval: "500ms".to_string(),
        }
    }
}

/// `[operations]` section: simulated cost of each operator.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RawOperationsSection {
    pub addition: String,
    pub subtraction: String,
    pub multiplication: String,
    pub division: String,
}

impl Default for RawOperationsSection {
    fn default() -> Self {
        Self {
            addition: "1000ms".to_string(),
            subtraction: "1000ms".to_string(),
            multiplication: "1000ms".to_string(),
            division: "1000ms".to_string(),
        }
    }
}

/// `[agent]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RawAgentSection {
    /// Base URL of the orchestrator's HTTP API.
    pub orchestrator_url: String,

    /// Number of concurrent workers in one agent process.
    pub computing_power: usize,

    /// How long a worker waits before polling again after an empty queue or
    /// a transport error.
    pub poll_interval: String,
}

impl Default for RawAgentSection {
    fn default() -> Self {
        Self {
            orchestrator_url: "http://127.0.0.1:8080".to_string(),
            computing_power: 1,
            poll_interval: "1s".to_string(),
        }
    }
}

/// Validated configuration. Build it from a [`RawConfigFile`] with
/// `ConfigFile::try_from`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub orchestrator: OrchestratorConfig,
    pub operations: OperationTimes,
    pub agent: AgentConfig,
}

impl ConfigFile {
    /// Assemble a config from already-validated parts.
    pub(crate) fn new_unchecked(
        orchestrator: OrchestratorConfig,
        operations: OperationTimes,
        agent: AgentConfig,
    ) -> Self {
        Self {
            orchestrator,
            operations,
            agent,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub bind: SocketAddr,
    pub lease_duration: Duration,
    pub lease_multiplier: u32,
    pub sweep_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub orchestrator_url: String,
    pub computing_power: usize,
    pub poll_interval: Duration,
}

/// Simulated execution time per operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationTimes {
    pub addition: Duration,
    pub subtraction: Duration,
    pub multiplication: Duration,
    pub division: Duration,
}

impl OperationTimes {
    /// Every operator costs the same `time`.
    pub fn uniform(time: Duration) -> Self {
        Self {
            addition: time,
            subtraction: time,
            multiplication: time,
            division: time,
        }
    }

    pub fn for_operator(&self, op: Operator) -> Duration {
        match op {
            Operator::Add => self.addition,
            Operator::Subtract => self.subtraction,
            Operator::Multiply => self.multiplication,
            Operator::Divide => self.division,
        }
    }
}

impl Default for OperationTimes {
    fn default() -> Self {
        Self::uniform(Duration::from_millis(1000))
    }
}

/// Parse a duration string like `"500ms"`, `"3s"`, `"2m"` or `"1h"`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| format!("duration '{s}' is missing a unit suffix"))?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{num_part}': {e}"))?;

    let secs_per_unit = match unit_part.trim().to_lowercase().as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        unit => {
            return Err(format!(
                "unsupported duration unit '{unit}'; expected ms, s, m, or h"
            ));
        }
    };

    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{s}' is too large"))
}
