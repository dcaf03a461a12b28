// src/config/validate.rs

use std::net::SocketAddr;
use std::time::Duration;

use crate::config::model::{
    parse_duration, AgentConfig, ConfigFile, OperationTimes, OrchestratorConfig, RawConfigFile,
};
use crate::errors::{CalcdagError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = CalcdagError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let orchestrator = validate_orchestrator(&raw)?;
        let operations = validate_operations(&raw)?;
        let agent = validate_agent(&raw)?;
        Ok(ConfigFile::new_unchecked(orchestrator, operations, agent))
    }
}

fn validate_orchestrator(cfg: &RawConfigFile) -> Result<OrchestratorConfig> {
    let section = &cfg.orchestrator;

    let bind: SocketAddr = section.bind.parse().map_err(|e| {
        CalcdagError::ConfigError(format!(
            "[orchestrator].bind '{}' is not a socket address: {e}",
            section.bind
        ))
    })?;

    if section.lease_multiplier == 0 {
        return Err(CalcdagError::ConfigError(
            "[orchestrator].lease_multiplier must be >= 1 (got 0)".to_string(),
        ));
    }

    Ok(OrchestratorConfig {
        bind,
        lease_duration: positive_duration("orchestrator", "lease_duration", &section.lease_duration)?,
        lease_multiplier: section.lease_multiplier,
        sweep_interval: positive_duration("orchestrator", "sweep_interval", &section.sweep_interval)?,
    })
}

fn validate_operations(cfg: &RawConfigFile) -> Result<OperationTimes> {
    let section = &cfg.operations;
    Ok(OperationTimes {
        addition: duration("operations", "addition", &section.addition)?,
        subtraction: duration("operations", "subtraction", &section.subtraction)?,
        multiplication: duration("operations", "multiplication", &section.multiplication)?,
        division: duration("operations", "division", &section.division)?,
    })
}

fn validate_agent(cfg: &RawConfigFile) -> Result<AgentConfig> {
    let section = &cfg.agent;

    if section.computing_power == 0 {
        return Err(CalcdagError::ConfigError(
            "[agent].computing_power must be >= 1 (got 0)".to_string(),
        ));
    }

    if section.orchestrator_url.trim().is_empty() {
        return Err(CalcdagError::ConfigError(
            "[agent].orchestrator_url must not be empty".to_string(),
        ));
    }

    Ok(AgentConfig {
        orchestrator_url: section.orchestrator_url.trim_end_matches('/').to_string(),
        computing_power: section.computing_power,
        poll_interval: positive_duration("agent", "poll_interval", &section.poll_interval)?,
    })
}

fn duration(section: &str, key: &str, value: &str) -> Result<Duration> {
    parse_duration(value)
        .map_err(|e| CalcdagError::ConfigError(format!("[{section}].{key}: {e}")))
}

fn positive_duration(section: &str, key: &str, value: &str) -> Result<Duration> {
    let parsed = duration(section, key, value)?;
    if parsed.is_zero() {
        return Err(CalcdagError::ConfigError(format!(
            "[{section}].{key} must be greater than zero"
        )));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_str: &str) -> Result<ConfigFile> {
        let raw: RawConfigFile = toml::from_str(toml_str)?;
        ConfigFile::try_from(raw)
    }

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = parse("").unwrap();
        assert_eq!(cfg.orchestrator.bind, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(cfg.orchestrator.lease_duration, Duration::from_secs(5));
        assert_eq!(cfg.orchestrator.lease_multiplier, 3);
        assert_eq!(cfg.orchestrator.sweep_interval, Duration::from_millis(500));
        assert_eq!(cfg.operations, OperationTimes::default());
        assert_eq!(cfg.agent.computing_power, 1);
    }

    #[test]
    fn zero_computing_power_is_rejected() {
        let err = parse("[agent]\ncomputing_power = 0\n").unwrap_err();
        assert!(matches!(err, CalcdagError::ConfigError(msg) if msg.contains("computing_power")));
    }

    #[test]
    fn zero_lease_duration_is_rejected() {
        let err = parse("[orchestrator]\nlease_duration = \"0s\"\n").unwrap_err();
        assert!(matches!(err, CalcdagError::ConfigError(msg) if msg.contains("lease_duration")));
    }

    #[test]
    fn bad_bind_address_is_rejected() {
        let err = parse("[orchestrator]\nbind = \"localhost\"\n").unwrap_err();
        assert!(matches!(err, CalcdagError::ConfigError(msg) if msg.contains("bind")));
    }

    #[test]
    fn zero_operation_time_is_allowed() {
        let cfg = parse("[operations]\naddition = \"0ms\"\n").unwrap();
        assert_eq!(cfg.operations.addition, Duration::ZERO);
    }

    #[test]
    fn trailing_slash_is_stripped_from_orchestrator_url() {
        let cfg = parse("[agent]\norchestrator_url = \"http://10.0.0.1:9000/\"\n").unwrap();
        assert_eq!(cfg.agent.orchestrator_url, "http://10.0.0.1:9000");
    }
}
