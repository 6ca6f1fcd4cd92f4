//! Runtime configuration, loaded from YAML.
//!
//! ```yaml
//! pacing:
//!   tick_step: 2
//!   unit: 10ms
//!   phase_delay: 500ms
//!   settle_delay: 1s
//! seed: 42
//! event_buffer: 64
//! ```
//!
//! Every field is optional; missing fields take the defaults shown.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use dossier_core::{
    EngineError, Pacing, ProcessingEngine, ProcessingPhase, StandInSynthesizer, Synthesizer,
};

/// Errors from loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid pacing: {0}")]
    Pacing(#[from] EngineError),

    #[error("event_buffer must be at least 1")]
    EmptyEventBuffer,
}

/// Phase timing, with durations as humantime strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    pub tick_step: u32,
    #[serde(with = "humantime_str")]
    pub unit: Duration,
    #[serde(with = "humantime_str")]
    pub phase_delay: Duration,
    #[serde(with = "humantime_str")]
    pub settle_delay: Duration,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Pacing::default().into()
    }
}

impl From<Pacing> for PacingConfig {
    fn from(p: Pacing) -> Self {
        Self {
            tick_step: p.tick_step,
            unit: p.unit,
            phase_delay: p.phase_delay,
            settle_delay: p.settle_delay,
        }
    }
}

impl From<&PacingConfig> for Pacing {
    fn from(c: &PacingConfig) -> Self {
        Pacing {
            tick_step: c.tick_step,
            unit: c.unit,
            phase_delay: c.phase_delay,
            settle_delay: c.settle_delay,
        }
    }
}

/// Configuration for an analysis session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub pacing: PacingConfig,

    /// Seed for the stand-in synthesizer; entropy when absent.
    pub seed: Option<u64>,

    /// Capacity of the event broadcast channel.
    pub event_buffer: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            pacing: PacingConfig::default(),
            seed: None,
            event_buffer: 64,
        }
    }
}

impl RuntimeConfig {
    /// Parse and validate YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.event_buffer == 0 {
            return Err(ConfigError::EmptyEventBuffer);
        }
        ProcessingEngine::new(ProcessingPhase::default_pipeline(), self.pacing())?;
        Ok(())
    }

    pub fn pacing(&self) -> Pacing {
        Pacing::from(&self.pacing)
    }

    /// Drop every delay, keeping the tick step.
    pub fn fast(mut self) -> Self {
        self.pacing = PacingConfig {
            tick_step: self.pacing.tick_step,
            ..PacingConfig::from(Pacing::immediate())
        };
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// The stand-in synthesizer, seeded if configured.
    pub fn synthesizer(&self) -> Arc<dyn Synthesizer> {
        match self.seed {
            Some(seed) => Arc::new(StandInSynthesizer::seeded(seed)),
            None => Arc::new(StandInSynthesizer::new()),
        }
    }
}

mod humantime_str {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(raw.trim()).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_core_pacing() {
        let config = RuntimeConfig::default();
        assert_eq!(config.pacing(), Pacing::default());
        assert_eq!(config.event_buffer, 64);
        assert!(config.seed.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_humantime_durations() {
        let config = RuntimeConfig::from_yaml(
            r#"
pacing:
  tick_step: 5
  unit: 2ms
  phase_delay: 250ms
  settle_delay: 2s
seed: 7
"#,
        )
        .unwrap();

        let pacing = config.pacing();
        assert_eq!(pacing.tick_step, 5);
        assert_eq!(pacing.unit, Duration::from_millis(2));
        assert_eq!(pacing.phase_delay, Duration::from_millis(250));
        assert_eq!(pacing.settle_delay, Duration::from_secs(2));
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.event_buffer, 64);
    }

    #[test]
    fn test_partial_pacing_keeps_defaults() {
        let config = RuntimeConfig::from_yaml("pacing:\n  phase_delay: 1s\n").unwrap();
        assert_eq!(config.pacing.phase_delay, Duration::from_secs(1));
        assert_eq!(config.pacing.unit, Duration::from_millis(10));
        assert_eq!(config.pacing.tick_step, 2);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            RuntimeConfig::from_yaml("pacing:\n  tick_step: 7\n"),
            Err(ConfigError::Pacing(EngineError::InvalidTickStep(7)))
        ));
        assert!(matches!(
            RuntimeConfig::from_yaml("event_buffer: 0\n"),
            Err(ConfigError::EmptyEventBuffer)
        ));
        assert!(matches!(
            RuntimeConfig::from_yaml("pacing:\n  unit: soon\n"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn test_fast_zeroes_delays() {
        let config = RuntimeConfig::default().fast();
        let pacing = config.pacing();
        assert_eq!(pacing.unit, Duration::ZERO);
        assert_eq!(pacing.phase_delay, Duration::ZERO);
        assert_eq!(pacing.settle_delay, Duration::ZERO);
        assert_eq!(pacing.tick_step, 2);
    }

    #[test]
    fn test_yaml_round_trip_uses_humantime() {
        let yaml = serde_yaml::to_string(&RuntimeConfig::default().with_seed(3)).unwrap();
        assert!(yaml.contains("phase_delay: 500ms"));
        assert!(yaml.contains("settle_delay: 1s"));
        assert_eq!(RuntimeConfig::from_yaml(&yaml).unwrap().seed, Some(3));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "seed: 11\nevent_buffer: 8").unwrap();
        let config = RuntimeConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.seed, Some(11));
        assert_eq!(config.event_buffer, 8);
    }
}
