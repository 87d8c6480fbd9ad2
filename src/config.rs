use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid window duration: {0}ms")]
    InvalidWindow(u64),
}

/// Engine configuration, parsed from JSON; every field has a default
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub search: SearchConfig,
    pub stream: StreamConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Result count used when a search does not ask for one
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { max_results: 10 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Sliding window length in milliseconds
    pub window_ms: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        // Five minutes
        Self { window_ms: 300_000 }
    }
}

impl StreamConfig {
    pub fn window(&self) -> Result<TimeDelta, ConfigError> {
        i64::try_from(self.window_ms)
            .ok()
            .and_then(TimeDelta::try_milliseconds)
            .ok_or(ConfigError::InvalidWindow(self.window_ms))
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        // Reject windows that cannot be represented before anything is built
        config.stream.window()?;
        Ok(config)
    }
}
