//! Screening session configuration
//!
//! The contract values (countdown, window duration, sampling period) are fixed
//! by the analysis endpoint; they are configurable here so tests can run
//! shortened sessions, with `Default` carrying the real values.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    COUNTDOWN_MS, DEFAULT_ENDPOINT, MEASUREMENT_WINDOW_MS, SENSOR_PERIOD_MICROS, TICK_INTERVAL_MS,
};

/// Configuration for one screening run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningConfig {
    /// Analysis endpoint URL
    pub endpoint: String,
    /// Countdown before measurement starts, in milliseconds
    pub countdown_ms: u64,
    /// Measurement window duration in milliseconds
    pub measure_ms: u64,
    /// Target sensor sampling period in microseconds
    pub sensor_period_us: u64,
    /// Elapsed-time ticker cadence in milliseconds
    pub tick_interval_ms: u64,
    /// Prompt shown and spoken for the speech-capture step
    pub speech_prompt: String,
}

impl Default for ScreeningConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            countdown_ms: COUNTDOWN_MS,
            measure_ms: MEASUREMENT_WINDOW_MS,
            sensor_period_us: SENSOR_PERIOD_MICROS,
            tick_interval_ms: TICK_INTERVAL_MS,
            speech_prompt: "How was your day today?".to_string(),
        }
    }
}

impl ScreeningConfig {
    /// Contract defaults, with the endpoint overridable via the
    /// `STROKESCREEN_ENDPOINT` environment variable.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(endpoint) = std::env::var("STROKESCREEN_ENDPOINT") {
            config.endpoint = endpoint;
        }
        config
    }

    pub fn countdown(&self) -> Duration {
        Duration::from_millis(self.countdown_ms)
    }

    pub fn measure_duration(&self) -> Duration {
        Duration::from_millis(self.measure_ms)
    }

    pub fn sensor_period(&self) -> Duration {
        Duration::from_micros(self.sensor_period_us)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}
