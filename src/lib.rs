//! Strokescreen - guided stroke-screening session engine
//!
//! This library drives a short clinical-style screening procedure on a
//! handheld device: capture a photo, capture a spoken response, then record a
//! fixed-duration window of motion-sensor readings (accelerometer, gyroscope,
//! gravity vector) while the user holds the device with arms extended. The
//! collected bundle is posted to a remote analysis endpoint which returns a
//! binary PASS/FAIL verdict.
//!
//! The core pieces:
//! - session sequencing and artifact ownership ([`session::orchestrator`])
//! - the fixed-duration sampling engine ([`session::window`])
//! - the sensor channel abstraction ([`session::source`])
//! - the legacy wire document and response contract ([`upload`])
//!
//! Platform concerns (camera UI, speech recognition, audio cue playback,
//! rendering) live behind collaborator traits and are not implemented here.

pub mod config;
pub mod session;
pub mod upload;

pub use config::ScreeningConfig;
pub use session::buffer::{SampleBuffer, SensorChannel, SensorReading};
pub use session::orchestrator::{
    CompletionCue, PhotoCapture, SessionArtifacts, SessionError, SessionEvent,
    SessionOrchestrator, SessionState, SessionSuspender, SpeechCapture,
};
pub use session::source::{AxisSample, SensorError, SensorSource, SimulatedSensor};
pub use session::window::{MeasurementWindow, WindowError, WindowState};
pub use upload::client::{UploadClient, Verdict};
pub use upload::wire::{SensorRecord, UploadRequest};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Target sensor sampling period in microseconds (10 ms per channel)
pub const SENSOR_PERIOD_MICROS: u64 = 10_000;

/// Fixed measurement window duration in milliseconds
pub const MEASUREMENT_WINDOW_MS: u64 = 10_000;

/// Countdown before measurement starts, in milliseconds
pub const COUNTDOWN_MS: u64 = 3_000;

/// Elapsed-time ticker cadence for UI display, in milliseconds
pub const TICK_INTERVAL_MS: u64 = 10;

/// Default analysis endpoint
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:5000/process";
