//! Legacy wire document
//!
//! The analysis endpoint predates this implementation and its contract is
//! frozen: every numeric field travels as a string, each delivered reading is
//! its own record carrying only the axis fields of its channel (records are
//! never merged across channels), and the photo rides along as base64 PNG
//! under an `image` key that is simply absent when no photo was taken.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Serialize;

use crate::session::buffer::{SensorChannel, SensorReading};
use crate::session::orchestrator::SessionArtifacts;

/// One reading on the wire. Axis fields for channels other than the reading's
/// own are omitted entirely.
#[derive(Debug, Clone, Serialize)]
pub struct SensorRecord {
    /// Elapsed milliseconds from session start, as a decimal string
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accel_x: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accel_y: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accel_z: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gyro_x: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gyro_y: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gyro_z: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gravity_x: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gravity_y: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gravity_z: Option<String>,
}

impl SensorRecord {
    pub fn from_reading(reading: &SensorReading) -> Self {
        let mut record = Self {
            timestamp: reading.elapsed_ms.to_string(),
            accel_x: None,
            accel_y: None,
            accel_z: None,
            gyro_x: None,
            gyro_y: None,
            gyro_z: None,
            gravity_x: None,
            gravity_y: None,
            gravity_z: None,
        };
        let (x, y, z) = (
            Some(fmt_axis(reading.x)),
            Some(fmt_axis(reading.y)),
            Some(fmt_axis(reading.z)),
        );
        match reading.channel {
            SensorChannel::Accel => {
                record.accel_x = x;
                record.accel_y = y;
                record.accel_z = z;
            }
            SensorChannel::Gyro => {
                record.gyro_x = x;
                record.gyro_y = y;
                record.gyro_z = z;
            }
            SensorChannel::Gravity => {
                record.gravity_x = x;
                record.gravity_y = y;
                record.gravity_z = z;
            }
        }
        record
    }
}

/// The full upload document.
#[derive(Debug, Clone, Serialize)]
pub struct UploadRequest {
    pub speech: String,
    pub sensor_data: Vec<SensorRecord>,
    /// Base64-encoded PNG; absent when no photo was captured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Serialize one session's artifacts into the wire document. Must only be
/// called after the measurement window has stopped; the buffer is no longer
/// written by then.
pub fn build_request(artifacts: &SessionArtifacts) -> UploadRequest {
    let readings = artifacts
        .buffer
        .lock()
        .map(|buffer| buffer.to_ordered_list())
        .unwrap_or_default();

    UploadRequest {
        speech: artifacts.transcript.clone().unwrap_or_default(),
        sensor_data: readings.iter().map(SensorRecord::from_reading).collect(),
        image: artifacts.image.as_ref().map(|bytes| BASE64.encode(bytes)),
    }
}

/// Legacy string rendering: whole-valued floats keep their trailing `.0`.
fn fmt_axis(value: f64) -> String {
    format!("{:?}", value)
}
