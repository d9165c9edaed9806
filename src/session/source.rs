//! Sensor channel abstraction
//!
//! A [`SensorSource`] is one physical channel that, once registered with a
//! target sampling period, invokes a callback with a 3-axis reading at
//! approximately that period until unregistered. The rate is best-effort:
//! hardware may deliver faster or slower, and callers must not assume uniform
//! spacing.
//!
//! The hard guarantee is on the way down: `unregister()` joins the delivery
//! thread, so once it returns, zero further callbacks fire. A reading that
//! lands after `unregister()` has returned is a defect, not a tolerance.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use thiserror::Error;

use super::buffer::SensorChannel;

/// A 3-axis sample as delivered by a sensor, before session tagging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Callback invoked once per delivered reading.
pub type ReadingCallback = Box<dyn FnMut(AxisSample) + Send>;

/// Errors from sensor registration
#[derive(Error, Debug)]
pub enum SensorError {
    #[error("sensor channel {} is already registered", .0.label())]
    AlreadyRegistered(SensorChannel),
}

/// One sensor channel delivering asynchronous 3-axis readings.
///
/// An unavailable channel is not an error: `register` is a no-op and no
/// readings are ever produced. Sessions tolerate missing channels.
pub trait SensorSource: Send {
    /// Which channel this source feeds.
    fn channel(&self) -> SensorChannel;

    /// Whether the channel exists on this device.
    fn is_available(&self) -> bool {
        true
    }

    /// Start delivering readings to `callback` at approximately `period`.
    ///
    /// Best-effort rate; no guarantee of exact spacing. No-op for an
    /// unavailable channel.
    fn register(&mut self, period: Duration, callback: ReadingCallback) -> Result<(), SensorError>;

    /// Stop delivery. Idempotent; after return no further callbacks fire.
    fn unregister(&mut self);
}

struct Feed {
    stop: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

/// Thread-backed sensor source producing synthetic readings from a waveform
/// function of elapsed time.
///
/// Stands in for the platform sensor HAL in the demo shell and in tests. The
/// first reading arrives roughly one period after registration, matching how
/// real sensor stacks deliver.
pub struct SimulatedSensor {
    channel: SensorChannel,
    available: bool,
    waveform: Arc<dyn Fn(Duration) -> AxisSample + Send + Sync>,
    feed: Option<Feed>,
}

impl SimulatedSensor {
    pub fn new(
        channel: SensorChannel,
        waveform: impl Fn(Duration) -> AxisSample + Send + Sync + 'static,
    ) -> Self {
        Self {
            channel,
            available: true,
            waveform: Arc::new(waveform),
            feed: None,
        }
    }

    /// A channel that is absent on this device: registration succeeds but
    /// never produces a reading.
    pub fn unavailable(channel: SensorChannel) -> Self {
        Self {
            channel,
            available: false,
            waveform: Arc::new(|_| AxisSample {
                x: 0.0,
                y: 0.0,
                z: 0.0,
            }),
            feed: None,
        }
    }
}

impl SensorSource for SimulatedSensor {
    fn channel(&self) -> SensorChannel {
        self.channel
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn register(
        &mut self,
        period: Duration,
        mut callback: ReadingCallback,
    ) -> Result<(), SensorError> {
        if !self.available {
            tracing::debug!(channel = self.channel.label(), "sensor absent, register is a no-op");
            return Ok(());
        }
        if self.feed.is_some() {
            return Err(SensorError::AlreadyRegistered(self.channel));
        }

        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let waveform = Arc::clone(&self.waveform);

        let thread = std::thread::Builder::new()
            .name(format!("sensor-{}", self.channel.label()))
            .spawn(move || {
                let origin = Instant::now();
                loop {
                    std::thread::sleep(period);
                    if thread_stop.load(Ordering::Acquire) {
                        break;
                    }
                    callback(waveform(origin.elapsed()));
                }
            })
            .expect("failed to spawn sensor feed thread");

        tracing::debug!(
            channel = self.channel.label(),
            period_us = period.as_micros() as u64,
            "sensor registered"
        );
        self.feed = Some(Feed { stop, thread });
        Ok(())
    }

    fn unregister(&mut self) {
        if let Some(feed) = self.feed.take() {
            feed.stop.store(true, Ordering::Release);
            let _ = feed.thread.join();
            tracing::debug!(channel = self.channel.label(), "sensor unregistered");
        }
    }
}

impl Drop for SimulatedSensor {
    fn drop(&mut self) {
        self.unregister();
    }
}
