//! Fixed-duration measurement window
//!
//! Drives one time-bounded sampling session: registers every available sensor
//! source, fans their deliveries into the shared [`SampleBuffer`] tagged with
//! session-relative elapsed time, runs a UI-facing elapsed-time ticker, and
//! enforces a hard stop once the configured duration has passed.
//!
//! The window is time-bounded rather than count-bounded: the analysis endpoint
//! expects a fixed-duration gesture-hold window, and channel availability
//! varies by device, so reading counts are not a reliable bound.
//!
//! The ticker and sensor delivery are independent cadences. The deferred stop
//! is a third, separate mechanism: a single cancellable wait created at start
//! and disposed on stop.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use thiserror::Error;

use super::buffer::{SampleBuffer, SensorReading};
use super::source::{AxisSample, ReadingCallback, SensorSource};

const STATE_IDLE: u8 = 0;
const STATE_RUNNING: u8 = 1;
const STATE_STOPPED: u8 = 2;

/// Window lifecycle. Single-shot: a stopped window cannot run again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    Idle,
    Running,
    Stopped,
}

/// Callback invoked by the UI ticker with session-relative elapsed
/// milliseconds.
pub type TickCallback = Box<dyn FnMut(i64) + Send>;

/// Errors from starting a measurement window
#[derive(Error, Debug)]
pub enum WindowError {
    #[error("measurement window is already running")]
    AlreadyRunning,

    #[error("measurement window has already run; windows are single-shot")]
    Spent,
}

struct Shared {
    state: AtomicU8,
    /// Guards the stop routine so manual stop and the deferred stop cannot
    /// both tear down.
    stopping: AtomicBool,
    /// Cleared first during teardown; reading callbacks drop deliveries once
    /// it is false.
    collecting: Arc<AtomicBool>,
    sources: Mutex<Vec<Box<dyn SensorSource>>>,
    ticker_stop: Arc<AtomicBool>,
    ticker: Mutex<Option<JoinHandle<()>>>,
    /// Cancels the deferred stop when a manual stop wins the race.
    cancel: Mutex<Option<Sender<()>>>,
    done_tx: Sender<()>,
}

impl Shared {
    /// The single teardown path, shared by the deferred stop and manual
    /// `stop()`. Reentrant-safe: the first caller tears down, later callers
    /// are no-ops.
    fn shutdown(&self, reason: &'static str) {
        if self.stopping.swap(true, Ordering::AcqRel) {
            return;
        }

        // The sources lock serializes teardown against a racing start():
        // whichever side wins, no source stays registered afterwards.
        if let Ok(mut sources) = self.sources.lock() {
            self.collecting.store(false, Ordering::Release);
            for source in sources.iter_mut() {
                source.unregister();
            }
        }

        self.ticker_stop.store(true, Ordering::Release);
        if let Ok(mut slot) = self.ticker.lock() {
            if let Some(handle) = slot.take() {
                let _ = handle.join();
            }
        }

        if let Ok(mut slot) = self.cancel.lock() {
            slot.take();
        }

        self.state.store(STATE_STOPPED, Ordering::Release);
        let _ = self.done_tx.send(());
        tracing::info!(reason, "measurement window stopped");
    }
}

/// One fixed-duration sampling run over a set of sensor sources.
///
/// `STOPPED → RUNNING → STOPPED`, single-shot. All mutable pieces live behind
/// the shared inner state so `stop()` works through a shared reference from
/// any thread (the deferred stop fires on its own thread; the host may force
/// an early stop on suspension).
pub struct MeasurementWindow {
    shared: Arc<Shared>,
    done_rx: Receiver<()>,
    sensor_period: Duration,
    tick_interval: Duration,
}

impl MeasurementWindow {
    pub fn new(
        sources: Vec<Box<dyn SensorSource>>,
        sensor_period: Duration,
        tick_interval: Duration,
    ) -> Self {
        let (done_tx, done_rx) = bounded(1);
        Self {
            shared: Arc::new(Shared {
                state: AtomicU8::new(STATE_IDLE),
                stopping: AtomicBool::new(false),
                collecting: Arc::new(AtomicBool::new(false)),
                sources: Mutex::new(sources),
                ticker_stop: Arc::new(AtomicBool::new(false)),
                ticker: Mutex::new(None),
                cancel: Mutex::new(None),
                done_tx,
            }),
            done_rx,
            sensor_period,
            tick_interval,
        }
    }

    pub fn state(&self) -> WindowState {
        match self.shared.state.load(Ordering::Acquire) {
            STATE_RUNNING => WindowState::Running,
            STATE_STOPPED => WindowState::Stopped,
            _ => WindowState::Idle,
        }
    }

    /// Begin sampling into `buffer` for exactly `duration`.
    ///
    /// Records `t0`, registers every available source at the configured
    /// period, starts the UI ticker, and schedules the single deferred stop.
    /// Readings are tagged with `elapsed_ms = now - t0` and the source's
    /// channel; deliveries that race past the deadline are dropped so every
    /// stored reading satisfies `0 <= elapsed_ms <= duration`.
    pub fn start(
        &self,
        buffer: Arc<Mutex<SampleBuffer>>,
        duration: Duration,
        mut tick: TickCallback,
    ) -> Result<(), WindowError> {
        match self.shared.state.compare_exchange(
            STATE_IDLE,
            STATE_RUNNING,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => {}
            Err(STATE_RUNNING) => return Err(WindowError::AlreadyRunning),
            Err(_) => return Err(WindowError::Spent),
        }

        let t0 = Instant::now();
        let duration_ms = duration.as_millis() as i64;

        // Fan-in: one append-only sink, one independent producer per channel.
        if let Ok(mut sources) = self.shared.sources.lock() {
            if self.shared.stopping.load(Ordering::Acquire) {
                // A racing stop already tore the window down; leave nothing
                // registered.
                return Ok(());
            }
            self.shared.collecting.store(true, Ordering::Release);
            for source in sources.iter_mut() {
                let channel = source.channel();
                let sink = Arc::clone(&buffer);
                let collecting = Arc::clone(&self.shared.collecting);
                let callback: ReadingCallback = Box::new(move |axes: AxisSample| {
                    let elapsed_ms = t0.elapsed().as_millis() as i64;
                    if !collecting.load(Ordering::Acquire) || elapsed_ms > duration_ms {
                        return;
                    }
                    let reading =
                        SensorReading::new(channel, axes.x, axes.y, axes.z, elapsed_ms);
                    if let Ok(mut buf) = sink.lock() {
                        buf.append(reading);
                    }
                });
                if let Err(e) = source.register(self.sensor_period, callback) {
                    tracing::warn!(
                        channel = channel.label(),
                        error = %e,
                        "sensor registration failed"
                    );
                }
            }
        }

        // UI ticker: its own cadence, never conflated with sensor delivery.
        let ticker_stop = Arc::clone(&self.shared.ticker_stop);
        let tick_interval = self.tick_interval;
        let ticker = std::thread::Builder::new()
            .name("window-ticker".into())
            .spawn(move || loop {
                if ticker_stop.load(Ordering::Acquire) {
                    break;
                }
                tick(t0.elapsed().as_millis() as i64);
                std::thread::sleep(tick_interval);
            })
            .expect("failed to spawn window ticker thread");
        if let Ok(mut slot) = self.shared.ticker.lock() {
            *slot = Some(ticker);
        }

        // Single deferred stop: one cancellable wait for the whole window.
        let (cancel_tx, cancel_rx) = bounded::<()>(1);
        if let Ok(mut slot) = self.shared.cancel.lock() {
            *slot = Some(cancel_tx);
        }
        let shared = Arc::clone(&self.shared);
        std::thread::Builder::new()
            .name("window-deadline".into())
            .spawn(move || {
                if let Err(RecvTimeoutError::Timeout) = cancel_rx.recv_timeout(duration) {
                    shared.shutdown("deadline");
                }
            })
            .expect("failed to spawn window deadline thread");

        tracing::info!(
            duration_ms,
            period_us = self.sensor_period.as_micros() as u64,
            "measurement window started"
        );
        Ok(())
    }

    /// Stop early. Same effect as the deferred stop; meaningful at most once,
    /// later calls (and the racing deferred stop) are no-ops.
    pub fn stop(&self) {
        if let Ok(slot) = self.shared.cancel.lock() {
            if let Some(cancel) = slot.as_ref() {
                let _ = cancel.try_send(());
            }
        }
        self.shared.shutdown("manual");
    }

    /// Block until the window has fully stopped and every source is
    /// unregistered. Intended for the single supervising caller; serialization
    /// must not begin before this returns.
    pub fn wait(&self) {
        if self.state() == WindowState::Running {
            let _ = self.done_rx.recv();
        }
    }

    /// Take the sources back out of a stopped window so the next session can
    /// reuse them. Empty unless the window has stopped.
    pub fn reclaim_sources(&self) -> Vec<Box<dyn SensorSource>> {
        if self.state() != WindowState::Stopped {
            return Vec::new();
        }
        self.shared
            .sources
            .lock()
            .map(|mut sources| sources.drain(..).collect())
            .unwrap_or_default()
    }
}

impl Drop for MeasurementWindow {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::buffer::SensorChannel;
    use crate::session::source::SimulatedSensor;

    fn steady(channel: SensorChannel) -> Box<dyn SensorSource> {
        Box::new(SimulatedSensor::new(channel, |_| AxisSample {
            x: 1.0,
            y: 2.0,
            z: 3.0,
        }))
    }

    fn all_channels() -> Vec<Box<dyn SensorSource>> {
        vec![
            steady(SensorChannel::Accel),
            steady(SensorChannel::Gyro),
            steady(SensorChannel::Gravity),
        ]
    }

    fn short_window(sources: Vec<Box<dyn SensorSource>>) -> MeasurementWindow {
        MeasurementWindow::new(sources, Duration::from_millis(10), Duration::from_millis(10))
    }

    #[test]
    fn test_window_runs_and_auto_stops() {
        let window = short_window(all_channels());
        let buffer = Arc::new(Mutex::new(SampleBuffer::new()));

        window
            .start(Arc::clone(&buffer), Duration::from_millis(120), Box::new(|_| {}))
            .unwrap();
        assert_eq!(window.state(), WindowState::Running);

        window.wait();
        assert_eq!(window.state(), WindowState::Stopped);

        let buf = buffer.lock().unwrap();
        assert!(!buf.is_empty(), "three 10ms channels over 120ms produced nothing");
    }

    #[test]
    fn test_elapsed_within_window_bounds() {
        let window = short_window(all_channels());
        let buffer = Arc::new(Mutex::new(SampleBuffer::new()));
        let duration_ms = 100i64;

        window
            .start(
                Arc::clone(&buffer),
                Duration::from_millis(duration_ms as u64),
                Box::new(|_| {}),
            )
            .unwrap();
        window.wait();

        let buf = buffer.lock().unwrap();
        for reading in buf.readings() {
            assert!(
                reading.elapsed_ms >= 0 && reading.elapsed_ms <= duration_ms,
                "elapsed {}ms outside [0, {}]",
                reading.elapsed_ms,
                duration_ms
            );
        }
    }

    #[test]
    fn test_immediate_stop_yields_empty_buffer() {
        // Long-period sources: first delivery would be at ~200ms.
        let slow: Vec<Box<dyn SensorSource>> = vec![Box::new(SimulatedSensor::new(
            SensorChannel::Accel,
            |_| AxisSample {
                x: 0.0,
                y: 0.0,
                z: 0.0,
            },
        ))];
        let window =
            MeasurementWindow::new(slow, Duration::from_millis(200), Duration::from_millis(10));
        let buffer = Arc::new(Mutex::new(SampleBuffer::new()));

        window
            .start(Arc::clone(&buffer), Duration::from_secs(10), Box::new(|_| {}))
            .unwrap();
        window.stop();

        assert_eq!(window.state(), WindowState::Stopped);
        assert!(buffer.lock().unwrap().is_empty());
    }

    #[test]
    fn test_stop_is_race_free() {
        let window = short_window(all_channels());
        let buffer = Arc::new(Mutex::new(SampleBuffer::new()));

        window
            .start(Arc::clone(&buffer), Duration::from_secs(10), Box::new(|_| {}))
            .unwrap();
        std::thread::sleep(Duration::from_millis(60));
        window.stop();

        let len_at_stop = buffer.lock().unwrap().len();
        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(
            buffer.lock().unwrap().len(),
            len_at_stop,
            "reading appended after stop() returned"
        );
    }

    #[test]
    fn test_stop_is_idempotent() {
        let window = short_window(all_channels());
        let buffer = Arc::new(Mutex::new(SampleBuffer::new()));

        window
            .start(buffer, Duration::from_secs(10), Box::new(|_| {}))
            .unwrap();
        window.stop();
        window.stop();
        window.stop();
        assert_eq!(window.state(), WindowState::Stopped);
    }

    #[test]
    fn test_window_is_single_shot() {
        let window = short_window(all_channels());
        let buffer = Arc::new(Mutex::new(SampleBuffer::new()));

        window
            .start(Arc::clone(&buffer), Duration::from_millis(30), Box::new(|_| {}))
            .unwrap();
        window.wait();

        let again = window.start(buffer, Duration::from_millis(30), Box::new(|_| {}));
        assert!(matches!(again, Err(WindowError::Spent)));
    }

    #[test]
    fn test_ticker_fires_independently() {
        // No sensors at all: the ticker still runs.
        let window = short_window(Vec::new());
        let buffer = Arc::new(Mutex::new(SampleBuffer::new()));
        let ticks = Arc::new(AtomicU8::new(0));
        let tick_count = Arc::clone(&ticks);

        window
            .start(
                Arc::clone(&buffer),
                Duration::from_millis(100),
                Box::new(move |_| {
                    let _ = tick_count.fetch_add(1, Ordering::Relaxed);
                }),
            )
            .unwrap();
        window.wait();

        assert!(ticks.load(Ordering::Relaxed) >= 3, "ticker barely fired");
        assert!(buffer.lock().unwrap().is_empty());
    }

    #[test]
    fn test_missing_channels_are_tolerated() {
        let sources: Vec<Box<dyn SensorSource>> = vec![
            steady(SensorChannel::Accel),
            Box::new(SimulatedSensor::unavailable(SensorChannel::Gyro)),
            Box::new(SimulatedSensor::unavailable(SensorChannel::Gravity)),
        ];
        let window = short_window(sources);
        let buffer = Arc::new(Mutex::new(SampleBuffer::new()));

        window
            .start(Arc::clone(&buffer), Duration::from_millis(100), Box::new(|_| {}))
            .unwrap();
        window.wait();

        let buf = buffer.lock().unwrap();
        assert!(!buf.is_empty());
        assert!(buf
            .readings()
            .iter()
            .all(|r| r.channel == SensorChannel::Accel));
    }

    #[test]
    fn test_reclaim_sources_after_stop() {
        let window = short_window(all_channels());
        let buffer = Arc::new(Mutex::new(SampleBuffer::new()));

        assert!(window.reclaim_sources().is_empty(), "idle window must not yield sources");
        window
            .start(buffer, Duration::from_millis(30), Box::new(|_| {}))
            .unwrap();
        assert!(window.reclaim_sources().is_empty(), "running window must not yield sources");
        window.wait();

        let sources = window.reclaim_sources();
        assert_eq!(sources.len(), 3);
    }
}
