//! Session orchestration
//!
//! The top-level state machine sequencing photo capture, speech capture,
//! countdown, measurement, upload, and verdict display. The orchestrator owns
//! one session's accumulated artifacts and replaces them wholesale when a new
//! session begins; nothing survives from run to run.
//!
//! Camera, speech recognition, and cue playback are collaborators behind
//! traits: opaque request/response steps whose only contract is "produces an
//! image", "produces a transcript", "plays a cue". A collaborator returning
//! nothing (the user cancelled) leaves the state machine exactly where it
//! was: a retry opportunity, never a failure.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use crossbeam_channel::Sender;
use serde::Serialize;
use thiserror::Error;

use crate::config::ScreeningConfig;
use crate::upload::client::{UploadClient, Verdict};
use crate::upload::wire::build_request;

use super::buffer::SampleBuffer;
use super::source::SensorSource;
use super::window::{MeasurementWindow, WindowError, WindowState};

/// Produces an image, or nothing if the user cancelled.
pub trait PhotoCapture: Send {
    fn request(&mut self) -> Option<Vec<u8>>;
}

/// Produces a transcript for the given prompt, or nothing if cancelled.
pub trait SpeechCapture: Send {
    fn request(&mut self, prompt: &str) -> Option<String>;
}

/// Plays the measurement-complete cue. Fire-and-forget; failure is ignored.
pub trait CompletionCue: Send {
    fn play(&mut self);
}

/// Session lifecycle. Transitions are strictly forward; `Aborted` is the
/// terminal an external interruption lands in, distinct from `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    Idle,
    AwaitingPhoto,
    AwaitingSpeech,
    ReadyToMeasure,
    Countdown,
    Measuring,
    Uploading,
    Done,
    Aborted,
}

/// UI-facing event stream emitted by the orchestrator.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum SessionEvent {
    StateChanged { state: SessionState },
    StatusText { text: String },
    Tick { elapsed_ms: i64 },
    VerdictReady { verdict: Verdict },
}

/// One session's accumulated capture results.
///
/// Owned exclusively by the orchestrator for the session's lifetime and
/// replaced, never merged, when the next session begins.
pub struct SessionArtifacts {
    pub image: Option<Vec<u8>>,
    pub transcript: Option<String>,
    pub buffer: Arc<Mutex<SampleBuffer>>,
}

impl SessionArtifacts {
    pub fn new() -> Self {
        Self {
            image: None,
            transcript: None,
            buffer: Arc::new(Mutex::new(SampleBuffer::new())),
        }
    }
}

impl Default for SessionArtifacts {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors from driving the session state machine
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("step not allowed in state {0:?}")]
    InvalidState(SessionState),

    #[error(transparent)]
    Window(#[from] WindowError),
}

/// Handle for forcing an early measurement stop from outside the
/// orchestrator's thread. The host calls this when the process is paused
/// while measuring, so no sensor stays registered in the background. The
/// session then proceeds to upload with whatever partial buffer was
/// collected.
#[derive(Clone)]
pub struct SessionSuspender {
    active: Arc<Mutex<Option<Arc<MeasurementWindow>>>>,
}

impl SessionSuspender {
    /// Stop the running measurement window, if any. Returns whether a running
    /// window was stopped.
    pub fn suspend(&self) -> bool {
        if let Ok(slot) = self.active.lock() {
            if let Some(window) = slot.as_ref() {
                if window.state() == WindowState::Running {
                    tracing::warn!("session suspended mid-measurement, stopping window early");
                    window.stop();
                    return true;
                }
            }
        }
        false
    }
}

/// The measurement-session orchestrator.
///
/// Drives `Idle → AwaitingPhoto → AwaitingSpeech → ReadyToMeasure →
/// Countdown → Measuring → Uploading → Done`; no step may be skipped or
/// reordered. `begin` runs the two capture steps; `confirm` runs everything
/// from the countdown through verdict display and blocks its caller for the
/// session's duration (the upload itself runs on a worker thread, its result
/// marshalled back before any state is touched).
pub struct SessionOrchestrator {
    config: ScreeningConfig,
    state: SessionState,
    artifacts: SessionArtifacts,
    started_at: Option<DateTime<Utc>>,
    sources: Option<Vec<Box<dyn SensorSource>>>,
    photo: Box<dyn PhotoCapture>,
    speech: Box<dyn SpeechCapture>,
    cue: Box<dyn CompletionCue>,
    uploader: UploadClient,
    active_window: Arc<Mutex<Option<Arc<MeasurementWindow>>>>,
    events: Sender<SessionEvent>,
    verdict: Option<Verdict>,
}

impl SessionOrchestrator {
    pub fn new(
        config: ScreeningConfig,
        sources: Vec<Box<dyn SensorSource>>,
        photo: Box<dyn PhotoCapture>,
        speech: Box<dyn SpeechCapture>,
        cue: Box<dyn CompletionCue>,
        events: Sender<SessionEvent>,
    ) -> Self {
        let uploader = UploadClient::new(config.endpoint.clone());
        Self {
            config,
            state: SessionState::Idle,
            artifacts: SessionArtifacts::new(),
            started_at: None,
            sources: Some(sources),
            photo,
            speech,
            cue,
            uploader,
            active_window: Arc::new(Mutex::new(None)),
            events,
            verdict: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn verdict(&self) -> Option<Verdict> {
        self.verdict
    }

    pub fn artifacts(&self) -> &SessionArtifacts {
        &self.artifacts
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Handle for forcing an early stop while measuring; safe to hold and
    /// call from any thread.
    pub fn suspender(&self) -> SessionSuspender {
        SessionSuspender {
            active: Arc::clone(&self.active_window),
        }
    }

    /// Start a fresh session: replace the artifacts, then run the photo and
    /// speech capture steps as far as the collaborators allow.
    pub fn begin(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Idle | SessionState::Done | SessionState::Aborted => {}
            other => return Err(SessionError::InvalidState(other)),
        }

        self.artifacts = SessionArtifacts::new();
        self.verdict = None;
        self.started_at = Some(Utc::now());
        tracing::info!("screening session started");

        self.set_state(SessionState::AwaitingPhoto);
        self.request_photo();
        Ok(())
    }

    /// Re-invoke the collaborator for the step the session is waiting on.
    /// No-op in any other state.
    pub fn retry_step(&mut self) {
        match self.state {
            SessionState::AwaitingPhoto => self.request_photo(),
            SessionState::AwaitingSpeech => self.request_speech(),
            _ => {}
        }
    }

    fn request_photo(&mut self) {
        if self.state != SessionState::AwaitingPhoto {
            return;
        }
        match self.photo.request() {
            Some(image) => {
                tracing::info!(bytes = image.len(), "photo captured");
                self.artifacts.image = Some(image);
                self.set_state(SessionState::AwaitingSpeech);
                self.request_speech();
            }
            None => {
                tracing::info!("photo capture cancelled, staying put");
                self.status("Photo capture cancelled. Try again.");
            }
        }
    }

    fn request_speech(&mut self) {
        if self.state != SessionState::AwaitingSpeech {
            return;
        }
        let prompt = self.config.speech_prompt.clone();
        self.status(prompt.clone());
        match self.speech.request(&prompt) {
            Some(transcript) => {
                tracing::info!(chars = transcript.len(), "speech captured");
                self.artifacts.transcript = Some(transcript);
                self.set_state(SessionState::ReadyToMeasure);
                self.status(
                    "Press the start button, hold the phone in one hand, \
                     and stretch both arms straight out.",
                );
            }
            None => {
                tracing::info!("speech capture cancelled, staying put");
                self.status("Speech capture cancelled. Try again.");
            }
        }
    }

    /// User confirmed: run countdown, measurement window, upload, and verdict
    /// display. Blocks until the verdict is rendered.
    pub fn confirm(&mut self) -> Result<Verdict, SessionError> {
        if self.state != SessionState::ReadyToMeasure {
            return Err(SessionError::InvalidState(self.state));
        }

        self.set_state(SessionState::Countdown);
        self.status(format!(
            "Measurement starts in {} seconds. Get ready.",
            self.config.countdown().as_secs()
        ));
        std::thread::sleep(self.config.countdown());

        self.set_state(SessionState::Measuring);
        self.status("Measuring. Do not move.");
        if let Ok(mut buffer) = self.artifacts.buffer.lock() {
            buffer.clear();
        }

        let sources = self.sources.take().unwrap_or_default();
        let window = Arc::new(MeasurementWindow::new(
            sources,
            self.config.sensor_period(),
            self.config.tick_interval(),
        ));
        if let Ok(mut slot) = self.active_window.lock() {
            *slot = Some(Arc::clone(&window));
        }

        let ticks = self.events.clone();
        window.start(
            Arc::clone(&self.artifacts.buffer),
            self.config.measure_duration(),
            Box::new(move |elapsed_ms| {
                let _ = ticks.send(SessionEvent::Tick { elapsed_ms });
            }),
        )?;
        window.wait();

        if let Ok(mut slot) = self.active_window.lock() {
            slot.take();
        }
        self.sources = Some(window.reclaim_sources());

        self.set_state(SessionState::Uploading);
        self.cue.play();
        self.status("Finished. Please wait.");
        let verdict = self.upload();

        self.verdict = Some(verdict);
        self.set_state(SessionState::Done);
        let _ = self.events.send(SessionEvent::VerdictReady { verdict });
        self.status(match verdict {
            Verdict::Pass => "Screening result: PASS",
            Verdict::Fail => "Screening result: FAIL",
            Verdict::TransmissionError => "Server error. Please close and restart the app.",
        });
        Ok(verdict)
    }

    /// External interruption: release any live window and land in the
    /// `Aborted` terminal. No-op once the session has already ended.
    pub fn abort(&mut self) {
        if matches!(self.state, SessionState::Done | SessionState::Aborted) {
            return;
        }
        if let Ok(mut slot) = self.active_window.lock() {
            if let Some(window) = slot.take() {
                window.stop();
                self.sources = Some(window.reclaim_sources());
            }
        }
        tracing::warn!(state = ?self.state, "session aborted");
        self.set_state(SessionState::Aborted);
        self.status("Screening aborted.");
    }

    /// Single attempt, no retry: the session is not resumable and a second
    /// attempt would need a fresh measurement anyway. The exchange runs on a
    /// worker thread; this thread only applies the classified result.
    fn upload(&mut self) -> Verdict {
        let request = build_request(&self.artifacts);
        let client = self.uploader.clone();
        let (verdict_tx, verdict_rx) = crossbeam_channel::bounded(1);

        let worker = std::thread::Builder::new()
            .name("session-upload".into())
            .spawn(move || {
                let _ = verdict_tx.send(client.submit_request(&request));
            })
            .expect("failed to spawn upload worker thread");

        let verdict = verdict_rx
            .recv()
            .unwrap_or(Verdict::TransmissionError);
        let _ = worker.join();
        verdict
    }

    fn set_state(&mut self, next: SessionState) {
        self.state = next;
        tracing::info!(state = ?next, "session state");
        let _ = self
            .events
            .send(SessionEvent::StateChanged { state: next });
    }

    fn status(&self, text: impl Into<String>) {
        let _ = self.events.send(SessionEvent::StatusText { text: text.into() });
    }
}
