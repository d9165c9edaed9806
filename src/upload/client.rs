//! Analysis endpoint exchange
//!
//! One synchronous POST of the wire document, one classified answer. The
//! response contract is plain text: a case-insensitive `pass` body on a
//! successful status is a PASS, any other successful body is a FAIL, and a
//! non-success status or transport failure is a transmission error; surfaced
//! distinctly so a broken network is never rendered as a failed screening.
//!
//! No retry anywhere: the session is not resumable, and a second attempt
//! would need a fresh measurement anyway.

use serde::Serialize;
use thiserror::Error;

use super::wire::{build_request, UploadRequest};
use crate::session::orchestrator::SessionArtifacts;

/// Classified outcome of one upload exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Pass,
    Fail,
    /// Network failure, non-success status, or unreadable body, distinct
    /// from `Fail`
    TransmissionError,
}

/// Errors underlying a [`Verdict::TransmissionError`]
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("endpoint returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Client for the analysis endpoint.
#[derive(Clone)]
pub struct UploadClient {
    endpoint: String,
    http: reqwest::blocking::Client,
}

impl UploadClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            http: reqwest::blocking::Client::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Serialize the session and perform the single exchange. Never fails:
    /// transport problems classify as [`Verdict::TransmissionError`].
    pub fn submit(&self, artifacts: &SessionArtifacts) -> Verdict {
        self.submit_request(&build_request(artifacts))
    }

    /// Perform the exchange for an already-built wire document.
    pub fn submit_request(&self, request: &UploadRequest) -> Verdict {
        match self.exchange(request) {
            Ok(verdict) => verdict,
            Err(e) => {
                tracing::error!(endpoint = %self.endpoint, error = %e, "upload failed");
                Verdict::TransmissionError
            }
        }
    }

    fn exchange(&self, request: &UploadRequest) -> Result<Verdict, UploadError> {
        tracing::info!(
            endpoint = %self.endpoint,
            records = request.sensor_data.len(),
            has_image = request.image.is_some(),
            "submitting session"
        );
        let response = self.http.post(&self.endpoint).json(request).send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::Status(status));
        }

        let body = response.text()?;
        let verdict = classify_body(&body);
        tracing::info!(verdict = ?verdict, "endpoint answered");
        Ok(verdict)
    }
}

/// Exact case-insensitive `pass` is a PASS; every other successful body is a
/// FAIL. Trailing whitespace is ignored because the legacy endpoint terminates the
/// body with a newline.
fn classify_body(body: &str) -> Verdict {
    if body.trim().eq_ignore_ascii_case("pass") {
        Verdict::Pass
    } else {
        Verdict::Fail
    }
}
