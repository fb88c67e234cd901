//! Recording (compilation) session state.
//!
//! A session tracks one attempt to capture the live presentation into an
//! encoded file. The transitions live here so the progress invariants hold
//! no matter which controller drives them:
//! - progress never exceeds 95% while compiling
//! - progress is exactly 100% only once the artifact is ready
//! - a zero-byte artifact ends the session in `Error`, never `Ready`

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Highest progress reported before the encoder has finalized.
pub const MAX_COMPILING_PROGRESS: f64 = 95.0;

/// Lifecycle of a compilation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RecordingStatus {
    #[default]
    Idle,
    Compiling,
    Ready,
    Error,
}

/// The finalized output of a successful compilation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedArtifact {
    /// Where the encoded file was written.
    pub path: PathBuf,

    /// Total size in bytes.
    pub bytes: u64,

    /// Container name (for example `webm`).
    pub container: String,

    /// Video/audio codec pair (for example `vp9,opus`).
    pub codec: String,

    /// MIME type offered with the download.
    pub mime_type: String,
}

/// One compilation attempt, as shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RecordingSession {
    pub status: RecordingStatus,
    pub progress_percent: f64,
    pub estimated_secs_remaining: Option<f64>,
    pub artifact: Option<EncodedArtifact>,
    pub error: Option<String>,
}

/// Reasons a new compilation may not start.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("A compilation is already in progress")]
    AlreadyCompiling,

    #[error("This lecture has already been compiled")]
    AlreadyCompiled,
}

impl RecordingSession {
    /// A fresh idle session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a new compilation may start from this session.
    pub fn check_can_start(&self) -> Result<(), SessionError> {
        match self.status {
            RecordingStatus::Compiling => Err(SessionError::AlreadyCompiling),
            RecordingStatus::Ready => Err(SessionError::AlreadyCompiled),
            RecordingStatus::Idle | RecordingStatus::Error => Ok(()),
        }
    }

    /// Reset into the `Compiling` state.
    pub fn begin(&mut self, duration_secs: Option<f64>) -> Result<(), SessionError> {
        self.check_can_start()?;
        *self = Self {
            status: RecordingStatus::Compiling,
            progress_percent: 0.0,
            estimated_secs_remaining: duration_secs.map(|d| d.max(0.0)),
            artifact: None,
            error: None,
        };
        Ok(())
    }

    /// Estimate progress from the narration position. Ignored unless compiling.
    pub fn report_progress(&mut self, current_secs: f64, duration_secs: f64) {
        if self.status != RecordingStatus::Compiling || duration_secs <= 0.0 {
            return;
        }
        let percent = (current_secs / duration_secs * 100.0).clamp(0.0, MAX_COMPILING_PROGRESS);
        self.progress_percent = percent;
        self.estimated_secs_remaining = Some((duration_secs - current_secs).max(0.0));
    }

    /// Finalize with the encoder output.
    ///
    /// A zero-byte artifact turns the session into `Error`.
    pub fn finish(&mut self, artifact: EncodedArtifact) {
        if self.status != RecordingStatus::Compiling {
            return;
        }
        if artifact.bytes == 0 {
            self.fail("Recording produced an empty file");
            return;
        }
        self.status = RecordingStatus::Ready;
        self.progress_percent = 100.0;
        self.estimated_secs_remaining = Some(0.0);
        self.artifact = Some(artifact);
    }

    /// End the session with a user-visible error.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = RecordingStatus::Error;
        self.progress_percent = self.progress_percent.min(MAX_COMPILING_PROGRESS);
        self.artifact = None;
        self.error = Some(message.into());
    }

    pub fn is_compiling(&self) -> bool {
        self.status == RecordingStatus::Compiling
    }

    pub fn is_ready(&self) -> bool {
        self.status == RecordingStatus::Ready
    }
}
