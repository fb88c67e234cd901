//! Error types shared across Lectern crates.

use std::path::PathBuf;

/// Top-level error type for Lectern operations.
#[derive(Debug, thiserror::Error)]
pub enum LecternError {
    #[error("Lecture error: {message}")]
    Lecture { message: String },

    #[error("Caption error: {message}")]
    Caption { message: String },

    #[error("Timeline error: {message}")]
    Timeline { message: String },

    #[error("Asset error: {message}")]
    Asset { message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Playback error: {message}")]
    Playback { message: String },

    #[error("Capture error: {message}")]
    Capture { message: String },

    #[error("Encode error: {message}")]
    Encode { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using LecternError.
pub type LecternResult<T> = Result<T, LecternError>;

impl LecternError {
    pub fn lecture(msg: impl Into<String>) -> Self {
        Self::Lecture {
            message: msg.into(),
        }
    }

    pub fn caption(msg: impl Into<String>) -> Self {
        Self::Caption {
            message: msg.into(),
        }
    }

    pub fn timeline(msg: impl Into<String>) -> Self {
        Self::Timeline {
            message: msg.into(),
        }
    }

    pub fn asset(msg: impl Into<String>) -> Self {
        Self::Asset {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn playback(msg: impl Into<String>) -> Self {
        Self::Playback {
            message: msg.into(),
        }
    }

    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture {
            message: msg.into(),
        }
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructor_messages() {
        let err = LecternError::capture("no video track");
        assert_eq!(err.to_string(), "Capture error: no video track");

        let err = LecternError::FileNotFound {
            path: PathBuf::from("/tmp/missing.vtt"),
        };
        assert_eq!(err.to_string(), "File not found: /tmp/missing.vtt");
    }

    #[test]
    fn test_io_conversion() {
        fn read() -> LecternResult<String> {
            Ok(std::fs::read_to_string("/definitely/not/here/lectern.json")?)
        }
        assert!(matches!(read(), Err(LecternError::Io(_))));
    }
}
