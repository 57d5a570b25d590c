use std::time::Duration;
use thiserror::Error;

/// Pipeline stage a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Decode,
    Estimate,
    Composite,
    Encode,
    Config,
    Cancelled,
}

#[derive(Debug, Error)]
pub enum StitchError {
    #[error("Decode failed{}: {message}", fmt_timestamp(.timestamp))]
    Decode {
        message: String,
        timestamp: Option<Duration>,
    },
    #[error("Offset estimation failed: {0}")]
    Estimate(String),
    #[error("Compositing failed: {0}")]
    Composite(String),
    #[error("Out of memory growing stitched image to {requested} bytes")]
    OutOfMemory { requested: usize },
    #[error("Invalid crop mask: top {top} + bottom {bottom} must be < frame height {height}")]
    InvalidCrop { top: u32, bottom: u32, height: u32 },
    #[error("Image encoding error: {0}")]
    Encode(#[from] image::ImageError),
    #[error("Config error: {0}")]
    Config(String),
    #[error("Config JSON error: {0}")]
    ConfigJson(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Stitching cancelled")]
    Cancelled,
}

impl StitchError {
    pub fn decode(message: impl Into<String>) -> Self {
        StitchError::Decode {
            message: message.into(),
            timestamp: None,
        }
    }

    pub fn decode_at(message: impl Into<String>, timestamp: Duration) -> Self {
        StitchError::Decode {
            message: message.into(),
            timestamp: Some(timestamp),
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            StitchError::Decode { .. } | StitchError::Io(_) => Stage::Decode,
            StitchError::Estimate(_) => Stage::Estimate,
            StitchError::Composite(_)
            | StitchError::OutOfMemory { .. }
            | StitchError::InvalidCrop { .. } => Stage::Composite,
            StitchError::Encode(_) => Stage::Encode,
            StitchError::Config(_) | StitchError::ConfigJson(_) => Stage::Config,
            StitchError::Cancelled => Stage::Cancelled,
        }
    }
}

fn fmt_timestamp(timestamp: &Option<Duration>) -> String {
    match timestamp {
        Some(t) => format!(" at {} ms", t.as_millis()),
        None => String::new(),
    }
}
