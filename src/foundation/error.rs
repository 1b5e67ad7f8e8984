use std::path::PathBuf;

use crate::foundation::core::FrameIndex;

pub type BulbResult<T> = Result<T, BulbError>;

#[derive(thiserror::Error, Debug)]
pub enum BulbError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("shape mismatch: {left_width}x{left_height} vs {right_width}x{right_height}")]
    ShapeMismatch {
        left_width: u32,
        left_height: u32,
        right_width: u32,
        right_height: u32,
    },

    #[error("missing input '{}': {reason}", .path.display())]
    MissingInput { path: PathBuf, reason: String },

    #[error("missing frame {index:03} in '{}'", .dir.display())]
    MissingFrame { index: u64, dir: PathBuf },

    #[error("render failed for frame {}: {source}", .frame.0)]
    Render {
        frame: FrameIndex,
        #[source]
        source: Box<BulbError>,
    },

    #[error("cancelled")]
    Cancelled,

    #[error("timed out after {elapsed_secs:.3}s")]
    Timeout { elapsed_secs: f64 },

    #[error("raster error: {0}")]
    Raster(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("cleanup failed for '{}': {reason}", .path.display())]
    Cleanup { path: PathBuf, reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BulbError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn raster(msg: impl Into<String>) -> Self {
        Self::Raster(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    pub fn missing_input(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::MissingInput {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn render(frame: FrameIndex, source: BulbError) -> Self {
        Self::Render {
            frame,
            source: Box::new(source),
        }
    }

    /// Stable short name for logs and CLI output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "Validation",
            Self::ShapeMismatch { .. } => "ShapeMismatch",
            Self::MissingInput { .. } => "MissingInput",
            Self::MissingFrame { .. } => "MissingFrame",
            Self::Render { .. } => "RenderFailure",
            Self::Cancelled => "Cancelled",
            Self::Timeout { .. } => "Timeout",
            Self::Raster(_) => "Raster",
            Self::Encode(_) => "EncodeFailure",
            Self::Cleanup { .. } => "CleanupFailure",
            Self::Other(_) => "Other",
        }
    }

    /// Frame index carried by a render failure, if any.
    pub fn frame(&self) -> Option<FrameIndex> {
        match self {
            Self::Render { frame, .. } => Some(*frame),
            _ => None,
        }
    }
}
