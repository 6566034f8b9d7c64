//! Failure kinds of one conversion invocation.
//!
//! Every variant propagates to the Lambda runtime unchanged; nothing is
//! retried or partially published here.

use std::path::PathBuf;
use std::time::Duration;

use pdf_convert_core::contract::ContractError;
use pdf_convert_core::storage_keys::KeyError;
use pdf_convert_core::text_layout::LayoutError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("invalid trigger event: {0}")]
    InvalidEvent(#[from] ContractError),

    #[error("invalid source key: {0}")]
    InvalidKey(#[from] KeyError),

    #[error("failed to fetch s3://{bucket}/{key}: {message}")]
    Fetch {
        bucket: String,
        key: String,
        message: String,
    },

    #[error("office engine failed for '{key}': {source}")]
    Engine {
        key: String,
        #[source]
        source: EngineError,
    },

    #[error("'{key}' is not valid UTF-8 text: {source}")]
    Decode {
        key: String,
        #[source]
        source: std::str::Utf8Error,
    },

    #[error("failed to lay out '{key}' as PDF: {message}")]
    Layout { key: String, message: String },

    #[error("failed to upload s3://{bucket}/{key}: {message}")]
    Upload {
        bucket: String,
        key: String,
        message: String,
    },

    #[error("working directory error at '{path}': {source}")]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConversionError {
    pub(crate) fn workspace(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Workspace {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn from_layout(key: &str, error: LayoutError) -> Self {
        match error {
            LayoutError::Decode(source) => Self::Decode {
                key: key.to_string(),
                source,
            },
            LayoutError::Encode(message) => Self::Layout {
                key: key.to_string(),
                message,
            },
        }
    }

    /// Short machine-readable label used in structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidEvent(_) => "invalid_event",
            Self::InvalidKey(_) => "invalid_key",
            Self::Fetch { .. } => "fetch_error",
            Self::Engine { .. } => "engine_error",
            Self::Decode { .. } => "decode_error",
            Self::Layout { .. } => "layout_error",
            Self::Upload { .. } => "upload_error",
            Self::Workspace { .. } => "workspace_error",
        }
    }
}

/// Errors from running the external office engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("engine exited with code {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },

    #[error("engine timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("engine reported success but '{}' was not created", path.display())]
    OutputMissing { path: PathBuf },

    #[error("input path '{}' has no file name", path.display())]
    InvalidInput { path: PathBuf },

    #[error("engine I/O error: {0}")]
    Io(#[from] std::io::Error),
}
