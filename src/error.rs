//! # Error Handling
//!
//! This module defines the error types for the `psyche` library.
//!
//! Startup and plumbing code returns `anyhow::Result`, so every load step can
//! attach context. Per-image work returns the typed `ProcessError` instead,
//! which lets the caller decide how a failed image is reported (for the stdin
//! loop, as a sentinel line).

use std::path::PathBuf;

use thiserror::Error;

/// A failure while handling a single image.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The image could not be opened or decoded.
    #[error("failed to open image {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    /// Preprocessing, the model run, or post-processing failed.
    #[error("inference failed for {path:?}: {cause:#}")]
    Inference { path: PathBuf, cause: anyhow::Error },
}

impl ProcessError {
    pub fn inference(path: impl Into<PathBuf>, cause: anyhow::Error) -> Self {
        Self::Inference {
            path: path.into(),
            cause,
        }
    }

    /// The image path the error refers to.
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::Open { path, .. } | Self::Inference { path, .. } => path,
        }
    }
}
