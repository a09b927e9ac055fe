use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Pipeline step a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Load,
    Binarize,
    Skeleton,
    Measure,
    Render,
    Write,
    Table,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Load => "load",
            Stage::Binarize => "binarize",
            Stage::Skeleton => "skeleton",
            Stage::Measure => "measure",
            Stage::Render => "render",
            Stage::Write => "write",
            Stage::Table => "table",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum QuantifyError {
    /// Mask path missing, unreadable, or not decodable as an image.
    #[error("invalid image {path}: {reason}")]
    InvalidImage { path: PathBuf, reason: String },

    #[error("pixel size must be finite and positive, got {0}")]
    InvalidPixelSize(f64),

    #[error("unknown metric name: {0:?}")]
    UnknownMetric(String),

    #[error("unknown visual name: {0:?}")]
    UnknownVisual(String),

    /// Unexpected failure (including a panic) inside a computation stage.
    #[error("{stage} stage failed: {message}")]
    Computation { stage: Stage, message: String },

    #[error("i/o error on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("metrics table: {0}")]
    Table(String),
}

impl QuantifyError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Short outcome line for the result summary.
    pub fn summary(&self) -> String {
        match self {
            Self::InvalidImage { .. } => "failed to load mask".to_string(),
            Self::InvalidPixelSize(_) | Self::UnknownMetric(_) | Self::UnknownVisual(_) => {
                "invalid request".to_string()
            }
            Self::Computation { stage, .. } => format!("computation failed during {stage}"),
            Self::Io { .. } => "failed to write outputs".to_string(),
            Self::Table(_) => "failed to update metrics table".to_string(),
        }
    }

    /// Display text followed by every underlying source.
    pub fn diagnostic(&self) -> String {
        let mut out = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            out.push_str(": ");
            out.push_str(&err.to_string());
            source = err.source();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::{QuantifyError, Stage};

    #[test]
    fn diagnostic_includes_source_chain() {
        let err = QuantifyError::io("out/a.png", io::Error::other("disk full"));
        assert_eq!(err.diagnostic(), "i/o error on out/a.png: disk full");
        assert_eq!(err.summary(), "failed to write outputs");
    }

    #[test]
    fn computation_names_its_stage() {
        let err = QuantifyError::Computation {
            stage: Stage::Skeleton,
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "skeleton stage failed: boom");
        assert_eq!(err.summary(), "computation failed during skeleton");
    }
}
