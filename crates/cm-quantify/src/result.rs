use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::QuantifyError;
use crate::request::{MetricKind, VisualKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    Error,
}

/// Outcome of one quantify call. On error `outputs` and `visualizations` are
/// `None` and `error` carries the diagnostic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantifyResult {
    pub status: Status,
    pub summary: String,
    /// Metric key to value in millimeters (square millimeters for area).
    pub outputs: Option<BTreeMap<String, f64>>,
    /// Visual key to the written file.
    pub visualizations: Option<BTreeMap<String, PathBuf>>,
    pub error: Option<String>,
}

impl QuantifyResult {
    pub(crate) fn success(
        summary: String,
        outputs: BTreeMap<String, f64>,
        visualizations: BTreeMap<String, PathBuf>,
    ) -> Self {
        Self {
            status: Status::Success,
            summary,
            outputs: Some(outputs),
            visualizations: Some(visualizations),
            error: None,
        }
    }

    pub(crate) fn failure(err: &QuantifyError) -> Self {
        Self {
            status: Status::Error,
            summary: err.summary(),
            outputs: None,
            visualizations: None,
            error: Some(err.diagnostic()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    pub fn output(&self, kind: MetricKind) -> Option<f64> {
        self.outputs.as_ref()?.get(kind.key()).copied()
    }

    pub fn visualization(&self, kind: VisualKind) -> Option<&PathBuf> {
        self.visualizations.as_ref()?.get(kind.key())
    }
}
