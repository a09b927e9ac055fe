//! Crack quantification pipeline.
//!
//! [`Quantifier::quantify`] takes a mask image path, a pixel size and the
//! requested metric and visual names, and returns a [`QuantifyResult`]:
//!
//! 1. load the image and reduce it to luminance,
//! 2. binarize it into a `{0, 255}` mask,
//! 3. extract the skeleton with per-point normals (only when needed),
//! 4. measure the requested metrics in millimeters,
//! 5. render the requested overlays in memory,
//! 6. encode the overlays into temp files inside `visual_dir`,
//! 7. upsert the metrics row for `{stem}` in the metrics table,
//! 8. move the overlays to `{visual_dir}/{stem}{suffix}`.
//!
//! Every failure, including a panic inside a stage, is reported through the
//! result; a failed call leaves no new files behind and keeps the outputs of
//! earlier calls. An all-background mask is not an error: every metric is
//! zero.

mod config;
mod error;
mod pipeline;
mod request;
mod result;
mod table;

pub use config::QuantifyConfig;
pub use error::{QuantifyError, Stage};
pub use pipeline::{QuantifyRequest, Quantifier, quantify};
pub use request::{MatchPolicy, MetricKind, VisualKind, parse_metrics, parse_visuals};
pub use result::{QuantifyResult, Status};
pub use table::{MetricsTable, TableRow, TableSummary};
