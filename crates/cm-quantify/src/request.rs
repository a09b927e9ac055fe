use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::QuantifyError;

const ALL: &str = "all";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetricKind {
    Length,
    Area,
    MaxWidth,
    AvgWidth,
}

impl MetricKind {
    pub const ALL: [MetricKind; 4] = [
        MetricKind::Length,
        MetricKind::Area,
        MetricKind::MaxWidth,
        MetricKind::AvgWidth,
    ];

    /// Key in the result outputs.
    pub fn key(self) -> &'static str {
        match self {
            MetricKind::Length => "length",
            MetricKind::Area => "area",
            MetricKind::MaxWidth => "max_width",
            MetricKind::AvgWidth => "avg_width",
        }
    }

    /// Column title in the metrics table.
    pub fn column(self) -> &'static str {
        match self {
            MetricKind::Length => "Length (mm)",
            MetricKind::Area => "Area (mm^2)",
            MetricKind::MaxWidth => "Max Width (mm)",
            MetricKind::AvgWidth => "Avg Width (mm)",
        }
    }

    fn aliases(self) -> &'static [&'static str] {
        match self {
            MetricKind::Length => &["length", "len", "lengthmm"],
            MetricKind::Area => &["area", "areamm2", "areamm^2"],
            MetricKind::MaxWidth => &["maxwidth", "maximumwidth", "maxwidthmm"],
            MetricKind::AvgWidth => &[
                "avgwidth",
                "averagewidth",
                "meanwidth",
                "avgwidthmm",
            ],
        }
    }

    fn needs_width(self) -> bool {
        matches!(self, MetricKind::MaxWidth | MetricKind::AvgWidth)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VisualKind {
    Skeleton,
    Normals,
    MaxWidth,
}

impl VisualKind {
    pub const ALL: [VisualKind; 3] = [VisualKind::Skeleton, VisualKind::Normals, VisualKind::MaxWidth];

    /// Key in the result visualizations.
    pub fn key(self) -> &'static str {
        match self {
            VisualKind::Skeleton => "skeleton",
            VisualKind::Normals => "normals",
            VisualKind::MaxWidth => "max_width_overlay",
        }
    }

    /// Appended to the mask's file stem to form the output file name.
    pub fn file_suffix(self) -> &'static str {
        match self {
            VisualKind::Skeleton => "_skeleton.png",
            VisualKind::Normals => "_normals.png",
            VisualKind::MaxWidth => "_max_width.png",
        }
    }

    fn aliases(self) -> &'static [&'static str] {
        match self {
            VisualKind::Skeleton => &["skeleton", "centerline"],
            VisualKind::Normals => &["normals", "normal", "normalfield"],
            VisualKind::MaxWidth => &["maxwidth", "maxwidthoverlay", "maximumwidth"],
        }
    }
}

/// How requested names are resolved to metric and visual kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Canonical keys and known aliases only; anything else is an error.
    #[default]
    Strict,
    /// Substring match against keys and column titles; unmatched names are
    /// skipped with a warning.
    Lenient,
}

/// Lowercase with spaces, underscores, dashes and parentheses removed.
fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-' | '(' | ')'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Resolves requested metric names into canonical order without duplicates.
/// Blank names are ignored; `all` selects every metric.
pub fn parse_metrics<S: AsRef<str>>(
    names: &[S],
    policy: MatchPolicy,
) -> Result<Vec<MetricKind>, QuantifyError> {
    resolve(
        names,
        policy,
        &MetricKind::ALL,
        |k, n| k.aliases().contains(&n),
        |k, n| normalize(k.key()).contains(n) || normalize(k.column()).contains(n),
        QuantifyError::UnknownMetric,
        "metric",
    )
}

/// Resolves requested visual names the same way as [`parse_metrics`].
pub fn parse_visuals<S: AsRef<str>>(
    names: &[S],
    policy: MatchPolicy,
) -> Result<Vec<VisualKind>, QuantifyError> {
    resolve(
        names,
        policy,
        &VisualKind::ALL,
        |k, n| k.aliases().contains(&n),
        |k, n| normalize(k.key()).contains(n),
        QuantifyError::UnknownVisual,
        "visual",
    )
}

fn resolve<K, S>(
    names: &[S],
    policy: MatchPolicy,
    kinds: &[K],
    exact: impl Fn(K, &str) -> bool,
    fuzzy: impl Fn(K, &str) -> bool,
    unknown: impl Fn(String) -> QuantifyError,
    what: &str,
) -> Result<Vec<K>, QuantifyError>
where
    K: Copy + Ord,
    S: AsRef<str>,
{
    let mut selected = BTreeSet::new();

    for raw in names {
        let raw = raw.as_ref();
        let name = normalize(raw);
        if name.is_empty() {
            continue;
        }
        if name == ALL {
            selected.extend(kinds.iter().copied());
            continue;
        }

        let hits: Vec<K> = match policy {
            MatchPolicy::Strict => kinds.iter().copied().filter(|&k| exact(k, &name)).collect(),
            MatchPolicy::Lenient => kinds
                .iter()
                .copied()
                .filter(|&k| exact(k, &name) || fuzzy(k, &name))
                .collect(),
        };
        if hits.is_empty() {
            if policy == MatchPolicy::Strict {
                return Err(unknown(raw.to_string()));
            }
            warn!(name = raw, "skipping unrecognized {what} name");
        }
        selected.extend(hits);
    }

    Ok(selected.into_iter().collect())
}

/// Metrics or visuals that need a skeleton.
pub(crate) fn needs_skeleton(metrics: &[MetricKind], visuals: &[VisualKind]) -> bool {
    !visuals.is_empty()
        || metrics
            .iter()
            .any(|m| matches!(m, MetricKind::Length) || m.needs_width())
}

/// Metrics or visuals that need the width profile.
pub(crate) fn needs_width_profile(metrics: &[MetricKind], visuals: &[VisualKind]) -> bool {
    visuals.contains(&VisualKind::MaxWidth) || metrics.iter().any(|m| m.needs_width())
}
