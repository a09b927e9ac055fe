use std::path::PathBuf;

use cm_measure::{LengthConfig, WidthConfig};
use cm_morph::BinarizeConfig;
use cm_render::RenderConfig;
use cm_skeleton::SkeletonConfig;
use serde::{Deserialize, Serialize};

use crate::request::MatchPolicy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuantifyConfig {
    pub binarize: BinarizeConfig,
    pub skeleton: SkeletonConfig,
    pub width: WidthConfig,
    pub length: LengthConfig,
    pub render: RenderConfig,
    pub match_policy: MatchPolicy,
    /// Directory receiving `{stem}_{visual}.png` files.
    pub visual_dir: PathBuf,
    /// Metrics table updated after every successful call; `None` disables it.
    pub metrics_table: Option<PathBuf>,
    /// Decimal places kept in reported values; `None` keeps full precision.
    pub round_decimals: Option<u32>,
}

impl Default for QuantifyConfig {
    fn default() -> Self {
        Self {
            binarize: BinarizeConfig::default(),
            skeleton: SkeletonConfig::default(),
            width: WidthConfig::default(),
            length: LengthConfig::default(),
            render: RenderConfig::default(),
            match_policy: MatchPolicy::Strict,
            visual_dir: PathBuf::from("outputs/visuals"),
            metrics_table: Some(PathBuf::from("outputs/csv/predicted_metrics.csv")),
            round_decimals: Some(2),
        }
    }
}

impl QuantifyConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub(crate) fn round(&self, v: f64) -> f64 {
        match self.round_decimals {
            Some(d) => {
                let k = 10f64.powi(d.min(15) as i32);
                (v * k).round() / k
            }
            None => v,
        }
    }
}
