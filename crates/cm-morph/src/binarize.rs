use cm_core::{Error, FOREGROUND, Image, ImageView};
use serde::{Deserialize, Serialize};

/// How the foreground cutoff is chosen. A pixel is foreground iff its
/// intensity is strictly greater than the cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdPolicy {
    /// Maximize between-class variance of the intensity histogram.
    #[default]
    Otsu,
    /// Halfway between the darkest and brightest pixel.
    MidRange,
    Fixed(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BinarizeConfig {
    pub policy: ThresholdPolicy,
    /// Treat dark pixels as the crack (masks drawn dark-on-light).
    pub invert: bool,
}

/// Cutoff chosen by `policy`, or `None` when the image is constant and has
/// no meaningful split.
pub fn threshold_for(src: &ImageView<'_, u8>, policy: ThresholdPolicy) -> Option<u8> {
    let mut hist = [0u64; 256];
    for &v in src.data() {
        hist[v as usize] += 1;
    }

    let min = hist.iter().position(|&c| c > 0)?;
    let max = hist.iter().rposition(|&c| c > 0)?;
    if min == max {
        return None;
    }

    let t = match policy {
        ThresholdPolicy::Fixed(t) => t,
        ThresholdPolicy::MidRange => ((min + max) / 2) as u8,
        ThresholdPolicy::Otsu => otsu(&hist),
    };
    Some(t)
}

/// Binarizes a luminance image to `{0, 255}`.
///
/// A constant image yields an all-background mask. Re-binarizing the output
/// with the same non-inverting config reproduces it exactly, since a
/// two-level image always splits between its two levels.
pub fn binarize_u8(src: &ImageView<'_, u8>, cfg: &BinarizeConfig) -> Result<Image<u8>, Error> {
    if src.is_empty() {
        return Err(Error::EmptyImage);
    }

    let Some(t) = threshold_for(src, cfg.policy) else {
        return Ok(Image::new_fill(src.width(), src.height(), 0));
    };

    let data = src
        .data()
        .iter()
        .map(|&v| {
            let fg = if cfg.invert { v <= t } else { v > t };
            if fg { FOREGROUND } else { 0 }
        })
        .collect();

    Image::from_vec(src.width(), src.height(), data)
}

fn otsu(hist: &[u64; 256]) -> u8 {
    let total: u64 = hist.iter().sum();
    let sum_all: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &c)| i as f64 * c as f64)
        .sum();

    let mut w_b = 0u64;
    let mut sum_b = 0.0f64;
    let mut best = 0u8;
    let mut best_var = -1.0f64;

    for (t, &count) in hist.iter().enumerate() {
        w_b += count;
        if w_b == 0 {
            continue;
        }
        let w_f = total - w_b;
        if w_f == 0 {
            break;
        }

        sum_b += t as f64 * count as f64;
        let m_b = sum_b / w_b as f64;
        let m_f = (sum_all - sum_b) / w_f as f64;
        let var = w_b as f64 * w_f as f64 * (m_b - m_f) * (m_b - m_f);

        // Strict comparison keeps the lowest cutoff on plateaus.
        if var > best_var {
            best_var = var;
            best = t as u8;
        }
    }

    best
}
