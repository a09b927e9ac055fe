use cm_core::{ImageView, count_nonzero};
use cm_skeleton::Skeleton;
use serde::{Deserialize, Serialize};

use crate::width::{WidthConfig, ray_length};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthMethod {
    /// Sum of link lengths along the centerline (1 or sqrt(2) per link).
    #[default]
    PathLength,
    /// Number of centerline pixels.
    PixelCount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LengthConfig {
    pub method: LengthMethod,
    /// Add, at each free end, the distance from the end pixel to the mask
    /// boundary along the outward tangent.
    pub extend_endpoints: bool,
}

impl Default for LengthConfig {
    fn default() -> Self {
        Self {
            method: LengthMethod::PathLength,
            extend_endpoints: true,
        }
    }
}

/// Foreground pixel count of `mask`.
pub fn area_px(mask: &ImageView<'_, u8>) -> usize {
    count_nonzero(mask)
}

/// Crack length in pixels.
///
/// End extensions use the same ray march as the width measurement so both
/// metrics place the mask boundary identically.
pub fn length_px(
    mask: &ImageView<'_, u8>,
    skeleton: &Skeleton,
    cfg: &LengthConfig,
    rays: &WidthConfig,
) -> f32 {
    if skeleton.is_empty() {
        return 0.0;
    }

    let base = match cfg.method {
        LengthMethod::PathLength => skeleton.path_length(),
        LengthMethod::PixelCount => skeleton.len() as f32,
    };
    if !cfg.extend_endpoints {
        return base;
    }

    let ext: f32 = skeleton
        .endpoint_directions()
        .iter()
        .map(|(pt, dir)| ray_length(mask, pt.p(), *dir, rays))
        .sum();
    base + ext
}

#[cfg(test)]
mod tests {
    use cm_core::Image;
    use cm_skeleton::{SkeletonConfig, extract_skeleton};

    use super::{LengthConfig, LengthMethod, area_px, length_px};
    use crate::WidthConfig;

    fn rect(w: usize, h: usize, x0: usize, x1: usize, y0: usize, y1: usize) -> Image<u8> {
        let mut img = Image::new_fill(w, h, 0u8);
        for y in y0..=y1 {
            for x in x0..=x1 {
                *img.get_mut(x, y).expect("in bounds") = 255;
            }
        }
        img
    }

    #[test]
    fn horizontal_band_spans_the_image() {
        let img = rect(100, 100, 0, 99, 45, 55);
        let sk = extract_skeleton(&img.as_view(), &SkeletonConfig::default());
        let rays = WidthConfig::default();

        assert_eq!(area_px(&img.as_view()), 1100);

        let full = length_px(&img.as_view(), &sk, &LengthConfig::default(), &rays);
        assert!((full - 100.0).abs() < 1e-4, "length {full}");

        let bare = LengthConfig {
            extend_endpoints: false,
            ..LengthConfig::default()
        };
        let path = length_px(&img.as_view(), &sk, &bare, &rays);
        assert!((path - 89.0).abs() < 1e-4, "length {path}");

        let count = LengthConfig {
            method: LengthMethod::PixelCount,
            extend_endpoints: false,
        };
        assert_eq!(length_px(&img.as_view(), &sk, &count, &rays), 90.0);
    }

    #[test]
    fn vertical_band_measures_like_horizontal() {
        let img = rect(40, 80, 15, 23, 0, 79);
        let sk = extract_skeleton(&img.as_view(), &SkeletonConfig::default());

        let len = length_px(&img.as_view(), &sk, &LengthConfig::default(), &WidthConfig::default());
        assert!((len - 80.0).abs() < 1e-4, "length {len}");
    }

    #[test]
    fn short_segment_inside_the_image() {
        let img = rect(16, 8, 2, 11, 2, 4);
        let sk = extract_skeleton(&img.as_view(), &SkeletonConfig::default());

        assert_eq!(area_px(&img.as_view()), 30);
        let len = length_px(&img.as_view(), &sk, &LengthConfig::default(), &WidthConfig::default());
        assert!((len - 10.0).abs() < 1e-4, "length {len}");
    }

    #[test]
    fn empty_mask_has_zero_length_and_area() {
        let img = Image::new_fill(12, 12, 0u8);
        let sk = extract_skeleton(&img.as_view(), &SkeletonConfig::default());

        assert_eq!(area_px(&img.as_view()), 0);
        assert_eq!(
            length_px(&img.as_view(), &sk, &LengthConfig::default(), &WidthConfig::default()),
            0.0
        );
    }
}
