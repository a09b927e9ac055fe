use cm_core::{ImageView, Point2f, Vec2f, is_set_at};
use cm_skeleton::{Skeleton, SkeletonPoint};
use serde::{Deserialize, Serialize};

const MIN_RAY_STEP: f32 = 1e-2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidthConfig {
    /// Distance between consecutive samples along a ray, in pixels.
    pub ray_step: f32,
    /// Longest ray considered; defaults to `width + height` of the mask.
    pub max_ray_px: Option<f32>,
}

impl Default for WidthConfig {
    fn default() -> Self {
        Self {
            ray_step: 1.0,
            max_ray_px: None,
        }
    }
}

/// Width measured across the crack at one skeleton point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WidthSample {
    pub center: SkeletonPoint,
    pub width: f32,
    /// Boundary crossing along `-n`.
    pub minus: Point2f,
    /// Boundary crossing along `+n`.
    pub plus: Point2f,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WidthProfile {
    pub samples: Vec<WidthSample>,
}

impl WidthProfile {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// First sample attaining the maximum width, in skeleton order.
    pub fn max(&self) -> Option<&WidthSample> {
        let mut best: Option<&WidthSample> = None;
        for s in &self.samples {
            if best.is_none_or(|b| s.width > b.width) {
                best = Some(s);
            }
        }
        best
    }

    pub fn max_width(&self) -> f32 {
        self.max().map_or(0.0, |s| s.width)
    }

    pub fn mean_width(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.samples.iter().map(|s| s.width as f64).sum();
        (sum / self.samples.len() as f64) as f32
    }
}

/// Distance from `origin` along the unit direction `dir` to the mask
/// boundary.
///
/// Samples are taken every `ray_step` pixels; the boundary is placed halfway
/// between the last foreground sample and the first background one. The
/// region outside the image is background. The result lies in
/// `[0, max_ray_px]`; a non-positive cap yields 0.
pub fn ray_length(mask: &ImageView<'_, u8>, origin: Point2f, dir: Vec2f, cfg: &WidthConfig) -> f32 {
    let step = cfg.ray_step.max(MIN_RAY_STEP);
    let max_len = cfg
        .max_ray_px
        .unwrap_or((mask.width() + mask.height()) as f32)
        .max(0.0);

    let mut k = 1u32;
    loop {
        let t = k as f32 * step;
        if t > max_len {
            return max_len;
        }
        let q = origin + dir * t;
        if !is_set_at(mask, q.x, q.y) {
            return t - 0.5 * step;
        }
        k += 1;
    }
}

/// Casts a ray pair at every skeleton point that has a normal.
pub fn width_profile(mask: &ImageView<'_, u8>, skeleton: &Skeleton, cfg: &WidthConfig) -> WidthProfile {
    let samples = skeleton
        .iter_with_normals()
        .map(|pt| {
            let origin = pt.p();
            let up = ray_length(mask, origin, pt.n, cfg);
            let down = ray_length(mask, origin, -pt.n, cfg);
            WidthSample {
                center: *pt,
                width: up + down,
                minus: origin - pt.n * down,
                plus: origin + pt.n * up,
            }
        })
        .collect();

    WidthProfile { samples }
}

#[cfg(test)]
mod tests {
    use cm_core::{Image, Point2f, Vec2f};
    use cm_skeleton::{SkeletonConfig, SkeletonPoint, extract_skeleton};

    use super::{WidthConfig, WidthProfile, WidthSample, ray_length, width_profile};
    use crate::{LengthConfig, length_px};

    fn band(w: usize, h: usize, y0: usize, y1: usize) -> Image<u8> {
        let mut img = Image::new_fill(w, h, 0u8);
        for y in y0..=y1 {
            for x in 0..w {
                *img.get_mut(x, y).expect("in bounds") = 255;
            }
        }
        img
    }

    fn sample(x: usize, width: f32) -> WidthSample {
        WidthSample {
            center: SkeletonPoint {
                idx: (x, 0),
                n: Vec2f::new(0.0, 1.0),
            },
            width,
            minus: Point2f::default(),
            plus: Point2f::default(),
        }
    }

    #[test]
    fn ray_stops_halfway_past_last_inside_sample() {
        let img = band(20, 20, 5, 9);
        let cfg = WidthConfig::default();
        let origin = Point2f::new(10.0, 7.0);

        assert_eq!(ray_length(&img.as_view(), origin, Vec2f::new(0.0, 1.0), &cfg), 2.5);
        assert_eq!(ray_length(&img.as_view(), origin, Vec2f::new(0.0, -1.0), &cfg), 2.5);
    }

    #[test]
    fn ray_treats_image_border_as_background() {
        let img = Image::new_fill(10, 10, 255u8);
        let cfg = WidthConfig::default();

        let len = ray_length(&img.as_view(), Point2f::new(2.0, 5.0), Vec2f::new(-1.0, 0.0), &cfg);
        assert_eq!(len, 2.5);

        let capped = WidthConfig {
            max_ray_px: Some(1.5),
            ..cfg
        };
        let len = ray_length(&img.as_view(), Point2f::new(2.0, 5.0), Vec2f::new(-1.0, 0.0), &capped);
        assert_eq!(len, 1.5);
    }

    #[test]
    fn non_positive_cap_gives_zero_length() {
        let img = Image::new_fill(10, 10, 255u8);
        let origin = Point2f::new(5.0, 5.0);
        let dir = Vec2f::new(1.0, 0.0);

        for cap in [0.0, -3.0, f32::NAN] {
            let cfg = WidthConfig {
                max_ray_px: Some(cap),
                ..WidthConfig::default()
            };
            assert_eq!(ray_length(&img.as_view(), origin, dir, &cfg), 0.0, "cap {cap}");
        }
    }

    #[test]
    fn band_width_matches_thickness() {
        let img = band(80, 40, 12, 24);
        let sk = extract_skeleton(&img.as_view(), &SkeletonConfig::default());
        let profile = width_profile(&img.as_view(), &sk, &WidthConfig::default());

        assert_eq!(profile.len(), sk.iter_with_normals().count());
        assert!((profile.max_width() - 13.0).abs() < 1e-4);
        assert!((profile.mean_width() - 13.0).abs() < 1e-4);

        let m = profile.max().expect("non-empty profile");
        assert!((m.plus.y - 24.5).abs() < 1e-4);
        assert!((m.minus.y - 11.5).abs() < 1e-4);
    }

    #[test]
    fn diagonal_band_measures_perpendicular_width() {
        // |x - y| <= 7 cut by 30 <= x + y <= 170: 15 diagonals wide
        // (10.6 px across) and 141 anti-diagonals long (99.7 px).
        let mut img = Image::new_fill(100, 100, 0u8);
        for y in 0..100usize {
            for x in 0..100usize {
                if x.abs_diff(y) <= 7 && (30..=170).contains(&(x + y)) {
                    *img.get_mut(x, y).expect("in bounds") = 255;
                }
            }
        }
        let across = 15.0 / std::f32::consts::SQRT_2;
        let along = 141.0 / std::f32::consts::SQRT_2;

        let sk = extract_skeleton(&img.as_view(), &SkeletonConfig::default());
        assert_eq!(sk.endpoint_count(), 2);
        assert_eq!(sk.junction_count(), 0);

        let cfg = WidthConfig::default();
        let profile = width_profile(&img.as_view(), &sk, &cfg);
        assert!(!profile.is_empty());
        assert!(
            (profile.max_width() - across).abs() < 1.5,
            "max {}",
            profile.max_width()
        );
        assert!(
            (profile.mean_width() - across).abs() < 1.5,
            "mean {}",
            profile.mean_width()
        );

        let len = length_px(&img.as_view(), &sk, &LengthConfig::default(), &cfg);
        assert!((len - along).abs() < 2.0, "length {len}");
    }

    #[test]
    fn first_maximum_wins() {
        let profile = WidthProfile {
            samples: vec![sample(0, 3.0), sample(1, 5.0), sample(2, 5.0), sample(3, 4.0)],
        };
        let m = profile.max().expect("non-empty profile");
        assert_eq!(m.center.idx, (1, 0));
        assert!((profile.mean_width() - 4.25).abs() < 1e-6);
    }

    #[test]
    fn empty_profile_reports_zero() {
        let profile = WidthProfile::default();
        assert!(profile.max().is_none());
        assert_eq!(profile.max_width(), 0.0);
        assert_eq!(profile.mean_width(), 0.0);
    }
}
