use cm_measure::{WidthProfile, WidthSample};
use cm_skeleton::Skeleton;
use image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};

use crate::draw::{draw_dot, draw_line};
use crate::font::{draw_text, text_size};

const SKELETON_COLOR: Rgb<u8> = Rgb([255, 64, 64]);
const NORMAL_COLOR: Rgb<u8> = Rgb([64, 255, 64]);
const SEGMENT_COLOR: Rgb<u8> = Rgb([0, 200, 255]);
const ENDPOINT_COLOR: Rgb<u8> = Rgb([255, 64, 64]);
const LABEL_COLOR: Rgb<u8> = Rgb([255, 255, 0]);
const LABEL_GAP: i32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Length of each drawn normal, in pixels.
    pub normal_length: f32,
    /// Draw every n-th normal.
    pub normal_stride: usize,
    pub label_scale: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            normal_length: 10.0,
            normal_stride: 1,
            label_scale: 2,
        }
    }
}

pub fn render_skeleton(base: &RgbImage, skeleton: &Skeleton) -> RgbImage {
    let mut rgb = base.clone();
    for pt in &skeleton.points {
        draw_dot(&mut rgb, pt.idx.0 as f32, pt.idx.1 as f32, SKELETON_COLOR);
    }
    rgb
}

/// Normal field as arrows starting at the skeleton. Points without a
/// normal are skipped.
pub fn render_normals(base: &RgbImage, skeleton: &Skeleton, cfg: &RenderConfig) -> RgbImage {
    let mut rgb = base.clone();
    let len = cfg.normal_length.max(0.0);
    let head = (len * 0.3).min(3.0);

    for pt in skeleton
        .iter_with_normals()
        .step_by(cfg.normal_stride.max(1))
    {
        let p = pt.p();
        let tip = p + pt.n * len;
        draw_line(&mut rgb, p, tip, NORMAL_COLOR);

        if head >= 1.0 {
            let back = tip - pt.n * head;
            let side = pt.n.perp() * (head * 0.6);
            draw_line(&mut rgb, back + side, tip, NORMAL_COLOR);
            draw_line(&mut rgb, back - side, tip, NORMAL_COLOR);
        }
    }
    rgb
}

/// Draws the widest cross-section of `profile` and labels it.
///
/// Returns the overlay together with the sample that was drawn, so the
/// caller gets the numeric width from the same computation. An empty
/// profile yields an unmodified copy of `base` and `None`.
pub fn render_max_width(
    base: &RgbImage,
    profile: &WidthProfile,
    label: &str,
    cfg: &RenderConfig,
) -> (RgbImage, Option<WidthSample>) {
    let mut rgb = base.clone();
    let Some(sample) = profile.max().copied() else {
        return (rgb, None);
    };

    draw_line(&mut rgb, sample.minus, sample.plus, SEGMENT_COLOR);
    draw_dot(&mut rgb, sample.minus.x, sample.minus.y, ENDPOINT_COLOR);
    draw_dot(&mut rgb, sample.plus.x, sample.plus.y, ENDPOINT_COLOR);

    let (tw, th) = text_size(label, cfg.label_scale.max(1));
    let right = sample.minus.x.max(sample.plus.x).round() as i32;
    let mid_y = ((sample.minus.y + sample.plus.y) * 0.5).round() as i32;
    let x = clamp_origin(right + LABEL_GAP, tw, rgb.width());
    let y = clamp_origin(mid_y - th as i32 / 2, th, rgb.height());
    draw_text(&mut rgb, x, y, label, cfg.label_scale, LABEL_COLOR);

    (rgb, Some(sample))
}

/// `W=<mm>mm` when a pixel size is known, `W=<px>px` otherwise.
pub fn format_width_label(width_px: f32, mm_per_px: Option<f64>) -> String {
    match mm_per_px {
        Some(s) => format!("W={:.2}mm", width_px as f64 * s),
        None => format!("W={width_px:.1}px"),
    }
}

fn clamp_origin(v: i32, extent: u32, limit: u32) -> i32 {
    let max = limit.saturating_sub(extent) as i32;
    v.clamp(0, max)
}

#[cfg(test)]
mod tests {
    use cm_core::{Image, Point2f, Vec2f};
    use cm_measure::{WidthConfig, WidthProfile, WidthSample, width_profile};
    use cm_skeleton::{SkeletonConfig, SkeletonPoint, extract_skeleton};
    use image::{Rgb, RgbImage};

    use super::{
        LABEL_COLOR, NORMAL_COLOR, RenderConfig, SEGMENT_COLOR, SKELETON_COLOR,
        format_width_label, render_max_width, render_normals, render_skeleton,
    };

    fn band(w: usize, h: usize, y0: usize, y1: usize) -> Image<u8> {
        let mut img = Image::new_fill(w, h, 0u8);
        for y in y0..=y1 {
            for x in 0..w {
                *img.get_mut(x, y).expect("in bounds") = 255;
            }
        }
        img
    }

    #[test]
    fn skeleton_points_are_marked() {
        let img = band(60, 30, 10, 18);
        let sk = extract_skeleton(&img.as_view(), &SkeletonConfig::default());
        let base = RgbImage::new(60, 30);

        let out = render_skeleton(&base, &sk);
        assert_eq!(out.dimensions(), (60, 30));
        for pt in &sk.points {
            assert_eq!(*out.get_pixel(pt.idx.0 as u32, pt.idx.1 as u32), SKELETON_COLOR);
        }
        assert_eq!(*out.get_pixel(30, 2), Rgb([0, 0, 0]));
    }

    #[test]
    fn normals_point_across_the_band() {
        let img = band(60, 30, 10, 18);
        let sk = extract_skeleton(&img.as_view(), &SkeletonConfig::default());
        let base = RgbImage::new(60, 30);

        let out = render_normals(&base, &sk, &RenderConfig::default());
        assert_eq!(*out.get_pixel(30, 14), NORMAL_COLOR);
        assert_eq!(*out.get_pixel(30, 20), NORMAL_COLOR);
        assert_eq!(*out.get_pixel(30, 24), NORMAL_COLOR);
        assert_eq!(*out.get_pixel(30, 8), Rgb([0, 0, 0]));

        let sparse = RenderConfig {
            normal_stride: 1000,
            ..RenderConfig::default()
        };
        let first = sk.iter_with_normals().next().expect("has normals").idx;
        let out = render_normals(&base, &sk, &sparse);
        assert_eq!(*out.get_pixel(first.0 as u32, 20), NORMAL_COLOR);
        assert_eq!(*out.get_pixel(30, 20), Rgb([0, 0, 0]));
    }

    #[test]
    fn max_width_segment_spans_the_band() {
        let img = band(80, 40, 12, 24);
        let sk = extract_skeleton(&img.as_view(), &SkeletonConfig::default());
        let profile = width_profile(&img.as_view(), &sk, &WidthConfig::default());
        let base = RgbImage::new(80, 40);

        let (out, sample) = render_max_width(&base, &profile, "W=13.0px", &RenderConfig::default());
        let sample = sample.expect("non-empty profile");
        assert!((sample.width - profile.max_width()).abs() < 1e-6);

        let x = sample.center.idx.0 as u32;
        for y in 15..=21 {
            assert_eq!(*out.get_pixel(x, y), SEGMENT_COLOR, "y={y}");
        }
        assert!(out.pixels().any(|p| *p == LABEL_COLOR));
    }

    #[test]
    fn label_is_kept_inside_narrow_images() {
        let profile = WidthProfile {
            samples: vec![WidthSample {
                center: SkeletonPoint {
                    idx: (10, 10),
                    n: Vec2f::new(0.0, 1.0),
                },
                width: 10.0,
                minus: Point2f::new(10.0, 5.0),
                plus: Point2f::new(10.0, 15.0),
            }],
        };
        let base = RgbImage::new(12, 20);

        let (out, sample) = render_max_width(&base, &profile, "W=1.00mm", &RenderConfig::default());
        assert_eq!(sample.map(|s| s.width), Some(10.0));
        // The label is wider than the image; it is pinned to the left edge.
        assert_eq!(*out.get_pixel(0, 5), LABEL_COLOR);
    }

    #[test]
    fn empty_profile_leaves_base_untouched() {
        let base = RgbImage::from_pixel(8, 8, Rgb([9, 9, 9]));
        let (out, sample) = render_max_width(&base, &WidthProfile::default(), "W=0", &RenderConfig::default());
        assert!(sample.is_none());
        assert_eq!(out, base);
    }

    #[test]
    fn labels_carry_units() {
        assert_eq!(format_width_label(11.0, Some(0.1)), "W=1.10mm");
        assert_eq!(format_width_label(11.0, None), "W=11.0px");
    }
}
