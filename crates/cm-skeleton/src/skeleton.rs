use cm_core::{Image, ImageView, Point2f, Vec2f};
use cm_morph::{ThinningConfig, thin_guo_hall};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::normals::{NormalScratch, estimate_normal};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkeletonConfig {
    pub thinning: ThinningConfig,
    /// Steps along the skeleton gathered around each point for the local
    /// direction fit.
    pub normal_radius: usize,
    /// Fewer reachable skeleton pixels than this leaves the normal undefined.
    pub min_neighbors: usize,
}

impl Default for SkeletonConfig {
    fn default() -> Self {
        Self {
            thinning: ThinningConfig::default(),
            normal_radius: 5,
            min_neighbors: 2,
        }
    }
}

/// One centerline pixel and its unit normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkeletonPoint {
    pub idx: (usize, usize),
    pub n: Vec2f,
}

impl SkeletonPoint {
    pub fn p(&self) -> Point2f {
        Point2f::from_pixel(self.idx)
    }

    pub fn has_normal(&self) -> bool {
        !self.n.is_zero()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Skeleton {
    pub mask: Image<u8>,
    pub points: Vec<SkeletonPoint>,
    pub passes: usize,
}

impl Skeleton {
    pub fn width(&self) -> usize {
        self.mask.width()
    }

    pub fn height(&self) -> usize {
        self.mask.height()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn iter_with_normals(&self) -> impl Iterator<Item = &SkeletonPoint> {
        self.points.iter().filter(|p| p.has_normal())
    }

    pub fn num_without_normal(&self) -> usize {
        self.points.iter().filter(|p| !p.has_normal()).count()
    }
}

pub fn extract_skeleton(mask: &ImageView<'_, u8>, cfg: &SkeletonConfig) -> Skeleton {
    let thinned = thin_guo_hall(mask, &cfg.thinning);
    let (w, h) = (thinned.mask.width(), thinned.mask.height());
    let occupancy = thinned.mask.data();

    let mut scratch = NormalScratch::default();
    let mut points = Vec::new();
    for p in 0..occupancy.len() {
        if occupancy[p] == 0 {
            continue;
        }

        let n = estimate_normal(
            occupancy,
            w,
            h,
            p,
            cfg.normal_radius,
            cfg.min_neighbors,
            &mut scratch,
        );
        points.push(SkeletonPoint {
            idx: (p % w, p / w),
            n,
        });
    }

    let skeleton = Skeleton {
        mask: thinned.mask,
        points,
        passes: thinned.passes,
    };
    debug!(
        points = skeleton.len(),
        degenerate = skeleton.num_without_normal(),
        passes = skeleton.passes,
        "skeleton extracted"
    );

    skeleton
}

#[cfg(test)]
mod tests {
    use cm_core::{Image, ImageView};

    use super::{SkeletonConfig, extract_skeleton};

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
    fn every_point_lies_on_the_mask() {
        let img = band(60, 30, 10, 18);
        let sk = extract_skeleton(&img.as_view(), &SkeletonConfig::default());

        assert!(!sk.is_empty());
        for pt in &sk.points {
            assert_ne!(*img.get(pt.idx.0, pt.idx.1).expect("in bounds"), 0);
            assert_ne!(*sk.mask.get(pt.idx.0, pt.idx.1).expect("in bounds"), 0);
        }
    }

    #[test]
    fn horizontal_band_has_vertical_normals() {
        let img = band(60, 30, 10, 18);
        let sk = extract_skeleton(&img.as_view(), &SkeletonConfig::default());

        let mid: Vec<_> = sk
            .points
            .iter()
            .filter(|p| (15..45).contains(&p.idx.0))
            .collect();
        assert!(!mid.is_empty());
        for pt in mid {
            assert_eq!(pt.idx.1, 14);
            assert!((pt.n.norm() - 1.0).abs() < 1e-5);
            assert!(pt.n.x.abs() < 1e-4, "normal {:?}", pt.n);
            assert!(pt.n.y > 0.99);
        }
    }

    #[test]
    fn points_follow_scan_order() {
        let img = band(40, 20, 5, 11);
        let sk = extract_skeleton(&img.as_view(), &SkeletonConfig::default());

        let linear: Vec<usize> = sk.points.iter().map(|p| p.idx.1 * 40 + p.idx.0).collect();
        assert!(linear.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn isolated_pixel_keeps_zero_normal() {
        let mut img = Image::new_fill(9, 9, 0u8);
        *img.get_mut(4, 4).expect("in bounds") = 255;

        let sk = extract_skeleton(&img.as_view(), &SkeletonConfig::default());
        assert_eq!(sk.len(), 1);
        assert!(!sk.points[0].has_normal());
        assert_eq!(sk.iter_with_normals().count(), 0);
        assert_eq!(sk.num_without_normal(), 1);
    }

    #[test]
    fn empty_mask_gives_empty_skeleton() {
        let data = vec![0u8; 64];
        let view = ImageView::from_slice(8, 8, &data).expect("valid view");
        let sk = extract_skeleton(&view, &SkeletonConfig::default());

        assert!(sk.is_empty());
        assert_eq!(sk.width(), 8);
        assert_eq!(sk.height(), 8);
    }
}
