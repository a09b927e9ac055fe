/// Physical size of one (square) pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelScale {
    mm_per_px: f64,
}

impl PixelScale {
    /// Returns `None` unless `mm_per_px` is finite and strictly positive.
    pub fn new(mm_per_px: f64) -> Option<Self> {
        (mm_per_px.is_finite() && mm_per_px > 0.0).then_some(Self { mm_per_px })
    }

    pub fn mm_per_px(&self) -> f64 {
        self.mm_per_px
    }

    pub fn length_mm(&self, px: f32) -> f64 {
        px as f64 * self.mm_per_px
    }

    pub fn area_mm2(&self, px: usize) -> f64 {
        px as f64 * self.mm_per_px * self.mm_per_px
    }
}

#[cfg(test)]
mod tests {
    use super::PixelScale;

    #[test]
    fn rejects_non_positive_sizes() {
        assert!(PixelScale::new(0.0).is_none());
        assert!(PixelScale::new(-0.1).is_none());
        assert!(PixelScale::new(f64::NAN).is_none());
        assert!(PixelScale::new(f64::INFINITY).is_none());
    }

    #[test]
    fn length_scales_linearly_and_area_quadratically() {
        let s = PixelScale::new(0.1).expect("valid scale");
        assert!((s.length_mm(100.0) - 10.0).abs() < 1e-9);
        assert!((s.area_mm2(1100) - 11.0).abs() < 1e-9);

        let d = PixelScale::new(0.2).expect("valid scale");
        assert!((d.length_mm(100.0) - 2.0 * s.length_mm(100.0)).abs() < 1e-9);
        assert!((d.area_mm2(1100) - 4.0 * s.area_mm2(1100)).abs() < 1e-9);
    }
}
