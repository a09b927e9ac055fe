use cm_core::{ImageView, Point2f};
use image::{GrayImage, Rgb, RgbImage};

/// Gray-to-RGB conversion of a luminance view.
pub fn rgb_from_luma(img: &ImageView<'_, u8>) -> RgbImage {
    let gray = GrayImage::from_fn(img.width() as u32, img.height() as u32, |x, y| {
        image::Luma([img.row(y as usize)[x as usize]])
    });
    image::DynamicImage::ImageLuma8(gray).to_rgb8()
}

#[inline]
pub(crate) fn put_clipped(img: &mut RgbImage, x: i32, y: i32, color: Rgb<u8>) {
    if x < 0 || y < 0 {
        return;
    }
    let (ux, uy) = (x as u32, y as u32);
    if ux >= img.width() || uy >= img.height() {
        return;
    }
    img.put_pixel(ux, uy, color);
}

/// 3x3 square centered on the pixel nearest to `(x, y)`.
pub fn draw_dot(img: &mut RgbImage, x: f32, y: f32, color: Rgb<u8>) {
    let xi = x.round() as i32;
    let yi = y.round() as i32;

    for dy in -1..=1 {
        for dx in -1..=1 {
            put_clipped(img, xi + dx, yi + dy, color);
        }
    }
}

/// Bresenham segment between the pixels nearest to `a` and `b`, both ends
/// included.
pub fn draw_line(img: &mut RgbImage, a: Point2f, b: Point2f, color: Rgb<u8>) {
    let (mut x0, mut y0) = (a.x.round() as i32, a.y.round() as i32);
    let (x1, y1) = (b.x.round() as i32, b.y.round() as i32);

    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        put_clipped(img, x0, y0, color);
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
