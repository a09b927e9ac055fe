use crate::border::{BorderMode, map_index};
use crate::image::ImageView;

/// Nearest-neighbor sample at subpixel position `(x, y)`.
///
/// Returns `None` only for an empty image sampled with [`BorderMode::Clamp`].
pub fn sample_nearest<T: Copy>(
    img: &ImageView<'_, T>,
    x: f32,
    y: f32,
    border: BorderMode<T>,
) -> Option<T> {
    let xi = x.round() as isize;
    let yi = y.round() as isize;

    match border {
        BorderMode::Constant(v) => {
            let (Some(mx), Some(my)) = (
                map_index(xi, img.width(), &border),
                map_index(yi, img.height(), &border),
            ) else {
                return Some(v);
            };
            img.get(mx, my).copied()
        }
        BorderMode::Clamp => {
            let mx = map_index(xi, img.width(), &border)?;
            let my = map_index(yi, img.height(), &border)?;
            img.get(mx, my).copied()
        }
    }
}

/// Whether the mask pixel nearest to `(x, y)` is foreground. The region
/// outside the image is background.
#[inline]
pub fn is_set_at(mask: &ImageView<'_, u8>, x: f32, y: f32) -> bool {
    sample_nearest(mask, x, y, BorderMode::Constant(0)).is_some_and(|v| v != 0)
}
