//! Foundational primitives for crack metrology.
//!
//! ## Grids
//! Images are contiguous row-major buffers indexed by `y * width + x`. Binary
//! masks are `Image<u8>` holding only `0` (background) and `255`
//! (foreground); every consumer treats any non-zero value as foreground.
//!
//! ## Sampling Coordinates
//! Integer coordinates refer to pixel centers. Nearest-neighbor sampling
//! rounds to the nearest integer index, so a ray stepping through a mask
//! visits the pixel whose center is closest to each sample.

mod border;
mod error;
mod geom;
mod image;
mod sample;

pub use border::{BorderMode, map_index};
pub use error::Error;
pub use geom::{Point2f, Vec2f};
pub use image::{FOREGROUND, Image, ImageView, count_nonzero};
pub use sample::{is_set_at, sample_nearest};
