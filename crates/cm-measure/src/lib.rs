//! Scalar crack metrics in pixel units, plus conversion to millimeters.
//!
//! - Area: foreground pixel count.
//! - Length: centerline path length, optionally extended at free ends to
//!   the mask boundary.
//! - Width: for each skeleton point with a normal, the sum of two rays cast
//!   along `+n` and `-n` until they leave the mask. [`WidthProfile`] holds
//!   every sample so max width, mean width and the max-width overlay all
//!   read the same numbers.
//!
//! Every function here is a pure function of its inputs; an empty mask or
//! skeleton yields zeros.

mod length;
mod units;
mod width;

pub use length::{LengthConfig, LengthMethod, area_px, length_px};
pub use units::PixelScale;
pub use width::{WidthConfig, WidthProfile, WidthSample, ray_length, width_profile};
