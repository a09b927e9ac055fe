//! Binary mask preparation for crack metrology.
//!
//! - [`binarize_u8`] turns a luminance image into a strict `{0, 255}` mask.
//! - [`thin_guo_hall`] reduces a mask to a 1-pixel-wide, 8-connected
//!   centerline without splitting components or eating thin strands.
//!
//! Pixels are treated as binary with threshold `> 0` by the thinning step.

mod binarize;
mod thin;

pub use binarize::{BinarizeConfig, ThresholdPolicy, binarize_u8, threshold_for};
pub use thin::{Thinned, ThinningConfig, thin_guo_hall};
