//! Crack centerline extraction.
//!
//! [`extract_skeleton`] thins a binary mask and pairs every centerline pixel
//! with a unit normal estimated from its neighborhood along the skeleton:
//! - Points are emitted in row-major scan order of the thinned mask.
//! - The tangent is the principal axis of the skeleton pixels reachable
//!   within [`SkeletonConfig::normal_radius`] 8-connected steps; the normal
//!   is that tangent rotated by 90 degrees.
//! - Points whose neighborhood is too small to define a direction keep a
//!   zero normal ([`SkeletonPoint::has_normal`] is `false`). They stay in the
//!   skeleton but never take part in width measurement.
//!
//! Topology helpers (degree, endpoints, junctions, path length) use
//! 8-connectivity with diagonal links suppressed when an axis-aligned path
//! already joins the two pixels.

mod normals;
mod skeleton;
mod topology;

pub use skeleton::{Skeleton, SkeletonConfig, SkeletonPoint, extract_skeleton};
