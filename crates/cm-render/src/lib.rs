//! Raster overlays for crack measurements.
//!
//! All renderers take a base RGB image (the decoded source converted to
//! RGB8), clone it and draw on the copy. Drawing primitives clip at the
//! image border.

mod draw;
mod font;
mod overlay;

pub use draw::{draw_dot, draw_line, rgb_from_luma};
pub use font::{draw_text, text_size};
pub use overlay::{
    RenderConfig, format_width_label, render_max_width, render_normals, render_skeleton,
};
