//! Umbrella crate for the `crack-metrology` workspace.
//!
//! Re-exports the layered crates so applications can depend on one crate:
//! grids and geometry (`cm-core`), binarization and thinning (`cm-morph`),
//! skeleton and normals (`cm-skeleton`), metrics (`cm-measure`), overlays
//! (`cm-render`) and the end-to-end pipeline (`cm-quantify`).

pub use cm_core::*;
pub use cm_measure::*;
pub use cm_morph::*;
pub use cm_quantify::*;
pub use cm_render::*;
pub use cm_skeleton::*;
