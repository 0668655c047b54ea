//! Gridded data containers
//!
//! Fields and label masks share one flat `(t, z, y, x)` layout and a common
//! coordinate description, so a mask produced from a field can be laid back over
//! it cell for cell.

mod coords;
mod field;
mod label_mask;
mod shape;

pub use coords::{AuxCoord, Coordinates, DimCoord};
pub use field::Field;
pub use label_mask::{LabelMask, BACKGROUND, SEGMENTATION_MASK_NAME};
pub use shape::{Axis, FrameShape, GridShape};
