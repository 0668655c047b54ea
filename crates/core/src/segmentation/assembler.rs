//! Frame results into the full output mask

use crate::error::{Result, SegmentationError};

/// Copy one frame's labels into its time slot of the output mask
///
/// `slot` is the frame's disjoint chunk of the output buffer.
///
/// # Errors
///
/// Returns `ShapeMismatch` if `labels` and `slot` differ in length.
pub fn assemble_frame(slot: &mut [u32], labels: &[u32]) -> Result<()> {
    if slot.len() != labels.len() {
        return Err(SegmentationError::shape_mismatch(slot.len(), labels.len()));
    }
    slot.copy_from_slice(labels);
    Ok(())
}
