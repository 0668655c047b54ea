//! Transforms over an assembled label mask
//!
//! All operations are pure: inputs are borrowed and a freshly built field or
//! mask is returned. Field transforms never touch values, they only add cells to
//! the field's missing mask, so applying one twice gives the same result as once.

use crate::error::{Result, SegmentationError};
use crate::grid::{Axis, Field, LabelMask, BACKGROUND};
use tracing::debug;

/// Copy of `field` with every cell not labelled `particle` marked missing
///
/// # Errors
///
/// Returns `ShapeMismatch` if `mask` and `field` differ in shape.
pub fn extract_particle(field: &Field, mask: &LabelMask, particle: u32) -> Result<Field> {
    mask.check_aligned(field)?;
    let labels = mask.labels();
    Ok(field.masked_where(|i| labels[i] != particle))
}

/// Copy of `field` with every untracked (background) cell marked missing
///
/// # Errors
///
/// Returns `ShapeMismatch` if `mask` and `field` differ in shape.
pub fn clear_untracked(field: &Field, mask: &LabelMask) -> Result<Field> {
    mask.check_aligned(field)?;
    let labels = mask.labels();
    Ok(field.masked_where(|i| labels[i] == BACKGROUND))
}

/// Copy of `mask` keeping only `particle`, every other label set to 0
#[must_use]
pub fn isolate_particle(mask: &LabelMask, particle: u32) -> LabelMask {
    let mut isolated = mask.clone();
    for label in isolated.labels_mut() {
        if *label != particle {
            *label = BACKGROUND;
        }
    }
    isolated
}

/// [`isolate_particle`] together with its background as a missing-cell mask
#[must_use]
pub fn isolate_particle_masked(mask: &LabelMask, particle: u32) -> (LabelMask, Vec<bool>) {
    let isolated = isolate_particle(mask, particle);
    let missing = isolated.background();
    (isolated, missing)
}

/// Footprint of `particle` with `axis` collapsed by a max-reduction
///
/// A cell of the result carries `particle` when any cell along `axis` in the
/// input does, and 0 otherwise. Collapsing [`Axis::Vertical`] yields a planar
/// mask. Auxiliary coordinates depending on `axis` are dropped.
///
/// # Errors
///
/// Returns `InvalidArgument` for [`Axis::Time`], or for [`Axis::Vertical`] on a
/// planar mask.
pub fn project_surface(mask: &LabelMask, particle: u32, axis: Axis) -> Result<LabelMask> {
    match axis {
        Axis::Time => {
            return Err(SegmentationError::invalid_argument(
                "axis",
                "cannot project along the time axis",
            ))
        }
        Axis::Vertical if !mask.is_volumetric() => {
            return Err(SegmentationError::invalid_argument(
                "axis",
                "planar mask has no vertical axis",
            ))
        }
        _ => {}
    }

    let shape = mask.shape();
    let projected = shape.collapsed(axis);
    let mut labels = vec![BACKGROUND; projected.len()];
    let source = mask.labels();

    for t in 0..shape.nt {
        for z in 0..shape.nz {
            for y in 0..shape.ny {
                for x in 0..shape.nx {
                    if source[shape.index(t, z, y, x)] != particle {
                        continue;
                    }
                    let target = projected.index(
                        t,
                        if axis == Axis::Vertical { 0 } else { z },
                        if axis == Axis::Y { 0 } else { y },
                        if axis == Axis::X { 0 } else { x },
                    );
                    labels[target] = particle;
                }
            }
        }
    }

    debug!(
        "Projected particle {} along {:?}: {} -> {}",
        particle, axis, shape, projected
    );
    LabelMask::from_labels(mask.coords().collapsed(axis), labels)
}

/// [`project_surface`] together with the footprint's background as a
/// missing-cell mask
///
/// # Errors
///
/// Same as [`project_surface`].
pub fn project_surface_masked(
    mask: &LabelMask,
    particle: u32,
    axis: Axis,
) -> Result<(LabelMask, Vec<bool>)> {
    let surface = project_surface(mask, particle, axis)?;
    let missing = surface.background();
    Ok((surface, missing))
}
