//! Marker-controlled segmentation of a field into per-particle regions
//!
//! Each frame runs the same independent pipeline:
//!
//! ```text
//! slice_frame -> seed_markers -> build_cost_surface -> GrowthAlgorithm::grow -> assemble_frame
//! ```
//!
//! Frames never read each other's data, so they are processed in parallel, each
//! writing its own disjoint slice of the pre-sized output mask. The only shared
//! input computed up front is the whole-field value range when cost scaling
//! uses [`RangeScope::Global`].

pub mod assembler;
pub mod cost;
pub mod frame;
pub mod growth;
pub mod markers;

pub use assembler::assemble_frame;
pub use cost::{build_cost_surface, CostFunction, CostSurface, ValueRange};
pub use frame::{slice_frame, Frame};
pub use growth::{create_growth_algorithm, GrowthAlgorithm, RandomWalker, Watershed};
pub use markers::{seed_markers, threshold_mask, MarkerArray, Seeding};

use crate::config::{RangeScope, SegmentationParams};
use crate::error::{Result, SegmentationError};
use crate::grid::{Field, LabelMask, BACKGROUND};
use crate::tracks::TrackTable;
use rayon::prelude::*;
use tracing::{debug, info, warn};

/// Segment every frame of `field` around the particles in `tracks`
///
/// Returns a mask with the field's shape and coordinates in which every cell
/// holds the particle identifier it was grown into, or 0.
///
/// # Errors
///
/// - `InvalidArgument` for unusable parameters, a `level` on a planar field or
///   beyond the vertical axis, or an invalid track table
/// - `OutOfRange` for a track coordinate outside the grid, unless
///   `skip_out_of_range_seeds` is set
/// - `SolverFailed` if the random walker does not converge
///
/// No output is produced when any frame fails.
pub fn segment(
    field: &Field,
    tracks: &TrackTable,
    params: &SegmentationParams,
) -> Result<LabelMask> {
    params.validate()?;
    tracks.validate()?;
    check_level(field, params)?;

    let shape = field.shape();
    let scope = params
        .range_scope
        .unwrap_or_else(|| RangeScope::default_for(field.is_volumetric()));
    let global_range = match scope {
        RangeScope::Global => ValueRange::of_field(field),
        RangeScope::PerFrame => None,
    };

    let grouped = tracks.group_by_frame();
    let ignored: usize = grouped
        .iter()
        .filter(|&(&frame, _)| frame >= shape.nt)
        .map(|(_, rows)| rows.len())
        .sum();
    if ignored > 0 {
        warn!(
            "Ignoring {} track rows with frames beyond the {} frames of '{}'",
            ignored,
            shape.nt,
            field.name()
        );
    }

    let grower = create_growth_algorithm(params);
    info!(
        "Segmenting '{}': {} frames of {}, method {}, target {:?}, threshold {}, range {:?}",
        field.name(),
        shape.nt,
        shape.frame(),
        grower.name(),
        params.target,
        params.threshold,
        scope
    );

    let mut mask = LabelMask::zeros_like(field);
    let frame_len = shape.frame_len();
    if frame_len > 0 {
        mask.labels_mut()
            .par_chunks_mut(frame_len)
            .enumerate()
            .try_for_each(|(t, slot)| {
                let rows = grouped.get(&t).map_or(&[][..], Vec::as_slice);
                let frame = frame::slice_frame_grouped(field, tracks, rows, t)?;
                let range = match scope {
                    RangeScope::Global => global_range,
                    RangeScope::PerFrame => ValueRange::of(frame.values, frame.missing),
                };
                let labels = segment_frame(&frame, params, range, grower.as_ref())?;
                assemble_frame(slot, &labels)
            })?;
    }

    info!(
        "Segmentation of '{}' complete: {} labelled cells",
        field.name(),
        mask.labelled_cells()
    );
    Ok(mask)
}

/// Run seeding, cost construction and growth on one frame
///
/// `range` is the value range the cost surface is scaled against.
///
/// # Errors
///
/// Propagates `OutOfRange` from seeding and `SolverFailed` from growth.
pub fn segment_frame(
    frame: &Frame<'_>,
    params: &SegmentationParams,
    range: Option<ValueRange>,
    grower: &dyn GrowthAlgorithm,
) -> Result<Vec<u32>> {
    let seeding = seed_markers(frame, params)?;
    if seeding.markers.is_empty() {
        if !frame.tracks.is_empty() && seeding.rejected_rows < frame.tracks.len() {
            warn!(
                "Frame {}: all {} track rows fall outside the threshold region",
                frame.index,
                frame.tracks.len()
            );
        }
        return Ok(vec![BACKGROUND; frame.shape.len()]);
    }

    let cost = build_cost_surface(frame, &seeding.unmasked, params.target, range);
    let labels = grower.grow(frame.index, &cost, &seeding.markers, &seeding.unmasked)?;
    debug!(
        "Frame {}: {} track rows, {} seed cells, {} labelled cells",
        frame.index,
        frame.tracks.len(),
        seeding.markers.seed_count(),
        labels.iter().filter(|&&label| label != BACKGROUND).count()
    );
    Ok(labels)
}

fn check_level(field: &Field, params: &SegmentationParams) -> Result<()> {
    let Some(level) = &params.level else {
        return Ok(());
    };
    if !field.is_volumetric() {
        return Err(SegmentationError::invalid_argument(
            "level",
            "only applies to volumetric fields",
        ));
    }
    let nz = field.shape().nz;
    if level.end > nz {
        return Err(SegmentationError::invalid_argument(
            "level",
            format!("{}..{} exceeds {} vertical levels", level.start, level.end, nz),
        ));
    }
    Ok(())
}
