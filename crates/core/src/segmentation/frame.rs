//! Per-frame extraction of field values and track rows

use crate::error::{Result, SegmentationError};
use crate::grid::{Field, FrameShape};
use crate::tracks::{TrackRow, TrackTable};

/// Borrowed view of one time step
#[derive(Debug, Clone)]
pub struct Frame<'a> {
    /// Time index
    pub index: usize,
    /// Spatial shape
    pub shape: FrameShape,
    /// Whether the source field has a vertical axis
    pub volumetric: bool,
    /// Field values in `(z, y, x)` row-major order
    pub values: &'a [f32],
    /// Missing-cell mask of this frame, if the field has one
    pub missing: Option<&'a [bool]>,
    /// Track rows of this frame, in table order
    pub tracks: Vec<&'a TrackRow>,
}

/// Extract frame `index` of `field` together with its track rows
///
/// # Errors
///
/// Returns `FrameOutOfRange` if `index` is beyond the field's time axis.
pub fn slice_frame<'a>(
    field: &'a Field,
    tracks: &'a TrackTable,
    index: usize,
) -> Result<Frame<'a>> {
    let row_indices: Vec<usize> = tracks
        .rows()
        .iter()
        .enumerate()
        .filter(|(_, row)| row.frame == index)
        .map(|(i, _)| i)
        .collect();
    slice_frame_grouped(field, tracks, &row_indices, index)
}

/// Like [`slice_frame`] but with rows already grouped by frame
pub(crate) fn slice_frame_grouped<'a>(
    field: &'a Field,
    tracks: &'a TrackTable,
    row_indices: &[usize],
    index: usize,
) -> Result<Frame<'a>> {
    let shape = field.shape();
    if index >= shape.nt {
        return Err(SegmentationError::FrameOutOfRange {
            index,
            frames: shape.nt,
        });
    }
    let rows = tracks.rows();
    Ok(Frame {
        index,
        shape: shape.frame(),
        volumetric: field.is_volumetric(),
        values: field.frame_values(index),
        missing: field.frame_missing(index),
        tracks: row_indices.iter().map(|&i| &rows[i]).collect(),
    })
}
