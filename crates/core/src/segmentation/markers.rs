//! Marker seeding from track coordinates
//!
//! Every track row of a frame stamps its particle identifier at its rounded cell.
//! Rows are applied in table order, so a later row overwrites an earlier one on
//! the same cell. Markers that land outside the threshold region are cleared
//! afterwards: a seed there has nothing to grow into.

use super::frame::Frame;
use crate::config::{LevelSeeding, SegmentationParams};
use crate::error::{Result, SegmentationError};
use crate::grid::{Axis, FrameShape, BACKGROUND};
use crate::tracks::TrackRow;
use tracing::{trace, warn};

/// Sparse seed array of one frame, 0 = no seed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerArray {
    shape: FrameShape,
    labels: Vec<u32>,
}

impl MarkerArray {
    /// Empty marker array
    #[must_use]
    pub fn new(shape: FrameShape) -> Self {
        Self {
            shape,
            labels: vec![BACKGROUND; shape.len()],
        }
    }

    /// Marker array from precomputed labels
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` if `labels.len()` differs from the frame size.
    pub fn from_labels(shape: FrameShape, labels: Vec<u32>) -> Result<Self> {
        if labels.len() != shape.len() {
            return Err(SegmentationError::shape_mismatch(shape.len(), labels.len()));
        }
        Ok(Self { shape, labels })
    }

    /// Frame shape
    #[must_use]
    pub fn shape(&self) -> FrameShape {
        self.shape
    }

    /// Seed labels in `(z, y, x)` row-major order
    #[must_use]
    pub fn labels(&self) -> &[u32] {
        &self.labels
    }

    /// Seeded cells as `(flat index, particle)`, in index order
    pub fn seeds(&self) -> impl Iterator<Item = (usize, u32)> + '_ {
        self.labels
            .iter()
            .enumerate()
            .filter(|(_, &label)| label != BACKGROUND)
            .map(|(i, &label)| (i, label))
    }

    /// Number of seeded cells
    #[must_use]
    pub fn seed_count(&self) -> usize {
        self.seeds().count()
    }

    /// Whether no cell is seeded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.iter().all(|&label| label == BACKGROUND)
    }

    fn stamp(&mut self, index: usize, particle: u32) {
        self.labels[index] = particle;
    }
}

/// Result of seeding one frame
#[derive(Debug, Clone)]
pub struct Seeding {
    /// Seeds inside the threshold region
    pub markers: MarkerArray,
    /// Cells that satisfy the threshold and are not missing
    pub unmasked: Vec<bool>,
    /// Track rows skipped because their coordinates fell outside the frame
    pub rejected_rows: usize,
}

/// Threshold mask of one frame
///
/// A cell is unmasked when it strictly passes `threshold` in the target's
/// direction and is not marked missing.
#[must_use]
pub fn threshold_mask(frame: &Frame<'_>, params: &SegmentationParams) -> Vec<bool> {
    frame
        .values
        .iter()
        .enumerate()
        .map(|(i, &value)| {
            let missing = frame.missing.is_some_and(|m| m[i]);
            !missing && params.target.admits(value, params.threshold)
        })
        .collect()
}

/// Round a cell coordinate, `None` if the cell lies outside `0..extent`
fn cell_index(coordinate: f32, extent: usize) -> Option<usize> {
    let rounded = coordinate.round();
    if rounded.is_finite() && rounded >= 0.0 && (rounded as usize) < extent {
        Some(rounded as usize)
    } else {
        None
    }
}

fn locate(
    frame: &Frame<'_>,
    row: &TrackRow,
    axis: Axis,
    coordinate: f32,
    extent: usize,
) -> Result<usize> {
    cell_index(coordinate, extent).ok_or(SegmentationError::OutOfRange {
        frame: frame.index,
        particle: row.particle,
        axis,
        coordinate,
        extent,
    })
}

/// Cells stamped by one track row
///
/// Planar frames stamp `(y, x)`. Volumetric rows with a `z` stamp `(z, y, x)`;
/// rows without one stamp their whole column. Under
/// [`LevelSeeding::WithinLevel`] only levels inside `level` are stamped.
fn row_cells(
    frame: &Frame<'_>,
    row: &TrackRow,
    params: &SegmentationParams,
) -> Result<Vec<usize>> {
    let shape = frame.shape;
    let y = locate(frame, row, Axis::Y, row.y, shape.ny)?;
    let x = locate(frame, row, Axis::X, row.x, shape.nx)?;
    if !frame.volumetric {
        return Ok(vec![shape.index(0, y, x)]);
    }

    let levels = match (&params.level, params.level_seeding) {
        (Some(level), LevelSeeding::WithinLevel) => level.start..level.end.min(shape.nz),
        _ => 0..shape.nz,
    };
    match row.z {
        Some(z) => {
            let z = locate(frame, row, Axis::Vertical, z, shape.nz)?;
            if levels.contains(&z) {
                Ok(vec![shape.index(z, y, x)])
            } else {
                trace!(
                    "Frame {}: particle {} seeded at level {} outside {:?}, not stamped",
                    frame.index,
                    row.particle,
                    z,
                    levels
                );
                Ok(Vec::new())
            }
        }
        None => Ok(levels.map(|z| shape.index(z, y, x)).collect()),
    }
}

/// Build the marker array and threshold mask for one frame
///
/// # Errors
///
/// Returns `OutOfRange` for a track row whose rounded coordinate lies outside
/// the frame, unless `skip_out_of_range_seeds` is set, in which case the row is
/// skipped with a warning.
pub fn seed_markers(frame: &Frame<'_>, params: &SegmentationParams) -> Result<Seeding> {
    let unmasked = threshold_mask(frame, params);
    let mut markers = MarkerArray::new(frame.shape);
    let mut rejected_rows = 0;

    for row in &frame.tracks {
        let cells = match row_cells(frame, row, params) {
            Ok(cells) => cells,
            Err(err @ SegmentationError::OutOfRange { .. }) if params.skip_out_of_range_seeds => {
                warn!("Skipping track row: {}", err);
                rejected_rows += 1;
                continue;
            }
            Err(err) => return Err(err),
        };
        for index in cells {
            markers.stamp(index, row.particle);
        }
    }

    for (label, &inside) in markers.labels.iter_mut().zip(&unmasked) {
        if !inside {
            *label = BACKGROUND;
        }
    }

    Ok(Seeding {
        markers,
        unmasked,
        rejected_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Target;
    use crate::grid::Field;
    use crate::segmentation::frame::slice_frame;
    use crate::tracks::TrackTable;

    fn blob_field() -> Field {
        let mut data = vec![0.0; 25];
        data[2 * 5 + 2] = 10.0;
        data[2 * 5 + 3] = 8.0;
        Field::planar("w", None, (1, 5, 5), data).unwrap()
    }

    #[test]
    fn test_from_labels_rejects_wrong_length() {
        let shape = FrameShape::new(1, 1, 3);
        let markers = MarkerArray::from_labels(shape, vec![0, 2, 0]).unwrap();
        assert_eq!(markers.seeds().collect::<Vec<_>>(), vec![(1, 2)]);
        assert_eq!(
            MarkerArray::from_labels(shape, vec![0; 5]).unwrap_err(),
            SegmentationError::shape_mismatch(3, 5)
        );
    }

    #[test]
    fn test_threshold_mask_directions() {
        let field = blob_field();
        let tracks = TrackTable::default();
        let frame = slice_frame(&field, &tracks, 0).unwrap();

        let above = threshold_mask(&frame, &SegmentationParams::new(5.0, Target::Maximum));
        assert_eq!(above.iter().filter(|&&b| b).count(), 2);

        let below = threshold_mask(&frame, &SegmentationParams::new(5.0, Target::Minimum));
        assert_eq!(below.iter().filter(|&&b| b).count(), 23);
    }

    #[test]
    fn test_seed_inside_mask_is_kept() {
        let field = blob_field();
        let tracks = TrackTable::new(vec![TrackRow::new(0, 1, 2.0, 2.0)]);
        let frame = slice_frame(&field, &tracks, 0).unwrap();
        let seeding = seed_markers(&frame, &SegmentationParams::new(5.0, Target::Maximum)).unwrap();
        assert_eq!(seeding.markers.seeds().collect::<Vec<_>>(), vec![(12, 1)]);
    }

    #[test]
    fn test_seed_outside_mask_is_cleared() {
        let field = blob_field();
        let tracks = TrackTable::new(vec![TrackRow::new(0, 1, 0.0, 0.0)]);
        let frame = slice_frame(&field, &tracks, 0).unwrap();
        let seeding = seed_markers(&frame, &SegmentationParams::new(5.0, Target::Maximum)).unwrap();
        assert!(seeding.markers.is_empty());
    }

    #[test]
    fn test_coordinates_round_to_nearest() {
        let field = blob_field();
        // (x=2.6, y=1.7) rounds to (3, 2)
        let tracks = TrackTable::new(vec![TrackRow::new(0, 4, 2.6, 1.7)]);
        let frame = slice_frame(&field, &tracks, 0).unwrap();
        let seeding = seed_markers(&frame, &SegmentationParams::new(5.0, Target::Maximum)).unwrap();
        assert_eq!(seeding.markers.seeds().collect::<Vec<_>>(), vec![(13, 4)]);
    }

    #[test]
    fn test_colliding_rows_last_write_wins() {
        let field = blob_field();
        let tracks = TrackTable::new(vec![
            TrackRow::new(0, 1, 2.0, 2.0),
            TrackRow::new(0, 2, 2.2, 1.9),
        ]);
        let frame = slice_frame(&field, &tracks, 0).unwrap();
        let seeding = seed_markers(&frame, &SegmentationParams::new(5.0, Target::Maximum)).unwrap();
        assert_eq!(seeding.markers.seeds().collect::<Vec<_>>(), vec![(12, 2)]);
    }

    #[test]
    fn test_out_of_range_row_is_rejected() {
        let field = blob_field();
        let tracks = TrackTable::new(vec![TrackRow::new(0, 1, 4.6, 2.0)]);
        let frame = slice_frame(&field, &tracks, 0).unwrap();
        let params = SegmentationParams::new(5.0, Target::Maximum);
        assert!(matches!(
            seed_markers(&frame, &params),
            Err(SegmentationError::OutOfRange {
                axis: Axis::X,
                extent: 5,
                ..
            })
        ));

        let skipping = SegmentationParams {
            skip_out_of_range_seeds: true,
            ..params
        };
        let seeding = seed_markers(&frame, &skipping).unwrap();
        assert_eq!(seeding.rejected_rows, 1);
        assert!(seeding.markers.is_empty());
    }

    #[test]
    fn test_negative_coordinate_is_out_of_range() {
        assert_eq!(cell_index(-0.4, 5), Some(0));
        assert_eq!(cell_index(-0.6, 5), None);
        assert_eq!(cell_index(f32::NAN, 5), None);
    }

    #[test]
    fn test_missing_cells_are_masked() {
        let field = blob_field();
        let mut missing = vec![false; 25];
        missing[12] = true;
        let field = field.with_missing(missing).unwrap();
        let tracks = TrackTable::new(vec![TrackRow::new(0, 1, 2.0, 2.0)]);
        let frame = slice_frame(&field, &tracks, 0).unwrap();
        let seeding = seed_markers(&frame, &SegmentationParams::new(5.0, Target::Maximum)).unwrap();
        assert!(!seeding.unmasked[12]);
        assert!(seeding.markers.is_empty());
    }

    fn column_field() -> Field {
        // 4 levels of 3x3, whole column at (1, 1) above threshold
        let mut data = vec![0.0; 36];
        for z in 0..4 {
            data[z * 9 + 4] = 1.0;
        }
        Field::volumetric("qc", None, (1, 4, 3, 3), data).unwrap()
    }

    #[test]
    fn test_volumetric_row_without_z_stamps_column() {
        let field = column_field();
        let tracks = TrackTable::new(vec![TrackRow::new(0, 3, 1.0, 1.0)]);
        let frame = slice_frame(&field, &tracks, 0).unwrap();
        let seeding = seed_markers(&frame, &SegmentationParams::new(0.5, Target::Maximum)).unwrap();
        let seeds: Vec<usize> = seeding.markers.seeds().map(|(i, _)| i).collect();
        assert_eq!(seeds, vec![4, 13, 22, 31]);
    }

    #[test]
    fn test_volumetric_row_with_z_stamps_point() {
        let field = column_field();
        let tracks = TrackTable::new(vec![TrackRow::new(0, 3, 1.0, 1.0).with_z(2.0)]);
        let frame = slice_frame(&field, &tracks, 0).unwrap();
        let seeding = seed_markers(&frame, &SegmentationParams::new(0.5, Target::Maximum)).unwrap();
        assert_eq!(seeding.markers.seeds().collect::<Vec<_>>(), vec![(22, 3)]);
    }

    #[test]
    fn test_level_seed_all_ignores_level() {
        let field = column_field();
        let tracks = TrackTable::new(vec![TrackRow::new(0, 3, 1.0, 1.0).with_z(3.0)]);
        let frame = slice_frame(&field, &tracks, 0).unwrap();
        let params =
            SegmentationParams::new(0.5, Target::Maximum).with_level(0..2, LevelSeeding::SeedAll);
        let seeding = seed_markers(&frame, &params).unwrap();
        assert_eq!(seeding.markers.seed_count(), 1);
    }

    #[test]
    fn test_level_within_restricts_seeds() {
        let field = column_field();
        let params = SegmentationParams::new(0.5, Target::Maximum)
            .with_level(1..3, LevelSeeding::WithinLevel);

        let point = TrackTable::new(vec![TrackRow::new(0, 3, 1.0, 1.0).with_z(3.0)]);
        let frame = slice_frame(&field, &point, 0).unwrap();
        assert!(seed_markers(&frame, &params).unwrap().markers.is_empty());

        let column = TrackTable::new(vec![TrackRow::new(0, 3, 1.0, 1.0)]);
        let frame = slice_frame(&field, &column, 0).unwrap();
        let seeds: Vec<usize> = seed_markers(&frame, &params)
            .unwrap()
            .markers
            .seeds()
            .map(|(i, _)| i)
            .collect();
        assert_eq!(seeds, vec![13, 22]);
    }
}
