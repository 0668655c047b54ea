//! Integer label mask aligned with a field

use super::coords::Coordinates;
use super::field::Field;
use super::shape::GridShape;
use crate::error::{Result, SegmentationError};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// Name given to masks produced by segmentation
pub const SEGMENTATION_MASK_NAME: &str = "segmentation_mask";

/// Label of unlabelled background cells
pub const BACKGROUND: u32 = 0;

/// Time-indexed integer mask, 0 = background, positive = particle identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelMask {
    name: String,
    coords: Coordinates,
    labels: Vec<u32>,
}

impl LabelMask {
    /// All-background mask with the same shape and coordinates as `field`
    #[must_use]
    pub fn zeros_like(field: &Field) -> Self {
        Self::zeros(field.coords().clone())
    }

    /// All-background mask over `coords`
    #[must_use]
    pub fn zeros(coords: Coordinates) -> Self {
        let len = coords.shape().len();
        Self {
            name: SEGMENTATION_MASK_NAME.to_owned(),
            coords,
            labels: vec![BACKGROUND; len],
        }
    }

    /// Mask from existing labels
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` if `labels` does not match the coordinate lengths.
    pub fn from_labels(coords: Coordinates, labels: Vec<u32>) -> Result<Self> {
        coords.validate()?;
        let expected = coords.shape().len();
        if labels.len() != expected {
            return Err(SegmentationError::shape_mismatch(expected, labels.len()));
        }
        Ok(Self {
            name: SEGMENTATION_MASK_NAME.to_owned(),
            coords,
            labels,
        })
    }

    /// Mask name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Masks are dimensionless
    #[must_use]
    pub fn units(&self) -> &'static str {
        "1"
    }

    /// Coordinate metadata
    #[must_use]
    pub fn coords(&self) -> &Coordinates {
        &self.coords
    }

    /// Array shape
    #[must_use]
    pub fn shape(&self) -> GridShape {
        self.coords.shape()
    }

    /// Whether the mask has a vertical axis
    #[must_use]
    pub fn is_volumetric(&self) -> bool {
        self.coords.is_volumetric()
    }

    /// All labels in `(t, z, y, x)` row-major order
    #[must_use]
    pub fn labels(&self) -> &[u32] {
        &self.labels
    }

    pub(crate) fn labels_mut(&mut self) -> &mut [u32] {
        &mut self.labels
    }

    /// Label at `(t, z, y, x)`
    #[must_use]
    pub fn get(&self, t: usize, z: usize, y: usize, x: usize) -> u32 {
        self.labels[self.shape().index(t, z, y, x)]
    }

    /// Labels of frame `t`
    ///
    /// # Panics
    ///
    /// Panics if `t` is outside the time axis
    #[must_use]
    pub fn frame_labels(&self, t: usize) -> &[u32] {
        let len = self.shape().frame_len();
        &self.labels[t * len..(t + 1) * len]
    }

    /// Distinct non-background labels present in frame `t`
    #[must_use]
    pub fn particles_in_frame(&self, t: usize) -> FxHashSet<u32> {
        self.frame_labels(t)
            .iter()
            .copied()
            .filter(|&label| label != BACKGROUND)
            .collect()
    }

    /// Number of cells carrying `particle`
    #[must_use]
    pub fn count(&self, particle: u32) -> usize {
        self.labels.iter().filter(|&&label| label == particle).count()
    }

    /// Number of non-background cells
    #[must_use]
    pub fn labelled_cells(&self) -> usize {
        self.labels.iter().filter(|&&label| label != BACKGROUND).count()
    }

    /// Background cells as a missing-cell mask (`true` = background)
    #[must_use]
    pub fn background(&self) -> Vec<bool> {
        self.labels.iter().map(|&label| label == BACKGROUND).collect()
    }

    /// Error unless `field` has exactly this mask's shape
    pub(crate) fn check_aligned(&self, field: &Field) -> Result<()> {
        if field.shape() == self.shape() {
            Ok(())
        } else {
            Err(SegmentationError::shape_mismatch(
                self.shape(),
                field.shape(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeros_like_copies_coordinates() {
        let field = Field::volumetric("qc", Some("kg kg-1"), (2, 3, 4, 5), vec![1.0; 120]).unwrap();
        let mask = LabelMask::zeros_like(&field);
        assert_eq!(mask.shape(), field.shape());
        assert_eq!(mask.coords(), field.coords());
        assert_eq!(mask.name(), SEGMENTATION_MASK_NAME);
        assert_eq!(mask.units(), "1");
        assert_eq!(mask.labelled_cells(), 0);
    }

    #[test]
    fn test_particles_in_frame() {
        let coords = Coordinates::planar(2, 1, 4);
        let mask = LabelMask::from_labels(coords, vec![0, 3, 3, 5, 7, 0, 0, 0]).unwrap();
        let particles = mask.particles_in_frame(0);
        assert_eq!(particles.len(), 2);
        assert!(particles.contains(&3) && particles.contains(&5));
        assert_eq!(mask.count(3), 2);
    }

    #[test]
    fn test_from_labels_rejects_wrong_length() {
        let coords = Coordinates::planar(1, 2, 2);
        assert!(LabelMask::from_labels(coords, vec![0; 3]).is_err());
    }
}
