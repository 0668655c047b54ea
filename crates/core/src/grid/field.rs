//! Real-valued time-indexed field

use super::coords::Coordinates;
use super::shape::GridShape;
use crate::error::{Result, SegmentationError};
use serde::{Deserialize, Serialize};

/// Time-indexed field of real-valued measurements (e.g. cloud-water content)
///
/// Values are stored flat in `(t, z, y, x)` row-major order. An optional
/// missing mask marks cells as invalid without altering their values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    name: String,
    units: Option<String>,
    coords: Coordinates,
    data: Vec<f32>,
    missing: Option<Vec<bool>>,
}

impl Field {
    /// Create a field from coordinates and values
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` if `data` does not match the coordinate lengths, or
    /// any error from [`Coordinates::validate`].
    pub fn new(
        name: impl Into<String>,
        units: Option<&str>,
        coords: Coordinates,
        data: Vec<f32>,
    ) -> Result<Self> {
        coords.validate()?;
        let shape = coords.shape();
        if data.len() != shape.len() {
            return Err(SegmentationError::shape_mismatch(
                format!("{} values for shape {shape}", shape.len()),
                data.len(),
            ));
        }
        Ok(Self {
            name: name.into(),
            units: units.map(str::to_owned),
            coords,
            data,
            missing: None,
        })
    }

    /// Planar field with index coordinates
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` if `data.len() != nt * ny * nx`.
    pub fn planar(
        name: impl Into<String>,
        units: Option<&str>,
        (nt, ny, nx): (usize, usize, usize),
        data: Vec<f32>,
    ) -> Result<Self> {
        Self::new(name, units, Coordinates::planar(nt, ny, nx), data)
    }

    /// Volumetric field with index coordinates
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` if `data.len() != nt * nz * ny * nx`.
    pub fn volumetric(
        name: impl Into<String>,
        units: Option<&str>,
        (nt, nz, ny, nx): (usize, usize, usize, usize),
        data: Vec<f32>,
    ) -> Result<Self> {
        Self::new(name, units, Coordinates::volumetric(nt, nz, ny, nx), data)
    }

    /// Attach a missing-cell mask (`true` = missing)
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` if the mask length differs from the data length.
    pub fn with_missing(mut self, missing: Vec<bool>) -> Result<Self> {
        if missing.len() != self.data.len() {
            return Err(SegmentationError::shape_mismatch(
                self.data.len(),
                missing.len(),
            ));
        }
        self.missing = Some(missing);
        Ok(self)
    }

    /// Field name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field units
    #[must_use]
    pub fn units(&self) -> Option<&str> {
        self.units.as_deref()
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

    /// Whether the field has a vertical axis
    #[must_use]
    pub fn is_volumetric(&self) -> bool {
        self.coords.is_volumetric()
    }

    /// All values in `(t, z, y, x)` row-major order
    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.data
    }

    /// Missing-cell mask, if any
    #[must_use]
    pub fn missing(&self) -> Option<&[bool]> {
        self.missing.as_deref()
    }

    /// Whether the cell at flat `index` is marked missing
    #[must_use]
    pub fn is_missing(&self, index: usize) -> bool {
        self.missing.as_ref().is_some_and(|m| m[index])
    }

    /// Value at `(t, z, y, x)`, or `None` if the cell is missing
    #[must_use]
    pub fn get(&self, t: usize, z: usize, y: usize, x: usize) -> Option<f32> {
        let index = self.shape().index(t, z, y, x);
        (!self.is_missing(index)).then(|| self.data[index])
    }

    /// Values of frame `t`
    ///
    /// # Panics
    ///
    /// Panics if `t` is outside the time axis
    #[must_use]
    pub fn frame_values(&self, t: usize) -> &[f32] {
        let len = self.shape().frame_len();
        &self.data[t * len..(t + 1) * len]
    }

    /// Missing-cell mask of frame `t`, if the field has one
    #[must_use]
    pub fn frame_missing(&self, t: usize) -> Option<&[bool]> {
        let len = self.shape().frame_len();
        self.missing.as_ref().map(|m| &m[t * len..(t + 1) * len])
    }

    /// Copy of this field with additional cells marked missing
    ///
    /// Values are never touched; `mark(i)` returning `true` marks flat index `i`.
    pub(crate) fn masked_where(&self, mut mark: impl FnMut(usize) -> bool) -> Self {
        let missing = (0..self.data.len())
            .map(|i| self.is_missing(i) || mark(i))
            .collect();
        Self {
            name: self.name.clone(),
            units: self.units.clone(),
            coords: self.coords.clone(),
            data: self.data.clone(),
            missing: Some(missing),
        }
    }
}
