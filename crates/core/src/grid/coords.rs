//! Coordinate metadata carried by fields and label masks
//!
//! A field has one dimension coordinate per axis (`time`, optional `vertical`,
//! `y`, `x`) and any number of auxiliary coordinates derived over a subset of
//! axes (for example a 2D latitude over `(y, x)` or an altitude over
//! `(vertical, y, x)`).

use super::shape::{Axis, GridShape};
use crate::error::{Result, SegmentationError};
use serde::{Deserialize, Serialize};

/// One-dimensional coordinate along a single axis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimCoord {
    /// Coordinate name (e.g. "time", "model_level_number")
    pub name: String,
    /// Units, if any
    pub units: Option<String>,
    /// Coordinate value for each index along the axis
    pub points: Vec<f64>,
}

impl DimCoord {
    /// Create a coordinate with explicit points
    pub fn new(name: impl Into<String>, units: Option<&str>, points: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            units: units.map(str::to_owned),
            points,
        }
    }

    /// Create an index coordinate `0, 1, ..., len - 1`
    pub fn indices(name: impl Into<String>, len: usize) -> Self {
        Self::new(name, None, (0..len).map(|i| i as f64).collect())
    }

    /// Number of points
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the coordinate has no points
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Collapse to a single point at the midpoint of the first and last points
    #[must_use]
    pub fn collapsed(&self) -> Self {
        let point = match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => vec![0.5 * (first + last)],
            _ => Vec::new(),
        };
        Self {
            name: self.name.clone(),
            units: self.units.clone(),
            points: point,
        }
    }
}

/// Auxiliary (derived) coordinate spanning one or more axes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuxCoord {
    /// Coordinate name (e.g. "latitude", "geopotential_height")
    pub name: String,
    /// Units, if any
    pub units: Option<String>,
    /// Axes spanned, in storage order
    pub axes: Vec<Axis>,
    /// Values in row-major order over `axes`
    pub values: Vec<f64>,
}

impl AuxCoord {
    /// Create an auxiliary coordinate
    pub fn new(
        name: impl Into<String>,
        units: Option<&str>,
        axes: Vec<Axis>,
        values: Vec<f64>,
    ) -> Self {
        Self {
            name: name.into(),
            units: units.map(str::to_owned),
            axes,
            values,
        }
    }

    /// Whether this coordinate depends on `axis`
    #[must_use]
    pub fn spans(&self, axis: Axis) -> bool {
        self.axes.contains(&axis)
    }
}

/// Complete coordinate set of a field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Time coordinate (one point per frame)
    pub time: DimCoord,
    /// Vertical coordinate; `None` for planar fields
    pub vertical: Option<DimCoord>,
    /// Row coordinate
    pub y: DimCoord,
    /// Column coordinate
    pub x: DimCoord,
    /// Derived coordinates
    pub aux: Vec<AuxCoord>,
}

impl Coordinates {
    /// Index coordinates for a planar field
    pub fn planar(nt: usize, ny: usize, nx: usize) -> Self {
        Self {
            time: DimCoord::indices("time", nt),
            vertical: None,
            y: DimCoord::indices("y", ny),
            x: DimCoord::indices("x", nx),
            aux: Vec::new(),
        }
    }

    /// Index coordinates for a volumetric field
    pub fn volumetric(nt: usize, nz: usize, ny: usize, nx: usize) -> Self {
        Self {
            vertical: Some(DimCoord::indices("model_level_number", nz)),
            ..Self::planar(nt, ny, nx)
        }
    }

    /// Attach an auxiliary coordinate
    #[must_use]
    pub fn with_aux(mut self, aux: AuxCoord) -> Self {
        self.aux.push(aux);
        self
    }

    /// Shape described by the dimension coordinates
    #[must_use]
    pub fn shape(&self) -> GridShape {
        GridShape::new(
            self.time.len(),
            self.vertical.as_ref().map_or(1, DimCoord::len),
            self.y.len(),
            self.x.len(),
        )
    }

    /// Whether a vertical axis is present
    #[must_use]
    pub fn is_volumetric(&self) -> bool {
        self.vertical.is_some()
    }

    /// Check that every auxiliary coordinate matches the dimension lengths
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` if an auxiliary coordinate's value count differs from
    /// the product of its axes' extents, and `InvalidArgument` if it spans the
    /// vertical axis of a planar field.
    pub fn validate(&self) -> Result<()> {
        let shape = self.shape();
        for aux in &self.aux {
            if aux.spans(Axis::Vertical) && !self.is_volumetric() {
                return Err(SegmentationError::invalid_argument(
                    "coordinates",
                    format!("'{}' spans the vertical axis of a planar field", aux.name),
                ));
            }
            let expected: usize = aux.axes.iter().map(|&axis| shape.extent(axis)).product();
            if aux.values.len() != expected {
                return Err(SegmentationError::shape_mismatch(
                    format!("{expected} values for '{}'", aux.name),
                    aux.values.len(),
                ));
            }
        }
        Ok(())
    }

    /// Coordinates after collapsing `axis` to a single point
    ///
    /// The vertical coordinate is removed entirely, `y`/`x` keep their midpoint.
    /// Auxiliary coordinates depending on `axis` become ill-defined and are dropped.
    #[must_use]
    pub fn collapsed(&self, axis: Axis) -> Self {
        let mut coords = self.clone();
        match axis {
            Axis::Time => coords.time = self.time.collapsed(),
            Axis::Vertical => coords.vertical = None,
            Axis::Y => coords.y = self.y.collapsed(),
            Axis::X => coords.x = self.x.collapsed(),
        }
        coords.aux.retain(|aux| !aux.spans(axis));
        coords
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_planar_shape() {
        let coords = Coordinates::planar(4, 5, 6);
        assert_eq!(coords.shape(), GridShape::new(4, 1, 5, 6));
        assert!(!coords.is_volumetric());
    }

    #[test]
    fn test_volumetric_shape() {
        let coords = Coordinates::volumetric(2, 3, 5, 6);
        assert_eq!(coords.shape(), GridShape::new(2, 3, 5, 6));
        assert!(coords.is_volumetric());
    }

    #[test]
    fn test_validate_aux_length() {
        let coords = Coordinates::planar(1, 2, 3).with_aux(AuxCoord::new(
            "latitude",
            Some("degrees"),
            vec![Axis::Y, Axis::X],
            vec![0.0; 5],
        ));
        assert!(matches!(
            coords.validate(),
            Err(SegmentationError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_collapse_vertical_drops_dependent_aux() {
        let coords = Coordinates::volumetric(1, 2, 2, 2)
            .with_aux(AuxCoord::new(
                "altitude",
                Some("m"),
                vec![Axis::Vertical, Axis::Y, Axis::X],
                vec![0.0; 8],
            ))
            .with_aux(AuxCoord::new(
                "latitude",
                Some("degrees"),
                vec![Axis::Y, Axis::X],
                vec![0.0; 4],
            ));
        coords.validate().unwrap();

        let collapsed = coords.collapsed(Axis::Vertical);
        assert!(collapsed.vertical.is_none());
        assert_eq!(collapsed.aux.len(), 1);
        assert_eq!(collapsed.aux[0].name, "latitude");
        collapsed.validate().unwrap();
    }

    #[test]
    fn test_dim_coord_collapse_midpoint() {
        let coord = DimCoord::new("y", Some("m"), vec![100.0, 200.0, 300.0]);
        assert_eq!(coord.collapsed().points, vec![200.0]);
    }
}
