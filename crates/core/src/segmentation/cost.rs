//! Cost surface construction
//!
//! The field is rescaled into a small unsigned integer surface that is lowest at
//! the favoured extremum. Cells outside the threshold mask get a sentinel above
//! every in-mask cost so growth cannot cross the mask boundary.
//!
//! # Scaling
//!
//! ```text
//! maximum: cost = BASE - (value - min) * SCALE / (max - min)
//! minimum: cost = BASE - (max - value) * SCALE / (max - min)
//! ```
//!
//! In-mask costs therefore lie in `[BASE - SCALE, BASE]`, strictly below
//! `SENTINEL`. A degenerate range (`max == min`) gives every in-mask cell the
//! constant `BASE - SCALE`.

use super::frame::Frame;
use crate::config::Target;
use crate::error::{Result, SegmentationError};
use crate::grid::{Field, FrameShape};
use tracing::debug;

/// Range of in-mask cost values
pub const COST_SCALE: f64 = 1000.0;

/// Cost of cells outside the threshold mask
pub const COST_SENTINEL: u16 = 2000;

/// Cost offset for planar fields
pub const PLANAR_COST_BASE: f64 = 1000.0;

/// Cost offset for volumetric fields
pub const VOLUMETRIC_COST_BASE: f64 = 1500.0;

/// Finite value range used for scaling
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange {
    /// Smallest finite value
    pub min: f32,
    /// Largest finite value
    pub max: f32,
}

impl ValueRange {
    /// Range of the finite, non-missing values in `values`, `None` if there are none
    #[must_use]
    pub fn of(values: &[f32], missing: Option<&[bool]>) -> Option<Self> {
        values
            .iter()
            .enumerate()
            .filter(|&(i, v)| v.is_finite() && !missing.is_some_and(|m| m[i]))
            .fold(None, |range, (_, &v)| {
                Some(match range {
                    None => Self { min: v, max: v },
                    Some(r) => Self {
                        min: r.min.min(v),
                        max: r.max.max(v),
                    },
                })
            })
    }

    /// Range over every frame of `field`
    #[must_use]
    pub fn of_field(field: &Field) -> Option<Self> {
        Self::of(field.values(), field.missing())
    }

    /// `max - min` in double precision
    #[must_use]
    pub fn span(&self) -> f64 {
        f64::from(self.max) - f64::from(self.min)
    }

    /// Whether scaling by this range would divide by zero
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        !(self.span() > 0.0 && self.span().is_finite())
    }
}

/// Maps a field value to its distance from the favoured extremum
///
/// Returns a fraction in `[0, 1]`: 1 at the favoured extremum, 0 at the opposite
/// end of the range.
pub trait CostFunction {
    /// Closeness of `value` to the favoured extremum of `range`
    fn closeness(&self, value: f32, range: ValueRange) -> f64;
}

impl CostFunction for Target {
    #[inline]
    fn closeness(&self, value: f32, range: ValueRange) -> f64 {
        let value = f64::from(value);
        match self {
            Self::Maximum => (value - f64::from(range.min)) / range.span(),
            Self::Minimum => (f64::from(range.max) - value) / range.span(),
        }
    }
}

/// Base offset by dimensionality
#[must_use]
pub const fn cost_base(volumetric: bool) -> f64 {
    if volumetric {
        VOLUMETRIC_COST_BASE
    } else {
        PLANAR_COST_BASE
    }
}

/// Quantised cost surface of one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostSurface {
    shape: FrameShape,
    costs: Vec<u16>,
}

impl CostSurface {
    /// Wrap precomputed costs
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` if `costs.len()` differs from the frame size.
    pub fn from_costs(shape: FrameShape, costs: Vec<u16>) -> Result<Self> {
        if costs.len() != shape.len() {
            return Err(SegmentationError::shape_mismatch(shape.len(), costs.len()));
        }
        Ok(Self { shape, costs })
    }

    /// Frame shape
    #[must_use]
    pub fn shape(&self) -> FrameShape {
        self.shape
    }

    /// Costs in `(z, y, x)` row-major order
    #[must_use]
    pub fn costs(&self) -> &[u16] {
        &self.costs
    }

    /// Cost at flat index
    #[inline]
    #[must_use]
    pub fn at(&self, index: usize) -> u16 {
        self.costs[index]
    }
}

/// Build the cost surface of `frame`
///
/// `range` is the value range to scale against: the whole field's range or this
/// frame's own, depending on the configured scope. `None` (no finite values)
/// is treated like a degenerate range.
#[must_use]
pub fn build_cost_surface(
    frame: &Frame<'_>,
    unmasked: &[bool],
    target: Target,
    range: Option<ValueRange>,
) -> CostSurface {
    let base = cost_base(frame.volumetric);
    let range = range.filter(|r| !r.is_degenerate());
    if range.is_none() {
        debug!(
            "Frame {}: degenerate value range, using constant in-mask cost",
            frame.index
        );
    }

    let costs = frame
        .values
        .iter()
        .zip(unmasked)
        .map(|(&value, &inside)| {
            if !inside {
                return COST_SENTINEL;
            }
            let closeness = range.map_or(1.0, |r| target.closeness(value, r).clamp(0.0, 1.0));
            (base - closeness * COST_SCALE) as u16
        })
        .collect();

    CostSurface {
        shape: frame.shape,
        costs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmentation::frame::slice_frame;
    use crate::tracks::TrackTable;

    fn frame_of(field: &Field) -> Frame<'_> {
        // Tracks are irrelevant to the cost surface
        static EMPTY: std::sync::OnceLock<TrackTable> = std::sync::OnceLock::new();
        slice_frame(field, EMPTY.get_or_init(TrackTable::default), 0).unwrap()
    }

    #[test]
    fn test_from_costs_rejects_wrong_length() {
        let shape = FrameShape::new(1, 2, 2);
        assert!(CostSurface::from_costs(shape, vec![0; 4]).is_ok());
        assert_eq!(
            CostSurface::from_costs(shape, vec![0; 3]).unwrap_err(),
            SegmentationError::shape_mismatch(4, 3)
        );
    }

    #[test]
    fn test_value_range_ignores_non_finite_and_missing() {
        let values = [1.0, f32::NAN, 5.0, -2.0, f32::INFINITY];
        let range = ValueRange::of(&values, None).unwrap();
        assert_eq!(range.min, -2.0);
        assert_eq!(range.max, 5.0);

        let missing = [false, false, true, true, false];
        let range = ValueRange::of(&values, Some(&missing)).unwrap();
        assert_eq!((range.min, range.max), (1.0, 1.0));
        assert!(range.is_degenerate());

        assert!(ValueRange::of(&[f32::NAN], None).is_none());
    }

    #[test]
    fn test_maximum_cost_decreases_toward_maximum() {
        let field = Field::planar("w", None, (1, 1, 3), vec![0.0, 5.0, 10.0]).unwrap();
        let frame = frame_of(&field);
        let range = ValueRange::of(frame.values, None);
        let surface = build_cost_surface(&frame, &[true; 3], Target::Maximum, range);
        assert_eq!(surface.costs(), &[1000, 500, 0]);
    }

    #[test]
    fn test_minimum_cost_decreases_toward_minimum() {
        let field = Field::planar("w", None, (1, 1, 3), vec![0.0, 5.0, 10.0]).unwrap();
        let frame = frame_of(&field);
        let range = ValueRange::of(frame.values, None);
        let surface = build_cost_surface(&frame, &[true; 3], Target::Minimum, range);
        assert_eq!(surface.costs(), &[0, 500, 1000]);
    }

    #[test]
    fn test_volumetric_base_offset() {
        let field = Field::volumetric("w", None, (1, 1, 1, 2), vec![0.0, 10.0]).unwrap();
        let frame = frame_of(&field);
        let range = ValueRange::of(frame.values, None);
        let surface = build_cost_surface(&frame, &[true; 2], Target::Maximum, range);
        assert_eq!(surface.costs(), &[1500, 500]);
    }

    #[test]
    fn test_masked_cells_get_sentinel() {
        let field = Field::planar("w", None, (1, 1, 3), vec![0.0, 5.0, 10.0]).unwrap();
        let frame = frame_of(&field);
        let range = ValueRange::of(frame.values, None);
        let surface =
            build_cost_surface(&frame, &[false, true, true], Target::Maximum, range);
        assert_eq!(surface.at(0), COST_SENTINEL);
        assert!(surface.costs()[1..].iter().all(|&c| c < COST_SENTINEL));
    }

    #[test]
    fn test_degenerate_range_gives_constant_cost() {
        let field = Field::planar("w", None, (1, 2, 2), vec![3.0; 4]).unwrap();
        let frame = frame_of(&field);
        let range = ValueRange::of(frame.values, None);
        let surface = build_cost_surface(&frame, &[true, true, false, true], Target::Maximum, range);
        assert_eq!(surface.costs(), &[0, 0, COST_SENTINEL, 0]);
    }

    #[test]
    fn test_values_outside_global_range_are_clamped() {
        // A frame scaled against a narrower range must not wrap the u16 cast
        let field = Field::planar("w", None, (1, 1, 2), vec![-5.0, 20.0]).unwrap();
        let frame = frame_of(&field);
        let range = Some(ValueRange { min: 0.0, max: 10.0 });
        let surface = build_cost_surface(&frame, &[true; 2], Target::Maximum, range);
        assert_eq!(surface.costs(), &[1000, 0]);
    }
}
