//! Error types for the segmentation engine
//!
//! Every fallible operation in the crate returns [`Result`]. Errors are raised at
//! the boundary where the offending input is first seen, before any frame is
//! processed whenever the problem can be detected up front.

use crate::grid::Axis;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SegmentationError>;

/// Errors produced by segmentation and mask post-processing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SegmentationError {
    /// A parameter or tag was not acceptable.
    #[error("invalid argument '{parameter}': {reason}")]
    InvalidArgument {
        /// Name of the offending parameter
        parameter: &'static str,
        /// What was wrong with it
        reason: String,
    },

    /// A track coordinate rounded to a cell outside the frame.
    #[error(
        "track row for particle {particle} in frame {frame}: {axis:?} coordinate {coordinate} outside 0..{extent}"
    )]
    OutOfRange {
        /// Frame index of the rejected row
        frame: usize,
        /// Particle identifier of the rejected row
        particle: u32,
        /// Axis on which the coordinate fell outside the grid
        axis: Axis,
        /// The raw (unrounded) coordinate
        coordinate: f32,
        /// Number of cells along that axis
        extent: usize,
    },

    /// A time index beyond the field's time axis was requested.
    #[error("frame index {index} out of range for field with {frames} frames")]
    FrameOutOfRange {
        /// Requested time index
        index: usize,
        /// Number of frames in the field
        frames: usize,
    },

    /// Two arrays that must share a shape do not.
    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Expected shape or length, formatted
        expected: String,
        /// Actual shape or length, formatted
        actual: String,
    },

    /// The random-walker linear solve did not produce a solution.
    #[error("linear solver failed in frame {frame}: {reason}")]
    SolverFailed {
        /// Frame being processed
        frame: usize,
        /// Solver diagnostic
        reason: String,
    },
}

impl SegmentationError {
    /// Shorthand for [`SegmentationError::InvalidArgument`].
    pub fn invalid_argument(parameter: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            parameter,
            reason: reason.into(),
        }
    }

    /// Shorthand for [`SegmentationError::ShapeMismatch`].
    pub fn shape_mismatch(expected: impl ToString, actual: impl ToString) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_argument_message() {
        let err = SegmentationError::invalid_argument("target", "unknown target 'median'");
        assert_eq!(
            err.to_string(),
            "invalid argument 'target': unknown target 'median'"
        );
    }

    #[test]
    fn test_out_of_range_message_names_row() {
        let err = SegmentationError::OutOfRange {
            frame: 3,
            particle: 17,
            axis: Axis::X,
            coordinate: 12.7,
            extent: 10,
        };
        let msg = err.to_string();
        assert!(msg.contains("particle 17"));
        assert!(msg.contains("frame 3"));
        assert!(msg.contains("0..10"));
    }
}
