//! Region growing from markers
//!
//! The core abstraction is the `GrowthAlgorithm` trait. A growth algorithm
//! receives the cost surface, the markers and the threshold mask of one frame and
//! returns a label per cell:
//!
//! - every marker cell keeps its particle identifier
//! - a cell outside the mask, or not connected to any marker through masked
//!   cells, stays 0
//! - every other reachable cell gets exactly one particle identifier
//!
//! Two implementations are provided:
//!
//! 1. [`Watershed`]: priority flood in order of increasing cost
//! 2. [`RandomWalker`]: diffusion-based assignment by random-walk arrival probability

mod random_walker;
mod watershed;

pub use random_walker::RandomWalker;
pub use watershed::Watershed;

use super::cost::CostSurface;
use super::markers::MarkerArray;
use crate::config::{Method, SegmentationParams};
use crate::error::Result;
use crate::grid::{FrameShape, BACKGROUND};
use std::collections::VecDeque;

/// Backend-agnostic interface for growing labelled regions from markers
pub trait GrowthAlgorithm: Send + Sync {
    /// Grow labels over one frame
    ///
    /// # Arguments
    ///
    /// * `frame` - Time index, used for diagnostics
    /// * `cost` - Cost surface, lower is preferred
    /// * `markers` - Seed labels; every non-zero cell must lie inside `unmasked`
    /// * `unmasked` - Cells growth may enter
    ///
    /// # Returns
    ///
    /// Labels in `(z, y, x)` row-major order
    ///
    /// # Errors
    ///
    /// Returns `SolverFailed` if the algorithm cannot produce a labelling.
    fn grow(
        &self,
        frame: usize,
        cost: &CostSurface,
        markers: &MarkerArray,
        unmasked: &[bool],
    ) -> Result<Vec<u32>>;

    /// Short name for logging
    fn name(&self) -> &'static str;
}

/// Create the growth algorithm selected by `params.method`
#[must_use]
pub fn create_growth_algorithm(params: &SegmentationParams) -> Box<dyn GrowthAlgorithm> {
    match params.method {
        Method::Watershed => Box::new(Watershed::new(f64::from(params.compactness))),
        Method::RandomWalker => Box::new(RandomWalker::new(params.random_walker)),
    }
}

/// Cells connected to at least one marker through unmasked cells
///
/// Breadth-first search over face neighbours starting from every marker.
pub(crate) fn reachable_from_markers(
    shape: FrameShape,
    markers: &MarkerArray,
    unmasked: &[bool],
) -> Vec<bool> {
    let mut reached = vec![false; shape.len()];
    let mut queue: VecDeque<usize> = VecDeque::new();
    for (index, _) in markers.seeds() {
        if unmasked[index] && !reached[index] {
            reached[index] = true;
            queue.push_back(index);
        }
    }
    while let Some(index) = queue.pop_front() {
        shape.for_each_neighbor(index, |n| {
            if unmasked[n] && !reached[n] {
                reached[n] = true;
                queue.push_back(n);
            }
        });
    }
    reached
}

/// Marker labels copied into a fresh output buffer
pub(crate) fn seeded_output(markers: &MarkerArray) -> Vec<u32> {
    let mut output = vec![BACKGROUND; markers.labels().len()];
    for (index, label) in markers.seeds() {
        output[index] = label;
    }
    output
}
