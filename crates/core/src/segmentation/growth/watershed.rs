//! Marker-controlled watershed
//!
//! Priority flood over the cost surface. All markers enter a min-heap first;
//! cells are then claimed in order of increasing priority, ties broken by
//! insertion order so the result does not depend on heap internals.
//!
//! # Compactness
//!
//! With `compactness > 0` the priority of a candidate cell becomes
//!
//! ```text
//! priority = cost + compactness * |cell - seed|
//! ```
//!
//! where `seed` is the marker cell its flood started from. Labels are then
//! committed when a cell is popped rather than when it is pushed, so a closer
//! seed can still win a cell that a farther one reached first.

use super::{seeded_output, GrowthAlgorithm};
use crate::error::Result;
use crate::grid::BACKGROUND;
use crate::segmentation::cost::CostSurface;
use crate::segmentation::markers::MarkerArray;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Heap entry; ordered so `BinaryHeap` pops the lowest `(priority, age)` first
#[derive(Debug, Clone, Copy)]
struct FloodItem {
    priority: f64,
    age: u64,
    index: usize,
    source: usize,
}

impl PartialEq for FloodItem {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FloodItem {}

impl PartialOrd for FloodItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloodItem {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap: reverse both keys
        other
            .priority
            .total_cmp(&self.priority)
            .then_with(|| other.age.cmp(&self.age))
    }
}

/// Priority-flood watershed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Watershed {
    compactness: f64,
}

impl Watershed {
    /// Create a watershed with the given compactness (0 = plain watershed)
    #[must_use]
    pub fn new(compactness: f64) -> Self {
        Self { compactness }
    }

    fn is_compact(&self) -> bool {
        self.compactness > 0.0
    }
}

impl Default for Watershed {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl GrowthAlgorithm for Watershed {
    fn grow(
        &self,
        _frame: usize,
        cost: &CostSurface,
        markers: &MarkerArray,
        unmasked: &[bool],
    ) -> Result<Vec<u32>> {
        let shape = cost.shape();
        let compact = self.is_compact();
        let mut output = seeded_output(markers);
        let mut heap = BinaryHeap::new();
        let mut age: u64 = 0;

        for (index, _) in markers.seeds() {
            heap.push(FloodItem {
                priority: f64::from(cost.at(index)),
                age,
                index,
                source: index,
            });
        }

        while let Some(item) = heap.pop() {
            if compact {
                // Already claimed by a flood that reached it with lower priority
                if output[item.index] != BACKGROUND && item.index != item.source {
                    continue;
                }
                output[item.index] = output[item.source];
            }
            let label = output[item.index];

            shape.for_each_neighbor(item.index, |neighbor| {
                if !unmasked[neighbor] || output[neighbor] != BACKGROUND {
                    return;
                }
                age += 1;
                let mut priority = f64::from(cost.at(neighbor));
                if compact {
                    priority += self.compactness * shape.distance(neighbor, item.source);
                } else {
                    output[neighbor] = label;
                }
                heap.push(FloodItem {
                    priority,
                    age,
                    index: neighbor,
                    source: item.source,
                });
            });
        }

        Ok(output)
    }

    fn name(&self) -> &'static str {
        "watershed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::FrameShape;

    fn run(
        shape: FrameShape,
        costs: Vec<u16>,
        seeds: Vec<u32>,
        unmasked: &[bool],
        compactness: f64,
    ) -> Vec<u32> {
        let cost = CostSurface::from_costs(shape, costs).unwrap();
        let markers = MarkerArray::from_labels(shape, seeds).unwrap();
        Watershed::new(compactness)
            .grow(0, &cost, &markers, unmasked)
            .unwrap()
    }

    #[test]
    fn test_single_seed_fills_connected_mask() {
        let shape = FrameShape::new(1, 1, 5);
        let labels = run(
            shape,
            vec![0, 1, 2, 3, 4],
            vec![0, 0, 7, 0, 0],
            &[true, true, true, true, false],
            0.0,
        );
        assert_eq!(labels, vec![7, 7, 7, 7, 0]);
    }

    #[test]
    fn test_growth_does_not_cross_mask_gap() {
        let shape = FrameShape::new(1, 1, 5);
        let labels = run(
            shape,
            vec![0; 5],
            vec![1, 0, 0, 0, 0],
            &[true, true, false, true, true],
            0.0,
        );
        assert_eq!(labels, vec![1, 1, 0, 0, 0]);
    }

    #[test]
    fn test_two_seeds_meet_at_cost_ridge() {
        // Costs rise toward a ridge at index 4; the ridge cell goes to the seed
        // whose flood reaches it first in (cost, age) order.
        let shape = FrameShape::new(1, 1, 9);
        let labels = run(
            shape,
            vec![0, 100, 200, 300, 900, 300, 200, 100, 0],
            vec![1, 0, 0, 0, 0, 0, 0, 0, 2],
            &[true; 9],
            0.0,
        );
        assert_eq!(&labels[..4], &[1, 1, 1, 1]);
        assert_eq!(&labels[5..], &[2, 2, 2, 2]);
        assert!(labels[4] == 1 || labels[4] == 2);
    }

    #[test]
    fn test_flood_follows_low_cost_first() {
        // Seed 1 sits in a valley that extends right; seed 2 sits on a slope.
        // The valley floor (cost 0) is claimed by seed 1 before seed 2 can enter.
        let shape = FrameShape::new(1, 1, 6);
        let labels = run(
            shape,
            vec![0, 0, 0, 0, 500, 500],
            vec![1, 0, 0, 0, 0, 2],
            &[true; 6],
            0.0,
        );
        assert_eq!(labels, vec![1, 1, 1, 1, 1, 2]);
    }

    #[test]
    fn test_compactness_splits_flat_plateau_evenly() {
        // On a flat plateau a strong compactness term divides cells by distance
        let shape = FrameShape::new(1, 1, 7);
        let labels = run(
            shape,
            vec![0; 7],
            vec![1, 0, 0, 0, 0, 0, 2],
            &[true; 7],
            10.0,
        );
        assert_eq!(&labels[..3], &[1, 1, 1]);
        assert_eq!(&labels[4..], &[2, 2, 2]);
        assert_ne!(labels[3], 0);
    }

    #[test]
    fn test_compactness_overrides_cheap_path() {
        // Without compactness seed 1 floods the whole cheap corridor; with a large
        // compactness the far end is taken by the nearer seed 2.
        let shape = FrameShape::new(1, 1, 6);
        let costs = vec![0, 0, 0, 0, 0, 100];
        let seeds = vec![1, 0, 0, 0, 0, 2];
        let plain = run(shape, costs.clone(), seeds.clone(), &[true; 6], 0.0);
        assert_eq!(plain, vec![1, 1, 1, 1, 1, 2]);

        let compact = run(shape, costs, seeds, &[true; 6], 1000.0);
        assert_eq!(compact[4], 2);
        assert_eq!(compact[0], 1);
    }

    #[test]
    fn test_volumetric_growth_uses_vertical_neighbours() {
        let shape = FrameShape::new(3, 1, 1);
        let labels = run(shape, vec![0; 3], vec![0, 5, 0], &[true; 3], 0.0);
        assert_eq!(labels, vec![5, 5, 5]);
    }

    #[test]
    fn test_flood_item_ordering() {
        let mut heap = BinaryHeap::new();
        for (priority, age) in [(5.0, 0), (1.0, 2), (1.0, 1), (3.0, 3)] {
            heap.push(FloodItem {
                priority,
                age,
                index: 0,
                source: 0,
            });
        }
        let order: Vec<(f64, u64)> = std::iter::from_fn(|| heap.pop())
            .map(|item| (item.priority, item.age))
            .collect();
        assert_eq!(order, vec![(1.0, 1), (1.0, 2), (3.0, 3), (5.0, 0)]);
    }
}
