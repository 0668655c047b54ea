//! Feature-tracking table
//!
//! The table is produced by an external tracker with one row per tracked feature
//! per frame. Row order is preserved everywhere: when two rows stamp the same
//! cell, the later row wins.

use crate::error::{Result, SegmentationError};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

/// One tracked feature position in one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackRow {
    /// Time index into the field
    pub frame: usize,
    /// Persistent feature identifier (positive)
    pub particle: u32,
    /// Column coordinate in cells
    pub x: f32,
    /// Row coordinate in cells
    pub y: f32,
    /// Vertical coordinate in cells (volumetric tracking only)
    pub z: Option<f32>,
}

impl TrackRow {
    /// Planar track row
    #[must_use]
    pub const fn new(frame: usize, particle: u32, x: f32, y: f32) -> Self {
        Self {
            frame,
            particle,
            x,
            y,
            z: None,
        }
    }

    /// Track row with a vertical coordinate
    #[must_use]
    pub const fn with_z(mut self, z: f32) -> Self {
        self.z = Some(z);
        self
    }
}

/// Ordered collection of track rows
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackTable {
    rows: Vec<TrackRow>,
}

impl TrackTable {
    /// Wrap rows in table order
    #[must_use]
    pub fn new(rows: Vec<TrackRow>) -> Self {
        Self { rows }
    }

    /// All rows
    #[must_use]
    pub fn rows(&self) -> &[TrackRow] {
        &self.rows
    }

    /// Number of rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a row
    pub fn push(&mut self, row: TrackRow) {
        self.rows.push(row);
    }

    /// Rows of one frame, in table order
    pub fn rows_for_frame(&self, frame: usize) -> impl Iterator<Item = &TrackRow> {
        self.rows.iter().filter(move |row| row.frame == frame)
    }

    /// Row indices grouped by frame, each group in table order
    #[must_use]
    pub fn group_by_frame(&self) -> FxHashMap<usize, Vec<usize>> {
        let mut groups: FxHashMap<usize, Vec<usize>> = FxHashMap::default();
        for (i, row) in self.rows.iter().enumerate() {
            groups.entry(row.frame).or_default().push(i);
        }
        groups
    }

    /// Distinct particle identifiers in `frame`
    #[must_use]
    pub fn particles_in_frame(&self, frame: usize) -> FxHashSet<u32> {
        self.rows_for_frame(frame).map(|row| row.particle).collect()
    }

    /// Largest frame index referenced, if any
    #[must_use]
    pub fn last_frame(&self) -> Option<usize> {
        self.rows.iter().map(|row| row.frame).max()
    }

    /// Check table invariants
    ///
    /// Particle identifiers must be positive (0 is the background label) and a
    /// particle appears at most once per frame.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` naming the first offending row.
    pub fn validate(&self) -> Result<()> {
        let mut seen: FxHashSet<(usize, u32)> = FxHashSet::default();
        for row in &self.rows {
            if row.particle == 0 {
                return Err(SegmentationError::invalid_argument(
                    "tracks",
                    format!("particle identifier 0 in frame {} is reserved", row.frame),
                ));
            }
            if !seen.insert((row.frame, row.particle)) {
                return Err(SegmentationError::invalid_argument(
                    "tracks",
                    format!(
                        "particle {} appears more than once in frame {}",
                        row.particle, row.frame
                    ),
                ));
            }
        }
        Ok(())
    }
}

impl FromIterator<TrackRow> for TrackTable {
    fn from_iter<I: IntoIterator<Item = TrackRow>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
