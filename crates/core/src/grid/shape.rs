//! Array shapes and index arithmetic
//!
//! All arrays are stored flat in row-major order with `x` varying fastest:
//! `index = ((t * nz + z) * ny + y) * nx + x`. Planar data uses `nz == 1`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Named array axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    /// Time (frame) axis
    Time,
    /// Designated vertical axis of volumetric fields
    Vertical,
    /// Horizontal y axis (rows)
    Y,
    /// Horizontal x axis (columns)
    X,
}

/// Spatial shape of a single frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameShape {
    /// Number of vertical levels (1 for planar frames)
    pub nz: usize,
    /// Number of rows
    pub ny: usize,
    /// Number of columns
    pub nx: usize,
}

impl FrameShape {
    /// Create a frame shape
    #[must_use]
    pub const fn new(nz: usize, ny: usize, nx: usize) -> Self {
        Self { nz, ny, nx }
    }

    /// Number of cells in the frame
    #[must_use]
    pub const fn len(&self) -> usize {
        self.nz * self.ny * self.nx
    }

    /// Whether the frame has no cells
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flat index of cell `(z, y, x)`
    #[inline]
    #[must_use]
    pub const fn index(&self, z: usize, y: usize, x: usize) -> usize {
        (z * self.ny + y) * self.nx + x
    }

    /// Cell position `(z, y, x)` of a flat index
    #[inline]
    #[must_use]
    pub const fn position(&self, index: usize) -> (usize, usize, usize) {
        let x = index % self.nx;
        let rest = index / self.nx;
        (rest / self.ny, rest % self.ny, x)
    }

    /// Calls `f` with the flat index of every face neighbour of `index`
    ///
    /// Planar frames (`nz == 1`) have up to 4 neighbours, volumetric frames up to 6.
    #[inline]
    pub fn for_each_neighbor(&self, index: usize, mut f: impl FnMut(usize)) {
        let (z, y, x) = self.position(index);
        let plane = self.ny * self.nx;
        if x > 0 {
            f(index - 1);
        }
        if x + 1 < self.nx {
            f(index + 1);
        }
        if y > 0 {
            f(index - self.nx);
        }
        if y + 1 < self.ny {
            f(index + self.nx);
        }
        if z > 0 {
            f(index - plane);
        }
        if z + 1 < self.nz {
            f(index + plane);
        }
    }

    /// Euclidean distance in cell units between two flat indices
    #[must_use]
    pub fn distance(&self, a: usize, b: usize) -> f64 {
        let (az, ay, ax) = self.position(a);
        let (bz, by, bx) = self.position(b);
        let dz = az as f64 - bz as f64;
        let dy = ay as f64 - by as f64;
        let dx = ax as f64 - bx as f64;
        (dz * dz + dy * dy + dx * dx).sqrt()
    }
}

impl fmt::Display for FrameShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.nz, self.ny, self.nx)
    }
}

/// Full shape of a time-indexed field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridShape {
    /// Number of frames
    pub nt: usize,
    /// Number of vertical levels (1 for planar fields)
    pub nz: usize,
    /// Number of rows
    pub ny: usize,
    /// Number of columns
    pub nx: usize,
}

impl GridShape {
    /// Create a grid shape
    #[must_use]
    pub const fn new(nt: usize, nz: usize, ny: usize, nx: usize) -> Self {
        Self { nt, nz, ny, nx }
    }

    /// Shape of one frame
    #[must_use]
    pub const fn frame(&self) -> FrameShape {
        FrameShape::new(self.nz, self.ny, self.nx)
    }

    /// Number of cells in one frame
    #[must_use]
    pub const fn frame_len(&self) -> usize {
        self.nz * self.ny * self.nx
    }

    /// Total number of cells
    #[must_use]
    pub const fn len(&self) -> usize {
        self.nt * self.frame_len()
    }

    /// Whether the grid has no cells
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flat index of cell `(t, z, y, x)`
    #[inline]
    #[must_use]
    pub const fn index(&self, t: usize, z: usize, y: usize, x: usize) -> usize {
        ((t * self.nz + z) * self.ny + y) * self.nx + x
    }

    /// Extent along `axis`
    #[must_use]
    pub const fn extent(&self, axis: Axis) -> usize {
        match axis {
            Axis::Time => self.nt,
            Axis::Vertical => self.nz,
            Axis::Y => self.ny,
            Axis::X => self.nx,
        }
    }

    /// Shape with `axis` collapsed to length 1
    #[must_use]
    pub const fn collapsed(&self, axis: Axis) -> Self {
        let mut shape = *self;
        match axis {
            Axis::Time => shape.nt = 1,
            Axis::Vertical => shape.nz = 1,
            Axis::Y => shape.ny = 1,
            Axis::X => shape.nx = 1,
        }
        shape
    }
}

impl fmt::Display for GridShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.nt, self.nz, self.ny, self.nx)
    }
}
