//! Cloud Tracking Segmentation Core Library
//!
//! Assigns every grid cell of a gridded atmospheric field (for example cloud
//! water content or vertical velocity) to the tracked particle it belongs to.
//! Particle positions come from an upstream tracking step; this crate grows a
//! labelled region around each of them, frame by frame, confined to where the
//! field passes a threshold.
//!
//! ## Pipeline
//!
//! - Frame slicing: one time step of the field plus its track rows
//! - Marker seeding: particle identifiers stamped at rounded track coordinates
//! - Cost surface: field rescaled so the favoured extremum is cheapest
//! - Region growing: priority-flood watershed or random walker
//! - Assembly: frame results written into one time-indexed label mask
//!
//! Frames are independent and processed in parallel with rayon.
//!
//! ## Post-processing
//!
//! [`postprocess`] selects single particles, blanks untracked cells of a
//! companion field, and projects 3D particle masks onto their 2D footprint.
//!
//! ## Example
//!
//! ```
//! use cloudtrack_core::{segment, Field, SegmentationParams, Target, TrackRow, TrackTable};
//!
//! let mut data = vec![0.0; 25];
//! data[2 * 5 + 2] = 10.0;
//! let field = Field::planar("w", Some("m s-1"), (1, 5, 5), data)?;
//! let tracks = TrackTable::new(vec![TrackRow::new(0, 1, 2.0, 2.0)]);
//!
//! let mask = segment(&field, &tracks, &SegmentationParams::new(5.0, Target::Maximum))?;
//! assert_eq!(mask.get(0, 0, 2, 2), 1);
//! assert_eq!(mask.labelled_cells(), 1);
//! # Ok::<(), cloudtrack_core::SegmentationError>(())
//! ```

// Parameters and errors
pub mod config;
pub mod error;

// Data containers
pub mod grid;
pub mod tracks;

// Segmentation pipeline and mask transforms
pub mod postprocess;
pub mod segmentation;

// Re-export the public surface
pub use config::{
    LevelSeeding, Method, RandomWalkerConfig, RandomWalkerMode, RangeScope, SegmentationParams,
    Target,
};
pub use error::{Result, SegmentationError};
pub use grid::{
    AuxCoord, Axis, Coordinates, DimCoord, Field, FrameShape, GridShape, LabelMask, BACKGROUND,
    SEGMENTATION_MASK_NAME,
};
pub use postprocess::{
    clear_untracked, extract_particle, isolate_particle, isolate_particle_masked, project_surface,
    project_surface_masked,
};
pub use segmentation::{segment, GrowthAlgorithm};
pub use tracks::{TrackRow, TrackTable};
