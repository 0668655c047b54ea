//! C ABI over the cloud-tracking segmentation core.
//!
//! All arrays are caller-owned, flat and row-major in `(t, z, y, x)` order with
//! `x` varying fastest. Every function returns a `CloudtrackErrorCode`; on failure
//! `cloudtrack_get_last_error()` describes what went wrong.

mod error;
mod helpers;

pub use error::{cloudtrack_get_last_error, cloudtrack_get_last_error_code, CloudtrackErrorCode};

use cloudtrack_core::{
    project_surface, segment, Axis, Coordinates, Field, LabelMask, LevelSeeding, Method,
    RandomWalkerConfig, RandomWalkerMode, SegmentationParams, Target, TrackRow, TrackTable,
};
use error::DefaultCloudtrackError;
use helpers::{clear_last_error, track_error, track_result};
use std::slice;

/// `CloudtrackParams::target`: segment values above the threshold
pub const CLOUDTRACK_TARGET_MAXIMUM: u32 = 0;
/// `CloudtrackParams::target`: segment values below the threshold
pub const CLOUDTRACK_TARGET_MINIMUM: u32 = 1;
/// `CloudtrackParams::method`: priority-flood watershed
pub const CLOUDTRACK_METHOD_WATERSHED: u32 = 0;
/// `CloudtrackParams::method`: random walker
pub const CLOUDTRACK_METHOD_RANDOM_WALKER: u32 = 1;

/// One row of the tracking table.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CloudtrackTrackRow {
    /// Time index of the row.
    pub frame: usize,
    /// Particle identifier, must be positive.
    pub particle: u32,
    /// Column coordinate in cell units.
    pub x: f32,
    /// Row coordinate in cell units.
    pub y: f32,
    /// Vertical coordinate in cell units, read only when `has_z` is true.
    pub z: f32,
    /// Whether `z` is set. Without it a volumetric seed covers its whole column.
    pub has_z: bool,
}

impl From<&CloudtrackTrackRow> for TrackRow {
    fn from(row: &CloudtrackTrackRow) -> Self {
        let track = TrackRow::new(row.frame, row.particle, row.x, row.y);
        if row.has_z {
            track.with_z(row.z)
        } else {
            track
        }
    }
}

/// Segmentation parameters.
///
/// Start from `cloudtrack_params_default()` and override fields as needed.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CloudtrackParams {
    /// Strict threshold a cell must pass.
    pub threshold: f32,
    /// One of the `CLOUDTRACK_TARGET_*` constants.
    pub target: u32,
    /// One of the `CLOUDTRACK_METHOD_*` constants.
    pub method: u32,
    /// Watershed compactness, 0 for a plain watershed.
    pub compactness: f32,
    /// Whether `level_start..level_end` is set (volumetric fields only).
    pub has_level: bool,
    /// First vertical level of the seeding range.
    pub level_start: usize,
    /// One past the last vertical level of the seeding range.
    pub level_end: usize,
    /// Only stamp seeds inside the level range.
    pub seed_within_level: bool,
    /// Skip track rows outside the grid instead of failing.
    pub skip_out_of_range_seeds: bool,
    /// Random-walker edge weight sharpness.
    pub rw_beta: f64,
    /// Random-walker relative residual tolerance.
    pub rw_tolerance: f64,
    /// Random-walker iteration cap.
    pub rw_max_iterations: usize,
    /// Use the dense direct solver instead of conjugate gradient.
    pub rw_brute_force: bool,
}

impl CloudtrackParams {
    fn to_params(self) -> Result<SegmentationParams, DefaultCloudtrackError> {
        let target = match self.target {
            CLOUDTRACK_TARGET_MAXIMUM => Target::Maximum,
            CLOUDTRACK_TARGET_MINIMUM => Target::Minimum,
            other => {
                return Err(DefaultCloudtrackError::invalid_argument(
                    "target",
                    &format!("unknown target {other}"),
                ))
            }
        };
        let method = match self.method {
            CLOUDTRACK_METHOD_WATERSHED => Method::Watershed,
            CLOUDTRACK_METHOD_RANDOM_WALKER => Method::RandomWalker,
            other => {
                return Err(DefaultCloudtrackError::invalid_argument(
                    "method",
                    &format!("unknown method {other}"),
                ))
            }
        };
        Ok(SegmentationParams {
            threshold: self.threshold,
            target,
            level: self.has_level.then_some(self.level_start..self.level_end),
            level_seeding: if self.seed_within_level {
                LevelSeeding::WithinLevel
            } else {
                LevelSeeding::SeedAll
            },
            compactness: self.compactness,
            method,
            range_scope: None,
            skip_out_of_range_seeds: self.skip_out_of_range_seeds,
            random_walker: RandomWalkerConfig {
                beta: self.rw_beta,
                tolerance: self.rw_tolerance,
                max_iterations: self.rw_max_iterations,
                mode: if self.rw_brute_force {
                    RandomWalkerMode::BruteForce
                } else {
                    RandomWalkerMode::ConjugateGradient
                },
            },
        })
    }
}

/// Default segmentation parameters (threshold 0, maximum, watershed).
#[no_mangle]
pub extern "C" fn cloudtrack_params_default() -> CloudtrackParams {
    let defaults = SegmentationParams::default();
    let rw = defaults.random_walker;
    CloudtrackParams {
        threshold: defaults.threshold,
        target: CLOUDTRACK_TARGET_MAXIMUM,
        method: CLOUDTRACK_METHOD_WATERSHED,
        compactness: defaults.compactness,
        has_level: false,
        level_start: 0,
        level_end: 0,
        seed_within_level: false,
        skip_out_of_range_seeds: defaults.skip_out_of_range_seeds,
        rw_beta: rw.beta,
        rw_tolerance: rw.tolerance,
        rw_max_iterations: rw.max_iterations,
        rw_brute_force: rw.mode == RandomWalkerMode::BruteForce,
    }
}

/// Index coordinates for `nz == 0` (planar) or `nz >= 1` (volumetric) grids,
/// with the number of cells.
fn grid_coords(
    nt: usize,
    nz: usize,
    ny: usize,
    nx: usize,
) -> Result<(Coordinates, usize), DefaultCloudtrackError> {
    let len = nt
        .checked_mul(nz.max(1))
        .and_then(|n| n.checked_mul(ny))
        .and_then(|n| n.checked_mul(nx))
        .ok_or_else(|| {
            DefaultCloudtrackError::invalid_argument("nt, nz, ny, nx", "grid size overflows usize")
        })?;
    let coords = if nz == 0 {
        Coordinates::planar(nt, ny, nx)
    } else {
        Coordinates::volumetric(nt, nz, ny, nx)
    };
    Ok((coords, len))
}

/// Segment a field around tracked particles.
///
/// Parameters
/// - `field`: `nt * max(nz, 1) * ny * nx` values.
/// - `nz`: number of vertical levels; 0 for a planar field.
/// - `tracks`: `n_tracks` track rows; may be null when `n_tracks` is 0.
/// - `params`: segmentation parameters.
/// - `out_labels`: receives `nt * max(nz, 1) * ny * nx` labels, 0 = background.
///
/// Returns
/// - `CloudtrackErrorCode::Ok` (0) : success, `out_labels` written
/// - `CloudtrackErrorCode::NullPointer` : a required pointer is null
/// - `CloudtrackErrorCode::InvalidArgument` : unknown target/method, bad parameters or track rows
/// - `CloudtrackErrorCode::OutOfRange` : a track coordinate lies outside the grid
/// - `CloudtrackErrorCode::SolverFailed` : the random walker did not converge
///
/// `out_labels` is left untouched on failure.
///
/// # Safety
///
/// - `field` and `out_labels` must point to at least `nt * max(nz, 1) * ny * nx`
///   readable / writable elements respectively.
/// - `tracks` must point to `n_tracks` readable rows when `n_tracks > 0`.
/// - `params` must point to a valid `CloudtrackParams`.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn cloudtrack_segment(
    field: *const f32,
    nt: usize,
    nz: usize,
    ny: usize,
    nx: usize,
    tracks: *const CloudtrackTrackRow,
    n_tracks: usize,
    params: *const CloudtrackParams,
    out_labels: *mut u32,
) -> CloudtrackErrorCode {
    if field.is_null() {
        return track_error(&DefaultCloudtrackError::null_pointer("field"));
    }
    if tracks.is_null() && n_tracks > 0 {
        return track_error(&DefaultCloudtrackError::null_pointer("tracks"));
    }
    if params.is_null() {
        return track_error(&DefaultCloudtrackError::null_pointer("params"));
    }
    if out_labels.is_null() {
        return track_error(&DefaultCloudtrackError::null_pointer("out_labels"));
    }

    let (coords, len) = match grid_coords(nt, nz, ny, nx) {
        Ok(grid) => grid,
        Err(err) => return track_error(&err),
    };
    // SAFETY: `params` is non-null and points to a valid value per the contract above.
    let params = match unsafe { *params }.to_params() {
        Ok(params) => params,
        Err(err) => return track_error(&err),
    };

    // SAFETY: `field` is non-null and covers `len` elements per the contract above.
    let data = unsafe { slice::from_raw_parts(field, len) }.to_vec();
    let field = match track_result(Field::new("field", None, coords, data)) {
        Ok(field) => field,
        Err(code) => return code,
    };

    let table: TrackTable = if n_tracks == 0 {
        TrackTable::default()
    } else {
        // SAFETY: `tracks` is non-null and covers `n_tracks` rows.
        unsafe { slice::from_raw_parts(tracks, n_tracks) }
            .iter()
            .map(TrackRow::from)
            .collect()
    };

    match track_result(segment(&field, &table, &params)) {
        Ok(mask) => {
            // SAFETY: `out_labels` is non-null and covers `len` elements.
            unsafe { slice::from_raw_parts_mut(out_labels, len) }.copy_from_slice(mask.labels());
            clear_last_error();
            CloudtrackErrorCode::Ok
        }
        Err(code) => code,
    }
}

/// Collapse the vertical axis of a volumetric label mask onto the footprint of
/// one particle.
///
/// A cell of `out_labels` is `particle` when any level of that column carries
/// `particle` in `labels`, and 0 otherwise.
///
/// Parameters
/// - `labels`: `nt * nz * ny * nx` labels.
/// - `nz`: number of vertical levels; must be at least 1.
/// - `out_labels`: receives `nt * ny * nx` labels.
///
/// # Safety
///
/// `labels` and `out_labels` must point to at least `nt * nz * ny * nx` readable and
/// `nt * ny * nx` writable elements respectively.
#[no_mangle]
pub unsafe extern "C" fn cloudtrack_project_surface(
    labels: *const u32,
    nt: usize,
    nz: usize,
    ny: usize,
    nx: usize,
    particle: u32,
    out_labels: *mut u32,
) -> CloudtrackErrorCode {
    if labels.is_null() {
        return track_error(&DefaultCloudtrackError::null_pointer("labels"));
    }
    if out_labels.is_null() {
        return track_error(&DefaultCloudtrackError::null_pointer("out_labels"));
    }

    let (coords, len) = match grid_coords(nt, nz, ny, nx) {
        Ok(grid) => grid,
        Err(err) => return track_error(&err),
    };
    // SAFETY: `labels` is non-null and covers `len` elements per the contract above.
    let source = unsafe { slice::from_raw_parts(labels, len) }.to_vec();
    let surface = match track_result(
        LabelMask::from_labels(coords, source)
            .and_then(|mask| project_surface(&mask, particle, Axis::Vertical)),
    ) {
        Ok(surface) => surface,
        Err(code) => return code,
    };

    let footprint = surface.labels();
    // SAFETY: `out_labels` is non-null and covers `nt * ny * nx` elements.
    unsafe { slice::from_raw_parts_mut(out_labels, footprint.len()) }.copy_from_slice(footprint);
    clear_last_error();
    CloudtrackErrorCode::Ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;
    use std::ptr;

    fn row(frame: usize, particle: u32, x: f32, y: f32) -> CloudtrackTrackRow {
        CloudtrackTrackRow {
            frame,
            particle,
            x,
            y,
            z: 0.0,
            has_z: false,
        }
    }

    fn last_error() -> String {
        let msg = cloudtrack_get_last_error();
        assert!(!msg.is_null());
        unsafe { CStr::from_ptr(msg) }.to_string_lossy().into_owned()
    }

    #[test]
    fn test_segment_planar_peak() {
        let mut field = vec![0.0f32; 25];
        field[12] = 10.0;
        let tracks = [row(0, 1, 2.0, 2.0)];
        let params = CloudtrackParams {
            threshold: 5.0,
            ..cloudtrack_params_default()
        };
        let mut out = vec![99u32; 25];

        let code = unsafe {
            cloudtrack_segment(
                field.as_ptr(),
                1,
                0,
                5,
                5,
                tracks.as_ptr(),
                tracks.len(),
                &params,
                out.as_mut_ptr(),
            )
        };
        assert_eq!(code, CloudtrackErrorCode::Ok);
        assert_eq!(cloudtrack_get_last_error_code(), CloudtrackErrorCode::Ok);
        assert!(cloudtrack_get_last_error().is_null());
        assert_eq!(out[12], 1);
        assert_eq!(out.iter().filter(|&&l| l != 0).count(), 1);
    }

    #[test]
    fn test_segment_null_pointers() {
        let params = cloudtrack_params_default();
        let mut out = vec![0u32; 4];
        let code = unsafe {
            cloudtrack_segment(
                ptr::null(),
                1,
                0,
                2,
                2,
                ptr::null(),
                0,
                &params,
                out.as_mut_ptr(),
            )
        };
        assert_eq!(code, CloudtrackErrorCode::NullPointer);
        assert_eq!(cloudtrack_get_last_error_code(), CloudtrackErrorCode::NullPointer);
        assert!(last_error().contains("field"));
    }

    #[test]
    fn test_segment_unknown_target() {
        let field = vec![1.0f32; 4];
        let params = CloudtrackParams {
            target: 7,
            ..cloudtrack_params_default()
        };
        let mut out = vec![0u32; 4];
        let code = unsafe {
            cloudtrack_segment(
                field.as_ptr(),
                1,
                0,
                2,
                2,
                ptr::null(),
                0,
                &params,
                out.as_mut_ptr(),
            )
        };
        assert_eq!(code, CloudtrackErrorCode::InvalidArgument);
        assert!(last_error().contains("target"));
    }

    #[test]
    fn test_segment_unknown_method() {
        let field = vec![1.0f32; 4];
        let params = CloudtrackParams {
            method: 9,
            ..cloudtrack_params_default()
        };
        let mut out = vec![7u32; 4];
        let code = unsafe {
            cloudtrack_segment(
                field.as_ptr(),
                1,
                0,
                2,
                2,
                ptr::null(),
                0,
                &params,
                out.as_mut_ptr(),
            )
        };
        assert_eq!(code, CloudtrackErrorCode::InvalidArgument);
        assert_eq!(cloudtrack_get_last_error_code(), CloudtrackErrorCode::InvalidArgument);
        assert!(last_error().contains("method"));
    }

    #[test]
    fn test_segment_out_of_range_row() {
        let field = vec![1.0f32; 4];
        let tracks = [row(0, 1, 5.0, 0.0)];
        let params = cloudtrack_params_default();
        let mut out = vec![0u32; 4];
        let code = unsafe {
            cloudtrack_segment(
                field.as_ptr(),
                1,
                0,
                2,
                2,
                tracks.as_ptr(),
                1,
                &params,
                out.as_mut_ptr(),
            )
        };
        assert_eq!(code, CloudtrackErrorCode::OutOfRange);
        assert_eq!(out, vec![0; 4]);
    }

    #[test]
    fn test_project_surface_footprint() {
        // 2 levels of 1x3: particle 4 at level 0 x=0 and level 1 x=2
        let labels = [4u32, 0, 0, 0, 3, 4];
        let mut out = vec![9u32; 3];
        let code = unsafe {
            cloudtrack_project_surface(labels.as_ptr(), 1, 2, 1, 3, 4, out.as_mut_ptr())
        };
        assert_eq!(code, CloudtrackErrorCode::Ok);
        assert_eq!(out, vec![4, 0, 4]);
    }

    #[test]
    fn test_project_surface_rejects_planar() {
        let labels = [1u32; 4];
        let mut out = vec![0u32; 4];
        let code = unsafe {
            cloudtrack_project_surface(labels.as_ptr(), 1, 0, 2, 2, 1, out.as_mut_ptr())
        };
        assert_eq!(code, CloudtrackErrorCode::InvalidArgument);
    }
}
