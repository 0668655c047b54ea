//! Segmentation parameters
//!
//! Parameters are plain data with sensible defaults. Tags that arrive as strings
//! (from a config file or a foreign caller) are parsed into closed enums through
//! `FromStr`, so an unknown tag is rejected before any frame is touched.

use crate::error::{Result, SegmentationError};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::str::FromStr;

/// Which extremum of the field seeds and guides growth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// Grow from maxima; cells must exceed the threshold
    #[default]
    Maximum,
    /// Grow from minima; cells must fall below the threshold
    Minimum,
}

impl Target {
    /// Whether `value` strictly passes `threshold` in this target's direction
    ///
    /// Non-finite values never pass.
    #[inline]
    #[must_use]
    pub fn admits(self, value: f32, threshold: f32) -> bool {
        value.is_finite()
            && match self {
                Self::Maximum => value > threshold,
                Self::Minimum => value < threshold,
            }
    }
}

impl FromStr for Target {
    type Err = SegmentationError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "maximum" => Ok(Self::Maximum),
            "minimum" => Ok(Self::Minimum),
            other => Err(SegmentationError::invalid_argument(
                "target",
                format!("unknown target '{other}', expected 'maximum' or 'minimum'"),
            )),
        }
    }
}

/// Region-growing algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// Marker-controlled priority-flood watershed
    #[default]
    Watershed,
    /// Random-walker diffusion segmentation
    RandomWalker,
}

impl FromStr for Method {
    type Err = SegmentationError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "watershed" => Ok(Self::Watershed),
            "random_walker" => Ok(Self::RandomWalker),
            other => Err(SegmentationError::invalid_argument(
                "method",
                format!("unknown method '{other}', expected 'watershed' or 'random_walker'"),
            )),
        }
    }
}

/// How the `level` range affects seed placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelSeeding {
    /// Stamp seeds from track coordinates regardless of `level`
    #[default]
    SeedAll,
    /// Only stamp seeds on vertical levels inside `level`
    WithinLevel,
}

/// Where the value range used to scale the cost surface comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeScope {
    /// Minimum and maximum over the whole field, computed once
    Global,
    /// Minimum and maximum of each frame
    PerFrame,
}

impl RangeScope {
    /// Scope used when none is configured
    ///
    /// Volumetric fields scale against the whole field, planar fields per frame.
    #[must_use]
    pub const fn default_for(volumetric: bool) -> Self {
        if volumetric {
            Self::Global
        } else {
            Self::PerFrame
        }
    }
}

/// Linear solver used by the random walker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RandomWalkerMode {
    /// Dense Cholesky factorisation; exact but only practical for small regions
    BruteForce,
    /// Jacobi-preconditioned conjugate gradient on the sparse Laplacian
    #[default]
    ConjugateGradient,
}

/// Numerical settings for the random walker
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RandomWalkerConfig {
    /// Diffusion penalty coefficient; larger values make edges harder to cross
    pub beta: f64,
    /// Relative residual at which conjugate gradient stops
    pub tolerance: f64,
    /// Conjugate gradient iteration cap
    pub max_iterations: usize,
    /// Linear solver
    pub mode: RandomWalkerMode,
}

impl Default for RandomWalkerConfig {
    fn default() -> Self {
        Self {
            beta: 130.0,
            tolerance: 1e-3,
            max_iterations: 10_000,
            mode: RandomWalkerMode::ConjugateGradient,
        }
    }
}

/// Full parameter set for one segmentation call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationParams {
    /// Strict threshold a cell must pass to be segmented
    pub threshold: f32,
    /// Favoured extremum
    pub target: Target,
    /// Vertical index range for seeding (volumetric fields only)
    pub level: Option<Range<usize>>,
    /// How `level` restricts seed placement
    pub level_seeding: LevelSeeding,
    /// Geometric compactness penalty for watershed growth (0 = none)
    pub compactness: f32,
    /// Growth algorithm
    pub method: Method,
    /// Value-range scope for cost scaling; `None` picks by dimensionality
    pub range_scope: Option<RangeScope>,
    /// Skip track rows whose coordinates fall outside the grid instead of failing
    pub skip_out_of_range_seeds: bool,
    /// Random-walker numerics
    pub random_walker: RandomWalkerConfig,
}

impl Default for SegmentationParams {
    fn default() -> Self {
        Self {
            threshold: 0.0,
            target: Target::Maximum,
            level: None,
            level_seeding: LevelSeeding::SeedAll,
            compactness: 0.0,
            method: Method::Watershed,
            range_scope: None,
            skip_out_of_range_seeds: false,
            random_walker: RandomWalkerConfig::default(),
        }
    }
}

impl SegmentationParams {
    /// Parameters with the given threshold and target, defaults elsewhere
    #[must_use]
    pub fn new(threshold: f32, target: Target) -> Self {
        Self {
            threshold,
            target,
            ..Self::default()
        }
    }

    /// Set the growth method
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Set the compactness penalty
    pub fn with_compactness(mut self, compactness: f32) -> Self {
        self.compactness = compactness;
        self
    }

    /// Restrict seeding to a vertical index range
    pub fn with_level(mut self, level: Range<usize>, seeding: LevelSeeding) -> Self {
        self.level = Some(level);
        self.level_seeding = seeding;
        self
    }

    /// Force a value-range scope
    pub fn with_range_scope(mut self, scope: RangeScope) -> Self {
        self.range_scope = Some(scope);
        self
    }

    /// Check parameter values that do not depend on the field
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a non-finite threshold, a negative or
    /// non-finite compactness, an empty level range, or unusable random-walker
    /// numerics.
    pub fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() {
            return Err(SegmentationError::invalid_argument(
                "threshold",
                format!("must be finite, got {}", self.threshold),
            ));
        }
        if !self.compactness.is_finite() || self.compactness < 0.0 {
            return Err(SegmentationError::invalid_argument(
                "compactness",
                format!("must be finite and non-negative, got {}", self.compactness),
            ));
        }
        if let Some(level) = &self.level {
            if level.is_empty() {
                return Err(SegmentationError::invalid_argument(
                    "level",
                    format!("empty range {}..{}", level.start, level.end),
                ));
            }
        }
        let rw = &self.random_walker;
        if !rw.beta.is_finite() || rw.beta < 0.0 {
            return Err(SegmentationError::invalid_argument(
                "random_walker.beta",
                format!("must be finite and non-negative, got {}", rw.beta),
            ));
        }
        if !rw.tolerance.is_finite() || rw.tolerance <= 0.0 {
            return Err(SegmentationError::invalid_argument(
                "random_walker.tolerance",
                format!("must be finite and positive, got {}", rw.tolerance),
            ));
        }
        if rw.max_iterations == 0 {
            return Err(SegmentationError::invalid_argument(
                "random_walker.max_iterations",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_from_str() {
        assert_eq!("maximum".parse::<Target>().unwrap(), Target::Maximum);
        assert_eq!("minimum".parse::<Target>().unwrap(), Target::Minimum);
        assert!(matches!(
            "max".parse::<Target>(),
            Err(SegmentationError::InvalidArgument {
                parameter: "target",
                ..
            })
        ));
    }

    #[test]
    fn test_target_admits_strictly() {
        assert!(Target::Maximum.admits(5.1, 5.0));
        assert!(!Target::Maximum.admits(5.0, 5.0));
        assert!(Target::Minimum.admits(-1.0, 0.0));
        assert!(!Target::Minimum.admits(0.0, 0.0));
        assert!(!Target::Maximum.admits(f32::NAN, 0.0));
        assert!(!Target::Minimum.admits(f32::NAN, 0.0));
        assert!(!Target::Maximum.admits(f32::INFINITY, 0.0));
        assert!(!Target::Minimum.admits(f32::NEG_INFINITY, 0.0));
        assert!(!Target::Maximum.admits(f32::NEG_INFINITY, f32::MIN));
    }

    #[test]
    fn test_method_from_str() {
        assert_eq!("watershed".parse::<Method>().unwrap(), Method::Watershed);
        assert_eq!(
            "random_walker".parse::<Method>().unwrap(),
            Method::RandomWalker
        );
        assert!(matches!(
            "flood".parse::<Method>(),
            Err(SegmentationError::InvalidArgument {
                parameter: "method",
                ..
            })
        ));
    }

    #[test]
    fn test_defaults() {
        let params = SegmentationParams::default();
        assert_eq!(params.target, Target::Maximum);
        assert_eq!(params.method, Method::Watershed);
        assert_eq!(params.compactness, 0.0);
        assert_eq!(params.random_walker.beta, 130.0);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_negative_compactness() {
        let params = SegmentationParams::default().with_compactness(-0.5);
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_level() {
        let params = SegmentationParams::default().with_level(3..3, LevelSeeding::WithinLevel);
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_range_scope_default() {
        assert_eq!(RangeScope::default_for(true), RangeScope::Global);
        assert_eq!(RangeScope::default_for(false), RangeScope::PerFrame);
    }
}
