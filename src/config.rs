//! Tunables for the numeric searches.
//!
//! Every routine has a `Default` that works for well-scaled astrometric
//! mappings; the `*_with` variants of the analysis functions accept an
//! explicit config.

use serde::{Deserialize, Serialize};

use crate::errors::{MapError, Result};

/// Bounding-box search used by [`MapBox`](crate::MapBox)
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    /// Grid points per input axis used to seed the search for non-linear
    /// mappings (box corners are always included).
    pub grid_per_axis: usize,
    /// Refinement stops once the compass step falls below this fraction of
    /// the box width on every axis.
    pub rel_tolerance: f64,
    /// Upper bound on refinement iterations per extremum.
    pub max_iterations: usize,
    /// Above this many input axes the search is seeded from the centre, the
    /// two extreme corners and the centre of every face.
    pub max_grid_axes: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            grid_per_axis: 5,
            rel_tolerance: 1e-10,
            max_iterations: 2000,
            max_grid_axes: 4,
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.grid_per_axis < 2 {
            return Err(MapError::invalid(format!(
                "grid_per_axis must be at least 2, got {}",
                self.grid_per_axis
            )));
        }
        if !(self.rel_tolerance > 0.0 && self.rel_tolerance < 1.0) {
            return Err(MapError::invalid(format!(
                "rel_tolerance must be in (0, 1), got {}",
                self.rel_tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(MapError::invalid("max_iterations must be positive"));
        }
        Ok(())
    }
}

/// Sample grid for [`Mapping::linear_approx`](crate::Mapping::linear_approx)
#[derive(Debug, Clone, PartialEq)]
pub struct ApproxConfig {
    /// Samples per input axis, including both box edges.
    pub samples_per_axis: usize,
}

impl Default for ApproxConfig {
    fn default() -> Self {
        Self { samples_per_axis: 5 }
    }
}

impl ApproxConfig {
    pub fn validate(&self) -> Result<()> {
        if self.samples_per_axis < 2 {
            return Err(MapError::invalid(format!(
                "samples_per_axis must be at least 2, got {}",
                self.samples_per_axis
            )));
        }
        Ok(())
    }
}

/// Finite-difference step for [`Mapping::rate`](crate::Mapping::rate)
#[derive(Debug, Clone, PartialEq)]
pub struct RateConfig {
    /// Step relative to `max(|x|, 1)`.
    pub rel_step: f64,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self { rel_step: 1e-6 }
    }
}

impl RateConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.rel_step > 0.0 && self.rel_step.is_finite()) {
            return Err(MapError::invalid(format!(
                "rel_step must be positive, got {}",
                self.rel_step
            )));
        }
        Ok(())
    }
}

/// Newton iteration used by a [`PolyMap`](crate::PolyMap) without inverse
/// coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IterInverseConfig {
    /// Convergence threshold on the step length, relative to the point
    /// magnitude (AST `TolInverse`).
    pub tolerance: f64,
    /// AST `NIterInverse`.
    pub max_iterations: usize,
}

impl Default for IterInverseConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-6,
            max_iterations: 10,
        }
    }
}

impl IterInverseConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.tolerance > 0.0 && self.tolerance.is_finite()) {
            return Err(MapError::invalid(format!(
                "tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(MapError::invalid("max_iterations must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        SearchConfig::default().validate().unwrap();
        ApproxConfig::default().validate().unwrap();
        RateConfig::default().validate().unwrap();
        IterInverseConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_degenerate_settings() {
        let search = SearchConfig {
            grid_per_axis: 1,
            ..SearchConfig::default()
        };
        assert!(search.validate().is_err());
        assert!(ApproxConfig { samples_per_axis: 1 }.validate().is_err());
        assert!(RateConfig { rel_step: 0.0 }.validate().is_err());
        let iter = IterInverseConfig {
            max_iterations: 0,
            ..IterInverseConfig::default()
        };
        assert!(iter.validate().is_err());
    }
}
