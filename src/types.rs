//! Core value types shared by every mapping: point batches, transform
//! direction, and the validation helpers for user-supplied numbers and axes.

use std::fmt;

use crate::errors::{MapError, Result};

/// Direction of a transformation relative to a mapping's definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Forward,
    Inverse,
}

impl Direction {
    #[inline]
    pub fn from_forward(forward: bool) -> Self {
        if forward {
            Direction::Forward
        } else {
            Direction::Inverse
        }
    }

    #[inline]
    pub fn flip(self) -> Self {
        match self {
            Direction::Forward => Direction::Inverse,
            Direction::Inverse => Direction::Forward,
        }
    }

    /// Resolve against an inversion flag: an inverted mapping runs its
    /// definition backwards.
    #[inline]
    pub fn resolve(self, inverted: bool) -> Self {
        if inverted { self.flip() } else { self }
    }

    pub fn label(self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Inverse => "inverse",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A batch of points of fixed dimensionality, stored row-major as
/// `(n_points, n_coords)`.
#[derive(Debug, Clone, PartialEq)]
pub struct PointBatch {
    n_coords: usize,
    data: Vec<f64>,
}

impl PointBatch {
    /// Wrap row-major data. `data.len()` must be a multiple of `n_coords`.
    pub fn new(n_coords: usize, data: Vec<f64>) -> Result<Self> {
        if n_coords == 0 {
            return Err(MapError::invalid("points need at least one coordinate"));
        }
        if data.len() % n_coords != 0 {
            return Err(MapError::DimensionMismatch {
                message: format!(
                    "{} values cannot be split into points of {} coordinates",
                    data.len(),
                    n_coords
                ),
            });
        }
        Ok(Self { n_coords, data })
    }

    /// A batch of `n_points` points at the origin
    pub fn zeros(n_points: usize, n_coords: usize) -> Self {
        Self {
            n_coords,
            data: vec![0.0; n_points * n_coords],
        }
    }

    /// Build a batch from rows; every row must have the same length.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self> {
        let Some(first) = rows.first() else {
            return Err(MapError::invalid("cannot infer dimensionality of an empty batch"));
        };
        let n_coords = first.as_ref().len();
        let mut data = Vec::with_capacity(rows.len() * n_coords);
        for row in rows {
            let row = row.as_ref();
            MapError::check_len("point length", n_coords, row.len())?;
            data.extend_from_slice(row);
        }
        Self::new(n_coords, data)
    }

    /// A batch holding a single point
    pub fn from_point(point: &[f64]) -> Result<Self> {
        Self::new(point.len(), point.to_vec())
    }

    #[inline]
    pub fn n_points(&self) -> usize {
        self.data.len() / self.n_coords
    }

    #[inline]
    pub fn n_coords(&self) -> usize {
        self.n_coords
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn point(&self, index: usize) -> &[f64] {
        &self.data[index * self.n_coords..(index + 1) * self.n_coords]
    }

    #[inline]
    pub fn point_mut(&mut self, index: usize) -> &mut [f64] {
        &mut self.data[index * self.n_coords..(index + 1) * self.n_coords]
    }

    pub fn points(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks_exact(self.n_coords)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    #[cfg(feature = "parallel")]
    pub(crate) fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.points().map(<[f64]>::to_vec).collect()
    }

    /// Elementwise comparison with numpy `allclose` semantics:
    /// `|a - b| <= atol + rtol * |b|`.
    pub fn all_close(&self, other: &PointBatch, rtol: f64, atol: f64) -> bool {
        self.n_coords == other.n_coords
            && self.data.len() == other.data.len()
            && self
                .data
                .iter()
                .zip(&other.data)
                .all(|(a, b)| (a - b).abs() <= atol + rtol * b.abs())
    }
}

/// Reject NaN and infinite parameters
pub(crate) fn check_finite(value: f64, what: &str) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(MapError::invalid(format!("{what} must be finite, got {value}")))
    }
}

/// Convert a 1-based axis index to a 0-based one, checking `1..=n_axes`.
pub(crate) fn axis_index(one_based: usize, n_axes: usize) -> Result<usize> {
    if one_based == 0 || one_based > n_axes {
        Err(MapError::axis_out_of_range(one_based, n_axes))
    } else {
        Ok(one_based - 1)
    }
}
