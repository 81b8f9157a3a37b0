//! Compound mappings built from other mappings
//!
//! Components are held as [`Mapping`] handles, so a compound shares the
//! definitions of its components while each component keeps its own
//! inversion state.

use super::{MapKind, Mapping, Transform};
use crate::errors::{MapError, Result};
use crate::types::Direction;

/// `second(first(x))`
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesMap {
    first: Mapping,
    second: Mapping,
}

impl SeriesMap {
    pub fn new(first: Mapping, second: Mapping) -> Result<Self> {
        if first.n_out() != second.n_in() {
            return Err(MapError::DimensionMismatch {
                message: format!(
                    "first mapping has {} outputs but second has {} inputs",
                    first.n_out(),
                    second.n_in()
                ),
            });
        }
        Ok(Self { first, second })
    }

    /// Caller guarantees `first.n_out() == second.n_in()`
    pub(crate) fn new_unchecked(first: Mapping, second: Mapping) -> Self {
        debug_assert_eq!(first.n_out(), second.n_in());
        Self { first, second }
    }

    pub fn first(&self) -> &Mapping {
        &self.first
    }

    pub fn second(&self) -> &Mapping {
        &self.second
    }
}

impl Transform for SeriesMap {
    fn n_in(&self) -> usize {
        self.first.n_in()
    }

    fn n_out(&self) -> usize {
        self.second.n_out()
    }

    fn class_name(&self) -> &'static str {
        "CmpMap"
    }

    fn is_linear(&self) -> bool {
        self.first.is_linear() && self.second.is_linear()
    }

    fn has_direction(&self, dir: Direction) -> bool {
        self.first.has_direction(dir) && self.second.has_direction(dir)
    }

    fn apply(&self, dir: Direction, input: &[f64], output: &mut [f64]) -> Result<()> {
        let mut mid = vec![0.0; self.first.n_out()];
        match dir {
            Direction::Forward => {
                self.first.apply_point(dir, input, &mut mid)?;
                self.second.apply_point(dir, &mid, output)
            }
            Direction::Inverse => {
                self.second.apply_point(dir, input, &mut mid)?;
                self.first.apply_point(dir, &mid, output)
            }
        }
    }

    fn inverse_kind(&self) -> MapKind {
        SeriesMap {
            first: self.second.get_inverse(),
            second: self.first.get_inverse(),
        }
        .into()
    }

    fn show_params(&self, lines: &mut Vec<String>, indent: usize) {
        lines.push(format!("{}Series = 1", " ".repeat(indent)));
        self.first.show_lines(lines, indent);
        self.second.show_lines(lines, indent);
    }
}

/// `first` on the lower-numbered axes, `second` on the rest
#[derive(Debug, Clone, PartialEq)]
pub struct ParallelMap {
    first: Mapping,
    second: Mapping,
}

impl ParallelMap {
    pub fn new(first: Mapping, second: Mapping) -> Result<Self> {
        Ok(Self { first, second })
    }

    pub(crate) fn new_unchecked(first: Mapping, second: Mapping) -> Self {
        Self { first, second }
    }

    pub fn first(&self) -> &Mapping {
        &self.first
    }

    pub fn second(&self) -> &Mapping {
        &self.second
    }
}

impl Transform for ParallelMap {
    fn n_in(&self) -> usize {
        self.first.n_in() + self.second.n_in()
    }

    fn n_out(&self) -> usize {
        self.first.n_out() + self.second.n_out()
    }

    fn class_name(&self) -> &'static str {
        "CmpMap"
    }

    fn is_linear(&self) -> bool {
        self.first.is_linear() && self.second.is_linear()
    }

    fn has_direction(&self, dir: Direction) -> bool {
        self.first.has_direction(dir) && self.second.has_direction(dir)
    }

    fn apply(&self, dir: Direction, input: &[f64], output: &mut [f64]) -> Result<()> {
        let (split_in, split_out) = self.first.dims(dir);
        let (in_a, in_b) = input.split_at(split_in);
        let (out_a, out_b) = output.split_at_mut(split_out);
        self.first.apply_point(dir, in_a, out_a)?;
        self.second.apply_point(dir, in_b, out_b)
    }

    fn partial(&self, dir: Direction, at: &[f64], out_axis: usize, in_axis: usize) -> Option<f64> {
        let (split_in, split_out) = self.first.dims(dir);
        match (out_axis < split_out, in_axis < split_in) {
            (true, true) => self.first.partial(dir, &at[..split_in], out_axis, in_axis),
            (false, false) => self
                .second
                .partial(dir, &at[split_in..], out_axis - split_out, in_axis - split_in),
            _ => Some(0.0),
        }
    }

    fn inverse_kind(&self) -> MapKind {
        ParallelMap {
            first: self.first.get_inverse(),
            second: self.second.get_inverse(),
        }
        .into()
    }

    fn show_params(&self, lines: &mut Vec<String>, indent: usize) {
        lines.push(format!("{}Series = 0", " ".repeat(indent)));
        self.first.show_lines(lines, indent);
        self.second.show_lines(lines, indent);
    }
}

/// Forward transformation of `forward_map`, inverse transformation of
/// `inverse_map`.
///
/// The two need not be inverses of each other: a round trip through a
/// TranMap only reproduces the input when they agree.
#[derive(Debug, Clone, PartialEq)]
pub struct TranMap {
    forward_map: Mapping,
    inverse_map: Mapping,
}

impl TranMap {
    pub fn new(forward_map: Mapping, inverse_map: Mapping) -> Result<Self> {
        MapError::check_len("inverse mapping inputs", forward_map.n_in(), inverse_map.n_in())?;
        MapError::check_len("inverse mapping outputs", forward_map.n_out(), inverse_map.n_out())?;
        Ok(Self {
            forward_map,
            inverse_map,
        })
    }

    /// Caller guarantees both mappings have the same dimensions
    pub(crate) fn new_unchecked(forward_map: Mapping, inverse_map: Mapping) -> Self {
        debug_assert_eq!(forward_map.n_in(), inverse_map.n_in());
        Self {
            forward_map,
            inverse_map,
        }
    }

    pub fn forward_map(&self) -> &Mapping {
        &self.forward_map
    }

    pub fn inverse_map(&self) -> &Mapping {
        &self.inverse_map
    }

    fn delegate(&self, dir: Direction) -> &Mapping {
        match dir {
            Direction::Forward => &self.forward_map,
            Direction::Inverse => &self.inverse_map,
        }
    }
}

impl Transform for TranMap {
    fn n_in(&self) -> usize {
        self.forward_map.n_in()
    }

    fn n_out(&self) -> usize {
        self.forward_map.n_out()
    }

    fn class_name(&self) -> &'static str {
        "TranMap"
    }

    fn is_linear(&self) -> bool {
        self.forward_map.is_linear() && self.inverse_map.is_linear()
    }

    fn has_direction(&self, dir: Direction) -> bool {
        self.delegate(dir).has_direction(dir)
    }

    fn apply(&self, dir: Direction, input: &[f64], output: &mut [f64]) -> Result<()> {
        self.delegate(dir).apply_point(dir, input, output)
    }

    fn partial(&self, dir: Direction, at: &[f64], out_axis: usize, in_axis: usize) -> Option<f64> {
        self.delegate(dir).partial(dir, at, out_axis, in_axis)
    }

    fn inverse_kind(&self) -> MapKind {
        TranMap {
            forward_map: self.inverse_map.get_inverse(),
            inverse_map: self.forward_map.get_inverse(),
        }
        .into()
    }

    fn show_params(&self, lines: &mut Vec<String>, indent: usize) {
        self.forward_map.show_lines(lines, indent);
        self.inverse_map.show_lines(lines, indent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{ShiftMap, UnitMap, ZoomMap};

    fn zoom(n: usize, z: f64) -> Mapping {
        ZoomMap::new(n, z).unwrap().into()
    }

    fn shift(s: &[f64]) -> Mapping {
        ShiftMap::new(s.to_vec()).unwrap().into()
    }

    #[test]
    fn series_applies_in_order() {
        let series: Mapping = SeriesMap::new(zoom(2, 2.0), shift(&[1.0, -1.0])).unwrap().into();
        assert_eq!(series.class_name(), "CmpMap");
        assert_eq!(series.tran_point(&[1.0, 1.0]).unwrap(), vec![3.0, 1.0]);
        assert_eq!(series.tran_inverse_point(&[3.0, 1.0]).unwrap(), vec![1.0, 1.0]);
    }

    #[test]
    fn series_rejects_mismatched_dimensions() {
        assert!(matches!(
            SeriesMap::new(zoom(2, 2.0), zoom(3, 2.0)),
            Err(MapError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn series_respects_component_inversion() {
        let series: Mapping = SeriesMap::new(zoom(1, 4.0).get_inverse(), shift(&[1.0])).unwrap().into();
        assert_eq!(series.tran_point(&[8.0]).unwrap(), vec![3.0]);
    }

    #[test]
    fn parallel_splits_axes() {
        let parallel: Mapping = ParallelMap::new(zoom(1, 2.0), shift(&[10.0, 20.0])).unwrap().into();
        assert_eq!(parallel.n_in(), 3);
        assert_eq!(parallel.tran_point(&[1.0, 1.0, 1.0]).unwrap(), vec![2.0, 11.0, 21.0]);
        assert_eq!(parallel.tran_inverse_point(&[2.0, 11.0, 21.0]).unwrap(), vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn parallel_partials_are_block_diagonal() {
        let parallel = ParallelMap::new(zoom(1, 2.0), zoom(1, 3.0)).unwrap();
        assert_eq!(parallel.partial(Direction::Forward, &[0.0, 0.0], 0, 0), Some(2.0));
        assert_eq!(parallel.partial(Direction::Forward, &[0.0, 0.0], 1, 1), Some(3.0));
        assert_eq!(parallel.partial(Direction::Forward, &[0.0, 0.0], 0, 1), Some(0.0));
    }

    #[test]
    fn tranmap_inverse_uses_second_inverse() {
        let unit: Mapping = UnitMap::new(2).unwrap().into();
        let tran = TranMap::new(unit, zoom(2, 0.5)).unwrap();
        let mut out = [0.0; 2];
        tran.apply(Direction::Inverse, &[1.0, 3.0], &mut out).unwrap();
        assert_eq!(out, [2.0, 6.0]);
    }

    #[test]
    fn tranmap_inverse_kind_swaps_roles() {
        let tran = TranMap::new(zoom(1, 2.0), shift(&[1.0])).unwrap();
        let inv: Mapping = tran.inverse_kind().into();
        // forward of the inverse is the inverse of the shift
        assert_eq!(inv.tran_point(&[5.0]).unwrap(), vec![4.0]);
        // inverse of the inverse is the forward zoom
        assert_eq!(inv.tran_inverse_point(&[5.0]).unwrap(), vec![10.0]);
    }

    #[test]
    fn tranmap_rejects_mismatched_dimensions() {
        assert!(TranMap::new(zoom(2, 1.0), zoom(3, 1.0)).is_err());
    }
}
