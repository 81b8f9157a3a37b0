//! Mappings between coordinate systems
//!
//! This module is organized into submodules:
//! - `primitives`: UnitMap, ZoomMap, ShiftMap, WinMap
//! - `poly`: PolyMap
//! - `compound`: SeriesMap, ParallelMap, TranMap
//!
//! Every mapping kind implements [`Transform`]; [`MapKind`] is the closed set
//! of kinds, and [`Mapping`] is the user-facing handle that adds inversion
//! and per-handle attributes on top of a shared definition.

pub mod compound;
pub mod poly;
pub mod primitives;

pub use compound::{ParallelMap, SeriesMap, TranMap};
pub use poly::PolyMap;
pub use primitives::{ShiftMap, UnitMap, WinMap, ZoomMap};

use std::sync::Arc;

use enum_dispatch::enum_dispatch;
use glam::DVec2;

use crate::attributes::{AttrName, Attributes};
use crate::errors::{MapError, Result};
use crate::types::{Direction, PointBatch};

/// Batches at least this large are split across the rayon pool.
#[cfg(feature = "parallel")]
const PARALLEL_THRESHOLD: usize = 4096;

/// Common behavior of every mapping definition
#[enum_dispatch]
pub trait Transform {
    /// Number of input coordinates of the forward transformation
    fn n_in(&self) -> usize;

    /// Number of output coordinates of the forward transformation
    fn n_out(&self) -> usize;

    /// Class name as reported by [`Mapping::class_name`]
    fn class_name(&self) -> &'static str;

    /// Whether the mapping is linear (class property, not a numeric test)
    fn is_linear(&self) -> bool;

    /// Whether the transformation in `dir` is defined
    fn has_direction(&self, dir: Direction) -> bool;

    /// Transform one point.
    ///
    /// For `Forward`, `input` has `n_in` coordinates and `output` has `n_out`;
    /// for `Inverse` the other way round. Callers check the lengths and that
    /// the direction is defined.
    fn apply(&self, dir: Direction, input: &[f64], output: &mut [f64]) -> Result<()>;

    /// Analytic partial derivative `d output[out_axis] / d input[in_axis]`
    /// (0-based) of the transformation in `dir`, if the kind knows one.
    fn partial(&self, _dir: Direction, _at: &[f64], _out_axis: usize, _in_axis: usize) -> Option<f64> {
        None
    }

    /// The same mapping with forward and inverse swapped
    fn inverse_kind(&self) -> MapKind;

    /// Append the class-specific lines of [`Mapping::show`]
    fn show_params(&self, lines: &mut Vec<String>, indent: usize);
}

/// The closed set of mapping kinds
#[enum_dispatch(Transform)]
#[derive(Debug, Clone, PartialEq)]
pub enum MapKind {
    UnitMap,
    ZoomMap,
    ShiftMap,
    WinMap,
    PolyMap,
    SeriesMap,
    ParallelMap,
    TranMap,
}

/// A handle on a mapping definition.
///
/// Cloning a handle is cheap and shares the definition; each clone owns its
/// own attributes (`Report`, `Invert`, `Ident`), so toggling one never
/// affects another. Use [`Mapping::copy`] for a deep copy.
#[derive(Debug, Clone, PartialEq)]
pub struct Mapping {
    kind: Arc<MapKind>,
    attrs: Attributes,
    simple: bool,
}

macro_rules! mapping_from_kind {
    ($($kind:ident),* $(,)?) => {
        $(
            impl From<$kind> for Mapping {
                fn from(kind: $kind) -> Self {
                    Mapping::new(kind)
                }
            }
        )*
    };
}

mapping_from_kind!(
    MapKind,
    UnitMap,
    ZoomMap,
    ShiftMap,
    WinMap,
    PolyMap,
    SeriesMap,
    ParallelMap,
    TranMap,
);

impl Mapping {
    pub fn new(kind: impl Into<MapKind>) -> Self {
        Self {
            kind: Arc::new(kind.into()),
            attrs: Attributes::default(),
            simple: false,
        }
    }

    /// A fresh, non-inverted handle flagged as simplified
    pub(crate) fn new_simple(kind: MapKind) -> Self {
        Self {
            kind: Arc::new(kind),
            attrs: Attributes::default(),
            simple: true,
        }
    }

    pub(crate) fn from_parts(kind: MapKind, attrs: Attributes, simple: bool) -> Self {
        Self {
            kind: Arc::new(kind),
            attrs,
            simple,
        }
    }

    pub(crate) fn attributes(&self) -> &Attributes {
        &self.attrs
    }

    /// The underlying definition, ignoring this handle's inversion
    pub fn kind(&self) -> &MapKind {
        &self.kind
    }

    pub fn class_name(&self) -> &'static str {
        self.kind.class_name()
    }

    pub fn n_in(&self) -> usize {
        if self.is_inverted() {
            self.kind.n_out()
        } else {
            self.kind.n_in()
        }
    }

    pub fn n_out(&self) -> usize {
        if self.is_inverted() {
            self.kind.n_in()
        } else {
            self.kind.n_out()
        }
    }

    pub fn is_inverted(&self) -> bool {
        self.attrs.invert()
    }

    pub fn is_linear(&self) -> bool {
        self.kind.is_linear()
    }

    /// Set only on the result of [`Mapping::simplify`]
    pub fn is_simple(&self) -> bool {
        self.simple
    }

    /// Is the forward transformation (`TranForward`) defined?
    pub fn has_forward(&self) -> bool {
        self.has_direction(Direction::Forward)
    }

    /// Is the inverse transformation (`TranInverse`) defined?
    pub fn has_inverse(&self) -> bool {
        self.has_direction(Direction::Inverse)
    }

    pub fn has_direction(&self, dir: Direction) -> bool {
        self.kind.has_direction(dir.resolve(self.is_inverted()))
    }

    pub fn report(&self) -> bool {
        self.attrs.report()
    }

    pub fn set_report(&mut self, report: bool) {
        self.attrs.set_report(report);
    }

    pub fn ident(&self) -> &str {
        self.attrs.ident()
    }

    pub fn set_ident(&mut self, ident: impl Into<String>) {
        self.attrs.set_ident(ident);
    }

    /// Has the named attribute been explicitly set?
    pub fn test(&self, name: &str) -> Result<bool> {
        Ok(self.test_attr(name.parse()?))
    }

    /// Restore the named attribute to its default
    pub fn clear(&mut self, name: &str) -> Result<()> {
        self.clear_attr(name.parse()?)
    }

    pub fn test_attr(&self, name: AttrName) -> bool {
        self.attrs.test(name)
    }

    pub fn clear_attr(&mut self, name: AttrName) -> Result<()> {
        self.attrs.clear(name)
    }

    /// Swap the forward and inverse transformations in place
    pub fn invert(&mut self) {
        let inverted = !self.is_inverted();
        self.attrs.set_invert(inverted);
    }

    /// A new handle on the same definition with the directions swapped
    pub fn get_inverse(&self) -> Mapping {
        let mut inverse = self.clone();
        inverse.invert();
        inverse
    }

    /// Deep copy: the copy does not share its definition with `self`
    pub fn copy(&self) -> Mapping {
        Self {
            kind: Arc::new(self.kind.as_ref().clone()),
            attrs: self.attrs.clone(),
            simple: self.simple,
        }
    }

    /// Do both handles share one definition? Identity, not equality.
    pub fn same(&self, other: &Mapping) -> bool {
        Arc::ptr_eq(&self.kind, &other.kind)
    }

    /// The definition with this handle's inversion folded in
    pub(crate) fn normalized_kind(&self) -> MapKind {
        if self.is_inverted() {
            self.kind.inverse_kind()
        } else {
            self.kind.as_ref().clone()
        }
    }

    /// Transform one point in `dir` (relative to this handle).
    pub(crate) fn apply_point(&self, dir: Direction, input: &[f64], output: &mut [f64]) -> Result<()> {
        let resolved = dir.resolve(self.is_inverted());
        if !self.kind.has_direction(resolved) {
            return Err(self.undefined(dir));
        }
        self.kind.apply(resolved, input, output)
    }

    pub(crate) fn partial(&self, dir: Direction, at: &[f64], out_axis: usize, in_axis: usize) -> Option<f64> {
        self.kind
            .partial(dir.resolve(self.is_inverted()), at, out_axis, in_axis)
    }

    pub(crate) fn undefined(&self, dir: Direction) -> MapError {
        MapError::UndefinedTransform {
            class: self.class_name(),
            direction: dir.label(),
        }
    }

    /// Coordinates in and out of the transformation in `dir`
    pub(crate) fn dims(&self, dir: Direction) -> (usize, usize) {
        match dir {
            Direction::Forward => (self.n_in(), self.n_out()),
            Direction::Inverse => (self.n_out(), self.n_in()),
        }
    }

    /// Apply the forward transformation to a batch of `n_in`-dimensional points
    pub fn tran(&self, points: &PointBatch) -> Result<PointBatch> {
        self.transform(Direction::Forward, points)
    }

    /// Apply the inverse transformation to a batch of `n_out`-dimensional points
    pub fn tran_inverse(&self, points: &PointBatch) -> Result<PointBatch> {
        self.transform(Direction::Inverse, points)
    }

    /// Apply the transformation in `dir` to a batch
    pub fn transform(&self, dir: Direction, points: &PointBatch) -> Result<PointBatch> {
        let output = self.evaluate(dir, points)?;
        if self.report() {
            for (input, result) in points.points().zip(output.points()) {
                crate::log::info!(
                    "{} {}: ({}) --> ({})",
                    self.class_name(),
                    dir,
                    fmt_coords(input),
                    fmt_coords(result)
                );
            }
        }
        Ok(output)
    }

    /// [`Mapping::transform`] without the `Report` output
    pub(crate) fn evaluate(&self, dir: Direction, points: &PointBatch) -> Result<PointBatch> {
        if !self.has_direction(dir) {
            return Err(self.undefined(dir));
        }
        let (dim_in, dim_out) = self.dims(dir);
        MapError::check_len("point dimensionality", dim_in, points.n_coords())?;

        let mut output = PointBatch::zeros(points.n_points(), dim_out);
        self.transform_into(dir, points, &mut output)?;
        Ok(output)
    }

    #[cfg(feature = "parallel")]
    fn transform_into(&self, dir: Direction, points: &PointBatch, output: &mut PointBatch) -> Result<()> {
        use rayon::prelude::*;

        let (dim_in, dim_out) = self.dims(dir);
        if points.n_points() >= PARALLEL_THRESHOLD {
            return points
                .as_slice()
                .par_chunks(dim_in)
                .zip(output.as_mut_slice().par_chunks_mut(dim_out))
                .try_for_each(|(input, out)| self.apply_point(dir, input, out));
        }
        self.transform_serial(dir, points, output)
    }

    #[cfg(not(feature = "parallel"))]
    fn transform_into(&self, dir: Direction, points: &PointBatch, output: &mut PointBatch) -> Result<()> {
        self.transform_serial(dir, points, output)
    }

    fn transform_serial(&self, dir: Direction, points: &PointBatch, output: &mut PointBatch) -> Result<()> {
        for index in 0..points.n_points() {
            self.apply_point(dir, points.point(index), output.point_mut(index))?;
        }
        Ok(())
    }

    /// Forward-transform a single point
    pub fn tran_point(&self, point: &[f64]) -> Result<Vec<f64>> {
        Ok(self.tran(&PointBatch::from_point(point)?)?.into_vec())
    }

    /// Inverse-transform a single point
    pub fn tran_inverse_point(&self, point: &[f64]) -> Result<Vec<f64>> {
        Ok(self.tran_inverse(&PointBatch::from_point(point)?)?.into_vec())
    }

    /// Forward-transform a point of a two-dimensional mapping
    pub fn tran_point2(&self, point: DVec2) -> Result<DVec2> {
        let out = self.tran_point(&point.to_array())?;
        point2(&out)
    }

    /// Inverse-transform a point of a two-dimensional mapping
    pub fn tran_inverse_point2(&self, point: DVec2) -> Result<DVec2> {
        let out = self.tran_inverse_point(&point.to_array())?;
        point2(&out)
    }

    /// Series composition: `self` followed by `next`
    pub fn then(&self, next: &Mapping) -> Result<Mapping> {
        Ok(SeriesMap::new(self.clone(), next.clone())?.into())
    }

    /// Series composition: `first` followed by `self`
    pub fn of(&self, first: &Mapping) -> Result<Mapping> {
        first.then(self)
    }

    /// Parallel composition: `first` on the lower axes, `self` on the rest
    pub fn over(&self, first: &Mapping) -> Result<Mapping> {
        Ok(ParallelMap::new(first.clone(), self.clone())?.into())
    }

    /// Textual description, primarily a debugging aid
    pub fn show(&self) -> String {
        let mut lines = Vec::new();
        self.show_lines(&mut lines, 0);
        lines.join("\n")
    }

    pub(crate) fn show_lines(&self, lines: &mut Vec<String>, indent: usize) {
        let pad = " ".repeat(indent);
        let inner = indent + 3;
        let inner_pad = " ".repeat(inner);
        lines.push(format!("{pad}Begin {}", self.class_name()));
        lines.push(format!("{inner_pad}Nin = {}", self.kind.n_in()));
        if self.kind.n_out() != self.kind.n_in() {
            lines.push(format!("{inner_pad}Nout = {}", self.kind.n_out()));
        }
        if self.is_inverted() {
            lines.push(format!("{inner_pad}Invert = 1"));
        }
        if self.simple {
            lines.push(format!("{inner_pad}IsSimple = 1"));
        }
        if self.test_attr(AttrName::Report) {
            lines.push(format!("{inner_pad}Report = {}", u8::from(self.report())));
        }
        if self.test_attr(AttrName::Ident) {
            lines.push(format!("{inner_pad}Ident = \"{}\"", self.ident()));
        }
        self.kind.show_params(lines, inner);
        lines.push(format!("{pad}End {}", self.class_name()));
    }
}

fn point2(coords: &[f64]) -> Result<DVec2> {
    match coords {
        [x, y] => Ok(DVec2::new(*x, *y)),
        _ => Err(MapError::dimension("output dimensionality", 2, coords.len())),
    }
}

/// Format coordinates as `1, 2.5, -3`
pub(crate) fn fmt_coords(coords: &[f64]) -> String {
    coords
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zoom(n: usize, z: f64) -> Mapping {
        ZoomMap::new(n, z).unwrap().into()
    }

    #[test]
    fn zoom_attributes() {
        let map = zoom(2, 1.3);
        assert_eq!(map.class_name(), "ZoomMap");
        assert!(!map.is_inverted());
        assert!(map.is_linear());
        assert!(!map.is_simple());
        assert_eq!(map.n_in(), 2);
        assert_eq!(map.n_out(), 2);
        assert!(!map.report());
        assert!(map.has_forward());
        assert!(map.has_inverse());
    }

    #[test]
    fn inverse_shares_definition() {
        let map = zoom(2, 1.3);
        let inv = map.get_inverse();
        assert!(inv.is_inverted());
        assert!(inv.same(&map));
        assert!(!map.copy().same(&map));

        let point = [2.6, -1.3];
        let via_inverse = inv.tran_point(&point).unwrap();
        let via_original = map.tran_inverse_point(&point).unwrap();
        assert_eq!(via_inverse, via_original);
    }

    #[test]
    fn invert_twice_restores() {
        let mut map = zoom(3, 2.0);
        map.invert();
        assert!(map.is_inverted());
        map.invert();
        assert!(!map.is_inverted());
        assert!(map.test("Invert").unwrap());
        map.clear("Invert").unwrap();
        assert!(!map.test("Invert").unwrap());
    }

    #[test]
    fn report_is_per_handle() {
        let mut a = zoom(2, 2.0);
        let b = a.clone();
        a.set_report(true);
        assert!(a.report());
        assert!(!b.report());
        assert!(a.same(&b));
    }

    #[test]
    fn rejects_wrong_batch_width() {
        let map = zoom(2, 2.0);
        let batch = PointBatch::new(3, vec![1.0, 2.0, 3.0]).unwrap();
        assert!(matches!(
            map.tran(&batch),
            Err(MapError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn unknown_attribute_name() {
        let mut map = zoom(2, 2.0);
        assert!(matches!(
            map.test("Zoomed"),
            Err(MapError::UnknownAttribute { .. })
        ));
        assert!(matches!(
            map.clear("Nin"),
            Err(MapError::ReadOnlyAttribute { .. })
        ));
    }

    #[test]
    fn two_dimensional_helpers() {
        let map = zoom(2, 0.5);
        let out = map.tran_point2(DVec2::new(4.0, -2.0)).unwrap();
        assert_eq!(out, DVec2::new(2.0, -1.0));
        let back = map.tran_inverse_point2(out).unwrap();
        assert_eq!(back, DVec2::new(4.0, -2.0));
        assert!(zoom(3, 1.0).tran_point2(DVec2::ZERO).is_err());
    }

    #[test]
    fn show_zoom_map() {
        insta::assert_snapshot!(zoom(2, 1.3).show(), @r"
        Begin ZoomMap
           Nin = 2
           Zoom = 1.3
        End ZoomMap
        ");
    }

    #[test]
    fn show_inverted_with_attributes() {
        let mut map = zoom(1, 4.0).get_inverse();
        map.set_report(false);
        map.set_ident("scale");
        insta::assert_snapshot!(map.show(), @r#"
        Begin ZoomMap
           Nin = 1
           Invert = 1
           Report = 0
           Ident = "scale"
           Zoom = 4
        End ZoomMap
        "#);
    }
}
