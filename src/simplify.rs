//! Algebraic reduction of mappings to canonical form
//!
//! The rules work on [`MapKind`] values with any handle inversion already
//! folded in, so the result never carries `Invert = 1` at any level.

use crate::log::debug;
use crate::mapping::primitives::AxisAffine;
use crate::mapping::{MapKind, Mapping, ParallelMap, SeriesMap, TranMap, Transform, UnitMap};
use crate::types::Direction;

impl Mapping {
    /// An equivalent mapping in canonical form.
    ///
    /// The result is never inverted, has `is_simple() == true` and the same
    /// `n_in`/`n_out`. Simplifying it again changes nothing.
    pub fn simplify(&self) -> Mapping {
        let simplified = simplify_kind(self.normalized_kind());
        debug!(
            "simplified {} ({} -> {}) to {}",
            self.class_name(),
            self.n_in(),
            self.n_out(),
            simplified.class_name()
        );
        Mapping::new_simple(simplified)
    }
}

enum Merged {
    Cancelled,
    Into(MapKind),
}

fn simplify_kind(kind: MapKind) -> MapKind {
    if let Some(affine) = AxisAffine::from_kind(&kind) {
        return affine.into_kind();
    }
    match kind {
        MapKind::SeriesMap(series) => simplify_series(&series),
        MapKind::ParallelMap(parallel) => simplify_parallel(&parallel),
        MapKind::TranMap(tran) => simplify_tran(&tran),
        other => other,
    }
}

fn simplify_series(series: &SeriesMap) -> MapKind {
    let n_in = series.n_in();
    let mut chain = Vec::new();
    flatten_series(series.first().normalized_kind(), &mut chain);
    flatten_series(series.second().normalized_kind(), &mut chain);

    let mut merged: Vec<MapKind> = Vec::with_capacity(chain.len());
    for kind in chain {
        let mut pending = Some(kind);
        while let Some(current) = pending.take() {
            match merged.last().and_then(|prev| merge_pair(prev, &current)) {
                Some(Merged::Cancelled) => {
                    merged.pop();
                }
                Some(Merged::Into(kind)) => {
                    merged.pop();
                    pending = Some(kind);
                }
                None => merged.push(current),
            }
        }
    }

    let mut parts = merged.into_iter();
    let Some(first) = parts.next() else {
        return UnitMap::new(n_in).map_or_else(|_| series.clone().into(), MapKind::from);
    };
    parts.fold(first, |acc, next| {
        SeriesMap::new_unchecked(Mapping::new_simple(acc), Mapping::new_simple(next)).into()
    })
}

/// Push the simplified, non-series links of `kind` onto `chain`
fn flatten_series(kind: MapKind, chain: &mut Vec<MapKind>) {
    let simplified = match kind {
        MapKind::SeriesMap(series) => {
            flatten_series(series.first().normalized_kind(), chain);
            flatten_series(series.second().normalized_kind(), chain);
            return;
        }
        other => simplify_kind(other),
    };
    match simplified {
        MapKind::SeriesMap(series) => {
            flatten_series(series.first().normalized_kind(), chain);
            flatten_series(series.second().normalized_kind(), chain);
        }
        other => chain.push(other),
    }
}

/// Combine two adjacent links of a series chain, if any rule applies
fn merge_pair(prev: &MapKind, next: &MapKind) -> Option<Merged> {
    if matches!(prev, MapKind::UnitMap(_)) {
        return Some(Merged::Into(next.clone()));
    }
    if matches!(next, MapKind::UnitMap(_)) {
        return Some(Merged::Into(prev.clone()));
    }
    // Cancelling a one-way map against its inverse would invent a direction
    // the chain did not have.
    let two_way = prev.has_direction(Direction::Forward) && prev.has_direction(Direction::Inverse);
    if two_way && prev.inverse_kind() == *next {
        return Some(Merged::Cancelled);
    }
    let a = AxisAffine::from_kind(prev)?;
    let b = AxisAffine::from_kind(next)?;
    Some(Merged::Into(a.then(&b).into_kind()))
}

fn simplify_parallel(parallel: &ParallelMap) -> MapKind {
    let first = simplify_kind(parallel.first().normalized_kind());
    let second = simplify_kind(parallel.second().normalized_kind());
    match (AxisAffine::from_kind(&first), AxisAffine::from_kind(&second)) {
        (Some(a), Some(b)) => a.beside(&b).into_kind(),
        _ => ParallelMap::new_unchecked(Mapping::new_simple(first), Mapping::new_simple(second)).into(),
    }
}

fn simplify_tran(tran: &TranMap) -> MapKind {
    let forward = simplify_kind(tran.forward_map().normalized_kind());
    let inverse = simplify_kind(tran.inverse_map().normalized_kind());
    if forward == inverse {
        forward
    } else {
        TranMap::new_unchecked(Mapping::new_simple(forward), Mapping::new_simple(inverse)).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{PolyMap, ShiftMap, WinMap, ZoomMap};

    fn zoom(n: usize, z: f64) -> Mapping {
        ZoomMap::new(n, z).unwrap().into()
    }

    fn shift(s: &[f64]) -> Mapping {
        ShiftMap::new(s.to_vec()).unwrap().into()
    }

    fn unit(n: usize) -> Mapping {
        UnitMap::new(n).unwrap().into()
    }

    fn parabola() -> Mapping {
        // y = x^2 / 2 + 1, x = sqrt(2y - 2) is not polynomial, so forward only
        PolyMap::new(&[[1.0, 1.0, 0.0], [0.5, 1.0, 2.0]], 1).unwrap().into()
    }

    #[test]
    fn zoom_stays_zoom() {
        let simple = zoom(2, 1.3).simplify();
        assert_eq!(simple.class_name(), "ZoomMap");
        assert!(simple.is_simple());
        assert!(!simple.is_inverted());
        assert_eq!(simple.tran_point(&[1.0, 2.0]).unwrap(), vec![1.3, 2.6]);
    }

    #[test]
    fn inversion_is_folded_in() {
        let simple = zoom(1, 4.0).get_inverse().simplify();
        assert!(!simple.is_inverted());
        assert_eq!(simple.kind(), &MapKind::from(ZoomMap::new(1, 0.25).unwrap()));
    }

    #[test]
    fn unit_zoom_becomes_unit() {
        assert_eq!(zoom(3, 1.0).simplify().class_name(), "UnitMap");
    }

    #[test]
    fn map_then_inverse_cancels() {
        let z = zoom(2, 1.3);
        let round = z.then(&z.get_inverse()).unwrap().simplify();
        assert_eq!(round.class_name(), "UnitMap");
        assert_eq!(round.n_in(), 2);
    }

    #[test]
    fn adjacent_affines_merge() {
        let chain = zoom(2, 2.0).then(&shift(&[1.0, -1.0])).unwrap();
        let simple = chain.simplify();
        assert_eq!(simple.class_name(), "WinMap");
        assert_eq!(simple.tran_point(&[1.0, 1.0]).unwrap(), chain.tran_point(&[1.0, 1.0]).unwrap());

        let zooms = zoom(1, 2.0).then(&zoom(1, 3.0)).unwrap().simplify();
        assert_eq!(zooms.kind(), &MapKind::from(ZoomMap::new(1, 6.0).unwrap()));
    }

    #[test]
    fn units_are_dropped_around_polynomials() {
        let chain = unit(1).then(&parabola()).unwrap().then(&unit(1)).unwrap();
        let simple = chain.simplify();
        assert_eq!(simple.class_name(), "PolyMap");
        assert_eq!(simple.tran_point(&[2.0]).unwrap(), vec![3.0]);
    }

    #[test]
    fn one_way_polynomial_does_not_cancel() {
        let p = parabola();
        let chain = p.then(&p.get_inverse()).unwrap();
        assert!(!chain.has_inverse());
        let simple = chain.simplify();
        assert_eq!(simple.class_name(), "CmpMap");
        assert!(!simple.has_inverse());
        assert!(!simple.has_forward());
    }

    #[test]
    fn two_way_polynomial_cancels() {
        let p: Mapping = PolyMap::with_inverse(&[[2.0, 1.0, 1.0]], &[[0.5, 1.0, 1.0]]).unwrap().into();
        let simple = p.then(&p.get_inverse()).unwrap().simplify();
        assert_eq!(simple.class_name(), "UnitMap");
    }

    #[test]
    fn parallel_affines_merge() {
        let simple = zoom(1, 2.0).over(&zoom(2, 2.0)).unwrap().simplify();
        assert_eq!(simple.kind(), &MapKind::from(ZoomMap::new(3, 2.0).unwrap()));

        let mixed = shift(&[1.0]).over(&zoom(1, 2.0)).unwrap().simplify();
        assert_eq!(
            mixed.kind(),
            &MapKind::from(WinMap::from_scale_offset(vec![2.0, 1.0], vec![0.0, 1.0]).unwrap())
        );
    }

    #[test]
    fn tranmap_of_equal_parts_collapses() {
        let tran: Mapping = TranMap::new(zoom(2, 1.5), zoom(2, 1.5)).unwrap().into();
        assert_eq!(tran.simplify().class_name(), "ZoomMap");

        let asymmetric: Mapping = TranMap::new(unit(2), zoom(2, 0.5)).unwrap().into();
        assert_eq!(asymmetric.simplify().class_name(), "TranMap");
    }

    #[test]
    fn simplify_is_idempotent() {
        let chain = zoom(2, 2.0)
            .then(&parabola().over(&parabola()).unwrap().then(&zoom(2, 1.0)).unwrap())
            .unwrap();
        let once = chain.simplify();
        let twice = once.simplify();
        assert_eq!(once.kind(), twice.kind());
        assert!(twice.is_simple());

        let point = [0.5, -1.5];
        assert_eq!(once.tran_point(&point).unwrap(), chain.tran_point(&point).unwrap());
    }
}
