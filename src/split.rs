//! Extracting the part of a mapping that acts on a subset of its inputs
//!
//! A split succeeds when the outputs fed by the requested inputs are fed by
//! nothing else. The split mapping takes the requested inputs in the order
//! given and produces the outputs listed in [`MapSplit::orig_out`].

use crate::errors::{MapError, Result};
use crate::log::debug;
use crate::mapping::poly::PolyCoeffs;
use crate::mapping::primitives::AxisAffine;
use crate::mapping::{
    MapKind, Mapping, ParallelMap, PolyMap, SeriesMap, ShiftMap, TranMap, UnitMap, WinMap, ZoomMap,
};
use crate::types::{Direction, axis_index};

/// The result of splitting a mapping
#[derive(Debug, Clone, PartialEq)]
pub struct MapSplit {
    /// Maps the requested inputs to the outputs they determine
    pub split_map: Mapping,
    /// 1-based output axes of the original mapping, in `split_map` order
    pub orig_out: Vec<usize>,
}

impl MapSplit {
    /// Split `map` on the given 1-based input axes.
    ///
    /// The split map takes its inputs in the order of `axes`. For a parallel
    /// mapping, axes feeding the first component must all be listed before
    /// axes feeding the second: `[1, 3]` can split where `[3, 1]` fails with
    /// [`MapError::UnsplittableMapping`].
    pub fn new(map: &Mapping, axes: &[usize]) -> Result<Self> {
        if axes.is_empty() {
            return Err(MapError::invalid("at least one input axis is needed to split"));
        }
        let mut inputs = Vec::with_capacity(axes.len());
        for &axis in axes {
            let input = axis_index(axis, map.n_in())?;
            if inputs.contains(&input) {
                return Err(MapError::invalid(format!("input axis {axis} requested twice")));
            }
            inputs.push(input);
        }

        let (kind, outputs) =
            split_kind(&map.normalized_kind(), &inputs).ok_or_else(|| MapError::UnsplittableMapping {
                class: map.class_name(),
                axes: axes.to_vec(),
            })?;
        debug!(
            "split {} on inputs {:?}: outputs {:?}",
            map.class_name(),
            axes,
            outputs.iter().map(|o| o + 1).collect::<Vec<_>>()
        );
        Ok(Self {
            split_map: Mapping::new(kind),
            orig_out: outputs.into_iter().map(|o| o + 1).collect(),
        })
    }
}

/// Split on 0-based `inputs`, returning the split kind and its 0-based
/// outputs
fn split_kind(kind: &MapKind, inputs: &[usize]) -> Option<(MapKind, Vec<usize>)> {
    match kind {
        MapKind::UnitMap(_) => Some((UnitMap::new(inputs.len()).ok()?.into(), inputs.to_vec())),
        MapKind::ZoomMap(zoom) => Some((ZoomMap::new(inputs.len(), zoom.zoom()).ok()?.into(), inputs.to_vec())),
        MapKind::ShiftMap(_) | MapKind::WinMap(_) => {
            let picked = AxisAffine::from_kind(kind)?.pick(inputs);
            let split: MapKind = if matches!(kind, MapKind::ShiftMap(_)) {
                ShiftMap::new(picked.offset).ok()?.into()
            } else {
                WinMap::from_scale_offset(picked.scale, picked.offset).ok()?.into()
            };
            Some((split, inputs.to_vec()))
        }
        MapKind::PolyMap(poly) => split_poly(poly, inputs),
        MapKind::SeriesMap(series) => {
            let (first, mid) = split_kind(&series.first().normalized_kind(), inputs)?;
            let (second, outputs) = split_kind(&series.second().normalized_kind(), &mid)?;
            let split = SeriesMap::new(Mapping::new(first), Mapping::new(second)).ok()?;
            Some((split.into(), outputs))
        }
        MapKind::ParallelMap(parallel) => split_parallel(parallel, inputs),
        MapKind::TranMap(tran) => {
            let (forward, outputs) = split_kind(&tran.forward_map().normalized_kind(), inputs)?;
            let (inverse, inverse_outputs) = split_kind(&tran.inverse_map().normalized_kind(), inputs)?;
            if outputs != inverse_outputs {
                return None;
            }
            let split = TranMap::new(Mapping::new(forward), Mapping::new(inverse)).ok()?;
            Some((split.into(), outputs))
        }
    }
}

fn split_poly(poly: &PolyMap, inputs: &[usize]) -> Option<(MapKind, Vec<usize>)> {
    let forward = poly.coeffs(Direction::Forward)?;
    let outputs = closed_outputs(forward, inputs)?;

    // Keep the inverse only if it maps the kept outputs back onto exactly
    // the requested inputs.
    let inverse = poly.coeffs(Direction::Inverse).and_then(|inverse| {
        let deps = inverse.dependencies();
        let consistent = inputs
            .iter()
            .all(|&i| (0..inverse.n_in).all(|o| !deps[i][o] || outputs.contains(&o)));
        let restricted = inverse.restrict(&outputs, inputs);
        (consistent && !restricted.terms.is_empty()).then_some(restricted)
    });
    let iterative = poly.iterative().filter(|_| inputs.len() == outputs.len());

    let split = PolyMap::from_parts(Some(forward.restrict(inputs, &outputs)), inverse, iterative).ok()?;
    Some((split.into(), outputs))
}

/// Outputs that depend on any of `inputs`, provided they depend on nothing
/// else
fn closed_outputs(coeffs: &PolyCoeffs, inputs: &[usize]) -> Option<Vec<usize>> {
    let deps = coeffs.dependencies();
    let mut outputs = Vec::new();
    for (out, row) in deps.iter().enumerate() {
        if !inputs.iter().any(|&i| row[i]) {
            continue;
        }
        if row.iter().enumerate().any(|(i, &d)| d && !inputs.contains(&i)) {
            return None;
        }
        outputs.push(out);
    }
    (!outputs.is_empty()).then_some(outputs)
}

/// Inputs for the first component must all come before those for the second,
/// since the split can not reorder axes across components.
fn split_parallel(parallel: &ParallelMap, inputs: &[usize]) -> Option<(MapKind, Vec<usize>)> {
    let first = parallel.first();
    let second = parallel.second();
    let boundary = first.n_in();
    let n_low = inputs.iter().take_while(|&&i| i < boundary).count();
    if inputs[n_low..].iter().any(|&i| i < boundary) {
        return None;
    }
    let low = &inputs[..n_low];
    let high: Vec<usize> = inputs[n_low..].iter().map(|&i| i - boundary).collect();

    let lower = if low.is_empty() {
        None
    } else {
        Some(split_kind(&first.normalized_kind(), low)?)
    };
    let upper = if high.is_empty() {
        None
    } else {
        let (kind, outputs) = split_kind(&second.normalized_kind(), &high)?;
        Some((kind, outputs.into_iter().map(|o| o + first.n_out()).collect::<Vec<_>>()))
    };

    match (lower, upper) {
        (Some(part), None) | (None, Some(part)) => Some(part),
        (Some((a, mut outputs)), Some((b, upper_outputs))) => {
            outputs.extend(upper_outputs);
            let split = ParallelMap::new(Mapping::new(a), Mapping::new(b)).ok()?;
            Some((split.into(), outputs))
        }
        (None, None) => None,
    }
}
