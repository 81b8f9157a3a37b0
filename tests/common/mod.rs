//! Helpers shared by the integration tests
#![allow(dead_code)]

use coordmap::{Mapping, PointBatch};

pub const RTOL: f64 = 1e-5;
pub const ATOL: f64 = 1e-8;

/// The five test points used throughout
pub fn frompos() -> PointBatch {
    PointBatch::from_rows(&[[1.0, 3.0], [2.0, 99.0], [-6.0, -5.0], [30.0, 21.0], [0.0, 0.0]]).unwrap()
}

/// Forward then inverse must reproduce `from`, both through `map` and
/// through its inverse handle.
pub fn round_trip(map: &Mapping, from: &PointBatch) -> Result<(), String> {
    let to = map.tran(from).map_err(|e| e.to_string())?;
    let back = map.tran_inverse(&to).map_err(|e| e.to_string())?;
    if !back.all_close(from, RTOL, ATOL) {
        return Err(format!("{} round trip: {:?} != {:?}", map.class_name(), back.to_rows(), from.to_rows()));
    }

    let inverse = map.get_inverse();
    let to_via_inverse = inverse.tran_inverse(from).map_err(|e| e.to_string())?;
    if !to_via_inverse.all_close(&to, RTOL, ATOL) {
        return Err(format!("{} inverse handle disagrees with forward", map.class_name()));
    }
    let back_via_inverse = inverse.tran(&to_via_inverse).map_err(|e| e.to_string())?;
    if !back_via_inverse.all_close(from, RTOL, ATOL) {
        return Err(format!("{} inverse handle round trip failed", map.class_name()));
    }
    Ok(())
}

#[track_caller]
pub fn check_round_trip(map: &Mapping, from: &PointBatch) {
    if let Err(message) = round_trip(map, from) {
        panic!("{message}");
    }
}

/// numpy-style `allclose` on flat slices
#[track_caller]
pub fn assert_allclose(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len(), "length mismatch: {actual:?} vs {expected:?}");
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() <= ATOL + RTOL * e.abs(), "{actual:?} != {expected:?}");
    }
}

/// A deep copy is equal but does not share its definition
#[track_caller]
pub fn check_copy(map: &Mapping) {
    let copy = map.copy();
    assert!(!copy.same(map));
    assert_eq!(&copy, map);
    assert_eq!(copy.show(), map.show());
}

/// Survives a JSON round trip through its record
#[track_caller]
pub fn check_persistence(map: &Mapping) {
    let text = serde_json::to_string(&map.to_record()).unwrap();
    let back = Mapping::from_record(serde_json::from_str(&text).unwrap()).unwrap();
    assert_eq!(&back, map);
    assert_eq!(back.show(), map.show());
}
