//! Structured persistence record
//!
//! [`MappingRecord`] is a plain serde tree describing a mapping. The crate
//! does not pick an encoding; any serde format works. Decoding goes back
//! through the public constructors, so a record that names invalid
//! parameters fails the same way direct construction would.
//!
//! Records are trees: two components that shared one definition come back
//! as independent copies.

use serde::{Deserialize, Serialize};

use crate::attributes::Attributes;
use crate::config::IterInverseConfig;
use crate::errors::{MapError, Result};
use crate::mapping::poly::PolyCoeffs;
use crate::mapping::{MapKind, Mapping, ParallelMap, PolyMap, SeriesMap, ShiftMap, TranMap, Transform, UnitMap, WinMap, ZoomMap};

/// One mapping handle: its definition plus the handle's own attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingRecord {
    pub kind: KindRecord,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub simple: bool,
}

/// Class-specific parameters, tagged with the class name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "class")]
pub enum KindRecord {
    UnitMap {
        n: usize,
    },
    ZoomMap {
        n: usize,
        zoom: f64,
    },
    ShiftMap {
        shift: Vec<f64>,
    },
    WinMap {
        scale: Vec<f64>,
        offset: Vec<f64>,
    },
    PolyMap {
        n_in: usize,
        n_out: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        forward: Option<Vec<Vec<f64>>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        inverse: Option<Vec<Vec<f64>>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        iter_inverse: Option<IterInverseConfig>,
    },
    SeriesMap {
        first: Box<MappingRecord>,
        second: Box<MappingRecord>,
    },
    ParallelMap {
        first: Box<MappingRecord>,
        second: Box<MappingRecord>,
    },
    TranMap {
        forward_map: Box<MappingRecord>,
        inverse_map: Box<MappingRecord>,
    },
}

impl KindRecord {
    fn from_kind(kind: &MapKind) -> Self {
        match kind {
            MapKind::UnitMap(m) => KindRecord::UnitMap { n: m.n() },
            MapKind::ZoomMap(m) => KindRecord::ZoomMap {
                n: m.n(),
                zoom: m.zoom(),
            },
            MapKind::ShiftMap(m) => KindRecord::ShiftMap {
                shift: m.shift().to_vec(),
            },
            MapKind::WinMap(m) => KindRecord::WinMap {
                scale: m.scale().to_vec(),
                offset: m.offset().to_vec(),
            },
            MapKind::PolyMap(m) => KindRecord::PolyMap {
                n_in: m.n_in(),
                n_out: m.n_out(),
                forward: m.forward_coeffs(),
                inverse: m.inverse_coeffs(),
                iter_inverse: m.iterative(),
            },
            MapKind::SeriesMap(m) => KindRecord::SeriesMap {
                first: Box::new(m.first().to_record()),
                second: Box::new(m.second().to_record()),
            },
            MapKind::ParallelMap(m) => KindRecord::ParallelMap {
                first: Box::new(m.first().to_record()),
                second: Box::new(m.second().to_record()),
            },
            MapKind::TranMap(m) => KindRecord::TranMap {
                forward_map: Box::new(m.forward_map().to_record()),
                inverse_map: Box::new(m.inverse_map().to_record()),
            },
        }
    }

    fn into_kind(self) -> Result<MapKind> {
        Ok(match self {
            KindRecord::UnitMap { n } => UnitMap::new(n)?.into(),
            KindRecord::ZoomMap { n, zoom } => ZoomMap::new(n, zoom)?.into(),
            KindRecord::ShiftMap { shift } => ShiftMap::new(shift)?.into(),
            KindRecord::WinMap { scale, offset } => WinMap::from_scale_offset(scale, offset)?.into(),
            KindRecord::PolyMap {
                n_in,
                n_out,
                forward,
                inverse,
                iter_inverse,
            } => {
                let forward = forward
                    .map(|rows| PolyCoeffs::from_rows(&rows, n_out))
                    .transpose()?;
                let inverse = inverse
                    .map(|rows| PolyCoeffs::from_rows(&rows, n_in))
                    .transpose()?;
                let mut poly = PolyMap::from_parts(forward, inverse, None)?;
                MapError::check_len("PolyMap inputs", n_in, poly.n_in())?;
                MapError::check_len("PolyMap outputs", n_out, poly.n_out())?;
                if let Some(config) = iter_inverse {
                    poly = poly.with_iter_inverse(config)?;
                }
                poly.into()
            }
            KindRecord::SeriesMap { first, second } => {
                SeriesMap::new(Mapping::from_record(*first)?, Mapping::from_record(*second)?)?.into()
            }
            KindRecord::ParallelMap { first, second } => {
                ParallelMap::new(Mapping::from_record(*first)?, Mapping::from_record(*second)?)?.into()
            }
            KindRecord::TranMap {
                forward_map,
                inverse_map,
            } => TranMap::new(
                Mapping::from_record(*forward_map)?,
                Mapping::from_record(*inverse_map)?,
            )?
            .into(),
        })
    }
}

impl Mapping {
    /// Describe this handle as a serde record
    pub fn to_record(&self) -> MappingRecord {
        MappingRecord {
            kind: KindRecord::from_kind(self.kind()),
            attributes: self.attributes().clone(),
            simple: self.is_simple(),
        }
    }

    /// Rebuild a mapping from a record, validating every parameter
    pub fn from_record(record: MappingRecord) -> Result<Mapping> {
        let kind = record.kind.into_kind()?;
        Ok(Mapping::from_parts(kind, record.attributes, record.simple))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn zoom(n: usize, z: f64) -> Mapping {
        ZoomMap::new(n, z).unwrap().into()
    }

    fn round_trip(map: &Mapping) -> Mapping {
        let text = serde_json::to_string(&map.to_record()).unwrap();
        Mapping::from_record(serde_json::from_str(&text).unwrap()).unwrap()
    }

    #[test]
    fn zoom_record_layout() {
        let value = serde_json::to_value(zoom(2, 1.3).to_record()).unwrap();
        assert_eq!(value, json!({ "kind": { "class": "ZoomMap", "n": 2, "zoom": 1.3 } }));
    }

    #[test]
    fn attributes_survive() {
        let mut map = zoom(2, 1.3).get_inverse();
        map.set_report(false);
        map.set_ident("pixels");
        let back = round_trip(&map);
        assert!(back.is_inverted());
        assert!(back.test("Report").unwrap());
        assert!(!back.report());
        assert_eq!(back.ident(), "pixels");
        assert_eq!(back, map);
        assert!(!back.same(&map));
    }

    #[test]
    fn compound_round_trip() {
        let poly: Mapping = PolyMap::new(&[[1.0, 1.0, 2.0], [1.0, 1.0, 0.0]], 1)
            .unwrap()
            .with_iter_inverse(IterInverseConfig::default())
            .unwrap()
            .into();
        let series = zoom(1, 2.0).then(&poly).unwrap();
        let tran: Mapping = TranMap::new(series.clone(), series.simplify()).unwrap().into();
        let back = round_trip(&tran);
        assert_eq!(back.show(), tran.show());
        assert_eq!(back.tran_point(&[1.5]).unwrap(), tran.tran_point(&[1.5]).unwrap());
    }

    #[test]
    fn decoding_revalidates() {
        let bad_zoom = json!({ "kind": { "class": "ZoomMap", "n": 2, "zoom": 0.0 } });
        let record: MappingRecord = serde_json::from_value(bad_zoom).unwrap();
        assert!(matches!(
            Mapping::from_record(record),
            Err(MapError::InvalidParameter { .. })
        ));

        let mismatched = json!({
            "kind": {
                "class": "SeriesMap",
                "first": { "kind": { "class": "UnitMap", "n": 2 } },
                "second": { "kind": { "class": "UnitMap", "n": 3 } }
            }
        });
        let record: MappingRecord = serde_json::from_value(mismatched).unwrap();
        assert!(matches!(
            Mapping::from_record(record),
            Err(MapError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn simplified_flag_survives() {
        let simple = zoom(3, 1.0).simplify();
        let back = round_trip(&simple);
        assert!(back.is_simple());
        assert_eq!(back.class_name(), "UnitMap");
    }
}
