//! Coordinate mappings for astrometry.
//!
//! A [`Mapping`] transforms points between two coordinate systems with
//! `n_in` and `n_out` axes. Mappings can be inverted, composed in series
//! ([`Mapping::then`]) or in parallel ([`Mapping::over`]), simplified to a
//! canonical form ([`Mapping::simplify`]) and analysed: see [`MapBox`],
//! [`QuadApprox`], [`MapSplit`], [`Mapping::rate`] and
//! [`Mapping::linear_approx`].
//!
//! ```
//! use coordmap::{Mapping, PointBatch, ZoomMap};
//!
//! let zoom: Mapping = ZoomMap::new(2, 1.3)?.into();
//! let points = PointBatch::from_rows(&[[1.0, 3.0], [2.0, 99.0]])?;
//! let there = zoom.tran(&points)?;
//! let back = zoom.get_inverse().tran(&there)?;
//! assert!(back.all_close(&points, 1e-12, 0.0));
//! # Ok::<(), coordmap::MapError>(())
//! ```
//!
//! Axis indices in the public API are 1-based.

pub mod analysis;
pub mod attributes;
pub mod config;
pub mod errors;
mod log;
pub mod mapping;
pub mod record;
mod simplify;
pub mod split;
pub mod types;

pub use analysis::{MapBox, MapBoxOptions, QuadApprox};
pub use attributes::{AttrName, Attributes};
pub use config::{ApproxConfig, IterInverseConfig, RateConfig, SearchConfig};
pub use errors::{MapError, Result};
pub use mapping::{
    MapKind, Mapping, ParallelMap, PolyMap, SeriesMap, ShiftMap, TranMap, Transform, UnitMap, WinMap, ZoomMap,
};
pub use record::{KindRecord, MappingRecord};
pub use split::MapSplit;
pub use types::{Direction, PointBatch};
