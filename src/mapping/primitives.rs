//! Primitive per-axis mappings
//!
//! All four kinds act on each axis independently with `y_i = a_i + b_i * x_i`,
//! which is what lets simplification merge them and splitting pick axes out
//! of them. [`AxisAffine`] is that shared representation.

use super::{MapKind, Transform};
use crate::errors::{MapError, Result};
use crate::mapping::fmt_coords;
use crate::types::{Direction, check_finite};

/// Identity on `n` axes
#[derive(Debug, Clone, PartialEq)]
pub struct UnitMap {
    n: usize,
}

impl UnitMap {
    pub fn new(n: usize) -> Result<Self> {
        check_axes(n)?;
        Ok(Self { n })
    }

    pub fn n(&self) -> usize {
        self.n
    }
}

impl Transform for UnitMap {
    fn n_in(&self) -> usize {
        self.n
    }

    fn n_out(&self) -> usize {
        self.n
    }

    fn class_name(&self) -> &'static str {
        "UnitMap"
    }

    fn is_linear(&self) -> bool {
        true
    }

    fn has_direction(&self, _dir: Direction) -> bool {
        true
    }

    fn apply(&self, _dir: Direction, input: &[f64], output: &mut [f64]) -> Result<()> {
        output.copy_from_slice(input);
        Ok(())
    }

    fn partial(&self, _dir: Direction, _at: &[f64], out_axis: usize, in_axis: usize) -> Option<f64> {
        Some(if out_axis == in_axis { 1.0 } else { 0.0 })
    }

    fn inverse_kind(&self) -> MapKind {
        self.clone().into()
    }

    fn show_params(&self, _lines: &mut Vec<String>, _indent: usize) {}
}

/// Uniform scaling about the origin: `y = x * zoom`
#[derive(Debug, Clone, PartialEq)]
pub struct ZoomMap {
    n: usize,
    zoom: f64,
}

impl ZoomMap {
    /// `zoom` must be finite and non-zero.
    pub fn new(n: usize, zoom: f64) -> Result<Self> {
        check_axes(n)?;
        check_finite(zoom, "zoom factor")?;
        if zoom == 0.0 {
            return Err(MapError::invalid("zoom factor must be non-zero"));
        }
        Ok(Self { n, zoom })
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    fn factor(&self, dir: Direction) -> f64 {
        match dir {
            Direction::Forward => self.zoom,
            Direction::Inverse => 1.0 / self.zoom,
        }
    }
}

impl Transform for ZoomMap {
    fn n_in(&self) -> usize {
        self.n
    }

    fn n_out(&self) -> usize {
        self.n
    }

    fn class_name(&self) -> &'static str {
        "ZoomMap"
    }

    fn is_linear(&self) -> bool {
        true
    }

    fn has_direction(&self, _dir: Direction) -> bool {
        true
    }

    fn apply(&self, dir: Direction, input: &[f64], output: &mut [f64]) -> Result<()> {
        // Divide rather than multiply by the reciprocal so that the inverse
        // of an exact product is exact.
        for (out, x) in output.iter_mut().zip(input) {
            *out = match dir {
                Direction::Forward => x * self.zoom,
                Direction::Inverse => x / self.zoom,
            };
        }
        Ok(())
    }

    fn partial(&self, dir: Direction, _at: &[f64], out_axis: usize, in_axis: usize) -> Option<f64> {
        Some(if out_axis == in_axis { self.factor(dir) } else { 0.0 })
    }

    fn inverse_kind(&self) -> MapKind {
        ZoomMap {
            n: self.n,
            zoom: 1.0 / self.zoom,
        }
        .into()
    }

    fn show_params(&self, lines: &mut Vec<String>, indent: usize) {
        lines.push(format!("{}Zoom = {}", " ".repeat(indent), self.zoom));
    }
}

/// Translation: `y = x + shift`
#[derive(Debug, Clone, PartialEq)]
pub struct ShiftMap {
    shift: Vec<f64>,
}

impl ShiftMap {
    pub fn new(shift: impl Into<Vec<f64>>) -> Result<Self> {
        let shift = shift.into();
        check_axes(shift.len())?;
        for &s in &shift {
            check_finite(s, "shift")?;
        }
        Ok(Self { shift })
    }

    pub fn shift(&self) -> &[f64] {
        &self.shift
    }
}

impl Transform for ShiftMap {
    fn n_in(&self) -> usize {
        self.shift.len()
    }

    fn n_out(&self) -> usize {
        self.shift.len()
    }

    fn class_name(&self) -> &'static str {
        "ShiftMap"
    }

    fn is_linear(&self) -> bool {
        true
    }

    fn has_direction(&self, _dir: Direction) -> bool {
        true
    }

    fn apply(&self, dir: Direction, input: &[f64], output: &mut [f64]) -> Result<()> {
        for ((out, x), s) in output.iter_mut().zip(input).zip(&self.shift) {
            *out = match dir {
                Direction::Forward => x + s,
                Direction::Inverse => x - s,
            };
        }
        Ok(())
    }

    fn partial(&self, _dir: Direction, _at: &[f64], out_axis: usize, in_axis: usize) -> Option<f64> {
        Some(if out_axis == in_axis { 1.0 } else { 0.0 })
    }

    fn inverse_kind(&self) -> MapKind {
        ShiftMap {
            shift: self.shift.iter().map(|s| -s).collect(),
        }
        .into()
    }

    fn show_params(&self, lines: &mut Vec<String>, indent: usize) {
        lines.push(format!("{}Shift = ({})", " ".repeat(indent), fmt_coords(&self.shift)));
    }
}

/// Maps one axis-aligned window onto another: `y_i = offset_i + scale_i * x_i`
#[derive(Debug, Clone, PartialEq)]
pub struct WinMap {
    scale: Vec<f64>,
    offset: Vec<f64>,
}

impl WinMap {
    /// Build from two corners of the input window (`ina`, `inb`) and the
    /// output corners they map to (`outa`, `outb`).
    pub fn new(ina: &[f64], inb: &[f64], outa: &[f64], outb: &[f64]) -> Result<Self> {
        let n = ina.len();
        check_axes(n)?;
        MapError::check_len("inb length", n, inb.len())?;
        MapError::check_len("outa length", n, outa.len())?;
        MapError::check_len("outb length", n, outb.len())?;

        let mut scale = Vec::with_capacity(n);
        let mut offset = Vec::with_capacity(n);
        for axis in 0..n {
            let in_width = check_finite(inb[axis], "window corner")? - check_finite(ina[axis], "window corner")?;
            let out_width = check_finite(outb[axis], "window corner")? - check_finite(outa[axis], "window corner")?;
            if in_width == 0.0 || out_width == 0.0 {
                return Err(MapError::invalid(format!(
                    "window has zero width on axis {}",
                    axis + 1
                )));
            }
            let b = out_width / in_width;
            scale.push(b);
            offset.push(outa[axis] - b * ina[axis]);
        }
        Ok(Self { scale, offset })
    }

    /// Build directly from per-axis scales and offsets; scales must be non-zero.
    pub fn from_scale_offset(scale: impl Into<Vec<f64>>, offset: impl Into<Vec<f64>>) -> Result<Self> {
        let scale = scale.into();
        let offset = offset.into();
        check_axes(scale.len())?;
        MapError::check_len("offset length", scale.len(), offset.len())?;
        for (&b, &a) in scale.iter().zip(&offset) {
            check_finite(a, "offset")?;
            if check_finite(b, "scale")? == 0.0 {
                return Err(MapError::invalid("scale factors must be non-zero"));
            }
        }
        Ok(Self { scale, offset })
    }

    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    pub fn offset(&self) -> &[f64] {
        &self.offset
    }
}

impl Transform for WinMap {
    fn n_in(&self) -> usize {
        self.scale.len()
    }

    fn n_out(&self) -> usize {
        self.scale.len()
    }

    fn class_name(&self) -> &'static str {
        "WinMap"
    }

    fn is_linear(&self) -> bool {
        true
    }

    fn has_direction(&self, _dir: Direction) -> bool {
        true
    }

    fn apply(&self, dir: Direction, input: &[f64], output: &mut [f64]) -> Result<()> {
        for (axis, out) in output.iter_mut().enumerate() {
            let (a, b) = (self.offset[axis], self.scale[axis]);
            *out = match dir {
                Direction::Forward => a + b * input[axis],
                Direction::Inverse => (input[axis] - a) / b,
            };
        }
        Ok(())
    }

    fn partial(&self, dir: Direction, _at: &[f64], out_axis: usize, in_axis: usize) -> Option<f64> {
        if out_axis != in_axis {
            return Some(0.0);
        }
        Some(match dir {
            Direction::Forward => self.scale[out_axis],
            Direction::Inverse => 1.0 / self.scale[out_axis],
        })
    }

    fn inverse_kind(&self) -> MapKind {
        WinMap {
            scale: self.scale.iter().map(|b| 1.0 / b).collect(),
            offset: self
                .offset
                .iter()
                .zip(&self.scale)
                .map(|(a, b)| -a / b)
                .collect(),
        }
        .into()
    }

    fn show_params(&self, lines: &mut Vec<String>, indent: usize) {
        let pad = " ".repeat(indent);
        lines.push(format!("{pad}Scale = ({})", fmt_coords(&self.scale)));
        lines.push(format!("{pad}Offset = ({})", fmt_coords(&self.offset)));
    }
}

fn check_axes(n: usize) -> Result<()> {
    if n == 0 {
        Err(MapError::invalid("a mapping needs at least one axis"))
    } else {
        Ok(())
    }
}

/// Per-axis affine form `y_i = offset_i + scale_i * x_i` shared by the
/// primitive kinds.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AxisAffine {
    pub scale: Vec<f64>,
    pub offset: Vec<f64>,
}

impl AxisAffine {
    /// The affine form of a primitive kind, `None` for anything else
    pub fn from_kind(kind: &MapKind) -> Option<Self> {
        match kind {
            MapKind::UnitMap(m) => Some(Self {
                scale: vec![1.0; m.n],
                offset: vec![0.0; m.n],
            }),
            MapKind::ZoomMap(m) => Some(Self {
                scale: vec![m.zoom; m.n],
                offset: vec![0.0; m.n],
            }),
            MapKind::ShiftMap(m) => Some(Self {
                scale: vec![1.0; m.shift.len()],
                offset: m.shift.clone(),
            }),
            MapKind::WinMap(m) => Some(Self {
                scale: m.scale.clone(),
                offset: m.offset.clone(),
            }),
            _ => None,
        }
    }

    /// `self` followed by `next`
    pub fn then(&self, next: &AxisAffine) -> AxisAffine {
        let scale = self.scale.iter().zip(&next.scale).map(|(b1, b2)| b1 * b2).collect();
        let offset = self
            .offset
            .iter()
            .zip(&next.scale)
            .zip(&next.offset)
            .map(|((a1, b2), a2)| a2 + b2 * a1)
            .collect();
        AxisAffine { scale, offset }
    }

    /// `self` on the lower axes, `other` on the rest
    pub fn beside(&self, other: &AxisAffine) -> AxisAffine {
        AxisAffine {
            scale: self.scale.iter().chain(&other.scale).copied().collect(),
            offset: self.offset.iter().chain(&other.offset).copied().collect(),
        }
    }

    /// Keep only the given (0-based) axes
    pub fn pick(&self, axes: &[usize]) -> AxisAffine {
        AxisAffine {
            scale: axes.iter().map(|&a| self.scale[a]).collect(),
            offset: axes.iter().map(|&a| self.offset[a]).collect(),
        }
    }

    /// The simplest primitive kind with this behavior
    pub fn into_kind(self) -> MapKind {
        let n = self.scale.len();
        let no_offset = self.offset.iter().all(|&a| a == 0.0);
        let unit_scale = self.scale.iter().all(|&b| b == 1.0);
        let uniform = self.scale.iter().all(|&b| b == self.scale[0]);

        if no_offset && unit_scale {
            UnitMap { n }.into()
        } else if no_offset && uniform {
            ZoomMap {
                n,
                zoom: self.scale[0],
            }
            .into()
        } else if unit_scale {
            ShiftMap { shift: self.offset }.into()
        } else {
            WinMap {
                scale: self.scale,
                offset: self.offset,
            }
            .into()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forward(kind: &impl Transform, x: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; kind.n_out()];
        kind.apply(Direction::Forward, x, &mut out).unwrap();
        out
    }

    fn inverse(kind: &impl Transform, y: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; kind.n_in()];
        kind.apply(Direction::Inverse, y, &mut out).unwrap();
        out
    }

    // ==================== ZoomMap tests ====================

    #[test]
    fn zoom_scales_every_axis() {
        let zoom = ZoomMap::new(3, 2.5).unwrap();
        assert_eq!(forward(&zoom, &[1.0, -2.0, 0.0]), vec![2.5, -5.0, 0.0]);
        assert_eq!(inverse(&zoom, &[2.5, -5.0, 0.0]), vec![1.0, -2.0, 0.0]);
    }

    #[test]
    fn zoom_rejects_zero_and_nan() {
        assert!(matches!(ZoomMap::new(2, 0.0), Err(MapError::InvalidParameter { .. })));
        assert!(matches!(ZoomMap::new(2, f64::NAN), Err(MapError::InvalidParameter { .. })));
        assert!(matches!(ZoomMap::new(0, 1.0), Err(MapError::InvalidParameter { .. })));
    }

    #[test]
    fn zoom_inverse_kind() {
        let zoom = ZoomMap::new(2, 4.0).unwrap();
        assert_eq!(zoom.inverse_kind(), MapKind::from(ZoomMap::new(2, 0.25).unwrap()));
    }

    // ==================== WinMap tests ====================

    #[test]
    fn winmap_from_corners() {
        // shift (1.5, 0.5), zoom (2, 3)
        let win = WinMap::new(&[0.0, 0.0], &[1.0, 1.0], &[1.5, 0.5], &[3.5, 3.5]).unwrap();
        assert_eq!(win.scale(), &[2.0, 3.0]);
        assert_eq!(win.offset(), &[1.5, 0.5]);
        assert_eq!(forward(&win, &[1.0, 2.0]), vec![3.5, 6.5]);
        assert_eq!(inverse(&win, &[3.5, 6.5]), vec![1.0, 2.0]);
    }

    #[test]
    fn winmap_rejects_degenerate_window() {
        let err = WinMap::new(&[0.0, 1.0], &[1.0, 1.0], &[0.0, 0.0], &[1.0, 1.0]);
        assert!(matches!(err, Err(MapError::InvalidParameter { .. })));
        let err = WinMap::new(&[0.0], &[1.0], &[2.0], &[2.0]);
        assert!(matches!(err, Err(MapError::InvalidParameter { .. })));
    }

    #[test]
    fn winmap_rejects_mismatched_corners() {
        let err = WinMap::new(&[0.0, 0.0], &[1.0], &[0.0, 0.0], &[1.0, 1.0]);
        assert!(matches!(err, Err(MapError::DimensionMismatch { .. })));
    }

    #[test]
    fn winmap_partials() {
        let win = WinMap::from_scale_offset(vec![2.0, -4.0], vec![0.0, 1.0]).unwrap();
        assert_eq!(win.partial(Direction::Forward, &[0.0, 0.0], 1, 1), Some(-4.0));
        assert_eq!(win.partial(Direction::Inverse, &[0.0, 0.0], 0, 0), Some(0.5));
        assert_eq!(win.partial(Direction::Forward, &[0.0, 0.0], 0, 1), Some(0.0));
    }

    // ==================== ShiftMap tests ====================

    #[test]
    fn shift_round_trip() {
        let shift = ShiftMap::new(vec![1.0, -2.0]).unwrap();
        let y = forward(&shift, &[0.5, 0.5]);
        assert_eq!(y, vec![1.5, -1.5]);
        assert_eq!(inverse(&shift, &y), vec![0.5, 0.5]);
    }

    // ==================== AxisAffine tests ====================

    #[test]
    fn affine_composition() {
        let zoom = AxisAffine::from_kind(&ZoomMap::new(2, 2.0).unwrap().into()).unwrap();
        let shift = AxisAffine::from_kind(&ShiftMap::new(vec![1.0, 1.0]).unwrap().into()).unwrap();
        let combined = zoom.then(&shift);
        assert_eq!(combined.scale, vec![2.0, 2.0]);
        assert_eq!(combined.offset, vec![1.0, 1.0]);
        let reversed = shift.then(&zoom);
        assert_eq!(reversed.offset, vec![2.0, 2.0]);
    }

    #[test]
    fn affine_canonical_kinds() {
        let unit = AxisAffine {
            scale: vec![1.0, 1.0],
            offset: vec![0.0, 0.0],
        };
        assert!(matches!(unit.into_kind(), MapKind::UnitMap(_)));

        let zoom = AxisAffine {
            scale: vec![3.0, 3.0],
            offset: vec![0.0, 0.0],
        };
        assert!(matches!(zoom.into_kind(), MapKind::ZoomMap(_)));

        let shift = AxisAffine {
            scale: vec![1.0, 1.0],
            offset: vec![0.0, 2.0],
        };
        assert!(matches!(shift.into_kind(), MapKind::ShiftMap(_)));

        let win = AxisAffine {
            scale: vec![1.0, 2.0],
            offset: vec![0.0, 0.0],
        };
        assert!(matches!(win.into_kind(), MapKind::WinMap(_)));
    }
}
