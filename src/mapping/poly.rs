//! Polynomial mappings
//!
//! Each output coordinate is a sum of terms `c * x_1^p_1 * ... * x_n^p_n`.
//! Coefficients are supplied as rows `[c, axis, p_1, ..., p_n]` where `axis`
//! is the 1-based output axis the term contributes to. The forward and inverse
//! directions have independent coefficient sets; either may be absent. A
//! missing direction can instead be solved for by Newton iteration on the
//! other one.

use nalgebra::{DMatrix, DVector};

use super::{MapKind, Transform};
use crate::config::IterInverseConfig;
use crate::errors::{MapError, Result};
use crate::types::{Direction, axis_index, check_finite};

/// One polynomial term
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PolyTerm {
    pub coeff: f64,
    /// 0-based output axis
    pub axis: usize,
    pub powers: Vec<u32>,
}

/// Coefficients of one direction, mapping `n_in` coordinates to `n_out`
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PolyCoeffs {
    pub n_in: usize,
    pub n_out: usize,
    pub terms: Vec<PolyTerm>,
}

impl PolyCoeffs {
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R], n_out: usize) -> Result<Self> {
        let Some(first) = rows.first() else {
            return Err(MapError::invalid("polynomial needs at least one coefficient"));
        };
        let width = first.as_ref().len();
        if width < 3 {
            return Err(MapError::invalid(format!(
                "coefficient rows need at least 3 columns, got {width}"
            )));
        }
        if n_out == 0 {
            return Err(MapError::invalid("a mapping needs at least one axis"));
        }
        let n_in = width - 2;

        let mut terms = Vec::with_capacity(rows.len());
        for row in rows {
            let row = row.as_ref();
            MapError::check_len("coefficient row length", width, row.len())?;
            let coeff = check_finite(row[0], "coefficient")?;
            let axis = axis_index(whole_number(row[1], "axis index")? as usize, n_out)?;
            let powers = row[2..]
                .iter()
                .map(|&p| whole_number(p, "power"))
                .collect::<Result<Vec<_>>>()?;
            terms.push(PolyTerm { coeff, axis, powers });
        }
        Ok(Self { n_in, n_out, terms })
    }

    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.terms
            .iter()
            .map(|term| {
                let mut row = Vec::with_capacity(self.n_in + 2);
                row.push(term.coeff);
                row.push((term.axis + 1) as f64);
                row.extend(term.powers.iter().map(|&p| f64::from(p)));
                row
            })
            .collect()
    }

    pub fn eval(&self, x: &[f64], out: &mut [f64]) {
        out.fill(0.0);
        for term in &self.terms {
            let value = term
                .powers
                .iter()
                .zip(x)
                .fold(term.coeff, |acc, (&p, &xi)| acc * xi.powi(p as i32));
            out[term.axis] += value;
        }
    }

    /// `d out[out_axis] / d x[in_axis]`
    pub fn derivative(&self, x: &[f64], out_axis: usize, in_axis: usize) -> f64 {
        self.terms
            .iter()
            .filter(|term| term.axis == out_axis && term.powers[in_axis] > 0)
            .map(|term| {
                let mut value = term.coeff * f64::from(term.powers[in_axis]);
                for (axis, (&p, &xi)) in term.powers.iter().zip(x).enumerate() {
                    let p = if axis == in_axis { p - 1 } else { p };
                    value *= xi.powi(p as i32);
                }
                value
            })
            .sum()
    }

    pub fn jacobian(&self, x: &[f64]) -> DMatrix<f64> {
        DMatrix::from_fn(self.n_out, self.n_in, |row, col| self.derivative(x, row, col))
    }

    /// Input axes each output axis depends on
    pub fn dependencies(&self) -> Vec<Vec<bool>> {
        let mut deps = vec![vec![false; self.n_in]; self.n_out];
        for term in &self.terms {
            if term.coeff == 0.0 {
                continue;
            }
            for (axis, &p) in term.powers.iter().enumerate() {
                if p > 0 {
                    deps[term.axis][axis] = true;
                }
            }
        }
        deps
    }

    /// Restrict to the given (0-based) input and output axes. Powers of
    /// dropped inputs must be zero in every kept term.
    pub fn restrict(&self, inputs: &[usize], outputs: &[usize]) -> PolyCoeffs {
        let terms = self
            .terms
            .iter()
            .filter_map(|term| {
                let axis = outputs.iter().position(|&o| o == term.axis)?;
                Some(PolyTerm {
                    coeff: term.coeff,
                    axis,
                    powers: inputs.iter().map(|&i| term.powers[i]).collect(),
                })
            })
            .collect();
        PolyCoeffs {
            n_in: inputs.len(),
            n_out: outputs.len(),
            terms,
        }
    }
}

fn whole_number(value: f64, what: &str) -> Result<u32> {
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= f64::from(i32::MAX) {
        Ok(value as u32)
    } else {
        Err(MapError::invalid(format!(
            "{what} must be a non-negative integer, got {value}"
        )))
    }
}

/// Polynomial mapping with optional forward and inverse coefficient sets
#[derive(Debug, Clone, PartialEq)]
pub struct PolyMap {
    n_in: usize,
    n_out: usize,
    forward: Option<PolyCoeffs>,
    inverse: Option<PolyCoeffs>,
    iterative: Option<IterInverseConfig>,
}

impl PolyMap {
    /// Forward-only polynomial from rows `[c, out_axis, p_1, ..., p_nin]`
    pub fn new<R: AsRef<[f64]>>(coeff_f: &[R], n_out: usize) -> Result<Self> {
        let forward = PolyCoeffs::from_rows(coeff_f, n_out)?;
        Ok(Self {
            n_in: forward.n_in,
            n_out,
            forward: Some(forward),
            inverse: None,
            iterative: None,
        })
    }

    /// Polynomial with both directions; inverse rows are
    /// `[c, in_axis, q_1, ..., q_nout]`.
    pub fn with_inverse<F: AsRef<[f64]>, I: AsRef<[f64]>>(coeff_f: &[F], coeff_i: &[I]) -> Result<Self> {
        let n_out = coeff_i
            .first()
            .map(|row| row.as_ref().len().saturating_sub(2))
            .unwrap_or(0);
        let n_in = coeff_f
            .first()
            .map(|row| row.as_ref().len().saturating_sub(2))
            .unwrap_or(0);
        let forward = PolyCoeffs::from_rows(coeff_f, n_out)?;
        let inverse = PolyCoeffs::from_rows(coeff_i, n_in)?;
        Self::from_parts(Some(forward), Some(inverse), None)
    }

    /// Solve the missing direction by Newton iteration (AST `IterInverse`).
    /// Needs as many inputs as outputs.
    pub fn with_iter_inverse(mut self, config: IterInverseConfig) -> Result<Self> {
        config.validate()?;
        if self.n_in != self.n_out {
            return Err(MapError::invalid(format!(
                "an iterative inverse needs n_in == n_out, got {} and {}",
                self.n_in, self.n_out
            )));
        }
        self.iterative = Some(config);
        Ok(self)
    }

    pub(crate) fn from_parts(
        forward: Option<PolyCoeffs>,
        inverse: Option<PolyCoeffs>,
        iterative: Option<IterInverseConfig>,
    ) -> Result<Self> {
        let (n_in, n_out) = match (&forward, &inverse) {
            (Some(f), Some(i)) => {
                if f.n_in != i.n_out || f.n_out != i.n_in {
                    return Err(MapError::DimensionMismatch {
                        message: format!(
                            "forward maps {} -> {} axes but inverse maps {} -> {}",
                            f.n_in, f.n_out, i.n_in, i.n_out
                        ),
                    });
                }
                (f.n_in, f.n_out)
            }
            (Some(f), None) => (f.n_in, f.n_out),
            (None, Some(i)) => (i.n_out, i.n_in),
            (None, None) => {
                return Err(MapError::invalid("polynomial needs at least one coefficient set"));
            }
        };
        Ok(Self {
            n_in,
            n_out,
            forward,
            inverse,
            iterative,
        })
    }

    pub(crate) fn coeffs(&self, dir: Direction) -> Option<&PolyCoeffs> {
        match dir {
            Direction::Forward => self.forward.as_ref(),
            Direction::Inverse => self.inverse.as_ref(),
        }
    }

    pub(crate) fn iterative(&self) -> Option<IterInverseConfig> {
        self.iterative
    }

    /// Forward coefficient rows, if any
    pub fn forward_coeffs(&self) -> Option<Vec<Vec<f64>>> {
        self.forward.as_ref().map(PolyCoeffs::to_rows)
    }

    /// Inverse coefficient rows, if any
    pub fn inverse_coeffs(&self) -> Option<Vec<Vec<f64>>> {
        self.inverse.as_ref().map(PolyCoeffs::to_rows)
    }

    /// Solve `coeffs(x) = target` for `x` by Newton iteration, where
    /// `coeffs` is the direction opposite to the one requested.
    fn solve(&self, coeffs: &PolyCoeffs, config: IterInverseConfig, target: &[f64], x: &mut [f64]) -> Result<()> {
        let n = coeffs.n_in;
        x.copy_from_slice(target);
        let mut value = vec![0.0; n];

        for iteration in 0..config.max_iterations {
            coeffs.eval(x, &mut value);
            let residual = DVector::from_iterator(n, target.iter().zip(&value).map(|(t, v)| t - v));
            let step = coeffs
                .jacobian(x)
                .lu()
                .solve(&residual)
                .ok_or(MapError::NoConvergence {
                    iterations: iteration + 1,
                })?;

            let scale = x.iter().fold(1.0_f64, |m, v| m.max(v.abs()));
            for (xi, dx) in x.iter_mut().zip(step.iter()) {
                *xi += dx;
            }
            if step.amax() <= config.tolerance * scale {
                return Ok(());
            }
        }

        crate::log::warn!(
            "PolyMap iterative inverse failed to converge in {} iterations",
            config.max_iterations
        );
        Err(MapError::NoConvergence {
            iterations: config.max_iterations,
        })
    }
}

impl Transform for PolyMap {
    fn n_in(&self) -> usize {
        self.n_in
    }

    fn n_out(&self) -> usize {
        self.n_out
    }

    fn class_name(&self) -> &'static str {
        "PolyMap"
    }

    fn is_linear(&self) -> bool {
        false
    }

    fn has_direction(&self, dir: Direction) -> bool {
        self.coeffs(dir).is_some() || (self.iterative.is_some() && self.coeffs(dir.flip()).is_some())
    }

    fn apply(&self, dir: Direction, input: &[f64], output: &mut [f64]) -> Result<()> {
        if let Some(coeffs) = self.coeffs(dir) {
            coeffs.eval(input, output);
            return Ok(());
        }
        match (self.iterative, self.coeffs(dir.flip())) {
            (Some(config), Some(other)) => self.solve(other, config, input, output),
            _ => Err(MapError::UndefinedTransform {
                class: "PolyMap",
                direction: dir.label(),
            }),
        }
    }

    fn partial(&self, dir: Direction, at: &[f64], out_axis: usize, in_axis: usize) -> Option<f64> {
        self.coeffs(dir)
            .map(|coeffs| coeffs.derivative(at, out_axis, in_axis))
    }

    fn inverse_kind(&self) -> MapKind {
        PolyMap {
            n_in: self.n_out,
            n_out: self.n_in,
            forward: self.inverse.clone(),
            inverse: self.forward.clone(),
            iterative: self.iterative,
        }
        .into()
    }

    fn show_params(&self, lines: &mut Vec<String>, indent: usize) {
        let pad = " ".repeat(indent);
        for (label, coeffs) in [("Forward", &self.forward), ("Inverse", &self.inverse)] {
            let Some(coeffs) = coeffs else { continue };
            lines.push(format!("{pad}{label} terms = {}", coeffs.terms.len()));
            for row in coeffs.to_rows() {
                lines.push(format!("{pad}   {}", super::fmt_coords(&row)));
            }
        }
        if let Some(config) = self.iterative {
            lines.push(format!(
                "{pad}IterInverse = 1 (tol {}, max {})",
                config.tolerance, config.max_iterations
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parabola() -> PolyMap {
        // out = 0.5 x^2 + 0.5 y^2
        PolyMap::new(&[[0.5, 1.0, 2.0, 0.0], [0.5, 1.0, 0.0, 2.0]], 1).unwrap()
    }

    fn eval(map: &PolyMap, dir: Direction, x: &[f64]) -> Result<Vec<f64>> {
        let n = match dir {
            Direction::Forward => map.n_out(),
            Direction::Inverse => map.n_in(),
        };
        let mut out = vec![0.0; n];
        map.apply(dir, x, &mut out)?;
        Ok(out)
    }

    #[test]
    fn forward_only_parabola() {
        let map = parabola();
        assert_eq!(map.n_in(), 2);
        assert_eq!(map.n_out(), 1);
        assert!(map.has_direction(Direction::Forward));
        assert!(!map.has_direction(Direction::Inverse));
        assert_eq!(eval(&map, Direction::Forward, &[2.0, 4.0]).unwrap(), vec![10.0]);
    }

    #[test]
    fn analytic_derivative() {
        let map = parabola();
        assert_eq!(map.partial(Direction::Forward, &[3.0, -2.0], 0, 0), Some(3.0));
        assert_eq!(map.partial(Direction::Forward, &[3.0, -2.0], 0, 1), Some(-2.0));
        assert_eq!(map.partial(Direction::Inverse, &[3.0], 0, 0), None);
    }

    #[test]
    fn rejects_bad_rows() {
        // output axis 2 of a 1-output polynomial
        assert!(matches!(
            PolyMap::new(&[[1.0, 2.0, 1.0]], 1),
            Err(MapError::DimensionMismatch { .. })
        ));
        // fractional power
        assert!(matches!(
            PolyMap::new(&[[1.0, 1.0, 0.5]], 1),
            Err(MapError::InvalidParameter { .. })
        ));
        // powers are evaluated with `powi`
        assert!(matches!(
            PolyMap::new(&[[1.0, 1.0, 3e9]], 1),
            Err(MapError::InvalidParameter { .. })
        ));
        assert!(PolyMap::new(&[[1.0, 1.0, f64::from(i32::MAX)]], 1).is_ok());
        let empty: [[f64; 3]; 0] = [];
        assert!(PolyMap::new(&empty, 1).is_err());
    }

    #[test]
    fn explicit_inverse() {
        // y = 2x + 1, x = 0.5y - 0.5
        let map = PolyMap::with_inverse(&[[1.0, 1.0, 0.0], [2.0, 1.0, 1.0]], &[[-0.5, 1.0, 0.0], [0.5, 1.0, 1.0]])
            .unwrap();
        assert_eq!(eval(&map, Direction::Forward, &[3.0]).unwrap(), vec![7.0]);
        assert_eq!(eval(&map, Direction::Inverse, &[7.0]).unwrap(), vec![3.0]);
    }

    #[test]
    fn iterative_inverse_converges() {
        // x' = x + 0.01 x^2, y' = y + 0.01 x y
        let map = PolyMap::new(
            &[
                [1.0, 1.0, 1.0, 0.0],
                [0.01, 1.0, 2.0, 0.0],
                [1.0, 2.0, 0.0, 1.0],
                [0.01, 2.0, 1.0, 1.0],
            ],
            2,
        )
        .unwrap()
        .with_iter_inverse(IterInverseConfig {
            tolerance: 1e-12,
            max_iterations: 50,
        })
        .unwrap();
        assert!(map.has_direction(Direction::Inverse));

        let x = [3.0, -2.0];
        let y = eval(&map, Direction::Forward, &x).unwrap();
        let back = eval(&map, Direction::Inverse, &y).unwrap();
        for (a, b) in back.iter().zip(&x) {
            assert!((a - b).abs() < 1e-9, "{a} vs {b}");
        }
    }

    #[test]
    fn iterative_inverse_needs_square() {
        assert!(parabola().with_iter_inverse(IterInverseConfig::default()).is_err());
    }

    #[test]
    fn inverse_kind_swaps_coefficients() {
        let map = parabola();
        let MapKind::PolyMap(inv) = map.inverse_kind() else {
            panic!("expected a PolyMap");
        };
        assert_eq!(inv.n_in(), 1);
        assert_eq!(inv.n_out(), 2);
        assert!(!inv.has_direction(Direction::Forward));
        assert!(inv.has_direction(Direction::Inverse));
        assert_eq!(inv.inverse_coeffs(), map.forward_coeffs());
    }

    #[test]
    fn dependencies_follow_powers() {
        let map = parabola();
        let deps = map.coeffs(Direction::Forward).unwrap().dependencies();
        assert_eq!(deps, vec![vec![true, true]]);
    }
}
