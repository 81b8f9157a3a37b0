//! Numeric analysis of mappings
//!
//! - [`Mapping::rate`]: one partial derivative at a point
//! - [`Mapping::linear_approx`]: least-squares affine fit over a box
//! - [`QuadApprox`]: least-squares quadratic fit of a 2-input mapping
//! - [`MapBox`]: bounding box of the image of an input box
//!
//! The fits solve their design matrices with an SVD so that degenerate
//! boxes give a minimum-norm answer instead of a singular system.

use glam::DVec2;
use nalgebra::DMatrix;

use crate::config::{ApproxConfig, RateConfig, SearchConfig};
use crate::errors::{MapError, Result};
use crate::log::debug;
use crate::mapping::Mapping;
use crate::types::{Direction, PointBatch, axis_index, check_finite};

/// Largest sample grid any routine will evaluate
const MAX_SAMPLES: usize = 1 << 22;

/// Singular values below this (relative to unit-scaled columns) are dropped.
const SVD_EPS: f64 = 1e-12;

impl Mapping {
    /// `d output[out_axis] / d input[in_axis]` of the forward transformation
    /// at `at`. Axes are 1-based.
    pub fn rate(&self, at: &[f64], out_axis: usize, in_axis: usize) -> Result<f64> {
        self.rate_with(at, out_axis, in_axis, &RateConfig::default())
    }

    pub fn rate_with(&self, at: &[f64], out_axis: usize, in_axis: usize, config: &RateConfig) -> Result<f64> {
        config.validate()?;
        MapError::check_len("point dimensionality", self.n_in(), at.len())?;
        let out = axis_index(out_axis, self.n_out())?;
        let input = axis_index(in_axis, self.n_in())?;
        if !self.has_forward() {
            return Err(self.undefined(Direction::Forward));
        }
        if let Some(value) = self.partial(Direction::Forward, at, out, input) {
            return Ok(value);
        }

        // central difference
        let h = config.rel_step * at[input].abs().max(1.0);
        let mut probe = at.to_vec();
        let mut y = vec![0.0; self.n_out()];

        probe[input] = at[input] + h;
        self.apply_point(Direction::Forward, &probe, &mut y)?;
        let plus = y[out];

        probe[input] = at[input] - h;
        self.apply_point(Direction::Forward, &probe, &mut y)?;
        let minus = y[out];

        Ok((plus - minus) / (2.0 * h))
    }

    /// Fit `y = c + J x` to the forward transformation over the box spanned
    /// by `lbnd` and `ubnd`.
    ///
    /// Returns an `(n_in + 1) x n_out` matrix: row 0 holds the constants and
    /// row `j + 1` the coefficients of input `j`. Fails with
    /// [`MapError::Approximation`] when the fit is off by more than `tol` at
    /// any sample point.
    pub fn linear_approx(&self, lbnd: &[f64], ubnd: &[f64], tol: f64) -> Result<DMatrix<f64>> {
        self.linear_approx_with(lbnd, ubnd, tol, &ApproxConfig::default())
    }

    pub fn linear_approx_with(
        &self,
        lbnd: &[f64],
        ubnd: &[f64],
        tol: f64,
        config: &ApproxConfig,
    ) -> Result<DMatrix<f64>> {
        config.validate()?;
        let n_in = self.n_in();
        let n_out = self.n_out();
        check_box(lbnd, ubnd, n_in)?;
        if !(check_finite(tol, "tolerance")? >= 0.0) {
            return Err(MapError::invalid(format!("tolerance must not be negative, got {tol}")));
        }
        if !self.has_forward() {
            return Err(self.undefined(Direction::Forward));
        }

        let (lo, hi) = canonical_box(lbnd, ubnd);
        let samples = PointBatch::new(n_in, sample_points(&lo, &hi, config.samples_per_axis))?;
        let values = self.evaluate(Direction::Forward, &samples)?;
        if values.as_slice().iter().any(|v| !v.is_finite()) {
            return Err(MapError::Approximation {
                tolerance: tol,
                deviation: f64::INFINITY,
            });
        }

        // Work in coordinates centred on the box and scaled to [-1, 1];
        // axes of zero width drop out of the fit.
        let centre: Vec<f64> = lo.iter().zip(&hi).map(|(l, h)| 0.5 * (l + h)).collect();
        let half: Vec<f64> = lo.iter().zip(&hi).map(|(l, h)| 0.5 * (h - l)).collect();
        let active: Vec<usize> = (0..n_in).filter(|&j| half[j] > 0.0).collect();

        let design = DMatrix::from_fn(samples.n_points(), active.len() + 1, |row, col| {
            if col == 0 {
                1.0
            } else {
                let j = active[col - 1];
                (samples.point(row)[j] - centre[j]) / half[j]
            }
        });
        let rhs = DMatrix::from_fn(samples.n_points(), n_out, |row, col| values.point(row)[col]);
        let beta = design
            .svd(true, true)
            .solve(&rhs, SVD_EPS)
            .map_err(MapError::invalid)?;

        let mut coeffs = DMatrix::zeros(n_in + 1, n_out);
        for out in 0..n_out {
            let mut constant = beta[(0, out)];
            for (k, &j) in active.iter().enumerate() {
                let slope = beta[(k + 1, out)] / half[j];
                coeffs[(j + 1, out)] = slope;
                constant -= slope * centre[j];
            }
            for j in (0..n_in).filter(|&j| half[j] == 0.0) {
                let slope = self.rate(&centre, out + 1, j + 1)?;
                coeffs[(j + 1, out)] = slope;
                constant -= slope * centre[j];
            }
            coeffs[(0, out)] = constant;
        }

        let mut deviation: f64 = 0.0;
        for (x, y) in samples.points().zip(values.points()) {
            for out in 0..n_out {
                let fit = coeffs[(0, out)]
                    + x.iter()
                        .enumerate()
                        .map(|(j, xj)| coeffs[(j + 1, out)] * xj)
                        .sum::<f64>();
                deviation = deviation.max((fit - y[out]).abs());
            }
        }
        debug!(
            "linear_approx over {} samples: max deviation {} (tol {})",
            samples.n_points(),
            deviation,
            tol
        );
        if deviation > tol {
            return Err(MapError::Approximation {
                tolerance: tol,
                deviation,
            });
        }
        Ok(coeffs)
    }
}

/// Least-squares quadratic fit of a mapping with two inputs
#[derive(Debug, Clone, PartialEq)]
pub struct QuadApprox {
    /// Six coefficients per output, in the order `1, x, y, xy, x², y²`
    pub fit: Vec<f64>,
    /// RMS residual over every sample and output
    pub rms: f64,
}

impl QuadApprox {
    /// Fit over an `nx` by `ny` grid spanning `lbnd`..`ubnd`; both counts
    /// must be at least 3.
    pub fn new(map: &Mapping, lbnd: DVec2, ubnd: DVec2, nx: usize, ny: usize) -> Result<Self> {
        MapError::check_len("QuadApprox input axes", 2, map.n_in())?;
        if nx < 3 || ny < 3 {
            return Err(MapError::invalid(format!(
                "QuadApprox needs at least 3 samples per axis, got {nx} x {ny}"
            )));
        }
        if !lbnd.is_finite() || !ubnd.is_finite() {
            return Err(MapError::invalid("box bounds must be finite"));
        }
        if !map.has_forward() {
            return Err(map.undefined(Direction::Forward));
        }

        if nx.checked_mul(ny).is_none_or(|total| total > MAX_SAMPLES) {
            return Err(MapError::invalid(format!(
                "a {nx} x {ny} QuadApprox grid is too large"
            )));
        }

        let lo = lbnd.min(ubnd);
        let hi = lbnd.max(ubnd);
        let mut data = Vec::with_capacity(2 * nx * ny);
        for j in 0..ny {
            for i in 0..nx {
                let t = DVec2::new(i as f64 / (nx - 1) as f64, j as f64 / (ny - 1) as f64);
                data.extend_from_slice(&(lo + t * (hi - lo)).to_array());
            }
        }
        let samples = PointBatch::new(2, data)?;
        let values = map.evaluate(Direction::Forward, &samples)?;
        if values.as_slice().iter().any(|v| !v.is_finite()) {
            return Err(MapError::invalid("mapping is not finite everywhere inside the fit region"));
        }

        let terms: Vec<[f64; 6]> = samples
            .points()
            .map(|p| {
                let (x, y) = (p[0], p[1]);
                [1.0, x, y, x * y, x * x, y * y]
            })
            .collect();
        // Unit column scale keeps the SVD cutoff meaningful for large boxes.
        let mut norms = [1.0_f64; 6];
        for (col, norm) in norms.iter_mut().enumerate() {
            let max = terms.iter().fold(0.0_f64, |m, t| m.max(t[col].abs()));
            if max > 0.0 {
                *norm = max;
            }
        }

        let n_out = map.n_out();
        let design = DMatrix::from_fn(terms.len(), 6, |row, col| terms[row][col] / norms[col]);
        let rhs = DMatrix::from_fn(terms.len(), n_out, |row, col| values.point(row)[col]);
        let beta = design
            .clone()
            .svd(true, true)
            .solve(&rhs, SVD_EPS)
            .map_err(MapError::invalid)?;

        let residual = &design * &beta - &rhs;
        let rms = (residual.norm_squared() / (terms.len() * n_out) as f64).sqrt();

        let mut fit = Vec::with_capacity(6 * n_out);
        for out in 0..n_out {
            fit.extend((0..6).map(|t| beta[(t, out)] / norms[t]));
        }
        debug!("QuadApprox over {nx} x {ny} grid: rms {rms}");
        Ok(Self { fit, rms })
    }
}

/// Options for [`MapBox::with_options`]
#[derive(Debug, Clone, PartialEq)]
pub struct MapBoxOptions {
    /// Bound the image under this transformation
    pub direction: Direction,
    /// First output axis to bound (1-based)
    pub min_out_coord: usize,
    /// Last output axis to bound (1-based); `None` for the last axis
    pub max_out_coord: Option<usize>,
    pub search: SearchConfig,
}

impl Default for MapBoxOptions {
    fn default() -> Self {
        Self {
            direction: Direction::Forward,
            min_out_coord: 1,
            max_out_coord: None,
            search: SearchConfig::default(),
        }
    }
}

/// Bounding box of the image of an input box
#[derive(Debug, Clone, PartialEq)]
pub struct MapBox {
    /// Per-axis minimum of the two input corners
    pub lbnd_in: Vec<f64>,
    /// Per-axis maximum of the two input corners
    pub ubnd_in: Vec<f64>,
    /// Lower bound of each bounded output axis
    pub lbnd_out: Vec<f64>,
    /// Upper bound of each bounded output axis
    pub ubnd_out: Vec<f64>,
    /// Row `i` is an input point at which output `i` reaches `lbnd_out[i]`
    pub xl: Vec<Vec<f64>>,
    /// Row `i` is an input point at which output `i` reaches `ubnd_out[i]`
    pub xu: Vec<Vec<f64>>,
    /// 1-based range of output axes covered by the rows above
    pub min_out_coord: usize,
    pub max_out_coord: usize,
    pub direction: Direction,
}

impl MapBox {
    /// Bound every forward output over the box with corners `a` and `b`.
    /// The corners may be given in any order.
    pub fn new(map: &Mapping, a: &[f64], b: &[f64]) -> Result<Self> {
        Self::with_options(map, a, b, &MapBoxOptions::default())
    }

    pub fn with_options(map: &Mapping, a: &[f64], b: &[f64], options: &MapBoxOptions) -> Result<Self> {
        options.search.validate()?;
        let dir = options.direction;
        let (n_in, n_out) = map.dims(dir);
        check_box(a, b, n_in)?;
        if !map.has_direction(dir) {
            return Err(map.undefined(dir));
        }
        let max_out_coord = options.max_out_coord.unwrap_or(n_out);
        let first = axis_index(options.min_out_coord, n_out)?;
        let last = axis_index(max_out_coord, n_out)?;
        if first > last {
            return Err(MapError::DimensionMismatch {
                message: format!(
                    "output axis range {}..={} is empty",
                    options.min_out_coord, max_out_coord
                ),
            });
        }

        let (lo, hi) = canonical_box(a, b);
        let search = BoxSearch {
            map,
            dir,
            n_out,
            lo: &lo,
            hi: &hi,
            config: &options.search,
        };

        let n_bounded = last - first + 1;
        let mut lbnd_out = Vec::with_capacity(n_bounded);
        let mut ubnd_out = Vec::with_capacity(n_bounded);
        let mut xl = Vec::with_capacity(n_bounded);
        let mut xu = Vec::with_capacity(n_bounded);

        if map.is_linear() {
            let centre: Vec<f64> = lo.iter().zip(&hi).map(|(l, h)| 0.5 * (l + h)).collect();
            let steps = search.axis_steps(&centre)?;
            debug!("MapBox {} of a linear mapping, outputs {}..={}", dir, first + 1, last + 1);
            for axis in first..=last {
                let (x_low, low) = search.linear_extremum(&centre, &steps, axis, 1.0)?;
                let (x_high, high) = search.linear_extremum(&centre, &steps, axis, -1.0)?;
                lbnd_out.push(low);
                ubnd_out.push(high);
                xl.push(x_low);
                xu.push(x_high);
            }
        } else {
            let seeds = if n_in <= options.search.max_grid_axes {
                sample_points(&lo, &hi, options.search.grid_per_axis)
            } else {
                star_points(&lo, &hi)
            };
            let seeds: Vec<(Vec<f64>, Vec<f64>)> = seeds
                .chunks(n_in)
                .filter_map(|x| search.eval(x).map(|y| (x.to_vec(), y)))
                .collect();
            if seeds.is_empty() {
                return Err(MapError::invalid("mapping is undefined everywhere inside the box"));
            }
            debug!(
                "MapBox {} over {} seeds, outputs {}..={}",
                dir,
                seeds.len(),
                first + 1,
                last + 1
            );
            for axis in first..=last {
                let (x_low, low) = search.extremum(&seeds, axis, 1.0)?;
                let (x_high, high) = search.extremum(&seeds, axis, -1.0)?;
                lbnd_out.push(low);
                ubnd_out.push(high);
                xl.push(x_low);
                xu.push(x_high);
            }
        }

        Ok(Self {
            lbnd_in: lo,
            ubnd_in: hi,
            lbnd_out,
            ubnd_out,
            xl,
            xu,
            min_out_coord: first + 1,
            max_out_coord: last + 1,
            direction: dir,
        })
    }
}

struct BoxSearch<'a> {
    map: &'a Mapping,
    dir: Direction,
    n_out: usize,
    lo: &'a [f64],
    hi: &'a [f64],
    config: &'a SearchConfig,
}

impl BoxSearch<'_> {
    /// Output at `x`, `None` where the mapping fails
    fn eval(&self, x: &[f64]) -> Option<Vec<f64>> {
        let mut y = vec![0.0; self.n_out];
        self.map.apply_point(self.dir, x, &mut y).ok()?;
        Some(y)
    }

    /// Output change from `centre` to the upper face along each input axis,
    /// indexed `[input][output]`. Exact for linear mappings.
    fn axis_steps(&self, centre: &[f64]) -> Result<Vec<Vec<f64>>> {
        let undefined = || MapError::invalid("mapping is undefined inside the box");
        let y0 = self.eval(centre).ok_or_else(undefined)?;
        (0..centre.len())
            .map(|j| {
                let mut x = centre.to_vec();
                x[j] = self.hi[j];
                let y = self.eval(&x).ok_or_else(undefined)?;
                Ok(y.iter().zip(&y0).map(|(a, b)| a - b).collect())
            })
            .collect()
    }

    /// Minimum of `sign * y[axis]` for a linear mapping: every input sits on
    /// whichever face lowers the output, or at the centre if it has no effect.
    fn linear_extremum(&self, centre: &[f64], steps: &[Vec<f64>], axis: usize, sign: f64) -> Result<(Vec<f64>, f64)> {
        let x: Vec<f64> = steps
            .iter()
            .enumerate()
            .map(|(j, step)| {
                let slope = sign * step[axis];
                if slope > 0.0 {
                    self.lo[j]
                } else if slope < 0.0 {
                    self.hi[j]
                } else {
                    centre[j]
                }
            })
            .collect();
        let y = self
            .eval(&x)
            .ok_or_else(|| MapError::invalid("mapping is undefined inside the box"))?;
        if !y[axis].is_finite() {
            return Err(MapError::invalid(format!(
                "output axis {} has no finite value inside the box",
                axis + 1
            )));
        }
        Ok((x, y[axis]))
    }

    /// Minimum of `sign * y[axis]`: the best seed, refined by a compass
    /// search that stays inside the box.
    fn extremum(&self, seeds: &[(Vec<f64>, Vec<f64>)], axis: usize, sign: f64) -> Result<(Vec<f64>, f64)> {
        let (start, start_y) = seeds
            .iter()
            .filter(|(_, y)| y[axis].is_finite())
            .min_by(|a, b| (sign * a.1[axis]).total_cmp(&(sign * b.1[axis])))
            .ok_or_else(|| {
                MapError::invalid(format!(
                    "output axis {} has no finite value inside the box",
                    axis + 1
                ))
            })?;
        let mut x = start.clone();
        let mut best = sign * start_y[axis];

        let cells = (self.config.grid_per_axis - 1) as f64;
        let mut step: Vec<f64> = self.lo.iter().zip(self.hi).map(|(l, h)| (h - l) / cells).collect();
        let floor: Vec<f64> = self
            .lo
            .iter()
            .zip(self.hi)
            .map(|(l, h)| (h - l) * self.config.rel_tolerance)
            .collect();

        let mut iterations = 0;
        while iterations < self.config.max_iterations {
            iterations += 1;
            let mut improved = false;
            for j in 0..x.len() {
                if step[j] <= 0.0 {
                    continue;
                }
                for delta in [step[j], -step[j]] {
                    let mut candidate = x.clone();
                    candidate[j] = (x[j] + delta).clamp(self.lo[j], self.hi[j]);
                    if candidate[j] == x[j] {
                        continue;
                    }
                    let Some(y) = self.eval(&candidate) else { continue };
                    let value = sign * y[axis];
                    if value.is_finite() && value < best {
                        x = candidate;
                        best = value;
                        improved = true;
                        break;
                    }
                }
            }
            if !improved {
                if step.iter().zip(&floor).all(|(s, f)| s <= f) {
                    break;
                }
                step.iter_mut().for_each(|s| *s *= 0.5);
            }
        }
        debug!(
            "MapBox axis {} {} after {} iterations: {}",
            axis + 1,
            if sign > 0.0 { "min" } else { "max" },
            iterations,
            sign * best
        );
        Ok((x, sign * best))
    }
}

/// Both corners must have `n` finite coordinates
fn check_box(a: &[f64], b: &[f64], n: usize) -> Result<()> {
    MapError::check_len("lower corner length", n, a.len())?;
    MapError::check_len("upper corner length", n, b.len())?;
    for &v in a.iter().chain(b) {
        check_finite(v, "box corner")?;
    }
    Ok(())
}

/// Per-axis `(min, max)` of two corners
fn canonical_box(a: &[f64], b: &[f64]) -> (Vec<f64>, Vec<f64>) {
    a.iter().zip(b).map(|(&x, &y)| (x.min(y), x.max(y))).unzip()
}

/// The full grid when it stays under [`MAX_SAMPLES`], otherwise
/// [`star_points`]
fn sample_points(lo: &[f64], hi: &[f64], per_axis: usize) -> Vec<f64> {
    let total = u32::try_from(lo.len())
        .ok()
        .and_then(|n| per_axis.checked_pow(n))
        .filter(|&total| total <= MAX_SAMPLES);
    match total {
        Some(total) => grid_points(lo, hi, per_axis, total),
        None => {
            debug!("{} axes at {} samples each is too many, sampling the faces", lo.len(), per_axis);
            star_points(lo, hi)
        }
    }
}

/// The centre, both extreme corners and the centre of every face:
/// `2n + 3` points for `n` axes.
fn star_points(lo: &[f64], hi: &[f64]) -> Vec<f64> {
    let n = lo.len();
    let centre: Vec<f64> = lo.iter().zip(hi).map(|(l, h)| 0.5 * (l + h)).collect();
    let mut data = Vec::with_capacity((2 * n + 3) * n);
    data.extend_from_slice(&centre);
    data.extend_from_slice(lo);
    data.extend_from_slice(hi);
    for axis in 0..n {
        for face in [lo[axis], hi[axis]] {
            let start = data.len();
            data.extend_from_slice(&centre);
            data[start + axis] = face;
        }
    }
    data
}

/// Row-major regular grid of `total = per_axis^n` points, including both
/// edges. Axis 0 varies fastest.
fn grid_points(lo: &[f64], hi: &[f64], per_axis: usize, total: usize) -> Vec<f64> {
    let n = lo.len();
    let cells = (per_axis - 1) as f64;
    let mut data = Vec::with_capacity(total * n);
    let mut index = vec![0usize; n];
    for _ in 0..total {
        for axis in 0..n {
            let t = index[axis] as f64 / cells;
            data.push(lo[axis] + t * (hi[axis] - lo[axis]));
        }
        for digit in index.iter_mut() {
            *digit += 1;
            if *digit < per_axis {
                break;
            }
            *digit = 0;
        }
    }
    data
}
