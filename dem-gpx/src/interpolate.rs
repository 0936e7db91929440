//! Interpolation on regular rectilinear grids.
//!
//! The grid is described by two strictly monotonic axes (one coordinate per
//! row, one per column) and a row-major value array. Axes may run in either
//! direction, which matters for rasters whose rows are stored north to south
//! while the northing decreases with the row index.
//!
//! Every method except nearest-neighbour is a tensor-product Lagrange
//! interpolant over a `(k + 1) × (k + 1)` stencil of grid nodes, where `k` is
//! the polynomial degree (1, 3 or 5). The stencil is centred on the cell that
//! holds the query and shifted inward near the grid edges, so the result
//! reproduces any polynomial surface of degree `k` exactly, including at the
//! border cells.

use std::fmt;
use std::str::FromStr;

use crate::error::{DemError, Result};

/// Numerical scheme used to estimate a value between grid samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterpolationMethod {
    /// Value of the closest grid node.
    Nearest,
    /// Bilinear interpolation between the 4 surrounding nodes.
    #[default]
    Linear,
    /// Bicubic interpolation over a 4×4 stencil.
    ///
    /// A local Lagrange stencil, not a global spline: between nodes the
    /// values differ from SciPy's cubic spline output.
    Cubic,
    /// Biquintic interpolation over a 6×6 stencil.
    ///
    /// A local Lagrange stencil, not a global spline: between nodes the
    /// values differ from SciPy's quintic spline output.
    Quintic,
}

impl InterpolationMethod {
    /// All supported methods, cheapest first.
    pub const ALL: [InterpolationMethod; 4] = [
        InterpolationMethod::Nearest,
        InterpolationMethod::Linear,
        InterpolationMethod::Cubic,
        InterpolationMethod::Quintic,
    ];

    /// Polynomial degree of the interpolant (0 for nearest-neighbour).
    pub fn degree(&self) -> usize {
        match self {
            InterpolationMethod::Nearest => 0,
            InterpolationMethod::Linear => 1,
            InterpolationMethod::Cubic => 3,
            InterpolationMethod::Quintic => 5,
        }
    }

    /// Minimum number of grid nodes needed along each axis.
    pub fn min_points(&self) -> usize {
        self.degree() + 1
    }

    /// Lowercase method name, as accepted by [`FromStr`].
    pub fn as_str(&self) -> &'static str {
        match self {
            InterpolationMethod::Nearest => "nearest",
            InterpolationMethod::Linear => "linear",
            InterpolationMethod::Cubic => "cubic",
            InterpolationMethod::Quintic => "quintic",
        }
    }
}

impl fmt::Display for InterpolationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InterpolationMethod {
    type Err = DemError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nearest" => Ok(InterpolationMethod::Nearest),
            "linear" => Ok(InterpolationMethod::Linear),
            "cubic" => Ok(InterpolationMethod::Cubic),
            "quintic" => Ok(InterpolationMethod::Quintic),
            _ => Err(DemError::UnknownMethod(s.to_string())),
        }
    }
}

/// One grid axis viewed in ascending order regardless of storage order.
struct Axis<'a> {
    nodes: &'a [f64],
    descending: bool,
}

impl<'a> Axis<'a> {
    fn new(nodes: &'a [f64]) -> Self {
        let descending = nodes.len() > 1 && nodes[0] > nodes[nodes.len() - 1];
        Self { nodes, descending }
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Storage index of the `i`-th node in ascending order.
    fn storage_index(&self, i: usize) -> usize {
        if self.descending {
            self.nodes.len() - 1 - i
        } else {
            i
        }
    }

    /// Coordinate of the `i`-th node in ascending order.
    fn node(&self, i: usize) -> f64 {
        self.nodes[self.storage_index(i)]
    }

    fn min(&self) -> f64 {
        self.node(0)
    }

    fn max(&self) -> f64 {
        self.node(self.len() - 1)
    }

    /// Ascending index of the lower node of the interval holding `v`.
    ///
    /// Returns `None` when `v` lies outside the span of the axis.
    fn locate(&self, v: f64) -> Option<usize> {
        if v.is_nan() || v < self.min() || v > self.max() {
            return None;
        }
        if self.len() == 1 {
            return Some(0);
        }

        // Binary search for the last node <= v, clamped so lo + 1 is valid.
        let (mut lo, mut hi) = (0, self.len() - 1);
        while hi - lo > 1 {
            let mid = (lo + hi) / 2;
            if self.node(mid) <= v {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        Some(lo)
    }

    /// Stencil for `v`: storage indices paired with interpolation weights.
    fn weights(&self, v: f64, degree: usize) -> Option<Vec<(usize, f64)>> {
        let lo = self.locate(v)?;

        if degree == 0 {
            let idx = if self.len() == 1 {
                0
            } else {
                let t = (v - self.node(lo)) / (self.node(lo + 1) - self.node(lo));
                // Ties go to the lower node
                if t <= 0.5 {
                    lo
                } else {
                    lo + 1
                }
            };
            return Some(vec![(self.storage_index(idx), 1.0)]);
        }

        let width = degree + 1;
        let start = lo
            .saturating_sub((degree - 1) / 2)
            .min(self.len() - width);

        let stencil = (start..start + width)
            .map(|j| {
                let xj = self.node(j);
                let w = (start..start + width)
                    .filter(|&m| m != j)
                    .map(|m| {
                        let xm = self.node(m);
                        (v - xm) / (xj - xm)
                    })
                    .product::<f64>();
                (self.storage_index(j), w)
            })
            .collect();

        Some(stencil)
    }
}

/// A regular grid of samples borrowed from its owner.
///
/// # Example
///
/// ```
/// use dem_gpx::interpolate::{GridInterpolator, InterpolationMethod};
///
/// let ys = [1.5, 0.5]; // descending rows
/// let xs = [0.5, 1.5];
/// let values = [10.0, 20.0, 30.0, 40.0];
///
/// let grid = GridInterpolator::new(&ys, &xs, &values).unwrap();
/// let v = grid.interpolate(1.0, 1.0, InterpolationMethod::Linear).unwrap();
/// assert_eq!(v, Some(25.0));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct GridInterpolator<'a> {
    ys: &'a [f64],
    xs: &'a [f64],
    values: &'a [f32],
}

impl<'a> GridInterpolator<'a> {
    /// Wrap axes and values, checking that the shapes agree.
    ///
    /// # Errors
    ///
    /// Returns [`DemError::GridShape`] if `values.len() != ys.len() * xs.len()`
    /// or either axis is empty.
    pub fn new(ys: &'a [f64], xs: &'a [f64], values: &'a [f32]) -> Result<Self> {
        if ys.is_empty() || xs.is_empty() || values.len() != ys.len() * xs.len() {
            return Err(DemError::GridShape {
                width: xs.len(),
                height: ys.len(),
                len: values.len(),
            });
        }
        Ok(Self { ys, xs, values })
    }

    /// Number of rows in the grid.
    pub fn rows(&self) -> usize {
        self.ys.len()
    }

    /// Number of columns in the grid.
    pub fn cols(&self) -> usize {
        self.xs.len()
    }

    /// Interpolate the grid at `(y, x)`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(value))` - the interpolated value
    /// - `Ok(None)` - the query lies outside the span of the axes, or the
    ///   stencil touches a NaN sample
    ///
    /// # Errors
    ///
    /// Returns [`DemError::GridTooSmall`] if either axis has fewer nodes than
    /// the method requires.
    pub fn interpolate(&self, y: f64, x: f64, method: InterpolationMethod) -> Result<Option<f64>> {
        let required = method.min_points();
        if self.rows() < required || self.cols() < required {
            return Err(DemError::GridTooSmall {
                method: method.as_str(),
                required,
                rows: self.rows(),
                cols: self.cols(),
            });
        }

        let degree = method.degree();
        let row_weights = match Axis::new(self.ys).weights(y, degree) {
            Some(w) => w,
            None => return Ok(None),
        };
        let col_weights = match Axis::new(self.xs).weights(x, degree) {
            Some(w) => w,
            None => return Ok(None),
        };

        let cols = self.cols();
        let mut acc = 0.0;
        for &(row, wy) in &row_weights {
            for &(col, wx) in &col_weights {
                acc += wy * wx * self.values[row * cols + col] as f64;
            }
        }

        Ok(if acc.is_nan() { None } else { Some(acc) })
    }
}
