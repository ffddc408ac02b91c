//! # Disparity planes
//!
//! Every pixel of a view holds a slanted plane `d(x, y) = a·x + b·y + c`. The plane is
//! expressed in absolute pixel coordinates of the view it belongs to.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use rand::Rng;

// -----------------------------------------------------------------------------------------------
// CONSTANTS
// -----------------------------------------------------------------------------------------------

/// Below this the plane is (nearly) parallel to the epipolar line in the other view.
const DEGENERATE_TRANSFER: f64 = 1e-6;

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Plane {
    pub a: f64,
    pub b: f64,
    pub c: f64
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl Plane {
    pub fn new(a: f64, b: f64, c: f64) -> Self {
        Self { a, b, c }
    }

    /// The fronto-parallel plane of constant disparity `d`.
    pub fn constant(d: f64) -> Self {
        Self { a: 0.0, b: 0.0, c: d }
    }

    /// Plane with slopes `(a, b)` passing through disparity `d` at `(x, y)`.
    pub fn through(x: f64, y: f64, d: f64, a: f64, b: f64) -> Self {
        Self { a, b, c: d - a * x - b * y }
    }

    /// Disparity at `(x, y)`, unsaturated.
    pub fn evaluate(&self, x: f64, y: f64) -> f64 {
        self.a * x + self.b * y + self.c
    }

    /// A random plane through `(x, y)`.
    ///
    /// The disparity at `(x, y)` is uniform in `[min_d, max_d]` and both slopes are uniform in
    /// `[-max_slope, max_slope]`, or zero when `constant` is set.
    pub fn random<R: Rng + ?Sized>(
        x: f64,
        y: f64,
        min_d: f64,
        max_d: f64,
        max_slope: f64,
        constant: bool,
        rng: &mut R
    ) -> Self {
        let d = rng.gen_range(min_d..=max_d);

        if constant {
            return Self::constant(d);
        }

        let a = rng.gen_range(-max_slope..=max_slope);
        let b = rng.gen_range(-max_slope..=max_slope);

        Self::through(x, y, d, a, b)
    }

    /// A plane whose disparity at `(x, y)` is within `max_delta_d` of this one's, and whose slopes
    /// are each within `max_delta_slope` of this one's.
    pub fn perturb<R: Rng + ?Sized>(
        &self,
        x: f64,
        y: f64,
        max_delta_d: f64,
        max_delta_slope: f64,
        rng: &mut R
    ) -> Self {
        let d = self.evaluate(x, y) + rng.gen_range(-max_delta_d..=max_delta_d);
        let a = self.a + rng.gen_range(-max_delta_slope..=max_delta_slope);
        let b = self.b + rng.gen_range(-max_delta_slope..=max_delta_slope);

        Self::through(x, y, d, a, b)
    }

    /// Clamp both slopes to `[-max_slope, max_slope]`, keeping the disparity at `(x, y)`.
    pub fn limit_slope(&self, x: f64, y: f64, max_slope: f64) -> Self {
        let d = self.evaluate(x, y);
        let a = self.a.max(-max_slope).min(max_slope);
        let b = self.b.max(-max_slope).min(max_slope);

        Self::through(x, y, d, a, b)
    }

    /// Whether both slopes are within `[-max_slope, max_slope]`.
    pub fn within_slope(&self, max_slope: f64) -> bool {
        self.a.abs() <= max_slope && self.b.abs() <= max_slope
    }

    /// Move the plane along `c` so that its disparity at `(x, y)` is within `[min_d, max_d]`.
    pub fn anchor_within(&self, x: f64, y: f64, min_d: f64, max_d: f64) -> Self {
        let d = self.evaluate(x, y);
        let clamped = d.max(min_d).min(max_d);

        Self { c: self.c + (clamped - d), ..*self }
    }

    /// Express the plane in the other view's coordinates.
    ///
    /// `sign` is the matching direction of this plane's view: a pixel `x` matches `x + sign·d`
    /// in the other view. Both views describe the same surface point, so
    /// `d·(1 + sign·a) = a·x' + b·y + c`. Returns `None` for a degenerate plane.
    pub fn transfer(&self, sign: f64) -> Option<Self> {
        let k = 1.0 + sign * self.a;
        if k.abs() < DEGENERATE_TRANSFER {
            return None;
        }

        Some(Self {
            a: self.a / k,
            b: self.b / k,
            c: self.c / k
        })
    }
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------
