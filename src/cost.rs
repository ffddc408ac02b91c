//! # Matching cost
//!
//! Cost of a plane at a pixel: a support-weighted sum, over a square window, of truncated colour
//! and gradient dissimilarities between each window pixel and its match in the other view.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use crate::buffer::PixelBuffer;
use crate::disparity::StereoFrame;
use crate::error::*;
use crate::params::{OutOfBounds, Params, Sampling};
use crate::plane::Plane;

// -----------------------------------------------------------------------------------------------
// CONSTANTS
// -----------------------------------------------------------------------------------------------

/// Disparity spread across half a window, in pixels, from which a plane counts as steep and its
/// window may be resized.
const STEEP_SPREAD: f64 = 1.0;

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

/// Evaluates plane costs for both views of a frame.
///
/// Gradient maps are computed once on construction; the images themselves are borrowed.
pub struct CostEvaluator<'a> {
    params: &'a Params,
    left: &'a PixelBuffer,
    right: &'a PixelBuffer,
    left_grad: PixelBuffer,
    right_grad: PixelBuffer,
    half: isize
}

/// Inclusive window offsets `(min_dx, max_dx, min_dy, max_dy)`.
type Window = (isize, isize, isize, isize);

// -----------------------------------------------------------------------------------------------
// ENUMERATIONS
// -----------------------------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum View {
    Left,
    Right
}

/// Where a value is read from.
#[derive(Clone, Copy, Debug)]
enum Sample {
    Pixel(usize, usize),
    /// Linear interpolation between `x0` and `x0 + 1` on row `y`.
    Lerp { x0: usize, x1: usize, t: f64, y: usize },
    Black
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl View {
    /// Pixel `x` of this view matches `x + sign·d` in the other view.
    pub fn sign(self) -> f64 {
        match self {
            View::Left => -1.0,
            View::Right => 1.0
        }
    }

    pub fn opposite(self) -> View {
        match self {
            View::Left => View::Right,
            View::Right => View::Left
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            View::Left => "left",
            View::Right => "right"
        }
    }
}

impl std::fmt::Display for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl Sample {
    fn value(&self, buf: &PixelBuffer, channel: usize) -> f64 {
        match *self {
            Sample::Pixel(x, y) => buf.get(x, y, channel),
            Sample::Lerp { x0, x1, t, y } => {
                let v0 = buf.get(x0, y, channel);
                let v1 = buf.get(x1, y, channel);
                v0 + (v1 - v0) * t
            },
            Sample::Black => 0.0
        }
    }
}

impl<'a> CostEvaluator<'a> {
    /// The frame is expected to have been validated, and the parameters too.
    pub fn new(params: &'a Params, frame: &'a StereoFrame) -> Self {
        Self {
            params,
            left: &frame.left,
            right: &frame.right,
            left_grad: frame.left.gradient_magnitude(params.normalize_gradients),
            right_grad: frame.right.gradient_magnitude(params.normalize_gradients),
            half: (params.window_size / 2) as isize
        }
    }

    /// `(image, gradient)` of a view.
    fn view(&self, view: View) -> (&PixelBuffer, &PixelBuffer) {
        match view {
            View::Left => (self.left, &self.left_grad),
            View::Right => (self.right, &self.right_grad)
        }
    }

    /// Disparity of `plane` at a pixel, saturated if enabled.
    pub fn disparity(&self, plane: &Plane, x: f64, y: f64) -> f64 {
        self.params.saturate(plane.evaluate(x, y))
    }

    /// Cost of `plane` at pixel `(x, y)` of `view`.
    ///
    /// Returns NaN when the candidate is unusable under `OutOfBounds::NanCost`, and
    /// `Error::BoundaryCost` under `OutOfBounds::Error`.
    pub fn cost(&self, view: View, x: usize, y: usize, plane: &Plane) -> Result<f64> {
        let (img, grad) = self.view(view);
        let (other, other_grad) = self.view(view.opposite());
        let params = self.params;

        let h = self.half;
        let window = if params.resize_windows && self.is_steep(plane) {
            self.valid_window(view, x, y, plane).unwrap_or((-h, h, -h, h))
        }
        else {
            (-h, h, -h, h)
        };

        let center = Sample::Pixel(x, y);
        let mut acc = 0.0;

        for dy in window.2..=window.3 {
            for dx in window.0..=window.1 {
                let qx = x as isize + dx;
                let qy = y as isize + dy;
                let mx = qx as f64 + view.sign() * self.disparity(plane, qx as f64, qy as f64);

                let own = locate_own(img, qx, qy);
                let matched = locate_matched(other, mx, qy, params.sampling);

                let (own, matched) = match (own, matched) {
                    (Some(o), Some(m)) => (o, m),
                    (own, matched) => match params.out_of_bounds {
                        OutOfBounds::RepeatPixel => (
                            own.unwrap_or_else(|| clamp_own(img, qx, qy)),
                            matched.unwrap_or_else(|| clamp_matched(other, mx, qy, params.sampling))
                        ),
                        OutOfBounds::BlackPixel => (
                            own.unwrap_or(Sample::Black),
                            matched.unwrap_or(Sample::Black)
                        ),
                        OutOfBounds::ZeroCost => continue,
                        OutOfBounds::NanCost => return Ok(f64::NAN),
                        OutOfBounds::Error => {
                            let (sample_x, sample_y) = if own.is_none() {
                                (qx as f64, qy as f64)
                            }
                            else {
                                (mx, qy as f64)
                            };
                            return Err(Error::BoundaryCost {
                                view: view.name(),
                                x,
                                y,
                                sample_x,
                                sample_y
                            });
                        }
                    }
                };

                let mut col_diff = 0.0;
                let mut support = 0.0;
                for c in 0..img.channels() {
                    let own_c = own.value(img, c);
                    col_diff += (own_c - matched.value(other, c)).abs();
                    support += (center.value(img, c) - own_c).abs();
                }
                let grad_diff = (own.value(grad, 0) - matched.value(other_grad, 0)).abs();

                let rho = params.alfa * col_diff.min(params.tau_col)
                    + (1.0 - params.alfa) * grad_diff.min(params.tau_grad);
                let weight = (-support / params.gamma).exp();

                acc += weight * rho;
            }
        }

        Ok(acc)
    }

    /// Whether the disparity of `plane` changes by a pixel or more between the window centre and
    /// its corners.
    fn is_steep(&self, plane: &Plane) -> bool {
        (plane.a.abs() + plane.b.abs()) * self.half as f64 >= STEEP_SPREAD
    }

    /// Bounding box of the window offsets whose own pixel and match are both inside the image.
    fn valid_window(&self, view: View, x: usize, y: usize, plane: &Plane) -> Option<Window> {
        let (img, _) = self.view(view);
        let (other, _) = self.view(view.opposite());
        let h = self.half;

        let mut bbox: Option<Window> = None;
        for dy in -h..=h {
            for dx in -h..=h {
                let qx = x as isize + dx;
                let qy = y as isize + dy;
                if !img.contains(qx, qy) {
                    continue;
                }

                let mx = qx as f64 + view.sign() * self.disparity(plane, qx as f64, qy as f64);
                if locate_matched(other, mx, qy, self.params.sampling).is_none() {
                    continue;
                }

                bbox = Some(match bbox {
                    None => (dx, dx, dy, dy),
                    Some((x0, x1, y0, y1)) => (x0.min(dx), x1.max(dx), y0.min(dy), y1.max(dy))
                });
            }
        }

        bbox
    }
}

fn locate_own(img: &PixelBuffer, x: isize, y: isize) -> Option<Sample> {
    if img.contains(x, y) {
        Some(Sample::Pixel(x as usize, y as usize))
    }
    else {
        None
    }
}

fn locate_matched(img: &PixelBuffer, x: f64, y: isize, sampling: Sampling) -> Option<Sample> {
    if y < 0 || y as usize >= img.height() || !x.is_finite() {
        return None;
    }

    let last = (img.width() - 1) as f64;
    match sampling {
        Sampling::Nearest => {
            let r = x.round();
            if r >= 0.0 && r <= last {
                Some(Sample::Pixel(r as usize, y as usize))
            }
            else {
                None
            }
        },
        Sampling::Bilinear => {
            if x >= 0.0 && x <= last {
                Some(lerp_sample(img, x, y as usize))
            }
            else {
                None
            }
        }
    }
}

fn lerp_sample(img: &PixelBuffer, x: f64, y: usize) -> Sample {
    let x0 = x.floor() as usize;
    let x1 = (x0 + 1).min(img.width() - 1);

    Sample::Lerp { x0, x1, t: x - x0 as f64, y }
}

fn clamp_own(img: &PixelBuffer, x: isize, y: isize) -> Sample {
    let cx = x.max(0).min(img.width() as isize - 1);
    let cy = y.max(0).min(img.height() as isize - 1);

    Sample::Pixel(cx as usize, cy as usize)
}

fn clamp_matched(img: &PixelBuffer, x: f64, y: isize, sampling: Sampling) -> Sample {
    let last = (img.width() - 1) as f64;
    let cy = y.max(0).min(img.height() as isize - 1) as usize;
    // NaN clamps to the first column
    let cx = if x.is_nan() { 0.0 } else { x.max(0.0).min(last) };

    match sampling {
        Sampling::Nearest => Sample::Pixel(cx.round() as usize, cy),
        Sampling::Bilinear => lerp_sample(img, cx, cy)
    }
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn textured(width: usize, height: usize, shift: usize) -> PixelBuffer {
        let mut buf = PixelBuffer::new(width, height, 1);
        for y in 0..height {
            for x in 0..width {
                let v = ((x + shift) * 37 + y * 91) % 251;
                buf.put(x, y, 0, v as f64);
            }
        }
        buf
    }

    fn frame(shift: usize) -> StereoFrame {
        StereoFrame {
            left: textured(16, 10, 0),
            right: textured(16, 10, shift)
        }
    }

    /// Left-view cost at `(x, y)` of a plane of constant disparity, summed sample by sample.
    /// `own` and `matched` give the columns read for window column `qx`, `None` reads black.
    fn reference_cost<F, G>(eval: &CostEvaluator, x: usize, y: usize, own: F, matched: G) -> f64
    where
        F: Fn(isize) -> Option<usize>,
        G: Fn(isize) -> Option<usize>
    {
        let p = eval.params;
        let read = |buf: &PixelBuffer, col: Option<usize>, row: usize| {
            col.map_or(0.0, |c| buf.get(c, row, 0))
        };
        let center = eval.left.get(x, y, 0);
        let h = eval.half;

        let mut acc = 0.0;
        for dy in -h..=h {
            let row = (y as isize + dy) as usize;
            for dx in -h..=h {
                let qx = x as isize + dx;
                let o = read(eval.left, own(qx), row);
                let m = read(eval.right, matched(qx), row);
                let og = read(&eval.left_grad, own(qx), row);
                let mg = read(&eval.right_grad, matched(qx), row);

                let rho = p.alfa * (o - m).abs().min(p.tau_col)
                    + (1.0 - p.alfa) * (og - mg).abs().min(p.tau_grad);
                acc += (-(center - o).abs() / p.gamma).exp() * rho;
            }
        }
        acc
    }

    fn params(out_of_bounds: OutOfBounds) -> Params {
        Params {
            window_size: 5,
            min_d: 0,
            max_d: 6,
            out_of_bounds,
            resize_windows: false,
            ..Params::default()
        }
    }

    #[test]
    fn true_disparity_has_zero_cost() {
        let f = frame(2);
        let p = params(OutOfBounds::NanCost);
        let eval = CostEvaluator::new(&p, &f);

        // left x matches right x - 2, which holds left's x
        let cost = eval.cost(View::Left, 8, 5, &Plane::constant(2.0)).unwrap();
        assert_eq!(cost, 0.0);
        let cost = eval.cost(View::Right, 6, 5, &Plane::constant(2.0)).unwrap();
        assert_eq!(cost, 0.0);

        let wrong = eval.cost(View::Left, 8, 5, &Plane::constant(4.0)).unwrap();
        assert!(wrong > 0.0);
    }

    #[test]
    fn costs_are_non_negative_or_unusable() {
        let f = frame(3);
        let mut rng = StdRng::seed_from_u64(3);

        for &oob in [
            OutOfBounds::RepeatPixel,
            OutOfBounds::BlackPixel,
            OutOfBounds::ZeroCost,
            OutOfBounds::NanCost
        ].iter() {
            for &resize in [false, true].iter() {
                let p = Params { resize_windows: resize, ..params(oob) };
                let eval = CostEvaluator::new(&p, &f);

                for y in 0..10 {
                    for x in 0..16 {
                        let plane = Plane::random(x as f64, y as f64, 0.0, 6.0, 1.0, false, &mut rng);
                        let c = eval.cost(View::Left, x, y, &plane).unwrap();
                        assert!(c.is_nan() || c >= 0.0, "cost {} at ({}, {})", c, x, y);
                        if oob != OutOfBounds::NanCost {
                            assert!(!c.is_nan());
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn pure_colour_term_when_alfa_is_one() {
        let f = frame(1);
        let p = Params { alfa: 1.0, tau_col: 40.0, gamma: 25.0, ..params(OutOfBounds::Error) };
        let eval = CostEvaluator::new(&p, &f);
        let plane = Plane::constant(3.0);
        let (x, y) = (9usize, 4usize);

        let mut expected = 0.0;
        for dy in -2isize..=2 {
            for dx in -2isize..=2 {
                let qx = (x as isize + dx) as usize;
                let qy = (y as isize + dy) as usize;
                let own = f.left.get(qx, qy, 0);
                let matched = f.right.get(qx - 3, qy, 0);
                let w = (-(f.left.get(x, y, 0) - own).abs() / 25.0).exp();
                expected += w * (own - matched).abs().min(40.0);
            }
        }

        let cost = eval.cost(View::Left, x, y, &plane).unwrap();
        assert!((cost - expected).abs() < 1e-9);

        // The gradient truncation has no influence any more
        let p2 = Params { tau_grad: 0.001, ..p.clone() };
        let eval2 = CostEvaluator::new(&p2, &f);
        assert_eq!(eval2.cost(View::Left, x, y, &plane).unwrap(), cost);
    }

    #[test]
    fn out_of_bounds_policies_at_the_border() {
        let f = frame(2);
        let plane = Plane::constant(2.0);

        let nan = CostEvaluator::new(&params(OutOfBounds::NanCost), &f)
            .cost(View::Left, 0, 0, &plane)
            .unwrap();
        assert!(nan.is_nan());

        let p = params(OutOfBounds::Error);
        let err = CostEvaluator::new(&p, &f).cost(View::Left, 0, 5, &plane);
        assert!(matches!(err, Err(Error::BoundaryCost { x: 0, y: 5, .. })));

        let zero = CostEvaluator::new(&params(OutOfBounds::ZeroCost), &f)
            .cost(View::Left, 0, 5, &plane)
            .unwrap();
        assert!(zero.is_finite());

        // Clamped columns for repeat, zero samples for black
        let p = params(OutOfBounds::RepeatPixel);
        let eval = CostEvaluator::new(&p, &f);
        let repeat = eval.cost(View::Left, 0, 5, &plane).unwrap();
        let expected = reference_cost(
            &eval,
            0,
            5,
            |qx| Some(qx.max(0) as usize),
            |qx| Some((qx - 2).max(0) as usize)
        );
        assert!((repeat - expected).abs() < 1e-9, "repeat {} vs {}", repeat, expected);

        let p = params(OutOfBounds::BlackPixel);
        let eval = CostEvaluator::new(&p, &f);
        let black = eval.cost(View::Left, 0, 5, &plane).unwrap();
        let expected = reference_cost(
            &eval,
            0,
            5,
            |qx| if qx >= 0 { Some(qx as usize) } else { None },
            |qx| if qx >= 2 { Some((qx - 2) as usize) } else { None }
        );
        assert!((black - expected).abs() < 1e-9, "black {} vs {}", black, expected);

        assert!((black - repeat).abs() > 1e-6);
        assert!(black >= zero && repeat >= zero);
    }

    #[test]
    fn interior_windows_ignore_the_policy() {
        let f = frame(2);
        let plane = Plane::new(0.05, -0.02, 2.5);
        let reference = CostEvaluator::new(&params(OutOfBounds::Error), &f)
            .cost(View::Left, 9, 5, &plane)
            .unwrap();

        for &oob in [OutOfBounds::RepeatPixel, OutOfBounds::BlackPixel, OutOfBounds::NanCost].iter() {
            let c = CostEvaluator::new(&params(oob), &f).cost(View::Left, 9, 5, &plane).unwrap();
            assert_eq!(c, reference);
        }
    }

    #[test]
    fn resized_windows_avoid_unusable_costs() {
        let f = frame(2);
        // Disparity 2 at (1, 0), one more pixel at the window edge
        let plane = Plane::through(1.0, 0.0, 2.0, 0.5, 0.0);
        let p = Params { resize_windows: true, ..params(OutOfBounds::NanCost) };
        let eval = CostEvaluator::new(&p, &f);

        // The window is shrunk to columns whose match lands inside the right image
        assert!(eval.is_steep(&plane));
        assert_eq!(eval.valid_window(View::Left, 1, 0, &plane), Some((2, 2, 0, 2)));

        let c = eval.cost(View::Left, 1, 0, &plane).unwrap();
        let skipped = CostEvaluator::new(&params(OutOfBounds::ZeroCost), &f)
            .cost(View::Left, 1, 0, &plane)
            .unwrap();
        assert!(c.is_finite());
        assert_eq!(c, skipped);
    }

    #[test]
    fn flat_planes_keep_the_full_window() {
        let f = frame(2);
        let p = Params { resize_windows: true, ..params(OutOfBounds::NanCost) };
        let eval = CostEvaluator::new(&p, &f);

        let flat = Plane::constant(2.0);
        assert!(!eval.is_steep(&flat));
        assert!(!eval.is_steep(&Plane::new(0.2, 0.2, 2.0)));
        assert!(eval.cost(View::Left, 1, 0, &flat).unwrap().is_nan());
    }

    #[test]
    fn bilinear_sampling_interpolates() {
        let mut right = PixelBuffer::new(4, 1, 1);
        right.put(1, 0, 0, 10.0);
        right.put(2, 0, 0, 20.0);

        match locate_matched(&right, 1.25, 0, Sampling::Bilinear) {
            Some(s) => assert!((s.value(&right, 0) - 12.5).abs() < 1e-12),
            None => panic!("sample should be inside")
        }
        assert!(locate_matched(&right, 3.2, 0, Sampling::Bilinear).is_none());
        assert!(locate_matched(&right, 3.2, 0, Sampling::Nearest).is_some());
        assert!(locate_matched(&right, -0.6, 0, Sampling::Nearest).is_none());
    }
}
