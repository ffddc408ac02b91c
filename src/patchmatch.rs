//! # PatchMatch Stereo disparity computation
//!
//! This module provides an implementation of PatchMatch Stereo from
//! ("PatchMatch Stereo - Stereo Matching with Slanted Support Windows")[http://dx.doi.org/10.5244/C.25.14]
//! by Bleyer, Rhemann and Rother (BMVC 2011).
//!
//! Each pixel of both views holds a slanted plane. Planes start random and are improved for a
//! fixed number of iterations. Every iteration visits the left view then the right view, and for
//! each view runs three passes in the iteration's scan order:
//!
//! 1. spatial propagation: try the planes of the already visited neighbours,
//! 2. view propagation: offer every plane to its matching pixel in the other view,
//! 3. refinement: try random perturbations of decreasing size.
//!
//! Even iterations scan in raster order, odd iterations in reverse raster order. A pixel only
//! ever sees neighbour planes that were already updated earlier in the same pass, so the scan is
//! strictly sequential.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use log::{debug, info, trace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::cost::{CostEvaluator, View};
use crate::disparity::{DisparityAlgorithm, StereoDisparity, StereoFrame};
use crate::error::*;
use crate::grid::PlaneGrid;
use crate::params::Params;
use crate::plane::Plane;

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

pub struct PatchMatch {
    params: Params,
    phase: Phase,
    history: CostHistory
}

/// One entry of the propagation schedule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Step {
    pub iteration: usize,
    pub direction: Direction,
    pub view: View
}

/// Mean finite cost of each view, recorded at the end of every iteration.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CostHistory {
    pub left: Vec<f64>,
    pub right: Vec<f64>
}

/// Planes and their costs for both views, owned for the duration of one run.
struct MatchState<'a> {
    params: &'a Params,
    eval: CostEvaluator<'a>,
    left: PlaneGrid,
    right: PlaneGrid,
    left_cost: Vec<f64>,
    right_cost: Vec<f64>
}

// -----------------------------------------------------------------------------------------------
// ENUMERATIONS
// -----------------------------------------------------------------------------------------------

/// Scan order of a pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Raster order, top-left to bottom-right.
    Forward,
    /// Reverse raster order, bottom-right to top-left.
    Reverse
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Initialized,
    Propagating {
        iteration: usize,
        direction: Direction,
        view: View
    },
    Converged
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl Direction {
    pub fn for_iteration(iteration: usize) -> Self {
        if iteration % 2 == 0 {
            Direction::Forward
        }
        else {
            Direction::Reverse
        }
    }

    /// Pixel coordinates in scan order.
    pub fn scan(self, width: usize, height: usize) -> impl Iterator<Item = (usize, usize)> {
        let n = width * height;
        (0..n).map(move |i| {
            let i = match self {
                Direction::Forward => i,
                Direction::Reverse => n - 1 - i
            };
            (i % width, i / width)
        })
    }

    /// Neighbours of `(x, y)` visited before it in this scan order.
    pub fn predecessors(
        self,
        x: usize,
        y: usize,
        width: usize,
        height: usize
    ) -> [Option<(usize, usize)>; 2] {
        match self {
            Direction::Forward => [
                if x > 0 { Some((x - 1, y)) } else { None },
                if y > 0 { Some((x, y - 1)) } else { None }
            ],
            Direction::Reverse => [
                if x + 1 < width { Some((x + 1, y)) } else { None },
                if y + 1 < height { Some((x, y + 1)) } else { None }
            ]
        }
    }
}

/// The full propagation schedule: each iteration visits the left then the right view.
pub fn schedule(iterations: usize) -> Vec<Step> {
    let mut steps = Vec::with_capacity(iterations * 2);

    for iteration in 0..iterations {
        let direction = Direction::for_iteration(iteration);
        for &view in [View::Left, View::Right].iter() {
            steps.push(Step { iteration, direction, view });
        }
    }

    steps
}

/// `(max_delta_d, max_delta_slope)` of each refinement sub-step.
///
/// Both magnitudes start at half the disparity range and the full slope range, and halve each
/// sub-step until the disparity step drops below `refine_min_delta`. When only the slopes can move
/// a single sub-step is still taken.
pub fn refinement_steps(params: &Params) -> Vec<(f64, f64)> {
    let mut delta_d = (params.max_d - params.min_d) as f64 / 2.0;
    let mut delta_slope = if params.const_disparities { 0.0 } else { params.max_slope_tan() };

    let mut steps = Vec::new();
    while delta_d >= params.refine_min_delta || (steps.is_empty() && delta_slope > 0.0) {
        steps.push((delta_d, delta_slope));
        delta_d /= 2.0;
        delta_slope /= 2.0;
    }

    steps
}

impl PatchMatch {
    /// Create a new instance of the algorithm, rejecting invalid parameters.
    pub fn new(params: Params) -> Result<Self> {
        params.validate()?;

        Ok(Self {
            params,
            phase: Phase::Initialized,
            history: CostHistory::default()
        })
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Per-iteration mean costs of the last run.
    pub fn history(&self) -> &CostHistory {
        &self.history
    }

    /// A generator seeded from the parameters, or from OS entropy.
    fn rng(&self) -> StdRng {
        if self.params.use_pseudorand {
            StdRng::seed_from_u64(self.params.seed)
        }
        else {
            StdRng::from_entropy()
        }
    }

    /// Run the algorithm and return the converged planes of the left and right views.
    pub fn compute_planes(&mut self, frame: &StereoFrame) -> Result<(PlaneGrid, PlaneGrid)> {
        frame.validate()?;

        let mut rng = self.rng();
        let refine = refinement_steps(&self.params);

        info!(
            "PatchMatch on {}x{} pair: disparities {}..={}, window {}, {} iterations",
            frame.width(),
            frame.height(),
            self.params.min_d,
            self.params.max_d,
            self.params.window_size,
            self.params.iterations
        );

        self.history = CostHistory::default();
        let mut state = MatchState::new(&self.params, frame, &mut rng)?;
        self.phase = Phase::Initialized;

        for step in schedule(self.params.iterations) {
            self.phase = Phase::Propagating {
                iteration: step.iteration,
                direction: step.direction,
                view: step.view
            };

            let spatial = state.spatial_pass(step.view, step.direction)?;
            let transferred = state.view_pass(step.view, step.direction)?;
            let refined = state.refine_pass(step.view, step.direction, &refine, &mut rng)?;

            debug!(
                "Iteration {} ({:?}) {} view: {} spatial, {} view, {} refinement adoptions",
                step.iteration, step.direction, step.view, spatial, transferred, refined
            );

            if step.view == View::Right {
                let left = state.mean_cost(View::Left);
                let right = state.mean_cost(View::Right);
                self.history.left.push(left);
                self.history.right.push(right);

                info!(
                    "Iteration {}/{}: mean cost left {:.4}, right {:.4}",
                    step.iteration + 1,
                    self.params.iterations,
                    left,
                    right
                );
            }
        }

        self.phase = Phase::Converged;

        Ok((state.left, state.right))
    }
}

impl DisparityAlgorithm for PatchMatch {
    /// Compute the disparity maps for the given frame.
    fn compute(&mut self, frame: &StereoFrame) -> Result<StereoDisparity> {
        let (left, right) = self.compute_planes(frame)?;

        Ok(StereoDisparity {
            left: left.to_disparity_map(&self.params),
            right: right.to_disparity_map(&self.params)
        })
    }
}

impl<'a> MatchState<'a> {
    /// Random planes for both views and their initial costs.
    fn new<R: Rng + ?Sized>(params: &'a Params, frame: &'a StereoFrame, rng: &mut R) -> Result<Self> {
        let eval = CostEvaluator::new(params, frame);
        let (width, height) = (frame.width(), frame.height());

        let left = PlaneGrid::random(width, height, params, rng);
        let right = PlaneGrid::random(width, height, params, rng);

        let mut state = Self {
            params,
            eval,
            left,
            right,
            left_cost: Vec::new(),
            right_cost: Vec::new()
        };
        state.left_cost = state.initial_costs(View::Left)?;
        state.right_cost = state.initial_costs(View::Right)?;

        Ok(state)
    }

    fn initial_costs(&self, view: View) -> Result<Vec<f64>> {
        let grid = self.grid(view);
        let mut costs = Vec::with_capacity(grid.width() * grid.height());

        for (x, y) in Direction::Forward.scan(grid.width(), grid.height()) {
            costs.push(self.eval.cost(view, x, y, &grid.get(x, y))?);
        }

        Ok(costs)
    }

    fn width(&self) -> usize {
        self.left.width()
    }

    fn height(&self) -> usize {
        self.left.height()
    }

    fn grid(&self, view: View) -> &PlaneGrid {
        match view {
            View::Left => &self.left,
            View::Right => &self.right
        }
    }

    fn costs(&self, view: View) -> &[f64] {
        match view {
            View::Left => &self.left_cost,
            View::Right => &self.right_cost
        }
    }

    /// Evaluate `candidate` at `(x, y)` of `view` and adopt it if it is accepted.
    fn try_candidate(&mut self, view: View, x: usize, y: usize, candidate: Plane) -> Result<bool> {
        let cost = self.eval.cost(view, x, y, &candidate)?;
        let i = y * self.width() + x;

        let (grid, costs) = match view {
            View::Left => (&mut self.left, &mut self.left_cost),
            View::Right => (&mut self.right, &mut self.right_cost)
        };

        if !self.params.acceptance.accepts(cost, costs[i]) {
            return Ok(false);
        }

        trace!("{} ({}, {}): cost {} -> {}", view, x, y, costs[i], cost);
        grid.set(x, y, candidate);
        costs[i] = cost;

        Ok(true)
    }

    /// Try the planes of already visited neighbours at every pixel.
    fn spatial_pass(&mut self, view: View, direction: Direction) -> Result<usize> {
        let (width, height) = (self.width(), self.height());
        let mut adopted = 0;

        for (x, y) in direction.scan(width, height) {
            for &(nx, ny) in direction.predecessors(x, y, width, height).iter().flatten() {
                let candidate = self.grid(view).get(nx, ny);
                if self.try_candidate(view, x, y, candidate)? {
                    adopted += 1;
                }
            }
        }

        Ok(adopted)
    }

    /// Offer each plane of `view` to the pixel it matches in the other view.
    ///
    /// Transferred planes steeper than the slope limit are not offered.
    fn view_pass(&mut self, view: View, direction: Direction) -> Result<usize> {
        let (width, height) = (self.width(), self.height());
        let target = view.opposite();
        let max_slope = self.params.max_slope_tan();
        let mut adopted = 0;

        for (x, y) in direction.scan(width, height) {
            let plane = self.grid(view).get(x, y);
            let d = self.eval.disparity(&plane, x as f64, y as f64);
            let tx = (x as f64 + view.sign() * d).round();
            if !(tx >= 0.0 && tx < width as f64) {
                continue;
            }

            let candidate = match plane.transfer(view.sign()) {
                Some(p) if p.within_slope(max_slope) => p,
                _ => continue
            };

            if self.try_candidate(target, tx as usize, y, candidate)? {
                adopted += 1;
            }
        }

        Ok(adopted)
    }

    /// Try random perturbations of each pixel's plane with the given decreasing magnitudes.
    fn refine_pass<R: Rng + ?Sized>(
        &mut self,
        view: View,
        direction: Direction,
        steps: &[(f64, f64)],
        rng: &mut R
    ) -> Result<usize> {
        let (width, height) = (self.width(), self.height());
        let params = self.params;
        let max_slope = params.max_slope_tan();
        let mut adopted = 0;

        for (x, y) in direction.scan(width, height) {
            let (fx, fy) = (x as f64, y as f64);

            for &(delta_d, delta_slope) in steps {
                let mut candidate = self
                    .grid(view)
                    .get(x, y)
                    .perturb(fx, fy, delta_d, delta_slope, rng)
                    .limit_slope(fx, fy, max_slope);

                if params.planes_saturation {
                    candidate = candidate.anchor_within(fx, fy, params.min_d as f64, params.max_d as f64);
                }

                if self.try_candidate(view, x, y, candidate)? {
                    adopted += 1;
                }
            }
        }

        Ok(adopted)
    }

    /// Mean over the usable costs of a view, NaN if there are none.
    fn mean_cost(&self, view: View) -> f64 {
        let (sum, n) = self
            .costs(view)
            .iter()
            .filter(|c| !c.is_nan())
            .fold((0.0, 0usize), |(sum, n), c| (sum + c, n + 1));

        if n == 0 {
            f64::NAN
        }
        else {
            sum / n as f64
        }
    }
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------
