//! # Plane grids
//!
//! One plane hypothesis per pixel of a view.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use rand::Rng;

use crate::disparity::DisparityMap;
use crate::params::Params;
use crate::plane::Plane;

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

/// Row-major grid of planes.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaneGrid {
    width: usize,
    height: usize,
    planes: Vec<Plane>
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl PlaneGrid {
    /// A grid where every pixel holds `plane`.
    pub fn filled(width: usize, height: usize, plane: Plane) -> Self {
        Self {
            width,
            height,
            planes: vec![plane; width * height]
        }
    }

    /// Random planes drawn in raster order, so a seeded generator gives a reproducible grid.
    pub fn random<R: Rng + ?Sized>(width: usize, height: usize, params: &Params, rng: &mut R) -> Self {
        let max_slope = params.max_slope_tan();
        let mut planes = Vec::with_capacity(width * height);

        for y in 0..height {
            for x in 0..width {
                planes.push(Plane::random(
                    x as f64,
                    y as f64,
                    params.min_d as f64,
                    params.max_d as f64,
                    max_slope,
                    params.const_disparities,
                    rng
                ));
            }
        }

        Self { width, height, planes }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    pub fn get(&self, x: usize, y: usize) -> Plane {
        self.planes[y * self.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize, plane: Plane) {
        self.planes[y * self.width + x] = plane;
    }

    /// Evaluate every plane at its own pixel, saturating if enabled.
    pub fn to_disparity_map(&self, params: &Params) -> DisparityMap {
        let mut map = DisparityMap::new(self.width, self.height);
        let mut range: Option<(f64, f64)> = None;

        for y in 0..self.height {
            for x in 0..self.width {
                let d = params.saturate(self.get(x, y).evaluate(x as f64, y as f64));
                map.put(x, y, d);

                range = Some(match range {
                    None => (d, d),
                    Some((lo, hi)) => (lo.min(d), hi.max(d))
                });
            }
        }

        if let Some((lo, hi)) = range {
            map.min_disp = Some(lo);
            map.max_disp = Some(hi);
        }

        map
    }
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------
