//! # PatchMatch Stereo Disparity Computation
//!
//! This crate computes dense disparity maps for both views of a rectified stereo pair with
//! PatchMatch Stereo, using slanted support windows.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod buffer;
pub mod cli;
pub mod cost;
mod disparity;
mod error;
pub mod grid;
pub mod output;
pub mod params;
pub mod patchmatch;
pub mod plane;
#[cfg(feature = "statistics")]
pub mod statistics;

// -----------------------------------------------------------------------------------------------
// EXPORTS
// -----------------------------------------------------------------------------------------------

pub use crate::error::{Error, Result};

pub mod prelude {
    pub use crate::buffer::PixelBuffer;
    pub use crate::disparity::{DisparityAlgorithm, DisparityMap, StereoDisparity, StereoFrame};
    pub use crate::params::{Acceptance, OutOfBounds, Params, Sampling};
    pub use crate::patchmatch::PatchMatch;
}
