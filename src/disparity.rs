//! # General disparity objects
//!
//! This module provides generic disparity traits and structures for use by different algorithms.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::buffer::PixelBuffer;
use crate::error::*;
use crate::output::format_significant;

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

/// A rectified stereo pair.
pub struct StereoFrame {
    pub left: PixelBuffer,
    pub right: PixelBuffer
}

/// A generic floating point disparity map.
#[derive(Clone, Debug, PartialEq)]
pub struct DisparityMap {
    data: PixelBuffer,
    pub max_disp: Option<f64>,
    pub min_disp: Option<f64>
}

/// One disparity map per view.
#[derive(Clone, Debug, PartialEq)]
pub struct StereoDisparity {
    pub left: DisparityMap,
    pub right: DisparityMap
}

// -----------------------------------------------------------------------------------------------
// TRAITS
// -----------------------------------------------------------------------------------------------

pub trait DisparityAlgorithm {
    /// Compute the disparity maps of both views of the given stereo frame.
    fn compute(&mut self, frame: &StereoFrame) -> Result<StereoDisparity>;
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl StereoFrame {
    /// Load both views from disk.
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(left: P, right: Q) -> Result<Self> {
        Ok(Self {
            left: PixelBuffer::load(left)?,
            right: PixelBuffer::load(right)?
        })
    }

    pub fn width(&self) -> usize {
        self.left.width()
    }

    pub fn height(&self) -> usize {
        self.left.height()
    }

    /// Check that both views share their dimensions and channel count.
    pub fn validate(&self) -> Result<()> {
        if self.left.shape() != self.right.shape() {
            return Err(Error::FrameMismatch {
                left: self.left.shape(),
                right: self.right.shape()
            });
        }

        Ok(())
    }
}

impl DisparityMap {
    pub fn new(width: usize, height: usize) -> Self {
        DisparityMap {
            data: PixelBuffer::new(width, height, 1),
            min_disp: None,
            max_disp: None
        }
    }

    pub fn width(&self) -> usize {
        self.data.width()
    }

    pub fn height(&self) -> usize {
        self.data.height()
    }

    pub fn put(&mut self, x: usize, y: usize, val: f64) {
        self.data.put(x, y, 0, val)
    }

    pub fn get(&self, x: usize, y: usize) -> f64 {
        self.data.get(x, y, 0)
    }

    /// Rescale the map to [0, 255] for display, updating the disparity stats.
    ///
    /// This is lossy with respect to the true disparities, so export text first.
    pub fn normalize(&mut self) {
        self.data.normalize();

        if let Some((lo, hi)) = self.data.min_max() {
            self.min_disp = Some(lo);
            self.max_disp = Some(hi);
        }
    }

    /// A normalized copy of the map.
    pub fn normalized(&self) -> DisparityMap {
        let mut new = self.clone();
        new.normalize();
        new
    }

    /// Write the map as `x, y, disparity` rows, columns outermost, 8 significant digits.
    pub fn to_csv<W: Write>(&self, mut writer: W) -> Result<()> {
        for x in 0..self.width() {
            for y in 0..self.height() {
                writeln!(writer, "{}, {}, {}", x, y, format_significant(self.get(x, y), 8))?;
            }
        }
        writer.flush()?;

        Ok(())
    }

    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        self.to_csv(BufWriter::new(file))
    }

    /// Write the map as an image, clamping to [0, 255].
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.data.write(path)
    }
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------
