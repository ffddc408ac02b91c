//! # Pixel buffers
//!
//! A floating point, multi-channel image buffer used for both the input views and the
//! gradient maps derived from them.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::path::Path;

use image::{DynamicImage, GrayImage, Luma};
use imageproc::gradients::{horizontal_sobel, vertical_sobel};

use crate::error::*;

// -----------------------------------------------------------------------------------------------
// CONSTANTS
// -----------------------------------------------------------------------------------------------

/// Upper end of the displayable (and colour) range.
pub const MAX_INTENSITY: f64 = 255.0;

/// Largest Sobel gradient magnitude of an 8 bit image: both 3x3 kernels saturated.
const MAX_SOBEL_MAGNITUDE: f64 = 4.0 * MAX_INTENSITY * std::f64::consts::SQRT_2;

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

/// Interleaved `f64` pixels, `channels` values per pixel, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    channels: usize,
    data: Vec<f64>
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl PixelBuffer {
    /// Create a zero-filled buffer.
    pub fn new(width: usize, height: usize, channels: usize) -> Self {
        Self {
            width,
            height,
            channels,
            data: vec![0.0; width * height * channels]
        }
    }

    /// Wrap existing interleaved data. Returns `None` if the length does not match.
    pub fn from_vec(width: usize, height: usize, channels: usize, data: Vec<f64>) -> Option<Self> {
        if data.len() != width * height * channels {
            return None;
        }

        Some(Self { width, height, channels, data })
    }

    /// Load an image from disk. Grayscale images give one channel, anything else is converted
    /// to three RGB channels (alpha is dropped).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let img = image::open(path)?;
        Ok(Self::from_dynamic(&img))
    }

    pub fn from_dynamic(img: &DynamicImage) -> Self {
        if img.color().channel_count() <= 2 {
            let luma = img.to_luma8();
            let (w, h) = luma.dimensions();
            let data = luma.into_raw().into_iter().map(f64::from).collect();

            Self { width: w as usize, height: h as usize, channels: 1, data }
        }
        else {
            let rgb = img.to_rgb8();
            let (w, h) = rgb.dimensions();
            let data = rgb.into_raw().into_iter().map(f64::from).collect();

            Self { width: w as usize, height: h as usize, channels: 3, data }
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// `(width, height, channels)`
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.width, self.height, self.channels)
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn contains(&self, x: isize, y: isize) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    /// Get a channel value. Panics if out of bounds.
    pub fn get(&self, x: usize, y: usize, channel: usize) -> f64 {
        self.data[self.index(x, y) + channel]
    }

    /// Bounds-checked channel value.
    pub fn sample(&self, x: isize, y: isize, channel: usize) -> Option<f64> {
        if self.contains(x, y) && channel < self.channels {
            Some(self.get(x as usize, y as usize, channel))
        }
        else {
            None
        }
    }

    /// All channels of one pixel. Panics if out of bounds.
    pub fn pixel(&self, x: usize, y: usize) -> &[f64] {
        let i = self.index(x, y);
        &self.data[i..i + self.channels]
    }

    pub fn put(&mut self, x: usize, y: usize, channel: usize, val: f64) {
        let i = self.index(x, y) + channel;
        self.data[i] = val;
    }

    fn index(&self, x: usize, y: usize) -> usize {
        assert!(x < self.width && y < self.height, "pixel ({}, {}) out of bounds", x, y);
        (y * self.width + x) * self.channels
    }

    /// Luminance of a pixel, or the single channel of a grayscale buffer.
    fn luminance(&self, x: usize, y: usize) -> f64 {
        let px = self.pixel(x, y);
        match px.len() {
            3 => 0.299 * px[0] + 0.587 * px[1] + 0.114 * px[2],
            _ => px.iter().sum::<f64>() / px.len() as f64
        }
    }

    /// Converts the buffer's luminance into an 8 bit gray image, clamping to [0, 255].
    pub fn to_luma(&self) -> GrayImage {
        let mut new = GrayImage::new(self.width as u32, self.height as u32);

        for y in 0..self.height {
            for x in 0..self.width {
                let val = self.luminance(x, y).round().max(0.0).min(MAX_INTENSITY);
                new.put_pixel(x as u32, y as u32, Luma([val as u8]));
            }
        }

        new
    }

    /// Sobel gradient magnitude of the luminance, as a one channel buffer.
    ///
    /// When `normalize` is set the magnitudes are scaled from the Sobel range to [0, 255], the
    /// range of the colour channels. The scale is fixed so both views of a pair stay comparable.
    pub fn gradient_magnitude(&self, normalize: bool) -> PixelBuffer {
        let luma = self.to_luma();
        let gx = horizontal_sobel(&luma);
        let gy = vertical_sobel(&luma);

        let scale = if normalize { MAX_INTENSITY / MAX_SOBEL_MAGNITUDE } else { 1.0 };

        let data = gx
            .pixels()
            .zip(gy.pixels())
            .map(|(h, v)| {
                let h = h.0[0] as f64;
                let v = v.0[0] as f64;
                (h * h + v * v).sqrt() * scale
            })
            .collect();

        PixelBuffer {
            width: self.width,
            height: self.height,
            channels: 1,
            data
        }
    }

    /// Minimum and maximum over all values, `None` for an empty buffer.
    pub fn min_max(&self) -> Option<(f64, f64)> {
        self.data.iter().fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v)))
        })
    }

    /// Linearly rescale all values to [0, 255]. A constant buffer becomes all zeros.
    ///
    /// Normalizing an already normalized buffer leaves it unchanged.
    pub fn normalize(&mut self) {
        let (lo, hi) = match self.min_max() {
            Some(r) => r,
            None => return
        };

        if lo == 0.0 && hi == MAX_INTENSITY {
            return;
        }

        if hi > lo {
            let range = hi - lo;
            for v in self.data.iter_mut() {
                *v = (*v - lo) / range * MAX_INTENSITY;
            }
        }
        else {
            for v in self.data.iter_mut() {
                *v = 0.0;
            }
        }
    }

    /// Write the buffer as an 8 bit image. One channel buffers are written as grayscale, three
    /// channel buffers as RGB. Values are clamped to [0, 255].
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let to_u8 = |v: f64| v.round().max(0.0).min(MAX_INTENSITY) as u8;

        if self.channels == 3 {
            let img = image::RgbImage::from_fn(self.width as u32, self.height as u32, |x, y| {
                let px = self.pixel(x as usize, y as usize);
                image::Rgb([to_u8(px[0]), to_u8(px[1]), to_u8(px[2])])
            });
            img.save(path)?;
        }
        else {
            self.to_luma().save(path)?;
        }

        Ok(())
    }
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------
