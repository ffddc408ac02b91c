use pm_disparity::prelude::*;

/// Deterministic pseudo-random 8 bit value for a pixel.
fn noise(x: usize, y: usize) -> u8 {
    let mut h = (x as u32).wrapping_mul(374_761_393) ^ (y as u32).wrapping_mul(668_265_263);
    h = (h ^ (h >> 13)).wrapping_mul(1_274_126_177);
    (h >> 24) as u8
}

/// A grayscale image where every pixel has the same value.
pub fn constant_gray(width: usize, height: usize, value: u8) -> PixelBuffer {
    PixelBuffer::from_vec(width, height, 1, vec![value as f64; width * height])
        .expect("buffer size matches")
}

/// Random texture, good for unambiguous matching.
pub fn noise_gray(width: usize, height: usize) -> PixelBuffer {
    let mut buf = PixelBuffer::new(width, height, 1);
    for y in 0..height {
        for x in 0..width {
            buf.put(x, y, 0, noise(x, y) as f64);
        }
    }
    buf
}

/// Stereo pair where the right view is the left view moved `shift` pixels to the left, so that
/// left pixel `x` shows up at right pixel `x - shift`. Columns without a source are black.
pub fn shifted_pair(width: usize, height: usize, shift: usize) -> StereoFrame {
    let left = noise_gray(width, height);
    let mut right = PixelBuffer::new(width, height, 1);

    for y in 0..height {
        for x in 0..width - shift {
            right.put(x, y, 0, left.get(x + shift, y, 0));
        }
    }

    StereoFrame { left, right }
}
