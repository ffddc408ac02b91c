//! # Output files
//!
//! Naming and writing of the per-view disparity outputs. From an output path `name.ext` the
//! files `nameL.ext`, `nameR.ext` (normalized images) and `nameL.csv`, `nameR.csv` (raw
//! disparities) are produced.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::path::{Path, PathBuf};

use log::info;

use crate::disparity::StereoDisparity;
use crate::error::*;

// -----------------------------------------------------------------------------------------------
// CONSTANTS
// -----------------------------------------------------------------------------------------------

const DEFAULT_IMAGE_EXT: &str = "png";

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputPaths {
    pub left_image: PathBuf,
    pub right_image: PathBuf,
    pub left_csv: PathBuf,
    pub right_csv: PathBuf
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl OutputPaths {
    /// Derive the four output paths. A path without extension is written as PNG.
    pub fn from_output<P: AsRef<Path>>(output: P) -> Self {
        let output = output.as_ref();
        let stem = output
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = output
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_IMAGE_EXT.to_string());

        let with_name = |name: String| output.with_file_name(name);

        Self {
            left_image: with_name(format!("{}L.{}", stem, ext)),
            right_image: with_name(format!("{}R.{}", stem, ext)),
            left_csv: with_name(format!("{}L.csv", stem)),
            right_csv: with_name(format!("{}R.csv", stem))
        }
    }
}

/// Write the raw disparities as text, then the normalized maps as images.
///
/// Text goes first since normalization loses the true disparity values.
pub fn write_disparities(disparity: &StereoDisparity, paths: &OutputPaths) -> Result<()> {
    disparity.left.write_csv(&paths.left_csv)?;
    disparity.right.write_csv(&paths.right_csv)?;
    info!("Disparities written to {} and {}", paths.left_csv.display(), paths.right_csv.display());

    disparity.left.normalized().write(&paths.left_image)?;
    disparity.right.normalized().write(&paths.right_image)?;
    info!(
        "Disparity maps written to {} and {}",
        paths.left_image.display(),
        paths.right_image.display()
    );

    Ok(())
}

/// Format a value with `digits` significant digits the way C's `%g` does: trailing zeros are
/// dropped and scientific notation is used for very small or large exponents.
pub fn format_significant(value: f64, digits: usize) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    let digits = digits.max(1);

    // Exponent after rounding to the requested precision
    let sci = format!("{:.*e}", digits - 1, value);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m.to_string(), e.parse::<i32>().unwrap_or(0)),
        None => (sci.clone(), 0)
    };

    if exp < -4 || exp >= digits as i32 {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_zeros(&mantissa), sign, exp.abs())
    }
    else {
        let decimals = (digits as i32 - 1 - exp).max(0) as usize;
        trim_zeros(&format!("{:.*}", decimals, value))
    }
}

fn trim_zeros(s: &str) -> String {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
    else {
        s.to_string()
    }
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------
