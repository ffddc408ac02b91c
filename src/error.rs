//! # Error standards
//!
//! This module provides a standardised error enum and result type for this crate.

// -----------------------------------------------------------------------------------------------
// TYPES
// -----------------------------------------------------------------------------------------------

/// Standard result type used in the disparity crate.
pub type Result<T> = std::result::Result<T, Error>;

// -----------------------------------------------------------------------------------------------
// ENUMERATIONS
// -----------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A parameter (or combination of parameters) is invalid. Raised before any pixel is
    /// processed.
    #[error("Invalid configuration for `{parameter}`: {reason}")]
    Configuration {
        parameter: &'static str,
        reason: String
    },

    /// A window sample fell outside the image while the out-of-bounds policy is `error`.
    #[error(
        "Window sample ({sample_x}, {sample_y}) is out of bounds while matching pixel \
        ({x}, {y}) of the {view} view"
    )]
    BoundaryCost {
        view: &'static str,
        x: usize,
        y: usize,
        sample_x: f64,
        sample_y: f64
    },

    #[error("Left and right images differ: {left:?} vs {right:?} (width, height, channels)")]
    FrameMismatch {
        left: (usize, usize, usize),
        right: (usize, usize, usize)
    },

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not parse parameters: {0}")]
    Params(#[from] serde_json::Error),

    #[error("{0}")]
    Cli(String),

    #[cfg(feature = "statistics")]
    #[error("Error was thrown while plotting statistics: {0}")]
    Plot(String)
}
