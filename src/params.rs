//! # PatchMatch parameters
//!
//! The parameter bundle consumed by the matching engine. Parameters are constructed once
//! (from defaults, a JSON file, or the command line), validated, and then passed by reference
//! into [`PatchMatch::new`](crate::patchmatch::PatchMatch::new). They are never mutated after
//! validation.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::*;

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Params {
    /// Balance between the colour term (1.0) and the gradient term (0.0) of the matching cost.
    pub alfa: f64,
    /// Truncation of the colour dissimilarity.
    pub tau_col: f64,
    /// Truncation of the gradient dissimilarity.
    pub tau_grad: f64,
    /// Colour falloff of the adaptive support weight.
    pub gamma: f64,

    /// Side of the square support window, must be odd.
    pub window_size: usize,
    pub min_d: i32,
    pub max_d: i32,
    /// Number of propagation/refinement rounds per view.
    pub iterations: usize,
    /// Maximum inclination of a plane along either axis, in degrees.
    pub max_slope: f64,

    pub normalize_gradients: bool,
    pub out_of_bounds: OutOfBounds,
    pub resize_windows: bool,
    pub planes_saturation: bool,
    pub use_pseudorand: bool,
    pub const_disparities: bool,

    /// Seed used when `use_pseudorand` is set.
    pub seed: u64,
    pub acceptance: Acceptance,
    pub sampling: Sampling,
    /// Refinement stops halving once the disparity step falls below this value.
    pub refine_min_delta: f64
}

// -----------------------------------------------------------------------------------------------
// ENUMERATIONS
// -----------------------------------------------------------------------------------------------

/// What to do when a window sample, or its match in the other view, is outside the image.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutOfBounds {
    /// Clamp to the nearest valid pixel.
    #[serde(rename = "repeat")]
    RepeatPixel,
    /// Sample colour and gradient as zero.
    #[serde(rename = "black")]
    BlackPixel,
    /// The sample contributes nothing to the window sum.
    #[serde(rename = "zero")]
    ZeroCost,
    /// Abort the run.
    #[serde(rename = "error")]
    Error,
    /// The whole candidate becomes unusable.
    #[serde(rename = "nan")]
    NanCost
}

/// Acceptance rule for a candidate plane against the plane currently held by a pixel.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Acceptance {
    /// Adopt only on a strictly lower cost, ties keep the held plane.
    Strict,
    /// Adopt on a lower or equal cost.
    Equal
}

/// How fractional matched coordinates are sampled in the opposite view.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sampling {
    Nearest,
    Bilinear
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            alfa: 0.5,
            tau_col: 60.0,
            tau_grad: 30.0,
            gamma: 15.0,

            window_size: 35,
            min_d: 0,
            max_d: 70,
            iterations: 3,
            max_slope: 45.0,

            // With this false tau_grad must change as well
            normalize_gradients: true,
            out_of_bounds: OutOfBounds::NanCost,
            resize_windows: true,
            planes_saturation: true,
            use_pseudorand: false,
            const_disparities: false,

            seed: 0,
            acceptance: Acceptance::Strict,
            sampling: Sampling::Nearest,
            refine_min_delta: 0.1
        }
    }
}

impl Params {
    /// Load parameters from a JSON file. Missing fields take their default value.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let params: Params = serde_json::from_str(&contents)?;
        Ok(params)
    }

    /// Check every parameter, naming the first offending one.
    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 || self.window_size % 2 == 0 {
            return Err(config_err(
                "window_size",
                format!("must be a positive odd number, got {}", self.window_size)
            ));
        }
        if self.min_d > self.max_d {
            return Err(config_err(
                "min_d",
                format!("must not exceed max_d ({} > {})", self.min_d, self.max_d)
            ));
        }
        if self.iterations == 0 {
            return Err(config_err("iterations", "must be at least 1".into()));
        }
        if !(0.0..90.0).contains(&self.max_slope) {
            return Err(config_err(
                "max_slope",
                format!("must be in [0, 90) degrees (tan undefined at 90), got {}", self.max_slope)
            ));
        }
        if !(0.0..=1.0).contains(&self.alfa) {
            return Err(config_err("alfa", format!("must be in [0, 1], got {}", self.alfa)));
        }
        for &(name, value) in [
            ("tau_col", self.tau_col),
            ("tau_grad", self.tau_grad),
            ("gamma", self.gamma),
            ("refine_min_delta", self.refine_min_delta)
        ].iter() {
            // Also rejects NaN
            if !(value > 0.0) {
                return Err(config_err(name, format!("must be positive, got {}", value)));
            }
        }

        Ok(())
    }

    /// Largest absolute value allowed for either slope coefficient.
    pub fn max_slope_tan(&self) -> f64 {
        self.max_slope.to_radians().tan()
    }

    /// Apply plane saturation to an evaluated disparity, if enabled.
    pub fn saturate(&self, d: f64) -> f64 {
        if self.planes_saturation {
            d.max(self.min_d as f64).min(self.max_d as f64)
        }
        else {
            d
        }
    }
}

fn config_err(parameter: &'static str, reason: String) -> Error {
    Error::Configuration { parameter, reason }
}

impl FromStr for OutOfBounds {
    type Err = Error;

    fn from_str(token: &str) -> Result<Self> {
        match token {
            "repeat" => Ok(OutOfBounds::RepeatPixel),
            "black" => Ok(OutOfBounds::BlackPixel),
            "zero" => Ok(OutOfBounds::ZeroCost),
            "error" => Ok(OutOfBounds::Error),
            "nan" => Ok(OutOfBounds::NanCost),
            _ => Err(config_err(
                "out_of_bounds",
                format!("expected one of {{repeat, black, zero, error, nan}}, got `{}`", token)
            ))
        }
    }
}

impl FromStr for Acceptance {
    type Err = Error;

    fn from_str(token: &str) -> Result<Self> {
        match token {
            "strict" => Ok(Acceptance::Strict),
            "equal" => Ok(Acceptance::Equal),
            _ => Err(config_err(
                "acceptance",
                format!("expected one of {{strict, equal}}, got `{}`", token)
            ))
        }
    }
}

impl FromStr for Sampling {
    type Err = Error;

    fn from_str(token: &str) -> Result<Self> {
        match token {
            "nearest" => Ok(Sampling::Nearest),
            "bilinear" => Ok(Sampling::Bilinear),
            _ => Err(config_err(
                "sampling",
                format!("expected one of {{nearest, bilinear}}, got `{}`", token)
            ))
        }
    }
}

impl Acceptance {
    /// Whether `candidate` should replace a plane whose cost is `current`.
    ///
    /// An unusable (NaN) candidate never wins, and any real candidate beats an unusable
    /// current cost.
    pub fn accepts(self, candidate: f64, current: f64) -> bool {
        if candidate.is_nan() {
            return false;
        }
        if current.is_nan() {
            return true;
        }
        match self {
            Acceptance::Strict => candidate < current,
            Acceptance::Equal => candidate <= current
        }
    }
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(Params::default().validate().is_ok());
    }

    #[test]
    fn even_window_is_rejected() {
        let params = Params { window_size: 10, ..Params::default() };
        match params.validate() {
            Err(Error::Configuration { parameter, .. }) => assert_eq!(parameter, "window_size"),
            other => panic!("expected a configuration error, got {:?}", other)
        }
    }

    #[test]
    fn inverted_range_is_rejected() {
        let params = Params { min_d: 10, max_d: 5, ..Params::default() };
        match params.validate() {
            Err(Error::Configuration { parameter, .. }) => assert_eq!(parameter, "min_d"),
            other => panic!("expected a configuration error, got {:?}", other)
        }
    }

    #[test]
    fn non_positive_constants_are_rejected() {
        let params = Params { gamma: 0.0, ..Params::default() };
        assert!(matches!(
            params.validate(),
            Err(Error::Configuration { parameter: "gamma", .. })
        ));

        let params = Params { alfa: 1.5, ..Params::default() };
        assert!(matches!(
            params.validate(),
            Err(Error::Configuration { parameter: "alfa", .. })
        ));
    }

    #[test]
    fn slope_limit_is_in_degrees() {
        assert!((Params::default().max_slope_tan() - 1.0).abs() < 1e-12);

        match (Params { max_slope: 90.0, ..Params::default() }).validate() {
            Err(Error::Configuration { parameter, reason }) => {
                assert_eq!(parameter, "max_slope");
                assert!(reason.contains("degrees"), "{}", reason);
            },
            other => panic!("expected a configuration error, got {:?}", other)
        }
        assert!(Params { max_slope: 0.0, ..Params::default() }.validate().is_ok());
    }

    #[test]
    fn out_of_bounds_tokens() {
        assert_eq!("repeat".parse::<OutOfBounds>().unwrap(), OutOfBounds::RepeatPixel);
        assert_eq!("black".parse::<OutOfBounds>().unwrap(), OutOfBounds::BlackPixel);
        assert_eq!("zero".parse::<OutOfBounds>().unwrap(), OutOfBounds::ZeroCost);
        assert_eq!("error".parse::<OutOfBounds>().unwrap(), OutOfBounds::Error);
        assert_eq!("nan".parse::<OutOfBounds>().unwrap(), OutOfBounds::NanCost);
        assert!("clamp".parse::<OutOfBounds>().is_err());
    }

    #[test]
    fn json_uses_defaults_for_missing_fields() {
        let params: Params =
            serde_json::from_str(r#"{ "window_size": 5, "out_of_bounds": "black" }"#).unwrap();
        assert_eq!(params.window_size, 5);
        assert_eq!(params.out_of_bounds, OutOfBounds::BlackPixel);
        assert_eq!(params.max_d, 70);
        assert!(serde_json::from_str::<Params>(r#"{ "windowsize": 5 }"#).is_err());
    }

    #[test]
    fn acceptance_policies() {
        assert!(Acceptance::Strict.accepts(1.0, 2.0));
        assert!(!Acceptance::Strict.accepts(2.0, 2.0));
        assert!(Acceptance::Equal.accepts(2.0, 2.0));
        assert!(!Acceptance::Equal.accepts(f64::NAN, 2.0));
        assert!(Acceptance::Strict.accepts(100.0, f64::NAN));
        assert!(!Acceptance::Strict.accepts(f64::NAN, f64::NAN));
    }

    #[test]
    fn saturation_clamps_only_when_enabled() {
        let params = Params { min_d: 0, max_d: 5, ..Params::default() };
        assert_eq!(params.saturate(7.5), 5.0);
        assert_eq!(params.saturate(-1.0), 0.0);

        let params = Params { planes_saturation: false, ..params };
        assert_eq!(params.saturate(7.5), 7.5);
    }
}
