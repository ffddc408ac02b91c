//! # Command line
//!
//! Argument parsing for the `spmatch` tool:
//!
//! ```text
//! spmatch [options] <left_image> <right_image>
//! ```
//!
//! Parameters start from their defaults, are then overridden by a JSON file given with
//! `--config`, and finally by individual options, regardless of the order they appear in.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::path::PathBuf;
use std::str::FromStr;

use log::LevelFilter;

use crate::error::*;
use crate::params::Params;

// -----------------------------------------------------------------------------------------------
// CONSTANTS
// -----------------------------------------------------------------------------------------------

pub const USAGE: &str = "\
SPMatch. Stereo matching with slanted support windows

Usage:
  spmatch [options] <left_image> <right_image>

General options:
  -h, --help                   Print this help
  -o, --output <path>          The path/name of the output files [default: disparity.png]
  -I, --inputs <left> <right>  Left and right images
  -l, --log <0..3>             Log level, 0 means off [default: 1]
  -c, --config <json>          Read parameters from a JSON file

Parameters:
      --alfa <f>               ALFA constant
      --tau_col <f>            TAU_COL constant
      --tau_grad <f>           TAU_GRAD constant
      --gamma <f>              GAMMA constant
  -w, --window_size <n>        Pixel size of the matching window (odd)
  -m, --min_d <n>              Minimum disparity
  -M, --max_d <n>              Maximum disparity
  -i, --iteration <n>          Number of iterations per view
      --max_slope <deg>        Maximum slope of each window
      --out_of_bounds <mode>   One of {repeat, black, zero, error, nan}
      --seed <n>               Seed of the pseudorandom generator
      --acceptance <mode>      One of {strict, equal}
      --sampling <mode>        One of {nearest, bilinear}
      --normalize_gradients[=<bool>]  Whether the gradient map should be normalized
      --resize_window[=<bool>]        Whether slanted windows should be smaller
      --planes_saturation[=<bool>]    Force any internal value to be saturated
      --use_pseudorand[=<bool>]       Use pseudorandom numbers (repeatable computation)
      --const_disparities[=<bool>]    Always use constant planes
";

const DEFAULT_OUTPUT: &str = "disparity.png";

// -----------------------------------------------------------------------------------------------
// DATA STRUCTURES
// -----------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub left: PathBuf,
    pub right: PathBuf,
    pub output: PathBuf,
    pub log_level: LevelFilter,
    pub params: Params
}

// -----------------------------------------------------------------------------------------------
// ENUMERATIONS
// -----------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Run(RunConfig)
}

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

/// Map the `--log` level of the tool onto a log filter.
pub fn level_filter(level: u8) -> LevelFilter {
    match level {
        0 => LevelFilter::Off,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace
    }
}

/// Parse the arguments following the program name.
pub fn parse_args<I, S>(args: I) -> Result<Command>
where
    I: IntoIterator<Item = S>,
    S: Into<String>
{
    let args: Vec<String> = args.into_iter().map(Into::into).collect();

    let mut inputs: Vec<String> = Vec::new();
    let mut output = DEFAULT_OUTPUT.to_string();
    let mut log_level = 1u8;
    let mut config: Option<PathBuf> = None;
    let mut overrides: Vec<(String, Option<String>)> = Vec::new();

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        if !arg.starts_with('-') || arg == "-" {
            inputs.push(arg);
            continue;
        }

        let (key, inline) = match arg.split_once('=') {
            Some((k, v)) => (k.to_string(), Some(v.to_string())),
            None => (arg.clone(), None)
        };

        match key.as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "-o" | "--output" => output = value(&key, inline, &mut iter)?,
            "-l" | "--log" => log_level = parse_value(&key, &value(&key, inline, &mut iter)?)?,
            "-c" | "--config" => config = Some(PathBuf::from(value(&key, inline, &mut iter)?)),
            "-I" | "--inputs" => {
                if let Some(v) = inline {
                    inputs.push(v);
                }
                // -I takes the two images, the next one may be separate
                while inputs.len() < 2 {
                    match iter.next() {
                        Some(v) => inputs.push(v),
                        None => break
                    }
                }
            },
            "--normalize_gradients" | "--resize_window" | "--planes_saturation"
            | "--use_pseudorand" | "--const_disparities" => overrides.push((key, inline)),
            _ => {
                let v = value(&key, inline, &mut iter)?;
                overrides.push((key, Some(v)));
            }
        }
    }

    if inputs.len() != 2 {
        return Err(Error::Cli(format!(
            "Need two images, got {}\n\n{}",
            inputs.len(),
            USAGE
        )));
    }

    let mut params = match config {
        Some(path) => Params::from_json_file(path)?,
        None => Params::default()
    };
    for (key, v) in overrides {
        apply_override(&mut params, &key, v)?;
    }

    let right = PathBuf::from(inputs.pop().unwrap_or_default());
    let left = PathBuf::from(inputs.pop().unwrap_or_default());

    Ok(Command::Run(RunConfig {
        left,
        right,
        output: PathBuf::from(output),
        log_level: level_filter(log_level),
        params
    }))
}

/// Check that both input images exist.
pub fn check_inputs(config: &RunConfig) -> Result<()> {
    for path in [&config.left, &config.right].iter() {
        if !path.is_file() {
            return Err(Error::Cli(format!("File not found: {}", path.display())));
        }
    }

    Ok(())
}

fn apply_override(params: &mut Params, key: &str, v: Option<String>) -> Result<()> {
    let text = v.unwrap_or_default();
    let v = text.as_str();

    match key {
        "--alfa" => params.alfa = parse_value(key, v)?,
        "--tau_col" => params.tau_col = parse_value(key, v)?,
        "--tau_grad" => params.tau_grad = parse_value(key, v)?,
        "--gamma" => params.gamma = parse_value(key, v)?,
        "-w" | "--window_size" => params.window_size = parse_value(key, v)?,
        "-m" | "--min_d" => params.min_d = parse_value(key, v)?,
        "-M" | "--max_d" => params.max_d = parse_value(key, v)?,
        "-i" | "--iteration" => params.iterations = parse_value(key, v)?,
        "--max_slope" => params.max_slope = parse_value(key, v)?,
        "--out_of_bounds" => params.out_of_bounds = v.parse()?,
        "--seed" => params.seed = parse_value(key, v)?,
        "--acceptance" => params.acceptance = v.parse()?,
        "--sampling" => params.sampling = v.parse()?,
        "--normalize_gradients" => params.normalize_gradients = parse_flag(key, v)?,
        "--resize_window" => params.resize_windows = parse_flag(key, v)?,
        "--planes_saturation" => params.planes_saturation = parse_flag(key, v)?,
        "--use_pseudorand" => params.use_pseudorand = parse_flag(key, v)?,
        "--const_disparities" => params.const_disparities = parse_flag(key, v)?,
        _ => return Err(Error::Cli(format!("Unknown option `{}`\n\n{}", key, USAGE)))
    }

    Ok(())
}

/// Inline `--key=value`, or the next argument.
fn value<I: Iterator<Item = String>>(key: &str, inline: Option<String>, iter: &mut I) -> Result<String> {
    match inline {
        Some(v) => Ok(v),
        None => iter
            .next()
            .ok_or_else(|| Error::Cli(format!("Missing value for `{}`", key)))
    }
}

fn parse_value<T: FromStr>(key: &str, v: &str) -> Result<T> {
    v.parse()
        .map_err(|_| Error::Cli(format!("Invalid value `{}` for `{}`", v, key)))
}

/// Boolean flags are implicitly `true` when given without a value.
fn parse_flag(key: &str, v: &str) -> Result<bool> {
    match v {
        "" | "true" | "1" | "on" | "yes" => Ok(true),
        "false" | "0" | "off" | "no" => Ok(false),
        _ => Err(Error::Cli(format!("Invalid boolean `{}` for `{}`", v, key)))
    }
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------
