//! SPMatch: stereo matching with slanted support windows.
//!
//! Reads a rectified stereo pair and writes the disparity of both views as normalized images and
//! as CSV text.

use std::env;

use pm_disparity::cli::{self, Command, USAGE};
use pm_disparity::output::{write_disparities, OutputPaths};
use pm_disparity::prelude::*;

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

fn run() -> pm_disparity::Result<()> {
    let config = match cli::parse_args(env::args().skip(1))? {
        Command::Help => {
            println!("{}", USAGE);
            return Ok(());
        },
        Command::Run(config) => config
    };

    env_logger::Builder::new()
        .filter_level(config.log_level)
        .parse_default_env()
        .init();

    cli::check_inputs(&config)?;

    let frame = StereoFrame::load(&config.left, &config.right)?;
    let mut matcher = PatchMatch::new(config.params.clone())?;
    let disparity = matcher.compute(&frame)?;

    write_disparities(&disparity, &OutputPaths::from_output(&config.output))?;

    #[cfg(feature = "statistics")]
    {
        let plot = config.output.with_extension("cost.png");
        pm_disparity::statistics::plot_cost_history(matcher.history(), &plot)?;
        log::info!("Cost history plotted to {}", plot.display());
    }

    Ok(())
}
