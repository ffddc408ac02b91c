//! # Run statistics
//!
//! Plots of the matching cost over iterations, available with the `statistics` feature.

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::ops::Range;
use std::path::Path;

use plotters::prelude::*;

use crate::error::*;
use crate::patchmatch::CostHistory;

// -----------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// -----------------------------------------------------------------------------------------------

fn plot_err<E: std::fmt::Debug>(e: E) -> Error {
    Error::Plot(format!("{:?}", e))
}

/// X axis covering iterations `1..=iterations`, with half an iteration of margin each side.
fn iteration_axis(iterations: usize) -> Range<f64> {
    0.5..iterations.max(1) as f64 + 0.5
}

/// Draw the mean cost of both views after each iteration.
pub fn plot_cost_history<P: AsRef<Path>>(history: &CostHistory, path: P) -> Result<()> {
    let iterations = history.left.len().max(history.right.len());
    let max_cost = history
        .left
        .iter()
        .chain(history.right.iter())
        .cloned()
        .filter(|c| c.is_finite())
        .fold(0.0f64, f64::max);

    let area = BitMapBackend::new(path.as_ref(), (800, 600)).into_drawing_area();
    area.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&area)
        .caption("Mean matching cost", ("sans-serif", 20).into_font())
        .margin(5)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_ranged(iteration_axis(iterations), 0f64..(max_cost * 1.1).max(1.0))
        .map_err(plot_err)?;

    chart.configure_mesh().draw().map_err(plot_err)?;

    let series = |costs: &[f64]| -> Vec<(f64, f64)> {
        costs
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_finite())
            .map(|(i, &c)| ((i + 1) as f64, c))
            .collect()
    };

    chart
        .draw_series(LineSeries::new(series(&history.left), &RED))
        .map_err(plot_err)?
        .label("Left view")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &RED));
    chart
        .draw_series(LineSeries::new(series(&history.right), &BLUE))
        .map_err(plot_err)?
        .label("Right view")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .map_err(plot_err)?;

    Ok(())
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------
