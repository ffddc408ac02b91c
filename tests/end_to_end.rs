mod common;

use common::synthetic_image::{constant_gray, shifted_pair};
use pm_disparity::prelude::*;
use pm_disparity::Error;

const WIDTH: usize = 32;
const HEIGHT: usize = 16;
const SHIFT: usize = 3;

fn shift_params() -> Params {
    Params {
        window_size: 5,
        min_d: 0,
        max_d: 5,
        iterations: 6,
        out_of_bounds: OutOfBounds::BlackPixel,
        use_pseudorand: true,
        seed: 7,
        ..Params::default()
    }
}

/// Interior columns of each view whose window, window matches and their Sobel neighbourhoods
/// all hold real (non-filler, non-clamped) content.
fn interior(half: usize) -> (std::ops::Range<usize>, std::ops::Range<usize>, std::ops::Range<usize>) {
    let left_cols = (half + SHIFT + 1)..(WIDTH - half - 1);
    let right_cols = (half + 1)..(WIDTH - half - SHIFT - 1);
    let rows = half..(HEIGHT - half);
    (left_cols, right_cols, rows)
}

fn bits(map: &DisparityMap) -> Vec<u64> {
    let mut out = Vec::new();
    for y in 0..map.height() {
        for x in 0..map.width() {
            out.push(map.get(x, y).to_bits());
        }
    }
    out
}

#[test]
fn identical_constant_images_give_zero_disparity() {
    let _ = env_logger::builder().is_test(true).try_init();

    let frame = StereoFrame {
        left: constant_gray(4, 4, 128),
        right: constant_gray(4, 4, 128)
    };
    let mut pm = PatchMatch::new(Params {
        window_size: 3,
        min_d: 0,
        max_d: 0,
        const_disparities: true,
        ..Params::default()
    })
    .unwrap();

    let disp = pm.compute(&frame).unwrap();

    for y in 0..4 {
        for x in 0..4 {
            assert_eq!(disp.left.get(x, y), 0.0);
            assert_eq!(disp.right.get(x, y), 0.0);
        }
    }
}

#[test]
fn shifted_pair_recovers_the_shift() {
    let _ = env_logger::builder().is_test(true).try_init();

    let frame = shifted_pair(WIDTH, HEIGHT, SHIFT);
    let params = shift_params();
    let (left_cols, right_cols, rows) = interior(params.window_size / 2);

    let mut pm = PatchMatch::new(params).unwrap();
    let disp = pm.compute(&frame).unwrap();

    // Nearest sampling cannot tell disparities apart that round to the same pixel
    for y in rows.clone() {
        for x in left_cols.clone() {
            let d = disp.left.get(x, y);
            assert!((d - SHIFT as f64).abs() <= 0.5, "left ({}, {}) = {}", x, y, d);
        }
        for x in right_cols.clone() {
            let d = disp.right.get(x, y);
            assert!((d - SHIFT as f64).abs() <= 0.5, "right ({}, {}) = {}", x, y, d);
        }
    }
}

#[test]
fn bilinear_sampling_recovers_the_shift() {
    let frame = shifted_pair(WIDTH, HEIGHT, SHIFT);
    let params = Params {
        sampling: Sampling::Bilinear,
        iterations: 8,
        ..shift_params()
    };
    let (left_cols, _, rows) = interior(params.window_size / 2);

    let mut pm = PatchMatch::new(params).unwrap();
    let disp = pm.compute(&frame).unwrap();

    let mut total = 0.0;
    let mut n = 0;
    for y in rows {
        for x in left_cols.clone() {
            total += (disp.left.get(x, y) - SHIFT as f64).abs();
            n += 1;
        }
    }

    let mean_error = total / n as f64;
    assert!(mean_error < 0.3, "mean error {}", mean_error);
}

#[test]
fn seeded_runs_are_bit_identical() {
    let frame = shifted_pair(WIDTH, HEIGHT, SHIFT);
    let params = Params { iterations: 2, ..shift_params() };

    let first = PatchMatch::new(params.clone()).unwrap().compute(&frame).unwrap();
    let second = PatchMatch::new(params.clone()).unwrap().compute(&frame).unwrap();
    assert_eq!(bits(&first.left), bits(&second.left));
    assert_eq!(bits(&first.right), bits(&second.right));

    let (left_a, right_a) = PatchMatch::new(params.clone()).unwrap().compute_planes(&frame).unwrap();
    let (left_b, right_b) = PatchMatch::new(params).unwrap().compute_planes(&frame).unwrap();
    assert_eq!(left_a, left_b);
    assert_eq!(right_a, right_b);
}

#[test]
fn history_tracks_each_iteration() {
    let frame = shifted_pair(WIDTH, HEIGHT, SHIFT);
    let mut pm = PatchMatch::new(shift_params()).unwrap();
    pm.compute(&frame).unwrap();

    let history = pm.history();
    assert_eq!(history.left.len(), 6);
    assert_eq!(history.right.len(), 6);

    // Costs held by each pixel never increase, so neither does their mean
    for w in history.left.windows(2) {
        assert!(w[1] <= w[0] + 1e-9);
    }
}

#[test]
fn even_window_is_rejected_before_processing() {
    let result = PatchMatch::new(Params { window_size: 10, ..Params::default() });

    match result {
        Err(Error::Configuration { parameter, .. }) => assert_eq!(parameter, "window_size"),
        Err(other) => panic!("unexpected error {}", other),
        Ok(_) => panic!("window size 10 must be rejected")
    }
}

#[test]
fn inverted_disparity_range_is_rejected() {
    let result = PatchMatch::new(Params { min_d: 8, max_d: 2, ..Params::default() });
    assert!(matches!(result, Err(Error::Configuration { parameter: "min_d", .. })));
}

#[test]
fn error_policy_aborts_at_the_border() {
    let frame = shifted_pair(WIDTH, HEIGHT, SHIFT);
    let mut pm = PatchMatch::new(Params {
        out_of_bounds: OutOfBounds::Error,
        resize_windows: false,
        ..shift_params()
    })
    .unwrap();

    match pm.compute(&frame) {
        Err(Error::BoundaryCost { view, .. }) => assert_eq!(view, "left"),
        other => panic!("expected a boundary error, got {:?}", other.map(|_| ()))
    }
}

#[test]
fn nan_policy_is_not_fatal() {
    let frame = shifted_pair(WIDTH, HEIGHT, SHIFT);
    let mut pm = PatchMatch::new(Params {
        out_of_bounds: OutOfBounds::NanCost,
        resize_windows: false,
        ..shift_params()
    })
    .unwrap();

    let disp = pm.compute(&frame).unwrap();
    for y in 0..HEIGHT {
        for x in 0..WIDTH {
            let d = disp.left.get(x, y);
            assert!(d >= 0.0 && d <= 5.0);
        }
    }
}
