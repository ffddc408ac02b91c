use criterion::{black_box, criterion_group, criterion_main, Criterion};

use pm_disparity::prelude::*;

/// Textured stereo pair where the right view is the left view moved `shift` pixels left.
fn textured_pair(width: usize, height: usize, shift: usize) -> StereoFrame {
    let mut left = PixelBuffer::new(width, height, 1);
    let mut right = PixelBuffer::new(width, height, 1);

    for y in 0..height {
        for x in 0..width {
            let mut h = (x as u32).wrapping_mul(374_761_393) ^ (y as u32).wrapping_mul(668_265_263);
            h = (h ^ (h >> 13)).wrapping_mul(1_274_126_177);
            left.put(x, y, 0, (h >> 24) as f64);
        }
    }
    for y in 0..height {
        for x in 0..width - shift {
            right.put(x, y, 0, left.get(x + shift, y, 0));
        }
    }

    StereoFrame { left, right }
}

fn patchmatch_bench(c: &mut Criterion) {

    // Build frame
    let frame = textured_pair(64, 48, 6);

    // Build disparity alg
    let mut disp = PatchMatch::new(Params {
        window_size: 11,
        min_d: 0,
        max_d: 16,
        iterations: 2,
        use_pseudorand: true,
        ..Params::default()
    })
    .unwrap();

    // Benchmark compute function
    c.bench_function("patchmatch textured 64x48", |b| b.iter(|| disp.compute(black_box(&frame))));
}

criterion_group!(benches, patchmatch_bench);
criterion_main!(benches);
