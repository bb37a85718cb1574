use criterion::{black_box, criterion_group, criterion_main, Criterion};

use court_calib_core::{Homography, ImagePoint, PoseLandmark};
use court_calib_transform::{
    batch_image_to_world, image_to_world, CoordinateTransformer, TransformOptions,
};

fn perspective() -> Homography {
    Homography::from_array([
        [95.0, 0.0, 960.0], //
        [0.0, -30.0, 520.0],
        [0.0, 0.055, 1.0],
    ])
}

fn grid(n: usize) -> Vec<ImagePoint> {
    (0..n)
        .map(|k| {
            let u = 40.0 + (k % 64) as f64 * 28.0;
            let v = 120.0 + (k / 64) as f64 * 9.0;
            ImagePoint::new(u, v)
        })
        .collect()
}

fn bench_batch(c: &mut Criterion) {
    let h = perspective();
    let pts = grid(4096);

    c.bench_function("image_to_world_per_point_4096", |b| {
        b.iter(|| {
            let out: Vec<_> = pts
                .iter()
                .map(|p| image_to_world(*p, black_box(&h), Some(0.0), None))
                .collect();
            black_box(out)
        })
    });

    c.bench_function("batch_image_to_world_4096", |b| {
        b.iter(|| black_box(batch_image_to_world(black_box(&pts), &h, 0.0)))
    });
}

fn bench_landmarks(c: &mut Criterion) {
    let mut t = CoordinateTransformer::new(TransformOptions::default());
    t.set_homography(perspective(), None);
    let lms: Vec<_> = (0..33)
        .map(|k| PoseLandmark::new(900.0 + k as f64 * 4.0, 400.0 + k as f64 * 6.0, 0.01 * k as f64, 0.9))
        .collect();

    c.bench_function("transformer_pose_33_cached", |b| {
        b.iter(|| black_box(t.transform_pose_landmarks(black_box(&lms), 0.0)))
    });
}

criterion_group!(benches, bench_batch, bench_landmarks);
criterion_main!(benches);
