use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::{DMat3, DQuat};
use rand::Rng;

use sfmprep_colmap::convert::convert_pose;
use sfmprep_colmap::resize::resize_area;

fn random_rotations(n: usize) -> Vec<[[f64; 3]; 3]> {
    let mut rng = rand::rng();
    (0..n)
        .map(|_| {
            let q = DQuat::from_xyzw(
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
            )
            .normalize();
            DMat3::from_quat(q).transpose().to_cols_array_2d()
        })
        .collect()
}

fn bench_convert_pose(c: &mut Criterion) {
    let mut group = c.benchmark_group("ConvertPose");

    for num_cameras in [100, 1000, 10000].iter() {
        group.throughput(criterion::Throughput::Elements(*num_cameras as u64));

        let rotations = random_rotations(*num_cameras);
        let translation = [0.5, -1.0, 2.0];

        group.bench_with_input(
            BenchmarkId::new("convert_pose", num_cameras),
            &rotations,
            |b, rotations| {
                b.iter(|| {
                    for rotation in rotations {
                        let _ = black_box(convert_pose(black_box(rotation), &translation));
                    }
                })
            },
        );
    }
    group.finish();
}

fn bench_resize_area(c: &mut Criterion) {
    let mut group = c.benchmark_group("ResizeArea");

    for (width, height) in [(1024, 768), (2048, 1536), (4000, 3000)].iter() {
        group.throughput(criterion::Throughput::Elements((*width * *height) as u64));

        let parameter_string = format!("{}x{}", width, height);
        let src = vec![127u8; width * height * 3];
        let (dst_width, dst_height) = (1000, 1000 * height / width);

        group.bench_with_input(
            BenchmarkId::new("resize_area", &parameter_string),
            &src,
            |b, src| {
                b.iter(|| {
                    black_box(resize_area(
                        black_box(src),
                        *width,
                        *height,
                        3,
                        dst_width,
                        dst_height,
                    ))
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_convert_pose, bench_resize_area);
criterion_main!(benches);
