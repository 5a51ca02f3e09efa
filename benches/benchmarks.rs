use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use decimesh::{ConnectedMesh, SharedMesh};

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    for subdivisions in [3u32, 4] {
        let sphere = SharedMesh::icosphere(1.0, subdivisions);
        group.bench_function(format!("icosphere_{}", sphere.num_triangles()), |b| {
            b.iter(|| {
                let mesh = ConnectedMesh::build(black_box(&sphere)).unwrap();
                black_box(mesh);
            });
        });
    }
    group.finish();
}

fn bench_decimate(c: &mut Criterion) {
    let mut group = c.benchmark_group("decimate");
    group.sample_size(10);
    for subdivisions in [3u32, 4] {
        let sphere = SharedMesh::icosphere(1.0, subdivisions);
        group.bench_function(format!("half_icosphere_{}", sphere.num_triangles()), |b| {
            b.iter_with_setup(
                || ConnectedMesh::build(&sphere).unwrap(),
                |mut mesh| {
                    mesh.decimate_to_ratio(black_box(0.5));
                    black_box(mesh);
                },
            );
        });
    }
    group.finish();
}

fn bench_merge_positions(c: &mut Criterion) {
    let plane = SharedMesh::plane(10.0, 10.0, 100);
    c.bench_function("merge_positions_plane", |b| {
        b.iter_with_setup(
            || ConnectedMesh::build(&plane).unwrap(),
            |mut mesh| {
                mesh.merge_positions(black_box(1e-6));
                black_box(mesh);
            },
        );
    });
}

criterion_group!(benches, bench_build, bench_decimate, bench_merge_positions);
criterion_main!(benches);
