use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rowlane_core::{Csr, PipelineConfig};
use rowlane_kernels::{spmv_reference, spmv_streamed};

/// Banded matrix with `band` entries per row, wrapping at the last column.
fn banded(nrows: usize, band: usize) -> Csr<f64, i64> {
    let mut indptr = Vec::with_capacity(nrows + 1);
    let mut indices = Vec::with_capacity(nrows * band);
    let mut data = Vec::with_capacity(nrows * band);
    indptr.push(0i64);
    for i in 0..nrows {
        let mut cols: Vec<usize> = (0..band).map(|k| (i + k) % nrows).collect();
        cols.sort_unstable();
        for c in cols {
            indices.push(i64::try_from(c).unwrap());
            data.push(1.0 / f64::from(u32::try_from(c % 31 + 1).unwrap()));
        }
        indptr.push(i64::try_from(indices.len()).unwrap());
    }
    Csr::from_parts(nrows, nrows, indptr, indices, data, true).unwrap()
}

fn bench_spmv(c: &mut Criterion) {
    let a = banded(20_000, 24);
    let x: Vec<f64> = (0..20_000u32).map(|j| f64::from(j % 7) - 3.0).collect();

    c.bench_function("spmv_reference_20k", |b| {
        b.iter(|| black_box(spmv_reference(black_box(&a), black_box(&x))));
    });

    let mut group = c.benchmark_group("spmv_streamed_20k");
    for lanes in [8usize, 16, 64] {
        let cfg = PipelineConfig::new(lanes).with_tiles(8);
        group.bench_with_input(BenchmarkId::from_parameter(lanes), &cfg, |b, cfg| {
            b.iter(|| black_box(spmv_streamed(black_box(&a), black_box(&x), cfg).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_spmv);
criterion_main!(benches);
